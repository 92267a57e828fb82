//! Capped in-memory store of dealer log lines.
//!
//! Every line a tournament produces is kept here with the ids of the
//! tournament and round it belongs to, so that operators can page through
//! the log, rebuild the history of a tournament or find the latest round.
use std::collections::{BTreeMap, VecDeque};
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ManagementError;
use crate::game::GameId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub game_id: GameId,
    pub tournament_id: u64,
    pub round_id: u64,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestIds {
    pub tournament_id: u64,
    pub round_id: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl FromStr for Order {
    type Err = ManagementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Order::Asc),
            "desc" => Ok(Order::Desc),
            _ => Err(ManagementError::InvalidOrder(s.to_string())),
        }
    }
}

/// Bounds are exclusive: only entries strictly after `from` and strictly
/// before `to` are returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub tournament_id: Option<u64>,
    /// Zero means no limit.
    pub limit: usize,
    pub order: Order,
}

impl LogFilter {
    fn accepts(&self, entry: &LogEntry) -> bool {
        self.from.is_none_or(|from| entry.timestamp > from)
            && self.to.is_none_or(|to| entry.timestamp < to)
            && self.tournament_id.is_none_or(|t| entry.tournament_id == t)
    }
}

/// Accepts milliseconds since the epoch or an RFC 3339 date.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ManagementError> {
    let raw = raw.trim();
    if let Ok(millis) = raw.parse::<i64>() {
        return Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| ManagementError::InvalidTimestamp(raw.to_string()));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| ManagementError::InvalidTimestamp(raw.to_string()))
}

/// Log lines grouped by tournament and round.
pub type History = BTreeMap<u64, BTreeMap<u64, Vec<String>>>;

#[derive(Debug)]
pub struct LogStore {
    capacity: usize,
    entries: VecDeque<LogEntry>,
}

impl LogStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    /// Appends an entry, dropping the oldest one when full.
    pub fn push(&mut self, entry: LogEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn since(&self, ts: DateTime<Utc>) -> Vec<LogEntry> {
        self.entries
            .iter()
            .filter(|e| e.timestamp > ts)
            .cloned()
            .collect()
    }

    pub fn filter(&self, filter: &LogFilter) -> Vec<LogEntry> {
        let mut found: Vec<LogEntry> = self
            .entries
            .iter()
            .filter(|e| filter.accepts(e))
            .cloned()
            .collect();
        if filter.order == Order::Desc {
            found.reverse();
        }
        if filter.limit > 0 {
            found.truncate(filter.limit);
        }
        found
    }

    pub fn history(&self) -> History {
        let mut history = History::new();
        for e in &self.entries {
            history
                .entry(e.tournament_id)
                .or_default()
                .entry(e.round_id)
                .or_default()
                .push(e.message.clone());
        }
        history
    }

    /// Ids of the most recent log line, zeros when nothing was logged yet.
    pub fn latest_ids(&self) -> LatestIds {
        self.entries
            .back()
            .map(|e| LatestIds {
                tournament_id: e.tournament_id,
                round_id: e.round_id,
            })
            .unwrap_or_default()
    }
}

use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::cards::Card;
use crate::player::PlayerAction;
use crate::pot::Payout;

/// A betting street in Texas Hold'em.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum Street {
    Preflop,
    Flop,
    Turn,
    River,
}

/// One human-readable line of a round's log.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct RoundLogEntry {
    pub round: u64,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// Append-only log sink for one round. Appending never fails; every line is
/// mirrored to `tracing`.
#[derive(Debug, Default, Clone)]
pub struct RoundLog {
    round: u64,
    entries: Vec<RoundLogEntry>,
}

impl RoundLog {
    pub fn new(round: u64) -> Self {
        Self {
            round,
            entries: Vec::new(),
        }
    }

    pub fn log(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(round = self.round, "{}", message);
        self.entries.push(RoundLogEntry {
            round: self.round,
            timestamp: Utc::now(),
            message,
        });
    }

    pub fn entries(&self) -> &[RoundLogEntry] {
        &self.entries
    }

    pub fn messages(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.message.as_str()).collect()
    }

    pub fn into_entries(self) -> Vec<RoundLogEntry> {
        self.entries
    }
}

/// A single player action during a hand.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub player: String,
    pub street: Street,
    pub action: PlayerAction,
}

/// Summary of one played hand, one JSON object per line in a hand log.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct HandRecord {
    pub tournament_id: u64,
    pub round: u64,
    pub actions: Vec<ActionRecord>,
    pub board: Vec<Card>,
    pub payouts: Vec<Payout>,
    #[serde(default)]
    pub ts: Option<String>,
}

pub struct HandRecordWriter {
    writer: BufWriter<File>,
}

impl HandRecordWriter {
    /// Opens `path` for appending, creating parent directories as needed.
    pub fn append<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent)?;
            }
        }
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(f),
        })
    }

    pub fn write(&mut self, record: &HandRecord) -> std::io::Result<()> {
        let mut rec = record.clone();
        if rec.ts.is_none() {
            rec.ts = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
        }
        let line = serde_json::to_string(&rec).map_err(std::io::Error::other)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_log_tags_entries_with_the_round() {
        let mut log = RoundLog::new(7);
        log.log("Starting round 7.");
        log.log(format!("Player {} folds.", "a"));
        assert_eq!(log.messages(), vec!["Starting round 7.", "Player a folds."]);
        assert!(log.entries().iter().all(|e| e.round == 7));
    }
}

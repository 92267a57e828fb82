use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use dealer_engine::table::Table;
use dealer_engine::tournament::{Seat, TournamentOutcome, POINTS};
use serde::Serialize;

use crate::errors::ManagementError;
use crate::players::{guarded, GuardedPlayer, TeamKind, TeamPlayer, WebsocketPlayer};
use crate::store::{History, LatestIds, LogEntry, LogFilter, LogStore};

pub type GameId = u64;

const MAX_TEAM_NAME: usize = 64;

pub fn validate_team_name(name: &str) -> Result<&str, ManagementError> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed.len() > MAX_TEAM_NAME
        || trimmed.contains('/')
        || trimmed.chars().any(char::is_control)
    {
        return Err(ManagementError::InvalidTeamName(name.to_string()));
    }
    Ok(trimmed)
}

pub struct Team {
    pub name: String,
    pub player: GuardedPlayer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamInfo {
    pub name: String,
    #[serde(flatten)]
    pub kind: TeamKind,
    pub strikes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScorePoint {
    pub tournament_id: u64,
    pub timestamp: DateTime<Utc>,
    /// Total points of the team after this tournament.
    pub score: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub id: GameId,
    pub name: String,
    pub running: bool,
    pub teams: usize,
    pub tournaments_played: u64,
}

/// Table states of one tournament.
#[derive(Debug, Clone, Default)]
struct TournamentRecord {
    latest: Option<Table>,
    rounds: BTreeMap<u64, Table>,
    outcome: Option<TournamentOutcome>,
}

/// One game: a set of teams playing tournament after tournament, with the
/// scores and logs they leave behind.
pub struct Game {
    id: GameId,
    name: String,
    max_teams: usize,
    tournament_history: usize,
    running: AtomicBool,
    next_tournament_id: AtomicU64,
    teams: RwLock<Vec<Team>>,
    tournaments: RwLock<VecDeque<(u64, TournamentRecord)>>,
    scores: RwLock<BTreeMap<String, u64>>,
    score_history: RwLock<BTreeMap<String, Vec<ScorePoint>>>,
    log: RwLock<LogStore>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl Game {
    pub fn new(
        id: GameId,
        name: impl Into<String>,
        max_teams: usize,
        tournament_history: usize,
        log_capacity: usize,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            max_teams,
            tournament_history: tournament_history.max(1),
            running: AtomicBool::new(false),
            next_tournament_id: AtomicU64::new(1),
            teams: RwLock::new(Vec::new()),
            tournaments: RwLock::new(VecDeque::new()),
            scores: RwLock::new(BTreeMap::new()),
            score_history: RwLock::new(BTreeMap::new()),
            log: RwLock::new(LogStore::new(log_capacity)),
        }
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    pub fn summary(&self) -> GameSummary {
        GameSummary {
            id: self.id,
            name: self.name.clone(),
            running: self.is_running(),
            teams: read(&self.teams).len(),
            tournaments_played: self.next_tournament_id.load(Ordering::Acquire) - 1,
        }
    }

    // --- teams ---

    pub fn add_team(&self, name: &str, player: TeamPlayer) -> Result<(), ManagementError> {
        let name = validate_team_name(name)?;
        let mut teams = write(&self.teams);
        if teams.iter().any(|t| t.name == name) {
            return Err(ManagementError::DuplicateTeam(name.to_string()));
        }
        self.push_team(&mut teams, name, player)
    }

    /// Returns the websocket player of `name`, registering it when the team
    /// is new. A team registered with a url cannot connect over a websocket.
    pub fn websocket_team(
        &self,
        name: &str,
        create: impl FnOnce(&str) -> WebsocketPlayer,
    ) -> Result<WebsocketPlayer, ManagementError> {
        let name = validate_team_name(name)?;
        let mut teams = write(&self.teams);
        if let Some(team) = teams.iter().find(|t| t.name == name) {
            return match team.player.inner() {
                TeamPlayer::Websocket(p) => Ok(p.clone()),
                TeamPlayer::Remote(_) => Err(ManagementError::NotWebsocketTeam(name.to_string())),
            };
        }
        let player = create(name);
        self.push_team(&mut teams, name, TeamPlayer::Websocket(player.clone()))?;
        Ok(player)
    }

    fn push_team(
        &self,
        teams: &mut Vec<Team>,
        name: &str,
        player: TeamPlayer,
    ) -> Result<(), ManagementError> {
        if teams.len() >= self.max_teams {
            return Err(ManagementError::TooManyTeams {
                team: name.to_string(),
                max: self.max_teams,
            });
        }
        teams.push(Team {
            name: name.to_string(),
            player: guarded(player),
        });
        tracing::info!(game_id = self.id, team = name, "team registered");
        Ok(())
    }

    pub fn remove_team(&self, name: &str) -> Result<(), ManagementError> {
        let mut teams = write(&self.teams);
        let before = teams.len();
        teams.retain(|t| t.name != name.trim());
        if teams.len() == before {
            return Err(ManagementError::TeamNotFound(name.to_string()));
        }
        tracing::info!(game_id = self.id, team = name, "team removed");
        Ok(())
    }

    pub fn team_names(&self) -> Vec<String> {
        read(&self.teams).iter().map(|t| t.name.clone()).collect()
    }

    pub fn teams(&self) -> Vec<TeamInfo> {
        read(&self.teams)
            .iter()
            .map(|t| TeamInfo {
                name: t.name.clone(),
                kind: t.player.inner().kind(),
                strikes: t.player.strikes(),
            })
            .collect()
    }

    /// Seats for the next tournament, in registration order.
    pub fn seats(&self) -> Vec<Seat<GuardedPlayer>> {
        read(&self.teams)
            .iter()
            .map(|t| Seat::new(t.name.clone(), t.player.clone()))
            .collect()
    }

    // --- tournaments ---

    /// Reserves the id of the next tournament and starts its record. Only
    /// the last `tournament_history` tournaments are kept.
    pub fn begin_tournament(&self) -> u64 {
        let id = self.next_tournament_id.fetch_add(1, Ordering::AcqRel);
        let mut tournaments = write(&self.tournaments);
        tournaments.push_back((id, TournamentRecord::default()));
        while tournaments.len() > self.tournament_history {
            tournaments.pop_front();
        }
        id
    }

    fn with_tournament(&self, tournament_id: u64, f: impl FnOnce(&mut TournamentRecord)) {
        let mut tournaments = write(&self.tournaments);
        if let Some((_, record)) = tournaments.iter_mut().find(|(id, _)| *id == tournament_id) {
            f(record);
        }
    }

    pub fn record_street(&self, table: &Table) {
        self.with_tournament(table.tournament_id, |record| record.latest = Some(table.clone()));
    }

    pub fn record_round(&self, round: u64, table: &Table) {
        self.with_tournament(table.tournament_id, |record| {
            record.latest = Some(table.clone());
            record.rounds.insert(round, table.clone());
        });
    }

    pub fn record_outcome(&self, outcome: &TournamentOutcome) {
        self.with_tournament(outcome.tournament_id, |record| {
            record.outcome = Some(outcome.clone())
        });
    }

    pub fn tournament_ids(&self) -> Vec<u64> {
        read(&self.tournaments).iter().map(|(id, _)| *id).collect()
    }

    /// Result of a finished or stopped tournament still in the history.
    pub fn outcome(&self, tournament_id: u64) -> Result<TournamentOutcome, ManagementError> {
        read(&self.tournaments)
            .iter()
            .find(|(id, _)| *id == tournament_id)
            .and_then(|(_, r)| r.outcome.clone())
            .ok_or(ManagementError::NoOutcome(tournament_id))
    }

    pub fn state_of_tournament(&self, tournament_id: u64) -> Result<Table, ManagementError> {
        read(&self.tournaments)
            .iter()
            .find(|(id, _)| *id == tournament_id)
            .and_then(|(_, r)| r.latest.clone())
            .ok_or(ManagementError::NoTableState {
                tournament_id,
                round: None,
            })
    }

    pub fn state_of_round(&self, tournament_id: u64, round: u64) -> Result<Table, ManagementError> {
        read(&self.tournaments)
            .iter()
            .find(|(id, _)| *id == tournament_id)
            .and_then(|(_, r)| r.rounds.get(&round).cloned())
            .ok_or(ManagementError::NoTableState {
                tournament_id,
                round: Some(round),
            })
    }

    // --- scores ---

    /// Awards [`POINTS`] to every winner of a completed tournament.
    pub fn award(&self, tournament_id: u64, winners: &[String]) {
        let now = Utc::now();
        let mut scores = write(&self.scores);
        let mut history = write(&self.score_history);
        for winner in winners {
            let score = scores.entry(winner.clone()).or_insert(0);
            *score += POINTS;
            history.entry(winner.clone()).or_default().push(ScorePoint {
                tournament_id,
                timestamp: now,
                score: *score,
            });
        }
    }

    pub fn scores(&self) -> BTreeMap<String, u64> {
        read(&self.scores).clone()
    }

    pub fn score_history(&self) -> BTreeMap<String, Vec<ScorePoint>> {
        read(&self.score_history).clone()
    }

    // --- log ---

    pub fn push_log(&self, entry: LogEntry) {
        write(&self.log).push(entry);
    }

    pub fn log_since(&self, ts: DateTime<Utc>) -> Vec<LogEntry> {
        read(&self.log).since(ts)
    }

    pub fn filter_log(&self, filter: &LogFilter) -> Vec<LogEntry> {
        read(&self.log).filter(filter)
    }

    pub fn history(&self) -> History {
        read(&self.log).history()
    }

    pub fn latest_ids(&self) -> LatestIds {
        read(&self.log).latest_ids()
    }
}

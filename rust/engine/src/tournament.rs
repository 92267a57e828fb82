use std::thread;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::deck::Deck;
use crate::errors::EngineError;
use crate::logger::{RoundLogEntry, Street};
use crate::player::{Player, Status};
use crate::provider::ActionProvider;
use crate::round::{GameRound, RoundReport};
use crate::table::Table;

pub const START_STACK: u32 = 100;
pub const START_SMALL_BLIND: u32 = 5;
/// Points a team earns for every tournament it survives.
pub const POINTS: u64 = 1;

/// A named participant and its decision source.
pub struct Seat<P> {
    pub name: String,
    pub provider: P,
}

impl<P> Seat<P> {
    pub fn new(name: impl Into<String>, provider: P) -> Self {
        Self {
            name: name.into(),
            provider,
        }
    }
}

/// Receives everything a running tournament publishes.
pub trait TournamentObserver {
    fn street_completed(&mut self, _round: u64, _street: Street, _table: &Table) {}
    fn round_completed(&mut self, report: &RoundReport);
    fn tournament_finished(&mut self, _outcome: &TournamentOutcome) {}
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct TournamentOutcome {
    pub tournament_id: u64,
    pub rounds_played: u64,
    /// Players still in when the tournament ended. Empty if it was stopped.
    pub winners: Vec<String>,
    pub completed: bool,
    pub log: Vec<RoundLogEntry>,
}

/// One table played down to a single survivor.
pub struct Tournament<P> {
    providers: Vec<P>,
    table: Table,
    round_delay: Duration,
    step_delay: Duration,
    seed: Option<u64>,
}

impl<P: ActionProvider> Tournament<P> {
    pub fn new(tournament_id: u64, seats: Vec<Seat<P>>) -> Result<Self, EngineError> {
        if seats.len() < 2 {
            return Err(EngineError::NotEnoughPlayers(seats.len()));
        }
        let mut players = Vec::with_capacity(seats.len());
        let mut providers = Vec::with_capacity(seats.len());
        for seat in seats {
            players.push(Player::new(seat.name, START_STACK));
            providers.push(seat.provider);
        }
        Ok(Self {
            providers,
            table: Table::new(tournament_id, players, START_SMALL_BLIND),
            round_delay: Duration::ZERO,
            step_delay: Duration::ZERO,
            seed: None,
        })
    }

    /// Sleeps `round_delay` between rounds and `step_delay` between streets.
    pub fn with_pacing(mut self, round_delay: Duration, step_delay: Duration) -> Self {
        self.round_delay = round_delay;
        self.step_delay = step_delay;
        self
    }

    /// Shuffles round `n` with `seed + n` instead of OS entropy.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn id(&self) -> u64 {
        self.table.tournament_id
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Plays rounds until one player is left or `should_stop` returns true.
    /// `should_stop` is only consulted between rounds.
    pub fn run(
        &mut self,
        observer: &mut dyn TournamentObserver,
        should_stop: &dyn Fn() -> bool,
    ) -> Result<TournamentOutcome, EngineError> {
        let tournament_id = self.id();
        tracing::info!(tournament_id, players = self.table.players.len(), "tournament started");

        let mut rounds_played = 0;
        let mut completed = true;
        while self.table.seated_count() > 1 {
            if should_stop() {
                tracing::info!(tournament_id, rounds_played, "tournament stopped");
                completed = false;
                break;
            }

            let mut deck = match self.seed {
                Some(seed) => Deck::new_with_seed(seed.wrapping_add(self.table.round)),
                None => Deck::new(),
            };
            let round = self.table.round;
            let report = GameRound::new(self.step_delay)
                .play(&mut self.table, &mut deck, &self.providers, &mut |street: Street, table: &Table| {
                    observer.street_completed(round, street, table)
                })
                .inspect_err(|err| {
                    tracing::error!(tournament_id, round, error = %err, "tournament aborted");
                })?;
            rounds_played += 1;
            observer.round_completed(&report);

            if !self.round_delay.is_zero() && self.table.seated_count() > 1 {
                thread::sleep(self.round_delay);
            }
        }

        let winners: Vec<String> = if completed {
            self.table
                .players
                .iter()
                .filter(|p| p.status != Status::Out)
                .map(|p| p.name.clone())
                .collect()
        } else {
            Vec::new()
        };
        let last_round = self.table.round.saturating_sub(1);
        let log = winners
            .iter()
            .map(|name| {
                tracing::info!(tournament_id, winner = %name, "tournament won");
                RoundLogEntry {
                    round: last_round,
                    timestamp: Utc::now(),
                    message: format!("Player {name} won the tournament!"),
                }
            })
            .collect();

        let outcome = TournamentOutcome {
            tournament_id,
            rounds_played,
            winners,
            completed,
            log,
        };
        observer.tournament_finished(&outcome);
        Ok(outcome)
    }
}

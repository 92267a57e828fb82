//! Game registry and the per-game tournament scheduler.
//!
//! A running game plays tournaments back to back. Each tournament runs on a
//! blocking worker because decision sources answer synchronously; the async
//! side only waits for the worker, sleeps between tournaments and listens for
//! the pause signal.
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use dealer_engine::errors::EngineError;
use dealer_engine::logger::{HandRecordWriter, RoundLogEntry, Street};
use dealer_engine::round::RoundReport;
use dealer_engine::table::Table;
use dealer_engine::tournament::{Seat, Tournament, TournamentObserver, TournamentOutcome};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::config::DealerConfig;
use crate::errors::ManagementError;
use crate::events::{EventBus, GameEvent};
use crate::game::{Game, GameId, GameSummary};
use crate::players::{GuardedPlayer, RemotePlayer, TeamPlayer, WebsocketPlayer};
use crate::server::ServerError;
use crate::store::LogEntry;

type SharedWriter = Arc<Mutex<HandRecordWriter>>;

struct GameSlot {
    game: Arc<Game>,
    stop: Option<CancellationToken>,
    // held by whichever scheduler is playing, so a quick pause and resume
    // never runs two tournaments of one game at once
    table: Arc<tokio::sync::Mutex<()>>,
}

#[derive(Clone)]
struct Pacing {
    tournament_interval: Duration,
    round_delay: Duration,
    step_delay: Duration,
}

pub struct GameManager {
    config: DealerConfig,
    games: RwLock<BTreeMap<GameId, GameSlot>>,
    next_id: AtomicU64,
    events: EventBus,
    client: reqwest::Client,
    runtime: Handle,
    hand_log: Option<SharedWriter>,
}

impl GameManager {
    pub fn new(config: DealerConfig, events: EventBus, runtime: Handle) -> Result<Self, ServerError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.player_timeout)
            .timeout(config.player_timeout)
            .build()?;
        let hand_log = match &config.hand_log_path {
            Some(path) => {
                let writer = HandRecordWriter::append(path).map_err(|source| ServerError::HandLog {
                    path: path.clone(),
                    source,
                })?;
                Some(Arc::new(Mutex::new(writer)))
            }
            None => None,
        };
        Ok(Self {
            config,
            games: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            events,
            client,
            runtime,
            hand_log,
        })
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn create_game(&self, name: &str) -> GameId {
        let id = self.next_id.fetch_add(1, Ordering::AcqRel);
        let name = match name.trim() {
            "" => format!("Game {id}"),
            trimmed => trimmed.to_string(),
        };
        let game = Game::new(
            id,
            name.clone(),
            self.config.max_teams,
            self.config.tournament_history,
            self.config.log_capacity,
        );
        self.write_games().insert(
            id,
            GameSlot {
                game: Arc::new(game),
                stop: None,
                table: Arc::new(tokio::sync::Mutex::new(())),
            },
        );
        tracing::info!(game_id = id, name = %name, "game created");
        id
    }

    pub fn game(&self, id: GameId) -> Result<Arc<Game>, ManagementError> {
        self.read_games()
            .get(&id)
            .map(|slot| Arc::clone(&slot.game))
            .ok_or(ManagementError::GameNotFound(id))
    }

    /// All games, sorted by name.
    pub fn list(&self) -> Vec<GameSummary> {
        let mut games: Vec<GameSummary> = self.read_games().values().map(|s| s.game.summary()).collect();
        games.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        games
    }

    pub fn is_running(&self, id: GameId) -> Result<bool, ManagementError> {
        self.game(id).map(|g| g.is_running())
    }

    /// Starts the scheduler of a stopped game. Resuming a running game does
    /// nothing.
    pub fn resume(&self, id: GameId) -> Result<(), ManagementError> {
        let mut games = self.write_games();
        let slot = games.get_mut(&id).ok_or(ManagementError::GameNotFound(id))?;
        if slot.stop.is_some() {
            return Ok(());
        }

        let token = CancellationToken::new();
        slot.stop = Some(token.clone());
        slot.game.set_running(true);

        let scheduler = Scheduler {
            game: Arc::clone(&slot.game),
            table: Arc::clone(&slot.table),
            events: self.events.clone(),
            hand_log: self.hand_log.clone(),
            pacing: Pacing {
                tournament_interval: self.config.tournament_interval,
                round_delay: self.config.round_delay,
                step_delay: self.config.step_delay,
            },
            stop: token,
        };
        self.runtime.spawn(scheduler.run());

        tracing::info!(game_id = id, "game resumed");
        self.events.broadcast(id, GameEvent::StateChanged { running: true });
        Ok(())
    }

    /// Stops a running game after its current round.
    pub fn pause(&self, id: GameId) -> Result<(), ManagementError> {
        let mut games = self.write_games();
        let slot = games.get_mut(&id).ok_or(ManagementError::GameNotFound(id))?;
        if let Some(token) = slot.stop.take() {
            token.cancel();
            slot.game.set_running(false);
            tracing::info!(game_id = id, "game paused");
            self.events.broadcast(id, GameEvent::StateChanged { running: false });
        }
        Ok(())
    }

    /// Pauses a running game and resumes a stopped one. Returns whether the
    /// game is running afterwards.
    pub fn toggle_run(&self, id: GameId) -> Result<bool, ManagementError> {
        if self.is_running(id)? {
            self.pause(id)?;
            Ok(false)
        } else {
            self.resume(id)?;
            Ok(true)
        }
    }

    pub fn delete(&self, id: GameId) -> Result<(), ManagementError> {
        let slot = self
            .write_games()
            .remove(&id)
            .ok_or(ManagementError::GameNotFound(id))?;
        if let Some(token) = slot.stop {
            token.cancel();
        }
        slot.game.set_running(false);
        self.events.drop_game(id);
        tracing::info!(game_id = id, "game deleted");
        Ok(())
    }

    /// Pauses every game, used on shutdown.
    pub fn stop_all(&self) {
        let mut games = self.write_games();
        for slot in games.values_mut() {
            if let Some(token) = slot.stop.take() {
                token.cancel();
                slot.game.set_running(false);
            }
        }
    }

    pub fn register_remote(&self, id: GameId, team: &str, url: &str) -> Result<(), ManagementError> {
        let game = self.game(id)?;
        let player = RemotePlayer::new(
            url,
            self.client.clone(),
            self.config.player_timeout,
            self.runtime.clone(),
        )?;
        game.add_team(team, TeamPlayer::Remote(player))
    }

    /// Finds or creates the websocket team a connecting bot attaches to.
    pub fn register_websocket(&self, id: GameId, team: &str) -> Result<WebsocketPlayer, ManagementError> {
        let game = self.game(id)?;
        let timeout = self.config.player_timeout;
        let runtime = self.runtime.clone();
        game.websocket_team(team, |name| WebsocketPlayer::new(name, timeout, runtime))
    }

    pub fn remove_team(&self, id: GameId, team: &str) -> Result<(), ManagementError> {
        self.game(id)?.remove_team(team)
    }

    fn read_games(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<GameId, GameSlot>> {
        self.games.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_games(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<GameId, GameSlot>> {
        self.games.write().unwrap_or_else(PoisonError::into_inner)
    }
}

struct Scheduler {
    game: Arc<Game>,
    table: Arc<tokio::sync::Mutex<()>>,
    events: EventBus,
    hand_log: Option<SharedWriter>,
    pacing: Pacing,
    stop: CancellationToken,
}

impl Scheduler {
    async fn run(self) {
        let game_id = self.game.id();
        tracing::debug!(game_id, "scheduler started");

        while !self.stop.is_cancelled() {
            let seats = self.game.seats();
            if seats.len() < 2 {
                tracing::debug!(game_id, teams = seats.len(), "waiting for teams");
            } else {
                let _turn = self.table.lock().await;
                if self.stop.is_cancelled() {
                    break;
                }
                let worker = {
                    let game = Arc::clone(&self.game);
                    let events = self.events.clone();
                    let hand_log = self.hand_log.clone();
                    let pacing = self.pacing.clone();
                    let stop = self.stop.clone();
                    tokio::task::spawn_blocking(move || {
                        play_tournament(&game, seats, &events, hand_log, &pacing, &stop)
                    })
                };
                match worker.await {
                    Ok(Ok(outcome)) => tracing::info!(
                        game_id,
                        tournament_id = outcome.tournament_id,
                        rounds = outcome.rounds_played,
                        winners = ?outcome.winners,
                        "tournament finished"
                    ),
                    Ok(Err(err)) => tracing::error!(game_id, error = %err, "tournament aborted"),
                    Err(err) => tracing::error!(game_id, error = %err, "tournament worker failed"),
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.pacing.tournament_interval) => {}
                _ = self.stop.cancelled() => break,
            }
        }

        tracing::debug!(game_id, "scheduler stopped");
    }
}

fn play_tournament(
    game: &Arc<Game>,
    seats: Vec<Seat<GuardedPlayer>>,
    events: &EventBus,
    hand_log: Option<SharedWriter>,
    pacing: &Pacing,
    stop: &CancellationToken,
) -> Result<TournamentOutcome, EngineError> {
    let tournament_id = game.begin_tournament();
    let mut tournament =
        Tournament::new(tournament_id, seats)?.with_pacing(pacing.round_delay, pacing.step_delay);
    let mut observer = GameObserver {
        game: Arc::clone(game),
        events: events.clone(),
        hand_log,
        tournament_id,
    };
    tournament.run(&mut observer, &|| stop.is_cancelled())
}

/// Turns what a tournament publishes into stored state, log lines, events,
/// scores and hand records.
pub struct GameObserver {
    game: Arc<Game>,
    events: EventBus,
    hand_log: Option<SharedWriter>,
    tournament_id: u64,
}

impl GameObserver {
    fn publish(&self, entries: &[RoundLogEntry]) {
        for e in entries {
            let entry = LogEntry {
                timestamp: e.timestamp,
                game_id: self.game.id(),
                tournament_id: self.tournament_id,
                round_id: e.round,
                message: e.message.clone(),
            };
            self.game.push_log(entry.clone());
            self.events.broadcast(self.game.id(), GameEvent::Log(entry));
        }
    }
}

impl TournamentObserver for GameObserver {
    fn street_completed(&mut self, _round: u64, _street: Street, table: &Table) {
        self.game.record_street(table);
    }

    fn round_completed(&mut self, report: &RoundReport) {
        self.game.record_round(report.round, &report.table);
        self.publish(&report.log);

        if let Some(writer) = &self.hand_log {
            let mut writer = writer.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(err) = writer.write(&report.record) {
                tracing::warn!(game_id = self.game.id(), error = %err, "failed to write hand record");
            }
        }

        self.events.broadcast(
            self.game.id(),
            GameEvent::RoundCompleted {
                tournament_id: self.tournament_id,
                round: report.round,
            },
        );
    }

    fn tournament_finished(&mut self, outcome: &TournamentOutcome) {
        self.publish(&outcome.log);
        self.game.record_outcome(outcome);
        if outcome.completed {
            self.game.award(outcome.tournament_id, &outcome.winners);
        }
        self.events.broadcast(
            self.game.id(),
            GameEvent::TournamentFinished {
                tournament_id: outcome.tournament_id,
                winners: outcome.winners.clone(),
            },
        );
    }
}

//! # dealer-server: tournament dealer service for poker bots
//!
//! Hosts any number of games. Each game has up to ten teams, reached over
//! HTTP or a websocket, and plays no-limit Texas Hold'em tournaments between
//! them for as long as it is running. Operators manage games and read logs,
//! scores and table states through a JSON API; observers can follow a game
//! as Server-Sent Events.

pub mod config;
pub mod errors;
pub mod events;
pub mod game;
pub mod handlers;
pub mod logging;
pub mod manager;
pub mod middleware;
pub mod players;
pub mod server;
pub mod store;

pub use config::{CliArgs, ConfigError, ConfigResolved, ConfigSources, DealerConfig, ValueSource};
pub use errors::{ErrorResponse, ErrorSeverity, IntoErrorResponse, ManagementError};
pub use events::{EventBus, EventSubscription, GameEvent};
pub use game::{Game, GameId, GameSummary, ScorePoint, TeamInfo};
pub use logging::{init_logging, CapturedLog, TestLogSubscriber};
pub use manager::{GameManager, GameObserver};
pub use middleware::{log_response, with_request_logging};
pub use players::{RemotePlayer, TeamKind, TeamPlayer, WebsocketPlayer};
pub use server::{AppContext, DealerServer, ServerError, ServerHandle};
pub use store::{LatestIds, LogEntry, LogFilter, LogStore, Order};

//! Decision sources for registered teams.
//!
//! A team is either an HTTP bot ([`RemotePlayer`]) or a bot that keeps a
//! websocket open to the dealer ([`WebsocketPlayer`]). Both are wrapped in a
//! [`StrikeGuard`] that lives as long as the team, so strikes and blocks
//! follow the team from round to round.
pub mod remote;
pub mod websocket;

use std::sync::Arc;

use dealer_engine::errors::ProviderError;
use dealer_engine::provider::{ActionProvider, StrikeGuard};
use dealer_engine::table::Table;
use serde::Serialize;

pub use remote::{normalize_url, RemotePlayer};
pub use websocket::{ReplyQueue, SessionEnds, WebsocketPlayer};

#[derive(Debug, Clone)]
pub enum TeamPlayer {
    Remote(RemotePlayer),
    Websocket(WebsocketPlayer),
}

impl TeamPlayer {
    pub fn kind(&self) -> TeamKind {
        match self {
            TeamPlayer::Remote(p) => TeamKind::Remote {
                url: p.url().to_string(),
            },
            TeamPlayer::Websocket(p) => TeamKind::Websocket {
                connected: p.is_connected(),
            },
        }
    }
}

impl ActionProvider for TeamPlayer {
    fn request_bet(&self, table: &Table) -> Result<u32, ProviderError> {
        match self {
            TeamPlayer::Remote(p) => p.request_bet(table),
            TeamPlayer::Websocket(p) => p.request_bet(table),
        }
    }
}

/// How a team is reached, as reported by the management API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TeamKind {
    Remote { url: String },
    Websocket { connected: bool },
}

pub type GuardedPlayer = Arc<StrikeGuard<TeamPlayer>>;

pub fn guarded(player: TeamPlayer) -> GuardedPlayer {
    Arc::new(StrikeGuard::new(player))
}

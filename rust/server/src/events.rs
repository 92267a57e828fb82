use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::game::GameId;
use crate::store::LogEntry;

// Bounded so a stalled SSE client cannot grow memory; it is dropped instead.
const EVENT_CHANNEL_BUFFER: usize = 1000;

pub type EventSender = mpsc::Sender<GameEvent>;
pub type EventReceiver = mpsc::Receiver<GameEvent>;

/// Everything observers of a game can be told about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    Log(LogEntry),
    RoundCompleted {
        tournament_id: u64,
        round: u64,
    },
    TournamentFinished {
        tournament_id: u64,
        winners: Vec<String>,
    },
    StateChanged {
        running: bool,
    },
}

pub struct EventSubscription {
    bus: EventBus,
    game_id: GameId,
    subscriber_id: usize,
    pub receiver: EventReceiver,
}

impl EventSubscription {
    pub fn receiver(&mut self) -> &mut EventReceiver {
        &mut self.receiver
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.game_id, self.subscriber_id);
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventBus {
    inner: Arc<EventBusInner>,
}

#[derive(Debug, Default)]
struct EventBusInner {
    subscribers: RwLock<HashMap<GameId, Vec<(usize, EventSender)>>>,
    next_id: AtomicUsize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, game_id: GameId) -> EventSubscription {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_BUFFER);
        let id = self.inner.next_id.fetch_add(1, Ordering::AcqRel);
        self.inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(game_id)
            .or_default()
            .push((id, tx));

        tracing::info!(game_id, subscriber_id = id, "client subscribed to game events");

        EventSubscription {
            bus: self.clone(),
            game_id,
            subscriber_id: id,
            receiver: rx,
        }
    }

    pub fn broadcast(&self, game_id: GameId, event: GameEvent) {
        let subscribers = self
            .inner
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&game_id)
            .cloned();

        let Some(list) = subscribers else {
            return;
        };

        let mut failed = Vec::new();
        for (id, sender) in list {
            if let Err(e) = sender.try_send(event.clone()) {
                tracing::warn!(
                    game_id,
                    subscriber_id = id,
                    error = %e,
                    "dropping event subscriber"
                );
                failed.push(id);
            }
        }
        if !failed.is_empty() {
            self.remove_subscribers(game_id, &failed);
        }
    }

    pub fn unsubscribe(&self, game_id: GameId, subscriber_id: usize) {
        self.remove_subscribers(game_id, &[subscriber_id]);
    }

    /// Forgets every subscriber of a deleted game; their streams end.
    pub fn drop_game(&self, game_id: GameId) {
        self.inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&game_id);
    }

    /// Ends every open stream, used on shutdown.
    pub fn close_all(&self) {
        self.inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }

    fn remove_subscribers(&self, game_id: GameId, ids: &[usize]) {
        let mut guard = self
            .inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(list) = guard.get_mut(&game_id) {
            list.retain(|(id, _)| !ids.contains(id));
            if list.is_empty() {
                guard.remove(&game_id);
            }
        }
    }
}

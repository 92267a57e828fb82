use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dealer_engine::errors::ProviderError;
use dealer_engine::provider::ActionProvider;
use dealer_engine::table::Table;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Replies a bot may have queued before the dealer reads them.
pub const REPLY_QUEUE: usize = 3;

type Replies = Arc<tokio::sync::Mutex<mpsc::Receiver<String>>>;

struct Session {
    id: u64,
    outgoing: mpsc::Sender<String>,
    replies: Replies,
}

/// The socket side of an attached session, driven by the websocket handler.
pub struct SessionEnds {
    pub id: u64,
    /// Table states to forward to the bot.
    pub outgoing: mpsc::Receiver<String>,
    pub replies: ReplyQueue,
}

/// Bounded queue of text frames received from the bot.
pub struct ReplyQueue {
    session: u64,
    tx: mpsc::Sender<String>,
}

impl ReplyQueue {
    /// Frames beyond the queue size are dropped. Returns false once the
    /// session has been replaced.
    pub fn push(&self, text: String) -> bool {
        match self.tx.try_send(text) {
            Ok(()) => true,
            Err(TrySendError::Full(dropped)) => {
                tracing::warn!(session = self.session, reply = %dropped, "reply queue full, dropping message");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

/// A bot connected over a websocket. The player outlives its connections:
/// a reconnect under the same team name attaches a new session.
#[derive(Clone)]
pub struct WebsocketPlayer {
    inner: Arc<Inner>,
}

struct Inner {
    team: String,
    timeout: Duration,
    runtime: Handle,
    session: Mutex<Option<Session>>,
    next_session: AtomicU64,
}

impl std::fmt::Debug for WebsocketPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebsocketPlayer")
            .field("team", &self.inner.team)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl WebsocketPlayer {
    pub fn new(team: impl Into<String>, timeout: Duration, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(Inner {
                team: team.into(),
                timeout,
                runtime,
                session: Mutex::new(None),
                next_session: AtomicU64::new(1),
            }),
        }
    }

    pub fn team(&self) -> &str {
        &self.inner.team
    }

    pub fn is_connected(&self) -> bool {
        self.lock_session().is_some()
    }

    /// Replaces any previous session; its socket stops receiving tables.
    pub fn attach(&self) -> SessionEnds {
        let id = self.inner.next_session.fetch_add(1, Ordering::Relaxed);
        let (out_tx, out_rx) = mpsc::channel(1);
        let (reply_tx, reply_rx) = mpsc::channel(REPLY_QUEUE);
        *self.lock_session() = Some(Session {
            id,
            outgoing: out_tx,
            replies: Arc::new(tokio::sync::Mutex::new(reply_rx)),
        });
        tracing::info!(team = %self.inner.team, session = id, "websocket player attached");
        SessionEnds {
            id,
            outgoing: out_rx,
            replies: ReplyQueue {
                session: id,
                tx: reply_tx,
            },
        }
    }

    /// Marks the player inactive unless a newer session took over.
    pub fn detach(&self, session_id: u64) {
        let mut session = self.lock_session();
        if session.as_ref().is_some_and(|s| s.id == session_id) {
            *session = None;
            tracing::info!(team = %self.inner.team, session = session_id, "websocket player detached");
        }
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Sending the table and waiting for the answer share one deadline, so a
    /// bot that stops reading its socket times out like a silent one.
    async fn exchange(
        outgoing: mpsc::Sender<String>,
        replies: Replies,
        table_json: String,
        timeout: Duration,
    ) -> Result<u32, ProviderError> {
        let ask = async {
            let mut replies = replies.lock().await;
            // answers that arrived after an earlier timeout belong to an old question
            while replies.try_recv().is_ok() {}

            outgoing
                .send(table_json)
                .await
                .map_err(|_| ProviderError::Disconnected)?;

            match replies.recv().await {
                None => Err(ProviderError::Disconnected),
                Some(text) => parse_bet(&text),
            }
        };

        tokio::time::timeout(timeout, ask)
            .await
            .unwrap_or(Err(ProviderError::Timeout(timeout.as_millis() as u64)))
    }
}

fn parse_bet(text: &str) -> Result<u32, ProviderError> {
    text.trim()
        .parse::<i64>()
        .map(|bet| bet.clamp(0, i64::from(u32::MAX)) as u32)
        .map_err(|_| ProviderError::Malformed(format!("not a number: {text:?}")))
}

impl ActionProvider for WebsocketPlayer {
    fn request_bet(&self, table: &Table) -> Result<u32, ProviderError> {
        let (outgoing, replies) = match self.lock_session().as_ref() {
            Some(s) => (s.outgoing.clone(), Arc::clone(&s.replies)),
            None => return Err(ProviderError::Disconnected),
        };
        let table_json =
            serde_json::to_string(table).map_err(|e| ProviderError::Malformed(e.to_string()))?;
        self.inner
            .runtime
            .block_on(Self::exchange(outgoing, replies, table_json, self.inner.timeout))
    }
}

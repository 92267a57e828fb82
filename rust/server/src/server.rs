use std::convert::Infallible;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use warp::filters::BoxedFilter;
use warp::reply::{Reply, Response};
use warp::{Filter, Rejection};

use crate::config::DealerConfig;
use crate::errors::{handle_rejection, InvalidBody};
use crate::events::EventBus;
use crate::game::GameId;
use crate::handlers;
use crate::manager::GameManager;
use crate::middleware::with_request_logging;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Failed to build the player http client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("Failed to open hand log {path}: {source}")]
    HandLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Shared components handed to every route.
#[derive(Clone)]
pub struct AppContext {
    config: DealerConfig,
    events: EventBus,
    games: Arc<GameManager>,
}

impl AppContext {
    /// Must be called inside a tokio runtime; schedulers and remote players
    /// run on it.
    pub fn new(config: DealerConfig) -> Result<Self, ServerError> {
        let runtime = Handle::try_current()
            .map_err(|err| ServerError::ConfigError(format!("no tokio runtime: {err}")))?;
        let events = EventBus::new();
        let games = Arc::new(GameManager::new(config.clone(), events.clone(), runtime)?);
        Ok(Self::new_with_dependencies(config, events, games))
    }

    pub fn new_with_dependencies(config: DealerConfig, events: EventBus, games: Arc<GameManager>) -> Self {
        Self {
            config,
            events,
            games,
        }
    }

    pub fn config(&self) -> &DealerConfig {
        &self.config
    }

    pub fn events(&self) -> EventBus {
        self.events.clone()
    }

    pub fn games(&self) -> Arc<GameManager> {
        Arc::clone(&self.games)
    }
}

pub struct DealerServer {
    context: AppContext,
}

impl DealerServer {
    pub fn new(config: DealerConfig) -> Result<Self, ServerError> {
        Ok(Self {
            context: AppContext::new(config)?,
        })
    }

    pub fn from_context(context: AppContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub async fn start(self) -> Result<ServerHandle, ServerError> {
        let DealerServer { context } = self;
        let bind_addr = Self::bind_addr(context.config())?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
        };

        let (addr, server_future) = warp::serve(Self::routes(&context))
            .try_bind_with_graceful_shutdown(bind_addr, shutdown_signal)
            .map_err(Self::map_warp_error)?;

        tracing::info!(%addr, "dealer listening");

        let task = tokio::spawn(async move {
            server_future.await;
            Ok(())
        });

        Ok(ServerHandle::new(addr, shutdown_tx, task, context))
    }

    fn bind_addr(config: &DealerConfig) -> Result<SocketAddr, ServerError> {
        let host = config.host.as_str();

        if let Ok(addr) = host.parse::<SocketAddr>() {
            return Ok(addr);
        }

        if let Ok(ip) = host.parse::<std::net::IpAddr>() {
            return Ok(SocketAddr::new(ip, config.port));
        }

        let candidate = format!("{}:{}", host, config.port);
        let mut addrs = candidate.to_socket_addrs().map_err(|err| {
            ServerError::ConfigError(format!("failed to resolve address `{candidate}`: {err}"))
        })?;

        addrs.next().ok_or_else(|| {
            ServerError::ConfigError(format!("failed to resolve address `{candidate}`"))
        })
    }

    fn map_warp_error(err: warp::Error) -> ServerError {
        use std::error::Error as StdError;

        if let Some(source) = err.source() {
            if let Some(io_err) = source.downcast_ref::<std::io::Error>() {
                let recreated = std::io::Error::new(io_err.kind(), io_err.to_string());
                return ServerError::BindError(recreated);
            }
        }

        ServerError::ConfigError(err.to_string())
    }

    /// Every route of the dealer, with request logging and JSON rejections.
    pub fn routes(context: &AppContext) -> BoxedFilter<(Response,)> {
        let api = Self::health_route()
            .or(Self::management_routes(context))
            .unify()
            .or(Self::query_routes(context))
            .unify()
            .or(Self::stream_routes(context))
            .unify()
            .boxed();

        with_request_logging(api)
            .recover(handle_rejection)
            .unify()
            .boxed()
    }

    fn health_route() -> BoxedFilter<(Response,)> {
        warp::path("health")
            .and(warp::get())
            .and(warp::path::end())
            .map(|| handlers::health().into_response())
            .boxed()
    }

    fn management_routes(context: &AppContext) -> BoxedFilter<(Response,)> {
        let games = context.games();

        let create = warp::path!("games" / "manage")
            .and(warp::post())
            .and(Self::with_games(games.clone()))
            .and(Self::optional_json())
            .and_then(|games: Arc<GameManager>, request: handlers::CreateGameRequest| async move {
                Ok::<_, Infallible>(handlers::create_game(games, request).await)
            });

        let toggle = warp::path!("games" / "manage" / GameId)
            .and(warp::put())
            .and(Self::with_games(games.clone()))
            .and_then(|id: GameId, games: Arc<GameManager>| async move {
                Ok::<_, Infallible>(handlers::toggle_game(games, id).await)
            });

        let delete = warp::path!("games" / "manage" / GameId)
            .and(warp::delete())
            .and(Self::with_games(games.clone()))
            .and_then(|id: GameId, games: Arc<GameManager>| async move {
                Ok::<_, Infallible>(handlers::delete_game(games, id).await)
            });

        let register = warp::path!("games" / "manage" / GameId / "players")
            .and(warp::post())
            .and(warp::query::<handlers::TeamQuery>())
            .and(Self::with_games(games.clone()))
            .and_then(
                |id: GameId, query: handlers::TeamQuery, games: Arc<GameManager>| async move {
                    Ok::<_, Infallible>(handlers::register_player(games, id, query).await)
                },
            );

        let remove = warp::path!("games" / "manage" / GameId / "players")
            .and(warp::delete())
            .and(warp::query::<handlers::TeamQuery>())
            .and(Self::with_games(games))
            .and_then(
                |id: GameId, query: handlers::TeamQuery, games: Arc<GameManager>| async move {
                    Ok::<_, Infallible>(handlers::remove_player(games, id, query).await)
                },
            );

        create
            .or(toggle)
            .unify()
            .or(delete)
            .unify()
            .or(register)
            .unify()
            .or(remove)
            .unify()
            .boxed()
    }

    fn query_routes(context: &AppContext) -> BoxedFilter<(Response,)> {
        let games = context.games();

        let list = warp::path!("games")
            .and(warp::get())
            .and(Self::with_games(games.clone()))
            .then(handlers::list_games);

        let state = warp::path!("games" / GameId)
            .and(warp::get())
            .and(Self::with_games(games.clone()))
            .then(|id: GameId, games: Arc<GameManager>| handlers::game_state(games, id));

        let players = warp::path!("games" / GameId / "players")
            .and(warp::get())
            .and(Self::with_games(games.clone()))
            .then(|id: GameId, games: Arc<GameManager>| handlers::players(games, id));

        let score = warp::path!("games" / GameId / "score")
            .and(warp::get())
            .and(Self::with_games(games.clone()))
            .then(|id: GameId, games: Arc<GameManager>| handlers::score(games, id));

        let score_history = warp::path!("games" / GameId / "scoreHistory")
            .and(warp::get())
            .and(Self::with_games(games.clone()))
            .then(|id: GameId, games: Arc<GameManager>| handlers::score_history(games, id));

        let log = warp::path!("games" / GameId / "log")
            .and(warp::get())
            .and(warp::query::<handlers::LogQuery>())
            .and(Self::with_games(games.clone()))
            .then(|id: GameId, query: handlers::LogQuery, games: Arc<GameManager>| {
                handlers::log(games, id, query)
            });

        let log_since = warp::path!("games" / GameId / "log" / String)
            .and(warp::get())
            .and(Self::with_games(games.clone()))
            .then(|id: GameId, timestamp: String, games: Arc<GameManager>| {
                handlers::log_since(games, id, timestamp)
            });

        let history = warp::path!("games" / GameId / "history")
            .and(warp::get())
            .and(Self::with_games(games.clone()))
            .then(|id: GameId, games: Arc<GameManager>| handlers::history(games, id));

        let latest = warp::path!("games" / GameId / "latestIds")
            .and(warp::get())
            .and(Self::with_games(games.clone()))
            .then(|id: GameId, games: Arc<GameManager>| handlers::latest_ids(games, id));

        let tournament = warp::path!("games" / GameId / "tournament" / u64)
            .and(warp::get())
            .and(Self::with_games(games.clone()))
            .then(|id: GameId, tournament: u64, games: Arc<GameManager>| {
                handlers::tournament_state(games, id, tournament)
            });

        let outcome = warp::path!("games" / GameId / "tournament" / u64 / "outcome")
            .and(warp::get())
            .and(Self::with_games(games.clone()))
            .then(|id: GameId, tournament: u64, games: Arc<GameManager>| {
                handlers::tournament_outcome(games, id, tournament)
            });

        let round = warp::path!("games" / GameId / "tournament" / u64 / "round" / u64)
            .and(warp::get())
            .and(Self::with_games(games))
            .then(|id: GameId, tournament: u64, round: u64, games: Arc<GameManager>| {
                handlers::round_state(games, id, tournament, round)
            });

        list.or(state)
            .unify()
            .or(players)
            .unify()
            .or(score)
            .unify()
            .or(score_history)
            .unify()
            .or(log)
            .unify()
            .or(log_since)
            .unify()
            .or(history)
            .unify()
            .or(latest)
            .unify()
            .or(tournament)
            .unify()
            .or(outcome)
            .unify()
            .or(round)
            .unify()
            .boxed()
    }

    fn stream_routes(context: &AppContext) -> BoxedFilter<(Response,)> {
        let games = context.games();

        let events = warp::path!("games" / GameId / "events")
            .and(warp::get())
            .and(Self::with_games(games.clone()))
            .then(handlers::stream_events);

        let websocket = warp::path!("games" / GameId / "websocket" / String)
            .and(warp::ws())
            .and(Self::with_games(games))
            .then(|id: GameId, team: String, ws: warp::ws::Ws, games: Arc<GameManager>| {
                handlers::connect_bot(ws, id, team, games)
            });

        events.or(websocket).unify().boxed()
    }

    fn with_games(
        games: Arc<GameManager>,
    ) -> impl Filter<Extract = (Arc<GameManager>,), Error = Infallible> + Clone {
        warp::any().map(move || Arc::clone(&games))
    }

    /// A JSON body that may also be missing entirely.
    fn optional_json() -> impl Filter<Extract = (handlers::CreateGameRequest,), Error = Rejection> + Clone {
        warp::body::content_length_limit(16 * 1024)
            .and(warp::body::bytes())
            .and_then(|body: warp::hyper::body::Bytes| async move {
                if body.iter().all(u8::is_ascii_whitespace) {
                    return Ok(handlers::CreateGameRequest::default());
                }
                serde_json::from_slice(&body)
                    .map_err(|err| warp::reject::custom(InvalidBody(err.to_string())))
            })
    }
}

pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<(), ServerError>>>,
    context: AppContext,
}

impl ServerHandle {
    fn new(
        addr: SocketAddr,
        shutdown: oneshot::Sender<()>,
        task: JoinHandle<Result<(), ServerError>>,
        context: AppContext,
    ) -> Self {
        Self {
            addr,
            shutdown: Some(shutdown),
            task: Some(task),
            context,
        }
    }

    pub fn address(&self) -> SocketAddr {
        self.addr
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    /// Pauses every game, ends event streams and waits for open connections
    /// to finish.
    pub async fn shutdown(mut self) -> Result<(), ServerError> {
        self.context.games().stop_all();
        self.context.events().close_all();

        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            match task.await {
                Ok(result) => result?,
                Err(err) => {
                    return Err(ServerError::ConfigError(format!(
                        "server task join error: {err}"
                    )))
                }
            }
        }

        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            self.context.games().stop_all();
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

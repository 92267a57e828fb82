pub mod games;
pub mod health;
pub mod sse;
pub mod websocket;

pub use games::{
    create_game, delete_game, game_state, history, latest_ids, list_games, log, log_since,
    players, register_player, remove_player, round_state, score, score_history, toggle_game,
    tournament_outcome, tournament_state, CreateGameRequest, LogQuery, TeamQuery,
};
pub use health::health;
pub use sse::stream_events;
pub use websocket::connect_bot;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::Reply;

use crate::errors::{IntoErrorResponse, ManagementError};
use crate::game::GameId;
use crate::manager::GameManager;
use crate::store::{parse_timestamp, LogFilter, Order};

#[derive(Debug, Default, Deserialize)]
pub struct CreateGameRequest {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateGameResponse {
    pub id: GameId,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamQuery {
    #[serde(default)]
    pub team_name: String,
    #[serde(default)]
    pub player_url: Option<String>,
}

/// Query of `GET /games/{id}/log`. All parameters are optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    #[serde(alias = "tournamentId")]
    pub table_id: Option<u64>,
    pub limit: Option<usize>,
    pub order: Option<String>,
}

impl LogQuery {
    pub fn into_filter(self) -> Result<LogFilter, ManagementError> {
        Ok(LogFilter {
            from: self.from.as_deref().map(parse_timestamp).transpose()?,
            to: self.to.as_deref().map(parse_timestamp).transpose()?,
            tournament_id: self.table_id,
            limit: self.limit.unwrap_or(0),
            order: self
                .order
                .as_deref()
                .map(str::parse::<Order>)
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

fn state_body(running: bool) -> serde_json::Value {
    json!({ "state": if running { "running" } else { "stopped" } })
}

fn respond<T: Serialize>(result: Result<T, ManagementError>) -> Response {
    match result {
        Ok(body) => reply::json(&body).into_response(),
        Err(err) => err.into_http_response(),
    }
}

/// Lists every game, sorted by name.
///
/// - **Method**: GET
/// - **Path**: `/games`
pub async fn list_games(manager: Arc<GameManager>) -> Response {
    reply::json(&manager.list()).into_response()
}

/// Creates a stopped game without teams.
///
/// - **Method**: POST
/// - **Path**: `/games/manage`
/// - **Body**: `{"name": "friday league"}`, the name is optional
/// - **Success (201 Created)**: `{"id": 1}`
pub async fn create_game(manager: Arc<GameManager>, request: CreateGameRequest) -> Response {
    let id = manager.create_game(request.name.as_deref().unwrap_or_default());
    reply::with_status(reply::json(&CreateGameResponse { id }), StatusCode::CREATED).into_response()
}

/// Pauses a running game or resumes a stopped one.
///
/// - **Method**: PUT
/// - **Path**: `/games/manage/{id}`
/// - **Success (200 OK)**: the new state, `{"state": "running"}`
/// - **Error (404 Not Found)**: `game_not_found`
///
/// A running tournament finishes its current round before it stops.
pub async fn toggle_game(manager: Arc<GameManager>, id: GameId) -> Response {
    respond(manager.toggle_run(id).map(state_body))
}

pub async fn delete_game(manager: Arc<GameManager>, id: GameId) -> Response {
    match manager.delete(id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_http_response(),
    }
}

/// Registers a team that is reached over HTTP.
///
/// - **Method**: POST
/// - **Path**: `/games/manage/{id}/players?teamName=..&playerUrl=..`
/// - **Success (201 Created)**: the team list of the game
/// - **Error (400 Bad Request)**: `invalid_team_name`, `invalid_player_url`
/// - **Error (409 Conflict)**: `duplicate_team`, `too_many_teams`
///
/// The team takes part from the next tournament on.
pub async fn register_player(manager: Arc<GameManager>, id: GameId, query: TeamQuery) -> Response {
    let url = query.player_url.unwrap_or_default();
    match manager.register_remote(id, &query.team_name, &url) {
        Ok(()) => match manager.game(id) {
            Ok(game) => reply::with_status(reply::json(&game.teams()), StatusCode::CREATED).into_response(),
            Err(err) => err.into_http_response(),
        },
        Err(err) => err.into_http_response(),
    }
}

pub async fn remove_player(manager: Arc<GameManager>, id: GameId, query: TeamQuery) -> Response {
    match manager.remove_team(id, &query.team_name) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_http_response(),
    }
}

pub async fn game_state(manager: Arc<GameManager>, id: GameId) -> Response {
    respond(manager.is_running(id).map(state_body))
}

pub async fn players(manager: Arc<GameManager>, id: GameId) -> Response {
    respond(manager.game(id).map(|g| g.teams()))
}

pub async fn score(manager: Arc<GameManager>, id: GameId) -> Response {
    respond(manager.game(id).map(|g| g.scores()))
}

pub async fn score_history(manager: Arc<GameManager>, id: GameId) -> Response {
    respond(manager.game(id).map(|g| g.score_history()))
}

/// Pages through the dealer log of a game.
///
/// - **Method**: GET
/// - **Path**: `/games/{id}/log?from=..&to=..&tableId=..&limit=..&order=asc|desc`
///
/// `from` and `to` are exclusive and accept epoch milliseconds or RFC 3339
/// dates. `order` is applied before `limit`, so `order=desc&limit=10` gives
/// the ten newest lines.
pub async fn log(manager: Arc<GameManager>, id: GameId, query: LogQuery) -> Response {
    respond(manager.game(id).and_then(|g| Ok(g.filter_log(&query.into_filter()?))))
}

pub async fn log_since(manager: Arc<GameManager>, id: GameId, timestamp: String) -> Response {
    respond(
        manager
            .game(id)
            .and_then(|g| Ok(g.log_since(parse_timestamp(&timestamp)?))),
    )
}

pub async fn history(manager: Arc<GameManager>, id: GameId) -> Response {
    respond(manager.game(id).map(|g| g.history()))
}

pub async fn latest_ids(manager: Arc<GameManager>, id: GameId) -> Response {
    respond(manager.game(id).map(|g| g.latest_ids()))
}

/// Table of the most recent street or round of a tournament. Hole cards are
/// only visible for hands shown at a showdown.
pub async fn tournament_state(manager: Arc<GameManager>, id: GameId, tournament_id: u64) -> Response {
    respond(
        manager
            .game(id)
            .and_then(|g| g.state_of_tournament(tournament_id)),
    )
}

/// Winners and the full log of a tournament once it has ended.
///
/// - **Method**: GET
/// - **Path**: `/games/{id}/tournament/{t}/outcome`
/// - **Error (404 Not Found)**: `no_outcome` while the tournament is running
pub async fn tournament_outcome(manager: Arc<GameManager>, id: GameId, tournament_id: u64) -> Response {
    respond(manager.game(id).and_then(|g| g.outcome(tournament_id)))
}

pub async fn round_state(
    manager: Arc<GameManager>,
    id: GameId,
    tournament_id: u64,
    round: u64,
) -> Response {
    respond(
        manager
            .game(id)
            .and_then(|g| g.state_of_round(tournament_id, round)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_query_builds_a_filter() {
        let query = LogQuery {
            from: Some("1700000000000".into()),
            to: None,
            table_id: Some(3),
            limit: Some(20),
            order: Some("desc".into()),
        };
        let filter = query.into_filter().unwrap();
        assert!(filter.from.is_some());
        assert_eq!(filter.tournament_id, Some(3));
        assert_eq!(filter.limit, 20);
        assert_eq!(filter.order, Order::Desc);
    }

    #[test]
    fn bad_log_query_values_are_errors() {
        let bad_order = LogQuery {
            order: Some("random".into()),
            ..LogQuery::default()
        };
        assert!(matches!(bad_order.into_filter(), Err(ManagementError::InvalidOrder(_))));

        let bad_time = LogQuery {
            to: Some("soon".into()),
            ..LogQuery::default()
        };
        assert!(matches!(bad_time.into_filter(), Err(ManagementError::InvalidTimestamp(_))));
    }

    #[test]
    fn state_body_names_the_state() {
        assert_eq!(state_body(true), json!({ "state": "running" }));
        assert_eq!(state_body(false), json!({ "state": "stopped" }));
    }
}

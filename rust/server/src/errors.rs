//! Error responses shared by every management endpoint.
//!
//! All failures leave the server as the same JSON shape
//! `{"error": code, "message": text, "details": ...}` so that operator
//! tooling only has to understand one format.
use std::convert::Infallible;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use warp::http::StatusCode;
use warp::reject::Rejection;
use warp::reply::{self, Response};
use warp::Reply;

use crate::game::GameId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g. "game_not_found")
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn into_response(self, status: StatusCode) -> Response {
        reply::with_status(reply::json(&self), status).into_response()
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Error classification for logging levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// 4xx, expected during normal operation
    Client,
    /// 5xx
    Server,
}

pub trait IntoErrorResponse {
    fn status_code(&self) -> StatusCode;

    fn error_code(&self) -> &'static str;

    fn error_message(&self) -> String;

    fn error_details(&self) -> Option<serde_json::Value> {
        None
    }

    fn severity(&self) -> ErrorSeverity {
        if self.status_code().is_server_error() {
            ErrorSeverity::Server
        } else {
            ErrorSeverity::Client
        }
    }

    fn to_error_response(&self) -> ErrorResponse {
        if let Some(details) = self.error_details() {
            ErrorResponse::with_details(self.error_code(), self.error_message(), details)
        } else {
            ErrorResponse::new(self.error_code(), self.error_message())
        }
    }

    fn into_http_response(self) -> Response
    where
        Self: Sized,
    {
        let status = self.status_code();
        let body = self.to_error_response();

        match self.severity() {
            ErrorSeverity::Client => {
                tracing::info!(error = %body.error, status = status.as_u16(), "{}", body.message)
            }
            ErrorSeverity::Server => {
                tracing::error!(error = %body.error, status = status.as_u16(), "{}", body.message)
            }
        }

        body.into_response(status)
    }
}

/// Failures of management and query operations. None of them touch the
/// state of a running tournament.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManagementError {
    #[error("No game with id {0}")]
    GameNotFound(GameId),
    #[error("Too many players, cant add player: {team}!")]
    TooManyTeams { team: String, max: usize },
    #[error("No team named {0}")]
    TeamNotFound(String),
    #[error("Team {0} is already registered")]
    DuplicateTeam(String),
    #[error("Invalid team name: {0:?}")]
    InvalidTeamName(String),
    #[error("Invalid player url: {0}")]
    InvalidPlayerUrl(String),
    #[error("Team {0} is not a websocket team")]
    NotWebsocketTeam(String),
    #[error("No table state for tournament {tournament_id}{}", round_suffix(.round))]
    NoTableState { tournament_id: u64, round: Option<u64> },
    #[error("Tournament {0} has no result yet")]
    NoOutcome(u64),
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("Invalid order {0:?}, expected \"asc\" or \"desc\"")]
    InvalidOrder(String),
}

fn round_suffix(round: &Option<u64>) -> String {
    round.map(|r| format!(" round {r}")).unwrap_or_default()
}

impl IntoErrorResponse for ManagementError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::GameNotFound(_)
            | Self::TeamNotFound(_)
            | Self::NoTableState { .. }
            | Self::NoOutcome(_) => StatusCode::NOT_FOUND,
            Self::DuplicateTeam(_) | Self::TooManyTeams { .. } => StatusCode::CONFLICT,
            Self::InvalidTeamName(_)
            | Self::InvalidPlayerUrl(_)
            | Self::NotWebsocketTeam(_)
            | Self::InvalidTimestamp(_)
            | Self::InvalidOrder(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::GameNotFound(_) => "game_not_found",
            Self::TeamNotFound(_) => "team_not_found",
            Self::TooManyTeams { .. } => "too_many_teams",
            Self::DuplicateTeam(_) => "duplicate_team",
            Self::InvalidTeamName(_) => "invalid_team_name",
            Self::InvalidPlayerUrl(_) => "invalid_player_url",
            Self::NotWebsocketTeam(_) => "not_websocket_team",
            Self::NoTableState { .. } => "no_table_state",
            Self::NoOutcome(_) => "no_outcome",
            Self::InvalidTimestamp(_) => "invalid_timestamp",
            Self::InvalidOrder(_) => "invalid_order",
        }
    }

    fn error_message(&self) -> String {
        self.to_string()
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            Self::TooManyTeams { max, .. } => Some(json!({ "max_teams": max })),
            Self::NoTableState {
                tournament_id,
                round,
            } => Some(json!({ "tournament_id": tournament_id, "round": round })),
            _ => None,
        }
    }
}

/// A request body that is not the JSON the route expects.
#[derive(Debug)]
pub struct InvalidBody(pub String);

impl warp::reject::Reject for InvalidBody {}

/// Maps warp's own rejections (unknown route, bad query, wrong method) onto
/// the common error body.
pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let (status, code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not_found", "Route not found".to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, "invalid_query", e.to_string())
    } else if let Some(e) = err.find::<InvalidBody>() {
        (StatusCode::BAD_REQUEST, "invalid_body", e.0.clone())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, "invalid_body", e.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "method_not_allowed",
            "Method not allowed".to_string(),
        )
    } else {
        tracing::error!(rejection = ?err, "unhandled rejection");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "Internal server error".to_string(),
        )
    };

    Ok(ErrorResponse::new(code, message).into_response(status))
}

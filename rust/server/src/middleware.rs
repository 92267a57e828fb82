use std::time::Instant;

use warp::http::{Method, StatusCode};
use warp::reject::Rejection;
use warp::reply::Response;
use warp::Filter;

struct RequestStart {
    path: String,
    method: Method,
    at: Instant,
}

/// Logs every request on the way in and its status and latency on the way
/// out.
pub fn with_request_logging<F>(
    filter: F,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone
where
    F: Filter<Extract = (Response,), Error = Rejection> + Clone + Send + Sync + 'static,
{
    warp::any()
        .and(warp::path::full())
        .and(warp::method())
        .map(|path: warp::path::FullPath, method: Method| {
            tracing::debug!(path = %path.as_str(), method = %method, "incoming request");
            RequestStart {
                path: path.as_str().to_string(),
                method,
                at: Instant::now(),
            }
        })
        .and(filter)
        .map(|start: RequestStart, response: Response| {
            log_response(
                response.status(),
                &start.path,
                start.method.as_str(),
                start.at.elapsed().as_millis(),
            );
            response
        })
}

/// Logs a finished request at a level matching its status class.
pub fn log_response(status: StatusCode, path: &str, method: &str, duration_ms: u128) {
    let status_code = status.as_u16();
    if status.is_client_error() {
        tracing::warn!(status = status_code, path, method, duration_ms, "client error");
    } else if status.is_server_error() {
        tracing::error!(status = status_code, path, method, duration_ms, "server error");
    } else {
        tracing::info!(status = status_code, path, method, duration_ms, "request completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::TestLogSubscriber;
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;
    use warp::Reply;

    #[tokio::test]
    async fn requests_are_logged_with_their_status() {
        let subscriber = TestLogSubscriber::new();
        let registry = Registry::default().with(subscriber.clone().into_layer::<Registry>());
        let _guard = tracing::subscriber::set_default(registry);

        let route = warp::path!("games")
            .and(warp::get())
            .map(|| warp::reply::json(&Vec::<u64>::new()).into_response());
        let logged = with_request_logging(route);

        let response = warp::test::request()
            .method("GET")
            .path("/games")
            .reply(&logged)
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let entries = subscriber.entries();
        assert!(entries
            .iter()
            .any(|e| e.level == Level::DEBUG && e.message.contains("incoming request")));
        let done = entries
            .iter()
            .find(|e| e.message.contains("request completed"))
            .expect("completion logged");
        assert_eq!(done.field("status"), Some("200"));
        assert_eq!(done.field("path"), Some("/games"));
    }

    #[test]
    fn error_statuses_raise_the_level() {
        let subscriber = TestLogSubscriber::new();
        let registry = Registry::default().with(subscriber.clone().into_layer::<Registry>());

        tracing::subscriber::with_default(registry, || {
            log_response(StatusCode::NOT_FOUND, "/games/9", "GET", 3);
            log_response(StatusCode::INTERNAL_SERVER_ERROR, "/games", "POST", 5);
        });

        let entries = subscriber.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, Level::WARN);
        assert_eq!(entries[0].field("status"), Some("404"));
        assert_eq!(entries[1].level, Level::ERROR);
        assert!(entries[1].message.contains("server error"));
    }
}

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use warp::http;
use warp::reply::{self, Response};
use warp::sse;
use warp::Reply;

use crate::errors::IntoErrorResponse;
use crate::events::{EventSubscription, GameEvent};
use crate::game::GameId;
use crate::manager::GameManager;

/// Streams the events of one game as Server-Sent Events until the client
/// goes away or the game is deleted.
pub async fn stream_events(game_id: GameId, manager: Arc<GameManager>) -> Response {
    if let Err(err) = manager.game(game_id) {
        return err.into_http_response();
    }

    let subscription = manager.events().subscribe(game_id);
    let keep_alive = sse::keep_alive()
        .interval(Duration::from_secs(15))
        .text(":keep-alive\n");

    let reply = sse::reply(keep_alive.stream(subscription_stream(subscription)));
    reply::with_header(reply, http::header::CACHE_CONTROL, "no-cache").into_response()
}

fn subscription_stream(
    mut subscription: EventSubscription,
) -> impl Stream<Item = Result<sse::Event, Infallible>> {
    // swap the receiver out so the subscription itself can ride along and
    // unsubscribe when the stream is dropped
    let (_, placeholder) = tokio::sync::mpsc::channel(1);
    let receiver = std::mem::replace(subscription.receiver(), placeholder);
    let subscription = Arc::new(subscription);

    ReceiverStream::new(receiver).map(move |event| {
        let _alive = Arc::clone(&subscription);
        Ok(render_event(&event))
    })
}

fn render_event(event: &GameEvent) -> sse::Event {
    match serde_json::to_string(event) {
        Ok(json) => sse::Event::default().event("game_event").data(json),
        Err(err) => {
            let fallback = serde_json::json!({
                "type": "error",
                "message": format!("failed to serialize game event: {err}")
            })
            .to_string();
            sse::Event::default().event("game_event").data(fallback)
        }
    }
}

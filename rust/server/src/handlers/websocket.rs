use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use warp::reply::Response;
use warp::ws::{Message, WebSocket, Ws};
use warp::Reply;

use crate::errors::IntoErrorResponse;
use crate::game::GameId;
use crate::manager::GameManager;
use crate::players::WebsocketPlayer;

/// Upgrades a bot connection on `/games/{id}/websocket/{team}`.
///
/// Connecting under a new team name registers the team; connecting under an
/// existing websocket team re-attaches it. Teams registered with a url are
/// refused before the upgrade.
pub async fn connect_bot(ws: Ws, game_id: GameId, team: String, manager: Arc<GameManager>) -> Response {
    match manager.register_websocket(game_id, &team) {
        Ok(player) => ws
            .on_upgrade(move |socket| bridge(socket, player))
            .into_response(),
        Err(err) => err.into_http_response(),
    }
}

/// Moves table states to the bot and its answers back until either side
/// hangs up or a newer connection takes over the team.
async fn bridge(socket: WebSocket, player: WebsocketPlayer) {
    let ends = player.attach();
    let session = ends.id;
    let mut outgoing = ends.outgoing;
    let replies = ends.replies;
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            table = outgoing.recv() => match table {
                Some(json) => {
                    if sink.send(Message::text(json)).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            frame = stream.next() => match frame {
                Some(Ok(msg)) if msg.is_text() => {
                    let text = msg.to_str().unwrap_or_default().to_string();
                    if !replies.push(text) {
                        break;
                    }
                }
                Some(Ok(msg)) if msg.is_close() => break,
                Some(Ok(_)) => continue,
                Some(Err(err)) => {
                    tracing::debug!(team = player.team(), session, error = %err, "websocket error");
                    break;
                }
                None => break,
            },
        }
    }

    player.detach(session);
    let _ = sink.close().await;
}

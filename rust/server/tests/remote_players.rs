use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dealer_server::{AppContext, DealerConfig, DealerServer, GameId};
use serde_json::{json, Value};
use warp::Filter;

/// Starts an HTTP bot that answers every table with the same bet.
fn spawn_bot(bet: i64, calls: Arc<AtomicUsize>) -> SocketAddr {
    let route = warp::post()
        .and(warp::body::json())
        .map(move |table: Value| {
            assert!(table.get("players").is_some(), "bot received {table}");
            calls.fetch_add(1, Ordering::SeqCst);
            warp::reply::json(&json!({ "bet": bet }))
        });
    let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    addr
}

fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe");
    listener.local_addr().expect("probe address")
}

async fn wait_for_winner(ctx: &AppContext, id: GameId) -> Vec<(String, u64)> {
    let game = ctx.games().game(id).expect("game exists");
    for _ in 0..200 {
        let scores = game.scores();
        if !scores.is_empty() {
            return scores.into_iter().collect();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("no tournament finished in time");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn all_in_bots_finish_a_tournament() {
    let ctx = AppContext::new(DealerConfig::for_tests()).expect("build context");
    let games = ctx.games();
    let id = games.create_game("shove");

    let calls = Arc::new(AtomicUsize::new(0));
    let a = spawn_bot(10_000, Arc::clone(&calls));
    let b = spawn_bot(10_000, Arc::clone(&calls));
    games
        .register_remote(id, "left", &format!("http://{a}"))
        .expect("register left");
    // Registered without a scheme; the dealer adds http://
    games
        .register_remote(id, "right", &b.to_string())
        .expect("register right");

    games.resume(id).expect("resume");
    let scores = wait_for_winner(&ctx, id).await;
    games.pause(id).expect("pause");

    assert_eq!(scores.len(), 1);
    assert!(scores[0].0 == "left" || scores[0].0 == "right");
    assert!(scores[0].1 >= 1);
    assert!(calls.load(Ordering::SeqCst) > 0);

    let routes = DealerServer::routes(&ctx);
    let latest = warp::test::request()
        .path(&format!("/games/{id}/latestIds"))
        .reply(&routes)
        .await;
    let latest: Value = serde_json::from_slice(latest.body()).expect("latest ids");
    let tournament = latest["tournamentId"].as_u64().expect("tournament id");
    assert!(tournament >= 1);
    assert!(latest["roundId"].as_u64().expect("round id") >= 1);

    let state = warp::test::request()
        .path(&format!("/games/{id}/tournament/{tournament}"))
        .reply(&routes)
        .await;
    assert_eq!(state.status(), 200);
    let table: Value = serde_json::from_slice(state.body()).expect("table json");
    assert_eq!(table["players"].as_array().map(Vec::len), Some(2));

    let round = warp::test::request()
        .path(&format!("/games/{id}/tournament/{tournament}/round/1"))
        .reply(&routes)
        .await;
    assert_eq!(round.status(), 200);

    let log = warp::test::request()
        .path(&format!("/games/{id}/log?tableId={tournament}&order=desc&limit=5"))
        .reply(&routes)
        .await;
    let log: Value = serde_json::from_slice(log.body()).expect("log json");
    let lines = log.as_array().expect("log lines");
    assert!(!lines.is_empty() && lines.len() <= 5);
    assert!(lines.iter().all(|l| l["tournamentId"] == tournament));

    let history = warp::test::request()
        .path(&format!("/games/{id}/scoreHistory"))
        .reply(&routes)
        .await;
    let history: Value = serde_json::from_slice(history.body()).expect("score history");
    let winner = &scores[0].0;
    assert_eq!(history[winner.as_str()][0]["score"], 1);

    let won = history[winner.as_str()][0]["tournamentId"]
        .as_u64()
        .expect("won tournament id");
    let outcome = warp::test::request()
        .path(&format!("/games/{id}/tournament/{won}/outcome"))
        .reply(&routes)
        .await;
    assert_eq!(outcome.status(), 200);
    let outcome: Value = serde_json::from_slice(outcome.body()).expect("outcome json");
    assert_eq!(outcome["completed"], true);
    assert_eq!(outcome["winners"], json!([winner]));
    assert!(outcome["rounds_played"].as_u64().expect("rounds played") >= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreachable_team_loses_the_tournament() {
    let ctx = AppContext::new(DealerConfig::for_tests()).expect("build context");
    let games = ctx.games();
    let id = games.create_game("ghost town");

    let calls = Arc::new(AtomicUsize::new(0));
    let steady = spawn_bot(10_000, Arc::clone(&calls));
    games
        .register_remote(id, "steady", &format!("http://{steady}"))
        .expect("register steady");
    games
        .register_remote(id, "ghost", &format!("http://{}", closed_port()))
        .expect("register ghost");

    games.resume(id).expect("resume");
    let scores = wait_for_winner(&ctx, id).await;
    games.pause(id).expect("pause");

    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0].0, "steady");
    assert!(calls.load(Ordering::SeqCst) > 0);
}

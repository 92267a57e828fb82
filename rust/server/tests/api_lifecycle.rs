use dealer_server::{AppContext, DealerConfig, DealerServer};
use serde_json::{json, Value};
use warp::http::StatusCode;

fn context() -> AppContext {
    AppContext::new(DealerConfig::for_tests()).expect("build context")
}

fn body_json(body: &[u8]) -> Value {
    serde_json::from_slice(body).expect("parse json body")
}

#[tokio::test]
async fn game_management_lifecycle() {
    let ctx = context();
    let routes = DealerServer::routes(&ctx);

    let health = warp::test::request().path("/health").reply(&routes).await;
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(body_json(health.body())["status"], "ok");

    let created = warp::test::request()
        .method("POST")
        .path("/games/manage")
        .json(&json!({ "name": "friday league" }))
        .reply(&routes)
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let id = body_json(created.body())["id"].as_u64().expect("numeric id");

    let listed = warp::test::request().path("/games").reply(&routes).await;
    assert_eq!(listed.status(), StatusCode::OK);
    let games = body_json(listed.body());
    assert_eq!(games[0]["name"], "friday league");
    assert_eq!(games[0]["running"], false);

    let state = warp::test::request()
        .path(&format!("/games/{id}"))
        .reply(&routes)
        .await;
    assert_eq!(body_json(state.body())["state"], "stopped");

    let toggled = warp::test::request()
        .method("PUT")
        .path(&format!("/games/manage/{id}"))
        .reply(&routes)
        .await;
    assert_eq!(toggled.status(), StatusCode::OK);
    assert_eq!(body_json(toggled.body())["state"], "running");

    let toggled = warp::test::request()
        .method("PUT")
        .path(&format!("/games/manage/{id}"))
        .reply(&routes)
        .await;
    assert_eq!(body_json(toggled.body())["state"], "stopped");

    let deleted = warp::test::request()
        .method("DELETE")
        .path(&format!("/games/manage/{id}"))
        .reply(&routes)
        .await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let gone = warp::test::request()
        .path(&format!("/games/{id}"))
        .reply(&routes)
        .await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(gone.body())["error"], "game_not_found");
}

#[tokio::test]
async fn games_can_be_created_without_a_body() {
    let ctx = context();
    let routes = DealerServer::routes(&ctx);

    let created = warp::test::request()
        .method("POST")
        .path("/games/manage")
        .reply(&routes)
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let id = body_json(created.body())["id"].as_u64().expect("numeric id");

    let listed = body_json(warp::test::request().path("/games").reply(&routes).await.body());
    assert_eq!(listed[0]["name"], format!("Game {id}"));

    let broken = warp::test::request()
        .method("POST")
        .path("/games/manage")
        .header("content-type", "application/json")
        .body("{not json")
        .reply(&routes)
        .await;
    assert_eq!(broken.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(broken.body())["error"], "invalid_body");
}

#[tokio::test]
async fn team_registration_errors_map_to_statuses() {
    let mut config = DealerConfig::for_tests();
    config.max_teams = 2;
    let ctx = AppContext::new(config).expect("build context");
    let routes = DealerServer::routes(&ctx);
    let id = ctx.games().create_game("registrations");

    let register = |team: &str, url: &str| {
        warp::test::request()
            .method("POST")
            .path(&format!("/games/manage/{id}/players?teamName={team}&playerUrl={url}"))
    };

    let first = register("alpha", "localhost:9001").reply(&routes).await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let teams = body_json(first.body());
    assert_eq!(teams[0]["name"], "alpha");
    assert_eq!(teams[0]["type"], "remote");
    assert_eq!(teams[0]["url"], "http://localhost:9001");

    let duplicate = register("alpha", "localhost:9002").reply(&routes).await;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(duplicate.body())["error"], "duplicate_team");

    let bad_url = register("beta", "http%3A%2F%2F").reply(&routes).await;
    assert_eq!(bad_url.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(bad_url.body())["error"], "invalid_player_url");

    let unnamed = register("%20", "localhost:9003").reply(&routes).await;
    assert_eq!(unnamed.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(unnamed.body())["error"], "invalid_team_name");

    let second = register("beta", "localhost:9004").reply(&routes).await;
    assert_eq!(second.status(), StatusCode::CREATED);

    let full = register("gamma", "localhost:9005").reply(&routes).await;
    assert_eq!(full.status(), StatusCode::CONFLICT);
    let full = body_json(full.body());
    assert_eq!(full["error"], "too_many_teams");
    assert_eq!(full["details"]["max_teams"], 2);

    let removed = warp::test::request()
        .method("DELETE")
        .path(&format!("/games/manage/{id}/players?teamName=alpha"))
        .reply(&routes)
        .await;
    assert_eq!(removed.status(), StatusCode::NO_CONTENT);

    let missing = warp::test::request()
        .method("DELETE")
        .path(&format!("/games/manage/{id}/players?teamName=alpha"))
        .reply(&routes)
        .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(missing.body())["error"], "team_not_found");

    let players = warp::test::request()
        .path(&format!("/games/{id}/players"))
        .reply(&routes)
        .await;
    let players = body_json(players.body());
    assert_eq!(players.as_array().map(Vec::len), Some(1));
    assert_eq!(players[0]["name"], "beta");
    assert_eq!(players[0]["strikes"], 0);
}

#[tokio::test]
async fn queries_on_a_fresh_game() {
    let ctx = context();
    let routes = DealerServer::routes(&ctx);
    let id = ctx.games().create_game("fresh");

    let latest = warp::test::request()
        .path(&format!("/games/{id}/latestIds"))
        .reply(&routes)
        .await;
    assert_eq!(latest.status(), StatusCode::OK);
    let latest = body_json(latest.body());
    assert_eq!(latest["tournamentId"], 0);
    assert_eq!(latest["roundId"], 0);

    for path in ["log", "history", "score", "scoreHistory"] {
        let response = warp::test::request()
            .path(&format!("/games/{id}/{path}"))
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::OK, "GET {path}");
        let body = body_json(response.body());
        assert!(
            body.as_array().is_some_and(Vec::is_empty) || body.as_object().is_some_and(|o| o.is_empty()),
            "GET {path} should be empty, got {body}"
        );
    }

    let no_state = warp::test::request()
        .path(&format!("/games/{id}/tournament/1"))
        .reply(&routes)
        .await;
    assert_eq!(no_state.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(no_state.body())["error"], "no_table_state");

    let no_outcome = warp::test::request()
        .path(&format!("/games/{id}/tournament/1/outcome"))
        .reply(&routes)
        .await;
    assert_eq!(no_outcome.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(no_outcome.body())["error"], "no_outcome");

    let no_round = warp::test::request()
        .path(&format!("/games/{id}/tournament/1/round/3"))
        .reply(&routes)
        .await;
    assert_eq!(no_round.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_log_queries_are_rejected() {
    let ctx = context();
    let routes = DealerServer::routes(&ctx);
    let id = ctx.games().create_game("logs");

    let bad_order = warp::test::request()
        .path(&format!("/games/{id}/log?order=sideways"))
        .reply(&routes)
        .await;
    assert_eq!(bad_order.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(bad_order.body())["error"], "invalid_order");

    let bad_from = warp::test::request()
        .path(&format!("/games/{id}/log?from=yesterday"))
        .reply(&routes)
        .await;
    assert_eq!(bad_from.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(bad_from.body())["error"], "invalid_timestamp");

    let bad_limit = warp::test::request()
        .path(&format!("/games/{id}/log?limit=many"))
        .reply(&routes)
        .await;
    assert_eq!(bad_limit.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(bad_limit.body())["error"], "invalid_query");

    let bad_since = warp::test::request()
        .path(&format!("/games/{id}/log/later"))
        .reply(&routes)
        .await;
    assert_eq!(bad_since.status(), StatusCode::BAD_REQUEST);

    let since = warp::test::request()
        .path(&format!("/games/{id}/log/0"))
        .reply(&routes)
        .await;
    assert_eq!(since.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_games_and_routes_are_404() {
    let ctx = context();
    let routes = DealerServer::routes(&ctx);

    for path in ["/games/77", "/games/77/players", "/games/77/score", "/games/77/events"] {
        let response = warp::test::request().path(path).reply(&routes).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "GET {path}");
        assert_eq!(body_json(response.body())["error"], "game_not_found");
    }

    let toggle = warp::test::request()
        .method("PUT")
        .path("/games/manage/77")
        .reply(&routes)
        .await;
    assert_eq!(toggle.status(), StatusCode::NOT_FOUND);

    let nowhere = warp::test::request().path("/nowhere").reply(&routes).await;
    assert_eq!(nowhere.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(nowhere.body())["error"], "not_found");
}

#[tokio::test]
async fn server_binds_and_shuts_down() {
    let server = DealerServer::new(DealerConfig::for_tests()).expect("construct server");
    let handle = server.start().await.expect("start server");
    let address = handle.address();
    assert_ne!(address.port(), 0);

    let response = reqwest::get(format!("http://{address}/health"))
        .await
        .expect("request health");
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let id = handle.context().games().create_game("short lived");
    let _events = handle.context().events().subscribe(id);
    handle.shutdown().await.expect("shutdown");
}

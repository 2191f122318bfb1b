use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use chess::Color;
use serde_json::{json, Value};
use uuid::Uuid;

use session_chess::config::Config;
use session_chess::game::rules::STARTING_FEN;
use session_chess::game::RandomResponder;
use session_chess::models::{AppState, GameSession};
use session_chess::routes::configure_routes;
use session_chess::store::{MemoryStore, SessionStore};

fn app_state(config: Config) -> web::Data<AppState> {
    web::Data::new(AppState::new(
        config,
        Box::new(MemoryStore::new()),
        Box::new(RandomResponder::seeded(7)),
    ))
}

fn two_player() -> Config {
    Config {
        ai_enabled: false,
        ..Config::default()
    }
}

fn testing() -> Config {
    Config {
        ai_enabled: false,
        testing: true,
        static_dir: std::env::temp_dir().join(format!("session-chess-static-{}", Uuid::new_v4())),
        ..Config::default()
    }
}

macro_rules! service {
    ($data:expr) => {{
        let static_dir = $data.config.static_dir.clone();
        test::init_service(
            App::new()
                .app_data($data.clone())
                .configure(move |cfg| configure_routes(cfg, &static_dir)),
        )
        .await
    }};
}

fn session_cookie(resp: &ServiceResponse) -> Cookie<'static> {
    resp.response()
        .cookies()
        .find(|c| c.name() == "chess_session")
        .map(|c| c.into_owned())
        .expect("session cookie")
}

fn move_body(from: &str, to: &str) -> Value {
    json!({ "from": from, "to": to })
}

#[actix_web::test]
async fn reset_returns_the_starting_position() {
    let data = app_state(two_player());
    let app = service!(data);

    let resp = test::call_service(&app, test::TestRequest::post().uri("/reset").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["position"], STARTING_FEN);
    assert_eq!(body["turn"], "white");
    assert_eq!(body["game_over"], false);
    assert_eq!(body["checkmate"], false);
    assert_eq!(body["move_history"], json!([]));
    assert_eq!(body["captured_pieces"], json!({ "white": [], "black": [] }));
}

#[actix_web::test]
async fn first_request_sets_a_session_cookie() {
    let data = app_state(two_player());
    let app = service!(data);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/state").to_request()).await;
    let cookie = session_cookie(&resp);
    assert!(Uuid::parse_str(cookie.value()).is_ok());
    assert_eq!(cookie.http_only(), Some(true));
}

#[actix_web::test]
async fn moves_persist_in_the_session() {
    let data = app_state(two_player());
    let app = service!(data);

    let resp = test::call_service(&app, test::TestRequest::post().uri("/reset").to_request()).await;
    let cookie = session_cookie(&resp);

    let req = test::TestRequest::post()
        .uri("/move")
        .cookie(cookie.clone())
        .set_json(move_body("e2", "e4"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["turn"], "black");
    assert_eq!(body["move_history"], json!(["e4"]));
    assert_eq!(body["last_move"]["notation"], "e4");

    let req = test::TestRequest::get().uri("/state").cookie(cookie.clone()).to_request();
    let state: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(state["position"], body["position"]);
    assert_eq!(state["move_history"], json!(["e4"]));

    // Black pawns cannot jump three squares
    let req = test::TestRequest::post()
        .uri("/move")
        .cookie(cookie.clone())
        .set_json(move_body("d7", "d4"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let rejected: Value = test::read_body_json(resp).await;
    assert_eq!(rejected["status"], "illegal");
    assert!(rejected["message"].is_string());
    assert_eq!(rejected["position"], body["position"]);
    assert_eq!(rejected["move_history"], json!(["e4"]));
}

#[actix_web::test]
async fn sessions_do_not_share_games() {
    let data = app_state(two_player());
    let app = service!(data);

    let first = session_cookie(&test::call_service(&app, test::TestRequest::post().uri("/reset").to_request()).await);
    let second = session_cookie(&test::call_service(&app, test::TestRequest::post().uri("/reset").to_request()).await);
    assert_ne!(first.value(), second.value());

    let req = test::TestRequest::post()
        .uri("/move")
        .cookie(first.clone())
        .set_json(move_body("g1", "f3"))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get().uri("/state").cookie(second).to_request();
    let other: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(other["position"], STARTING_FEN);
    assert_eq!(other["move_history"], json!([]));
}

#[actix_web::test]
async fn automated_opponent_answers_in_the_same_request() {
    let data = app_state(Config {
        ai_enabled: true,
        ..Config::default()
    });
    let app = service!(data);

    let req = test::TestRequest::post().uri("/move").set_json(move_body("e2", "e4")).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["turn"], "white");
    assert_eq!(body["move_history"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["ai_move"]["turn"], "white");
    assert_eq!(body["ai_move"]["position"], body["position"]);
}

#[actix_web::test]
async fn checkmate_ends_the_game() {
    let data = app_state(two_player());
    let app = service!(data);
    let cookie = session_cookie(&test::call_service(&app, test::TestRequest::post().uri("/reset").to_request()).await);

    let mut last = Value::Null;
    for (from, to) in [("f2", "f3"), ("e7", "e5"), ("g2", "g4"), ("d8", "h4")] {
        let req = test::TestRequest::post()
            .uri("/move")
            .cookie(cookie.clone())
            .set_json(move_body(from, to))
            .to_request();
        last = test::call_and_read_body_json(&app, req).await;
        assert_eq!(last["status"], "ok");
    }
    assert_eq!(last["checkmate"], true);
    assert_eq!(last["game_over"], true);
    assert_eq!(last["move_history"][3], "Qh4#");

    let req = test::TestRequest::post()
        .uri("/move")
        .cookie(cookie)
        .set_json(move_body("a2", "a3"))
        .to_request();
    let after: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(after["status"], "illegal");
    assert_eq!(after["position"], last["position"]);
}

#[actix_web::test]
async fn malformed_json_is_a_bad_request() {
    let data = app_state(two_player());
    let app = service!(data);

    let req = test::TestRequest::post()
        .uri("/move")
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"from\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "error");
}

#[actix_web::test]
async fn missing_square_is_reported_as_illegal() {
    let data = app_state(two_player());
    let app = service!(data);

    let req = test::TestRequest::post().uri("/move").set_json(json!({ "to": "e4" })).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "illegal");
    assert_eq!(body["position"], STARTING_FEN);
}

#[actix_web::test]
async fn move_route_only_accepts_post() {
    let data = app_state(two_player());
    let app = service!(data);
    let resp = test::call_service(&app, test::TestRequest::get().uri("/move").to_request()).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[actix_web::test]
async fn position_injection_needs_testing_mode() {
    let data = app_state(two_player());
    let app = service!(data);
    let req = test::TestRequest::post()
        .uri("/test/set_position")
        .set_json(json!({ "fen": STARTING_FEN }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn injected_promotion_position_plays_out() {
    let data = app_state(testing());
    let app = service!(data);

    let req = test::TestRequest::post()
        .uri("/test/set_position")
        .set_json(json!({ "fen": "1r2k3/P7/8/8/8/8/8/4K3 w - - 0 1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let cookie = session_cookie(&resp);
    let injected: Value = test::read_body_json(resp).await;
    assert_eq!(injected["status"], "ok");

    // No server-side default piece
    let req = test::TestRequest::post()
        .uri("/move")
        .cookie(cookie.clone())
        .set_json(move_body("a7", "b8"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "illegal");

    let req = test::TestRequest::post()
        .uri("/move")
        .cookie(cookie)
        .set_json(json!({ "from": "a7", "to": "b8", "promotion": "queen" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["captured_pieces"]["white"], json!(["r"]));
    assert_eq!(body["special_moves"], json!(["White: capture-promotion-to-queen"]));
    assert!(body["position"].as_str().unwrap_or_default().starts_with("1Q2k3/8/"));
}

#[actix_web::test]
async fn invalid_injected_position_is_rejected() {
    let data = app_state(testing());
    let app = service!(data);
    let req = test::TestRequest::post()
        .uri("/test/set_position")
        .set_json(json!({ "fen": "not a position" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "illegal");
    assert_eq!(body["position"], STARTING_FEN);
}

#[actix_web::test]
async fn page_load_keeps_an_injected_position_once() {
    let data = app_state(testing());
    let app = service!(data);
    let fen = "4k3/P7/8/8/8/8/8/4K3 w - - 0 1";

    let req = test::TestRequest::post()
        .uri("/test/set_position")
        .set_json(json!({ "fen": fen, "move_history": ["a6", "Kf8"] }))
        .to_request();
    let cookie = session_cookie(&test::call_service(&app, req).await);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").cookie(cookie.clone()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page = test::read_body(resp).await;
    assert!(std::str::from_utf8(&page).unwrap_or_default().contains("<html>"));

    let req = test::TestRequest::get().uri("/state").cookie(cookie.clone()).to_request();
    let state: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(state["position"], fen);
    assert_eq!(state["move_history"], json!(["a6", "Kf8"]));

    test::call_service(&app, test::TestRequest::get().uri("/").cookie(cookie.clone()).to_request()).await;
    let req = test::TestRequest::get().uri("/state").cookie(cookie).to_request();
    let state: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(state["position"], STARTING_FEN);
    assert_eq!(state["move_history"], json!([]));
}

#[actix_web::test]
async fn corrupt_session_is_a_conflict() {
    let data = app_state(two_player());
    let app = service!(data);

    let id = Uuid::new_v4().to_string();
    let mut broken = GameSession::new();
    broken.position = "this is not a board".to_string();
    data.store.save(&id, &broken).unwrap();

    let req = test::TestRequest::get()
        .uri("/state")
        .cookie(Cookie::new("chess_session", id.clone()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "error");

    // Reset is the way out
    let req = test::TestRequest::post()
        .uri("/reset")
        .cookie(Cookie::new("chess_session", id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["position"], STARTING_FEN);
}

#[actix_web::test]
async fn returning_session_gets_no_new_cookie() {
    let data = app_state(two_player());
    let app = service!(data);
    let cookie = session_cookie(&test::call_service(&app, test::TestRequest::post().uri("/reset").to_request()).await);

    let req = test::TestRequest::post()
        .uri("/move")
        .cookie(cookie.clone())
        .set_json(move_body("e2", "e4"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get("set-cookie").is_none());

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").cookie(cookie).to_request()).await;
    assert!(resp.headers().get("set-cookie").is_none());
}

#[actix_web::test]
async fn injected_position_needs_both_kings() {
    let data = app_state(testing());
    let app = service!(data);

    for fen in [
        "8/8/8/8/8/8/8/8 w - - 0 1",
        "4k3/8/8/8/8/8/8/8 w - - 0 1",
        "4k3/8/8/8/8/8/8/3KK3 w - - 0 1",
    ] {
        let req = test::TestRequest::post()
            .uri("/test/set_position")
            .set_json(json!({ "fen": fen }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "{}", fen);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "illegal", "{}", fen);
        assert_eq!(body["position"], STARTING_FEN);
    }
}

#[actix_web::test]
async fn stored_kingless_position_is_a_conflict() {
    let data = app_state(two_player());
    let app = service!(data);

    let id = Uuid::new_v4().to_string();
    data.store
        .save(&id, &GameSession::from_position("8/8/8/8/8/8/8/8 w - - 0 1".to_string()))
        .unwrap();
    let req = test::TestRequest::post()
        .uri("/move")
        .cookie(Cookie::new("chess_session", id))
        .set_json(move_body("e2", "e4"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn automated_white_moves_first() {
    let data = app_state(Config {
        ai_enabled: true,
        ai_color: Color::White,
        ..Config::default()
    });
    let app = service!(data);

    let resp = test::call_service(&app, test::TestRequest::post().uri("/reset").to_request()).await;
    let cookie = session_cookie(&resp);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["turn"], "black");
    assert_eq!(body["move_history"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["ai_move"]["turn"], "black");

    // White pieces belong to the computer
    let req = test::TestRequest::post()
        .uri("/move")
        .cookie(cookie.clone())
        .set_json(move_body("a2", "a3"))
        .to_request();
    let rejected: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(rejected["status"], "illegal");
    assert_eq!(rejected["move_history"], body["move_history"]);

    let req = test::TestRequest::post()
        .uri("/move")
        .cookie(cookie)
        .set_json(move_body("b8", "c6"))
        .to_request();
    let answered: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(answered["status"], "ok");
    assert_eq!(answered["turn"], "black");
    assert_eq!(answered["move_history"].as_array().map(Vec::len), Some(3));
}

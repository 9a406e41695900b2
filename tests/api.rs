//! Handlers called directly with their extractors, checking the HTTP status mapping.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use battleship_api::controllers::board::{self, CoordsQuery, InsertShip};
use battleship_api::controllers::game::{self, refresh_active_count, MakeGuess, NewGame};
use battleship_api::controllers::player::{self, NewUser};
use battleship_api::directory::Directory;
use battleship_api::models::board::CoordKind;
use battleship_api::store::MemoryStore;
use battleship_api::AppState;

fn state() -> AppState {
    AppState::new(Arc::new(Directory::new(Arc::new(MemoryStore::new()), 10)))
}

async fn register(state: &AppState, name: &str) -> StatusCode {
    player::create_user(State(state.clone()), Json(NewUser { name: name.into(), email: None }))
        .await
        .into_response()
        .status()
}

async fn start(state: &AppState, p1: &str, p2: &str) -> StatusCode {
    game::new_game(
        State(state.clone()),
        Json(NewGame { p1_username: p1.into(), p2_username: p2.into() }),
    )
    .await
    .into_response()
    .status()
}

async fn guess(state: &AppState, key: &str, player: &str, x: i32, y: i32) -> StatusCode {
    game::make_guess(
        Path(key.to_string()),
        State(state.clone()),
        Json(MakeGuess { guess_x: x, guess_y: y, player_name: player.into() }),
    )
    .await
    .into_response()
    .status()
}

#[tokio::test]
async fn registration_statuses() {
    let state = state();
    assert_eq!(register(&state, "alice").await, StatusCode::CREATED);
    assert_eq!(register(&state, "alice").await, StatusCode::CONFLICT);
    assert_eq!(register(&state, "").await, StatusCode::BAD_REQUEST);
    assert_eq!(register(&state, &"z".repeat(65)).await, StatusCode::BAD_REQUEST);

    let status = player::player_stats(Path("alice".into()), State(state.clone()))
        .await
        .into_response()
        .status();
    assert_eq!(status, StatusCode::OK);
    let status = player::player_stats(Path("zed".into()), State(state.clone()))
        .await
        .into_response()
        .status();
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn new_game_statuses() {
    let state = state();
    register(&state, "alice").await;
    register(&state, "bob").await;

    assert_eq!(start(&state, "alice", "bob").await, StatusCode::OK);
    assert_eq!(start(&state, "bob", "alice").await, StatusCode::BAD_REQUEST);
    assert_eq!(start(&state, "alice", "ghost").await, StatusCode::BAD_REQUEST);

    let status = player::get_user_games(Path("alice".into()), State(state.clone()))
        .await
        .into_response()
        .status();
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn guess_statuses() {
    let state = state();
    register(&state, "alice").await;
    register(&state, "bob").await;
    start(&state, "alice", "bob").await;

    let ship = InsertShip {
        player_name: "bob".into(),
        opponent_name: "alice".into(),
        start_x: 2,
        start_y: 2,
        length: 2,
        horizontal: true,
    };
    let status = board::insert_ship(State(state.clone()), Json(ship)).await.into_response().status();
    assert_eq!(status, StatusCode::OK);

    // informational outcomes still answer 200
    assert_eq!(guess(&state, "1", "bob", 1, 1).await, StatusCode::OK);
    assert_eq!(guess(&state, "1", "alice", 2, 2).await, StatusCode::OK);

    assert_eq!(guess(&state, "1", "bob", 0, 1).await, StatusCode::BAD_REQUEST);
    assert_eq!(guess(&state, "not-a-key", "bob", 1, 1).await, StatusCode::BAD_REQUEST);
    assert_eq!(guess(&state, "99", "bob", 1, 1).await, StatusCode::NOT_FOUND);

    let status = board::get_coords(
        Path(("bob".to_string(), "alice".to_string())),
        Query(CoordsQuery { kind: Some(CoordKind::Hit) }),
        State(state.clone()),
    )
    .await
    .into_response()
    .status();
    assert_eq!(status, StatusCode::OK);

    let status = board::board_summary(Path(("bob".to_string(), "carol".to_string())), State(state.clone()))
        .await
        .into_response()
        .status();
    assert_eq!(status, StatusCode::NOT_FOUND);

    let status = game::get_game_history(Path("1".into()), State(state.clone()))
        .await
        .into_response()
        .status();
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn cancel_and_count() {
    let state = state();
    register(&state, "alice").await;
    register(&state, "bob").await;
    start(&state, "alice", "bob").await;

    // the count is refreshed in the background
    let mut count = 0;
    for _ in 0..50 {
        count = state.active_games.load(Ordering::Relaxed);
        if count == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(count, 1);

    let status = game::cancel_game(Path("1".into()), State(state.clone())).await.into_response().status();
    assert_eq!(status, StatusCode::OK);
    let status = game::cancel_game(Path("1".into()), State(state.clone())).await.into_response().status();
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(state.directory.count_active_games().await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_refreshes_settle_on_the_latest_count() {
    let state = state();
    for name in ["alice", "bob", "carol", "dave"] {
        register(&state, name).await;
    }
    start(&state, "alice", "bob").await;
    start(&state, "carol", "dave").await;

    let early: Vec<_> = (0..8)
        .map(|_| {
            let state = state.clone();
            tokio::spawn(async move { refresh_active_count(&state).await })
        })
        .collect();
    let status = game::cancel_game(Path("1".into()), State(state.clone())).await.into_response().status();
    assert_eq!(status, StatusCode::OK);
    refresh_active_count(&state).await;

    for handle in early {
        handle.await.unwrap();
    }
    assert_eq!(state.active_games.load(Ordering::Relaxed), 1);
}

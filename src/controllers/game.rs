use std::sync::atomic::Ordering;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::controllers::StringMessage;
use crate::errors::GameError;
use crate::models::coord::Coord;
use crate::models::game::{Game, GameId, GuessOutcome, MoveRecord};
use crate::AppState;

// The struct used for a new game
#[derive(Deserialize, Serialize, Debug)]
pub struct NewGame {
    pub p1_username: String,
    pub p2_username: String,
}

// The struct used for receiving a guess
#[derive(Deserialize, Serialize, Debug)]
pub struct MakeGuess {
    pub guess_x: i32,
    pub guess_y: i32,
    pub player_name: String,
}

// Outbound game state
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct GameView {
    pub urlsafe_key: String,
    pub p1_name: String,
    pub p2_name: String,
    pub next_player: Option<String>,
    pub game_over: bool,
    pub winner: Option<String>,
    pub created: DateTime<Utc>,
    pub finished: Option<DateTime<Utc>>,
    pub message: String,
}

impl GameView {
    pub fn new(game: &Game, message: &str) -> Self {
        GameView {
            urlsafe_key: game.id().to_string(),
            p1_name: game.player_1().to_string(),
            p2_name: game.player_2().to_string(),
            // nobody is due to move in a finished game
            next_player: game.is_active().then(|| game.next_player().to_string()),
            game_over: game.is_over(),
            winner: game.winner().map(|winner| winner.to_string()),
            created: game.created(),
            finished: game.finished(),
            message: message.to_string(),
        }
    }
}

// Outbound result of a guess: the message and the board that was fired at
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct GuessResponse {
    pub urlsafe_key: String,
    pub outcome: String,
    pub message: String,
    pub hits: usize,
    pub misses: usize,
    pub remaining: usize,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct GameHistory {
    pub items: Vec<MoveRecord>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ActiveGameCount {
    pub count: usize,
    pub message: String,
}

/// Recounts active games and caches the result. Refreshes run one at a time, so
/// whichever stores last also counted last.
pub async fn refresh_active_count(state: &AppState) {
    let _refresh = state.count_refresh.lock().await;
    match state.directory.count_active_games().await {
        Ok(count) => {
            state.active_games.store(count, Ordering::Relaxed);
            debug!("Active game count refreshed: {}", count);
        }
        Err(err) => error!("Error refreshing active game count: {:?}", err),
    }
}

// Runs a refresh off the request path
pub fn schedule_count_refresh(state: &AppState) {
    let state = state.clone();
    tokio::spawn(async move { refresh_active_count(&state).await });
}

//handler for creating a new game between two registered players
pub async fn new_game(  State(state): State<AppState>,
                        Json(newgame): Json<NewGame>,
                        ) -> Result<impl IntoResponse, GameError> {

    info!("new game request");

    let game = state
        .directory
        .new_game(&newgame.p1_username, &newgame.p2_username)
        .await?;

    schedule_count_refresh(&state);
    Ok((StatusCode::OK, Json(GameView::new(&game, "The game is afoot!"))))
}

//handler listing all games in progress
pub async fn list_active_games(State(state): State<AppState>) -> Result<impl IntoResponse, GameError> {

    info!("list active games request");

    let games = state.directory.list_active_games(None).await?;
    let views: Vec<GameView> = games.iter().map(|game| GameView::new(game, "")).collect();
    Ok((StatusCode::OK, Json(views)))
}

//handler for the cached active game count. Never touches the store
pub async fn active_game_count(State(state): State<AppState>) -> impl IntoResponse {

    info!("active game count request");

    let count = state.active_games.load(Ordering::Relaxed);
    Json(ActiveGameCount {
        count,
        message: format!("There are {} games in play right now.", count),
    })
}

//handler for calling off a game that has not been won yet
pub async fn cancel_game(   Path(game_key): Path<String>,
                            State(state): State<AppState>,
                            ) -> Result<impl IntoResponse, GameError> {

    info!("cancel game request for {}", game_key);

    let id: GameId = game_key.parse()?;
    state.directory.cancel(id).await?;

    schedule_count_refresh(&state);
    Ok((StatusCode::OK, Json(StringMessage::new(format!("Game {} is canceled", game_key)))))
}

//handler for a guess. Turn and repeat problems are answered with a message, not an error
pub async fn make_guess(    Path(game_key): Path<String>,
                            State(state): State<AppState>,
                            Json(guess): Json<MakeGuess>,
                            ) -> Result<impl IntoResponse, GameError> {

    info!("guess request by {} for game {}", guess.player_name, game_key);

    let id: GameId = game_key.parse()?;
    let report = state
        .directory
        .submit_guess(id, &guess.player_name, Coord::new(guess.guess_x, guess.guess_y))
        .await?;

    if report.outcome == GuessOutcome::Win {
        schedule_count_refresh(&state);
    }

    Ok((StatusCode::OK, Json(GuessResponse {
        urlsafe_key: game_key,
        outcome: report.outcome.tag().to_string(),
        message: report.outcome.message(),
        hits: report.board.hits,
        misses: report.board.misses,
        remaining: report.board.remaining,
    })))
}

//handler for the ordered moves of a game
pub async fn get_game_history(  Path(game_key): Path<String>,
                                State(state): State<AppState>,
                                ) -> Result<impl IntoResponse, GameError> {

    info!("game history request for {}", game_key);

    let id: GameId = game_key.parse()?;
    let items = state.directory.history(id).await?;
    Ok((StatusCode::OK, Json(GameHistory { items })))
}

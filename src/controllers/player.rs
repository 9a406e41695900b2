use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use log::info;
use serde::{Deserialize, Serialize};

use crate::controllers::game::GameView;
use crate::controllers::StringMessage;
use crate::errors::GameError;
use crate::models::player::PlayerStats;
use crate::AppState;

// The struct used for receiving a new user as json
#[derive(Deserialize, Serialize, Debug)]
pub struct NewUser {
    pub name: String,
    pub email: Option<String>,
}

//handler for registering a player. Names are unique
pub async fn create_user(   State(state): State<AppState>,
                            Json(user): Json<NewUser>,
                            ) -> Result<impl IntoResponse, GameError> {

    info!("new user request");

    let player = state.directory.register(&user.name, user.email).await?;
    Ok((StatusCode::CREATED, Json(StringMessage::new(format!("Welcome, {}", player.name)))))
}

//handler for looking up the stats of a single player
pub async fn player_stats(  Path(name): Path<String>,
                            State(state): State<AppState>,
                            ) -> Result<impl IntoResponse, GameError> {

    info!("player stats request for {}", name);

    let player = state.directory.player(&name).await?;
    Ok((StatusCode::OK, Json(PlayerStats::from(&player))))
}

//handler for the stats of all players, best win percentage first
pub async fn get_user_rankings(State(state): State<AppState>) -> Result<impl IntoResponse, GameError> {

    info!("rankings request");

    let players = state.directory.rankings().await?;
    let stats: Vec<PlayerStats> = players.iter().map(PlayerStats::from).collect();
    Ok((StatusCode::OK, Json(stats)))
}

//handler for the active games of a single player
pub async fn get_user_games(    Path(name): Path<String>,
                                State(state): State<AppState>,
                                ) -> Result<impl IntoResponse, GameError> {

    info!("active games request for {}", name);

    // unknown players get a 404 rather than an empty list
    state.directory.player(&name).await?;

    let games = state.directory.list_active_games(Some(&name)).await?;
    let views: Vec<GameView> = games.iter().map(|game| GameView::new(game, "")).collect();
    Ok((StatusCode::OK, Json(views)))
}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use log::info;
use serde::{Deserialize, Serialize};

use crate::errors::GameError;
use crate::models::board::{Board, CoordKind};
use crate::models::coord::Coord;
use crate::AppState;

// The struct used to add a ship to a player's board
#[derive(Deserialize, Serialize, Debug)]
pub struct InsertShip {
    pub player_name: String,
    pub opponent_name: String,
    pub start_x: i32,
    pub start_y: i32,
    pub length: u8,
    pub horizontal: bool,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct CoordsQuery {
    pub kind: Option<CoordKind>,
}

// Outbound board status
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct BoardView {
    pub urlsafe_key: String,
    pub hits: usize,
    pub misses: usize,
    pub remaining: usize,
    pub message: String,
}

impl BoardView {
    pub fn new(board: &Board, message: &str) -> Self {
        let summary = board.summary();
        BoardView {
            urlsafe_key: board.game_id().to_string(),
            hits: summary.hits,
            misses: summary.misses,
            remaining: summary.remaining,
            message: message.to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct CoordsView {
    pub coords: Vec<Coord>,
}

//handler for adding a ship to the player's board in their active game against the opponent
pub async fn insert_ship(   State(state): State<AppState>,
                            Json(ship): Json<InsertShip>,
                            ) -> Result<impl IntoResponse, GameError> {

    info!("insert ship request by {}", ship.player_name);

    let board = state
        .directory
        .place_ship(
            &ship.player_name,
            &ship.opponent_name,
            Coord::new(ship.start_x, ship.start_y),
            ship.length,
            ship.horizontal,
        )
        .await?;
    Ok((StatusCode::OK, Json(BoardView::new(&board, "Ship added successfully!"))))
}

//handler for the hit/miss/remaining counts of a player's board
pub async fn board_summary( Path((player, opponent)): Path<(String, String)>,
                            State(state): State<AppState>,
                            ) -> Result<impl IntoResponse, GameError> {

    info!("board summary request for {} vs {}", player, opponent);

    let (_, board) = state.directory.board_for_pair(&player, &opponent).await?;
    Ok((StatusCode::OK, Json(BoardView::new(&board, ""))))
}

//handler for the ship, hit or miss cells of a player's board. Defaults to ships
pub async fn get_coords(    Path((player, opponent)): Path<(String, String)>,
                            Query(query): Query<CoordsQuery>,
                            State(state): State<AppState>,
                            ) -> Result<impl IntoResponse, GameError> {

    info!("coordinates request for {} vs {}", player, opponent);

    let kind = query.kind.unwrap_or(CoordKind::Ship);
    let coords = state.directory.coordinates(&player, &opponent, kind).await?;
    Ok((StatusCode::OK, Json(CoordsView { coords })))
}

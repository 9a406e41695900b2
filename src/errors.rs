use axum::{http::StatusCode, response::IntoResponse, Json};
use log::error;
use serde_json::json;
use thiserror::Error;

// Errors surfaced by the rules engine, the directory and the stores
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("A user with that name already exists!")]
    DuplicateName,
    #[error("That name can not be used")]
    InvalidName,
    #[error("Both players must be valid and different users!")]
    InvalidPlayers,
    #[error("These players already have an active game!")]
    PlayersAlreadyPlaying,
    #[error("Player not found")]
    PlayerNotFound,
    #[error("Game not found")]
    GameNotFound,
    #[error("Board not found")]
    BoardNotFound,
    #[error("It's not your turn yet!")]
    NotYourTurn,
    #[error("Game is already over")]
    GameAlreadyOver,
    #[error("Coordinates are outside of the board")]
    OutOfBounds,
    #[error("That ship overlaps another")]
    Overlap,
    #[error("A ship needs a length of at least 1")]
    InvalidShip,
    #[error("You've already guessed those coordinates!")]
    AlreadyGuessed,
    #[error("Invalid key: {0}")]
    MalformedKey(String),
    #[error("Storage failure: {0}")]
    Storage(String),
}

impl GameError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::DuplicateName => StatusCode::CONFLICT,
            Self::PlayerNotFound | Self::GameNotFound | Self::BoardNotFound => StatusCode::NOT_FOUND,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<sqlx::Error> for GameError {
    fn from(err: sqlx::Error) -> Self {
        error!("Database error: {:?}", err);
        GameError::Storage(err.to_string())
    }
}

//implementation of custom errors that are used in handlers
impl IntoResponse for GameError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_map_to_not_found() {
        assert_eq!(GameError::GameNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(GameError::BoardNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(GameError::PlayerNotFound.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_maps_to_bad_request() {
        for err in [
            GameError::InvalidPlayers,
            GameError::OutOfBounds,
            GameError::Overlap,
            GameError::MalformedKey("x".into()),
        ] {
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
        assert_eq!(GameError::DuplicateName.status(), StatusCode::CONFLICT);
    }
}

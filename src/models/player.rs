use serde::{Deserialize, Serialize};

use crate::errors::GameError;
use crate::models::game::CANCELED;

/// Longest accepted player name, in characters. Matches the MySQL column.
pub const MAX_NAME_LEN: usize = 64;

#[derive(Deserialize, Serialize, sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub name: String,
    pub email: Option<String>,
    pub games_played: u32,
    pub games_won: u32,
}

impl Player {
    /// A player with no games behind them. Names are the identity key, so an empty
    /// name, an overlong one or the canceled-game marker is refused.
    pub fn new(name: &str, email: Option<String>) -> Result<Self, GameError> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN || name == CANCELED {
            return Err(GameError::InvalidName);
        }
        Ok(Player {
            name: name.to_string(),
            email: email.filter(|email| !email.trim().is_empty()),
            games_played: 0,
            games_won: 0,
        })
    }

    pub fn win_percentage(&self) -> f64 {
        if self.games_played == 0 {
            0.0
        } else {
            100.0 * f64::from(self.games_won) / f64::from(self.games_played)
        }
    }
}

/// The two sides of a finished game, by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameEnd<'a> {
    pub winner: &'a str,
    pub loser: &'a str,
}

// Must run exactly once per finished game
pub fn record_game_end(winner: &mut Player, loser: &mut Player) {
    winner.games_won += 1;
    winner.games_played += 1;
    loser.games_played += 1;
}

// The outbound player stats
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct PlayerStats {
    pub user_name: String,
    pub games_played: u32,
    pub games_won: u32,
    pub win_pctg: f64,
}

impl From<&Player> for PlayerStats {
    fn from(player: &Player) -> Self {
        PlayerStats {
            user_name: player.name.clone(),
            games_played: player.games_played,
            games_won: player.games_won,
            win_pctg: player.win_percentage(),
        }
    }
}

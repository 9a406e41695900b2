use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::errors::GameError;
use crate::models::board::{Board, Resolution};
use crate::models::coord::Coord;

/// Winner marker stored on a game that was called off.
pub const CANCELED: &str = "CANCELED";

// Opaque game key, rendered as a plain decimal string
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct GameId(pub u32);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GameId {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>()
            .map(GameId)
            .map_err(|_| GameError::MalformedKey(s.to_string()))
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MoveResult {
    Hit = 0,
    Miss = 1,
    Win = 2,
}

impl TryFrom<u8> for MoveResult {
    type Error = GameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MoveResult::Hit),
            1 => Ok(MoveResult::Miss),
            2 => Ok(MoveResult::Win),
            other => Err(GameError::Storage(format!("unknown move result {}", other))),
        }
    }
}

impl fmt::Display for MoveResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            MoveResult::Hit => "Hit",
            MoveResult::Miss => "Miss",
            MoveResult::Win => "Win",
        };
        f.write_str(name)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    pub player: String,
    pub coord: Coord,
    pub result: MoveResult,
}

impl fmt::Display for MoveRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[name:{}, coord:{}, result:{}]", self.player, self.coord, self.result)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(into = "String", from = "String")]
pub enum Winner {
    Player(String),
    Canceled,
}

impl From<Winner> for String {
    fn from(winner: Winner) -> Self {
        winner.to_string()
    }
}

impl From<String> for Winner {
    fn from(value: String) -> Self {
        if value == CANCELED {
            Winner::Canceled
        } else {
            Winner::Player(value)
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Winner::Player(name) => f.write_str(name),
            Winner::Canceled => f.write_str(CANCELED),
        }
    }
}

/// What a guess amounted to. The last three leave the game untouched and are
/// reported back to the player rather than failing the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuessOutcome {
    Miss,
    Hit,
    Win,
    AlreadyGuessed,
    NotYourTurn,
    GameAlreadyOver { winner: Option<Winner> },
}

impl GuessOutcome {
    pub fn message(&self) -> String {
        match self {
            GuessOutcome::Miss => "Sorry, you missed!".to_string(),
            GuessOutcome::Hit => "A hit! Keep going!".to_string(),
            GuessOutcome::Win => "Congrats, you won!".to_string(),
            GuessOutcome::AlreadyGuessed => GameError::AlreadyGuessed.to_string(),
            GuessOutcome::NotYourTurn => GameError::NotYourTurn.to_string(),
            GuessOutcome::GameAlreadyOver { winner: Some(winner) } => {
                format!("Game already over, {} won!", winner)
            }
            GuessOutcome::GameAlreadyOver { winner: None } => GameError::GameAlreadyOver.to_string(),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            GuessOutcome::Miss => "Miss",
            GuessOutcome::Hit => "Hit",
            GuessOutcome::Win => "Win",
            GuessOutcome::AlreadyGuessed => "AlreadyGuessed",
            GuessOutcome::NotYourTurn => "NotYourTurn",
            GuessOutcome::GameAlreadyOver { .. } => "GameAlreadyOver",
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Game {
    pub(crate) id: GameId,
    pub(crate) player_1: String,
    pub(crate) player_2: String,
    pub(crate) grid_size: u8,
    pub(crate) game_over: bool,
    pub(crate) next_player: String,
    pub(crate) winner: Option<Winner>,
    pub(crate) moves: Vec<MoveRecord>,
    pub(crate) created: DateTime<Utc>,
    pub(crate) finished: Option<DateTime<Utc>>,
}

impl Game {
    /// A fresh game where `player_1` moves first.
    pub fn new(id: GameId, player_1: &str, player_2: &str, grid_size: u8) -> Result<Self, GameError> {
        if player_1 == player_2 {
            return Err(GameError::InvalidPlayers);
        }
        Ok(Game {
            id,
            player_1: player_1.to_string(),
            player_2: player_2.to_string(),
            grid_size,
            game_over: false,
            next_player: player_1.to_string(),
            winner: None,
            moves: Vec::new(),
            created: Utc::now(),
            finished: None,
        })
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn player_1(&self) -> &str {
        &self.player_1
    }

    pub fn player_2(&self) -> &str {
        &self.player_2
    }

    pub fn grid_size(&self) -> u8 {
        self.grid_size
    }

    pub fn is_over(&self) -> bool {
        self.game_over
    }

    pub fn is_active(&self) -> bool {
        !self.game_over
    }

    /// The player due to move. Left as it was when the game ended.
    pub fn next_player(&self) -> &str {
        &self.next_player
    }

    pub fn winner(&self) -> Option<&Winner> {
        self.winner.as_ref()
    }

    pub fn moves(&self) -> &[MoveRecord] {
        &self.moves
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn finished(&self) -> Option<DateTime<Utc>> {
        self.finished
    }

    pub fn involves(&self, player: &str) -> bool {
        self.player_1 == player || self.player_2 == player
    }

    /// True when `{a, b}` is this game's pair of players, in either order.
    pub fn is_between(&self, a: &str, b: &str) -> bool {
        (self.player_1 == a && self.player_2 == b) || (self.player_1 == b && self.player_2 == a)
    }

    pub fn opponent_of(&self, player: &str) -> Option<&str> {
        if self.player_1 == player {
            Some(self.player_2.as_str())
        } else if self.player_2 == player {
            Some(self.player_1.as_str())
        } else {
            None
        }
    }

    pub fn cancel(&mut self) -> Result<(), GameError> {
        if self.game_over {
            return Err(GameError::GameAlreadyOver);
        }
        self.game_over = true;
        self.winner = Some(Winner::Canceled);
        self.finished = Some(Utc::now());
        info!("Game {} canceled", self.id);
        Ok(())
    }

    /// Fires `player`'s guess at `target`, which must be the opponent's board of
    /// this game. Player stats are not touched here, a `Win` tells the caller to
    /// record them.
    pub fn submit_guess(
        &mut self,
        player: &str,
        coord: Coord,
        target: &mut Board,
    ) -> Result<GuessOutcome, GameError> {
        let opponent = self.opponent_of(player).ok_or(GameError::InvalidPlayers)?.to_string();
        if target.game_id() != self.id || target.owner() != opponent {
            return Err(GameError::BoardNotFound);
        }
        if !coord.in_bounds(self.grid_size) {
            return Err(GameError::OutOfBounds);
        }
        if self.game_over {
            return Ok(GuessOutcome::GameAlreadyOver { winner: self.winner.clone() });
        }
        if self.next_player != player {
            return Ok(GuessOutcome::NotYourTurn);
        }

        match target.resolve(coord) {
            Resolution::AlreadyGuessed => Ok(GuessOutcome::AlreadyGuessed),
            Resolution::Miss => {
                self.record(player, coord, MoveResult::Miss);
                self.next_player = opponent;
                Ok(GuessOutcome::Miss)
            }
            Resolution::Hit => {
                self.record(player, coord, MoveResult::Hit);
                if target.is_fully_hit() {
                    self.game_over = true;
                    self.winner = Some(Winner::Player(player.to_string()));
                    self.finished = Some(Utc::now());
                    self.record(player, coord, MoveResult::Win);
                    info!("Game {} won by {}", self.id, player);
                    Ok(GuessOutcome::Win)
                } else {
                    self.next_player = opponent;
                    Ok(GuessOutcome::Hit)
                }
            }
        }
    }

    fn record(&mut self, player: &str, coord: Coord, result: MoveResult) {
        self.moves.push(MoveRecord {
            player: player.to_string(),
            coord,
            result,
        });
    }
}

pub mod board;
pub mod coord;
pub mod game;
pub mod player;

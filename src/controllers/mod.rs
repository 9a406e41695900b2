use serde::{Deserialize, Serialize};

pub mod board;
pub mod game;
pub mod player;

// Outbound single message
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct StringMessage {
    pub message: String,
}

impl StringMessage {
    pub fn new(message: impl Into<String>) -> Self {
        StringMessage { message: message.into() }
    }
}

//! Per-seat player record.

use serde::{Deserialize, Serialize};

/// One of the two seats in a game.
///
/// Checker counts are never cached here; they are always derived from the
/// board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Player number, 1 or 2.
    pub number: i8,
    /// Display name. Empty until a client takes the seat.
    pub name: String,
    /// Whether all of this player's checkers have entered the board.
    ///
    /// Always true in backgammon. In acey-deucey and tabula it flips to
    /// true the first time the player's home tray empties.
    pub entered: bool,
}

impl Player {
    /// Creates the record for the given seat number.
    pub fn new(number: i8) -> Self {
        Self {
            number,
            name: String::new(),
            entered: false,
        }
    }
}

//! The command/event vocabulary between the framing layer and the core.
//!
//! The framing layer (TCP, JSON, whatever carries it) is not this crate's
//! concern; these are the typed values it produces and consumes. The board
//! wire shape is the 28-slot signed array inside [`GameStateView`] together
//! with the space constants in [`crate::game::board`].

use serde::{Deserialize, Serialize};

use crate::game::moves::Move;
use crate::game::Game;

/// A command issued by a client against its session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Take a seat in the identified game.
    Join {
        /// Session to join.
        game_id: usize,
        /// Display name to seat under.
        name: String,
    },
    /// Vacate the seat.
    Leave,
    /// Roll the dice.
    Roll,
    /// Apply moves this turn. An undo is expressed as a move reversing a
    /// pending one.
    Move {
        /// Moves in the sender's own perspective.
        moves: Vec<Move>,
    },
    /// End the turn.
    Ok,
    /// Concede the game.
    Resign,
    /// Offer the doubling cube.
    Double,
}

/// An event delivered to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// A player took a seat.
    Joined {
        /// Session joined.
        game_id: usize,
        /// Seat taken.
        player_number: i8,
        /// Name of the seated player.
        player: String,
    },
    /// A player vacated a seat.
    Left {
        /// Name of the departed player.
        player: String,
    },
    /// The authoritative board, flipped into the recipient's perspective.
    Board {
        /// Snapshot plus the available moves.
        state: GameStateView,
    },
    /// Moves were committed.
    Moved {
        /// Name of the mover.
        player: String,
        /// Applied moves, in the recipient's perspective.
        moves: Vec<Move>,
    },
    /// A command was rejected; the game is unchanged.
    Failed {
        /// Human-readable reason.
        reason: String,
    },
    /// A line of text for text-mode clients.
    Notice {
        /// The line.
        message: String,
    },
}

/// Per-player snapshot of a game.
///
/// For a Player 2 recipient every slot and move has already been flipped so
/// that the recipient always sees itself as Player 1 with positive
/// checkers; the flip is purely presentational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStateView {
    /// The game snapshot.
    pub game: Game,
    /// The recipient's seat in this view (always 1 after flipping).
    pub player_number: i8,
    /// Legal moves for the turn player, in the recipient's perspective,
    /// sorted by origin then destination.
    pub available: Vec<Move>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_json_round_trip() {
        let command = Command::Move {
            moves: vec![Move::new(8, 5), Move::new(6, 5)],
        };
        let json = serde_json::to_string(&command).unwrap();
        assert_eq!(serde_json::from_str::<Command>(&json).unwrap(), command);
        assert!(json.contains("\"command\":\"move\""));
    }

    #[test]
    fn test_failed_event_shape() {
        let event = Event::Failed {
            reason: "Match is full.".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"failed\""));
        assert!(json.contains("Match is full."));
    }
}

//! Game-logic core of a networked backgammon engine.
//!
//! The crate validates, applies, and enumerates moves across three
//! backgammon variants — standard backgammon, acey-deucey, and tabula —
//! and wraps the rule engine in a two-seat session that binds remote
//! clients to one authoritative game.
//!
//! # Architecture
//!
//! - **Board**: a flat 28-slot signed array (24 points, two bars, two home
//!   trays) with pure coordinate helpers; all rules are written in
//!   Player 1's frame.
//! - **Move engine**: legality ([`Game::legal_moves`]), pip accounting
//!   against the roll, the must-play-maximum-pips filter, compound-move
//!   expansion, and a reversible copy-and-commit mutator
//!   ([`Game::add_moves`]).
//! - **Session**: seats up to two clients, rolls the dice, and routes each
//!   player a perspective-flipped board view over its event channel.
//!
//! # Example
//!
//! ```
//! use tavla::{Game, Move, Variant};
//!
//! let mut game = Game::new(Variant::Backgammon);
//! game.player1.name = "alice".to_string();
//! game.player2.name = "bert".to_string();
//! game.turn = 1;
//! game.roll1 = 3;
//! game.roll2 = 1;
//!
//! // The classic 3-1 play makes the 5 point.
//! let legal = game.legal_moves(false);
//! assert!(legal.contains(&Move::new(8, 5)));
//! assert!(legal.contains(&Move::new(6, 5)));
//! let applied = game.add_moves(&[Move::new(8, 5), Move::new(6, 5)], false).unwrap();
//! assert_eq!(applied.len(), 2);
//! assert_eq!(game.board[5], 2);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod events;
pub mod game;
mod session;

pub use events::{Command, Event, GameStateView};
pub use game::board::{
    flip_moves, flip_space, format_and_flip_moves, format_moves, format_space, home_range,
    iterate_spaces, opponent_checkers, player_checkers, sort_moves, space_diff, starting_board,
    valid_space, Board, Checkers, Space, BOARD_SPACES, SPACE_BAR_OPPONENT, SPACE_BAR_PLAYER,
    SPACE_HOME_OPPONENT, SPACE_HOME_PLAYER,
};
pub use game::moves::{Move, MoveError};
pub use game::player::Player;
pub use game::variant::Variant;
pub use game::Game;
pub use session::{ClientHandle, Session, SessionError};

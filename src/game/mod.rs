//! Authoritative game state and the rule engine over it.
//!
//! The [`Game`] value is the single source of truth for a match. It is
//! mutated exclusively through the move-engine operations in [`moves`],
//! which follow a copy-and-commit discipline: speculative work happens on a
//! clone, and the authoritative value only adopts the result on full
//! success.

pub mod board;
pub mod moves;
pub mod player;
pub mod render;
pub mod variant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use board::{starting_board, Board};
use moves::Move;
use player::Player;
use variant::Variant;

/// Full state of one backgammon match.
///
/// All rule logic is expressed in Player 1's frame; Player 2's view is
/// computed at presentation time by the session. The reversal stacks that
/// make pending moves undoable are private and never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    /// When the first die of the match was rolled.
    pub started: Option<DateTime<Utc>>,
    /// When the match ended.
    pub ended: Option<DateTime<Utc>>,

    /// Seat 1.
    pub player1: Player,
    /// Seat 2.
    pub player2: Player,

    /// Rule variant in play.
    pub variant: Variant,
    /// Checker counts per slot; see [`board`] for the layout.
    pub board: Board,
    /// Whose turn it is: 0 before the initiative contest resolves.
    pub turn: i8,

    /// First die, 0 when the current turn has not rolled.
    pub roll1: i8,
    /// Second die.
    pub roll2: i8,
    /// Third die, used only in tabula.
    pub roll3: i8,

    /// Moves applied so far this turn, oldest first.
    pub moves: Vec<Move>,
    /// Winning player, or 0 while the game is live.
    pub winner: i8,

    /// Points required to win the match.
    pub points: i8,
    /// Doubling cube value.
    pub double_value: i8,
    /// Player currently holding the doubling cube, or 0 when centered.
    pub double_player: i8,
    /// Whether the current player has offered a double.
    pub double_offered: bool,

    /// Whether the turn player earned an acey-deucey bonus turn.
    pub reroll: bool,

    // One snapshot per pending move, so each can be undone in LIFO order.
    #[serde(skip)]
    board_states: Vec<Board>,
    #[serde(skip)]
    entered_states: Vec<(bool, bool)>,
}

impl Game {
    /// Creates a fresh game of the given variant.
    pub fn new(variant: Variant) -> Self {
        let mut game = Self {
            started: None,
            ended: None,
            player1: Player::new(1),
            player2: Player::new(2),
            variant,
            board: starting_board(variant),
            turn: 0,
            roll1: 0,
            roll2: 0,
            roll3: 0,
            moves: Vec::new(),
            winner: 0,
            points: 1,
            double_value: 1,
            double_player: 0,
            double_offered: false,
            reroll: false,
            board_states: Vec::new(),
            entered_states: Vec::new(),
        };
        if variant == Variant::Backgammon {
            game.player1.entered = true;
            game.player2.entered = true;
        }
        game
    }

    /// Resets the match for a rematch: board, dice, cube, and reversal
    /// stacks are cleared while player identities and the variant persist.
    pub fn reset(&mut self) {
        if self.variant != Variant::Backgammon {
            self.player1.entered = false;
            self.player2.entered = false;
        }
        self.board = starting_board(self.variant);
        self.turn = 0;
        self.roll1 = 0;
        self.roll2 = 0;
        self.roll3 = 0;
        self.moves.clear();
        self.winner = 0;
        self.double_value = 1;
        self.double_player = 0;
        self.double_offered = false;
        self.reroll = false;
        self.board_states.clear();
        self.entered_states.clear();
    }

    /// The player whose turn it is. Before the initiative contest resolves
    /// this defaults to seat 1.
    pub fn turn_player(&self) -> &Player {
        match self.turn {
            2 => &self.player2,
            _ => &self.player1,
        }
    }

    /// The player waiting on the turn player.
    pub fn opponent_player(&self) -> &Player {
        match self.turn {
            2 => &self.player1,
            _ => &self.player2,
        }
    }

    /// Number of moves currently pending (and undoable) this turn.
    pub fn pending_moves(&self) -> usize {
        debug_assert_eq!(self.board_states.len(), self.moves.len());
        debug_assert_eq!(self.entered_states.len(), self.moves.len());
        self.moves.len()
    }

    pub(crate) fn push_undo_state(&mut self) {
        self.board_states.push(self.board);
        self.entered_states
            .push((self.player1.entered, self.player2.entered));
    }

    pub(crate) fn pop_undo_state(&mut self) -> bool {
        let Some(last) = self.moves.len().checked_sub(1) else {
            return false;
        };
        self.board = self.board_states[last];
        let (entered1, entered2) = self.entered_states[last];
        self.player1.entered = entered1;
        self.player2.entered = entered2;
        self.board_states.truncate(last);
        self.entered_states.truncate(last);
        self.moves.truncate(last);
        true
    }

    pub(crate) fn clear_undo_states(&mut self) {
        self.board_states.clear();
        self.entered_states.clear();
    }
}

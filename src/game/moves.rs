//! Move legality, expansion, and the reversible commit path.
//!
//! The engine answers one query, [`Game::legal_moves`], and applies one
//! mutator, [`Game::add_moves`]. Everything else here feeds those two:
//! pip accounting against the roll, bear-off eligibility, the
//! must-play-maximum-pips filter, and the LIFO undo of pending moves.

use std::collections::HashSet;
use std::fmt;

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::board::{
    format_moves, format_space, home_range, iterate_spaces, opponent_checkers, player_checkers,
    space_diff, Space, BOARD_SPACES, SPACE_BAR_OPPONENT, SPACE_BAR_PLAYER, SPACE_HOME_OPPONENT,
    SPACE_HOME_PLAYER,
};
use super::variant::Variant;
use super::Game;

/// A single checker move between two spaces.
///
/// Ordering is by origin, then destination, which is also the order the
/// available-move list is sent in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Move {
    /// Space the checker leaves.
    pub from: Space,
    /// Space the checker lands on.
    pub to: Space,
}

impl Move {
    /// Creates a move.
    pub fn new(from: Space, to: Space) -> Self {
        Self { from, to }
    }

    /// The reverse of this move, as a client expresses an undo.
    pub fn reversed(self) -> Self {
        Self {
            from: self.to,
            to: self.from,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", format_space(self.from), format_space(self.to))
    }
}

/// Why a move request was rejected.
///
/// The authoritative game is untouched whenever one of these is returned;
/// all mutation happens on a copy that is only adopted on full success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum MoveError {
    /// Both seats must be occupied before moves are accepted.
    #[display("both seats must be filled before moving")]
    SeatsOpen,
    /// The game already has a winner.
    #[display("the game is over")]
    GameOver,
    /// One request cannot both add new moves and undo pending ones.
    #[display("cannot mix new moves and undone moves in one request")]
    MixedAddUndo,
    /// The move is neither legal, an undo of a pending move, nor
    /// expandable into a sequence of legal hops.
    #[display("illegal move: {mv}")]
    Illegal {
        /// The offending move.
        mv: Move,
    },
}

/// Consumes one pip from `rolls` to account for the move, preferring an
/// exact match. A bear-off may consume a strictly greater pip, but only in
/// backgammon. Returns false when no pip can explain the move.
fn use_dice_roll(rolls: &mut Vec<i8>, mv: Move, variant: Variant) -> bool {
    if mv.to == SPACE_HOME_PLAYER || mv.to == SPACE_HOME_OPPONENT {
        let need = if mv.to == SPACE_HOME_OPPONENT || variant == Variant::Tabula {
            25 - mv.from
        } else {
            mv.from
        };
        if let Some(i) = rolls.iter().position(|&r| r == need) {
            rolls.remove(i);
            return true;
        }
        if variant == Variant::Backgammon {
            if let Some(i) = rolls.iter().position(|&r| r > need) {
                rolls.remove(i);
                return true;
            }
        }
        return false;
    }
    let diff = space_diff(mv.from, mv.to, variant);
    if let Some(i) = rolls.iter().position(|&r| r == diff) {
        rolls.remove(i);
        return true;
    }
    false
}

impl Game {
    /// The multiset of unused pips: the roll (doubles count four times, the
    /// tabula third die once) minus one pip per already-pending move.
    ///
    /// Returns the empty multiset when a pending move cannot be accounted
    /// for by any remaining pip; that state is broken and admits no further
    /// moves until the turn is cleared.
    pub fn dice_rolls(&self) -> Vec<i8> {
        let mut rolls = vec![self.roll1, self.roll2];
        if self.variant == Variant::Tabula {
            rolls.push(self.roll3);
        } else if self.roll1 == self.roll2 {
            rolls.push(self.roll1);
            rolls.push(self.roll2);
        }

        for &mv in &self.moves {
            if !use_dice_roll(&mut rolls, mv, self.variant) {
                return Vec::new();
            }
        }
        rolls
    }

    /// Count of unused pips that realize the candidate move exactly.
    ///
    /// Two gates apply before the pip lookup: a tabula move into the far
    /// half is forbidden while the side has not entered, and a move into
    /// home requires bear-off eligibility.
    pub fn have_dice_roll(&self, from: Space, to: Space) -> i8 {
        if self.variant == Variant::Tabula
            && (13..=24).contains(&to)
            && ((self.turn == 1 && !self.player1.entered)
                || (self.turn == 2 && !self.player2.entered))
        {
            return 0;
        }
        if (to == SPACE_HOME_PLAYER || to == SPACE_HOME_OPPONENT)
            && !self.may_bear_off(self.turn, false)
        {
            return 0;
        }
        let diff = space_diff(from, to, self.variant);
        if diff == 0 {
            return 0;
        }
        self.dice_rolls().iter().filter(|&&r| r == diff).count() as i8
    }

    /// Count of unused pips that bear off from the given distance. In
    /// backgammon a strictly greater pip also qualifies (overshoot).
    pub fn have_bear_off_dice_roll(&self, diff: i8) -> i8 {
        if diff == 0 {
            return 0;
        }
        self.dice_rolls()
            .iter()
            .filter(|&&r| r == diff || (r > diff && self.variant == Variant::Backgammon))
            .count() as i8
    }

    /// Whether the player may bear checkers off the board: nothing on
    /// either bar, the side has entered, and no checker sits outside the
    /// home quadrant. Tabula additionally requires [`Game::second_half`].
    ///
    /// Local games are always viewed from the mover's own frame, so their
    /// home quadrant is 1-6 regardless of seat.
    pub fn may_bear_off(&self, player: i8, local: bool) -> bool {
        if player_checkers(self.board[SPACE_BAR_PLAYER as usize], player) > 0
            || player_checkers(self.board[SPACE_BAR_OPPONENT as usize], player) > 0
        {
            return false;
        }
        if (player == 1 && !self.player1.entered) || (player == 2 && !self.player2.entered) {
            return false;
        }
        if self.variant == Variant::Tabula {
            return self.second_half(player);
        }

        let (home_start, home_end) = if local {
            (1, 6)
        } else {
            let (a, b) = home_range(player, self.variant);
            (a.min(b), a.max(b))
        };
        for space in 1..=24 {
            let here = space as Space;
            if (here < home_start || here > home_end)
                && player_checkers(self.board[space], player) > 0
            {
                return false;
            }
        }
        true
    }

    /// Tabula predicate: the player's caravan has cleared the first half of
    /// the board (nothing on the bar, the tray is empty or the side has
    /// entered, and points 1-12 hold none of the player's checkers).
    ///
    /// # Panics
    ///
    /// Panics on a player number other than 1 or 2; callers only pass
    /// internally constructed seat numbers.
    pub fn second_half(&self, player: i8) -> bool {
        if self.variant != Variant::Tabula {
            return false;
        }

        match player {
            1 => {
                if self.board[SPACE_BAR_PLAYER as usize] != 0 {
                    return false;
                }
                if !self.player1.entered && self.board[SPACE_HOME_PLAYER as usize] != 0 {
                    return false;
                }
            }
            2 => {
                if self.board[SPACE_BAR_OPPONENT as usize] != 0 {
                    return false;
                }
                if !self.player2.entered && self.board[SPACE_HOME_OPPONENT as usize] != 0 {
                    return false;
                }
            }
            _ => panic!("unknown player: {player}"),
        }

        for space in 1..13 {
            let checkers = self.board[space];
            if (player == 1 && checkers > 0) || (player == 2 && checkers < 0) {
                return false;
            }
        }
        true
    }

    fn set_entered(&mut self) {
        if self.variant == Variant::Backgammon {
            return;
        }
        if !self.player1.entered && self.board[SPACE_HOME_PLAYER as usize] == 0 {
            self.player1.entered = true;
        } else if !self.player2.entered && self.board[SPACE_HOME_OPPONENT as usize] == 0 {
            self.player2.entered = true;
        }
    }

    /// Applies one move: snapshot for undo, decrement the source, hit or
    /// stack the destination, record the move, refresh the entered flags.
    /// Returns false (without snapshotting) when the destination is held by
    /// two or more opposing checkers.
    fn apply_move(&mut self, mv: Move) -> bool {
        let opposing = opponent_checkers(self.board[mv.to as usize], self.turn);
        if opposing > 1 {
            return false;
        }

        let delta: i8 = if self.turn == 2 { -1 } else { 1 };
        self.push_undo_state();

        self.board[mv.from as usize] -= delta;
        if opposing == 1 {
            // Hit: the displaced blot goes to its owner's bar atomically.
            self.board[mv.to as usize] = delta;
            let bar = if self.turn == 2 {
                SPACE_BAR_PLAYER
            } else {
                SPACE_BAR_OPPONENT
            };
            self.board[bar as usize] -= delta;
        } else {
            self.board[mv.to as usize] += delta;
        }

        self.moves.push(mv);
        self.set_entered();
        true
    }

    /// Applies a move without validation.
    ///
    /// Useful for a client tracking its own copy of the game while waiting
    /// for the authoritative board from the server.
    pub fn add_local_move(&mut self, mv: Move) -> bool {
        self.apply_move(mv)
    }

    /// Expands a compound click into single-pip hops.
    ///
    /// Searches the legal-move graph depth-first from `current`, preferring
    /// hops that hit an opposing blot, until the requested destination is
    /// reached. Returns the full hop sequence (appended to `prefix`), or
    /// `None` when no sequence realizes the request.
    pub fn expand_move(
        &self,
        mv: Move,
        current: Space,
        prefix: &[Move],
        local: bool,
    ) -> Option<Vec<Move>> {
        let legal = self.legal_moves(local);
        let hits: Vec<Move> = legal
            .iter()
            .copied()
            .filter(|m| opponent_checkers(self.board[m.to as usize], self.turn) == 1)
            .collect();

        for candidates in [&hits, &legal] {
            for &hop in candidates.iter() {
                if hop.from != current {
                    continue;
                }

                let mut sequence = prefix.to_vec();
                sequence.push(hop);
                if hop.to == mv.to {
                    return Some(sequence);
                }

                let mut sim = self.clone();
                sim.apply_move(hop);
                if let Some(found) = sim.expand_move(mv, hop.to, &sequence, local) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Commits moves to the game.
    ///
    /// The request is partitioned into adds (each present in the current
    /// legal-move set, directly or via [`Game::expand_move`]) and undos
    /// (each reversing a pending move, peeled newest-first); a request
    /// mixing the two fails. All work happens on a copy that is adopted
    /// only on full success, and the applied partition is returned so the
    /// session can echo it to clients.
    #[instrument(skip(self), fields(turn = self.turn))]
    pub fn add_moves(&mut self, moves: &[Move], local: bool) -> Result<Vec<Move>, MoveError> {
        if self.player1.name.is_empty() || self.player2.name.is_empty() {
            return Err(MoveError::SeatsOpen);
        }
        if self.winner != 0 {
            return Err(MoveError::GameOver);
        }

        let mut add_moves: Vec<Move> = Vec::new();
        let mut undo_moves: Vec<Move> = Vec::new();
        let mut game_copy = self.clone();
        let mut validate_offset = 0;

        'validate: for &mv in moves {
            if game_copy.legal_moves(local).contains(&mv) {
                add_moves.push(mv);
                continue 'validate;
            }

            if !game_copy.moves.is_empty() {
                let pending = game_copy.moves.len();
                if validate_offset >= pending {
                    return Err(MoveError::Illegal { mv });
                }
                let game_move = game_copy.moves[pending - 1 - validate_offset];
                if mv.from == game_move.to && mv.to == game_move.from {
                    undo_moves.push(game_move.reversed());
                    validate_offset += 1;
                    continue 'validate;
                }
            }

            if let Some(expanded) = self.expand_move(mv, mv.from, &[], local) {
                add_moves.extend(expanded);
                continue 'validate;
            }

            return Err(MoveError::Illegal { mv });
        }

        if !add_moves.is_empty() && !undo_moves.is_empty() {
            return Err(MoveError::MixedAddUndo);
        }

        let mut check_win = false;
        'apply: for &mv in &add_moves {
            for legal in game_copy.legal_moves(local) {
                if legal == mv {
                    if !game_copy.apply_move(mv) {
                        return Err(MoveError::Illegal { mv });
                    }
                    if mv.to == SPACE_HOME_PLAYER || mv.to == SPACE_HOME_OPPONENT {
                        check_win = true;
                    }
                    continue 'apply;
                }
            }
        }
        for &mv in &undo_moves {
            let matches = game_copy
                .moves
                .last()
                .is_some_and(|last| mv.from == last.to && mv.to == last.from);
            if !matches || !game_copy.pop_undo_state() {
                return Err(MoveError::Illegal { mv });
            }
        }

        *self = game_copy;

        if check_win {
            let entered = if !local && self.turn == 2 {
                self.player2.entered
            } else {
                self.player1.entered
            };

            let found_checker = if self.variant != Variant::Backgammon && !entered {
                true
            } else {
                (1..=24).any(|space| player_checkers(self.board[space], self.turn) != 0)
            };

            if !found_checker {
                self.winner = self.turn;
                self.ended = Some(chrono::Utc::now());
                info!(winner = self.winner, "game won");
            }
        }

        let applied = if !add_moves.is_empty() {
            add_moves
        } else {
            undo_moves
        };
        debug!(moves = %format_moves(&applied), "moves committed");
        Ok(applied)
    }

    /// Every maximum-length move sequence playable from the current state.
    pub fn total_moves(&self, local: bool) -> Vec<Vec<Move>> {
        let mut max_len = 0;
        let mut all: Vec<Vec<Move>> = Vec::new();
        for mv in self.legal_moves(local) {
            for sequence in self.sequences_from(&self.moves, mv) {
                if sequence.len() > max_len {
                    max_len = sequence.len();
                } else if sequence.len() < max_len {
                    continue;
                }
                all.push(sequence);
            }
        }
        all.retain(|sequence| sequence.len() == max_len);
        all
    }

    /// Plays `mv` on a copy and recursively extends it with further
    /// candidate moves, returning every sequence reachable from it (the
    /// bare `prefix + mv` first, longer continuations after).
    ///
    /// The recursion expands unfiltered candidates: a maximum-length
    /// sequence survives the max-pip filter at every level anyway, so the
    /// reachable maximum is identical and the simulation stays linear in
    /// the branching factor.
    fn sequences_from(&self, prefix: &[Move], mv: Move) -> Vec<Vec<Move>> {
        let mut sim = self.clone();
        assert!(
            sim.apply_move(mv),
            "candidate move {mv} failed to apply after {}",
            format_moves(prefix)
        );

        let mut sequence = prefix.to_vec();
        sequence.push(mv);
        let mut max_len = sequence.len();
        let mut all = vec![sequence.clone()];
        for next in sim.candidate_moves() {
            for longer in sim.sequences_from(&sequence, next) {
                if longer.len() > max_len {
                    max_len = longer.len();
                } else if longer.len() < max_len {
                    continue;
                }
                all.push(longer);
            }
        }
        all
    }

    /// Renames opponent-frame bar and home references to the mover's own
    /// constants. The shared-direction walks run into the far tray slot, so
    /// a mover's bear-off can surface under the opponent's tray name; the
    /// physical slot it denotes is the mover's own tray either way.
    fn normalize_space(&self, space: Space) -> Space {
        match (self.turn, space) {
            (1, SPACE_HOME_OPPONENT) => SPACE_HOME_PLAYER,
            (1, SPACE_BAR_OPPONENT) => SPACE_BAR_PLAYER,
            (2, SPACE_HOME_PLAYER) => SPACE_HOME_OPPONENT,
            (2, SPACE_BAR_PLAYER) => SPACE_BAR_OPPONENT,
            _ => space,
        }
    }

    /// Every playable single move before the max-pip filter: entry moves
    /// while a checker waits on a bar, otherwise bear-offs and forward
    /// moves to unblocked destinations, normalized and deduplicated.
    fn candidate_moves(&self) -> Vec<Move> {
        if self.winner != 0 || self.roll1 == 0 || self.roll2 == 0 {
            return Vec::new();
        }

        let mut moves: Vec<Move> = Vec::new();
        let mut seen: HashSet<Move> = HashSet::new();
        let mut emit = |mv: Move| {
            let mv = Move::new(self.normalize_space(mv.from), self.normalize_space(mv.to));
            if seen.insert(mv) {
                moves.push(mv);
            }
        };

        let bar_space = if player_checkers(self.board[SPACE_BAR_PLAYER as usize], self.turn) > 0 {
            Some(SPACE_BAR_PLAYER)
        } else if player_checkers(self.board[SPACE_BAR_OPPONENT as usize], self.turn) > 0 {
            Some(SPACE_BAR_OPPONENT)
        } else {
            None
        };

        if let Some(bar_space) = bar_space {
            // Entry from the bar is mandatory and lands in the opposing
            // home quadrant (1-6 in tabula's shared direction).
            let (from, to) = if self.variant == Variant::Tabula {
                (1, 6)
            } else {
                home_range(self.opponent_player().number, self.variant)
            };
            iterate_spaces(from, to, self.variant, &mut |home_space, _| {
                if self.have_dice_roll(bar_space, home_space) == 0 {
                    return;
                }
                if opponent_checkers(self.board[home_space as usize], self.turn) <= 1 {
                    emit(Move::new(bar_space, home_space));
                }
            });
        } else {
            let may_bear_off = self.may_bear_off(self.turn, false);
            for sp in 0..BOARD_SPACES {
                let space = sp as Space;
                if space == SPACE_BAR_PLAYER || space == SPACE_BAR_OPPONENT {
                    continue;
                }
                if space == SPACE_HOME_PLAYER || space == SPACE_HOME_OPPONENT {
                    let (home_space, entered) = if self.turn == 2 {
                        (SPACE_HOME_OPPONENT, self.player2.entered)
                    } else {
                        (SPACE_HOME_PLAYER, self.player1.entered)
                    };
                    // The tray is a move source only while entering in the
                    // tray-start variants.
                    if self.variant == Variant::Backgammon || space != home_space || entered {
                        continue;
                    }
                }

                if player_checkers(self.board[sp], self.turn) == 0 {
                    continue;
                }

                if may_bear_off {
                    let home_space = if self.turn == 2 {
                        SPACE_HOME_OPPONENT
                    } else {
                        SPACE_HOME_PLAYER
                    };
                    let available =
                        self.have_bear_off_dice_roll(space_diff(space, home_space, self.variant));
                    if available > 0 {
                        let mut ok = true;
                        if self.variant == Variant::Backgammon
                            && self.have_dice_roll(space, home_space) == 0
                        {
                            // Overshoot is reserved for the highest
                            // occupied point.
                            let (_, home_end) = home_range(self.turn, self.variant);
                            if self.turn == 2 {
                                for behind in home_end..space {
                                    if player_checkers(self.board[behind as usize], self.turn) != 0
                                    {
                                        ok = false;
                                        break;
                                    }
                                }
                            } else {
                                for behind in (space + 1)..=home_end {
                                    if player_checkers(self.board[behind as usize], self.turn) != 0
                                    {
                                        ok = false;
                                        break;
                                    }
                                }
                            }
                        }
                        if ok {
                            emit(Move::new(space, home_space));
                        }
                    }
                }

                let last_space: Space = if self.turn == 2 || self.variant == Variant::Tabula {
                    25
                } else {
                    0
                };
                let mut forward = |to: Space, _: i8| {
                    if self.have_dice_roll(space, to) == 0 {
                        return;
                    }
                    if opponent_checkers(self.board[to as usize], self.turn) <= 1 {
                        emit(Move::new(space, to));
                    }
                };
                if space == SPACE_HOME_PLAYER {
                    let start: Space = if self.variant == Variant::Tabula { 1 } else { 25 };
                    iterate_spaces(start, last_space, self.variant, &mut forward);
                } else if space == SPACE_HOME_OPPONENT {
                    iterate_spaces(1, last_space, self.variant, &mut forward);
                } else {
                    iterate_spaces(space, last_space, self.variant, &mut forward);
                }
            }
        }

        moves
    }

    /// All legal single moves for the turn player.
    ///
    /// While any of the mover's checkers is on a bar, only entry moves are
    /// produced. Otherwise each occupied space yields its bear-off (when
    /// eligible) and its forward moves to unblocked destinations. The
    /// result is filtered by the must-play-maximum-pips rule: only moves
    /// whose best continuation reaches the global maximum sequence length
    /// survive, unless no sequence longer than one exists.
    ///
    /// The `local` flag is part of the shared call contract with
    /// client-side (flipped) games; the enumeration itself is
    /// frame-independent, so it is not consulted here.
    pub fn legal_moves(&self, _local: bool) -> Vec<Move> {
        let mut moves = self.candidate_moves();

        // Keep only moves whose best continuation plays the maximum number
        // of pips reachable anywhere this turn.
        let mut max_count = 0;
        let counts: Vec<usize> = moves
            .iter()
            .map(|&mv| {
                let count = self
                    .sequences_from(&self.moves, mv)
                    .iter()
                    .map(Vec::len)
                    .max()
                    .unwrap_or(0);
                max_count = max_count.max(count);
                count
            })
            .collect();
        if max_count > 1 {
            moves = moves
                .into_iter()
                .zip(counts)
                .filter(|&(_, count)| count >= max_count)
                .map(|(mv, _)| mv)
                .collect();
        }

        moves
    }

    /// Ends the turn: hands the dice to the other seat (unless an
    /// acey-deucey bonus turn was earned), and clears the roll, the pending
    /// moves, and the reversal stacks.
    #[instrument(skip(self))]
    pub fn next_turn(&mut self, reroll: bool) {
        if self.winner != 0 {
            return;
        }
        if !reroll {
            self.turn = if self.turn == 1 { 2 } else { 1 };
        }
        self.roll1 = 0;
        self.roll2 = 0;
        self.roll3 = 0;
        self.moves.clear();
        self.clear_undo_states();
    }
}

//! Flat 28-slot board and the pure coordinate helpers over it.
//!
//! Indices 1 through 24 are the points. Index 0 is Player 1's home tray,
//! 25 is Player 2's home tray, 26 is Player 1's bar and 27 is Player 2's
//! bar. A positive count belongs to Player 1, a negative count to Player 2;
//! zero is empty. The constants are named from the server's Player-1 frame,
//! which is also the frame every rule in the engine is written in.

use super::moves::Move;
use super::variant::Variant;

/// Board space index.
pub type Space = i8;
/// Signed checker count at a single space.
pub type Checkers = i8;

/// Number of board slots: 24 points, two home trays, two bars.
pub const BOARD_SPACES: usize = 28;

/// Player 1's home tray.
pub const SPACE_HOME_PLAYER: Space = 0;
/// Player 2's home tray.
pub const SPACE_HOME_OPPONENT: Space = 25;
/// Player 1's bar.
pub const SPACE_BAR_PLAYER: Space = 26;
/// Player 2's bar.
pub const SPACE_BAR_OPPONENT: Space = 27;

/// The board: checker counts per slot, sign encodes ownership.
pub type Board = [Checkers; BOARD_SPACES];

/// Returns the starting board for the variant.
///
/// Backgammon uses the standard 2/5/3/5 mirror layout. Acey-deucey and
/// tabula stack all fifteen checkers of each side on that side's home tray,
/// to be entered onto the board.
pub fn starting_board(variant: Variant) -> Board {
    let mut spaces: Board = [0; BOARD_SPACES];
    match variant {
        Variant::Backgammon => {
            spaces[24] = 2;
            spaces[13] = 5;
            spaces[8] = 3;
            spaces[6] = 5;
            spaces[1] = -2;
            spaces[12] = -5;
            spaces[17] = -3;
            spaces[19] = -5;
        }
        Variant::AceyDeucey | Variant::Tabula => {
            spaces[SPACE_HOME_PLAYER as usize] = 15;
            spaces[SPACE_HOME_OPPONENT as usize] = -15;
        }
    }
    spaces
}

/// Whether `space` is a valid board index.
pub fn valid_space(space: Space) -> bool {
    (0..BOARD_SPACES as Space).contains(&space)
}

/// Pip distance between two spaces, respecting direction and variant.
///
/// Disallowed pairings (moving to a bar, bar to home, home to home in
/// backgammon) yield 0. The guard order is semantic: bar and home cases are
/// resolved before the plain point-to-point difference.
pub fn space_diff(from: Space, to: Space, variant: Variant) -> i8 {
    if !valid_space(from) || !valid_space(to) {
        0
    } else if to == SPACE_BAR_PLAYER || to == SPACE_BAR_OPPONENT {
        0
    } else if (from == SPACE_BAR_PLAYER || from == SPACE_BAR_OPPONENT)
        && (to == SPACE_HOME_PLAYER || to == SPACE_HOME_OPPONENT)
    {
        0
    } else if to == SPACE_HOME_PLAYER {
        if variant == Variant::Tabula {
            25 - from
        } else {
            from
        }
    } else if to == SPACE_HOME_OPPONENT {
        25 - from
    } else if from == SPACE_HOME_PLAYER || from == SPACE_HOME_OPPONENT {
        match variant {
            Variant::AceyDeucey => {
                if from == SPACE_HOME_PLAYER {
                    25 - to
                } else {
                    to
                }
            }
            Variant::Tabula => to,
            Variant::Backgammon => 0,
        }
    } else if from == SPACE_BAR_PLAYER {
        if variant == Variant::Tabula {
            to
        } else {
            25 - to
        }
    } else if from == SPACE_BAR_OPPONENT {
        to
    } else {
        (to - from).abs()
    }
}

/// A space as seen from the given player's perspective.
///
/// Player 1's frame is the identity. For Player 2 the bars and homes swap,
/// and in the opposed-direction variants the points mirror through the
/// middle of the board. Tabula shares one direction, so only the bars and
/// homes swap.
pub fn flip_space(space: Space, player: i8, variant: Variant) -> Space {
    if player == 1 {
        return space;
    }
    if !(1..=24).contains(&space) {
        return match space {
            SPACE_HOME_PLAYER => SPACE_HOME_OPPONENT,
            SPACE_HOME_OPPONENT => SPACE_HOME_PLAYER,
            SPACE_BAR_PLAYER => SPACE_BAR_OPPONENT,
            SPACE_BAR_OPPONENT => SPACE_BAR_PLAYER,
            _ => -1,
        };
    }
    if variant == Variant::Tabula {
        return space;
    }
    24 - space + 1
}

/// Flips every move into the given player's perspective.
pub fn flip_moves(moves: &[Move], player: i8, variant: Variant) -> Vec<Move> {
    moves
        .iter()
        .map(|m| {
            Move::new(
                flip_space(m.from, player, variant),
                flip_space(m.to, player, variant),
            )
        })
        .collect()
}

/// Walks the spaces from `from` to `to` inclusive, in whichever direction
/// `to` lies, yielding each space with a 1-based step count.
///
/// In backgammon the walk is clamped onto the points: a home-tray endpoint
/// at the `from` end is pulled in to 1 or 24.
pub fn iterate_spaces(from: Space, to: Space, variant: Variant, f: &mut impl FnMut(Space, i8)) {
    if from == to || !(0..=25).contains(&from) || !(0..=25).contains(&to) {
        return;
    }
    let mut from = from;
    if variant == Variant::Backgammon {
        if from == 0 {
            from = 1;
        } else if from == 25 {
            from = 24;
        }
    }
    let mut count = 1;
    if to > from {
        for space in from..=to {
            f(space, count);
            count += 1;
        }
    } else {
        for space in (to..=from).rev() {
            f(space, count);
            count += 1;
        }
    }
}

/// Unsigned count of the given player's checkers in a slot value, or 0 when
/// the slot is empty or belongs to the other side.
pub fn player_checkers(checkers: Checkers, player: i8) -> Checkers {
    if player == 1 {
        checkers.max(0)
    } else {
        (-checkers).max(0)
    }
}

/// Unsigned count of the given player's opponent's checkers in a slot value.
pub fn opponent_checkers(checkers: Checkers, player: i8) -> Checkers {
    player_checkers(checkers, if player == 1 { 2 } else { 1 })
}

/// Start and end of the player's home board, ordered in that player's
/// direction of travel.
///
/// Player 1 bears off from points 1-6; Player 2 from 19-24. In tabula both
/// sides share the 19-24 quadrant.
pub fn home_range(player: i8, variant: Variant) -> (Space, Space) {
    if player == 2 || variant == Variant::Tabula {
        (24, 19)
    } else {
        (1, 6)
    }
}

/// Orders moves by origin, then destination. Applied to the available-move
/// list before it is sent to clients.
pub fn sort_moves(moves: &mut [Move]) {
    moves.sort();
}

/// Human-readable name for a space: a point number, `bar`, or `off`.
pub fn format_space(space: Space) -> String {
    if (1..=24).contains(&space) {
        space.to_string()
    } else if space == SPACE_BAR_PLAYER || space == SPACE_BAR_OPPONENT {
        "bar".to_string()
    } else if space == SPACE_HOME_PLAYER || space == SPACE_HOME_OPPONENT {
        "off".to_string()
    } else {
        "?".to_string()
    }
}

/// Formats moves as `from/to` pairs separated by spaces, or `none`.
pub fn format_moves(moves: &[Move]) -> String {
    if moves.is_empty() {
        return "none".to_string();
    }
    moves
        .iter()
        .map(|m| format!("{}/{}", format_space(m.from), format_space(m.to)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Formats moves in the given player's perspective.
pub fn format_and_flip_moves(moves: &[Move], player: i8, variant: Variant) -> String {
    format_moves(&flip_moves(moves, player, variant))
}

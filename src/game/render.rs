//! Monospace text rendering of the board, for text-mode clients.
//!
//! The format is part of the terminal-client contract: numbered top and
//! bottom rails, eleven board rows with a bar column in the middle, player
//! lines carrying `N off` suffixes, and the dice (or initiative rolls)
//! beside the board.

use super::board::{
    Space, SPACE_BAR_OPPONENT, SPACE_BAR_PLAYER, SPACE_HOME_OPPONENT, SPACE_HOME_PLAYER,
};
use super::Game;

const BOARD_TOP_BLACK: &str = "+13-14-15-16-17-18-+---+19-20-21-22-23-24-+";
const BOARD_BOTTOM_BLACK: &str = "+12-11-10--9--8--7-+---+-6--5--4--3--2--1-+";

const BOARD_TOP_WHITE: &str = "+24-23-22-21-20-19-+---+18-17-16-15-14-13-+";
const BOARD_BOTTOM_WHITE: &str = "+-1--2--3--4--5--6-+---+-7--8--9-10-11-12-+";

impl Game {
    /// Renders one three-character cell of the board.
    ///
    /// `space_value` is the 1-based depth of the cell within its column;
    /// stacks taller than five show their count as a numeral in the
    /// innermost cells.
    fn render_space(&self, player: i8, space: Space, space_value: i8) -> String {
        let (player_color, opponent_color) = if player == 2 { ('o', 'x') } else { ('x', 'o') };

        let value = self.board[space as usize];
        let mut piece = if space == SPACE_BAR_PLAYER {
            player_color.to_string()
        } else if space == SPACE_BAR_OPPONENT {
            opponent_color.to_string()
        } else if value < 0 {
            'o'.to_string()
        } else if value > 0 {
            'x'.to_string()
        } else {
            player_color.to_string()
        };

        let mut abs = value.abs();
        let top = (space > 12) != (player == 2);
        let (first_digit, second_digit) = if top { (4, 5) } else { (5, 4) };

        if abs > 5 {
            let first_numeral = if abs > 9 { "1".to_string() } else { abs.to_string() };
            if space_value == first_digit && (!top || abs > 9) {
                piece = first_numeral;
            } else if space_value == second_digit && abs > 9 {
                piece = (abs - 10).to_string();
            } else if top && space_value == second_digit {
                piece = first_numeral;
            }
            abs = 5;
        }

        if abs > 0 && space_value <= abs {
            format!(" {piece} ")
        } else {
            "   ".to_string()
        }
    }

    /// Renders the board from the given player's visual perspective.
    ///
    /// Player 2 sees the board rotated (the `white` rails) with their own
    /// checkers still drawn as `o`; the underlying game is untouched.
    pub fn board_state(&self, player: i8) -> String {
        let white = player == 2;

        let mut player_name = self.player1.name.clone();
        let mut opponent_name = self.player2.name.clone();
        if player_name.is_empty() {
            player_name = "Waiting...".to_string();
        }
        if opponent_name.is_empty() {
            opponent_name = "Waiting...".to_string();
        }
        if white {
            std::mem::swap(&mut player_name, &mut opponent_name);
        }

        let (player_color, opponent_color) = if white { ('o', 'x') } else { ('x', 'o') };
        let (player_roll, opponent_roll) = if white {
            (self.roll2, self.roll1)
        } else {
            (self.roll1, self.roll2)
        };
        let (player_off, opponent_off) = if white {
            (
                self.board[SPACE_HOME_OPPONENT as usize].abs(),
                self.board[SPACE_HOME_PLAYER as usize].abs(),
            )
        } else {
            (
                self.board[SPACE_HOME_PLAYER as usize].abs(),
                self.board[SPACE_HOME_OPPONENT as usize].abs(),
            )
        };

        let mut out = String::new();
        out.push_str(if white { BOARD_TOP_WHITE } else { BOARD_TOP_BLACK });
        out.push_str(" \n");

        let cell = |row: i8, col: i8| -> String {
            let space_value = if row > 5 { 5 - (row - 6) } else { row + 1 };

            if col == -1 {
                let bar = if row <= 4 {
                    SPACE_BAR_OPPONENT
                } else {
                    SPACE_BAR_PLAYER
                };
                return self.render_space(player, bar, space_value);
            }
            if row == 5 {
                return "   ".to_string();
            }

            let space = if white {
                if row > 5 {
                    1 + col
                } else {
                    24 - col
                }
            } else if row > 5 {
                12 - col
            } else {
                13 + col
            };
            self.render_space(player, space, space_value)
        };

        for row in 0..11i8 {
            out.push('│');
            for col in 0..12i8 {
                out.push_str(&cell(row, col));
                if col == 5 {
                    out.push('│');
                    out.push_str(&cell(row, -1));
                    out.push('│');
                }
            }
            out.push('│');
            out.push_str("  ");

            match row {
                0 => {
                    out.push_str(&format!("{opponent_color} {opponent_name}"));
                    if opponent_off != 0 {
                        out.push_str(&format!("  {opponent_off} off"));
                    }
                }
                2 => {
                    if self.turn == 0 {
                        if !self.player1.name.is_empty() && !self.player2.name.is_empty() {
                            if opponent_roll != 0 {
                                out.push_str(&format!("  {opponent_roll}"));
                            } else {
                                out.push_str("  -");
                            }
                        }
                    } else if self.turn != player {
                        if self.roll1 > 0 {
                            out.push_str(&format!("  {}  {}  ", self.roll1, self.roll2));
                            if self.roll3 != 0 {
                                out.push_str(&format!("{}  ", self.roll3));
                            }
                        } else {
                            out.push_str("  -  -  ");
                        }
                    }
                }
                8 => {
                    if self.turn == 0 {
                        if !self.player1.name.is_empty() && !self.player2.name.is_empty() {
                            if player_roll != 0 {
                                out.push_str(&format!("  {player_roll}"));
                            } else {
                                out.push_str("  -");
                            }
                        }
                    } else if self.turn == player {
                        if self.roll1 > 0 {
                            out.push_str(&format!("  {}  {}  ", self.roll1, self.roll2));
                            if self.roll3 != 0 {
                                out.push_str(&format!("{}  ", self.roll3));
                            }
                        } else {
                            out.push_str("  -  -  ");
                        }
                    }
                }
                10 => {
                    out.push_str(&format!("{player_color} {player_name}"));
                    if player_off != 0 {
                        out.push_str(&format!("  {player_off} off"));
                    }
                }
                _ => {}
            }

            out.push(' ');
            out.push('\n');
        }

        out.push_str(if white {
            BOARD_BOTTOM_WHITE
        } else {
            BOARD_BOTTOM_BLACK
        });
        out.push('\n');

        out
    }
}

#[cfg(test)]
mod tests {
    use super::super::variant::Variant;
    use super::*;

    #[test]
    fn test_board_state_shape() {
        let mut game = Game::new(Variant::Backgammon);
        game.player1.name = "alice".to_string();
        game.player2.name = "bert".to_string();
        let rendered = game.board_state(1);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 13);
        assert!(lines[0].starts_with("+13-14"));
        assert!(lines[12].starts_with("+12-11"));
        assert!(lines[1].contains("x bert") || lines[1].contains("o bert"));
        assert!(lines[11].contains("x alice"));
    }

    #[test]
    fn test_board_state_rotates_for_player_two() {
        let game = Game::new(Variant::Backgammon);
        let rendered = game.board_state(2);
        let lines: Vec<&str> = rendered.lines().collect();
        assert!(lines[0].starts_with("+24-23"));
        assert!(lines[12].starts_with("+-1--2"));
    }

    #[test]
    fn test_board_state_shows_off_count() {
        let mut game = Game::new(Variant::Backgammon);
        game.player1.name = "alice".to_string();
        game.player2.name = "bert".to_string();
        game.board[24] = 0;
        game.board[SPACE_HOME_PLAYER as usize] = 2;
        let rendered = game.board_state(1);
        let lines: Vec<&str> = rendered.lines().collect();
        assert!(lines[11].contains("2 off"));
    }
}

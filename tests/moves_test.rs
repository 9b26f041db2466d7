//! Commit-path tests: dice accounting, compound-move expansion, undo
//! ordering, and turn handoff.

use tavla::{Game, Move, MoveError, Variant, SPACE_HOME_PLAYER};

fn seated_game(variant: Variant) -> Game {
    let mut game = Game::new(variant);
    game.player1.name = "alice".to_string();
    game.player2.name = "bert".to_string();
    game
}

#[test]
fn test_doubles_grant_four_pips() {
    let mut game = seated_game(Variant::Backgammon);
    game.turn = 1;
    game.roll1 = 3;
    game.roll2 = 3;

    assert_eq!(game.dice_rolls(), vec![3, 3, 3, 3]);
    game.add_moves(&[Move::new(8, 5), Move::new(8, 5)], false)
        .unwrap();
    assert_eq!(game.dice_rolls(), vec![3, 3]);
}

#[test]
fn test_tabula_has_three_pips_and_no_doubles() {
    let mut game = seated_game(Variant::Tabula);
    game.turn = 1;
    game.roll1 = 4;
    game.roll2 = 4;
    game.roll3 = 2;

    // Three dice, no duplication on equal rolls.
    assert_eq!(game.dice_rolls(), vec![4, 4, 2]);
}

#[test]
fn test_unaccountable_pending_move_breaks_the_turn() {
    let mut game = seated_game(Variant::Backgammon);
    game.turn = 1;
    game.roll1 = 3;
    game.roll2 = 1;

    // Force an unexplainable pending move through the unvalidated path.
    assert!(game.add_local_move(Move::new(13, 9)));
    assert!(game.dice_rolls().is_empty());
    assert!(game.legal_moves(false).is_empty());

    // The turn handoff clears the broken state.
    game.next_turn(false);
    game.roll1 = 4;
    game.roll2 = 2;
    assert!(!game.legal_moves(false).is_empty());
}

#[test]
fn test_compound_move_expands_to_hops() {
    let mut game = seated_game(Variant::Backgammon);
    game.turn = 1;
    game.roll1 = 6;
    game.roll2 = 5;

    // The lover's leap is clicked as a single 24/13.
    let expanded = game
        .expand_move(Move::new(24, 13), 24, &[], false)
        .unwrap();
    assert_eq!(expanded, vec![Move::new(24, 18), Move::new(18, 13)]);

    let applied = game.add_moves(&[Move::new(24, 13)], false).unwrap();
    assert_eq!(applied, vec![Move::new(24, 18), Move::new(18, 13)]);
    assert_eq!(game.board[13], 6);
    assert_eq!(game.board[24], 1);
    assert_eq!(game.moves.len(), 2);
    assert!(game.dice_rolls().is_empty());
}

#[test]
fn test_expansion_prefers_hitting_hops() {
    let mut game = seated_game(Variant::Backgammon);
    game.board = [0; 28];
    game.board[24] = 1;
    game.board[19] = -1;
    game.board[18] = -1;
    game.turn = 1;
    game.roll1 = 6;
    game.roll2 = 5;

    // Both 24/19 and 24/18 reach 13; the hitting hop is tried first.
    let expanded = game
        .expand_move(Move::new(24, 13), 24, &[], false)
        .unwrap();
    assert_eq!(expanded[0].from, 24);
    assert_eq!(
        tavla::opponent_checkers(game.board[expanded[0].to as usize], 1),
        1
    );
}

#[test]
fn test_undo_peels_in_lifo_order() {
    let mut game = seated_game(Variant::Backgammon);
    game.turn = 1;
    game.roll1 = 3;
    game.roll2 = 1;

    let before = game.clone();
    game.add_moves(&[Move::new(8, 5), Move::new(6, 5)], false)
        .unwrap();

    // Undoing both moves in one request reverses them newest-first.
    let undone = game
        .add_moves(&[Move::new(5, 6), Move::new(5, 8)], false)
        .unwrap();
    assert_eq!(undone, vec![Move::new(5, 6), Move::new(5, 8)]);
    assert_eq!(game, before);
}

#[test]
fn test_mixed_add_and_undo_is_rejected() {
    let mut game = seated_game(Variant::Backgammon);
    game.turn = 1;
    game.roll1 = 3;
    game.roll2 = 1;

    game.add_moves(&[Move::new(8, 5)], false).unwrap();
    let err = game
        .add_moves(&[Move::new(5, 8), Move::new(6, 5)], false)
        .unwrap_err();
    assert_eq!(err, MoveError::MixedAddUndo);
    // The failed request left the game untouched.
    assert_eq!(game.moves, vec![Move::new(8, 5)]);
}

#[test]
fn test_moves_require_both_seats() {
    let mut game = Game::new(Variant::Backgammon);
    game.player1.name = "alice".to_string();
    game.turn = 1;
    game.roll1 = 3;
    game.roll2 = 1;
    assert_eq!(
        game.add_moves(&[Move::new(8, 5)], false),
        Err(MoveError::SeatsOpen)
    );
}

#[test]
fn test_illegal_move_reports_the_offender() {
    let mut game = seated_game(Variant::Backgammon);
    game.turn = 1;
    game.roll1 = 3;
    game.roll2 = 1;

    let err = game.add_moves(&[Move::new(24, 22)], false).unwrap_err();
    assert_eq!(err, MoveError::Illegal { mv: Move::new(24, 22) });
    assert_eq!(err.to_string(), "illegal move: 24/22");
}

#[test]
fn test_reroll_keeps_the_turn() {
    let mut game = seated_game(Variant::AceyDeucey);
    game.turn = 1;
    game.roll1 = 1;
    game.roll2 = 2;

    game.next_turn(true);
    assert_eq!(game.turn, 1);
    assert_eq!(game.roll1, 0);
    assert_eq!(game.roll2, 0);

    game.next_turn(false);
    assert_eq!(game.turn, 2);
}

#[test]
fn test_bear_off_wins_exactly_at_the_last_checker() {
    let mut game = seated_game(Variant::Backgammon);
    game.board = [0; 28];
    game.board[2] = 2;
    game.board[SPACE_HOME_PLAYER as usize] = 13;
    game.board[24] = -15;
    game.turn = 1;
    game.roll1 = 2;
    game.roll2 = 2;

    game.add_moves(&[Move::new(2, SPACE_HOME_PLAYER)], false)
        .unwrap();
    assert_eq!(game.winner, 0, "a checker remains on the board");

    game.add_moves(&[Move::new(2, SPACE_HOME_PLAYER)], false)
        .unwrap();
    assert_eq!(game.winner, 1);
    assert_eq!(game.board[SPACE_HOME_PLAYER as usize], 15);
}

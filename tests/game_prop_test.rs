//! Property-based tests for the rule engine.
//!
//! These drive randomized play through the public commit path and check
//! the universal invariants: checker conservation, undo round-trips, flip
//! involution, pip accountability, and max-pip dominance.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tavla::{flip_space, player_checkers, space_diff, Game, Move, Variant, BOARD_SPACES};

fn checker_sum(game: &Game, player: i8) -> i8 {
    game.board.iter().map(|&c| player_checkers(c, player)).sum()
}

fn seated_game(variant: Variant) -> Game {
    let mut game = Game::new(variant);
    game.player1.name = "alice".to_string();
    game.player2.name = "bert".to_string();
    game.turn = 1;
    game
}

fn roll_dice(game: &mut Game, rng: &mut StdRng) {
    game.roll1 = rng.gen_range(1..=6);
    game.roll2 = rng.gen_range(1..=6);
    if game.variant == Variant::Tabula {
        game.roll3 = rng.gen_range(1..=6);
    }
}

/// Plays up to `turns` random turns through the public commit path,
/// checking conservation after every commit. Returns the final game.
fn play_random_turns(variant: Variant, seed: u64, turns: usize) -> Game {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut game = seated_game(variant);

    for _ in 0..turns {
        if game.winner != 0 {
            break;
        }
        roll_dice(&mut game, &mut rng);

        loop {
            let legal = game.legal_moves(false);
            if legal.is_empty() {
                break;
            }
            let mv = legal[rng.gen_range(0..legal.len())];
            game.add_moves(&[mv], false).unwrap();

            assert_eq!(checker_sum(&game, 1), 15, "player 1 lost a checker");
            assert_eq!(checker_sum(&game, 2), 15, "player 2 lost a checker");
            if game.winner != 0 {
                break;
            }
        }
        game.next_turn(false);
    }
    game
}

fn variant_strategy() -> impl Strategy<Value = Variant> {
    prop_oneof![
        Just(Variant::Backgammon),
        Just(Variant::AceyDeucey),
        Just(Variant::Tabula),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// Flipping twice into Player 2's perspective is the identity.
    #[test]
    fn prop_flip_space_involution(
        space in 0i8..BOARD_SPACES as i8,
        variant in variant_strategy()
    ) {
        prop_assert_eq!(flip_space(flip_space(space, 2, variant), 2, variant), space);
        prop_assert_eq!(flip_space(space, 1, variant), space);
    }

    /// Pip distances are always within one roll's reach or zero.
    #[test]
    fn prop_space_diff_bounded(
        from in -2i8..30,
        to in -2i8..30,
        variant in variant_strategy()
    ) {
        let diff = space_diff(from, to, variant);
        prop_assert!((0..=25).contains(&diff));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Random legal play conserves fifteen checkers per side in every
    /// variant, and a decided game stays decided.
    #[test]
    fn prop_checker_conservation(
        variant in variant_strategy(),
        seed in any::<u64>()
    ) {
        let game = play_random_turns(variant, seed, 6);
        prop_assert_eq!(checker_sum(&game, 1), 15);
        prop_assert_eq!(checker_sum(&game, 2), 15);
        if game.winner != 0 {
            prop_assert!(game.legal_moves(false).is_empty());
        }
    }

    /// Applying any legal move and then undoing it restores the game
    /// exactly: board, entered flags, pending moves, and undo stacks.
    #[test]
    fn prop_apply_then_undo_round_trips(
        variant in variant_strategy(),
        seed in any::<u64>()
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut game = seated_game(variant);
        roll_dice(&mut game, &mut rng);

        for mv in game.legal_moves(false) {
            let before = game.clone();
            let applied = game.add_moves(&[mv], false).unwrap();
            prop_assert_eq!(applied, vec![mv]);
            if game.winner != 0 {
                // A winning commit freezes the game instead of undoing.
                game = before.clone();
                continue;
            }
            let undone = game.add_moves(&[mv.reversed()], false).unwrap();
            prop_assert_eq!(undone, vec![mv.reversed()]);
            prop_assert_eq!(&game, &before);
        }
    }

    /// Every legal move's pip cost is accounted for by the unused rolls.
    #[test]
    fn prop_legal_moves_are_accountable(
        variant in variant_strategy(),
        seed in any::<u64>()
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut game = seated_game(variant);
        roll_dice(&mut game, &mut rng);

        for mv in game.legal_moves(false) {
            let mut probe = game.clone();
            prop_assert!(probe.add_moves(&[mv], false).is_ok());
            // The pending move is explained by the roll: the remaining
            // multiset shrank by exactly one pip.
            let spent = game.dice_rolls().len() - probe.dice_rolls().len();
            prop_assert!(game.dice_rolls().is_empty() || spent == 1);
        }
    }

    /// Must-play-maximum-pips: every surviving move heads a maximum-length
    /// sequence, and every maximum-length sequence starts with a surviving
    /// move.
    #[test]
    fn prop_max_pip_dominance(
        variant in variant_strategy(),
        seed in any::<u64>()
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut game = seated_game(variant);
        roll_dice(&mut game, &mut rng);

        let legal = game.legal_moves(false);
        let sequences = game.total_moves(false);
        if sequences.is_empty() || sequences[0].len() <= 1 {
            return Ok(());
        }
        let heads: Vec<Move> = sequences.iter().map(|s| s[0]).collect();
        for mv in &legal {
            prop_assert!(heads.contains(mv), "{} heads no maximal sequence", mv);
        }
        for head in &heads {
            prop_assert!(legal.contains(head), "{} missing from legal moves", head);
        }
    }
}

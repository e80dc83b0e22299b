//! Pure scoring rules, shared by the live score path, the finalizer, and the
//! backfill sweep.
//!
//! The scoring convention is inverted relative to most games: 0 points marks
//! the round winner, and the lowest running total wins the game.

use indexmap::IndexMap;
use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

/// Highest point value a single round can assign to a player.
pub const MAX_ROUND_POINTS: u8 = 13;

/// Violations of the scoring rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreRuleError {
    /// Point value outside the allowed range.
    #[error("points must be between 0 and {max}, got {points}")]
    OutOfRange {
        /// The rejected value.
        points: u8,
        /// Upper bound of the allowed range.
        max: u8,
    },
    /// A complete round must name exactly one winner via a 0-point entry.
    #[error("expected exactly one player with 0 points, found {zero_count}")]
    NotOneWinner {
        /// How many players held 0 points.
        zero_count: usize,
    },
}

/// Check that a point value fits the 0..=13 range.
pub fn validate_points(points: u8) -> Result<(), ScoreRuleError> {
    if points > MAX_ROUND_POINTS {
        return Err(ScoreRuleError::OutOfRange {
            points,
            max: MAX_ROUND_POINTS,
        });
    }
    Ok(())
}

/// Determine the winner of a complete round: the single player at 0 points.
///
/// Fails when no player, or more than one player, holds 0 points.
pub fn round_winner(points_by_player: &IndexMap<String, u8>) -> Result<&str, ScoreRuleError> {
    let mut winner = None;
    let mut zero_count = 0;
    for (player_id, points) in points_by_player {
        if *points == 0 {
            zero_count += 1;
            winner = Some(player_id.as_str());
        }
    }

    match (winner, zero_count) {
        (Some(player_id), 1) => Ok(player_id),
        _ => Err(ScoreRuleError::NotOneWinner { zero_count }),
    }
}

/// Sum of all point values entered for one round.
pub fn total_points(points_by_player: &IndexMap<String, u8>) -> u32 {
    points_by_player
        .values()
        .map(|points| u32::from(*points))
        .sum()
}

/// One entry of the final strict ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedPlayer {
    /// Roster identifier of the ranked player.
    pub player_id: String,
    /// 1-based rank; lower total points rank first.
    pub rank: u32,
    /// Accumulated points across all complete rounds.
    pub total_points: u32,
}

/// Order players ascending by total points and assign distinct ranks 1..=N.
///
/// Players sharing an identical total are shuffled within their run, so the
/// output is always a strict ranking with no tie marker. Callers that need
/// reproducible tie orderings pass a seeded [`Rng`].
pub fn rank_players<R: Rng>(totals: &IndexMap<String, u32>, rng: &mut R) -> Vec<RankedPlayer> {
    let mut sorted: Vec<(String, u32)> = totals
        .iter()
        .map(|(player_id, total)| (player_id.clone(), *total))
        .collect();
    // Stable sort keeps roster order inside tied runs until the shuffle below.
    sorted.sort_by_key(|(_, total)| *total);

    let mut start = 0;
    while start < sorted.len() {
        let mut end = start + 1;
        while end < sorted.len() && sorted[end].1 == sorted[start].1 {
            end += 1;
        }
        if end - start > 1 {
            sorted[start..end].shuffle(rng);
        }
        start = end;
    }

    sorted
        .into_iter()
        .enumerate()
        .map(|(index, (player_id, total_points))| RankedPlayer {
            player_id,
            rank: index as u32 + 1,
            total_points,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn points(entries: &[(&str, u8)]) -> IndexMap<String, u8> {
        entries
            .iter()
            .map(|(id, value)| (id.to_string(), *value))
            .collect()
    }

    fn totals(entries: &[(&str, u32)]) -> IndexMap<String, u32> {
        entries
            .iter()
            .map(|(id, value)| (id.to_string(), *value))
            .collect()
    }

    #[test]
    fn points_within_range_accepted() {
        assert!(validate_points(0).is_ok());
        assert!(validate_points(7).is_ok());
        assert!(validate_points(13).is_ok());
    }

    #[test]
    fn points_above_range_rejected() {
        assert_eq!(
            validate_points(14),
            Err(ScoreRuleError::OutOfRange {
                points: 14,
                max: 13
            })
        );
    }

    #[test]
    fn single_zero_names_the_winner() {
        let round = points(&[("A", 0), ("Y", 3), ("D", 5), ("C", 8)]);
        assert_eq!(round_winner(&round), Ok("A"));
    }

    #[test]
    fn no_zero_is_invalid() {
        let round = points(&[("A", 3), ("Y", 3), ("D", 3), ("C", 3)]);
        assert_eq!(
            round_winner(&round),
            Err(ScoreRuleError::NotOneWinner { zero_count: 0 })
        );
    }

    #[test]
    fn two_zeros_are_invalid() {
        let round = points(&[("A", 0), ("Y", 0), ("D", 5), ("C", 8)]);
        assert_eq!(
            round_winner(&round),
            Err(ScoreRuleError::NotOneWinner { zero_count: 2 })
        );
    }

    #[test]
    fn total_sums_all_entries() {
        let round = points(&[("A", 0), ("Y", 3), ("D", 5), ("C", 8)]);
        assert_eq!(total_points(&round), 16);
    }

    #[test]
    fn distinct_totals_rank_ascending() {
        let mut rng = StdRng::seed_from_u64(1);
        let ranked = rank_players(&totals(&[("A", 12), ("Y", 3), ("D", 30), ("C", 7)]), &mut rng);

        let order: Vec<&str> = ranked.iter().map(|entry| entry.player_id.as_str()).collect();
        assert_eq!(order, vec!["Y", "C", "A", "D"]);
        let ranks: Vec<u32> = ranked.iter().map(|entry| entry.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }

    #[test]
    fn ranks_are_a_permutation_even_with_ties() {
        let mut rng = StdRng::seed_from_u64(7);
        let ranked = rank_players(&totals(&[("A", 5), ("Y", 5), ("D", 5), ("C", 2)]), &mut rng);

        assert_eq!(ranked[0].player_id, "C");
        let ranks: HashSet<u32> = ranked.iter().map(|entry| entry.rank).collect();
        assert_eq!(ranks, HashSet::from([1, 2, 3, 4]));
        assert!(ranked.iter().skip(1).all(|entry| entry.total_points == 5));
    }

    #[test]
    fn tied_runs_shuffle_deterministically_under_a_seed() {
        let tied = totals(&[("A", 4), ("Y", 4), ("D", 4), ("C", 4)]);

        let mut first = StdRng::seed_from_u64(42);
        let mut second = StdRng::seed_from_u64(42);
        assert_eq!(
            rank_players(&tied, &mut first),
            rank_players(&tied, &mut second)
        );
    }

    #[test]
    fn shuffle_stays_within_the_tied_run() {
        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            let ranked = rank_players(&totals(&[("A", 1), ("Y", 9), ("D", 9), ("C", 20)]), &mut rng);
            assert_eq!(ranked[0].player_id, "A");
            assert_eq!(ranked[3].player_id, "C");
        }
    }
}

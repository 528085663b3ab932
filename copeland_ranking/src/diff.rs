use log::debug;
use snafu::prelude::*;
use std::collections::BTreeMap;

use crate::config::*;

/// Per-choice changes between two rankings of the same choices.
///
/// When nothing had been voted in `old` yet, the records carry the absolute values of
/// `new` and a rank change of 0.
pub fn diff(
    old: &[ScoredResult],
    new: &[ScoredResult],
) -> Result<BTreeMap<ChoiceKey, DiffRecord>, TallyError> {
    let new_positions: BTreeMap<ChoiceKey, (usize, &ScoredResult)> = new
        .iter()
        .enumerate()
        .map(|(idx, r)| (r.key, (idx, r)))
        .collect();
    let had_votes = old.iter().any(|r| !r.total_support.is_empty());
    debug!("diff: {} results, baseline had votes: {}", old.len(), had_votes);

    let mut res: BTreeMap<ChoiceKey, DiffRecord> = BTreeMap::new();
    for (old_idx, before) in old.iter().enumerate() {
        let (new_idx, after) = new_positions
            .get(&before.key)
            .copied()
            .context(MissingResultKeySnafu { key: before.key })?;
        let record = if had_votes {
            DiffRecord {
                key: before.key,
                rank: new_idx as i64 - old_idx as i64,
                wins: after.wins as i64 - before.wins as i64,
                ties: after.ties as i64 - before.ties as i64,
                losses: after.losses as i64 - before.losses as i64,
                points: after.points - before.points,
                total_support: support_delta(before.total_support, after.total_support),
                appearances: after.appearances as i64 - before.appearances as i64,
                average_support: after.average_support() - before.average_support(),
            }
        } else {
            DiffRecord {
                key: before.key,
                rank: 0,
                wins: after.wins as i64,
                ties: after.ties as i64,
                losses: after.losses as i64,
                points: after.points,
                total_support: after.total_support.as_f64(),
                appearances: after.appearances as i64,
                average_support: after.average_support(),
            }
        };
        res.insert(before.key, record);
    }
    Ok(res)
}

// Subtract in fixed point so that unchanged support gives exactly 0.
fn support_delta(before: VotingPower, after: VotingPower) -> f64 {
    if after >= before {
        VotingPower::from_units(after.units() - before.units()).as_f64()
    } else {
        -VotingPower::from_units(before.units() - after.units()).as_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairwise::tabulate;
    use crate::scoring::{rank, score};

    fn ranking(keys: &[u32], ballots: &[Ballot]) -> Vec<ScoredResult> {
        let keys: Vec<ChoiceKey> = keys.iter().map(|k| ChoiceKey(*k)).collect();
        let points = CopelandPoints::from_weights([1.0, 0.0, 0.0]);
        rank(
            &score(&tabulate(&keys, ballots).unwrap(), &points),
            Tiebreaker::AverageSupport,
        )
    }

    #[test]
    fn identical_rankings() {
        let ballots = vec![
            Ballot::weighted("v1", 100000.0, &[2, 3, 4, 1]).unwrap(),
            Ballot::weighted("v2", 100001.0, &[3, 2, 4, 1]).unwrap(),
        ];
        let x = ranking(&[1, 2, 3, 4], &ballots);
        let d = diff(&x, &x).unwrap();
        assert_eq!(d.len(), 4);
        for r in d.values() {
            assert_eq!(r.rank, 0);
            assert_eq!((r.wins, r.ties, r.losses, r.appearances), (0, 0, 0, 0));
            assert_eq!(r.points, 0.0);
            assert_eq!(r.total_support, 0.0);
            assert_eq!(r.average_support, 0.0);
        }
    }

    #[test]
    fn one_more_ballot() {
        let mut ballots = vec![
            Ballot::weighted("v1", 100000.0, &[2, 3, 4, 1]).unwrap(),
            Ballot::weighted("v2", 100001.0, &[3, 2, 4, 1]).unwrap(),
        ];
        let old = ranking(&[1, 2, 3, 4], &ballots);
        assert_eq!(old.iter().map(|r| r.key.0).collect::<Vec<_>>(), vec![3, 2, 4, 1]);

        ballots.push(Ballot::weighted("v3", 200000.0, &[2, 3, 4, 1]).unwrap());
        let new = ranking(&[1, 2, 3, 4], &ballots);
        assert_eq!(new.iter().map(|r| r.key.0).collect::<Vec<_>>(), vec![2, 3, 4, 1]);

        let d = diff(&old, &new).unwrap();
        assert_eq!(d[&ChoiceKey(2)].rank, -1);
        assert_eq!(d[&ChoiceKey(2)].wins, 1);
        assert_eq!(d[&ChoiceKey(2)].points, 1.0);
        assert_eq!(d[&ChoiceKey(3)].rank, 1);
        assert_eq!(d[&ChoiceKey(3)].wins, -1);
        assert_eq!(d[&ChoiceKey(1)].rank, 0);
        assert_eq!(d[&ChoiceKey(4)].rank, 0);
        // 2 now also takes v3's power in its three matchups.
        assert_eq!(d[&ChoiceKey(2)].total_support, 600000.0);
    }

    #[test]
    fn no_votes_before() {
        let old = ranking(&[1, 2, 3, 4], &[]);
        let ballots = vec![Ballot::weighted("v1", 200000.0, &[1, 2, 3, 4]).unwrap()];
        let new = ranking(&[1, 2, 3, 4], &ballots);

        let d = diff(&old, &new).unwrap();
        assert!(d.values().all(|r| r.rank == 0));
        let first = &d[&ChoiceKey(1)];
        assert_eq!(first.wins, 3);
        assert_eq!(first.total_support, 600000.0);
        assert_eq!(first.appearances, 3);
        assert_eq!(first.average_support, 200000.0);
    }

    #[test]
    fn missing_key() {
        let ballots = vec![Ballot::weighted("v1", 1.0, &[1, 2]).unwrap()];
        let old = ranking(&[1, 2, 3], &ballots);
        let new = ranking(&[1, 2], &ballots);
        assert!(matches!(
            diff(&old, &new),
            Err(TallyError::MissingResultKey { key }) if key == ChoiceKey(3)
        ));
    }
}

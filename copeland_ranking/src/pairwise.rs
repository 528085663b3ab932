use log::debug;
use snafu::prelude::*;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::config::*;

/// Compares every pair of choices over all the ballots.
///
/// A ballot gives its whole voting power to whichever of the two choices it ranks
/// better, and a ranked choice always beats an unranked one. Each pair adds exactly
/// one win and one loss, or two ties, to the records of its two choices.
///
/// Fails if the voting power accumulated by a choice does not fit in a `VotingPower`.
pub fn tabulate(
    keys: &[ChoiceKey],
    ballots: &[Ballot],
) -> Result<BTreeMap<ChoiceKey, PairwiseRecord>, TallyError> {
    let positions: Vec<HashMap<ChoiceKey, usize>> = ballots.iter().map(ballot_positions).collect();

    let mut records: BTreeMap<ChoiceKey, PairwiseRecord> =
        keys.iter().map(|k| (*k, PairwiseRecord::EMPTY)).collect();

    for (i, a) in keys.iter().enumerate() {
        for b in keys[i + 1..].iter() {
            if a == b {
                continue;
            }
            let (pref_a, pref_b) = matchup(*a, *b, ballots, &positions)?;
            debug!("tabulate: {} vs {}: {} - {}", a, b, pref_a, pref_b);
            let contested = !(pref_a.is_empty() && pref_b.is_empty());
            let outcome = pref_a.cmp(&pref_b);
            for (key, support, won) in [
                (*a, pref_a, outcome),
                (*b, pref_b, outcome.reverse()),
            ] {
                if let Some(rec) = records.get_mut(&key) {
                    rec.total_support = rec
                        .total_support
                        .checked_add(support)
                        .context(VotingPowerOverflowSnafu { a: *a, b: *b })?;
                    if contested {
                        rec.appearances += 1;
                    }
                    match won {
                        Ordering::Greater => rec.wins += 1,
                        Ordering::Less => rec.losses += 1,
                        Ordering::Equal => rec.ties += 1,
                    }
                }
            }
        }
    }
    Ok(records)
}

// The first position of each key. Later duplicates are ignored.
fn ballot_positions(ballot: &Ballot) -> HashMap<ChoiceKey, usize> {
    let mut res: HashMap<ChoiceKey, usize> = HashMap::new();
    for (pos, key) in ballot.ranked_keys.iter().enumerate() {
        res.entry(*key).or_insert(pos);
    }
    res
}

fn matchup(
    a: ChoiceKey,
    b: ChoiceKey,
    ballots: &[Ballot],
    positions: &[HashMap<ChoiceKey, usize>],
) -> Result<(VotingPower, VotingPower), TallyError> {
    let mut pref_a = VotingPower::EMPTY;
    let mut pref_b = VotingPower::EMPTY;
    for (ballot, pos) in ballots.iter().zip(positions.iter()) {
        let side = match (pos.get(&a), pos.get(&b)) {
            (Some(pa), Some(pb)) if pa < pb => &mut pref_a,
            (Some(_), Some(_)) => &mut pref_b,
            (Some(_), None) => &mut pref_a,
            (None, Some(_)) => &mut pref_b,
            (None, None) => continue,
        };
        *side = side
            .checked_add(ballot.voting_power)
            .context(VotingPowerOverflowSnafu { a, b })?;
    }
    Ok((pref_a, pref_b))
}

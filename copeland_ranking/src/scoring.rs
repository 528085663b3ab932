use log::debug;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use crate::config::*;
use crate::registry::KeyedChoices;

/// Turns the pairwise records into points, in key order.
pub fn score(
    records: &BTreeMap<ChoiceKey, PairwiseRecord>,
    points: &CopelandPoints,
) -> Vec<ScoredResult> {
    records
        .iter()
        .map(|(key, r)| ScoredResult {
            key: *key,
            wins: r.wins,
            ties: r.ties,
            losses: r.losses,
            total_support: r.total_support,
            appearances: r.appearances,
            points: points.win * r.wins as f64
                + points.tie * r.ties as f64
                + points.loss * r.losses as f64,
        })
        .collect()
}

/// Orders the results by points, best first, then by the tiebreaker.
///
/// Results that are still tied keep their input order.
pub fn rank(results: &[ScoredResult], tiebreaker: Tiebreaker) -> Vec<ScoredResult> {
    let mut ranked = results.to_vec();
    ranked.sort_by(|a, b| {
        b.points
            .total_cmp(&a.points)
            .then_with(|| match tiebreaker {
                Tiebreaker::AverageSupport => compare_average_support(b, a),
                Tiebreaker::TotalSupport => b.total_support.cmp(&a.total_support),
            })
    });
    debug!(
        "rank: {:?}",
        ranked.iter().map(|r| r.key.0).collect::<Vec<u32>>()
    );
    ranked
}

// total / appearances, compared exactly. No appearances counts as an average of 0.
// The whole parts are compared first. The remainders are below a u32 denominator, so
// their cross products always fit.
fn compare_average_support(a: &ScoredResult, b: &ScoredResult) -> Ordering {
    let (num_a, den_a) = average_fraction(a);
    let (num_b, den_b) = average_fraction(b);
    (num_a / den_a)
        .cmp(&(num_b / den_b))
        .then_with(|| ((num_a % den_a) * den_b).cmp(&((num_b % den_b) * den_a)))
}

fn average_fraction(r: &ScoredResult) -> (u128, u128) {
    if r.appearances == 0 {
        (0, 1)
    } else {
        (r.total_support.units(), r.appearances as u128)
    }
}

/// Keeps the best ranked entry of each group.
///
/// Entries without a group value are always kept.
pub fn deduplicate_by_group(
    ranked: &[ScoredResult],
    choices: &KeyedChoices,
    group_field: &str,
) -> Result<Vec<ScoredResult>, TallyError> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut res: Vec<ScoredResult> = Vec::new();
    for r in ranked {
        match choices.require(r.key)?.group_value(group_field) {
            Some(group) => {
                if seen.insert(group) {
                    res.push(r.clone());
                } else {
                    debug!("deduplicate_by_group: dropping {} from group {}", r.key, group);
                }
            }
            None => res.push(r.clone()),
        }
    }
    Ok(res)
}

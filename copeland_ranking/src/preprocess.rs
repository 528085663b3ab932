//! Transforms applied to the ballots before tabulation.
//!
//! Each transform returns new ballots. When several of them are used in one run they
//! are applied in this order: group-adjacency reorder, precedence reorder, truncation.

use log::debug;
use snafu::prelude::*;
use std::collections::{BTreeMap, HashSet};

use crate::config::*;
use crate::registry::KeyedChoices;

/// Pairs of keys where the value must be ranked right before the key whenever
/// the ballot places it later.
pub type PrecedenceMap = BTreeMap<ChoiceKey, ChoiceKey>;

/// Drops everything ranked after the marker.
///
/// The marker itself is kept only when `keep_marker` is set. Ballots that do not rank
/// the marker are returned unchanged.
pub fn truncate_at_marker(ballots: &[Ballot], marker: ChoiceKey, keep_marker: bool) -> Vec<Ballot> {
    ballots
        .iter()
        .map(|b| match b.ranked_keys.iter().position(|k| *k == marker) {
            Some(pos) => {
                let end = if keep_marker { pos + 1 } else { pos };
                b.with_keys(b.ranked_keys[..end].to_vec())
            }
            None => b.clone(),
        })
        .collect()
}

/// Makes the choices of each group contiguous on every ballot.
///
/// The first time a grouped choice is seen, all the choices of its group found on the
/// ballot are placed there, in their ballot order. Ungrouped choices keep their place
/// relative to the groups.
pub fn reorder_by_group(
    ballots: &[Ballot],
    choices: &KeyedChoices,
    group_field: &str,
) -> Result<Vec<Ballot>, TallyError> {
    let mut res: Vec<Ballot> = Vec::with_capacity(ballots.len());
    for b in ballots {
        // Members of each group, in ballot order.
        let mut members: BTreeMap<&str, Vec<ChoiceKey>> = BTreeMap::new();
        for key in &b.ranked_keys {
            if let Some(group) = choices.require(*key)?.group_value(group_field) {
                members.entry(group).or_default().push(*key);
            }
        }

        let mut placed: HashSet<ChoiceKey> = HashSet::new();
        let mut reordered: Vec<ChoiceKey> = Vec::with_capacity(b.ranked_keys.len());
        for key in &b.ranked_keys {
            if placed.contains(key) {
                continue;
            }
            match choices
                .require(*key)?
                .group_value(group_field)
                .and_then(|g| members.get(g))
            {
                Some(group_keys) => {
                    for k in group_keys {
                        if placed.insert(*k) {
                            reordered.push(*k);
                        }
                    }
                }
                None => {
                    placed.insert(*key);
                    reordered.push(*key);
                }
            }
        }
        res.push(b.with_keys(reordered));
    }
    debug!("reorder_by_group: reordered {} ballots", res.len());
    Ok(res)
}

/// Moves keys up so they precede their paired key.
///
/// For each entry `(later, earlier)` of the map: when a ballot ranks `earlier` after
/// `later`, `earlier` is moved to sit immediately before `later`. Ballots where
/// `earlier` is absent, or already ranked first, are left as they are.
pub fn move_up(ballots: &[Ballot], precedence: &PrecedenceMap) -> Vec<Ballot> {
    ballots
        .iter()
        .map(|b| {
            let keys = &b.ranked_keys;
            let mut moved: HashSet<ChoiceKey> = HashSet::new();
            let mut reordered: Vec<ChoiceKey> = Vec::with_capacity(keys.len());
            for (idx, key) in keys.iter().enumerate() {
                if moved.contains(key) {
                    continue;
                }
                if let Some(earlier) = precedence.get(key) {
                    if keys[idx + 1..].contains(earlier) && moved.insert(*earlier) {
                        reordered.push(*earlier);
                    }
                }
                reordered.push(*key);
            }
            b.with_keys(reordered)
        })
        .collect()
}

/// Pairs the extended member of each group with its basic member.
///
/// Every grouped choice must declare whether it is extended. Groups with only one of
/// the two scopes yield no pair.
pub fn group_precedence(
    choices: &KeyedChoices,
    group_field: &str,
) -> Result<PrecedenceMap, TallyError> {
    // group -> (basic, extended)
    let mut scopes: BTreeMap<&str, (Option<ChoiceKey>, Option<ChoiceKey>)> = BTreeMap::new();
    for (key, c) in choices.iter() {
        let group = match c.group_value(group_field) {
            Some(g) => g,
            None => continue,
        };
        let is_extended = c.is_extended.context(IncompleteChoiceMetadataSnafu {
            label: c.label.as_str(),
            field: "isExtended",
        })?;
        let slot = scopes.entry(group).or_insert((None, None));
        let target = if is_extended { &mut slot.1 } else { &mut slot.0 };
        ensure!(target.is_none(), ConflictingGroupScopesSnafu { group });
        *target = Some(key);
    }

    let precedence: PrecedenceMap = scopes
        .values()
        .filter_map(|(basic, extended)| match (basic, extended) {
            (Some(b), Some(e)) => Some((*e, *b)),
            _ => None,
        })
        .collect();
    debug!("group_precedence: {:?}", precedence);
    Ok(precedence)
}

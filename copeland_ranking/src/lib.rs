mod config;
use log::{debug, info};
use snafu::prelude::*;

pub mod allocation;
pub mod builder;
pub mod diff;
pub mod manual;
pub mod pairwise;
pub mod preprocess;
pub mod registry;
pub mod scoring;

pub use crate::config::*;
pub use crate::registry::{find_unranked_marker_key, key_choices, KeyedChoices};

/// Ranks the choices from the given ballots.
///
/// Arguments:
/// * `choices` the registered choices, keyed in the numbering used by the ballots
/// * `ballots` the ballots to process. They are not modified.
/// * `options` the variant and its parameters
///
/// The returned results are ordered, the first one is the winner. With
/// `Algorithm::GroupDeduplicated`, only the best entry of each group is returned.
pub fn run_tally(
    choices: &KeyedChoices,
    ballots: &[Ballot],
    options: &ScoringOptions,
) -> Result<Vec<ScoredResult>, TallyError> {
    info!(
        "Processing {:?} ballots, {:?} choices, options: {:?}",
        ballots.len(),
        choices.len(),
        options
    );
    for (key, c) in choices.iter() {
        debug!("Choice: {}: {}", key, c.label);
    }

    let res = match options.algorithm {
        Algorithm::Copeland => tally_copeland(choices, ballots, options),
        Algorithm::GroupDeduplicated => tally_group_deduplicated(choices, ballots, options),
        Algorithm::PrecedenceAdjusted => tally_precedence_adjusted(choices, ballots, options),
    }?;

    info!(
        "Ranking: {:?}",
        res.iter()
            .map(|r| choices.label(r.key).unwrap_or_default())
            .collect::<Vec<&str>>()
    );
    Ok(res)
}

/// Funds the ranked choices from the budget pools.
///
/// See [allocation::allocate] for the rules. `ranked` is usually the output of
/// [run_tally] for the same choices.
pub fn run_allocation(
    choices: &KeyedChoices,
    ranked: &[ScoredResult],
    options: &ScoringOptions,
    budgets: &AllocationBudgets,
) -> Result<Vec<AllocatedResult>, TallyError> {
    allocation::allocate(choices, ranked, options, budgets)
}

fn required<'a>(
    value: &'a Option<String>,
    field: &'static str,
    algorithm: Algorithm,
) -> Result<&'a str, TallyError> {
    value
        .as_deref()
        .context(MissingConfigFieldSnafu { field, algorithm })
}

// Tabulate, score and rank.
fn rank_ballots(
    choices: &KeyedChoices,
    ballots: &[Ballot],
    options: &ScoringOptions,
) -> Result<Vec<ScoredResult>, TallyError> {
    let records = pairwise::tabulate(&choices.keys(), ballots)?;
    let scored = scoring::score(&records, &options.points);
    Ok(scoring::rank(&scored, options.tiebreaker))
}

fn tally_copeland(
    choices: &KeyedChoices,
    ballots: &[Ballot],
    options: &ScoringOptions,
) -> Result<Vec<ScoredResult>, TallyError> {
    match options.unranked_from.as_deref() {
        Some(marker_label) => {
            let marker = find_unranked_marker_key(choices, marker_label)?;
            let truncated = preprocess::truncate_at_marker(ballots, marker, false);
            rank_ballots(choices, &truncated, options)
        }
        None => rank_ballots(choices, ballots, options),
    }
}

fn tally_group_deduplicated(
    choices: &KeyedChoices,
    ballots: &[Ballot],
    options: &ScoringOptions,
) -> Result<Vec<ScoredResult>, TallyError> {
    let group_field = required(&options.group_by, "groupBy", options.algorithm)?;
    let marker_label = required(&options.unranked_from, "unrankedFrom", options.algorithm)?;
    let marker = find_unranked_marker_key(choices, marker_label)?;

    let grouped = preprocess::reorder_by_group(ballots, choices, group_field)?;
    let truncated = preprocess::truncate_at_marker(&grouped, marker, false);
    let ranked = rank_ballots(choices, &truncated, options)?;
    scoring::deduplicate_by_group(&ranked, choices, group_field)
}

fn tally_precedence_adjusted(
    choices: &KeyedChoices,
    ballots: &[Ballot],
    options: &ScoringOptions,
) -> Result<Vec<ScoredResult>, TallyError> {
    let group_field = required(&options.group_by, "groupBy", options.algorithm)?;
    let marker_label = required(&options.unranked_from, "unrankedFrom", options.algorithm)?;
    for (_, c) in choices.iter() {
        ensure!(
            c.is_eligible_for_long_stream.is_some(),
            IncompleteChoiceMetadataSnafu {
                label: c.label.as_str(),
                field: "isEligibleFor2YearFunding",
            }
        );
        ensure!(
            c.is_extended.is_some(),
            IncompleteChoiceMetadataSnafu {
                label: c.label.as_str(),
                field: "isExtended",
            }
        );
    }

    let precedence = preprocess::group_precedence(choices, group_field)?;
    let moved = preprocess::move_up(ballots, &precedence);
    let marker = find_unranked_marker_key(choices, marker_label)?;
    // The marker stays on the ballot: it outranks everything the voter left below it.
    let truncated = preprocess::truncate_at_marker(&moved, marker, true);
    rank_ballots(choices, &truncated, options)
}

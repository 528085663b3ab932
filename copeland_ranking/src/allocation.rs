use log::{debug, info};
use snafu::prelude::*;
use std::collections::BTreeSet;

use crate::config::*;
use crate::registry::{find_unranked_marker_key, KeyedChoices};

// The metadata needed to fund one choice.
#[derive(Debug, Clone)]
struct FundingTerms<'a> {
    group: &'a str,
    budget: u64,
    is_extended: bool,
    is_eligible_for_long_stream: bool,
}

fn funding_terms(choice: &Choice) -> Result<FundingTerms<'_>, TallyError> {
    let missing = |field: &'static str| IncompleteChoiceMetadataSnafu {
        label: choice.label.as_str(),
        field,
    };
    Ok(FundingTerms {
        group: choice.group.as_deref().context(missing("group"))?,
        budget: choice.budget.context(missing("budget"))?,
        is_extended: choice.is_extended.context(missing("isExtended"))?,
        is_eligible_for_long_stream: choice
            .is_eligible_for_long_stream
            .context(missing("isEligibleFor2YearFunding"))?,
    })
}

/// The state carried from one ranked entry to the next.
#[derive(Debug, Clone)]
struct Ledger {
    remaining_total: u64,
    remaining_long_stream: u64,
    /// Groups with a funded basic scope. Only these may fund their extended scope.
    funded_groups: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Decision {
    LongStream(u64),
    ShortStream(u64),
    Unfunded,
}

impl Ledger {
    fn new(budgets: &AllocationBudgets) -> Ledger {
        Ledger {
            remaining_total: budgets.total,
            remaining_long_stream: budgets.long_stream,
            funded_groups: BTreeSet::new(),
        }
    }

    /// Decides the funding of one entry and returns the updated ledger.
    fn decide(
        self,
        rank_index: usize,
        terms: &FundingTerms,
        long_stream_slots: usize,
    ) -> (Ledger, Decision) {
        if terms.is_extended && !self.funded_groups.contains(terms.group) {
            return (self, Decision::Unfunded);
        }
        let remaining_long_stream = self.remaining_long_stream.min(self.remaining_total);
        if terms.is_eligible_for_long_stream
            && rank_index < long_stream_slots
            && terms.budget <= remaining_long_stream
        {
            let ledger = Ledger {
                remaining_total: self.remaining_total - terms.budget,
                remaining_long_stream: remaining_long_stream - terms.budget,
                funded_groups: self.with_group(terms.group),
            };
            return (ledger, Decision::LongStream(terms.budget));
        }
        if terms.budget <= self.remaining_total {
            let ledger = Ledger {
                remaining_total: self.remaining_total - terms.budget,
                remaining_long_stream,
                funded_groups: self.with_group(terms.group),
            };
            return (ledger, Decision::ShortStream(terms.budget));
        }
        (
            Ledger {
                remaining_long_stream,
                ..self
            },
            Decision::Unfunded,
        )
    }

    fn with_group(&self, group: &str) -> BTreeSet<String> {
        let mut groups = self.funded_groups.clone();
        groups.insert(group.to_string());
        groups
    }
}

/// Funds the ranked entries greedily, in rank order, from two budget pools.
///
/// The pass stops at the unranked marker: it and every entry ranked below it stay
/// unfunded. An extended scope is funded only once the basic scope of its group has
/// been. Eligible entries within the first `long_stream_slots` ranks are paid from
/// the long stream when it can still cover them; everything else is paid from the
/// general pool if it fits. An entry that does not fit is skipped, and later entries
/// are still considered.
///
/// The result follows the ranking order and has one entry per ranked result.
pub fn allocate(
    choices: &KeyedChoices,
    ranked: &[ScoredResult],
    options: &ScoringOptions,
    budgets: &AllocationBudgets,
) -> Result<Vec<AllocatedResult>, TallyError> {
    let marker_label = options
        .unranked_from
        .as_deref()
        .context(MissingConfigFieldSnafu {
            field: "unrankedFrom",
            algorithm: options.algorithm,
        })?;
    for (_, choice) in choices.iter() {
        funding_terms(choice)?;
    }
    let marker = find_unranked_marker_key(choices, marker_label)?;
    info!(
        "Allocating {} total ({} long stream) over {} ranked entries",
        budgets.total,
        budgets.long_stream,
        ranked.len()
    );

    let (ledger, decisions) = ranked
        .iter()
        .enumerate()
        .take_while(|(_, r)| r.key != marker)
        .try_fold(
            (Ledger::new(budgets), Vec::<Decision>::new()),
            |(ledger, mut decisions), (idx, r)| {
                let terms = funding_terms(choices.require(r.key)?)?;
                let (ledger, decision) = ledger.decide(idx, &terms, budgets.long_stream_slots);
                debug!("allocate: {} {:?} -> {:?}", r.key, terms, decision);
                decisions.push(decision);
                Ok::<_, TallyError>((ledger, decisions))
            },
        )?;
    info!(
        "Allocation left {} unspent ({} on the long stream)",
        ledger.remaining_total, ledger.remaining_long_stream
    );

    let res = ranked
        .iter()
        .enumerate()
        .map(|(idx, r)| {
            let decision = decisions.get(idx).copied().unwrap_or(Decision::Unfunded);
            let (funding_1_year, funding_2_year) = match decision {
                Decision::LongStream(amount) => (0, amount),
                Decision::ShortStream(amount) => (amount, 0),
                Decision::Unfunded => (0, 0),
            };
            AllocatedResult {
                result: r.clone(),
                funding_1_year,
                funding_2_year,
            }
        })
        .collect();
    Ok(res)
}

// ********* Input data structures ***********

use snafu::prelude::*;
use std::collections::BTreeMap;
use std::fmt::Display;

/// The ordinal key of a choice, as numbered by the external ballot source.
///
/// Keys start at 1 and are dense for the lifetime of one tabulation run.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct ChoiceKey(pub u32);

impl Display for ChoiceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The weight of a voter.
///
/// Stored in fixed point (10^-9 resolution) so that sums are exact and two
/// sides of a matchup that received the same power always compare as equal.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd, Default)]
pub struct VotingPower(u128);

impl VotingPower {
    pub const EMPTY: VotingPower = VotingPower(0);
    const UNITS_PER_WHOLE: u128 = 1_000_000_000;
    /// Largest power a single voter may hold.
    pub const MAX_WHOLE: f64 = 1e21;

    pub fn from_whole(amount: u64) -> VotingPower {
        VotingPower(amount as u128 * Self::UNITS_PER_WHOLE)
    }

    /// Converts a real-valued voting power. Negative, non-finite values and values
    /// above `MAX_WHOLE` are rejected.
    pub fn from_f64(amount: f64) -> Option<VotingPower> {
        if !amount.is_finite() || amount < 0.0 || amount > Self::MAX_WHOLE {
            return None;
        }
        Some(VotingPower(
            (amount * Self::UNITS_PER_WHOLE as f64).round() as u128,
        ))
    }

    pub fn from_units(units: u128) -> VotingPower {
        VotingPower(units)
    }

    pub fn units(&self) -> u128 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / Self::UNITS_PER_WHOLE as f64
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// `None` when the sum does not fit.
    pub fn checked_add(self, rhs: VotingPower) -> Option<VotingPower> {
        self.0.checked_add(rhs.0).map(VotingPower)
    }
}

impl Display for VotingPower {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let whole = self.0 / Self::UNITS_PER_WHOLE;
        let frac = self.0 % Self::UNITS_PER_WHOLE;
        if frac == 0 {
            write!(f, "{}", whole)
        } else {
            let digits = format!("{:09}", frac);
            write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
        }
    }
}

/// One option on the ballot.
///
/// `label` is the identity of the choice: it is what the external ballot source
/// lists when it numbers the choices. The remaining fields are only needed by the
/// group-aware variants and by the budget allocator.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Choice {
    pub label: String,
    /// Human-readable description, when it differs from the label.
    pub title: Option<String>,
    pub group: Option<String>,
    pub is_extended: Option<bool>,
    pub is_eligible_for_long_stream: Option<bool>,
    pub budget: Option<u64>,
    /// Any other string metadata. Grouping may use one of these instead of `group`.
    pub attributes: BTreeMap<String, String>,
}

impl Choice {
    pub const GROUP_FIELD: &'static str = "group";

    pub fn named(label: &str) -> Choice {
        Choice {
            label: label.to_string(),
            ..Choice::default()
        }
    }

    /// The grouping value of this choice for the given field name.
    ///
    /// Empty values are treated as absent.
    pub fn group_value(&self, group_field: &str) -> Option<&str> {
        let value = if group_field == Self::GROUP_FIELD {
            self.group.as_deref()
        } else {
            self.attributes.get(group_field).map(|s| s.as_str())
        };
        value.filter(|s| !s.is_empty())
    }
}

/// One voter's submission, most preferred choice first.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Ballot {
    pub voter: String,
    pub voting_power: VotingPower,
    pub ranked_keys: Vec<ChoiceKey>,
}

impl Ballot {
    pub fn new(voter: &str, voting_power: VotingPower, ranked_keys: Vec<ChoiceKey>) -> Ballot {
        Ballot {
            voter: voter.to_string(),
            voting_power,
            ranked_keys,
        }
    }

    /// Builds a ballot from a real-valued voting power, as reported by governance platforms.
    pub fn weighted(
        voter: &str,
        voting_power: f64,
        ranked_keys: &[u32],
    ) -> Result<Ballot, TallyError> {
        let vp = VotingPower::from_f64(voting_power).context(InvalidVotingPowerSnafu { voter })?;
        Ok(Ballot::new(
            voter,
            vp,
            ranked_keys.iter().map(|k| ChoiceKey(*k)).collect(),
        ))
    }

    /// Same ballot, different ranking. Preprocessors never modify a ballot in place.
    pub(crate) fn with_keys(&self, ranked_keys: Vec<ChoiceKey>) -> Ballot {
        Ballot {
            voter: self.voter.clone(),
            voting_power: self.voting_power,
            ranked_keys,
        }
    }
}

// ******** Output data structures *********

/// Pairwise statistics accumulated for one choice.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct PairwiseRecord {
    pub wins: u32,
    pub ties: u32,
    pub losses: u32,
    /// Voting power this choice won, summed over all its matchups.
    pub total_support: VotingPower,
    /// Number of matchups in which any power was contested.
    pub appearances: u32,
}

impl PairwiseRecord {
    pub const EMPTY: PairwiseRecord = PairwiseRecord {
        wins: 0,
        ties: 0,
        losses: 0,
        total_support: VotingPower::EMPTY,
        appearances: 0,
    };

    pub fn average_support(&self) -> f64 {
        average(self.total_support, self.appearances)
    }
}

fn average(total: VotingPower, appearances: u32) -> f64 {
    if appearances == 0 {
        0.0
    } else {
        total.as_f64() / appearances as f64
    }
}

/// A scored choice. Sequences of these are ordered: index 0 is the winner.
#[derive(PartialEq, Debug, Clone)]
pub struct ScoredResult {
    pub key: ChoiceKey,
    pub wins: u32,
    pub ties: u32,
    pub losses: u32,
    pub total_support: VotingPower,
    pub appearances: u32,
    pub points: f64,
}

impl ScoredResult {
    pub fn average_support(&self) -> f64 {
        average(self.total_support, self.appearances)
    }
}

/// Change of one choice between two independently computed rankings.
///
/// `rank` is negative when the choice moved toward the front. When the baseline
/// had no votes at all, `rank` is 0 and the other fields hold the new values.
#[derive(PartialEq, Debug, Clone)]
pub struct DiffRecord {
    pub key: ChoiceKey,
    pub rank: i64,
    pub wins: i64,
    pub ties: i64,
    pub losses: i64,
    pub points: f64,
    pub total_support: f64,
    pub appearances: i64,
    pub average_support: f64,
}

/// The funding stream a choice was paid from.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum FundingStream {
    /// The two-year stream, reserved to eligible choices near the top.
    LongStream,
    /// The one-year stream, drawing on the general pool.
    ShortStream,
    Unfunded,
}

#[derive(PartialEq, Debug, Clone)]
pub struct AllocatedResult {
    pub result: ScoredResult,
    pub funding_1_year: u64,
    pub funding_2_year: u64,
}

impl AllocatedResult {
    pub fn is_funded(&self) -> bool {
        self.funding_1_year > 0 || self.funding_2_year > 0
    }

    pub fn stream(&self) -> FundingStream {
        if self.funding_2_year > 0 {
            FundingStream::LongStream
        } else if self.funding_1_year > 0 {
            FundingStream::ShortStream
        } else {
            FundingStream::Unfunded
        }
    }
}

/// Errors that prevent a run from completing. All of them are fatal.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TallyError {
    #[snafu(display("Entry [{label}] not found in the choice definitions"))]
    ChoiceNotFound { label: String },

    #[snafu(display("Unranked marker [{label}] does not match any choice"))]
    UnrankedMarkerNotFound { label: String },

    #[snafu(display("{field} is required for algorithm {algorithm:?}"))]
    MissingConfigField {
        field: &'static str,
        algorithm: Algorithm,
    },

    #[snafu(display("Choice [{label}] must define {field}"))]
    IncompleteChoiceMetadata { label: String, field: &'static str },

    #[snafu(display("Result for key {key} is missing from the new ranking"))]
    MissingResultKey { key: ChoiceKey },

    #[snafu(display("Ballot references key {key}, which is not a registered choice"))]
    UnknownChoiceKey { key: ChoiceKey },

    #[snafu(display("Group {group} has more than one basic or extended scope"))]
    ConflictingGroupScopes { group: String },

    #[snafu(display("Voter {voter} has a negative, non-finite or oversized voting power"))]
    InvalidVotingPower { voter: String },

    #[snafu(display("Voting power of the choices {a} and {b} overflows"))]
    VotingPowerOverflow { a: ChoiceKey, b: ChoiceKey },

    #[snafu(display("No choices were registered before tallying"))]
    ChoicesNotRegistered {},
}

// ********* Configuration **********

/// The closed set of tabulation variants.
///
/// Each variant is a fixed composition of the same pipeline stages:
/// - `Copeland`: optional truncation at the unranked marker, then tabulate, score and rank.
/// - `GroupDeduplicated`: group-adjacency reorder, truncation, tabulate, score, rank and
/// keep only the best ranked entry of each group.
/// - `PrecedenceAdjusted`: basic scopes are moved above their extended scope on every
/// ballot, then truncation (keeping the marker), tabulate, score and rank.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Algorithm {
    Copeland,
    GroupDeduplicated,
    PrecedenceAdjusted,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Tiebreaker {
    /// Total support divided by the number of contested matchups.
    AverageSupport,
    TotalSupport,
}

/// Points awarded for each pairwise win, tie and loss.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct CopelandPoints {
    pub win: f64,
    pub tie: f64,
    pub loss: f64,
}

impl CopelandPoints {
    pub const STANDARD: CopelandPoints = CopelandPoints {
        win: 1.0,
        tie: 0.5,
        loss: 0.0,
    };

    /// Ties do not inflate scores. Used before deduplicating groups.
    pub const WINS_ONLY: CopelandPoints = CopelandPoints {
        win: 1.0,
        tie: 0.0,
        loss: 0.0,
    };

    pub fn from_weights(weights: [f64; 3]) -> CopelandPoints {
        CopelandPoints {
            win: weights[0],
            tie: weights[1],
            loss: weights[2],
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct ScoringOptions {
    pub algorithm: Algorithm,
    pub points: CopelandPoints,
    pub tiebreaker: Tiebreaker,
    /// Label of the marker choice ("None Below"). Anything ranked below it is unranked.
    pub unranked_from: Option<String>,
    /// Name of the choice field that groups choices together.
    pub group_by: Option<String>,
}

impl ScoringOptions {
    pub const DEFAULT_OPTIONS: ScoringOptions = ScoringOptions {
        algorithm: Algorithm::Copeland,
        points: CopelandPoints::STANDARD,
        tiebreaker: Tiebreaker::TotalSupport,
        unranked_from: None,
        group_by: None,
    };
}

/// Budget pools for the allocator.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct AllocationBudgets {
    /// The overall pool, shared by both streams.
    pub total: u64,
    /// The part of the pool that can be paid over two years.
    pub long_stream: u64,
    /// Only entries ranked within this many positions may use the long stream.
    pub long_stream_slots: usize,
}

impl AllocationBudgets {
    pub const DEFAULT_BUDGETS: AllocationBudgets = AllocationBudgets {
        total: 4_500_000,
        long_stream: 1_500_000,
        long_stream_slots: 10,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voting_power_is_exact() {
        let a = VotingPower::from_f64(0.1).unwrap();
        let b = VotingPower::from_f64(0.2).unwrap();
        assert_eq!(a.checked_add(b), VotingPower::from_f64(0.3));
        assert_eq!(VotingPower::from_whole(3), VotingPower::from_f64(3.0).unwrap());
    }

    #[test]
    fn voting_power_rejects_invalid_input() {
        assert_eq!(VotingPower::from_f64(-1.0), None);
        assert_eq!(VotingPower::from_f64(f64::NAN), None);
        assert_eq!(VotingPower::from_f64(f64::INFINITY), None);
        assert!(Ballot::weighted("0x1", -2.0, &[1]).is_err());
    }

    #[test]
    fn voting_power_is_bounded() {
        assert!(VotingPower::from_f64(VotingPower::MAX_WHOLE).is_some());
        assert_eq!(VotingPower::from_f64(2.0e29), None);
        assert_eq!(VotingPower::from_f64(1e30), None);
        assert!(Ballot::weighted("0x1", 1e31, &[1]).is_err());

        let big = VotingPower::from_units(u128::MAX / 2 + 1);
        assert_eq!(big.checked_add(big), None);
        assert_eq!(big.checked_add(VotingPower::EMPTY), Some(big));
    }

    #[test]
    fn voting_power_display() {
        assert_eq!(VotingPower::from_whole(200_000).to_string(), "200000");
        assert_eq!(VotingPower::from_f64(12.25).unwrap().to_string(), "12.25");
        assert_eq!(VotingPower::EMPTY.to_string(), "0");
    }

    #[test]
    fn group_value_uses_configured_field() {
        let mut c = Choice::named("A (Basic)");
        c.group = Some("vendorA".to_string());
        c.attributes
            .insert("team".to_string(), "Team A".to_string());
        assert_eq!(c.group_value("group"), Some("vendorA"));
        assert_eq!(c.group_value("team"), Some("Team A"));
        assert_eq!(c.group_value("other"), None);

        c.group = Some("".to_string());
        assert_eq!(c.group_value("group"), None);
    }

    #[test]
    fn funding_stream() {
        let result = ScoredResult {
            key: ChoiceKey(1),
            wins: 0,
            ties: 0,
            losses: 0,
            total_support: VotingPower::EMPTY,
            appearances: 0,
            points: 0.0,
        };
        let unfunded = AllocatedResult {
            result: result.clone(),
            funding_1_year: 0,
            funding_2_year: 0,
        };
        assert!(!unfunded.is_funded());
        assert_eq!(unfunded.stream(), FundingStream::Unfunded);
        let long = AllocatedResult {
            result,
            funding_1_year: 0,
            funding_2_year: 10,
        };
        assert!(long.is_funded());
        assert_eq!(long.stream(), FundingStream::LongStream);
    }
}

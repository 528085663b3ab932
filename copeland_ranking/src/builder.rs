pub use crate::config::*;
use crate::registry::{key_choices, KeyedChoices};
use snafu::prelude::*;

/// A builder for collecting ballots before a tally.
///
/// Ballots can be expressed with the keys of the choices (1-based, in the order
/// the choices were given) or directly with their labels.
///
/// ```
/// pub use copeland_ranking::builder::Builder;
/// pub use copeland_ranking::ScoringOptions;
/// # use copeland_ranking::TallyError;
///
/// let mut builder = Builder::new(&ScoringOptions::DEFAULT_OPTIONS)?
///     .choices(&["Anna".to_string(), "Bob".to_string(), "Clara".to_string()])?;
///
/// builder.add_ballot("0xa1", 10.0, &[2, 1])?;
/// builder.add_ballot_labels("0xb2", 4.5, &["Clara".to_string(), "Bob".to_string()])?;
///
/// let results = builder.tally()?;
/// assert_eq!(results[0].key.0, 2);
///
/// # Ok::<(), TallyError>(())
/// ```
pub struct Builder {
    pub(crate) _options: ScoringOptions,
    pub(crate) _choices: Option<KeyedChoices>,
    pub(crate) _ballots: Vec<Ballot>,
}

impl Builder {
    pub fn new(options: &ScoringOptions) -> Result<Builder, TallyError> {
        Ok(Builder {
            _options: options.clone(),
            _choices: None,
            _ballots: Vec::new(),
        })
    }

    /// Registers plain choices, keyed in the given order.
    pub fn choices(self, labels: &[String]) -> Result<Builder, TallyError> {
        let definitions: Vec<Choice> = labels.iter().map(|l| Choice::named(l)).collect();
        self.choice_definitions(&definitions, labels)
    }

    /// Registers full choice definitions, keyed in the order of `external_order`.
    pub fn choice_definitions(
        self,
        definitions: &[Choice],
        external_order: &[String],
    ) -> Result<Builder, TallyError> {
        Ok(Builder {
            _options: self._options,
            _choices: Some(key_choices(definitions, external_order)?),
            _ballots: Vec::new(),
        })
    }

    /// Adds a ballot, with its voting power.
    ///
    /// ranked_keys: the keys chosen by the voter, most preferred first.
    pub fn add_ballot(
        &mut self,
        voter: &str,
        voting_power: f64,
        ranked_keys: &[u32],
    ) -> Result<(), TallyError> {
        let ballot = Ballot::weighted(voter, voting_power, ranked_keys)?;
        self.add_ballot_2(&ballot)
    }

    /// Adds a ballot where the choices are given by label.
    ///
    /// Every label must be a registered choice.
    pub fn add_ballot_labels(
        &mut self,
        voter: &str,
        voting_power: f64,
        labels: &[String],
    ) -> Result<(), TallyError> {
        let choices = self._choices.as_ref().context(ChoicesNotRegisteredSnafu)?;
        let mut keys: Vec<u32> = Vec::with_capacity(labels.len());
        for label in labels {
            let key = choices
                .iter()
                .find(|(_, c)| c.label == *label)
                .map(|(k, _)| k.0)
                .context(ChoiceNotFoundSnafu { label })?;
            keys.push(key);
        }
        self.add_ballot(voter, voting_power, &keys)
    }

    pub fn add_ballot_2(&mut self, ballot: &Ballot) -> Result<(), TallyError> {
        self._ballots.push(ballot.clone());
        Ok(())
    }

    /// Runs the tally over the ballots added so far.
    pub fn tally(&self) -> Result<Vec<ScoredResult>, TallyError> {
        let choices = self._choices.as_ref().context(ChoicesNotRegisteredSnafu)?;
        crate::run_tally(choices, &self._ballots, &self._options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_and_keys_agree() {
        let names = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let mut by_key = Builder::new(&ScoringOptions::DEFAULT_OPTIONS)
            .unwrap()
            .choices(&names)
            .unwrap();
        by_key.add_ballot("v1", 2.0, &[3, 1]).unwrap();
        by_key.add_ballot("v2", 1.0, &[2]).unwrap();

        let mut by_label = Builder::new(&ScoringOptions::DEFAULT_OPTIONS)
            .unwrap()
            .choices(&names)
            .unwrap();
        by_label
            .add_ballot_labels("v1", 2.0, &["C".to_string(), "A".to_string()])
            .unwrap();
        by_label
            .add_ballot_labels("v2", 1.0, &["B".to_string()])
            .unwrap();

        assert_eq!(by_key.tally().unwrap(), by_label.tally().unwrap());
    }

    #[test]
    fn unknown_label() {
        let mut builder = Builder::new(&ScoringOptions::DEFAULT_OPTIONS)
            .unwrap()
            .choices(&["A".to_string()])
            .unwrap();
        assert!(matches!(
            builder.add_ballot_labels("v1", 1.0, &["Z".to_string()]),
            Err(TallyError::ChoiceNotFound { .. })
        ));
    }

    #[test]
    fn needs_choices() {
        let mut builder = Builder::new(&ScoringOptions::DEFAULT_OPTIONS).unwrap();
        builder.add_ballot("v1", 1.0, &[1]).unwrap();
        assert!(matches!(
            builder.tally(),
            Err(TallyError::ChoicesNotRegistered {})
        ));
    }
}

use log::debug;
use snafu::prelude::*;

use crate::config::*;

/// The choices of one run, addressable by their ordinal key.
///
/// Keys are assigned from 1 in the order of the external ballot source, so they are
/// dense and unique by construction.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct KeyedChoices {
    choices: Vec<Choice>,
}

impl KeyedChoices {
    /// Keys the choices in the order they are given.
    pub fn from_ordered(choices: Vec<Choice>) -> KeyedChoices {
        KeyedChoices { choices }
    }

    pub fn get(&self, key: ChoiceKey) -> Option<&Choice> {
        let idx = (key.0 as usize).checked_sub(1)?;
        self.choices.get(idx)
    }

    pub fn label(&self, key: ChoiceKey) -> Option<&str> {
        self.get(key).map(|c| c.label.as_str())
    }

    pub fn keys(&self) -> Vec<ChoiceKey> {
        (1..=self.choices.len() as u32).map(ChoiceKey).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChoiceKey, &Choice)> {
        self.choices
            .iter()
            .enumerate()
            .map(|(idx, c)| (ChoiceKey(idx as u32 + 1), c))
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    pub(crate) fn require(&self, key: ChoiceKey) -> Result<&Choice, TallyError> {
        self.get(key).context(UnknownChoiceKeySnafu { key })
    }
}

/// Assigns ordinal keys to the choice definitions.
///
/// `external_order` is the list of labels as the ballot source numbers them: the
/// label at position i receives key i+1. Every label must match a definition.
pub fn key_choices(
    definitions: &[Choice],
    external_order: &[String],
) -> Result<KeyedChoices, TallyError> {
    let mut keyed: Vec<Choice> = Vec::with_capacity(external_order.len());
    for label in external_order {
        let choice = definitions
            .iter()
            .find(|c| c.label == *label)
            .context(ChoiceNotFoundSnafu { label })?;
        keyed.push(choice.clone());
    }
    debug!(
        "key_choices: keyed {} choices out of {} definitions",
        keyed.len(),
        definitions.len()
    );
    Ok(KeyedChoices::from_ordered(keyed))
}

/// Finds the key of the "unranked from here" marker.
///
/// Labels are compared ignoring case and surrounding whitespace.
pub fn find_unranked_marker_key(
    choices: &KeyedChoices,
    marker_label: &str,
) -> Result<ChoiceKey, TallyError> {
    let needle = marker_label.trim().to_lowercase();
    choices
        .iter()
        .find(|(_, c)| c.label.trim().to_lowercase() == needle)
        .map(|(key, _)| key)
        .context(UnrankedMarkerNotFoundSnafu {
            label: marker_label,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn keys_follow_external_order() {
        let definitions = vec![Choice::named("A"), Choice::named("B"), Choice::named("C")];
        let keyed = key_choices(&definitions, &labels(&["C", "A", "B"])).unwrap();
        assert_eq!(keyed.len(), 3);
        assert_eq!(keyed.label(ChoiceKey(1)), Some("C"));
        assert_eq!(keyed.label(ChoiceKey(2)), Some("A"));
        assert_eq!(keyed.label(ChoiceKey(3)), Some("B"));
        assert_eq!(keyed.get(ChoiceKey(0)), None);
        assert_eq!(keyed.get(ChoiceKey(4)), None);
        assert_eq!(keyed.keys(), vec![ChoiceKey(1), ChoiceKey(2), ChoiceKey(3)]);
    }

    #[test]
    fn unknown_label_fails() {
        let definitions = vec![Choice::named("A"), Choice::named("B")];
        let res = key_choices(&definitions, &labels(&["A", "Z"]));
        assert!(matches!(res, Err(TallyError::ChoiceNotFound { label }) if label == "Z"));
    }

    #[test]
    fn marker_lookup_is_lenient() {
        let keyed = KeyedChoices::from_ordered(vec![
            Choice::named("Option A"),
            Choice::named("Option B"),
            Choice::named("None Below"),
        ]);
        assert_eq!(
            find_unranked_marker_key(&keyed, " none below ").unwrap(),
            ChoiceKey(3)
        );
        assert_eq!(
            find_unranked_marker_key(&keyed, "NONE BELOW").unwrap(),
            ChoiceKey(3)
        );
        assert!(matches!(
            find_unranked_marker_key(&keyed, "None Above"),
            Err(TallyError::UnrankedMarkerNotFound { .. })
        ));
    }
}

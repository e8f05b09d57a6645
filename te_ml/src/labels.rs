use std::collections::{BTreeMap, BTreeSet};
use serde::{Deserialize, Serialize};
use crate::error::LabelError;

/// Bijective mapping between class names and dense ids.
///
/// Ids follow the sorted order of the class names, so two encoders fitted on the same label set always agree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let classes: BTreeSet<&str> = labels.into_iter().collect();

        Self {
            classes: classes.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn encode(&self, name: &str) -> Result<usize, LabelError> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(name))
            .map_err(|_| LabelError::UnknownClass { name: name.to_string() })
    }

    pub fn encode_all<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Result<Vec<usize>, LabelError> {
        names.into_iter().map(|name| self.encode(name)).collect()
    }

    pub fn decode(&self, id: usize) -> Result<&str, LabelError> {
        self.classes
            .get(id)
            .map(String::as_str)
            .ok_or(LabelError::UnknownId {
                id,
                num_classes: self.num_classes(),
            })
    }

    pub fn class_to_index(&self) -> BTreeMap<&str, usize> {
        self.classes.iter().enumerate().map(|(i, c)| (c.as_str(), i)).collect()
    }

    pub fn index_to_class(&self) -> BTreeMap<usize, &str> {
        self.classes.iter().enumerate().map(|(i, c)| (i, c.as_str())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LABELS: [&str; 7] = ["joy", "sadness", "anger", "joy", "fear", "love", "surprise"];

    #[test]
    fn ids_are_sorted_and_deterministic() {
        let encoder = LabelEncoder::fit(LABELS);
        let reversed = LabelEncoder::fit(LABELS.iter().rev().copied());

        assert_eq!(encoder, reversed);
        assert_eq!(encoder.classes(), ["anger", "fear", "joy", "love", "sadness", "surprise"]);
    }

    #[test]
    fn mappings_are_inverse() {
        let encoder = LabelEncoder::fit(LABELS);
        let forward = encoder.class_to_index();
        let backward = encoder.index_to_class();

        for (name, id) in &forward {
            assert_eq!(backward[id], *name);
            assert_eq!(encoder.decode(*id).unwrap(), *name);
            assert_eq!(encoder.encode(name).unwrap(), *id);
        }
        assert_eq!(forward.len(), backward.len());
    }

    #[test]
    fn encoded_ids_stay_in_range() {
        let encoder = LabelEncoder::fit(LABELS);
        let ids = encoder.encode_all(LABELS).unwrap();

        assert!(ids.iter().all(|&id| id < encoder.num_classes()));
    }

    #[test]
    fn unknown_names_and_ids_are_errors() {
        let encoder = LabelEncoder::fit(["joy", "fear"]);

        assert!(matches!(encoder.encode("love"), Err(LabelError::UnknownClass { .. })));
        assert!(matches!(encoder.decode(2), Err(LabelError::UnknownId { id: 2, num_classes: 2 })));
    }
}

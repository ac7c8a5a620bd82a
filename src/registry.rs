use std::collections::{BTreeMap, HashMap};

use crate::model::Classifier;

/// Label used when a classifier predicts a class that is absent from its label map.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Maps a classifier's class index back to a human-readable label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMap {
    labels: BTreeMap<usize, String>,
}

impl LabelMap {
    /// Build from the `label -> index` pairs stored on disk.
    ///
    /// Returns the clashing index when two labels claim the same one.
    pub fn from_label_indices<I>(pairs: I) -> Result<LabelMap, usize>
    where
        I: IntoIterator<Item = (String, usize)>,
    {
        let mut labels = BTreeMap::new();

        for (label, index) in pairs {
            if labels.insert(index, label).is_some() {
                return Err(index);
            }
        }

        Ok(LabelMap { labels })
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(&index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels in class-index order.
    pub fn labels(&self) -> impl Iterator<Item = (usize, &str)> {
        self.labels.iter().map(|(idx, label)| (*idx, label.as_str()))
    }
}

/// One trained model together with the feature layout it was trained on.
pub struct ModelEntry {
    antibiotic_id: String,
    classifier: Box<dyn Classifier>,
    expected_columns: Vec<String>,
    column_positions: HashMap<String, usize>,
    label_map: LabelMap,
}

impl ModelEntry {
    /// Build an entry. `expected_columns` must not contain duplicates; the
    /// store loader rejects such lists before they get here.
    pub fn new(
        antibiotic_id: impl Into<String>,
        classifier: Box<dyn Classifier>,
        expected_columns: Vec<String>,
        label_map: LabelMap,
    ) -> ModelEntry {
        let column_positions: HashMap<String, usize> = expected_columns
            .iter()
            .enumerate()
            .map(|(idx, column)| (column.clone(), idx))
            .collect();
        debug_assert_eq!(
            column_positions.len(),
            expected_columns.len(),
            "duplicate expected column"
        );

        ModelEntry {
            antibiotic_id: antibiotic_id.into(),
            classifier,
            expected_columns,
            column_positions,
            label_map,
        }
    }

    pub fn antibiotic_id(&self) -> &str {
        &self.antibiotic_id
    }

    /// Human-readable antibiotic name, e.g. `amoxicillin_clavulanate` -> `Amoxicillin Clavulanate`.
    pub fn display_name(&self) -> String {
        display_name(&self.antibiotic_id)
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn expected_columns(&self) -> &[String] {
        &self.expected_columns
    }

    /// Position of `column` in the expected column order.
    pub fn column_position(&self, column: &str) -> Option<usize> {
        self.column_positions.get(column).copied()
    }

    pub fn label_map(&self) -> &LabelMap {
        &self.label_map
    }
}

/// All loaded models, iterated in ascending antibiotic-id order.
#[derive(Default)]
pub struct Registry {
    entries: BTreeMap<String, ModelEntry>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Add an entry, returning the previous entry with the same id if there was one.
    pub fn insert(&mut self, entry: ModelEntry) -> Option<ModelEntry> {
        self.entries.insert(entry.antibiotic_id.clone(), entry)
    }

    pub fn get(&self, antibiotic_id: &str) -> Option<&ModelEntry> {
        self.entries.get(antibiotic_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Replace underscores with spaces and title-case every alphabetic run.
pub fn display_name(antibiotic_id: &str) -> String {
    let mut name = String::with_capacity(antibiotic_id.len());
    let mut prev_is_alpha = false;

    for c in antibiotic_id.chars() {
        let c = if c == '_' { ' ' } else { c };

        if c.is_alphabetic() {
            if prev_is_alpha {
                name.extend(c.to_lowercase());
            } else {
                name.extend(c.to_uppercase());
            }
            prev_is_alpha = true;
        } else {
            name.push(c);
            prev_is_alpha = false;
        }
    }

    name
}

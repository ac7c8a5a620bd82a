//! The encoder mapping: how a raw categorical value expands into feature columns.
//!
//! On disk this is a JSON object `field -> raw value -> column -> weight`, e.g.
//!
//! ```json
//! { "species": { "Escherichia coli": { "species_Escherichia coli": 1 } } }
//! ```
//!
//! File order is kept, so the dropdown lists come out in the order they were written.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::LoadError;

/// Column weights produced by one raw value.
pub type ColumnWeights = IndexMap<String, f64>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct EncoderMapping {
    fields: IndexMap<String, IndexMap<String, ColumnWeights>>,
}

impl EncoderMapping {
    pub fn load(path: &Path) -> Result<EncoderMapping, LoadError> {
        let contents = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        EncoderMapping::parse(&contents, path)
    }

    /// Parse the mapping. `path` is only used in error messages
    pub fn parse(contents: &str, path: &Path) -> Result<EncoderMapping, LoadError> {
        let mapping: EncoderMapping =
            serde_json::from_str(contents).map_err(|source| LoadError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        if mapping.fields.is_empty() {
            return Err(LoadError::EncoderMapping {
                path: path.to_path_buf(),
                reason: "no fields defined".to_string(),
            });
        }

        Ok(mapping)
    }

    /// Columns set by `value` of `field`, `None` when either is unknown.
    pub fn lookup(&self, field: &str, value: &str) -> Option<&ColumnWeights> {
        self.fields.get(field)?.get(value)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Valid raw values of every field, keyed `"{field}_list"`.
    pub fn dropdowns(&self) -> IndexMap<String, Vec<String>> {
        self.fields
            .iter()
            .map(|(field, values)| (format!("{field}_list"), values.keys().cloned().collect()))
            .collect()
    }
}

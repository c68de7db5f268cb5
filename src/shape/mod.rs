// src/shape/mod.rs

//! Representation-specific handling of the university list.
//!
//! Cleaning and grouping differ per representation; charting and export do
//! not, so those are provided once on the trait in terms of `group`.

pub mod records;
pub mod table;

use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;

use crate::data::{Dataset, GroupedResult, RawRecord, Shape, COUNTRY};
use crate::error::{Error, Result};
use crate::render::RenderStrategy;

pub use records::RecordHandler;
pub use table::TableHandler;

pub trait ShapeHandler {
    fn shape(&self) -> Shape;

    /// Lowercase string values and canonicalize field names. Idempotent.
    fn normalize(&self, data: Dataset) -> Result<Dataset>;

    /// Wire records → native representation, normalized.
    fn parse(&self, raw: Vec<RawRecord>) -> Result<Dataset>;

    /// Count records per `country`, ordered by count descending then name.
    fn group(&self, data: &Dataset) -> Result<GroupedResult>;

    fn render(&self, data: &Dataset, renderer: &dyn RenderStrategy) -> Result<()> {
        let (labels, counts) = self.group(data)?.series()?;
        debug!(bars = labels.len(), renderer = renderer.name(), "displaying chart");
        renderer.display(&labels, &counts)
    }

    /// Returns the path of the written `.png`; the caller owns the file.
    fn export(&self, data: &Dataset, renderer: &dyn RenderStrategy) -> Result<PathBuf> {
        let (labels, counts) = self.group(data)?.series()?;
        debug!(bars = labels.len(), renderer = renderer.name(), "exporting chart");
        renderer.export_to_file(&labels, &counts)
    }
}

pub fn handler_for(shape: Shape) -> Box<dyn ShapeHandler> {
    match shape {
        Shape::Records => Box::new(RecordHandler),
        Shape::Table => Box::new(TableHandler),
    }
}

/// `"Alpha Two-Code"` → `"alpha_two_code"`.
pub fn canonical_key(key: &str) -> String {
    key.to_lowercase().replace(['-', ' '], "_")
}

/// Rewrite keys to canonical form; on collision the later key wins.
fn canonicalize_keys(record: RawRecord) -> RawRecord {
    record
        .into_iter()
        .map(|(k, v)| (canonical_key(&k), v))
        .collect()
}

/// Canonical keys, with a non-null, non-string `country` replaced by its JSON
/// text. Both representations then group `5`, `1.0` or `true` under the same
/// label.
pub(crate) fn canonicalize_record(record: RawRecord) -> RawRecord {
    let mut record = canonicalize_keys(record);
    if let Some(value) = record.get_mut(COUNTRY) {
        if !matches!(value, Value::Null | Value::String(_)) {
            *value = Value::String(value.to_string());
        }
    }
    record
}

/// Text used as the grouping key for a `country` value.
pub(crate) fn country_label(value: Option<&Value>, row: usize) -> Result<String> {
    match value {
        None | Some(Value::Null) => Err(Error::MissingField {
            field: COUNTRY,
            row,
        }),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Ok(other.to_string()),
    }
}

pub(crate) fn unsupported(handler: Shape, data: &Dataset) -> Error {
    Error::UnsupportedShape {
        handler,
        found: data.shape(),
    }
}

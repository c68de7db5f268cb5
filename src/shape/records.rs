// src/shape/records.rs

use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use super::{canonicalize_record, country_label, unsupported, ShapeHandler};
use crate::data::{CountryCounts, Dataset, GroupedResult, RawRecord, Shape, COUNTRY};
use crate::error::Result;

/// Keeps the data as a list of key/value records.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordHandler;

fn lowercase_values(record: &mut RawRecord) {
    for value in record.values_mut() {
        if let Value::String(s) = value {
            *s = s.to_lowercase();
        }
    }
}

impl ShapeHandler for RecordHandler {
    fn shape(&self) -> Shape {
        Shape::Records
    }

    fn normalize(&self, data: Dataset) -> Result<Dataset> {
        let rows = match data {
            Dataset::Records(rows) => rows,
            other => return Err(unsupported(Shape::Records, &other)),
        };
        let rows: Vec<RawRecord> = rows
            .into_iter()
            .map(|row| {
                let mut row = canonicalize_record(row);
                lowercase_values(&mut row);
                row
            })
            .collect();
        debug!(rows = rows.len(), "normalized records");
        Ok(Dataset::Records(rows))
    }

    fn parse(&self, raw: Vec<RawRecord>) -> Result<Dataset> {
        self.normalize(Dataset::Records(raw))
    }

    fn group(&self, data: &Dataset) -> Result<GroupedResult> {
        let Dataset::Records(rows) = data else {
            return Err(unsupported(Shape::Records, data));
        };

        let mut counts: HashMap<String, u64> = HashMap::new();
        for (row, record) in rows.iter().enumerate() {
            let country = country_label(record.get(COUNTRY), row)?;
            *counts.entry(country).or_default() += 1;
        }
        debug!(groups = counts.len(), "grouped records by country");
        Ok(GroupedResult::Mapping(CountryCounts::sorted(
            counts.into_iter().collect(),
        )))
    }
}

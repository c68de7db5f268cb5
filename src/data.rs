// src/data.rs

use arrow::{
    array::{Array, ArrayRef, Int64Array, StringArray},
    csv::WriterBuilder,
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use serde::{ser::SerializeMap, Serialize, Serializer};
use serde_json::{Map, Value};
use std::{fmt, sync::Arc};

use crate::error::{Error, Result};

/// One university as returned by the upstream source.
pub type RawRecord = Map<String, Value>;

pub const COUNTRY: &str = "country";
pub const COUNT: &str = "count";

/// Which representation a dataset or grouped result is held in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Records,
    Table,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Records => f.write_str("record-oriented"),
            Shape::Table => f.write_str("tabular"),
        }
    }
}

/// The fetched universities, either as a list of records or as one
/// columnar batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    Records(Vec<RawRecord>),
    Table(RecordBatch),
}

impl Dataset {
    pub fn shape(&self) -> Shape {
        match self {
            Dataset::Records(_) => Shape::Records,
            Dataset::Table(_) => Shape::Table,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Dataset::Records(rows) => rows.len(),
            Dataset::Table(batch) => batch.num_rows(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Country → count, kept in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountryCounts(Vec<(String, u64)>);

impl CountryCounts {
    /// Build from unordered pairs, applying the canonical order:
    /// count descending, then country ascending.
    pub fn sorted(mut pairs: Vec<(String, u64)>) -> Self {
        pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Self(pairs)
    }

    pub fn get(&self, country: &str) -> Option<u64> {
        self.0.iter().find(|(c, _)| c == country).map(|(_, n)| *n)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(c, n)| (c.as_str(), *n))
    }

    pub fn total(&self) -> u64 {
        self.0.iter().map(|(_, n)| n).sum()
    }

    pub fn into_pairs(self) -> Vec<(String, u64)> {
        self.0
    }

    /// Two-column `country`/`count` batch in the same order.
    pub fn to_batch(&self) -> Result<RecordBatch> {
        let schema = Arc::new(grouped_schema());
        let countries: ArrayRef = Arc::new(StringArray::from_iter_values(
            self.0.iter().map(|(c, _)| c.as_str()),
        ));
        let counts: ArrayRef = Arc::new(Int64Array::from_iter_values(
            self.0.iter().map(|(_, n)| *n as i64),
        ));
        Ok(RecordBatch::try_new(schema, vec![countries, counts])?)
    }

    /// Read a `country`/`count` batch back into pairs, preserving row order.
    pub fn from_batch(batch: &RecordBatch) -> Result<Self> {
        let countries = batch
            .column_by_name(COUNTRY)
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or(Error::MissingField {
                field: COUNTRY,
                row: 0,
            })?;
        let counts = batch
            .column_by_name(COUNT)
            .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
            .ok_or(Error::MissingField {
                field: COUNT,
                row: 0,
            })?;

        let mut pairs = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            if countries.is_null(row) {
                return Err(Error::MissingField {
                    field: COUNTRY,
                    row,
                });
            }
            if counts.is_null(row) {
                return Err(Error::MissingField { field: COUNT, row });
            }
            pairs.push((countries.value(row).to_string(), counts.value(row).max(0) as u64));
        }
        Ok(Self(pairs))
    }
}

impl Serialize for CountryCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (country, count) in &self.0 {
            map.serialize_entry(country, count)?;
        }
        map.end()
    }
}

pub fn grouped_schema() -> Schema {
    Schema::new(vec![
        Field::new(COUNTRY, DataType::Utf8, false),
        Field::new(COUNT, DataType::Int64, false),
    ])
}

/// Per-country counts, in the same representation family as the dataset
/// they were computed from.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupedResult {
    Mapping(CountryCounts),
    Table(RecordBatch),
}

impl GroupedResult {
    pub fn shape(&self) -> Shape {
        match self {
            GroupedResult::Mapping(_) => Shape::Records,
            GroupedResult::Table(_) => Shape::Table,
        }
    }

    pub fn extension(&self) -> DataExtension {
        DataExtension::for_shape(self.shape())
    }

    /// Representation-independent view of the counts.
    pub fn counts(&self) -> Result<CountryCounts> {
        match self {
            GroupedResult::Mapping(counts) => Ok(counts.clone()),
            GroupedResult::Table(batch) => CountryCounts::from_batch(batch),
        }
    }

    /// Parallel label/count sequences for a chart.
    pub fn series(&self) -> Result<(Vec<String>, Vec<u64>)> {
        Ok(self.counts()?.into_pairs().into_iter().unzip())
    }

    /// Serialize for upload in the format named by `ext`.
    pub fn to_bytes(&self, ext: DataExtension) -> Result<Vec<u8>> {
        match ext {
            DataExtension::Json => self.to_json(),
            DataExtension::Csv => self.to_csv(),
        }
    }

    /// JSON object `{"country": count, ...}` in result order.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.counts()?)?)
    }

    /// Headed `country,count` CSV in result order.
    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let owned;
        let batch = match self {
            GroupedResult::Table(batch) => batch,
            GroupedResult::Mapping(counts) => {
                owned = counts.to_batch()?;
                &owned
            }
        };
        let mut buf = Vec::new();
        {
            let mut writer = WriterBuilder::new().with_header(true).build(&mut buf);
            writer.write(batch)?;
        }
        Ok(buf)
    }
}

/// File extension for the uploaded aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataExtension {
    Json,
    Csv,
}

impl DataExtension {
    pub fn for_shape(shape: Shape) -> Self {
        match shape {
            Shape::Records => DataExtension::Json,
            Shape::Table => DataExtension::Csv,
        }
    }

    /// Including the leading dot.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataExtension::Json => ".json",
            DataExtension::Csv => ".csv",
        }
    }
}

impl fmt::Display for DataExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// src/shape/table.rs

use arrow::{
    array::{Array, ArrayRef, LargeStringArray, StringArray},
    compute::cast,
    datatypes::{DataType, Field, Schema},
    error::ArrowError,
    json::reader::{infer_json_schema_from_iterator, ReaderBuilder},
    record_batch::RecordBatch,
};
use serde_json::Value;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tracing::debug;

use super::{canonical_key, canonicalize_record, unsupported, ShapeHandler};
use crate::data::{CountryCounts, Dataset, GroupedResult, RawRecord, Shape, COUNTRY};
use crate::error::{Error, Result};

/// Keeps the data as a single Arrow `RecordBatch`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableHandler;

/// Infer an Arrow schema from the records and decode them into one batch.
///
/// - string fields        → Utf8
/// - integer fields       → Int64
/// - fractional fields    → Float64
/// - lists (e.g. domains) → List<..>
/// - mixed scalar fields  → Utf8 (numbers coerced to text)
/// - objects, nested lists, lists mixed with scalars → Utf8 holding JSON text
fn records_to_batch(raw: Vec<RawRecord>) -> Result<RecordBatch> {
    if raw.is_empty() {
        let schema = Schema::new(vec![Field::new(COUNTRY, DataType::Utf8, true)]);
        return Ok(RecordBatch::new_empty(Arc::new(schema)));
    }

    let as_text = untyped_fields(&raw);
    if !as_text.is_empty() {
        debug!(fields = ?as_text, "keeping loosely typed fields as JSON text");
    }
    let values: Vec<Value> = raw
        .into_iter()
        .map(|mut record| {
            stringify_fields(&mut record, &as_text);
            Value::Object(record)
        })
        .collect();
    let schema = infer_json_schema_from_iterator(values.iter().map(Ok::<_, ArrowError>))?;

    let mut decoder = ReaderBuilder::new(Arc::new(schema))
        .with_batch_size(values.len())
        .with_coerce_primitive(true)
        .build_decoder()?;
    decoder.serialize(&values)?;
    decoder
        .flush()?
        .ok_or_else(|| Error::Arrow(ArrowError::JsonError("decoder produced no rows".into())))
}

#[derive(Default)]
struct ValueKinds {
    lists: bool,
    scalars: bool,
    nested: bool,
}

/// Fields the JSON decoder cannot read with one inferred type: any field
/// holding an object or a list of lists/objects, and fields that are a list in
/// one record and a scalar in another.
fn untyped_fields(raw: &[RawRecord]) -> HashSet<String> {
    let mut kinds: HashMap<&str, ValueKinds> = HashMap::new();
    for record in raw {
        for (key, value) in record {
            let seen = kinds.entry(key.as_str()).or_default();
            match value {
                Value::Null => {}
                Value::Object(_) => seen.nested = true,
                Value::Array(items) => {
                    seen.lists = true;
                    seen.nested |= items.iter().any(|v| v.is_array() || v.is_object());
                }
                _ => seen.scalars = true,
            }
        }
    }
    kinds
        .into_iter()
        .filter(|(_, seen)| seen.nested || (seen.lists && seen.scalars))
        .map(|(key, _)| key.to_string())
        .collect()
}

/// Replace non-null, non-string values of `fields` with their JSON text.
fn stringify_fields(record: &mut RawRecord, fields: &HashSet<String>) {
    for (key, value) in record.iter_mut() {
        if fields.contains(key) && !matches!(value, Value::Null | Value::String(_)) {
            *value = Value::String(value.to_string());
        }
    }
}

fn lowercase_column(column: &ArrayRef) -> ArrayRef {
    match column.data_type() {
        DataType::Utf8 => match column.as_any().downcast_ref::<StringArray>() {
            Some(arr) => Arc::new(
                arr.iter()
                    .map(|v| v.map(str::to_lowercase))
                    .collect::<StringArray>(),
            ),
            None => column.clone(),
        },
        DataType::LargeUtf8 => match column.as_any().downcast_ref::<LargeStringArray>() {
            Some(arr) => Arc::new(
                arr.iter()
                    .map(|v| v.map(str::to_lowercase))
                    .collect::<LargeStringArray>(),
            ),
            None => column.clone(),
        },
        _ => column.clone(),
    }
}

impl ShapeHandler for TableHandler {
    fn shape(&self) -> Shape {
        Shape::Table
    }

    fn normalize(&self, data: Dataset) -> Result<Dataset> {
        let batch = match data {
            Dataset::Table(batch) => batch,
            other => return Err(unsupported(Shape::Table, &other)),
        };

        let schema = batch.schema();
        let fields: Vec<Field> = schema
            .fields()
            .iter()
            .map(|f| f.as_ref().clone().with_name(canonical_key(f.name())))
            .collect();
        let columns: Vec<ArrayRef> = batch.columns().iter().map(lowercase_column).collect();

        let schema = Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone()));
        let batch = RecordBatch::try_new(schema, columns)?;
        debug!(
            rows = batch.num_rows(),
            columns = batch.num_columns(),
            "normalized table"
        );
        Ok(Dataset::Table(batch))
    }

    fn parse(&self, raw: Vec<RawRecord>) -> Result<Dataset> {
        // Canonical keys first, so differently-cased spellings of one field
        // land in a single column.
        let raw: Vec<RawRecord> = raw.into_iter().map(canonicalize_record).collect();
        let batch = records_to_batch(raw)?;
        self.normalize(Dataset::Table(batch))
    }

    fn group(&self, data: &Dataset) -> Result<GroupedResult> {
        let Dataset::Table(batch) = data else {
            return Err(unsupported(Shape::Table, data));
        };

        let Some(column) = batch.column_by_name(COUNTRY) else {
            if batch.num_rows() == 0 {
                return Ok(GroupedResult::Table(CountryCounts::default().to_batch()?));
            }
            return Err(Error::MissingField {
                field: COUNTRY,
                row: 0,
            });
        };
        let as_text = cast(column.as_ref(), &DataType::Utf8)?;
        let countries = as_text
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| Error::Arrow(ArrowError::CastError("country is not text".into())))?;

        let mut counts: HashMap<&str, u64> = HashMap::new();
        for row in 0..countries.len() {
            if countries.is_null(row) {
                return Err(Error::MissingField {
                    field: COUNTRY,
                    row,
                });
            }
            *counts.entry(countries.value(row)).or_default() += 1;
        }
        debug!(groups = counts.len(), "grouped table by country");

        let grouped = CountryCounts::sorted(
            counts
                .into_iter()
                .map(|(country, n)| (country.to_string(), n))
                .collect(),
        );
        Ok(GroupedResult::Table(grouped.to_batch()?))
    }
}

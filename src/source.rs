// src/source.rs

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::data::RawRecord;
use crate::error::{Error, Result};

/// Where the raw university list comes from.
pub trait RecordSource {
    fn fetch_all(&self) -> Result<Vec<RawRecord>>;
}

/// A single GET against the public universities endpoint.
pub struct HttpSource {
    client: Client,
    url: Url,
}

impl HttpSource {
    pub fn new(url: &str) -> Result<Self> {
        Self::with_client(url, Client::new())
    }

    pub fn with_client(url: &str, client: Client) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| Error::Config(format!("source url `{url}`: {e}")))?;
        Ok(Self { client, url })
    }
}

impl RecordSource for HttpSource {
    fn fetch_all(&self) -> Result<Vec<RawRecord>> {
        info!(url = %self.url, "fetching universities");
        let body: Value = self
            .client
            .get(self.url.clone())
            .send()?
            .error_for_status()?
            .json()?;
        let records = records_from_json(body)?;
        debug!(count = records.len(), "decoded upstream records");
        Ok(records)
    }
}

/// Accept only a top-level array of objects.
pub fn records_from_json(body: Value) -> Result<Vec<RawRecord>> {
    let Value::Array(items) = body else {
        return Err(Error::Fetch("expected a JSON array of records".into()));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => Ok(map),
            other => Err(Error::Fetch(format!(
                "entry {i} is not an object: {other}"
            ))),
        })
        .collect()
}

/// Records held in memory; stands in for the network in tests and offline runs.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    records: Vec<RawRecord>,
}

impl StaticSource {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self { records }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let body: Value = serde_json::from_str(text)?;
        Ok(Self::new(records_from_json(body)?))
    }
}

impl RecordSource for StaticSource {
    fn fetch_all(&self) -> Result<Vec<RawRecord>> {
        Ok(self.records.clone())
    }
}

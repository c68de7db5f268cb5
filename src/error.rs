// src/error.rs

use std::path::PathBuf;

use thiserror::Error;

use crate::data::Shape;

/// Everything that can abort a run.
#[derive(Debug, Error)]
pub enum Error {
    /// A record has no value for a required field after normalization.
    #[error("record {row} is missing required field `{field}`")]
    MissingField { field: &'static str, row: usize },

    /// A handler was given a dataset of the other shape.
    #[error("{handler} handler cannot process a {found} dataset")]
    UnsupportedShape { handler: Shape, found: Shape },

    /// Labels and counts handed to a renderer are not parallel.
    #[error("series length mismatch: {labels} labels vs {counts} counts")]
    InvalidSeries { labels: usize, counts: usize },

    #[error("upload to {backend} failed: {message}")]
    Upload {
        backend: &'static str,
        message: String,
    },

    #[error("fetching upstream records failed: {0}")]
    Fetch(String),

    #[error("rendering chart failed: {0}")]
    Render(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("i/o error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn upload(backend: &'static str, message: impl ToString) -> Self {
        Error::Upload {
            backend,
            message: message.to_string(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Fetch(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

// src/config.rs

use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use url::Url;

use crate::error::{Error, Result};

pub const DEFAULT_SOURCE_URL: &str = "http://universities.hipolabs.com/search";

/// Run configuration. Every field has a default, so an empty (or absent)
/// YAML file yields a usable config.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source_url: String,
    /// Where figures and staged data files are written before upload.
    pub output_dir: PathBuf,
    pub direct: DirectConfig,
    pub staged: StagedConfig,
}

/// Direct-path backend: account URL + container + object path.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DirectConfig {
    pub endpoint: String,
    pub bucket: String,
    pub prefix: Option<String>,
}

/// Staged-upload backend: folders created under `parent_folder_id`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StagedConfig {
    pub parent_folder_id: String,
    pub api_base: String,
    /// Externally provisioned bearer token.
    pub access_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            output_dir: PathBuf::from("."),
            direct: DirectConfig::default(),
            staged: StagedConfig::default(),
        }
    }
}

impl Default for DirectConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://storage.googleapis.com".to_string(),
            bucket: "university-data".to_string(),
            prefix: None,
        }
    }
}

impl Default for StagedConfig {
    fn default() -> Self {
        Self {
            parent_folder_id: "root".to_string(),
            api_base: "https://www.googleapis.com".to_string(),
            access_token: None,
        }
    }
}

impl Config {
    /// Load from a YAML file, or fall back to defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(p) => {
                let text = fs::read_to_string(p).map_err(|e| Error::io(p, e))?;
                Self::from_yaml(&text)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("source_url", &self.source_url),
            ("direct.endpoint", &self.direct.endpoint),
            ("staged.api_base", &self.staged.api_base),
        ] {
            Url::parse(value).map_err(|e| Error::Config(format!("{name} `{value}`: {e}")))?;
        }
        if self.direct.bucket.trim().is_empty() {
            return Err(Error::Config("direct.bucket must not be empty".into()));
        }
        if self.staged.parent_folder_id.trim().is_empty() {
            return Err(Error::Config(
                "staged.parent_folder_id must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn missing_file_means_defaults() {
        let cfg = Config::load(None).unwrap();
        assert_eq!(cfg.source_url, DEFAULT_SOURCE_URL);
        assert_eq!(cfg.direct.bucket, "university-data");
        assert_eq!(cfg.staged.parent_folder_id, "root");
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "output_dir: /tmp/charts\ndirect:\n  bucket: my-bucket\n  prefix: runs"
        )
        .unwrap();

        let cfg = Config::load(Some(file.path())).unwrap();
        assert_eq!(cfg.output_dir, PathBuf::from("/tmp/charts"));
        assert_eq!(cfg.direct.bucket, "my-bucket");
        assert_eq!(cfg.direct.prefix.as_deref(), Some("runs"));
        assert_eq!(cfg.direct.endpoint, "https://storage.googleapis.com");
        assert_eq!(cfg.source_url, DEFAULT_SOURCE_URL);
    }

    #[test]
    fn bad_url_is_rejected() {
        let cfg = Config::from_yaml("source_url: not a url").unwrap();
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn empty_bucket_is_rejected() {
        let cfg = Config::from_yaml("direct:\n  bucket: ''").unwrap();
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }
}

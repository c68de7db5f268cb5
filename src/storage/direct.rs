// src/storage/direct.rs

use google_cloud_storage::{
    client::{Client, ClientConfig},
    http::objects::upload::{Media, UploadObjectRequest, UploadType},
};
use std::{path::Path, sync::Arc};
use tokio::runtime::{Builder, Runtime};
use tracing::info;

use super::{remote_path, StorageStrategy, TempArtifact, UploadReport};
use crate::config::DirectConfig;
use crate::data::{DataExtension, GroupedResult};
use crate::error::{Error, Result};
use crate::naming::NameGenerator;

/// Byte-buffer upload to an addressable object path.
pub trait BlobClient {
    fn upload_data(&self, path: &str, data: Vec<u8>, overwrite: bool) -> Result<()>;

    /// Human-readable location of `path`, for reports and logs.
    fn location(&self, path: &str) -> String {
        path.to_string()
    }
}

/// Google Cloud Storage bucket, authenticated with application default
/// credentials. Owns a small runtime so the async SDK can be driven from the
/// synchronous pipeline.
pub struct GcsBlobClient {
    runtime: Runtime,
    client: Client,
    bucket: String,
}

impl GcsBlobClient {
    pub fn connect(cfg: &DirectConfig) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::io("<tokio runtime>", e))?;
        let auth = runtime
            .block_on(ClientConfig::default().with_auth())
            .map_err(|e| Error::upload("gcs", format!("authenticating: {e}")))?;
        let config = ClientConfig {
            storage_endpoint: cfg.endpoint.trim_end_matches('/').to_string(),
            ..auth
        };
        info!(endpoint = %cfg.endpoint, bucket = %cfg.bucket, "connected to object store");
        Ok(Self {
            runtime,
            client: Client::new(config),
            bucket: cfg.bucket.clone(),
        })
    }
}

impl BlobClient for GcsBlobClient {
    fn upload_data(&self, path: &str, data: Vec<u8>, overwrite: bool) -> Result<()> {
        let upload_type = UploadType::Simple(Media::new(path.to_string()));
        let request = UploadObjectRequest {
            bucket: self.bucket.clone(),
            // generation 0 = only create if absent
            if_generation_match: (!overwrite).then_some(0),
            ..Default::default()
        };
        let size = data.len();

        self.runtime
            .block_on(self.client.upload_object(&request, data, &upload_type))
            .map_err(|e| Error::upload("gcs", format!("{}: {e}", self.location(path))))?;

        info!(object = %self.location(path), bytes = size, "uploaded");
        Ok(())
    }

    fn location(&self, path: &str) -> String {
        format!("gs://{}/{}", self.bucket, path)
    }
}

/// Writes the figure and the serialized aggregate straight to
/// `<prefix>/<folder>/<name>` without staging the data on disk.
pub struct DirectPathStore<C> {
    client: C,
    names: Arc<dyn NameGenerator>,
    prefix: Option<String>,
}

impl<C: BlobClient> DirectPathStore<C> {
    pub fn new(client: C, names: Arc<dyn NameGenerator>) -> Self {
        Self {
            client,
            names,
            prefix: None,
        }
    }

    pub fn with_prefix(mut self, prefix: Option<String>) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

impl<C: BlobClient> StorageStrategy for DirectPathStore<C> {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn upload(
        &self,
        grouped: &GroupedResult,
        ext: DataExtension,
        folder: &str,
        figure: &Path,
    ) -> Result<UploadReport> {
        // Removed when this returns, after both uploads or on the first error.
        let figure = TempArtifact::adopt(figure);
        let prefix = self.prefix.as_deref();

        let figure_path = remote_path(prefix, folder, &figure.file_name()?);
        let data_path = remote_path(prefix, folder, &format!("{}{}", self.names.next_name(), ext));

        self.client.upload_data(&figure_path, figure.read()?, true)?;
        self.client
            .upload_data(&data_path, grouped.to_bytes(ext)?, true)?;

        Ok(UploadReport {
            folder: folder.to_string(),
            objects: vec![
                self.client.location(&figure_path),
                self.client.location(&data_path),
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::SequentialNames;
    use crate::storage::tests::{grouped_mapping, grouped_table, leftover_files, write_figure};
    use std::cell::RefCell;
    use tempfile::tempdir;

    #[derive(Default)]
    struct MemoryBlobs {
        objects: RefCell<Vec<(String, Vec<u8>)>>,
        fail_on_call: Option<usize>,
        calls: RefCell<usize>,
    }

    impl BlobClient for MemoryBlobs {
        fn upload_data(&self, path: &str, data: Vec<u8>, _overwrite: bool) -> Result<()> {
            let call = {
                let mut calls = self.calls.borrow_mut();
                *calls += 1;
                *calls
            };
            if self.fail_on_call == Some(call) {
                return Err(Error::upload("memory", format!("refusing {path}")));
            }
            self.objects.borrow_mut().push((path.to_string(), data));
            Ok(())
        }

        fn location(&self, path: &str) -> String {
            format!("mem://{path}")
        }
    }

    fn store(client: MemoryBlobs) -> DirectPathStore<MemoryBlobs> {
        DirectPathStore::new(client, Arc::new(SequentialNames::new("data")))
    }

    #[test]
    fn mapping_uploads_json_and_figure() {
        let dir = tempdir().unwrap();
        let figure = write_figure(dir.path(), "chart.png");
        let store = store(MemoryBlobs::default()).with_prefix(Some("universities".into()));

        let grouped = grouped_mapping();
        let report = store
            .upload(&grouped, grouped.extension(), "run_0001", &figure)
            .unwrap();

        assert_eq!(
            report.objects,
            vec![
                "mem://universities/run_0001/chart.png".to_string(),
                "mem://universities/run_0001/data_0000.json".to_string(),
            ]
        );
        let objects = store.client().objects.borrow();
        assert_eq!(objects[0].1, b"\x89PNG fake");
        assert_eq!(objects[1].1, br#"{"usa":2,"uk":1}"#);
        assert!(leftover_files(dir.path()).is_empty());
    }

    #[test]
    fn table_uploads_csv() {
        let dir = tempdir().unwrap();
        let figure = write_figure(dir.path(), "chart.png");
        let store = store(MemoryBlobs::default());

        let grouped = grouped_table();
        assert_eq!(grouped.extension(), DataExtension::Csv);
        let report = store
            .upload(&grouped, grouped.extension(), "run", &figure)
            .unwrap();

        assert!(report.objects[1].ends_with("data_0000.csv"));
        let objects = store.client().objects.borrow();
        assert_eq!(objects[1].1, b"country,count\nusa,2\nuk,1\n");
        assert!(leftover_files(dir.path()).is_empty());
    }

    #[test]
    fn figure_is_removed_when_data_upload_fails() {
        let dir = tempdir().unwrap();
        let figure = write_figure(dir.path(), "chart.png");
        let store = store(MemoryBlobs {
            fail_on_call: Some(2),
            ..Default::default()
        });

        let err = store
            .upload(&grouped_mapping(), DataExtension::Json, "run", &figure)
            .unwrap_err();
        assert!(matches!(err, Error::Upload { backend: "memory", .. }));
        assert_eq!(store.client().objects.borrow().len(), 1);
        assert!(leftover_files(dir.path()).is_empty());
    }

    #[test]
    fn figure_is_removed_when_figure_upload_fails() {
        let dir = tempdir().unwrap();
        let figure = write_figure(dir.path(), "chart.png");
        let store = store(MemoryBlobs {
            fail_on_call: Some(1),
            ..Default::default()
        });

        assert!(store
            .upload(&grouped_table(), DataExtension::Csv, "run", &figure)
            .is_err());
        assert!(store.client().objects.borrow().is_empty());
        assert!(leftover_files(dir.path()).is_empty());
    }
}

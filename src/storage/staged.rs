// src/storage/staged.rs

use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::json;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::info;
use url::Url;

use super::{StorageStrategy, TempArtifact, UploadReport};
use crate::config::StagedConfig;
use crate::data::{DataExtension, GroupedResult};
use crate::error::{Error, Result};
use crate::naming::NameGenerator;

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const BOUNDARY: &str = "uniscraper-part-boundary";

/// Folder-addressed storage that uploads whole local files.
pub trait FolderClient {
    /// Create `name` under `parent_id`, returning the new folder's id.
    fn create_folder(&self, name: &str, parent_id: &str) -> Result<String>;

    /// Upload `local` into `folder_id`, returning the remote file id.
    fn upload_file(&self, folder_id: &str, local: &Path) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

/// Google Drive v3 over REST. The bearer token is provisioned outside this
/// program and passed in through config.
pub struct DriveFolderClient {
    http: Client,
    api_base: Url,
    access_token: Option<String>,
}

impl DriveFolderClient {
    pub fn new(cfg: &StagedConfig) -> Result<Self> {
        Self::with_client(cfg, Client::new())
    }

    pub fn with_client(cfg: &StagedConfig, http: Client) -> Result<Self> {
        // keep any path on the base when joining endpoint paths
        let base = format!("{}/", cfg.api_base.trim_end_matches('/'));
        let api_base = Url::parse(&base)
            .map_err(|e| Error::Config(format!("staged.api_base `{}`: {e}", cfg.api_base)))?;
        Ok(Self {
            http,
            api_base,
            access_token: cfg.access_token.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.api_base
            .join(path)
            .map_err(|e| Error::Config(format!("building drive url for {path}: {e}")))
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn send(&self, req: RequestBuilder, what: &str) -> Result<DriveFile> {
        self.authorized(req)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json::<DriveFile>())
            .map_err(|e| Error::upload("drive", format!("{what}: {e}")))
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("json") => "application/json",
        Some("csv") => "text/csv",
        _ => "application/octet-stream",
    }
}

/// `multipart/related` body: JSON metadata part, then the file content part.
fn multipart_related(metadata: &serde_json::Value, mime: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + 256);
    body.extend_from_slice(
        format!("--{BOUNDARY}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("--{BOUNDARY}\r\nContent-Type: {mime}\r\n\r\n").as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

impl FolderClient for DriveFolderClient {
    fn create_folder(&self, name: &str, parent_id: &str) -> Result<String> {
        let mut url = self.endpoint("drive/v3/files")?;
        url.query_pairs_mut().append_pair("fields", "id");
        let metadata = json!({
            "name": name,
            "mimeType": FOLDER_MIME,
            "parents": [parent_id],
        });
        let created = self.send(self.http.post(url).json(&metadata), "creating folder")?;
        info!(folder = name, id = %created.id, "created remote folder");
        Ok(created.id)
    }

    fn upload_file(&self, folder_id: &str, local: &Path) -> Result<String> {
        let name = local
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::upload("drive", format!("no file name in {}", local.display())))?;
        let content = fs::read(local).map_err(|e| Error::io(local, e))?;

        let mut url = self.endpoint("upload/drive/v3/files")?;
        url.query_pairs_mut()
            .append_pair("uploadType", "multipart")
            .append_pair("fields", "id");
        let metadata = json!({ "name": name, "parents": [folder_id] });
        let body = multipart_related(&metadata, mime_for(local), &content);

        let req = self
            .http
            .post(url)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={BOUNDARY}"),
            )
            .body(body);
        let uploaded = self.send(req, &format!("uploading {name}"))?;
        info!(file = name, id = %uploaded.id, bytes = content.len(), "uploaded");
        Ok(uploaded.id)
    }
}

/// Creates a remote folder, writes the aggregate to a local staging file,
/// then uploads both local files into the folder.
pub struct StagedFolderStore<C> {
    client: C,
    names: Arc<dyn NameGenerator>,
    parent_id: String,
    staging_dir: PathBuf,
}

impl<C: FolderClient> StagedFolderStore<C> {
    pub fn new(
        client: C,
        names: Arc<dyn NameGenerator>,
        parent_id: impl Into<String>,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            names,
            parent_id: parent_id.into(),
            staging_dir: staging_dir.into(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

impl<C: FolderClient> StorageStrategy for StagedFolderStore<C> {
    fn name(&self) -> &'static str {
        "staged"
    }

    fn upload(
        &self,
        grouped: &GroupedResult,
        ext: DataExtension,
        folder: &str,
        figure: &Path,
    ) -> Result<UploadReport> {
        let figure = TempArtifact::adopt(figure);
        let folder_id = self.client.create_folder(folder, &self.parent_id)?;

        fs::create_dir_all(&self.staging_dir).map_err(|e| Error::io(&self.staging_dir, e))?;
        let data = TempArtifact::adopt(
            self.staging_dir
                .join(format!("{}{}", self.names.next_name(), ext)),
        );
        fs::write(data.path(), grouped.to_bytes(ext)?).map_err(|e| Error::io(data.path(), e))?;

        let mut objects = Vec::with_capacity(2);
        for file in [&figure, &data] {
            objects.push(self.client.upload_file(&folder_id, file.path())?);
        }

        Ok(UploadReport {
            folder: folder_id,
            objects,
        })
    }
}

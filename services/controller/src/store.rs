//! File-backed document store.
//!
//! Each document is one JSON file at `<root>/<namespace>/<name>.json`.
//! Writes go to a temp file that is renamed into place, so readers (node
//! agents tailing the file) never observe a partial body.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;
use tsync_reconcile::{DocumentKey, DocumentStore, PublishedDocument, StoreError};

/// Stored file format version.
const STORE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredDocument {
    version: u32,
    namespace: String,
    name: String,
    revision: u64,
    updated_at: DateTime<Utc>,
    data: BTreeMap<String, String>,
}

impl StoredDocument {
    fn into_published(self) -> PublishedDocument {
        PublishedDocument {
            key: DocumentKey::new(self.namespace, self.name),
            data: self.data,
            revision: self.revision,
        }
    }
}

/// Document store rooted at a directory.
#[derive(Debug)]
pub struct FileDocumentStore {
    root: PathBuf,
    // Serializes read-check-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the file holding `key`.
    pub fn path_for(&self, key: &DocumentKey) -> PathBuf {
        self.root
            .join(&key.namespace)
            .join(format!("{}.json", key.name))
    }

    async fn load(&self, key: &DocumentKey) -> Result<Option<StoredDocument>, StoreError> {
        let path = self.path_for(key);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(unavailable(&path, e)),
        };

        let stored: StoredDocument = serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
            key: key.clone(),
            message: e.to_string(),
        })?;

        if stored.version != STORE_VERSION {
            return Err(StoreError::Corrupt {
                key: key.clone(),
                message: format!(
                    "unsupported format version {} (expected {STORE_VERSION})",
                    stored.version
                ),
            });
        }

        Ok(Some(stored))
    }

    async fn save(&self, document: &PublishedDocument) -> Result<(), StoreError> {
        let path = self.path_for(&document.key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| unavailable(parent, e))?;
        }

        let stored = StoredDocument {
            version: STORE_VERSION,
            namespace: document.key.namespace.clone(),
            name: document.key.name.clone(),
            revision: document.revision,
            updated_at: Utc::now(),
            data: document.data.clone(),
        };
        let content = serde_json::to_string_pretty(&stored).map_err(|e| StoreError::Corrupt {
            key: document.key.clone(),
            message: e.to_string(),
        })?;

        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, content)
            .await
            .map_err(|e| unavailable(&tmp_path, e))?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(unavailable(&path, e));
        }

        debug!(
            path = %path.display(),
            revision = document.revision,
            entries = document.data.len(),
            "Saved document to disk"
        );
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn get(&self, key: &DocumentKey) -> Result<Option<PublishedDocument>, StoreError> {
        Ok(self.load(key).await?.map(StoredDocument::into_published))
    }

    async fn create(&self, mut document: PublishedDocument) -> Result<PublishedDocument, StoreError> {
        let _guard = self.write_lock.lock().await;
        if self.load(&document.key).await?.is_some() {
            return Err(StoreError::AlreadyExists(document.key));
        }
        document.revision = 1;
        self.save(&document).await?;
        Ok(document)
    }

    async fn update(&self, mut document: PublishedDocument) -> Result<PublishedDocument, StoreError> {
        let _guard = self.write_lock.lock().await;
        let Some(current) = self.load(&document.key).await? else {
            return Err(StoreError::NotFound(document.key));
        };
        if current.revision != document.revision {
            return Err(StoreError::Conflict {
                key: document.key,
                expected: document.revision,
                actual: current.revision,
            });
        }
        document.revision += 1;
        self.save(&document).await?;
        Ok(document)
    }
}

fn unavailable(path: &Path, err: std::io::Error) -> StoreError {
    StoreError::Unavailable(format!("{}: {err}", path.display()))
}

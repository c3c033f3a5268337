//! Publishing the per-node mapping into the shared document.
//!
//! The publisher does a read-modify-write against a single key. A missing
//! document is created; an existing one has its whole body replaced, which
//! is what drops entries for nodes that left the cluster.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::error::StoreError;
use crate::model::{DocumentKey, PublishedDocument};

/// Storage for published documents.
///
/// Implementations assign revisions: `create` returns revision 1, every
/// successful `update` increments it, and `update` must reject a document
/// whose revision does not match the stored one.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, key: &DocumentKey) -> Result<Option<PublishedDocument>, StoreError>;

    async fn create(&self, document: PublishedDocument) -> Result<PublishedDocument, StoreError>;

    async fn update(&self, document: PublishedDocument) -> Result<PublishedDocument, StoreError>;
}

/// What a publish did to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The document did not exist and was created.
    Created { revision: u64 },

    /// The body was replaced.
    Replaced {
        revision: u64,
        added: usize,
        removed: usize,
    },

    /// The stored body already matched, nothing was written.
    Unchanged { revision: u64 },
}

impl PublishOutcome {
    /// Returns true if the store was written.
    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Unchanged { .. })
    }

    pub fn revision(&self) -> u64 {
        match self {
            Self::Created { revision }
            | Self::Replaced { revision, .. }
            | Self::Unchanged { revision } => *revision,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Replaced { .. } => "replaced",
            Self::Unchanged { .. } => "unchanged",
        }
    }
}

/// Writes document bodies under one fixed key.
#[derive(Clone)]
pub struct Publisher {
    store: Arc<dyn DocumentStore>,
    key: DocumentKey,
}

impl Publisher {
    pub fn new(store: Arc<dyn DocumentStore>, key: DocumentKey) -> Self {
        Self { store, key }
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    /// Make `data` the entire body of the document.
    #[instrument(skip(self, data), fields(document = %self.key, entries = data.len()))]
    pub async fn publish(&self, data: BTreeMap<String, String>) -> Result<PublishOutcome, StoreError> {
        let Some(mut existing) = self.store.get(&self.key).await? else {
            info!("Published document not found, creating");
            let created = self
                .store
                .create(PublishedDocument::new(self.key.clone(), data))
                .await?;
            return Ok(PublishOutcome::Created {
                revision: created.revision,
            });
        };

        if existing.data == data {
            debug!(revision = existing.revision, "Published document already up to date");
            return Ok(PublishOutcome::Unchanged {
                revision: existing.revision,
            });
        }

        let removed = existing.data.keys().filter(|k| !data.contains_key(*k)).count();
        let added = data.keys().filter(|k| !existing.data.contains_key(*k)).count();

        existing.data = data;
        let updated = self.store.update(existing).await?;

        info!(
            revision = updated.revision,
            added, removed, "Published document exists, replaced body"
        );

        Ok(PublishOutcome::Replaced {
            revision: updated.revision,
            added,
            removed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocumentStore;

    fn body(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_creates_when_absent() {
        let store = Arc::new(MemoryDocumentStore::new());
        let publisher = Publisher::new(store.clone(), DocumentKey::default());

        let outcome = publisher.publish(body(&[("n1", "[]")])).await.unwrap();
        assert_eq!(outcome, PublishOutcome::Created { revision: 1 });

        let doc = store.document(&DocumentKey::default()).unwrap();
        assert_eq!(doc.data, body(&[("n1", "[]")]));
    }

    #[tokio::test]
    async fn test_replaces_whole_body() {
        let key = DocumentKey::default();
        let store = Arc::new(MemoryDocumentStore::with_document(PublishedDocument::new(
            key.clone(),
            body(&[("a", "X"), ("b", "Y")]),
        )));
        let publisher = Publisher::new(store.clone(), key.clone());

        let outcome = publisher
            .publish(body(&[("b", "Y2"), ("c", "Z")]))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            PublishOutcome::Replaced {
                revision: 2,
                added: 1,
                removed: 1
            }
        );
        assert_eq!(
            store.document(&key).unwrap().data,
            body(&[("b", "Y2"), ("c", "Z")])
        );
    }

    #[tokio::test]
    async fn test_identical_body_is_not_written() {
        let key = DocumentKey::default();
        let store = Arc::new(MemoryDocumentStore::with_document(PublishedDocument::new(
            key.clone(),
            body(&[("n1", "[]")]),
        )));
        let publisher = Publisher::new(store.clone(), key);

        let outcome = publisher.publish(body(&[("n1", "[]")])).await.unwrap();
        assert!(!outcome.is_write());
        assert_eq!(store.write_count(), 0);
    }
}

//! In-memory collaborators.
//!
//! Used by tests and by dry runs that should never touch a real store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};

use async_trait::async_trait;

use crate::error::{FetchError, StoreError};
use crate::model::{DocumentKey, Node, ProfileDeclaration, PublishedDocument};
use crate::publish::DocumentStore;
use crate::source::{DeclarationSource, NodeSource};

/// Declarations held in memory; replaceable between passes.
#[derive(Debug, Default)]
pub struct StaticDeclarations {
    items: RwLock<Vec<ProfileDeclaration>>,
}

impl StaticDeclarations {
    pub fn new(items: Vec<ProfileDeclaration>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    pub fn replace(&self, items: Vec<ProfileDeclaration>) {
        *self.items.write().unwrap_or_else(|e| e.into_inner()) = items;
    }
}

#[async_trait]
impl DeclarationSource for StaticDeclarations {
    async fn list_declarations(&self) -> Result<Vec<ProfileDeclaration>, FetchError> {
        Ok(self.items.read().unwrap_or_else(|e| e.into_inner()).clone())
    }
}

/// Nodes held in memory; replaceable between passes.
#[derive(Debug, Default)]
pub struct StaticNodes {
    items: RwLock<Vec<Node>>,
}

impl StaticNodes {
    pub fn new(items: Vec<Node>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    pub fn replace(&self, items: Vec<Node>) {
        *self.items.write().unwrap_or_else(|e| e.into_inner()) = items;
    }
}

#[async_trait]
impl NodeSource for StaticNodes {
    async fn list_nodes(&self) -> Result<Vec<Node>, FetchError> {
        Ok(self.items.read().unwrap_or_else(|e| e.into_inner()).clone())
    }
}

/// Revision-checked document store backed by a map.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<BTreeMap<DocumentKey, PublishedDocument>>,
    writes: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an existing document at revision 1.
    pub fn with_document(mut document: PublishedDocument) -> Self {
        document.revision = document.revision.max(1);
        let store = Self::new();
        store.lock().insert(document.key.clone(), document);
        store
    }

    /// Snapshot of a stored document.
    pub fn document(&self, key: &DocumentKey) -> Option<PublishedDocument> {
        self.lock().get(key).cloned()
    }

    /// Number of successful creates and updates.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<DocumentKey, PublishedDocument>> {
        self.documents.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, key: &DocumentKey) -> Result<Option<PublishedDocument>, StoreError> {
        Ok(self.document(key))
    }

    async fn create(&self, mut document: PublishedDocument) -> Result<PublishedDocument, StoreError> {
        let mut documents = self.lock();
        if documents.contains_key(&document.key) {
            return Err(StoreError::AlreadyExists(document.key));
        }
        document.revision = 1;
        documents.insert(document.key.clone(), document.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(document)
    }

    async fn update(&self, mut document: PublishedDocument) -> Result<PublishedDocument, StoreError> {
        let mut documents = self.lock();
        let Some(current) = documents.get_mut(&document.key) else {
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
        *current = document.clone();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(document)
    }
}

//! Test fixtures shared by tsync integration tests.
//!
//! Builders for nodes and declarations, plus collaborators that fail on
//! demand so error paths can be exercised without a real cluster.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tsync_reconcile::memory::MemoryDocumentStore;
use tsync_reconcile::{
    DeclarationSource, DocumentKey, DocumentStore, FetchError, JsonEncoder, Node,
    NodeRecommendation, NodeSelector, NodeSource, ProfileDeclaration, PublishedDocument,
    RecommendationEncoder, SerializationError, StoreError,
};

/// A node with no labels.
///
/// Panics on an invalid name; fixtures only use literal names.
pub fn node(name: &str) -> Node {
    Node::new(name.parse().expect("fixture node name"))
}

/// A node with the given labels.
pub fn labeled_node(name: &str, labels: &[(&str, &str)]) -> Node {
    labels
        .iter()
        .fold(node(name), |n, (k, v)| n.with_label(*k, *v))
}

/// A declaration whose payload is its own name as a JSON string.
pub fn declaration(name: &str, selector: NodeSelector, priority: Option<u32>) -> ProfileDeclaration {
    let mut d = ProfileDeclaration::new(
        name.parse().expect("fixture profile name"),
        selector,
        serde_json::Value::String(name.to_string()),
    );
    d.priority = priority;
    d
}

/// Selector for an explicit list of node names.
pub fn names(nodes: &[&str]) -> NodeSelector {
    NodeSelector::node_names(nodes.iter().map(|n| n.parse().expect("fixture node name")))
}

/// Document body from literal pairs.
pub fn body(pairs: &[(&str, &str)]) -> std::collections::BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// A memory store already holding `pairs` under the default key.
pub fn seeded_store(pairs: &[(&str, &str)]) -> Arc<MemoryDocumentStore> {
    Arc::new(MemoryDocumentStore::with_document(PublishedDocument::new(
        DocumentKey::default(),
        body(pairs),
    )))
}

/// Source whose listings always fail.
#[derive(Debug, Default)]
pub struct FailingSource;

#[async_trait]
impl DeclarationSource for FailingSource {
    async fn list_declarations(&self) -> Result<Vec<ProfileDeclaration>, FetchError> {
        Err(FetchError::Declarations("injected failure".to_string()))
    }
}

#[async_trait]
impl NodeSource for FailingSource {
    async fn list_nodes(&self) -> Result<Vec<Node>, FetchError> {
        Err(FetchError::Nodes("injected failure".to_string()))
    }
}

/// JSON encoder that refuses to encode a chosen set of nodes.
#[derive(Debug, Default)]
pub struct FailingEncoder {
    fail_for: BTreeSet<String>,
    inner: JsonEncoder,
}

impl FailingEncoder {
    pub fn failing_for(nodes: &[&str]) -> Self {
        Self {
            fail_for: nodes.iter().map(|n| n.to_string()).collect(),
            inner: JsonEncoder::default(),
        }
    }
}

impl RecommendationEncoder for FailingEncoder {
    fn encode(
        &self,
        node: &Node,
        recommendation: &NodeRecommendation<'_>,
    ) -> Result<String, SerializationError> {
        if self.fail_for.contains(node.name.as_str()) {
            return Err(SerializationError::Encode {
                node: node.name.clone(),
                message: "injected failure".to_string(),
            });
        }
        self.inner.encode(node, recommendation)
    }
}

/// Wraps a store and fails selected operations while counting calls.
#[derive(Debug)]
pub struct FlakyStore<S> {
    inner: S,
    fail_get: AtomicBool,
    fail_writes: AtomicBool,
    calls: AtomicUsize,
}

impl<S> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_get: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn set_fail_get(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Total get, create and update calls seen.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self, flag: &AtomicBool, op: &str) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("injected {op} failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: DocumentStore> DocumentStore for FlakyStore<S> {
    async fn get(&self, key: &DocumentKey) -> Result<Option<PublishedDocument>, StoreError> {
        self.check(&self.fail_get, "get")?;
        self.inner.get(key).await
    }

    async fn create(&self, document: PublishedDocument) -> Result<PublishedDocument, StoreError> {
        self.check(&self.fail_writes, "create")?;
        self.inner.create(document).await
    }

    async fn update(&self, document: PublishedDocument) -> Result<PublishedDocument, StoreError> {
        self.check(&self.fail_writes, "update")?;
        self.inner.update(document).await
    }
}

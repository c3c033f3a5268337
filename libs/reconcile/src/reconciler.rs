//! A full pass: read both sources, then synchronize.

use std::sync::Arc;

use tracing::{info, info_span, warn, Instrument};
use tsync_id::PassId;

use crate::error::SyncError;
use crate::source::{DeclarationSource, NodeSource};
use crate::sync::{SyncOutcome, Synchronizer};

/// Re-reads declarations and nodes on every call and publishes the result.
///
/// Holds no state between passes.
#[derive(Clone)]
pub struct Reconciler {
    declarations: Arc<dyn DeclarationSource>,
    nodes: Arc<dyn NodeSource>,
    synchronizer: Synchronizer,
}

impl Reconciler {
    pub fn new(
        declarations: Arc<dyn DeclarationSource>,
        nodes: Arc<dyn NodeSource>,
        synchronizer: Synchronizer,
    ) -> Self {
        Self {
            declarations,
            nodes,
            synchronizer,
        }
    }

    /// Run one pass.
    pub async fn reconcile(&self) -> Result<SyncOutcome, SyncError> {
        let pass_id = PassId::new();
        let span = info_span!("reconcile", pass_id = %pass_id);

        async {
            info!("Reconciling node profiles");

            let declarations = self.declarations.list_declarations().await.map_err(|e| {
                warn!(error = %e, "Failed to list profile declarations");
                e
            })?;

            let nodes = self.nodes.list_nodes().await.map_err(|e| {
                warn!(error = %e, "Failed to list nodes");
                e
            })?;

            self.synchronizer.synchronize(&declarations, &nodes).await
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryDocumentStore, StaticDeclarations, StaticNodes};
    use crate::model::{DocumentKey, Node, ProfileDeclaration};
    use crate::publish::Publisher;
    use crate::selector::NodeSelector;

    #[tokio::test]
    async fn test_reconcile_rereads_sources_each_pass() {
        let declarations = Arc::new(StaticDeclarations::new(vec![ProfileDeclaration::new(
            "default".parse().unwrap(),
            NodeSelector::All,
            serde_json::json!("P0"),
        )]));
        let nodes = Arc::new(StaticNodes::new(vec![Node::new("n1".parse().unwrap())]));
        let store = Arc::new(MemoryDocumentStore::new());

        let reconciler = Reconciler::new(
            declarations.clone(),
            nodes.clone(),
            Synchronizer::new(Publisher::new(store.clone(), DocumentKey::default())),
        );

        reconciler.reconcile().await.unwrap();
        nodes.replace(vec![Node::new("n2".parse().unwrap())]);
        let outcome = reconciler.reconcile().await.unwrap();
        assert!(outcome.updated);

        let doc = store.document(&DocumentKey::default()).unwrap();
        let keys: Vec<_> = doc.data.keys().cloned().collect();
        assert_eq!(keys, vec!["n2".to_string()]);
    }
}

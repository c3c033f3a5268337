//! One synchronization pass over a given snapshot.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::digest::ContentDigest;
use crate::encode::{JsonEncoder, RecommendationEncoder};
use crate::error::{FetchError, SyncError};
use crate::model::{Node, ProfileDeclaration};
use crate::publish::{PublishOutcome, Publisher};
use crate::recommend::{recommend, validate_declarations};

/// Result of a successful pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// The document was created or its body changed.
    pub updated: bool,
    pub publish: PublishOutcome,
    pub nodes: usize,
    pub digest: ContentDigest,
}

/// Computes every node's recommendation and publishes the result.
#[derive(Clone)]
pub struct Synchronizer {
    publisher: Publisher,
    encoder: Arc<dyn RecommendationEncoder>,
}

impl Synchronizer {
    /// Create a synchronizer using the JSON encoder.
    pub fn new(publisher: Publisher) -> Self {
        Self::with_encoder(publisher, Arc::new(JsonEncoder::default()))
    }

    pub fn with_encoder(publisher: Publisher, encoder: Arc<dyn RecommendationEncoder>) -> Self {
        Self { publisher, encoder }
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    /// Run one pass. Nothing is written unless every node rendered.
    #[instrument(skip_all, fields(
        document = %self.publisher.key(),
        declarations = declarations.len(),
        nodes = nodes.len()
    ))]
    pub async fn synchronize(
        &self,
        declarations: &[ProfileDeclaration],
        nodes: &[Node],
    ) -> Result<SyncOutcome, SyncError> {
        let data = render_document(declarations, nodes, self.encoder.as_ref())?;
        let digest = ContentDigest::of_entries(&data);

        let publish = self.publisher.publish(data).await?;

        info!(
            outcome = publish.as_str(),
            revision = publish.revision(),
            digest = %digest,
            "Synchronized node profiles"
        );

        Ok(SyncOutcome {
            updated: publish.is_write(),
            publish,
            nodes: nodes.len(),
            digest,
        })
    }
}

/// Render the full document body for a snapshot without touching a store.
///
/// The returned keys are exactly the node names in `nodes`.
pub fn render_document(
    declarations: &[ProfileDeclaration],
    nodes: &[Node],
    encoder: &dyn RecommendationEncoder,
) -> Result<BTreeMap<String, String>, SyncError> {
    validate_declarations(declarations)?;

    let mut data = BTreeMap::new();
    for node in nodes {
        let recommendation = recommend(declarations, node)?;
        debug!(
            node = %node.name,
            profiles = ?recommendation.names(),
            "Recommended profiles for node"
        );

        let encoded = encoder.encode(node, &recommendation)?;
        if data.insert(node.name.to_string(), encoded).is_some() {
            return Err(FetchError::DuplicateNode(node.name.clone()).into());
        }
    }

    Ok(data)
}

//! Encoding of recommendations into document entries.

use crate::error::SerializationError;
use crate::model::Node;
use crate::recommend::NodeRecommendation;

/// Default per-entry size limit (1 MiB).
pub const DEFAULT_MAX_ENTRY_BYTES: usize = 1024 * 1024;

/// Turns one node's recommendation into the string stored under its name.
pub trait RecommendationEncoder: Send + Sync {
    fn encode(
        &self,
        node: &Node,
        recommendation: &NodeRecommendation<'_>,
    ) -> Result<String, SerializationError>;
}

/// Encodes a recommendation as a JSON array of profile payloads.
///
/// An empty recommendation encodes as `[]`, so every node has an entry.
#[derive(Debug, Clone)]
pub struct JsonEncoder {
    max_entry_bytes: usize,
}

impl JsonEncoder {
    pub fn new(max_entry_bytes: usize) -> Self {
        Self { max_entry_bytes }
    }
}

impl Default for JsonEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRY_BYTES)
    }
}

impl RecommendationEncoder for JsonEncoder {
    fn encode(
        &self,
        node: &Node,
        recommendation: &NodeRecommendation<'_>,
    ) -> Result<String, SerializationError> {
        let payloads: Vec<&serde_json::Value> =
            recommendation.iter().map(|d| &d.profile).collect();

        let encoded =
            serde_json::to_string(&payloads).map_err(|e| SerializationError::Encode {
                node: node.name.clone(),
                message: e.to_string(),
            })?;

        if encoded.len() > self.max_entry_bytes {
            return Err(SerializationError::EntryTooLarge {
                node: node.name.clone(),
                size: encoded.len(),
                limit: self.max_entry_bytes,
            });
        }

        Ok(encoded)
    }
}

//! Content digests of published document bodies.

use std::collections::BTreeMap;
use std::fmt;

use sha2::{Digest, Sha256};

/// Digest of a document body, stable across processes.
///
/// Used to correlate log lines with the body a pass published.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Digest of a `node -> entry` mapping. Keys are visited in sorted order.
    pub fn of_entries(data: &BTreeMap<String, String>) -> Self {
        let mut hasher = Sha256::new();
        for (key, value) in data {
            hasher.update((key.len() as u64).to_be_bytes());
            hasher.update(key.as_bytes());
            hasher.update((value.len() as u64).to_be_bytes());
            hasher.update(value.as_bytes());
        }
        let result = hasher.finalize();
        Self(format!("sha256:{}", hex::encode(&result[..16]))) // First 16 bytes (128 bits)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

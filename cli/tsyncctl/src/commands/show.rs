//! Inspect a published document.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;
use tsync_controller::FileDocumentStore;
use tsync_reconcile::{
    DocumentKey, DocumentStore, PublishedDocument, SyncError, DEFAULT_DOCUMENT_NAME,
    DEFAULT_NAMESPACE,
};

use crate::error::CliError;
use crate::output::{print_info, print_output, print_single, OutputFormat};

use super::CommandContext;

/// Show command.
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Root directory of the document store.
    #[arg(long, env = "TSYNC_STATE_DIR", default_value = "/var/lib/tsync")]
    state_dir: PathBuf,

    /// Document namespace.
    #[arg(long, env = "TSYNC_DOCUMENT_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    namespace: String,

    /// Document name.
    #[arg(long, env = "TSYNC_DOCUMENT_NAME", default_value = DEFAULT_DOCUMENT_NAME)]
    name: String,

    /// Print only this node's decoded entry.
    #[arg(long)]
    node: Option<String>,
}

#[derive(Debug, Tabled)]
struct EntrySummary {
    #[tabled(rename = "Node")]
    node: String,

    #[tabled(rename = "Profiles")]
    profiles: String,

    #[tabled(rename = "Bytes")]
    bytes: usize,
}

#[derive(Debug, Serialize)]
struct DocumentView<'a> {
    namespace: &'a str,
    name: &'a str,
    revision: u64,
    data: &'a std::collections::BTreeMap<String, String>,
}

impl ShowCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let key = DocumentKey::new(self.namespace, self.name);
        let document = FileDocumentStore::new(&self.state_dir)
            .get(&key)
            .await
            .map_err(|e| CliError::Sync(SyncError::Store(e)))?
            .ok_or_else(|| CliError::DocumentNotFound(key.to_string()))?;

        if let Some(node) = self.node.as_deref() {
            print_single(&decode_entry(&document, node)?);
            return Ok(());
        }

        let rows = summarize(&document);
        let view = DocumentView {
            namespace: &document.key.namespace,
            name: &document.key.name,
            revision: document.revision,
            data: &document.data,
        };
        print_output(&rows, &view, ctx.format);
        if ctx.format == OutputFormat::Table {
            print_info(&format!("{} at revision {}", document.key, document.revision));
        }
        Ok(())
    }
}

fn decode_entry(document: &PublishedDocument, node: &str) -> Result<serde_json::Value, CliError> {
    let entry = document
        .entry(node)
        .ok_or_else(|| CliError::NodeNotFound(node.to_string()))?;

    serde_json::from_str(entry).map_err(|e| CliError::UndecodableEntry {
        node: node.to_string(),
        message: e.to_string(),
    })
}

fn summarize(document: &PublishedDocument) -> Vec<EntrySummary> {
    document
        .data
        .iter()
        .map(|(node, entry)| {
            let profiles = match serde_json::from_str::<serde_json::Value>(entry) {
                Ok(serde_json::Value::Array(items)) => items.len().to_string(),
                _ => "-".to_string(),
            };
            EntrySummary {
                node: node.clone(),
                profiles,
                bytes: entry.len(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsync_testing::body;

    fn document() -> PublishedDocument {
        PublishedDocument::new(
            DocumentKey::default(),
            body(&[("n1", r#"[{"interface":"ens1f0"},"P1"]"#), ("n2", "[]"), ("n3", "junk")]),
        )
    }

    #[test]
    fn decode_entry_returns_payloads() {
        let doc = document();
        assert_eq!(
            decode_entry(&doc, "n1").unwrap(),
            serde_json::json!([{ "interface": "ens1f0" }, "P1"])
        );
        assert!(matches!(
            decode_entry(&doc, "missing"),
            Err(CliError::NodeNotFound(_))
        ));
        assert!(matches!(
            decode_entry(&doc, "n3"),
            Err(CliError::UndecodableEntry { .. })
        ));
    }

    #[test]
    fn summary_counts_profiles() {
        let rows = summarize(&document());
        let counts: Vec<_> = rows.iter().map(|r| r.profiles.as_str()).collect();
        assert_eq!(counts, vec!["2", "0", "-"]);
        assert_eq!(rows[1].bytes, 2);
    }
}

//! Render the document body without publishing it.

use std::collections::BTreeMap;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;
use tsync_reconcile::{render_document, ContentDigest, JsonEncoder, DEFAULT_MAX_ENTRY_BYTES};

use crate::error::CliError;
use crate::output::{print_info, print_output, OutputFormat};

use super::{CommandContext, InputArgs};

/// Render command.
#[derive(Debug, Args)]
pub struct RenderCommand {
    #[command(flatten)]
    input: InputArgs,

    /// Largest encoded entry accepted for a single node.
    #[arg(long, env = "TSYNC_MAX_ENTRY_BYTES", default_value_t = DEFAULT_MAX_ENTRY_BYTES)]
    max_entry_bytes: usize,
}

#[derive(Debug, Serialize)]
struct RenderedDocument {
    digest: String,
    data: BTreeMap<String, String>,
}

#[derive(Debug, Tabled)]
struct EntryRow {
    #[tabled(rename = "Node")]
    node: String,

    #[tabled(rename = "Entry")]
    entry: String,
}

impl RenderCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let (declarations, nodes) = self.input.load().await?;
        let encoder = JsonEncoder::new(self.max_entry_bytes);
        let data = render_document(&declarations, &nodes, &encoder).map_err(CliError::from)?;

        let rendered = RenderedDocument {
            digest: ContentDigest::of_entries(&data).to_string(),
            data,
        };
        let rows: Vec<EntryRow> = rendered
            .data
            .iter()
            .map(|(node, entry)| EntryRow {
                node: node.clone(),
                entry: entry.clone(),
            })
            .collect();

        print_output(&rows, &rendered, ctx.format);
        if ctx.format == OutputFormat::Table {
            print_info(&format!("Digest {}", rendered.digest));
        }
        Ok(())
    }
}

//! CLI commands.

mod recommend;
mod render;
mod show;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tsync_controller::{FileDeclarationSource, FileNodeSource};
use tsync_reconcile::{DeclarationSource, Node, NodeSource, ProfileDeclaration};

use crate::output::OutputFormat;

/// tsyncctl - inspect time-synchronization profile distribution.
#[derive(Debug, Parser)]
#[command(name = "tsyncctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show which profiles each node would receive.
    Recommend(recommend::RecommendCommand),

    /// Print the document body a pass would publish.
    Render(render::RenderCommand),

    /// Show a published document or one node's entry.
    Show(show::ShowCommand),
}

impl Cli {
    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        let ctx = CommandContext {
            format: self.format,
        };

        match self.command {
            Commands::Recommend(cmd) => cmd.run(ctx).await,
            Commands::Render(cmd) => cmd.run(ctx).await,
            Commands::Show(cmd) => cmd.run(ctx).await,
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub format: OutputFormat,
}

/// Local declaration and node inputs, in the controller's file formats.
#[derive(Debug, Args)]
pub struct InputArgs {
    /// Directory of declaration files.
    #[arg(long, env = "TSYNC_DECLARATIONS_DIR", default_value = "/etc/tsync/declarations")]
    declarations: PathBuf,

    /// Node listing file.
    #[arg(long, env = "TSYNC_NODES_FILE", default_value = "/etc/tsync/nodes.json")]
    nodes: PathBuf,
}

impl InputArgs {
    /// Read both inputs once.
    pub async fn load(&self) -> Result<(Vec<ProfileDeclaration>, Vec<Node>)> {
        let declarations = FileDeclarationSource::new(&self.declarations)
            .list_declarations()
            .await
            .with_context(|| format!("Failed to read {}", self.declarations.display()))?;

        let nodes = FileNodeSource::new(&self.nodes)
            .list_nodes()
            .await
            .with_context(|| format!("Failed to read {}", self.nodes.display()))?;

        Ok((declarations, nodes))
    }
}

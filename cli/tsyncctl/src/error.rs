//! Error handling and display for the CLI.

use colored::Colorize;
use thiserror::Error;
use tsync_reconcile::SyncError;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Entry for node {node} is not valid JSON: {message}")]
    UndecodableEntry { node: String, message: String },

    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    let Some(cli_err) = err.downcast_ref::<CliError>() else {
        return;
    };

    match cli_err {
        CliError::DocumentNotFound(_) => {
            eprintln!(
                "\n{}",
                "Hint: The controller has not published yet, or --state-dir points elsewhere."
                    .yellow()
            );
        }
        CliError::Sync(SyncError::Configuration(_)) => {
            eprintln!(
                "\n{}",
                "Hint: Fix the declaration files; the controller rejects this set too.".yellow()
            );
        }
        CliError::Sync(SyncError::Serialization(_)) => {
            eprintln!(
                "\n{}",
                "Hint: Raise --max-entry-bytes or shrink the profile payloads.".yellow()
            );
        }
        _ => {}
    }
}

//! tsync controller
//!
//! Publishes per-node time-synchronization profiles from operator-authored
//! declarations. Declarations and nodes are read from files, and the result
//! is written as one document per cluster under the state directory.
//!
//! ## Architecture
//!
//! - **Sources**: declaration directory and node listing file ([`files`])
//! - **Store**: one JSON document per key, written atomically ([`store`])
//! - **Worker**: startup, triggered and periodic passes with requeue
//!   backoff ([`worker`])

use std::sync::Arc;

use tsync_reconcile::{JsonEncoder, Publisher, Reconciler, Synchronizer};

pub mod backoff;
pub mod config;
pub mod files;
pub mod store;
pub mod worker;

pub use backoff::RequeueBackoff;
pub use config::Config;
pub use files::{FileDeclarationSource, FileNodeSource};
pub use store::FileDocumentStore;
pub use worker::{SyncWorker, TriggerHandle};

/// Wire the file-backed sources and store into a reconciler.
pub fn build_reconciler(config: &Config) -> Reconciler {
    let store = Arc::new(FileDocumentStore::new(&config.state_dir));
    let publisher = Publisher::new(store, config.document.clone());
    let encoder = Arc::new(JsonEncoder::new(config.max_entry_bytes));

    Reconciler::new(
        Arc::new(FileDeclarationSource::new(&config.declarations_dir)),
        Arc::new(FileNodeSource::new(&config.nodes_file)),
        Synchronizer::with_encoder(publisher, encoder),
    )
}

/// Build the worker described by `config`.
pub fn build_worker(config: &Config) -> SyncWorker {
    SyncWorker::new(
        build_reconciler(config),
        config.resync_interval,
        RequeueBackoff::new(config.backoff_base, config.backoff_max),
    )
}

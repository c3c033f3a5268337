//! Passes against the file-backed sources and store.

use std::path::Path;
use std::time::Duration;

use rstest::rstest;
use serde_json::Value;
use tempfile::TempDir;
use tsync_controller::{build_worker, Config, FileDocumentStore};
use tsync_reconcile::{DocumentKey, DocumentStore, PublishOutcome, SyncError};

struct Cluster {
    _dir: TempDir,
    config: Config,
}

impl Cluster {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        std::fs::create_dir_all(root.join("declarations")).unwrap();

        let config = Config::from_vars(|key| match key {
            "TSYNC_DECLARATIONS_DIR" => Some(root.join("declarations").display().to_string()),
            "TSYNC_NODES_FILE" => Some(root.join("nodes.json").display().to_string()),
            "TSYNC_STATE_DIR" => Some(root.join("state").display().to_string()),
            _ => None,
        })
        .unwrap();

        Self { _dir: dir, config }
    }

    fn write_declarations(&self, file: &str, content: &str) {
        std::fs::write(self.config.declarations_dir.join(file), content).unwrap();
    }

    fn write_nodes(&self, nodes: &[&str]) {
        let listing = serde_json::json!({
            "nodes": nodes.iter().map(|n| serde_json::json!({ "name": n })).collect::<Vec<_>>()
        });
        std::fs::write(&self.config.nodes_file, listing.to_string()).unwrap();
    }

    fn document_path(&self) -> std::path::PathBuf {
        FileDocumentStore::new(&self.config.state_dir).path_for(&DocumentKey::default())
    }

    async fn document(&self) -> Option<tsync_reconcile::PublishedDocument> {
        FileDocumentStore::new(&self.config.state_dir)
            .get(&DocumentKey::default())
            .await
            .unwrap()
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

const DEFAULT_DECLARATION: &str = r#"
[[declarations]]
name = "default"
priority = 0
selector = { type = "all" }
profile = "P0"
"#;

#[tokio::test]
async fn single_pass_publishes_every_node() {
    let cluster = Cluster::new();
    cluster.write_declarations("default.toml", DEFAULT_DECLARATION);
    cluster.write_nodes(&["n1", "n2"]);

    let outcome = build_worker(&cluster.config).run_once().await.unwrap();
    assert_eq!(outcome.publish, PublishOutcome::Created { revision: 1 });

    let stored = read_json(&cluster.document_path());
    assert_eq!(stored["namespace"], "tsync-system");
    assert_eq!(stored["name"], "node-profiles");
    assert_eq!(stored["revision"], 1);
    assert!(stored["updatedAt"].is_string());
    assert_eq!(stored["data"]["n1"], r#"["P0"]"#);
    assert_eq!(stored["data"]["n2"], r#"["P0"]"#);
}

#[tokio::test]
async fn node_removal_replaces_the_body() {
    let cluster = Cluster::new();
    cluster.write_declarations("default.toml", DEFAULT_DECLARATION);
    cluster.write_nodes(&["a", "b"]);

    let worker = build_worker(&cluster.config);
    worker.run_once().await.unwrap();

    cluster.write_nodes(&["b", "c"]);
    let outcome = worker.run_once().await.unwrap();
    assert!(matches!(
        outcome.publish,
        PublishOutcome::Replaced { revision: 2, added: 1, removed: 1 }
    ));

    let doc = cluster.document().await.unwrap();
    let keys: Vec<_> = doc.data.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["b", "c"]);

    let unchanged = worker.run_once().await.unwrap();
    assert_eq!(unchanged.publish, PublishOutcome::Unchanged { revision: 2 });
}

#[rstest]
#[case::duplicate_declaration(
    r#"{"declarations":[
        {"name":"gm","priority":1,"selector":{"type":"all"},"profile":"A"},
        {"name":"gm","priority":1,"selector":{"type":"all"},"profile":"B"}
    ]}"#,
    "configuration"
)]
#[case::invalid_label_key(
    r#"{"declarations":[
        {"name":"gm","selector":{"type":"labels","requirements":[{"key":"bad key!","operator":"Exists"}]},"profile":"A"}
    ]}"#,
    "configuration"
)]
#[case::invalid_node_name(
    r#"{"declarations":[
        {"name":"gm","selector":{"type":"nodeNames","names":["Bad_Name"]},"profile":"A"}
    ]}"#,
    "configuration"
)]
#[case::unknown_label_operator(
    r#"{"declarations":[
        {"name":"gm","selector":{"type":"labels","requirements":[{"key":"zone","operator":"Equals","values":["a"]}]},"profile":"A"}
    ]}"#,
    "configuration"
)]
#[case::unknown_selector_type(
    r#"{"declarations":[
        {"name":"gm","selector":{"type":"someNodes","names":["n1"]},"profile":"A"}
    ]}"#,
    "configuration"
)]
#[case::malformed_file(r#"{"declarations": ["#, "fetch")]
#[tokio::test]
async fn failed_pass_leaves_document_untouched(#[case] declarations: &str, #[case] kind: &str) {
    let cluster = Cluster::new();
    cluster.write_declarations("00-default.toml", DEFAULT_DECLARATION);
    cluster.write_nodes(&["n1"]);

    let worker = build_worker(&cluster.config);
    worker.run_once().await.unwrap();
    let before = std::fs::read_to_string(cluster.document_path()).unwrap();

    cluster.write_declarations("10-broken.json", declarations);
    let err = worker.run_once().await.unwrap_err();
    assert_eq!(err.kind(), kind);

    assert_eq!(std::fs::read_to_string(cluster.document_path()).unwrap(), before);
}

#[tokio::test]
async fn duplicate_node_is_rejected() {
    let cluster = Cluster::new();
    cluster.write_declarations("default.toml", DEFAULT_DECLARATION);
    cluster.write_nodes(&["n1", "n1"]);

    let err = build_worker(&cluster.config).run_once().await.unwrap_err();
    assert!(matches!(err, SyncError::Fetch(_)));
    assert!(!err.is_retryable());
    assert!(cluster.document().await.is_none());
}

#[tokio::test]
async fn worker_publishes_on_trigger() {
    let cluster = Cluster::new();
    cluster.write_nodes(&["n1"]);

    let worker = std::sync::Arc::new(build_worker(&cluster.config));
    let (tx, rx) = tokio::sync::watch::channel(false);
    let task = tokio::spawn({
        let worker = worker.clone();
        async move { worker.run(rx).await }
    });

    tokio::time::timeout(Duration::from_secs(5), async {
        while cluster.document().await.is_none() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(cluster.document().await.unwrap().entry("n1"), Some("[]"));

    cluster.write_declarations("default.toml", DEFAULT_DECLARATION);
    worker.trigger_handle().trigger();

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let doc = cluster.document().await.unwrap();
            if doc.entry("n1") == Some(r#"["P0"]"#) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();
}

//! File-backed declaration and node sources.
//!
//! Declarations live in a directory, one or more per file:
//!
//! ```toml
//! [[declarations]]
//! name = "default"
//! priority = 0
//! selector = { type = "all" }
//! profile = { interface = "ens1f0", ptp4lOpts = "-2 -s" }
//! ```
//!
//! Nodes live in a single JSON file: `{ "nodes": [{ "name": "...", "labels": {...} }] }`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use tsync_reconcile::{DeclarationSource, FetchError, Node, NodeSource, ProfileDeclaration};

#[derive(Debug, Deserialize)]
struct DeclarationFile {
    #[serde(default)]
    declarations: Vec<ProfileDeclaration>,
}

#[derive(Debug, Deserialize)]
struct NodeFile {
    #[serde(default)]
    nodes: Vec<Node>,
}

/// Supported declaration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

impl Format {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Some(Self::Json),
            Some("toml") => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Reads every `*.json` and `*.toml` file of a directory, in file-name order.
#[derive(Debug, Clone)]
pub struct FileDeclarationSource {
    dir: PathBuf,
}

impl FileDeclarationSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn declaration_files(&self) -> Result<Vec<(PathBuf, Format)>, FetchError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(dir = %self.dir.display(), "Declarations directory missing, listing is empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(declarations_error(&self.dir, e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| declarations_error(&self.dir, e))?
        {
            let path = entry.path();
            let Some(format) = Format::from_path(&path) else {
                continue;
            };
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| declarations_error(&path, e))?;
            if file_type.is_dir() {
                continue;
            }
            files.push((path, format));
        }

        files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(files)
    }
}

#[async_trait]
impl DeclarationSource for FileDeclarationSource {
    async fn list_declarations(&self) -> Result<Vec<ProfileDeclaration>, FetchError> {
        let mut declarations = Vec::new();

        for (path, format) in self.declaration_files().await? {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| declarations_error(&path, e))?;

            let file: DeclarationFile = match format {
                Format::Json => {
                    serde_json::from_str(&raw).map_err(|e| declarations_error(&path, e))?
                }
                Format::Toml => toml::from_str(&raw).map_err(|e| declarations_error(&path, e))?,
            };

            debug!(
                path = %path.display(),
                count = file.declarations.len(),
                "Loaded declaration file"
            );
            declarations.extend(file.declarations);
        }

        Ok(declarations)
    }
}

/// Reads the node listing from one JSON file.
#[derive(Debug, Clone)]
pub struct FileNodeSource {
    path: PathBuf,
}

impl FileNodeSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl NodeSource for FileNodeSource {
    async fn list_nodes(&self) -> Result<Vec<Node>, FetchError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| FetchError::Nodes(format!("{}: {e}", self.path.display())))?;

        let file: NodeFile = serde_json::from_str(&raw)
            .map_err(|e| FetchError::Nodes(format!("{}: {e}", self.path.display())))?;

        Ok(file.nodes)
    }
}

fn declarations_error(path: &Path, err: impl std::fmt::Display) -> FetchError {
    FetchError::Declarations(format!("{}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsync_reconcile::NodeSelector;

    #[tokio::test]
    async fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileDeclarationSource::new(dir.path().join("absent"));
        assert!(source.list_declarations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reads_json_and_toml_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("20-gm.toml"),
            r#"
[[declarations]]
name = "grandmaster"
priority = 0
slot = "ens1f0"
selector = { type = "labels", requirements = [{ key = "ptp/grandmaster", operator = "Exists" }] }
profile = { interface = "ens1f0" }
"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("10-default.json"),
            r#"{"declarations":[{"name":"default","selector":{"type":"all"},"profile":"P0"}]}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("README.md"), "ignored").unwrap();

        let decls = FileDeclarationSource::new(dir.path())
            .list_declarations()
            .await
            .unwrap();

        let names: Vec<_> = decls.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["default", "grandmaster"]);
        assert_eq!(decls[0].selector, NodeSelector::All);
        assert_eq!(decls[1].priority, Some(0));
        assert_eq!(decls[1].profile["interface"], "ens1f0");
    }

    #[tokio::test]
    async fn test_malformed_file_is_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{ not json").unwrap();

        let err = FileDeclarationSource::new(dir.path())
            .list_declarations()
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Declarations(msg) if msg.contains("bad.json")));
    }

    #[tokio::test]
    async fn test_node_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodes.json");
        std::fs::write(
            &path,
            r#"{"nodes":[{"name":"n1","labels":{"zone":"a"}},{"name":"n2"}]}"#,
        )
        .unwrap();

        let nodes = FileNodeSource::new(&path).list_nodes().await.unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].labels.get("zone").map(String::as_str), Some("a"));
        assert!(nodes[1].labels.is_empty());

        let missing = FileNodeSource::new(dir.path().join("none.json"));
        assert!(matches!(
            missing.list_nodes().await.unwrap_err(),
            FetchError::Nodes(_)
        ));
    }

    #[tokio::test]
    async fn test_invalid_node_name_is_fetch_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodes.json");
        std::fs::write(&path, r#"{"nodes":[{"name":"Bad_Name"}]}"#).unwrap();
        assert!(FileNodeSource::new(&path).list_nodes().await.is_err());
    }
}

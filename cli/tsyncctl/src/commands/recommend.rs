//! Dry-run of the profile selection.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;
use tsync_reconcile::{recommend, validate_declarations, Node, ProfileDeclaration, SyncError};

use crate::error::CliError;
use crate::output::print_output;

use super::{CommandContext, InputArgs};

/// Recommend command.
#[derive(Debug, Args)]
pub struct RecommendCommand {
    #[command(flatten)]
    input: InputArgs,

    /// Only show this node.
    #[arg(long)]
    node: Option<String>,
}

impl RecommendCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let (declarations, nodes) = self.input.load().await?;
        let rows = recommendation_rows(&declarations, &nodes, self.node.as_deref())?;
        print_output(&rows, &rows, ctx.format);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
struct RecommendationRow {
    #[tabled(rename = "Node")]
    node: String,

    #[tabled(rename = "Profiles", display = "display_profiles")]
    profiles: Vec<String>,
}

fn display_profiles(profiles: &Vec<String>) -> String {
    if profiles.is_empty() {
        "-".to_string()
    } else {
        profiles.join(", ")
    }
}

fn recommendation_rows(
    declarations: &[ProfileDeclaration],
    nodes: &[Node],
    only: Option<&str>,
) -> Result<Vec<RecommendationRow>, CliError> {
    validate_declarations(declarations).map_err(SyncError::from)?;

    let selected: Vec<&Node> = nodes
        .iter()
        .filter(|n| only.is_none_or(|name| n.name.as_str() == name))
        .collect();

    if let Some(name) = only {
        if selected.is_empty() {
            return Err(CliError::NodeNotFound(name.to_string()));
        }
    }

    selected
        .into_iter()
        .map(|node| {
            let recommendation = recommend(declarations, node).map_err(SyncError::from)?;
            Ok(RecommendationRow {
                node: node.name.to_string(),
                profiles: recommendation
                    .names()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsync_reconcile::NodeSelector;
    use tsync_testing::{declaration, labeled_node, node};

    #[test]
    fn rows_follow_node_order_and_priority() {
        let decls = vec![
            declaration("ordinary", NodeSelector::All, Some(5)),
            declaration("gm", NodeSelector::label_exists("ptp/grandmaster"), Some(0)),
        ];
        let nodes = vec![labeled_node("gm-0", &[("ptp/grandmaster", "")]), node("w-0")];

        let rows = recommendation_rows(&decls, &nodes, None).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].profiles, vec!["gm", "ordinary"]);
        assert_eq!(rows[1].profiles, vec!["ordinary"]);
        assert_eq!(display_profiles(&rows[0].profiles), "gm, ordinary");
        assert_eq!(display_profiles(&Vec::new()), "-");
    }

    #[test]
    fn node_filter() {
        let decls = vec![declaration("default", NodeSelector::All, None)];
        let nodes = vec![node("a"), node("b")];

        let rows = recommendation_rows(&decls, &nodes, Some("b")).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].node, "b");

        assert!(matches!(
            recommendation_rows(&decls, &nodes, Some("c")),
            Err(CliError::NodeNotFound(_))
        ));
    }

    #[test]
    fn duplicate_declarations_are_rejected() {
        let decls = vec![
            declaration("default", NodeSelector::All, Some(1)),
            declaration("default", NodeSelector::All, Some(1)),
        ];
        assert!(matches!(
            recommendation_rows(&decls, &[node("a")], None),
            Err(CliError::Sync(SyncError::Configuration(_)))
        ));
    }
}

//! Collaborator interfaces for listing inputs.

use async_trait::async_trait;

use crate::error::FetchError;
use crate::model::{Node, ProfileDeclaration};

/// Lists the current full set of profile declarations.
#[async_trait]
pub trait DeclarationSource: Send + Sync {
    async fn list_declarations(&self) -> Result<Vec<ProfileDeclaration>, FetchError>;
}

/// Lists the current full set of nodes and their labels.
#[async_trait]
pub trait NodeSource: Send + Sync {
    async fn list_nodes(&self) -> Result<Vec<Node>, FetchError>;
}

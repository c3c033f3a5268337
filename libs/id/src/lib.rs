//! # tsync-id
//!
//! Identity types shared by the tsync engine, controller and CLI.
//!
//! ## Names
//!
//! Cluster objects are identified by names chosen by operators. Names are
//! validated once at the edge (parsing, deserialization) so the engine can
//! treat them as opaque, totally ordered keys:
//!
//! - [`NodeName`]: DNS-1123 subdomain (`worker-0.rack-a`)
//! - [`ProfileName`]: letters, digits, `-`, `_` and `.` (`grandmaster_eth0`)
//!
//! ## Pass IDs
//!
//! Every synchronization pass gets a [`PassId`] of the form `pass_{ulid}` so
//! log lines from one pass can be correlated. ULIDs sort by creation time.

mod error;
mod macros;
mod types;

pub use error::IdError;
pub use types::*;

/// Re-export ulid for consumers that need raw ULID operations
pub use ulid::Ulid;

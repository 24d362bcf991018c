//! In-memory resource graph for modus-infra.
//!
//! Implements the [`topology::ResourceProvider`] trait. The graph records
//! declarations and grants in order, enforces the invariants a provisioning
//! engine would (unique logical ids, no dangling references, unique rule
//! priorities per listener, well-typed grants), and renders the result into a
//! [`Manifest`].
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Applying the manifest against a cloud account is the
//! provisioning engine's job; this crate stops at the declarative document.

mod graph;
mod manifest;
mod routing;

use thiserror::Error;
use topology::LogicalId;

pub use graph::{Declaration, ResourceGraph};
pub use manifest::{Manifest, ManifestResource, MANIFEST_VERSION};

/// Errors raised while rendering a graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A resource's properties could not be converted to JSON.
    #[error("Failed to render resource '{id}'")]
    Serialize {
        id: LogicalId,
        #[source]
        source: serde_json::Error,
    },

    /// The manifest document could not be written as JSON.
    #[error("Failed to render manifest")]
    Render(#[source] serde_json::Error),
}

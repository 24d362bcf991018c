//! Environment assembly for modus-infra.
//!
//! Declares the collaborators the service topology depends on (network,
//! media storage, serverless database, application secrets, CDN) and wires
//! them around a [`topology::ServiceTopologyBuilder`] according to an
//! [`EnvironmentConfig`].
//!
//! ## Architectural Layer
//!
//! **Orchestration.** Every collaborator names its resources through the
//! [`topology::BaseComponent`] handed down by the environment and declares
//! them through the same provider as the topology.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`config`] | `EnvironmentConfig` and its sections |
//! | [`errors`] | `StackError` |
//! | [`network`] | `Network` (VPC) |
//! | [`storage`] | `MediaBucket` |
//! | [`database`] | `ServerlessDatabase` |
//! | [`secrets`] | `SecretRegistry`, the `SecretStore` services resolve through |
//! | [`cdn`] | `ContentDistribution` |
//! | [`web_stack`] | `WebEnvironmentStack` |

pub mod cdn;
pub mod config;
pub mod database;
pub mod errors;
pub mod network;
pub mod secrets;
pub mod storage;
pub mod web_stack;

use serde::Serialize;
use topology::{ExternalResource, Resource, ResourceHandle, ResourceKind};

pub use cdn::{ContentDistribution, PriceClass};
pub use config::{
    AutoScalingSettings, CdnConfig, DatabaseConfig, EnvironmentConfig, NetworkConfig, SecretConfig,
    ServiceConfig, DATABASE_SECRET,
};
pub use database::ServerlessDatabase;
pub use errors::StackError;
pub use network::Network;
pub use secrets::SecretRegistry;
pub use storage::MediaBucket;
pub use web_stack::{WebEnvironmentStack, CLIENT_TAG, ENVIRONMENT_TAG};

/// Wraps a collaborator's typed properties as an [`ExternalResource`].
fn external(
    kind: ResourceKind,
    properties: &impl Serialize,
    references: Vec<ResourceHandle>,
) -> Result<Resource, StackError> {
    let properties = serde_json::to_value(properties)
        .map_err(|source| StackError::Properties { kind, source })?;
    Ok(Resource::External(ExternalResource {
        kind,
        properties,
        references,
    }))
}

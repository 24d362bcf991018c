//! Error type for environment assembly.

use graph::GraphError;
use thiserror::Error;
use topology::{ProviderError, ResourceKind, TopologyError};

/// Errors that abort assembling one environment.
#[derive(Debug, Error)]
pub enum StackError {
    /// The TOML document could not be parsed into an [`crate::EnvironmentConfig`].
    #[error("Failed to parse environment configuration")]
    Parse(#[from] toml::de::Error),

    /// The configuration parsed but describes an impossible environment.
    #[error("Invalid configuration for {section}: {reason}")]
    InvalidConfig { section: String, reason: String },

    /// A collaborator's properties could not be converted to JSON.
    #[error("Failed to encode {kind} properties")]
    Properties {
        kind: ResourceKind,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl StackError {
    pub(crate) fn invalid(section: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            section: section.into(),
            reason: reason.into(),
        }
    }
}

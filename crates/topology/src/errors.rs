//! Error types for the topology domain.
//!
//! [`TopologyError`] covers conditions that abort environment construction.
//! [`ProviderError`] is produced by [`crate::ResourceProvider`]
//! implementations when a declaration or grant is rejected.
//!
//! Nothing here is retryable: provisioning is build-once, and every error is
//! surfaced to the composition root, which halts.

use thiserror::Error;

use crate::{LogicalId, ResourceHandle, ResourceKind, RulePriority, SecretName, ServiceName};

// ---------------------------------------------------------------------------
// Provider errors
// ---------------------------------------------------------------------------

/// A declaration or grant rejected by the resource provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Another resource in the graph already uses this logical id.
    #[error("There is already a resource with logical id '{id}'")]
    DuplicateLogicalId {
        /// The colliding id.
        id: LogicalId,
    },

    /// A rule with this priority already exists on the listener.
    ///
    /// Identifies only the colliding rules; the provider does not know
    /// which service either belongs to.
    #[error("Priority {priority} on listener '{listener}' is already used by rule '{existing}'")]
    PriorityConflict {
        listener: LogicalId,
        priority: RulePriority,
        existing: LogicalId,
    },

    /// The declaration points at a resource that is not in the graph, or
    /// whose kind does not match the handle.
    #[error("Unknown reference {reference} from '{from}'")]
    UnknownReference {
        from: LogicalId,
        reference: ResourceHandle,
    },

    /// A grant whose endpoints have kinds the grant cannot connect.
    #[error("Invalid grant from {grantee} to {target}: {reason}")]
    InvalidGrant {
        grantee: ResourceHandle,
        target: ResourceHandle,
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Topology errors
// ---------------------------------------------------------------------------

/// Errors that abort topology construction or one `create_service` call.
#[derive(Debug, Error)]
pub enum TopologyError {
    /// The topology builder was handed something other than a network.
    ///
    /// Raised before any resource is declared.
    #[error("A valid network is required to build the service topology, got a {kind} ('{id}')")]
    InvalidNetwork { id: LogicalId, kind: ResourceKind },

    /// The intent is malformed on its own.
    #[error("Invalid intent for service '{service}': {reason}")]
    InvalidIntent { service: ServiceName, reason: String },

    /// Another service in this topology already claimed the priority.
    #[error("Service '{service}' requests rule priority {priority}, already used by '{existing}'")]
    DuplicatePriority {
        service: ServiceName,
        priority: RulePriority,
        existing: ServiceName,
    },

    /// Another service in this topology already uses the name.
    #[error("Service '{service}' is already defined in this topology")]
    DuplicateServiceName { service: ServiceName },

    /// The secret store has no secret by this name.
    #[error("Service '{service}' references unknown secret '{secret}'")]
    UnknownSecret {
        service: ServiceName,
        secret: SecretName,
    },

    /// The resource provider rejected a declaration or grant.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

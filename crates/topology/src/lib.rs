//! Service-topology domain for modus-infra.
//!
//! This crate derives a consistent set of interconnected infrastructure
//! declarations (target group, routing rule, image repository, task
//! definition, log group, running service, scaling policy, and permission
//! grants) from small per-service intents, for any number of services
//! sharing one load balancer and one cluster.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It declares *what* must exist through [`ResourceProvider`]; infrastructure
//! crates decide how the declarations are recorded and applied.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`LogicalId`, `ServiceName`, etc.) |
//! | [`types`] | Shared value types (`Port`, `RulePriority`, `Timestamp`, etc.) |
//! | [`errors`] | `TopologyError` and `ProviderError` |
//! | [`identity`] | `IdentityBuilder`, the per-environment naming authority |
//! | [`environment`] | `BaseEnvironment` / `BaseComponent` |
//! | [`resources`] | Declarative resource model, handles, and grants |
//! | [`provider`] | `ResourceProvider` and `SecretStore` port traits |
//! | [`intent`] | `ServiceIntent` and its options |
//! | [`topology`] | `ServiceTopologyBuilder` |

pub mod environment;
pub mod errors;
pub mod identifiers;
pub mod identity;
pub mod intent;
pub mod provider;
pub mod resources;
pub mod topology;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use environment::{BaseComponent, BaseEnvironment};
pub use errors::{ProviderError, TopologyError};
pub use identifiers::{LogicalId, SecretName, ServiceName, SynthesisRunId};
pub use identity::{EnvironmentProps, IdentityBuilder, SEPARATOR};
pub use intent::{
    AutoScalingConfig, RoutingCondition, ServiceIntent, DEFAULT_COOLDOWN, DEFAULT_CPU,
    DEFAULT_CPU_TARGET_PERCENT, DEFAULT_MEMORY_MIB,
};
pub use provider::{ResourceProvider, SecretStore};
pub use resources::{
    Cluster, ContainerDefinition, ExternalResource, Grant, HealthCheck, Listener, ListenerAction,
    ListenerRule, LoadBalancer, LogConfiguration, LogGroup, Protocol, Repository, Resource,
    ResourceHandle, ResourceKind, ScalingPolicy, SecretReference, Service, TargetGroup,
    TargetGroupAttachment, TargetType, TaskDefinition,
};
pub use topology::{
    ServiceHandle, ServiceTopologyBuilder, SharedIngress, TopologyProps, DEREGISTRATION_DELAY,
    MAX_IMAGE_COUNT,
};
pub use types::{Port, RemovalPolicy, RetentionDays, RulePriority, Timestamp};

//! Declarative resource model.
//!
//! A [`Resource`] is a description of one infrastructure object, never the
//! object itself. Resources are handed to a [`crate::ResourceProvider`], which
//! records them and returns a [`ResourceHandle`] that later declarations use
//! to reference them.
//!
//! The topology builder knows the shape of every resource it derives (load
//! balancer, listeners, target groups, cluster, repositories, task
//! definitions, log groups, services, scaling policies). Resources owned by
//! collaborators outside the topology (network, buckets, databases, secrets,
//! CDN) are declared as [`ExternalResource`]s: the core only needs their
//! handle and kind.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::intent::RoutingCondition;
use crate::{LogicalId, Port, RemovalPolicy, RetentionDays, RulePriority};

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// The kind of a declared resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Network,
    LoadBalancer,
    Listener,
    ListenerRule,
    TargetGroup,
    Cluster,
    Repository,
    TaskDefinition,
    LogGroup,
    Service,
    ScalingPolicy,
    Secret,
    Bucket,
    Database,
    Certificate,
    Distribution,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Network => "network",
            Self::LoadBalancer => "load_balancer",
            Self::Listener => "listener",
            Self::ListenerRule => "listener_rule",
            Self::TargetGroup => "target_group",
            Self::Cluster => "cluster",
            Self::Repository => "repository",
            Self::TaskDefinition => "task_definition",
            Self::LogGroup => "log_group",
            Self::Service => "service",
            Self::ScalingPolicy => "scaling_policy",
            Self::Secret => "secret",
            Self::Bucket => "bucket",
            Self::Database => "database",
            Self::Certificate => "certificate",
            Self::Distribution => "distribution",
        };
        f.write_str(label)
    }
}

/// A typed reference to a declared resource.
///
/// Handles are only minted by a [`crate::ResourceProvider`] when a declaration
/// is accepted, so holding one proves the resource exists in the graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceHandle {
    id: LogicalId,
    kind: ResourceKind,
}

impl ResourceHandle {
    /// Creates a handle. Intended for [`crate::ResourceProvider`] implementations.
    pub fn new(id: LogicalId, kind: ResourceKind) -> Self {
        Self { id, kind }
    }

    /// Returns the logical id of the referenced resource.
    pub fn id(&self) -> &LogicalId {
        &self.id
    }

    /// Returns the kind of the referenced resource.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }
}

impl std::fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.kind, self.id)
    }
}

// ---------------------------------------------------------------------------
// Ingress
// ---------------------------------------------------------------------------

/// Internet-facing application load balancer placed in a network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancer {
    pub name: String,
    pub network: ResourceHandle,
    pub internet_facing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Http,
    Https,
}

/// What a listener or rule does with a matched request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ListenerAction {
    /// Redirect the request to another protocol/port.
    Redirect {
        protocol: Protocol,
        port: Port,
        status_code: u16,
    },
    /// Answer with a fixed status code.
    FixedResponse { status_code: u16 },
    /// Forward to a target group.
    Forward { target_group: ResourceHandle },
}

impl ListenerAction {
    /// Permanent redirect of plaintext traffic to HTTPS on 443.
    pub fn redirect_to_https() -> Self {
        Self::Redirect {
            protocol: Protocol::Https,
            port: Port::HTTPS,
            status_code: 301,
        }
    }

    /// Fixed `501 Not Implemented` response.
    pub fn not_implemented() -> Self {
        Self::FixedResponse { status_code: 501 }
    }
}

/// A port binding on a load balancer with a default action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listener {
    pub load_balancer: ResourceHandle,
    pub port: Port,
    pub protocol: Protocol,
    pub default_action: ListenerAction,
}

/// A (priority, conditions, action) triple attached to a listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerRule {
    pub listener: ResourceHandle,
    pub priority: RulePriority,
    pub conditions: Vec<RoutingCondition>,
    pub action: ListenerAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Ip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub path: String,
    pub port: Port,
}

/// A pool of service-instance addresses that rules forward to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetGroup {
    pub network: ResourceHandle,
    pub port: Port,
    pub protocol: Protocol,
    pub target_type: TargetType,
    pub health_check: HealthCheck,
    #[serde(with = "duration_secs")]
    pub deregistration_delay: Duration,
}

// ---------------------------------------------------------------------------
// Compute
// ---------------------------------------------------------------------------

/// Compute placement group every service is scheduled into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub name: String,
    pub network: ResourceHandle,
    pub container_insights: bool,
}

/// Container image repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    /// Lifecycle rule: only this many images are retained.
    pub max_image_count: u32,
    pub image_scan_on_push: bool,
    pub removal_policy: RemovalPolicy,
}

/// Log destination for container output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogGroup {
    pub name: String,
    pub retention: RetentionDays,
    pub removal_policy: RemovalPolicy,
}

/// A resolved secret injected into a container.
///
/// Carries only a reference to the secret resource; the value is fetched by
/// the runtime when a task starts and never appears in the declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretReference {
    pub secret: ResourceHandle,
    /// JSON key inside the secret value, when only one field is injected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl SecretReference {
    /// References the whole value of `secret`.
    pub fn whole(secret: ResourceHandle) -> Self {
        Self {
            secret,
            field: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfiguration {
    pub log_group: ResourceHandle,
    pub stream_prefix: String,
}

/// One container within a task definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerDefinition {
    pub name: String,
    /// Repository the image is pulled from.
    pub image: ResourceHandle,
    pub essential: bool,
    pub environment: BTreeMap<String, String>,
    pub secrets: BTreeMap<String, SecretReference>,
    pub port_mappings: Vec<Port>,
    pub logging: LogConfiguration,
}

/// Immutable template describing how to run one instance of a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub family: String,
    pub cpu: u32,
    pub memory_mib: u32,
    pub containers: Vec<ContainerDefinition>,
}

impl TaskDefinition {
    /// Creates an empty task definition.
    pub fn new(family: impl Into<String>, cpu: u32, memory_mib: u32) -> Self {
        Self {
            family: family.into(),
            cpu,
            memory_mib,
            containers: Vec::new(),
        }
    }

    /// Adds a container to the definition.
    pub fn add_container(&mut self, container: ContainerDefinition) -> &mut Self {
        self.containers.push(container);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetGroupAttachment {
    pub target_group: ResourceHandle,
    pub container_name: String,
    pub container_port: Port,
}

/// A running service of `desired_count` replicas on a cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub cluster: ResourceHandle,
    pub task_definition: ResourceHandle,
    pub desired_count: u32,
    pub target_groups: Vec<TargetGroupAttachment>,
}

/// CPU-utilization target tracking bounded by a task-count range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingPolicy {
    pub service: ResourceHandle,
    pub min_capacity: u32,
    pub max_capacity: u32,
    pub cpu_target_percent: u32,
    #[serde(with = "duration_secs")]
    pub scale_in_cooldown: Duration,
    #[serde(with = "duration_secs")]
    pub scale_out_cooldown: Duration,
}

// ---------------------------------------------------------------------------
// Collaborator resources
// ---------------------------------------------------------------------------

/// A resource owned by a collaborator outside the topology.
///
/// The core only inspects `kind`; `properties` is rendered verbatim into the
/// synthesized output and `references` lets the provider check that every
/// handle it points at exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalResource {
    pub kind: ResourceKind,
    pub properties: serde_json::Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<ResourceHandle>,
}

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

/// Any declarable resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Resource {
    LoadBalancer(LoadBalancer),
    Listener(Listener),
    ListenerRule(ListenerRule),
    TargetGroup(TargetGroup),
    Cluster(Cluster),
    Repository(Repository),
    TaskDefinition(TaskDefinition),
    LogGroup(LogGroup),
    Service(Service),
    ScalingPolicy(ScalingPolicy),
    External(ExternalResource),
}

impl Resource {
    /// Returns the kind of this resource.
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::LoadBalancer(_) => ResourceKind::LoadBalancer,
            Self::Listener(_) => ResourceKind::Listener,
            Self::ListenerRule(_) => ResourceKind::ListenerRule,
            Self::TargetGroup(_) => ResourceKind::TargetGroup,
            Self::Cluster(_) => ResourceKind::Cluster,
            Self::Repository(_) => ResourceKind::Repository,
            Self::TaskDefinition(_) => ResourceKind::TaskDefinition,
            Self::LogGroup(_) => ResourceKind::LogGroup,
            Self::Service(_) => ResourceKind::Service,
            Self::ScalingPolicy(_) => ResourceKind::ScalingPolicy,
            Self::External(external) => external.kind,
        }
    }

    /// Returns every handle this resource points at.
    pub fn references(&self) -> Vec<&ResourceHandle> {
        match self {
            Self::LoadBalancer(lb) => vec![&lb.network],
            Self::Listener(listener) => {
                let mut refs = vec![&listener.load_balancer];
                refs.extend(listener.default_action.target());
                refs
            }
            Self::ListenerRule(rule) => {
                let mut refs = vec![&rule.listener];
                refs.extend(rule.action.target());
                refs
            }
            Self::TargetGroup(tg) => vec![&tg.network],
            Self::Cluster(cluster) => vec![&cluster.network],
            Self::Repository(_) | Self::LogGroup(_) => Vec::new(),
            Self::TaskDefinition(task) => task
                .containers
                .iter()
                .flat_map(|c| {
                    std::iter::once(&c.image)
                        .chain(std::iter::once(&c.logging.log_group))
                        .chain(c.secrets.values().map(|s| &s.secret))
                })
                .collect(),
            Self::Service(service) => {
                let mut refs = vec![&service.cluster, &service.task_definition];
                refs.extend(service.target_groups.iter().map(|a| &a.target_group));
                refs
            }
            Self::ScalingPolicy(policy) => vec![&policy.service],
            Self::External(external) => external.references.iter().collect(),
        }
    }
}

impl ListenerAction {
    fn target(&self) -> Option<&ResourceHandle> {
        match self {
            Self::Forward { target_group } => Some(target_group),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Grants
// ---------------------------------------------------------------------------

/// A permission edge between two declared resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Grant {
    /// `source` may open TCP connections to `destination` on `port`.
    NetworkIngress {
        source: ResourceHandle,
        destination: ResourceHandle,
        port: Port,
    },
    /// The execution role of `task_definition` may pull images from `repository`.
    ImagePull {
        repository: ResourceHandle,
        task_definition: ResourceHandle,
    },
    /// The execution role of `task_definition` may read `secret`.
    SecretRead {
        secret: ResourceHandle,
        task_definition: ResourceHandle,
    },
}

impl Grant {
    /// Returns the `(grantee, target)` handles of this grant.
    pub fn endpoints(&self) -> (&ResourceHandle, &ResourceHandle) {
        match self {
            Self::NetworkIngress {
                source,
                destination,
                ..
            } => (source, destination),
            Self::ImagePull {
                repository,
                task_definition,
            } => (task_definition, repository),
            Self::SecretRead {
                secret,
                task_definition,
            } => (task_definition, secret),
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(id: &str, kind: ResourceKind) -> ResourceHandle {
        ResourceHandle::new(LogicalId::new(id).unwrap(), kind)
    }

    #[test]
    fn test_listener_rule_references_listener_and_target_group() {
        let rule = Resource::ListenerRule(ListenerRule {
            listener: handle("l", ResourceKind::Listener),
            priority: RulePriority::new(1).unwrap(),
            conditions: vec![RoutingCondition::host_headers(["api.example.com"])],
            action: ListenerAction::Forward {
                target_group: handle("tg", ResourceKind::TargetGroup),
            },
        });

        let refs: Vec<_> = rule.references().into_iter().map(|h| h.id().as_str()).collect();
        assert_eq!(refs, vec!["l", "tg"]);
        assert_eq!(rule.kind(), ResourceKind::ListenerRule);
    }

    #[test]
    fn test_external_resource_reports_its_own_kind() {
        let vpc = Resource::External(ExternalResource {
            kind: ResourceKind::Network,
            properties: serde_json::json!({ "cidr": "10.10.0.0/16" }),
            references: Vec::new(),
        });
        assert_eq!(vpc.kind(), ResourceKind::Network);
        assert!(vpc.references().is_empty());
    }

    #[test]
    fn test_target_group_serializes_delay_in_seconds() {
        let tg = TargetGroup {
            network: handle("vpc", ResourceKind::Network),
            port: Port::HTTP,
            protocol: Protocol::Http,
            target_type: TargetType::Ip,
            health_check: HealthCheck {
                path: "/health".to_string(),
                port: Port::new(8000).unwrap(),
            },
            deregistration_delay: Duration::from_secs(60),
        };
        let value = serde_json::to_value(&tg).unwrap();
        assert_eq!(value["deregistration_delay"], 60);
        assert_eq!(value["protocol"], "HTTP");
        assert_eq!(value["target_type"], "ip");
    }

    #[test]
    fn test_grant_endpoints_put_grantee_first() {
        let grant = Grant::ImagePull {
            repository: handle("repo", ResourceKind::Repository),
            task_definition: handle("task", ResourceKind::TaskDefinition),
        };
        let (grantee, target) = grant.endpoints();
        assert_eq!(grantee.kind(), ResourceKind::TaskDefinition);
        assert_eq!(target.kind(), ResourceKind::Repository);
    }
}

//! [`ResourceGraph`]: the in-memory [`ResourceProvider`].
//!
//! Declarations are kept in insertion order, which is also the order a
//! provisioning engine would create them in: a resource is only accepted once
//! everything it references is already present.

use std::collections::BTreeMap;

use topology::{
    Grant, ListenerAction, ListenerRule, LogicalId, ProviderError, Resource, ResourceHandle,
    ResourceKind, ResourceProvider, RulePriority,
};
use tracing::{debug, trace};

use crate::routing::CompiledConditions;

/// One accepted declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub id: LogicalId,
    pub resource: Resource,
}

/// Declarative record of every resource and grant in one environment.
#[derive(Debug, Default)]
pub struct ResourceGraph {
    declarations: Vec<Declaration>,
    index: BTreeMap<LogicalId, usize>,
    grants: Vec<Grant>,
    tags: BTreeMap<String, String>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// All declarations, in declaration order.
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    /// All grants, in the order they were recorded.
    pub fn grants(&self) -> &[Grant] {
        &self.grants
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Number of declared resources of `kind`.
    pub fn count_of(&self, kind: ResourceKind) -> usize {
        self.declarations
            .iter()
            .filter(|d| d.resource.kind() == kind)
            .count()
    }

    /// Applies a tag to every resource in the graph, present and future.
    pub fn add_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Rules attached to `listener`, in evaluation order (ascending priority).
    pub fn listener_rules(&self, listener: &LogicalId) -> Vec<(LogicalId, &ListenerRule)> {
        let mut rules: Vec<_> = self
            .declarations
            .iter()
            .filter_map(|d| match &d.resource {
                Resource::ListenerRule(rule) if rule.listener.id() == listener => {
                    Some((d.id.clone(), rule))
                }
                _ => None,
            })
            .collect();
        rules.sort_by_key(|(_, rule)| rule.priority);
        rules
    }

    /// Evaluates a request against `listener` the way the ingress would:
    /// rules in ascending priority, first full match wins, otherwise the
    /// listener's default action.
    ///
    /// Returns `None` if `listener` is not a declared listener.
    pub fn route(&self, listener: &LogicalId, host: &str, path: &str) -> Option<ListenerAction> {
        let Some(Resource::Listener(declared)) = self.resource(listener) else {
            return None;
        };

        for (rule_id, rule) in self.listener_rules(listener) {
            let compiled = CompiledConditions::compile(&rule.conditions);
            if compiled.matches(host, path) {
                trace!(rule = %rule_id, priority = %rule.priority, host, path, "Rule matched");
                return Some(rule.action.clone());
            }
        }
        Some(declared.default_action.clone())
    }

    fn check_references(&self, id: &LogicalId, resource: &Resource) -> Result<(), ProviderError> {
        for reference in resource.references() {
            let known = self
                .index
                .get(reference.id())
                .map(|&i| self.declarations[i].resource.kind() == reference.kind())
                .unwrap_or(false);
            if !known {
                return Err(ProviderError::UnknownReference {
                    from: id.clone(),
                    reference: reference.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_priority(
        &self,
        listener: &ResourceHandle,
        priority: RulePriority,
    ) -> Result<(), ProviderError> {
        let existing = self.declarations.iter().find_map(|d| match &d.resource {
            Resource::ListenerRule(rule)
                if rule.listener == *listener && rule.priority == priority =>
            {
                Some(d.id.clone())
            }
            _ => None,
        });
        match existing {
            Some(existing) => Err(ProviderError::PriorityConflict {
                listener: listener.id().clone(),
                priority,
                existing,
            }),
            None => Ok(()),
        }
    }

    fn check_known(&self, handle: &ResourceHandle) -> bool {
        self.index
            .get(handle.id())
            .is_some_and(|&i| self.declarations[i].resource.kind() == handle.kind())
    }
}

impl ResourceProvider for ResourceGraph {
    fn declare(
        &mut self,
        id: LogicalId,
        resource: Resource,
    ) -> Result<ResourceHandle, ProviderError> {
        if self.index.contains_key(&id) {
            return Err(ProviderError::DuplicateLogicalId { id });
        }
        self.check_references(&id, &resource)?;
        if let Resource::ListenerRule(rule) = &resource {
            self.check_priority(&rule.listener, rule.priority)?;
        }

        let handle = ResourceHandle::new(id.clone(), resource.kind());
        self.index.insert(id.clone(), self.declarations.len());
        self.declarations.push(Declaration { id, resource });
        debug!(resource = %handle, total = self.declarations.len(), "Declaration accepted");
        Ok(handle)
    }

    fn grant(&mut self, grant: Grant) -> Result<(), ProviderError> {
        let (grantee, target) = grant.endpoints();
        for endpoint in [grantee, target] {
            if !self.check_known(endpoint) {
                return Err(ProviderError::UnknownReference {
                    from: grantee.id().clone(),
                    reference: endpoint.clone(),
                });
            }
        }
        validate_grant_kinds(&grant)?;

        if self.grants.contains(&grant) {
            trace!(grantee = %grantee, target = %target, "Grant already recorded");
            return Ok(());
        }
        self.grants.push(grant);
        Ok(())
    }

    fn resource(&self, id: &LogicalId) -> Option<&Resource> {
        self.index.get(id).map(|&i| &self.declarations[i].resource)
    }
}

fn validate_grant_kinds(grant: &Grant) -> Result<(), ProviderError> {
    let (grantee, target) = grant.endpoints();
    let expected: (&[ResourceKind], &[ResourceKind]) = match grant {
        Grant::NetworkIngress { .. } => (
            &[ResourceKind::Service],
            &[ResourceKind::LoadBalancer, ResourceKind::Database],
        ),
        Grant::ImagePull { .. } => (&[ResourceKind::TaskDefinition], &[ResourceKind::Repository]),
        Grant::SecretRead { .. } => (&[ResourceKind::TaskDefinition], &[ResourceKind::Secret]),
    };
    if expected.0.contains(&grantee.kind()) && expected.1.contains(&target.kind()) {
        Ok(())
    } else {
        Err(ProviderError::InvalidGrant {
            grantee: grantee.clone(),
            target: target.clone(),
            reason: format!(
                "expected one of {:?} granted access to one of {:?}",
                expected.0, expected.1
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topology::{ExternalResource, Listener, LoadBalancer, Port, Protocol, RoutingCondition};

    fn id(value: &str) -> LogicalId {
        LogicalId::new(value).unwrap()
    }

    fn external(kind: ResourceKind) -> Resource {
        Resource::External(ExternalResource {
            kind,
            properties: serde_json::json!({}),
            references: Vec::new(),
        })
    }

    /// vpc -> lb -> https listener
    fn ingress(graph: &mut ResourceGraph) -> ResourceHandle {
        let vpc = graph.declare(id("vpc"), external(ResourceKind::Network)).unwrap();
        let lb = graph
            .declare(
                id("lb"),
                Resource::LoadBalancer(LoadBalancer {
                    name: "lb".to_string(),
                    network: vpc,
                    internet_facing: true,
                }),
            )
            .unwrap();
        graph
            .declare(
                id("https"),
                Resource::Listener(Listener {
                    load_balancer: lb,
                    port: Port::HTTPS,
                    protocol: Protocol::Https,
                    default_action: ListenerAction::not_implemented(),
                }),
            )
            .unwrap()
    }

    fn rule(
        listener: &ResourceHandle,
        priority: u32,
        host: &str,
        target: &ResourceHandle,
    ) -> Resource {
        Resource::ListenerRule(ListenerRule {
            listener: listener.clone(),
            priority: RulePriority::new(priority).unwrap(),
            conditions: vec![RoutingCondition::host_headers([host])],
            action: ListenerAction::Forward {
                target_group: target.clone(),
            },
        })
    }

    #[test]
    fn test_duplicate_logical_id_is_rejected() {
        let mut graph = ResourceGraph::new();
        graph.declare(id("vpc"), external(ResourceKind::Network)).unwrap();

        let err = graph.declare(id("vpc"), external(ResourceKind::Network)).unwrap_err();

        assert_eq!(err, ProviderError::DuplicateLogicalId { id: id("vpc") });
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_dangling_reference_is_rejected() {
        let mut graph = ResourceGraph::new();
        let missing = ResourceHandle::new(id("vpc"), ResourceKind::Network);

        let err = graph
            .declare(
                id("lb"),
                Resource::LoadBalancer(LoadBalancer {
                    name: "lb".to_string(),
                    network: missing,
                    internet_facing: true,
                }),
            )
            .unwrap_err();

        assert!(matches!(err, ProviderError::UnknownReference { .. }));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_reference_with_wrong_kind_is_rejected() {
        let mut graph = ResourceGraph::new();
        graph.declare(id("bucket"), external(ResourceKind::Bucket)).unwrap();
        let disguised = ResourceHandle::new(id("bucket"), ResourceKind::Network);

        let result = graph.declare(
            id("lb"),
            Resource::LoadBalancer(LoadBalancer {
                name: "lb".to_string(),
                network: disguised,
                internet_facing: true,
            }),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_priority_collision_on_one_listener_is_rejected() {
        let mut graph = ResourceGraph::new();
        let https = ingress(&mut graph);
        let tg = graph.declare(id("tg"), external(ResourceKind::TargetGroup)).unwrap();

        graph.declare(id("rule-a"), rule(&https, 1, "a.example.com", &tg)).unwrap();
        let err = graph.declare(id("rule-b"), rule(&https, 1, "b.example.com", &tg)).unwrap_err();

        assert_eq!(
            err,
            ProviderError::PriorityConflict {
                listener: id("https"),
                priority: RulePriority::new(1).unwrap(),
                existing: id("rule-a"),
            }
        );
        assert!(graph.resource(&id("rule-b")).is_none());
    }

    #[test]
    fn test_route_follows_priority_then_default() {
        let mut graph = ResourceGraph::new();
        let https = ingress(&mut graph);
        let wildcard = graph
            .declare(id("tg-wildcard"), external(ResourceKind::TargetGroup))
            .unwrap();
        let api = graph.declare(id("tg-api"), external(ResourceKind::TargetGroup)).unwrap();

        // Declared out of order; evaluation must still follow priority.
        graph.declare(id("rule-wildcard"), rule(&https, 20, "*.example.com", &wildcard)).unwrap();
        graph.declare(id("rule-api"), rule(&https, 10, "api.example.com", &api)).unwrap();

        assert_eq!(
            graph.route(https.id(), "api.example.com", "/"),
            Some(ListenerAction::Forward { target_group: api })
        );
        assert_eq!(
            graph.route(https.id(), "www.example.com", "/"),
            Some(ListenerAction::Forward { target_group: wildcard })
        );
        assert_eq!(
            graph.route(https.id(), "other.org", "/"),
            Some(ListenerAction::not_implemented())
        );
        assert_eq!(graph.route(&id("vpc"), "api.example.com", "/"), None);
    }

    #[test]
    fn test_grants_check_kinds_and_deduplicate() {
        let mut graph = ResourceGraph::new();
        let repo = graph.declare(id("repo"), external(ResourceKind::Repository)).unwrap();
        let task = graph.declare(id("task"), external(ResourceKind::TaskDefinition)).unwrap();
        let grant = Grant::ImagePull {
            repository: repo.clone(),
            task_definition: task.clone(),
        };

        graph.grant(grant.clone()).unwrap();
        graph.grant(grant).unwrap();
        assert_eq!(graph.grants().len(), 1);

        let backwards = Grant::SecretRead {
            secret: repo,
            task_definition: task,
        };
        assert!(matches!(graph.grant(backwards), Err(ProviderError::InvalidGrant { .. })));
    }

    #[test]
    fn test_grant_to_unknown_resource_is_rejected() {
        let mut graph = ResourceGraph::new();
        let task = graph.declare(id("task"), external(ResourceKind::TaskDefinition)).unwrap();
        let grant = Grant::ImagePull {
            repository: ResourceHandle::new(id("repo"), ResourceKind::Repository),
            task_definition: task,
        };
        assert!(matches!(graph.grant(grant), Err(ProviderError::UnknownReference { .. })));
    }
}

//! The service topology builder.
//!
//! One [`ServiceTopologyBuilder`] owns the shared ingress (load balancer with a
//! plaintext and a secure listener) and the shared cluster of one
//! environment. Each [`ServiceTopologyBuilder::create_service`] call derives
//! the full per-service resource set and its permission grants without the
//! services knowing about each other.
//!
//! The builder is `Ready` as soon as [`ServiceTopologyBuilder::new`] returns:
//! there is no way to obtain a builder whose ingress or cluster is missing.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use tracing::info;

use crate::{
    BaseComponent, BaseEnvironment, Cluster, ContainerDefinition, Grant, HealthCheck, Listener,
    ListenerAction, ListenerRule, LoadBalancer, LogConfiguration, LogGroup, Port, Protocol,
    RemovalPolicy, Repository, Resource, ResourceHandle, ResourceKind, ResourceProvider,
    RetentionDays, RulePriority, ScalingPolicy, SecretReference, SecretStore, Service,
    ServiceIntent, ServiceName, TargetGroup, TargetGroupAttachment, TargetType, TaskDefinition,
    TopologyError,
};

/// Time a draining target keeps serving in-flight requests.
pub const DEREGISTRATION_DELAY: Duration = Duration::from_secs(60);

/// Images kept per repository; older ones are expired.
pub const MAX_IMAGE_COUNT: u32 = 2;

/// Construction input for [`ServiceTopologyBuilder::new`].
#[derive(Debug, Clone)]
pub struct TopologyProps {
    /// Naming authority handed down from the owning environment.
    pub component: BaseComponent,
    /// Must be a [`ResourceKind::Network`] handle.
    pub network: ResourceHandle,
}

/// The load balancer and its two listeners, shared by every service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedIngress {
    load_balancer: ResourceHandle,
    http_listener: ResourceHandle,
    https_listener: ResourceHandle,
}

impl SharedIngress {
    pub fn load_balancer(&self) -> &ResourceHandle {
        &self.load_balancer
    }

    /// Port 80; redirects everything to the secure listener.
    pub fn http_listener(&self) -> &ResourceHandle {
        &self.http_listener
    }

    /// Port 443; answers 501 unless a service rule matches.
    pub fn https_listener(&self) -> &ResourceHandle {
        &self.https_listener
    }
}

/// Everything one successful `create_service` call declared.
///
/// Only the builder can construct one, so a collaborator grant that takes a
/// `&ServiceHandle` can never target a service that failed to provision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceHandle {
    name: ServiceName,
    service: ResourceHandle,
    target_group: ResourceHandle,
    listener_rule: ResourceHandle,
    repository: ResourceHandle,
    task_definition: ResourceHandle,
    log_group: ResourceHandle,
    scaling_policy: Option<ResourceHandle>,
}

impl ServiceHandle {
    pub fn name(&self) -> &ServiceName {
        &self.name
    }

    /// The running service; the grantee for collaborator ingress grants.
    pub fn service(&self) -> &ResourceHandle {
        &self.service
    }

    pub fn target_group(&self) -> &ResourceHandle {
        &self.target_group
    }

    pub fn listener_rule(&self) -> &ResourceHandle {
        &self.listener_rule
    }

    pub fn repository(&self) -> &ResourceHandle {
        &self.repository
    }

    pub fn task_definition(&self) -> &ResourceHandle {
        &self.task_definition
    }

    pub fn log_group(&self) -> &ResourceHandle {
        &self.log_group
    }

    pub fn scaling_policy(&self) -> Option<&ResourceHandle> {
        self.scaling_policy.as_ref()
    }
}

/// Builds the shared ingress and cluster once, then derives services on demand.
#[derive(Debug)]
pub struct ServiceTopologyBuilder {
    component: BaseComponent,
    network: ResourceHandle,
    ingress: SharedIngress,
    cluster: ResourceHandle,
    priorities: BTreeMap<RulePriority, ServiceName>,
    services: BTreeSet<ServiceName>,
}

impl ServiceTopologyBuilder {
    /// Declares the shared ingress and cluster into `scope`.
    ///
    /// # Errors
    ///
    /// - [`TopologyError::InvalidNetwork`] when `props.network` is not a
    ///   network. Nothing has been declared at that point.
    /// - [`TopologyError::Provider`] when the provider rejects a declaration.
    #[tracing::instrument(skip_all, fields(network = %props.network))]
    pub fn new<P: ResourceProvider>(
        scope: &mut BaseEnvironment<P>,
        props: TopologyProps,
    ) -> Result<Self, TopologyError> {
        let TopologyProps { component, network } = props;
        if network.kind() != ResourceKind::Network {
            return Err(TopologyError::InvalidNetwork {
                id: network.id().clone(),
                kind: network.kind(),
            });
        }
        let id = component.identity();

        let load_balancer = scope.declare_with_id(
            id.logical_id("loadBalancer"),
            Resource::LoadBalancer(LoadBalancer {
                name: id.name().to_string(),
                network: network.clone(),
                internet_facing: true,
            }),
        )?;

        let http_listener = scope.declare_with_id(
            id.logical_id("httpListener"),
            Resource::Listener(Listener {
                load_balancer: load_balancer.clone(),
                port: Port::HTTP,
                protocol: Protocol::Http,
                default_action: ListenerAction::redirect_to_https(),
            }),
        )?;

        let https_listener = scope.declare_with_id(
            id.logical_id("httpsListener"),
            Resource::Listener(Listener {
                load_balancer: load_balancer.clone(),
                port: Port::HTTPS,
                protocol: Protocol::Https,
                default_action: ListenerAction::not_implemented(),
            }),
        )?;

        let cluster = scope.declare_with_id(
            id.logical_id("cluster"),
            Resource::Cluster(Cluster {
                name: id.name().to_string(),
                network: network.clone(),
                container_insights: true,
            }),
        )?;

        info!(
            load_balancer = %load_balancer.id(),
            cluster = %cluster.id(),
            "Shared ingress and cluster ready"
        );

        Ok(Self {
            component,
            network,
            ingress: SharedIngress {
                load_balancer,
                http_listener,
                https_listener,
            },
            cluster,
            priorities: BTreeMap::new(),
            services: BTreeSet::new(),
        })
    }

    /// The shared ingress, e.g. for a CDN origin.
    pub fn shared_ingress(&self) -> &SharedIngress {
        &self.ingress
    }

    pub fn cluster(&self) -> &ResourceHandle {
        &self.cluster
    }

    pub fn network(&self) -> &ResourceHandle {
        &self.network
    }

    /// Names of every service created so far, in name order.
    pub fn services(&self) -> impl Iterator<Item = &ServiceName> {
        self.services.iter()
    }

    /// Derives and declares every resource for one service.
    ///
    /// Declares, in order: target group, secure-listener rule, image
    /// repository, log group, task definition with one essential container,
    /// running service, optional scaling policy; then grants image pull,
    /// secret reads, and service-to-ingress access on port 80.
    ///
    /// Secrets are resolved through `secrets` once per call, before the
    /// first declaration.
    ///
    /// # Errors
    ///
    /// - [`TopologyError::InvalidIntent`], [`TopologyError::DuplicatePriority`],
    ///   [`TopologyError::DuplicateServiceName`], [`TopologyError::UnknownSecret`]
    ///   before anything is declared.
    /// - [`TopologyError::Provider`] part way through; declarations made
    ///   before the failure stay in the graph. Once the listener rule is
    ///   accepted, its priority and the service name stay claimed.
    #[tracing::instrument(skip_all, fields(service = %intent.name, priority = %intent.priority))]
    pub fn create_service<P: ResourceProvider>(
        &mut self,
        scope: &mut BaseEnvironment<P>,
        intent: &ServiceIntent,
        secrets: &dyn SecretStore,
    ) -> Result<ServiceHandle, TopologyError> {
        intent.validate()?;
        self.check_unique(intent)?;
        let container_secrets = resolve_secrets(intent, secrets)?;

        let component = self.component.clone();
        let id = component.identity();
        let name = intent.name.as_str();

        let target_group = scope.declare_with_id(
            id.logical_id(&format!("{name}-targetGroup")),
            Resource::TargetGroup(TargetGroup {
                network: self.network.clone(),
                port: Port::HTTP,
                protocol: Protocol::Http,
                target_type: TargetType::Ip,
                health_check: HealthCheck {
                    path: intent.health_check_path.clone(),
                    port: intent.port,
                },
                deregistration_delay: DEREGISTRATION_DELAY,
            }),
        )?;

        let listener_rule = scope.declare_with_id(
            id.logical_id(&format!("{name}-listenerRule")),
            Resource::ListenerRule(ListenerRule {
                listener: self.ingress.https_listener.clone(),
                priority: intent.priority,
                conditions: intent.routing_conditions.clone(),
                action: ListenerAction::Forward {
                    target_group: target_group.clone(),
                },
            }),
        )?;

        self.priorities.insert(intent.priority, intent.name.clone());
        self.services.insert(intent.name.clone());

        let repository = scope.declare_with_id(
            id.logical_id(&format!("{name}-repository")),
            Resource::Repository(Repository {
                max_image_count: MAX_IMAGE_COUNT,
                image_scan_on_push: true,
                removal_policy: RemovalPolicy::Destroy,
            }),
        )?;

        let log_group = scope.declare_with_id(
            id.logical_id(&format!("{name}-logGroup")),
            Resource::LogGroup(LogGroup {
                name: id.build(name),
                retention: RetentionDays::OneMonth,
                removal_policy: RemovalPolicy::Destroy,
            }),
        )?;

        let container_name = id.build(&format!("{name}-container"));
        let mut task = TaskDefinition::new(
            id.build(name),
            intent.effective_cpu(),
            intent.effective_memory(),
        );
        task.add_container(ContainerDefinition {
            name: container_name.clone(),
            image: repository.clone(),
            essential: true,
            environment: intent.environment_variables.clone(),
            secrets: container_secrets.clone(),
            port_mappings: vec![intent.port],
            logging: LogConfiguration {
                log_group: log_group.clone(),
                stream_prefix: id.build(name),
            },
        });
        let task_definition = scope.declare_with_id(
            id.logical_id(&format!("{name}-taskDefinition")),
            Resource::TaskDefinition(task),
        )?;

        let service = scope.declare_with_id(
            id.logical_id(&format!("{name}-service")),
            Resource::Service(Service {
                name: id.build(name),
                cluster: self.cluster.clone(),
                task_definition: task_definition.clone(),
                desired_count: intent.desired_count,
                target_groups: vec![TargetGroupAttachment {
                    target_group: target_group.clone(),
                    container_name,
                    container_port: intent.port,
                }],
            }),
        )?;

        let scaling_policy = match &intent.auto_scaling {
            Some(scaling) => Some(scope.declare_with_id(
                id.logical_id(&format!("{name}-scaling")),
                Resource::ScalingPolicy(ScalingPolicy {
                    service: service.clone(),
                    min_capacity: scaling.minimum_tasks,
                    max_capacity: scaling.maximum_tasks,
                    cpu_target_percent: scaling.cpu_target_percent,
                    scale_in_cooldown: scaling.cooldown,
                    scale_out_cooldown: scaling.cooldown,
                }),
            )?),
            None => None,
        };

        // Each service may only pull its own image.
        scope.grant(Grant::ImagePull {
            repository: repository.clone(),
            task_definition: task_definition.clone(),
        })?;
        let secret_handles: BTreeSet<&ResourceHandle> =
            container_secrets.values().map(|s| &s.secret).collect();
        for secret in secret_handles {
            scope.grant(Grant::SecretRead {
                secret: secret.clone(),
                task_definition: task_definition.clone(),
            })?;
        }
        scope.grant(Grant::NetworkIngress {
            source: service.clone(),
            destination: self.ingress.load_balancer.clone(),
            port: Port::HTTP,
        })?;

        info!(
            service_id = %service.id(),
            desired_count = intent.desired_count,
            autoscaling = scaling_policy.is_some(),
            "Service created"
        );

        Ok(ServiceHandle {
            name: intent.name.clone(),
            service,
            target_group,
            listener_rule,
            repository,
            task_definition,
            log_group,
            scaling_policy,
        })
    }

    fn check_unique(&self, intent: &ServiceIntent) -> Result<(), TopologyError> {
        if self.services.contains(&intent.name) {
            return Err(TopologyError::DuplicateServiceName {
                service: intent.name.clone(),
            });
        }
        if let Some(existing) = self.priorities.get(&intent.priority) {
            return Err(TopologyError::DuplicatePriority {
                service: intent.name.clone(),
                priority: intent.priority,
                existing: existing.clone(),
            });
        }
        Ok(())
    }
}

fn resolve_secrets(
    intent: &ServiceIntent,
    secrets: &dyn SecretStore,
) -> Result<BTreeMap<String, SecretReference>, TopologyError> {
    intent
        .environment_secrets
        .iter()
        .map(|(key, name)| {
            secrets
                .resolve(name)
                .map(|reference| (key.clone(), reference))
                .ok_or_else(|| TopologyError::UnknownSecret {
                    service: intent.name.clone(),
                    secret: name.clone(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        AutoScalingConfig, EnvironmentProps, ExternalResource, LogicalId, ProviderError,
        RoutingCondition, SecretName,
    };

    /// Records declarations in order; rejects only duplicate ids.
    #[derive(Debug, Default)]
    struct RecordingProvider {
        resources: Vec<(LogicalId, Resource)>,
        grants: Vec<Grant>,
    }

    impl ResourceProvider for RecordingProvider {
        fn declare(
            &mut self,
            id: LogicalId,
            resource: Resource,
        ) -> Result<ResourceHandle, ProviderError> {
            if self.resources.iter().any(|(existing, _)| existing == &id) {
                return Err(ProviderError::DuplicateLogicalId { id });
            }
            let handle = ResourceHandle::new(id.clone(), resource.kind());
            self.resources.push((id, resource));
            Ok(handle)
        }

        fn grant(&mut self, grant: Grant) -> Result<(), ProviderError> {
            self.grants.push(grant);
            Ok(())
        }

        fn resource(&self, id: &LogicalId) -> Option<&Resource> {
            self.resources.iter().find(|(existing, _)| existing == id).map(|(_, r)| r)
        }
    }

    fn environment() -> BaseEnvironment<RecordingProvider> {
        BaseEnvironment::new(EnvironmentProps::new("modus", "nprd"), RecordingProvider::default())
    }

    fn declare_network(env: &mut BaseEnvironment<RecordingProvider>) -> ResourceHandle {
        env.declare(
            "vpc",
            Resource::External(ExternalResource {
                kind: ResourceKind::Network,
                properties: serde_json::json!({ "cidr": "10.10.0.0/16" }),
                references: Vec::new(),
            }),
        )
        .unwrap()
    }

    fn builder(env: &mut BaseEnvironment<RecordingProvider>) -> ServiceTopologyBuilder {
        let network = declare_network(env);
        let component = env.component();
        ServiceTopologyBuilder::new(env, TopologyProps { component, network }).unwrap()
    }

    fn intent(name: &str, priority: u32) -> ServiceIntent {
        ServiceIntent::new(
            ServiceName::new(name).unwrap(),
            RulePriority::new(priority).unwrap(),
            Port::new(8000).unwrap(),
            "/health",
        )
        .with_condition(RoutingCondition::host_headers([format!("{name}.example.com")]))
    }

    fn no_secrets() -> BTreeMap<SecretName, SecretReference> {
        BTreeMap::new()
    }

    fn kinds(env: &BaseEnvironment<RecordingProvider>) -> Vec<ResourceKind> {
        env.provider().resources.iter().map(|(_, r)| r.kind()).collect()
    }

    #[test]
    fn test_non_network_handle_fails_without_declaring_anything() {
        let mut env = environment();
        let media = LogicalId::new("modus-nprd-media").unwrap();
        let bucket = ResourceHandle::new(media, ResourceKind::Bucket);
        let component = env.component();

        let err = ServiceTopologyBuilder::new(
            &mut env,
            TopologyProps {
                component,
                network: bucket,
            },
        )
        .unwrap_err();

        assert!(matches!(err, TopologyError::InvalidNetwork { kind: ResourceKind::Bucket, .. }));
        assert!(env.provider().resources.is_empty());
    }

    #[test]
    fn test_new_declares_ingress_then_cluster() {
        let mut env = environment();
        let topology = builder(&mut env);

        assert_eq!(
            kinds(&env),
            vec![
                ResourceKind::Network,
                ResourceKind::LoadBalancer,
                ResourceKind::Listener,
                ResourceKind::Listener,
                ResourceKind::Cluster,
            ]
        );
        assert_eq!(
            topology.shared_ingress().load_balancer().id().as_str(),
            "modus-nprd-loadBalancer"
        );
        assert_eq!(topology.cluster().id().as_str(), "modus-nprd-cluster");

        match env.provider().resource(topology.shared_ingress().http_listener().id()) {
            Some(Resource::Listener(listener)) => {
                assert_eq!(listener.default_action, ListenerAction::redirect_to_https());
            }
            other => panic!("unexpected http listener: {other:?}"),
        }
        match env.provider().resource(topology.shared_ingress().https_listener().id()) {
            Some(Resource::Listener(listener)) => {
                assert_eq!(listener.port, Port::HTTPS);
                assert_eq!(
                    listener.default_action,
                    ListenerAction::FixedResponse { status_code: 501 }
                );
            }
            other => panic!("unexpected https listener: {other:?}"),
        }
    }

    #[test]
    fn test_create_service_derives_named_resources_and_grants() {
        let mut env = environment();
        let mut topology = builder(&mut env);

        let handle = topology.create_service(&mut env, &intent("api", 1), &no_secrets()).unwrap();

        assert_eq!(handle.service().id().as_str(), "modus-nprd-api-service");
        assert_eq!(handle.target_group().id().as_str(), "modus-nprd-api-targetGroup");
        assert_eq!(handle.listener_rule().id().as_str(), "modus-nprd-api-listenerRule");
        assert_eq!(handle.repository().id().as_str(), "modus-nprd-api-repository");
        assert!(handle.scaling_policy().is_none());

        let grants = &env.provider().grants;
        assert_eq!(grants.len(), 2);
        assert!(grants.contains(&Grant::NetworkIngress {
            source: handle.service().clone(),
            destination: topology.shared_ingress().load_balancer().clone(),
            port: Port::HTTP,
        }));
        assert!(grants.contains(&Grant::ImagePull {
            repository: handle.repository().clone(),
            task_definition: handle.task_definition().clone(),
        }));
        assert_eq!(topology.services().map(ServiceName::as_str).collect::<Vec<_>>(), vec!["api"]);
    }

    #[test]
    fn test_task_definition_applies_defaults_and_logging() {
        let mut env = environment();
        let mut topology = builder(&mut env);
        let service = intent("api", 1).with_environment_variable("PORT", "8000");

        let handle = topology.create_service(&mut env, &service, &no_secrets()).unwrap();

        let Some(Resource::TaskDefinition(task)) =
            env.provider().resource(handle.task_definition().id())
        else {
            panic!("task definition missing");
        };
        assert_eq!(task.family, "modus-nprd-api");
        assert_eq!((task.cpu, task.memory_mib), (256, 512));
        let container = &task.containers[0];
        assert!(container.essential);
        assert_eq!(container.image, *handle.repository());
        assert_eq!(container.port_mappings, vec![Port::new(8000).unwrap()]);
        assert_eq!(container.environment.get("PORT").map(String::as_str), Some("8000"));
        assert_eq!(container.logging.log_group, *handle.log_group());
        assert_eq!(container.logging.stream_prefix, "modus-nprd-api");
    }

    #[test]
    fn test_autoscaling_defaults_to_fifty_percent_and_five_minutes() {
        let mut env = environment();
        let mut topology = builder(&mut env);
        let service = intent("api", 1).with_auto_scaling(AutoScalingConfig::new(1, 3));

        let handle = topology.create_service(&mut env, &service, &no_secrets()).unwrap();

        let policy_id = handle.scaling_policy().unwrap().id().clone();
        let Some(Resource::ScalingPolicy(policy)) = env.provider().resource(&policy_id) else {
            panic!("scaling policy missing");
        };
        assert_eq!((policy.min_capacity, policy.max_capacity), (1, 3));
        assert_eq!(policy.cpu_target_percent, 50);
        assert_eq!(policy.scale_in_cooldown, Duration::from_secs(300));
        assert_eq!(policy.scale_out_cooldown, Duration::from_secs(300));
    }

    #[test]
    fn test_duplicate_priority_is_rejected_before_declaring() {
        let mut env = environment();
        let mut topology = builder(&mut env);
        topology.create_service(&mut env, &intent("api", 1), &no_secrets()).unwrap();
        let declared = env.provider().resources.len();

        let err = topology.create_service(&mut env, &intent("web", 1), &no_secrets()).unwrap_err();

        match err {
            TopologyError::DuplicatePriority { service, existing, .. } => {
                assert_eq!(service.as_str(), "web");
                assert_eq!(existing.as_str(), "api");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(env.provider().resources.len(), declared);
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let mut env = environment();
        let mut topology = builder(&mut env);
        topology.create_service(&mut env, &intent("api", 1), &no_secrets()).unwrap();

        let err = topology.create_service(&mut env, &intent("api", 2), &no_secrets()).unwrap_err();
        assert!(matches!(err, TopologyError::DuplicateServiceName { .. }));
    }

    #[test]
    fn test_secrets_are_resolved_by_name_and_granted_once() {
        let mut env = environment();
        let mut topology = builder(&mut env);
        let secret = env
            .declare(
                "api-token",
                Resource::External(ExternalResource {
                    kind: ResourceKind::Secret,
                    properties: serde_json::json!({}),
                    references: Vec::new(),
                }),
            )
            .unwrap();
        let token = SecretName::new("api-token").unwrap();
        let mut store = BTreeMap::new();
        store.insert(token.clone(), SecretReference::whole(secret.clone()));

        let service = intent("api", 1)
            .with_environment_secret("TOKEN", token.clone())
            .with_environment_secret("TOKEN_COPY", token);
        let handle = topology.create_service(&mut env, &service, &store).unwrap();

        let reads = env
            .provider()
            .grants
            .iter()
            .filter(|g| matches!(g, Grant::SecretRead { .. }))
            .count();
        assert_eq!(reads, 1);
        let Some(Resource::TaskDefinition(task)) =
            env.provider().resource(handle.task_definition().id())
        else {
            panic!("task definition missing");
        };
        assert_eq!(task.containers[0].secrets["TOKEN"].secret, secret);
    }

    #[test]
    fn test_unknown_secret_aborts_the_call() {
        let mut env = environment();
        let mut topology = builder(&mut env);
        let service =
            intent("api", 1).with_environment_secret("DB", SecretName::new("database").unwrap());

        let err = topology.create_service(&mut env, &service, &no_secrets()).unwrap_err();

        assert!(matches!(
            err,
            TopologyError::UnknownSecret { ref secret, .. } if secret.as_str() == "database"
        ));
        assert_eq!(topology.services().count(), 0);
    }

    #[test]
    fn test_create_service_declares_expected_properties() {
        let mut env = environment();
        let mut topology = builder(&mut env);
        let service = intent("api", 7).with_desired_count(3);

        let handle = topology.create_service(&mut env, &service, &no_secrets()).unwrap();
        let provider = env.provider();

        let Some(Resource::TargetGroup(tg)) = provider.resource(handle.target_group().id()) else {
            panic!("target group missing");
        };
        assert_eq!(tg.port, Port::HTTP);
        assert_eq!(tg.protocol, Protocol::Http);
        assert_eq!(tg.target_type, TargetType::Ip);
        assert_eq!(tg.deregistration_delay, Duration::from_secs(60));
        assert_eq!(tg.network, *topology.network());
        assert_eq!(
            tg.health_check,
            HealthCheck {
                path: "/health".to_string(),
                port: Port::new(8000).unwrap(),
            }
        );

        let Some(Resource::ListenerRule(rule)) = provider.resource(handle.listener_rule().id())
        else {
            panic!("listener rule missing");
        };
        assert_eq!(rule.listener, *topology.shared_ingress().https_listener());
        assert_eq!(rule.priority, RulePriority::new(7).unwrap());
        assert_eq!(rule.conditions, vec![RoutingCondition::host_headers(["api.example.com"])]);
        assert_eq!(
            rule.action,
            ListenerAction::Forward {
                target_group: handle.target_group().clone()
            }
        );

        let Some(Resource::Repository(repository)) = provider.resource(handle.repository().id())
        else {
            panic!("repository missing");
        };
        assert_eq!(repository.max_image_count, 2);
        assert!(repository.image_scan_on_push);
        assert_eq!(repository.removal_policy, RemovalPolicy::Destroy);

        let Some(Resource::LogGroup(log_group)) = provider.resource(handle.log_group().id()) else {
            panic!("log group missing");
        };
        assert_eq!(log_group.name, "modus-nprd-api");
        assert_eq!(log_group.retention, RetentionDays::OneMonth);
        assert_eq!(log_group.removal_policy, RemovalPolicy::Destroy);

        let Some(Resource::Service(running)) = provider.resource(handle.service().id()) else {
            panic!("service missing");
        };
        assert_eq!(running.name, "modus-nprd-api");
        assert_eq!(running.desired_count, 3);
        assert_eq!(running.cluster, *topology.cluster());
        assert_eq!(running.task_definition, *handle.task_definition());
        assert_eq!(
            running.target_groups,
            vec![TargetGroupAttachment {
                target_group: handle.target_group().clone(),
                container_name: "modus-nprd-api-container".to_string(),
                container_port: Port::new(8000).unwrap(),
            }]
        );
    }

    #[test]
    fn test_unknown_secret_declares_nothing_and_leaves_priority_free() {
        let mut env = environment();
        let mut topology = builder(&mut env);
        let declared = env.provider().resources.len();
        let service =
            intent("api", 1).with_environment_secret("DB", SecretName::new("database").unwrap());

        topology.create_service(&mut env, &service, &no_secrets()).unwrap_err();

        assert_eq!(env.provider().resources.len(), declared);
        let web = topology.create_service(&mut env, &intent("web", 1), &no_secrets()).unwrap();
        assert_eq!(web.listener_rule().id().as_str(), "modus-nprd-web-listenerRule");
        topology.create_service(&mut env, &intent("api", 2), &no_secrets()).unwrap();
    }

    #[test]
    fn test_priority_stays_claimed_after_late_provider_failure() {
        let mut env = environment();
        let mut topology = builder(&mut env);
        env.declare(
            "api-repository",
            Resource::Repository(Repository {
                max_image_count: 1,
                image_scan_on_push: false,
                removal_policy: RemovalPolicy::Destroy,
            }),
        )
        .unwrap();

        let err = topology.create_service(&mut env, &intent("api", 1), &no_secrets()).unwrap_err();
        assert!(matches!(err, TopologyError::Provider(ProviderError::DuplicateLogicalId { .. })));
        let declared = env.provider().resources.len();

        let err = topology.create_service(&mut env, &intent("web", 1), &no_secrets()).unwrap_err();
        assert!(matches!(
            err,
            TopologyError::DuplicatePriority { ref existing, .. } if existing.as_str() == "api"
        ));
        let err = topology.create_service(&mut env, &intent("api", 2), &no_secrets()).unwrap_err();
        assert!(matches!(err, TopologyError::DuplicateServiceName { .. }));
        assert_eq!(env.provider().resources.len(), declared);
    }

    #[test]
    fn test_components_share_one_identity() {
        let env = environment();
        assert!(env.component().shares_identity_with(&env.component()));
    }
}

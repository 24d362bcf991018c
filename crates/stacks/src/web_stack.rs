//! Assembly of one complete web environment from an [`EnvironmentConfig`].

use graph::{Manifest, ResourceGraph};
use topology::{
    BaseEnvironment, IdentityBuilder, SecretName, ServiceHandle, ServiceName,
    ServiceTopologyBuilder, SynthesisRunId, TopologyProps,
};
use tracing::instrument;

use crate::config::{EnvironmentConfig, DATABASE_SECRET};
use crate::{
    ContentDistribution, MediaBucket, Network, SecretRegistry, ServerlessDatabase, StackError,
};

/// Tag naming the application on every resource.
pub const CLIENT_TAG: &str = "Client";

/// Tag naming the environment on every resource.
pub const ENVIRONMENT_TAG: &str = "Environment";

/// A fully declared environment: network, storage, database, secrets, the
/// service topology with every configured service, and the CDN.
#[derive(Debug)]
pub struct WebEnvironmentStack {
    environment: BaseEnvironment<ResourceGraph>,
    network: Network,
    media: MediaBucket,
    database: ServerlessDatabase,
    secrets: SecretRegistry,
    topology: ServiceTopologyBuilder,
    services: Vec<ServiceHandle>,
    cdn: ContentDistribution,
}

impl WebEnvironmentStack {
    /// Validates `config` and declares the whole environment into a fresh
    /// [`ResourceGraph`].
    ///
    /// Services are created in configuration order. The first failure aborts
    /// the build; the partially populated graph is dropped with it.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::InvalidConfig`] for a malformed config and
    /// [`StackError::Topology`] for duplicate names or priorities and
    /// unresolvable secrets.
    #[instrument(
        skip_all,
        fields(
            app = %config.environment.app_name,
            environment = %config.environment.environment
        )
    )]
    pub fn build(config: &EnvironmentConfig) -> Result<Self, StackError> {
        config.validate()?;

        let mut environment =
            BaseEnvironment::new(config.environment.clone(), ResourceGraph::new());
        let component = environment.component();

        let network = Network::new(&mut environment, &component, &config.network)?;
        let media = MediaBucket::new(&mut environment, &component)?;
        let database = ServerlessDatabase::new(
            &mut environment,
            &component,
            network.handle(),
            &config.database,
        )?;

        let mut secrets = SecretRegistry::new();
        if let Some(name) = SecretName::new(DATABASE_SECRET) {
            secrets.register(name, database.secret());
        }
        for secret in &config.secrets {
            let name = SecretName::new(secret.name.clone())
                .ok_or_else(|| StackError::invalid("secrets", "secret name must not be empty"))?;
            secrets.create(&mut environment, &component, name)?;
        }

        let mut topology = ServiceTopologyBuilder::new(
            &mut environment,
            TopologyProps {
                component: component.clone(),
                network: network.handle().clone(),
            },
        )?;

        let mut services = Vec::with_capacity(config.services.len());
        for service in &config.services {
            let intent = service.to_intent()?;
            let handle = topology.create_service(&mut environment, &intent, &secrets)?;
            if service.database_access {
                database.allow_default_port_from(&mut environment, &handle)?;
            }
            services.push(handle);
        }

        let cdn = ContentDistribution::new(
            &mut environment,
            &component,
            topology.shared_ingress(),
            media.handle(),
            &config.cdn,
        )?;

        let graph = environment.provider_mut();
        graph.add_tag(CLIENT_TAG, config.environment.app_name.clone());
        graph.add_tag(ENVIRONMENT_TAG, config.environment.environment.clone());

        tracing::info!(
            resources = environment.provider().len(),
            grants = environment.provider().grants().len(),
            services = services.len(),
            "Environment assembled"
        );

        Ok(Self {
            environment,
            network,
            media,
            database,
            secrets,
            topology,
            services,
            cdn,
        })
    }

    pub fn identity(&self) -> &IdentityBuilder {
        self.environment.identity()
    }

    pub fn graph(&self) -> &ResourceGraph {
        self.environment.provider()
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn media(&self) -> &MediaBucket {
        &self.media
    }

    pub fn database(&self) -> &ServerlessDatabase {
        &self.database
    }

    pub fn secrets(&self) -> &SecretRegistry {
        &self.secrets
    }

    pub fn topology(&self) -> &ServiceTopologyBuilder {
        &self.topology
    }

    pub fn cdn(&self) -> &ContentDistribution {
        &self.cdn
    }

    /// Services in creation order.
    pub fn services(&self) -> &[ServiceHandle] {
        &self.services
    }

    pub fn service(&self, name: &ServiceName) -> Option<&ServiceHandle> {
        self.services.iter().find(|s| s.name() == name)
    }

    /// Renders the graph into a manifest named after the environment.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Graph`] if a resource cannot be rendered.
    pub fn synthesize(&self, run_id: SynthesisRunId) -> Result<Manifest, StackError> {
        Ok(Manifest::synthesize(self.graph(), self.identity().name(), run_id)?)
    }
}

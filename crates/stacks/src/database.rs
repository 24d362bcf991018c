//! Serverless Aurora MySQL cluster and its generated credentials.

use serde::Serialize;
use topology::{
    BaseComponent, BaseEnvironment, Grant, Port, ResourceHandle, ResourceKind, ResourceProvider,
    SecretReference, ServiceHandle,
};

use crate::config::DatabaseConfig;
use crate::{external, StackError};

const ENGINE: &str = "aurora-mysql";

#[derive(Debug, Serialize)]
struct CredentialsProperties {
    generated: bool,
    username: &'static str,
}

#[derive(Debug, Serialize)]
struct ClusterProperties<'a> {
    engine: &'static str,
    engine_version: &'a str,
    network: &'a ResourceHandle,
    credentials: &'a ResourceHandle,
    port: Port,
    min_capacity: u32,
    max_capacity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    auto_pause_seconds: Option<u64>,
}

/// A serverless database cluster inside the environment's network.
///
/// Nothing can reach the cluster until a service is admitted with
/// [`allow_default_port_from`](Self::allow_default_port_from).
#[derive(Debug, Clone)]
pub struct ServerlessDatabase {
    cluster: ResourceHandle,
    credentials: ResourceHandle,
}

impl ServerlessDatabase {
    /// Declares the credentials secret (`build("SrvDbCluster-secret")`) and
    /// the cluster (`build("SrvDbCluster")`).
    ///
    /// # Errors
    ///
    /// Propagates provider rejections, including a `network` handle that is
    /// not in the graph.
    pub fn new<P: ResourceProvider>(
        scope: &mut BaseEnvironment<P>,
        component: &BaseComponent,
        network: &ResourceHandle,
        config: &DatabaseConfig,
    ) -> Result<Self, StackError> {
        let identity = component.identity();

        let secret = external(
            ResourceKind::Secret,
            &CredentialsProperties {
                generated: true,
                username: "admin",
            },
            Vec::new(),
        )?;
        let credentials =
            scope.declare_with_id(identity.logical_id("SrvDbCluster-secret"), secret)?;

        let properties = ClusterProperties {
            engine: ENGINE,
            engine_version: &config.engine_version,
            network,
            credentials: &credentials,
            port: Port::MYSQL,
            min_capacity: config.min_capacity,
            max_capacity: config.max_capacity,
            auto_pause_seconds: config.auto_pause().map(|d| d.as_secs()),
        };
        let cluster = external(
            ResourceKind::Database,
            &properties,
            vec![network.clone(), credentials.clone()],
        )?;
        let cluster = scope.declare_with_id(identity.logical_id("SrvDbCluster"), cluster)?;

        tracing::info!(cluster = %cluster.id(), "Serverless database declared");
        Ok(Self { cluster, credentials })
    }

    pub fn handle(&self) -> &ResourceHandle {
        &self.cluster
    }

    /// The generated credentials, for injection into containers.
    pub fn secret(&self) -> SecretReference {
        SecretReference::whole(self.credentials.clone())
    }

    /// Admits `service` to the cluster on the MySQL port.
    ///
    /// # Errors
    ///
    /// Propagates provider rejections.
    pub fn allow_default_port_from<P: ResourceProvider>(
        &self,
        scope: &mut BaseEnvironment<P>,
        service: &ServiceHandle,
    ) -> Result<(), StackError> {
        scope.grant(Grant::NetworkIngress {
            source: service.service().clone(),
            destination: self.cluster.clone(),
            port: Port::MYSQL,
        })?;
        Ok(())
    }
}

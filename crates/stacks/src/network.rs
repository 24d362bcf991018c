//! The VPC every other resource is placed in.

use serde::Serialize;
use topology::{BaseComponent, BaseEnvironment, ResourceHandle, ResourceKind, ResourceProvider};

use crate::config::NetworkConfig;
use crate::{external, StackError};

#[derive(Debug, Serialize)]
struct VpcProperties<'a> {
    name: &'a str,
    cidr: &'a str,
    max_azs: u32,
    nat_gateways: u32,
}

/// A VPC named after the environment.
#[derive(Debug, Clone)]
pub struct Network {
    handle: ResourceHandle,
}

impl Network {
    /// Declares the VPC under `build("vpc")`.
    ///
    /// # Errors
    ///
    /// Propagates provider rejections.
    pub fn new<P: ResourceProvider>(
        scope: &mut BaseEnvironment<P>,
        component: &BaseComponent,
        config: &NetworkConfig,
    ) -> Result<Self, StackError> {
        let identity = component.identity();
        let properties = VpcProperties {
            name: identity.name(),
            cidr: &config.cidr,
            max_azs: config.max_azs,
            nat_gateways: config.nat_gateways,
        };
        let resource = external(ResourceKind::Network, &properties, Vec::new())?;
        let handle = scope.declare_with_id(identity.logical_id("vpc"), resource)?;
        Ok(Self { handle })
    }

    pub fn handle(&self) -> &ResourceHandle {
        &self.handle
    }
}

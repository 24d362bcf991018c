//! Ownership roots for naming: [`BaseEnvironment`] creates the
//! [`IdentityBuilder`], [`BaseComponent`] receives it.
//!
//! The builder is passed explicitly down the construction chain. There is no
//! process-wide instance; a component only ever names resources through the
//! builder its parent handed it.

use std::sync::Arc;

use crate::{
    EnvironmentProps, Grant, IdentityBuilder, LogicalId, ProviderError, Resource, ResourceHandle,
    ResourceProvider,
};

/// The root of one environment: owns the naming authority and the resource
/// provider every nested component declares into.
#[derive(Debug)]
pub struct BaseEnvironment<P> {
    identity: Arc<IdentityBuilder>,
    provider: P,
}

impl<P: ResourceProvider> BaseEnvironment<P> {
    /// Creates the environment and its [`IdentityBuilder`].
    pub fn new(props: EnvironmentProps, provider: P) -> Self {
        let identity = Arc::new(IdentityBuilder::new(&props));
        tracing::debug!(environment = identity.name(), "Environment created");
        Self { identity, provider }
    }

    /// The shared naming authority.
    pub fn identity(&self) -> &Arc<IdentityBuilder> {
        &self.identity
    }

    /// Hands the naming authority down to a nested component.
    pub fn component(&self) -> BaseComponent {
        BaseComponent::new(Arc::clone(&self.identity))
    }

    /// Declares `resource` under `build(suffix)`.
    ///
    /// # Errors
    ///
    /// Propagates the provider's rejection.
    pub fn declare(
        &mut self,
        suffix: &str,
        resource: Resource,
    ) -> Result<ResourceHandle, ProviderError> {
        let id = self.identity.logical_id(suffix);
        self.declare_with_id(id, resource)
    }

    /// Declares `resource` under an id a component derived itself.
    ///
    /// # Errors
    ///
    /// Propagates the provider's rejection.
    pub fn declare_with_id(
        &mut self,
        id: LogicalId,
        resource: Resource,
    ) -> Result<ResourceHandle, ProviderError> {
        let kind = resource.kind();
        match self.provider.declare(id.clone(), resource) {
            Ok(handle) => {
                tracing::debug!(id = %id, kind = %kind, "Resource declared");
                Ok(handle)
            }
            Err(err) => {
                tracing::warn!(
                    id = %id,
                    kind = %kind,
                    error = %err,
                    "Resource declaration rejected"
                );
                Err(err)
            }
        }
    }

    /// Records a permission grant.
    ///
    /// # Errors
    ///
    /// Propagates the provider's rejection.
    pub fn grant(&mut self, grant: Grant) -> Result<(), ProviderError> {
        let (grantee, target) = grant.endpoints();
        let (grantee, target) = (grantee.clone(), target.clone());
        match self.provider.grant(grant) {
            Ok(()) => {
                tracing::debug!(grantee = %grantee, target = %target, "Grant recorded");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(
                    grantee = %grantee,
                    target = %target,
                    error = %err,
                    "Grant rejected"
                );
                Err(err)
            }
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }
}

/// A nested unit of an environment.
///
/// Never constructs its own [`IdentityBuilder`]; it holds a shared reference
/// to the one created by its [`BaseEnvironment`], so every name it derives
/// carries the environment's prefix.
#[derive(Debug, Clone)]
pub struct BaseComponent {
    identity: Arc<IdentityBuilder>,
}

impl BaseComponent {
    pub fn new(identity: Arc<IdentityBuilder>) -> Self {
        Self { identity }
    }

    pub fn identity(&self) -> &IdentityBuilder {
        &self.identity
    }

    /// Returns `true` if both components name resources through the same builder.
    pub fn shares_identity_with(&self, other: &BaseComponent) -> bool {
        Arc::ptr_eq(&self.identity, &other.identity)
    }
}

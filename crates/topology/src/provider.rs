//! Port traits for the collaborators the topology consumes.
//!
//! The topology never creates infrastructure itself. It declares resources and
//! grants through a [`ResourceProvider`] (the provisioning engine's view of
//! the graph) and resolves secrets by name through a [`SecretStore`].
//! Infrastructure crates implement these traits; this crate never sees how.

use std::collections::BTreeMap;

use crate::{Grant, LogicalId, ProviderError, Resource, ResourceHandle, SecretName, SecretReference};

/// Records resource declarations and permission grants.
///
/// Implementations must reject a declaration whose logical id is already
/// taken, whose references are not in the graph, or which is a listener rule
/// reusing a priority already present on its listener. A rejected
/// declaration leaves the graph unchanged.
pub trait ResourceProvider {
    /// Records `resource` under `id` and returns a handle to it.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] when the declaration is rejected.
    fn declare(
        &mut self,
        id: LogicalId,
        resource: Resource,
    ) -> Result<ResourceHandle, ProviderError>;

    /// Records a permission edge between two declared resources.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] when either endpoint is unknown or the
    /// endpoint kinds do not fit the grant.
    fn grant(&mut self, grant: Grant) -> Result<(), ProviderError>;

    /// Returns the resource declared under `id`, if any.
    fn resource(&self, id: &LogicalId) -> Option<&Resource>;
}

/// Supplies secret references by name.
///
/// Looked up once per secret when a container is built. Callers do not cache
/// the result.
pub trait SecretStore {
    fn resolve(&self, name: &SecretName) -> Option<SecretReference>;
}

impl SecretStore for BTreeMap<SecretName, SecretReference> {
    fn resolve(&self, name: &SecretName) -> Option<SecretReference> {
        self.get(name).cloned()
    }
}

//! Named secrets available to service containers.

use std::collections::BTreeMap;

use serde::Serialize;
use topology::{
    BaseComponent, BaseEnvironment, ResourceHandle, ResourceKind, ResourceProvider, SecretName,
    SecretReference, SecretStore,
};

use crate::{external, StackError};

#[derive(Debug, Serialize)]
struct GeneratedSecretProperties<'a> {
    name: &'a str,
    generated: bool,
}

/// Maps secret names to the secret resources declared for them.
///
/// Filled before services are created and consulted by the topology builder
/// when each container is built.
#[derive(Debug, Clone, Default)]
pub struct SecretRegistry {
    secrets: BTreeMap<SecretName, SecretReference>,
}

impl SecretRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a generated secret under `build(name)` and registers it.
    ///
    /// # Errors
    ///
    /// Propagates provider rejections, e.g. a second secret with the same name.
    pub fn create<P: ResourceProvider>(
        &mut self,
        scope: &mut BaseEnvironment<P>,
        component: &BaseComponent,
        name: SecretName,
    ) -> Result<ResourceHandle, StackError> {
        let identity = component.identity();
        let secret_name = identity.build(name.as_str());
        let resource = external(
            ResourceKind::Secret,
            &GeneratedSecretProperties {
                name: &secret_name,
                generated: true,
            },
            Vec::new(),
        )?;
        let handle = scope.declare_with_id(identity.logical_id(name.as_str()), resource)?;
        self.register(name, SecretReference::whole(handle.clone()));
        Ok(handle)
    }

    /// Makes an already-declared secret resolvable under `name`.
    pub fn register(&mut self, name: SecretName, reference: SecretReference) {
        self.secrets.insert(name, reference);
    }

    pub fn names(&self) -> impl Iterator<Item = &SecretName> {
        self.secrets.keys()
    }
}

impl SecretStore for SecretRegistry {
    fn resolve(&self, name: &SecretName) -> Option<SecretReference> {
        let reference = self.secrets.get(name).cloned();
        if reference.is_none() {
            tracing::debug!(secret = %name, "Secret not registered");
        }
        reference
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph::ResourceGraph;
    use topology::EnvironmentProps;

    #[test]
    fn test_created_secret_resolves_to_its_declaration() {
        let props = EnvironmentProps::new("modus", "nprd");
        let mut env = BaseEnvironment::new(props, ResourceGraph::new());
        let component = env.component();
        let mut registry = SecretRegistry::new();

        let handle = registry
            .create(&mut env, &component, SecretName::new("api-token").unwrap())
            .unwrap();

        assert_eq!(handle.id().as_str(), "modus-nprd-api-token");
        assert_eq!(
            registry.resolve(&SecretName::new("api-token").unwrap()),
            Some(SecretReference::whole(handle))
        );
        assert_eq!(registry.resolve(&SecretName::new("other").unwrap()), None);
    }

    #[test]
    fn test_same_name_twice_is_rejected_by_provider() {
        let props = EnvironmentProps::new("modus", "nprd");
        let mut env = BaseEnvironment::new(props, ResourceGraph::new());
        let component = env.component();
        let mut registry = SecretRegistry::new();
        let name = SecretName::new("api-token").unwrap();

        registry.create(&mut env, &component, name.clone()).unwrap();
        let err = registry.create(&mut env, &component, name).unwrap_err();

        assert!(matches!(
            err,
            StackError::Provider(topology::ProviderError::DuplicateLogicalId { .. })
        ));
        assert_eq!(registry.names().count(), 1);
    }
}

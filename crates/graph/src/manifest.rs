//! Synthesized output: the JSON document a provisioning engine consumes.

use std::collections::BTreeMap;

use serde::Serialize;
use topology::{Grant, LogicalId, Resource, ResourceKind, SynthesisRunId, Timestamp};

use crate::{GraphError, ResourceGraph};

/// Schema version of the manifest document.
pub const MANIFEST_VERSION: u32 = 1;

/// One resource as rendered into the manifest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestResource {
    pub logical_id: LogicalId,
    pub kind: ResourceKind,
    pub properties: serde_json::Value,
}

/// A complete, ordered description of one environment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    pub version: u32,
    pub run_id: SynthesisRunId,
    pub generated_at: Timestamp,
    pub environment: String,
    pub tags: BTreeMap<String, String>,
    pub resources: Vec<ManifestResource>,
    pub grants: Vec<Grant>,
}

impl Manifest {
    /// Renders `graph` for the environment named `environment`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Serialize`] if a resource cannot be rendered.
    pub fn synthesize(
        graph: &ResourceGraph,
        environment: impl Into<String>,
        run_id: SynthesisRunId,
    ) -> Result<Self, GraphError> {
        let resources = graph
            .declarations()
            .iter()
            .map(|declaration| {
                let properties = match &declaration.resource {
                    Resource::External(external) => external.properties.clone(),
                    other => serde_json::to_value(other).map_err(|source| GraphError::Serialize {
                        id: declaration.id.clone(),
                        source,
                    })?,
                };
                Ok(ManifestResource {
                    logical_id: declaration.id.clone(),
                    kind: declaration.resource.kind(),
                    properties,
                })
            })
            .collect::<Result<Vec<_>, GraphError>>()?;

        Ok(Self {
            version: MANIFEST_VERSION,
            run_id,
            generated_at: Timestamp::now(),
            environment: environment.into(),
            tags: graph.tags().clone(),
            resources,
            grants: graph.grants().to_vec(),
        })
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Render`] if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, GraphError> {
        serde_json::to_string_pretty(self).map_err(GraphError::Render)
    }

    /// Looks up a rendered resource by logical id.
    pub fn resource(&self, id: &str) -> Option<&ManifestResource> {
        self.resources.iter().find(|r| r.logical_id.as_str() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topology::{ExternalResource, Repository, RemovalPolicy, ResourceProvider};

    #[test]
    fn test_manifest_keeps_declaration_order_and_tags() {
        let mut graph = ResourceGraph::new();
        graph
            .declare(
                LogicalId::new("modus-nprd-vpc").unwrap(),
                Resource::External(ExternalResource {
                    kind: ResourceKind::Network,
                    properties: serde_json::json!({ "cidr": "10.10.0.0/16" }),
                    references: Vec::new(),
                }),
            )
            .unwrap();
        graph
            .declare(
                LogicalId::new("modus-nprd-api-repository").unwrap(),
                Resource::Repository(Repository {
                    max_image_count: 2,
                    image_scan_on_push: true,
                    removal_policy: RemovalPolicy::Destroy,
                }),
            )
            .unwrap();
        graph.add_tag("Client", "modus");

        let run_id = SynthesisRunId::new_random();
        let manifest = Manifest::synthesize(&graph, "modus-nprd", run_id).unwrap();

        assert_eq!(manifest.run_id, run_id);
        assert_eq!(manifest.resources.len(), 2);
        assert_eq!(manifest.resources[0].properties["cidr"], "10.10.0.0/16");
        let repo = manifest.resource("modus-nprd-api-repository").unwrap();
        assert_eq!(repo.kind, ResourceKind::Repository);
        assert_eq!(repo.properties["max_image_count"], 2);
        assert_eq!(repo.properties["removal_policy"], "destroy");
        assert_eq!(manifest.tags.get("Client").map(String::as_str), Some("modus"));

        let json: serde_json::Value =
            serde_json::from_str(&manifest.to_json_pretty().unwrap()).unwrap();
        assert_eq!(json["version"], MANIFEST_VERSION);
        assert_eq!(json["resources"][1]["kind"], "repository");
    }
}

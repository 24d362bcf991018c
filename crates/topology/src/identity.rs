//! The naming authority shared by every resource in one environment.

use serde::{Deserialize, Serialize};

use crate::LogicalId;

/// Joins the components of every derived name.
pub const SEPARATOR: &str = "-";

/// The three components every environment is named from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentProps {
    /// Application name (e.g. `"modus"`).
    pub app_name: String,
    /// Environment name (e.g. `"nprd"`).
    pub environment: String,
    /// Disambiguator for side-by-side copies of one environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_identifier: Option<String>,
}

impl EnvironmentProps {
    pub fn new(app_name: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            environment: environment.into(),
            unique_identifier: None,
        }
    }

    pub fn with_unique_identifier(mut self, unique_identifier: impl Into<String>) -> Self {
        self.unique_identifier = Some(unique_identifier.into());
        self
    }
}

/// Derives deterministic resource names from an environment's props.
///
/// `name()` is the non-empty components of `[app_name, environment,
/// unique_identifier]` joined by [`SEPARATOR`]; `build(suffix)` appends one
/// more component. Both are pure, so two builders made from equal props
/// always agree. Immutable after construction and shared by reference
/// (see [`crate::BaseComponent`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityBuilder {
    base_id: String,
}

impl IdentityBuilder {
    pub fn new(props: &EnvironmentProps) -> Self {
        let base_id = [
            Some(props.app_name.as_str()),
            Some(props.environment.as_str()),
            props.unique_identifier.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|component| !component.is_empty())
        .collect::<Vec<_>>()
        .join(SEPARATOR);

        Self { base_id }
    }

    /// `name() + SEPARATOR + suffix`.
    pub fn build(&self, suffix: &str) -> String {
        format!("{}{SEPARATOR}{suffix}", self.base_id)
    }

    /// The environment's base name.
    pub fn name(&self) -> &str {
        &self.base_id
    }

    /// [`build`](Self::build) as a [`LogicalId`]. Never empty: the separator
    /// is always present.
    pub fn logical_id(&self, suffix: &str) -> LogicalId {
        LogicalId::from_built(self.build(suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_build_joins_app_environment_and_suffix() {
        let id = IdentityBuilder::new(&EnvironmentProps::new("modus", "nprd"));
        assert_eq!(id.build("vpc"), "modus-nprd-vpc");
        assert_eq!(id.name(), "modus-nprd");
    }

    #[test]
    fn test_unique_identifier_is_appended_when_present() {
        let props = EnvironmentProps::new("modus", "nprd").with_unique_identifier("blue");
        let id = IdentityBuilder::new(&props);
        assert_eq!(id.name(), "modus-nprd-blue");
        assert_eq!(id.build("api-service"), "modus-nprd-blue-api-service");
    }

    #[test]
    fn test_empty_components_are_skipped() {
        let props = EnvironmentProps::new("modus", "").with_unique_identifier("");
        assert_eq!(IdentityBuilder::new(&props).name(), "modus");
    }

    #[test]
    fn test_logical_id_matches_build() {
        let id = IdentityBuilder::new(&EnvironmentProps::new("modus", "nprd"));
        assert_eq!(id.logical_id("cluster").as_str(), id.build("cluster"));
    }

    fn component() -> impl Strategy<Value = String> {
        "[a-z0-9]{0,8}"
    }

    proptest! {
        #[test]
        fn prop_name_is_non_empty_components_in_order(
            app in component(),
            env in component(),
            unique in proptest::option::of(component()),
        ) {
            let mut props = EnvironmentProps::new(app.clone(), env.clone());
            props.unique_identifier = unique.clone();
            let id = IdentityBuilder::new(&props);

            let expected: Vec<&str> = [Some(app.as_str()), Some(env.as_str()), unique.as_deref()]
                .into_iter()
                .flatten()
                .filter(|c| !c.is_empty())
                .collect();
            prop_assert_eq!(id.name(), expected.join("-"));
            let again = IdentityBuilder::new(&props);
            prop_assert_eq!(id.name(), again.name());
        }

        #[test]
        fn prop_distinct_suffixes_build_distinct_names(
            s1 in "[a-zA-Z0-9-]{1,12}",
            s2 in "[a-zA-Z0-9-]{1,12}",
        ) {
            prop_assume!(s1 != s2);
            let id = IdentityBuilder::new(&EnvironmentProps::new("modus", "nprd"));
            prop_assert_ne!(id.build(&s1), id.build(&s2));
        }

        #[test]
        fn prop_equal_props_build_equal_names(suffix in "[a-z-]{1,12}") {
            let props = EnvironmentProps::new("modus", "nprd");
            prop_assert_eq!(
                IdentityBuilder::new(&props).build(&suffix),
                IdentityBuilder::new(&props.clone()).build(&suffix)
            );
        }
    }
}

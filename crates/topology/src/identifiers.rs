//! Newtype domain identifiers.
//!
//! Every named concept in a topology is represented as a distinct newtype
//! wrapping a primitive. This prevents accidentally interchanging, for
//! example, a [`LogicalId`] with a [`ServiceName`] even though both are
//! strings under the hood.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value).ok_or_else(|| format!("{} must not be empty", stringify!($name)))
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

// ---------------------------------------------------------------------------
// String-backed identifiers
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies one declared resource within an environment's resource graph.
    ///
    /// Always produced by [`crate::IdentityBuilder::build`] so that every logical
    /// id in one environment shares the same `app-env[-unique]` prefix.
    LogicalId
}

impl LogicalId {
    /// Wraps a name produced by [`crate::IdentityBuilder::build`], which always
    /// contains the separator.
    pub(crate) fn from_built(value: String) -> Self {
        Self(value)
    }
}

string_id! {
    /// The logical name of a service within one topology (e.g. `"api"`).
    ///
    /// Used as the per-service suffix for every derived resource name, so it
    /// must be unique within the topology.
    ServiceName
}

string_id! {
    /// The name under which a secret is published by the secret store
    /// collaborator (e.g. `"api-token"`, `"database"`).
    SecretName
}

// ---------------------------------------------------------------------------
// UUID-backed identifiers (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single synthesis run (one invocation of the CLI).
///
/// Generated fresh for every run and stamped into the synthesized manifest so
/// log events and output documents from one run can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SynthesisRunId(Uuid);

impl SynthesisRunId {
    /// Generates a new random run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SynthesisRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_identifiers_are_rejected() {
        assert!(LogicalId::new("").is_none());
        assert!(ServiceName::new(String::new()).is_none());
        assert_eq!(SecretName::new("db").map(|s| s.to_string()), Some("db".to_string()));
    }

    #[test]
    fn test_identifiers_deserialize_through_validation() {
        let name: ServiceName = serde_json::from_str("\"api\"").unwrap();
        assert_eq!(name.as_str(), "api");

        let empty: Result<ServiceName, _> = serde_json::from_str("\"\"");
        assert!(empty.is_err());
    }

    #[test]
    fn test_run_ids_are_distinct() {
        assert_ne!(SynthesisRunId::new_random(), SynthesisRunId::new_random());
    }
}

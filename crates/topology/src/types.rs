//! Shared value types for the topology domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaningful values with invariants (ports and rule priorities are strictly
//! positive) and participate in resource derivation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Network values
// ---------------------------------------------------------------------------

/// A TCP port number in `1..=65535`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Port(u16);

impl Port {
    /// Plain HTTP. Target groups and the ingress back-channel use this port.
    pub const HTTP: Port = Port(80);

    /// HTTPS. The secure listener binds here.
    pub const HTTPS: Port = Port(443);

    /// MySQL. Default port of the serverless database.
    pub const MYSQL: Port = Port(3306);

    /// Creates a [`Port`], returning `None` for port zero.
    #[must_use]
    pub fn new(port: u16) -> Option<Self> {
        if port == 0 {
            None
        } else {
            Some(Self(port))
        }
    }

    /// Returns the port number.
    pub fn as_u16(self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for Port {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| "port must be positive".to_string())
    }
}

impl From<Port> for u16 {
    fn from(value: Port) -> Self {
        value.0
    }
}

impl std::fmt::Display for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------

/// Evaluation priority of a routing rule on a listener.
///
/// Lower values are evaluated first. Priorities are a uniqueness domain per
/// listener: two rules on the same listener may never share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct RulePriority(u32);

impl RulePriority {
    /// Creates a [`RulePriority`], returning `None` for zero.
    #[must_use]
    pub fn new(priority: u32) -> Option<Self> {
        if priority == 0 {
            None
        } else {
            Some(Self(priority))
        }
    }

    /// Returns the underlying integer value.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for RulePriority {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| "rule priority must be positive".to_string())
    }
}

impl From<RulePriority> for u32 {
    fn from(value: RulePriority) -> Self {
        value.0
    }
}

impl std::fmt::Display for RulePriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Lifecycle values
// ---------------------------------------------------------------------------

/// What happens to a resource when its environment is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    /// The resource is deleted with the environment.
    Destroy,
}

/// How long a log destination keeps its events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionDays {
    OneWeek,
    OneMonth,
    OneYear,
}

impl RetentionDays {
    /// Returns the retention period in days.
    pub fn as_days(self) -> u32 {
        match self {
            Self::OneWeek => 7,
            Self::OneMonth => 30,
            Self::OneYear => 365,
        }
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

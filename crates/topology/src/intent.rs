//! Per-service intents: the input to
//! [`ServiceTopologyBuilder::create_service`](crate::ServiceTopologyBuilder::create_service).
//!
//! Every recognized option is an explicit field with a documented default;
//! there is no open-ended configuration bag.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Port, RulePriority, SecretName, ServiceName, TopologyError};

/// Task CPU units used when an intent does not specify `cpu`.
pub const DEFAULT_CPU: u32 = 256;

/// Task memory (MiB) used when an intent does not specify `memory`.
pub const DEFAULT_MEMORY_MIB: u32 = 512;

/// CPU utilization target used when autoscaling omits `cpu_target_percent`.
pub const DEFAULT_CPU_TARGET_PERCENT: u32 = 50;

/// Scale-in/scale-out cooldown used when autoscaling omits `cooldown`.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(300);

// ---------------------------------------------------------------------------
// Routing conditions
// ---------------------------------------------------------------------------

/// A request matcher attached to a routing rule.
///
/// All conditions of a rule must match for the rule to apply; the values
/// inside one condition are alternatives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "values", rename_all = "kebab-case")]
pub enum RoutingCondition {
    /// Matches the `Host` header against any of the given names.
    HostHeader(Vec<String>),
    /// Matches the request path against any of the given patterns.
    PathPattern(Vec<String>),
}

impl RoutingCondition {
    /// Host-header condition over `hosts`.
    pub fn host_headers<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::HostHeader(hosts.into_iter().map(Into::into).collect())
    }

    /// Path-pattern condition over `patterns`.
    pub fn path_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::PathPattern(patterns.into_iter().map(Into::into).collect())
    }

    fn values(&self) -> &[String] {
        match self {
            Self::HostHeader(values) | Self::PathPattern(values) => values,
        }
    }
}

// ---------------------------------------------------------------------------
// Autoscaling
// ---------------------------------------------------------------------------

/// CPU-utilization autoscaling bounds for one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoScalingConfig {
    pub minimum_tasks: u32,
    pub maximum_tasks: u32,
    /// Target average CPU utilization, in percent.
    pub cpu_target_percent: u32,
    /// Applied symmetrically to scale-in and scale-out.
    pub cooldown: Duration,
}

impl AutoScalingConfig {
    /// Bounds `[minimum_tasks, maximum_tasks]` with the default CPU target and cooldown.
    pub fn new(minimum_tasks: u32, maximum_tasks: u32) -> Self {
        Self {
            minimum_tasks,
            maximum_tasks,
            cpu_target_percent: DEFAULT_CPU_TARGET_PERCENT,
            cooldown: DEFAULT_COOLDOWN,
        }
    }

    pub fn with_cpu_target_percent(mut self, percent: u32) -> Self {
        self.cpu_target_percent = percent;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }
}

// ---------------------------------------------------------------------------
// Service intent
// ---------------------------------------------------------------------------

/// Everything the topology builder needs to derive one service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceIntent {
    /// Unique within one topology; suffix of every derived resource name.
    pub name: ServiceName,
    /// Unique within one topology; evaluation order on the secure listener.
    pub priority: RulePriority,
    /// Port the container listens on. Also the health-check port.
    pub port: Port,
    pub desired_count: u32,
    /// Must answer `200` without authentication.
    pub health_check_path: String,
    pub routing_conditions: Vec<RoutingCondition>,
    /// Task CPU units; [`DEFAULT_CPU`] when `None`.
    pub cpu: Option<u32>,
    /// Task memory in MiB; [`DEFAULT_MEMORY_MIB`] when `None`.
    pub memory: Option<u32>,
    /// Passed to the container verbatim.
    pub environment_variables: BTreeMap<String, String>,
    /// Environment variable name to the secret whose value it receives.
    ///
    /// Resolved through the [`crate::SecretStore`] when the container is
    /// built, not when the intent is created.
    pub environment_secrets: BTreeMap<String, SecretName>,
    pub auto_scaling: Option<AutoScalingConfig>,
}

impl ServiceIntent {
    /// Creates an intent with one replica, no routing conditions, and every
    /// optional field at its default.
    pub fn new(
        name: ServiceName,
        priority: RulePriority,
        port: Port,
        health_check_path: impl Into<String>,
    ) -> Self {
        Self {
            name,
            priority,
            port,
            desired_count: 1,
            health_check_path: health_check_path.into(),
            routing_conditions: Vec::new(),
            cpu: None,
            memory: None,
            environment_variables: BTreeMap::new(),
            environment_secrets: BTreeMap::new(),
            auto_scaling: None,
        }
    }

    pub fn with_desired_count(mut self, count: u32) -> Self {
        self.desired_count = count;
        self
    }

    pub fn with_condition(mut self, condition: RoutingCondition) -> Self {
        self.routing_conditions.push(condition);
        self
    }

    pub fn with_cpu(mut self, cpu: u32) -> Self {
        self.cpu = Some(cpu);
        self
    }

    pub fn with_memory(mut self, memory_mib: u32) -> Self {
        self.memory = Some(memory_mib);
        self
    }

    pub fn with_environment_variable(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.environment_variables.insert(key.into(), value.into());
        self
    }

    pub fn with_environment_secret(mut self, key: impl Into<String>, secret: SecretName) -> Self {
        self.environment_secrets.insert(key.into(), secret);
        self
    }

    pub fn with_auto_scaling(mut self, config: AutoScalingConfig) -> Self {
        self.auto_scaling = Some(config);
        self
    }

    /// Task CPU units after defaults are applied.
    pub fn effective_cpu(&self) -> u32 {
        self.cpu.unwrap_or(DEFAULT_CPU)
    }

    /// Task memory after defaults are applied.
    pub fn effective_memory(&self) -> u32 {
        self.memory.unwrap_or(DEFAULT_MEMORY_MIB)
    }

    /// Checks the intent's own shape.
    ///
    /// Cross-service constraints (priority and name uniqueness) are checked
    /// by the topology builder, which is the only place that sees every intent.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::InvalidIntent`] describing the first violation.
    pub fn validate(&self) -> Result<(), TopologyError> {
        let invalid = |reason: &str| TopologyError::InvalidIntent {
            service: self.name.clone(),
            reason: reason.to_string(),
        };

        if !self.health_check_path.starts_with('/') {
            return Err(invalid("health check path must start with '/'"));
        }
        if self.routing_conditions.is_empty() {
            return Err(invalid("at least one routing condition is required"));
        }
        if self
            .routing_conditions
            .iter()
            .any(|c| c.values().is_empty() || c.values().iter().any(String::is_empty))
        {
            return Err(invalid("routing conditions must not contain empty matchers"));
        }
        if self.cpu == Some(0) || self.memory == Some(0) {
            return Err(invalid("cpu and memory must be positive"));
        }
        if let Some(scaling) = &self.auto_scaling {
            if scaling.minimum_tasks > scaling.maximum_tasks {
                return Err(invalid("autoscaling minimum_tasks exceeds maximum_tasks"));
            }
            if scaling.maximum_tasks == 0 {
                return Err(invalid("autoscaling maximum_tasks must be positive"));
            }
            if !(1..=100).contains(&scaling.cpu_target_percent) {
                return Err(invalid("autoscaling cpu target must be within 1..=100"));
            }
        }
        Ok(())
    }
}

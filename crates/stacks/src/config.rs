//! Typed environment configuration, loaded from TOML.
//!
//! Every recognized option is an explicit field. Sections other than
//! `[environment]` may be omitted and fall back to the defaults documented on
//! each field. Unknown keys are rejected at parse time.
//!
//! ```toml
//! [environment]
//! app_name = "modus"
//! environment = "nprd"
//!
//! [[secrets]]
//! name = "api-token"
//!
//! [[services]]
//! name = "api"
//! priority = 1
//! port = 8000
//! health_check_path = "/health"
//! hosts = ["api.modus-sandbox.com"]
//! database_access = true
//!
//! [services.secrets]
//! TOKEN = "api-token"
//! DB = "database"
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use topology::{
    AutoScalingConfig, EnvironmentProps, Port, RoutingCondition, RulePriority, SecretName,
    ServiceIntent, ServiceName, TopologyError, DEFAULT_COOLDOWN, DEFAULT_CPU_TARGET_PERCENT,
};

use crate::cdn::PriceClass;
use crate::StackError;

/// Secret name that always resolves to the database cluster's credentials.
pub const DATABASE_SECRET: &str = "database";

/// Root of one environment's configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentConfig {
    pub environment: EnvironmentProps,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cdn: CdnConfig,
    /// Application secrets created alongside the environment.
    #[serde(default)]
    pub secrets: Vec<SecretConfig>,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

impl Default for EnvironmentConfig {
    /// The `modus`/`nprd` reference environment: an `api` service backed by
    /// the database and an `nginx` service serving the apex domain.
    fn default() -> Self {
        let api = ServiceConfig {
            priority: 1,
            port: 8000,
            health_check_path: "/health".to_string(),
            hosts: vec!["api.modus-sandbox.com".to_string()],
            environment: BTreeMap::from([("PORT".to_string(), "8000".to_string())]),
            secrets: BTreeMap::from([
                ("TOKEN".to_string(), "api-token".to_string()),
                ("DB".to_string(), DATABASE_SECRET.to_string()),
            ]),
            database_access: true,
            ..ServiceConfig::new("api")
        };
        let nginx = ServiceConfig {
            priority: 2,
            port: 80,
            health_check_path: "/".to_string(),
            hosts: vec!["modus-sandbox.com".to_string()],
            environment: BTreeMap::from([("PORT".to_string(), "80".to_string())]),
            ..ServiceConfig::new("nginx")
        };

        Self {
            environment: EnvironmentProps::new("modus", "nprd"),
            network: NetworkConfig::default(),
            database: DatabaseConfig::default(),
            cdn: CdnConfig::default(),
            secrets: vec![SecretConfig {
                name: "api-token".to_string(),
            }],
            services: vec![api, nginx],
        }
    }
}

impl EnvironmentConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Parse`] for malformed TOML or unknown keys, and
    /// [`StackError::InvalidConfig`] when [`validate`](Self::validate) fails.
    pub fn from_toml_str(text: &str) -> Result<Self, StackError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every section's own shape.
    ///
    /// Cross-service rules (unique names and priorities) and secret
    /// resolution are enforced while the environment is built.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::InvalidConfig`] describing the first violation.
    pub fn validate(&self) -> Result<(), StackError> {
        if self.environment.app_name.trim().is_empty() {
            return Err(StackError::invalid("environment", "app_name must not be empty"));
        }
        if self.environment.environment.trim().is_empty() {
            return Err(StackError::invalid("environment", "environment must not be empty"));
        }
        self.network.validate()?;
        self.database.validate()?;
        self.cdn.validate()?;

        let mut seen = BTreeSet::new();
        for secret in &self.secrets {
            if secret.name == DATABASE_SECRET {
                return Err(StackError::invalid(
                    format!("secret '{}'", secret.name),
                    "name is reserved for the database credentials",
                ));
            }
            if SecretName::new(secret.name.clone()).is_none() {
                return Err(StackError::invalid("secrets", "secret name must not be empty"));
            }
            if !seen.insert(secret.name.as_str()) {
                return Err(StackError::invalid(
                    format!("secret '{}'", secret.name),
                    "declared more than once",
                ));
            }
        }

        for service in &self.services {
            service.to_intent()?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Collaborator sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    /// IPv4 block of the VPC. Default `10.10.0.0/16`.
    pub cidr: String,
    /// Availability zones to spread subnets over. Default 2.
    pub max_azs: u32,
    /// NAT gateways for private-subnet egress. Default 1.
    pub nat_gateways: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            cidr: "10.10.0.0/16".to_string(),
            max_azs: 2,
            nat_gateways: 1,
        }
    }
}

impl NetworkConfig {
    fn validate(&self) -> Result<(), StackError> {
        let invalid = |reason: &str| StackError::invalid("network", reason);

        let Some((address, prefix)) = self.cidr.split_once('/') else {
            return Err(invalid("cidr must be written as address/prefix"));
        };
        if address.parse::<std::net::Ipv4Addr>().is_err() {
            return Err(invalid("cidr address is not an IPv4 address"));
        }
        match prefix.parse::<u8>() {
            Ok(bits) if (16..=28).contains(&bits) => {}
            _ => return Err(invalid("cidr prefix must be within /16../28")),
        }
        if self.max_azs == 0 {
            return Err(invalid("max_azs must be positive"));
        }
        if self.nat_gateways > self.max_azs {
            return Err(invalid("nat_gateways exceeds max_azs"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Aurora MySQL engine version. Default `aurora-mysql-3.04.0`.
    pub engine_version: String,
    /// Lower capacity bound in Aurora capacity units. Default 1.
    pub min_capacity: u32,
    /// Upper capacity bound in Aurora capacity units. Default 2.
    pub max_capacity: u32,
    /// Idle minutes before the cluster pauses; 0 disables pausing. Default 15.
    pub auto_pause_minutes: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            engine_version: "aurora-mysql-3.04.0".to_string(),
            min_capacity: 1,
            max_capacity: 2,
            auto_pause_minutes: 15,
        }
    }
}

impl DatabaseConfig {
    fn validate(&self) -> Result<(), StackError> {
        let invalid = |reason: &str| StackError::invalid("database", reason);

        if self.engine_version.trim().is_empty() {
            return Err(invalid("engine_version must not be empty"));
        }
        if self.min_capacity == 0 {
            return Err(invalid("min_capacity must be positive"));
        }
        if self.min_capacity > self.max_capacity {
            return Err(invalid("min_capacity exceeds max_capacity"));
        }
        Ok(())
    }

    /// `auto_pause_minutes` as a duration, `None` when pausing is disabled.
    pub fn auto_pause(&self) -> Option<Duration> {
        (self.auto_pause_minutes > 0)
            .then(|| Duration::from_secs(u64::from(self.auto_pause_minutes) * 60))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CdnConfig {
    /// ARN of an existing certificate to import.
    pub certificate_arn: String,
    /// Path prefix served from the media bucket. Default `/media`.
    pub media_path: String,
    pub price_class: PriceClass,
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self {
            certificate_arn: "IMPORT_YOUR_CERT_ARN".to_string(),
            media_path: "/media".to_string(),
            price_class: PriceClass::default(),
        }
    }
}

impl CdnConfig {
    fn validate(&self) -> Result<(), StackError> {
        if self.certificate_arn.trim().is_empty() {
            return Err(StackError::invalid("cdn", "certificate_arn must not be empty"));
        }
        if !self.media_path.starts_with('/') || self.media_path.len() < 2 {
            return Err(StackError::invalid(
                "cdn",
                "media_path must be a non-root path starting with '/'",
            ));
        }
        Ok(())
    }
}

/// A generated application secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecretConfig {
    /// Name services use to reference the secret; also its resource suffix.
    pub name: String,
}

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

/// One `[[services]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    pub name: String,
    /// Rule priority on the secure listener; unique per environment.
    pub priority: u32,
    /// Container port, also used for health checks.
    pub port: u16,
    #[serde(default = "default_desired_count")]
    pub desired_count: u32,
    pub health_check_path: String,
    /// Host-header values; becomes one routing condition when non-empty.
    #[serde(default)]
    pub hosts: Vec<String>,
    /// Path patterns; becomes one routing condition when non-empty.
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub cpu: Option<u32>,
    #[serde(default)]
    pub memory: Option<u32>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    /// Environment variable to secret name. [`DATABASE_SECRET`] names the
    /// database credentials.
    #[serde(default)]
    pub secrets: BTreeMap<String, String>,
    #[serde(default)]
    pub auto_scaling: Option<AutoScalingSettings>,
    /// Opens the database's default port to this service.
    #[serde(default)]
    pub database_access: bool,
}

fn default_desired_count() -> u32 {
    1
}

impl ServiceConfig {
    /// A service with every optional field at its default and no routing.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority: 1,
            port: 80,
            desired_count: default_desired_count(),
            health_check_path: "/".to_string(),
            hosts: Vec::new(),
            paths: Vec::new(),
            cpu: None,
            memory: None,
            environment: BTreeMap::new(),
            secrets: BTreeMap::new(),
            auto_scaling: None,
            database_access: false,
        }
    }

    /// Converts the entry into a validated [`ServiceIntent`].
    ///
    /// # Errors
    ///
    /// Returns [`StackError::InvalidConfig`] for a blank name or secret
    /// reference, a zero port or priority, or any violation reported by
    /// [`ServiceIntent::validate`].
    pub fn to_intent(&self) -> Result<ServiceIntent, StackError> {
        let section = || format!("service '{}'", self.name);

        let name = ServiceName::new(self.name.clone())
            .ok_or_else(|| StackError::invalid("services", "service name must not be empty"))?;
        let priority = RulePriority::new(self.priority)
            .ok_or_else(|| StackError::invalid(section(), "priority must be positive"))?;
        let port = Port::new(self.port)
            .ok_or_else(|| StackError::invalid(section(), "port must be positive"))?;

        let mut intent = ServiceIntent::new(name, priority, port, self.health_check_path.clone())
            .with_desired_count(self.desired_count);
        if !self.hosts.is_empty() {
            let hosts = RoutingCondition::host_headers(self.hosts.iter().cloned());
            intent = intent.with_condition(hosts);
        }
        if !self.paths.is_empty() {
            let paths = RoutingCondition::path_patterns(self.paths.iter().cloned());
            intent = intent.with_condition(paths);
        }
        intent.cpu = self.cpu;
        intent.memory = self.memory;
        intent.environment_variables = self.environment.clone();
        for (key, secret) in &self.secrets {
            let secret = SecretName::new(secret.clone()).ok_or_else(|| {
                StackError::invalid(section(), format!("secret for '{key}' must not be empty"))
            })?;
            intent = intent.with_environment_secret(key.clone(), secret);
        }
        if let Some(scaling) = &self.auto_scaling {
            intent = intent.with_auto_scaling(scaling.to_config());
        }

        intent.validate().map_err(|err| match err {
            TopologyError::InvalidIntent { reason, .. } => StackError::invalid(section(), reason),
            other => StackError::invalid(section(), other.to_string()),
        })?;
        Ok(intent)
    }
}

/// `[services.auto_scaling]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AutoScalingSettings {
    pub minimum_tasks: u32,
    pub maximum_tasks: u32,
    #[serde(default = "default_cpu_target_percent")]
    pub cpu_target_percent: u32,
    /// Applied to scale-in and scale-out alike.
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: u64,
}

fn default_cpu_target_percent() -> u32 {
    DEFAULT_CPU_TARGET_PERCENT
}

fn default_cooldown_seconds() -> u64 {
    DEFAULT_COOLDOWN.as_secs()
}

impl AutoScalingSettings {
    fn to_config(&self) -> AutoScalingConfig {
        AutoScalingConfig::new(self.minimum_tasks, self.maximum_tasks)
            .with_cpu_target_percent(self.cpu_target_percent)
            .with_cooldown(Duration::from_secs(self.cooldown_seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [environment]
        app_name = "shop"
        environment = "dev"

        [[services]]
        name = "web"
        priority = 5
        port = 3000
        health_check_path = "/ready"
        paths = ["/shop/*"]

        [services.auto_scaling]
        minimum_tasks = 1
        maximum_tasks = 4
    "#;

    #[test]
    fn test_omitted_sections_take_defaults() {
        let config = EnvironmentConfig::from_toml_str(MINIMAL).unwrap();

        assert_eq!(config.network, NetworkConfig::default());
        assert_eq!(config.database.auto_pause(), Some(Duration::from_secs(900)));
        assert_eq!(config.cdn.media_path, "/media");
        assert!(config.secrets.is_empty());

        let intent = config.services[0].to_intent().unwrap();
        assert_eq!(intent.desired_count, 1);
        assert_eq!(intent.effective_cpu(), 256);
        assert_eq!(intent.effective_memory(), 512);
        assert_eq!(intent.routing_conditions, vec![RoutingCondition::path_patterns(["/shop/*"])]);
        let scaling = intent.auto_scaling.unwrap();
        assert_eq!(scaling.cpu_target_percent, 50);
        assert_eq!(scaling.cooldown, Duration::from_secs(300));
    }

    #[test]
    fn test_default_config_is_valid_reference_environment() {
        let config = EnvironmentConfig::default();
        config.validate().unwrap();

        let names: Vec<_> = config.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["api", "nginx"]);
        assert_eq!(config.services[0].secrets["DB"], DATABASE_SECRET);
        assert_ne!(config.services[0].priority, config.services[1].priority);
    }

    #[test]
    fn test_default_config_survives_toml_round_trip() {
        let text = toml::to_string(&EnvironmentConfig::default()).unwrap();
        assert_eq!(EnvironmentConfig::from_toml_str(&text).unwrap(), EnvironmentConfig::default());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let text = format!("{MINIMAL}\n[network]\nvpc_name = \"x\"\n");
        assert!(matches!(EnvironmentConfig::from_toml_str(&text), Err(StackError::Parse(_))));
    }

    #[test]
    fn test_empty_app_name_is_rejected() {
        let mut config = EnvironmentConfig::default();
        config.environment.app_name = String::new();
        assert!(matches!(
            config.validate(),
            Err(StackError::InvalidConfig { section, .. }) if section == "environment"
        ));
    }

    #[test]
    fn test_zero_port_is_rejected() {
        let mut config = EnvironmentConfig::default();
        config.services[1].port = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("service 'nginx'"));
    }

    #[test]
    fn test_inverted_scaling_bounds_are_rejected() {
        let mut config = EnvironmentConfig::default();
        config.services[0].auto_scaling = Some(AutoScalingSettings {
            minimum_tasks: 3,
            maximum_tasks: 1,
            cpu_target_percent: 50,
            cooldown_seconds: 300,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_service_without_routing_is_rejected() {
        let mut config = EnvironmentConfig::default();
        config.services[0].hosts.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_database_secret_name_is_reserved() {
        let mut config = EnvironmentConfig::default();
        config.secrets.push(SecretConfig {
            name: DATABASE_SECRET.to_string(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_cidr_is_rejected() {
        let mut config = EnvironmentConfig::default();
        config.network.cidr = "10.10.0.0".to_string();
        assert!(config.validate().is_err());
        config.network.cidr = "10.10.0.0/8".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_database_capacity_is_rejected() {
        let mut config = EnvironmentConfig::default();
        config.database.min_capacity = 4;
        assert!(config.validate().is_err());
    }
}

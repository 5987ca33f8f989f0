//! Configuration for a Primus node.
//!
//! The configuration is read from a TOML file and can be overridden with
//! environment variables prefixed with `PRIMUS` and using `__` as a separator,
//! eg. `PRIMUS__IDENTITY__NODE_NAME=moscow`.

use core::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use bytesize::ByteSize;
use serde::{Deserialize, Serialize};

use primus_core_types::{ChainError, NodeDescriptor, PriorityChain};

mod utils;

pub use utils::MajorityRule;

/// Default port of the liveness listener.
pub const DEFAULT_LIVENESS_PORT: u16 = 8889;

/// Default prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "PRIMUS";

/// Commented configuration file with a sample five-node chain.
pub const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid chain: {0}")]
    Chain(#[from] ChainError),

    #[error("The chain has no nodes")]
    EmptyChain,

    #[error("`{0}` must be greater than zero")]
    Zero(&'static str),
}

/// Primus configuration options
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// A custom human-readable name for this process
    pub moniker: String,

    /// How this process finds itself in the chain
    pub identity: IdentityConfig,

    /// The original chain, in priority order
    pub chain: Vec<NodeConfig>,

    /// Liveness probe and listener options
    pub liveness: LivenessConfig,

    /// Control loop options
    pub election: ElectionConfig,

    /// Anomaly signal options
    pub anomaly: AnomalyConfig,

    /// Log configuration options
    pub logging: LoggingConfig,

    /// Metrics configuration options
    pub metrics: MetricsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            moniker: "primus".to_string(),
            identity: IdentityConfig::default(),
            chain: Vec::new(),
            liveness: LivenessConfig::default(),
            election: ElectionConfig::default(),
            anomaly: AnomalyConfig::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Config {
    /// Build the original chain from the configured nodes.
    pub fn original_chain(&self) -> Result<PriorityChain, ChainError> {
        PriorityChain::new(
            self.chain
                .iter()
                .map(|node| NodeDescriptor::new(&node.name, &node.address)),
        )
    }

    /// Check that the configuration describes a node that can run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let chain = self.original_chain()?;

        if chain.is_empty() {
            return Err(ConfigError::EmptyChain);
        }

        let non_zero = [
            ("election.tick_interval", self.election.tick_interval),
            ("election.pulse.pulse_duration", self.election.pulse.pulse_duration),
            ("liveness.probe_timeout", self.liveness.probe_timeout),
        ];

        for (name, value) in non_zero {
            if value.is_zero() {
                return Err(ConfigError::Zero(name));
            }
        }

        if self.anomaly.max_failures == 0 {
            return Err(ConfigError::Zero("anomaly.max_failures"));
        }

        if self.anomaly.latency_window == 0 {
            return Err(ConfigError::Zero("anomaly.latency_window"));
        }

        Ok(())
    }

    /// Parse a TOML document, without environment overrides.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// One entry of the chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Unique name of the node
    pub name: String,

    /// Address other nodes probe
    pub address: String,
}

/// Identity resolution options
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Explicit name of this node, matched case-insensitively against the chain
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,

    /// Addresses to consider local in addition to the discovered ones
    pub local_addresses: Vec<String>,
}

/// Liveness probe and listener options
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LivenessConfig {
    /// Dedicated liveness port, probed on peers and served locally
    pub port: u16,

    /// Address the liveness listener binds to
    pub listen_addr: IpAddr,

    /// Timeout of the liveness probe
    #[serde(with = "humantime_serde")]
    pub probe_timeout: Duration,

    /// Timeout of the diagnostic host checks run after a failed probe
    #[serde(with = "humantime_serde")]
    pub fallback_timeout: Duration,

    /// Administrative port used by the diagnostic host check
    pub admin_port: u16,

    /// Also try an ICMP echo in the diagnostic host check
    pub icmp_fallback: bool,

    /// Serve the liveness port. Disable to run in probe-only mode.
    pub listener_enabled: bool,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_LIVENESS_PORT,
            listen_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            probe_timeout: Duration::from_secs(1),
            fallback_timeout: Duration::from_secs(2),
            admin_port: 22,
            icmp_fallback: true,
            listener_enabled: true,
        }
    }
}

/// Control loop options
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectionConfig {
    /// Delay before the first tick
    #[serde(with = "humantime_serde")]
    pub startup_delay: Duration,

    /// Interval between two ticks
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,

    /// Minimum time a shuffled chain is kept before the original one is restored
    #[serde(with = "humantime_serde")]
    pub shuffle_hold: Duration,

    /// How many unreachable nodes make a majority outage
    pub majority: MajorityRule,

    /// Pulse mode options
    pub pulse: PulseConfig,

    /// Chain shuffle options
    pub shuffle: ShuffleConfig,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            startup_delay: Duration::from_secs(3),
            tick_interval: Duration::from_secs(5),
            shuffle_hold: Duration::from_secs(60),
            majority: MajorityRule::Majority,
            pulse: PulseConfig::default(),
            shuffle: ShuffleConfig::default(),
        }
    }
}

/// Pulse mode options
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseConfig {
    /// Length of each node's active window
    #[serde(with = "humantime_serde")]
    pub pulse_duration: Duration,

    /// Idle gap at the end of each cycle
    #[serde(with = "humantime_serde")]
    pub sleep_duration: Duration,

    /// Secret shared by all nodes, mixed into the pulse seed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_secret: Option<String>,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            pulse_duration: Duration::from_secs(30),
            sleep_duration: Duration::from_secs(60),
            shared_secret: None,
        }
    }
}

impl fmt::Debug for PulseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PulseConfig")
            .field("pulse_duration", &self.pulse_duration)
            .field("sleep_duration", &self.sleep_duration)
            .field("shared_secret", &self.shared_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Chain shuffle options
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShuffleConfig {
    /// Hex-encoded ed25519 seed used to sign the shuffle entropy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_key: Option<String>,
}

impl fmt::Debug for ShuffleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShuffleConfig")
            .field("signing_key", &self.signing_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Which anomaly signal implementation to run
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    /// Never reports an attack
    #[default]
    Disabled,

    /// Reports an attack when failures, latency or resource usage cross a threshold
    Threshold,
}

/// Anomaly signal options
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Implementation to use
    pub detector: DetectorKind,

    /// Consecutive failures before an attack is reported
    pub max_failures: u32,

    /// Number of response times kept in the rolling window
    pub latency_window: usize,

    /// Number of samples required before the latency rule applies
    pub latency_min_samples: usize,

    /// Average response time above which an attack is reported
    #[serde(with = "humantime_serde")]
    pub latency_threshold: Duration,

    /// Sample CPU and network usage
    pub resource_checks: bool,

    /// CPU utilization (percent) above which an attack is reported
    pub cpu_threshold: f32,

    /// Inbound traffic per second above which an attack is reported
    pub ingress_threshold: ByteSize,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            detector: DetectorKind::Disabled,
            max_failures: 10,
            latency_window: 10,
            latency_min_samples: 5,
            latency_threshold: Duration::from_secs(5),
            resource_checks: true,
            cpu_threshold: 80.0,
            ingress_threshold: ByteSize::mb(100),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plaintext,
    Json,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_level: LogLevel,
    pub log_format: LogFormat,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable the metrics server
    pub enabled: bool,

    /// Address at which to serve the metrics at
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 9000)),
        }
    }
}

/// Parse the environment variables and load the provided config file path
/// to create a [`Config`].
pub fn load_config(path: impl AsRef<Path>, prefix: Option<&str>) -> Result<Config, ConfigError> {
    let config = ::config::Config::builder()
        .add_source(::config::File::from(path.as_ref()))
        .add_source(::config::Environment::with_prefix(prefix.unwrap_or(ENV_PREFIX)).separator("__"))
        .build()?
        .try_deserialize()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_default_config_file() {
        let config = Config::from_toml(DEFAULT_CONFIG).unwrap();

        assert_eq!(config.chain.len(), 5);
        assert_eq!(config.chain[0].name, "amsterdam");
        assert_eq!(config.liveness.port, DEFAULT_LIVENESS_PORT);
        assert_eq!(config.election.tick_interval, Duration::from_secs(5));
        assert_eq!(config.election.pulse.sleep_duration, Duration::from_secs(60));
        assert_eq!(config.election.majority, MajorityRule::Majority);
        assert_eq!(config.anomaly.detector, DetectorKind::Disabled);
        assert_eq!(config.anomaly.ingress_threshold, ByteSize::mb(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, DEFAULT_CONFIG).unwrap();

        // Use a dedicated prefix so that the environment of the test runner cannot interfere.
        let config = load_config(&path, Some("PRIMUS_TEST_LOAD")).unwrap();
        assert_eq!(config.moniker, "primus");
        assert_eq!(config.liveness.probe_timeout, Duration::from_secs(1));
    }

    #[test]
    fn partial_file_uses_defaults() {
        let config = toml::from_str::<Config>(
            r#"
            [[chain]]
            name = "a"
            address = "10.0.0.1"

            [election]
            tick_interval = "2s"
            "#,
        )
        .unwrap();

        assert_eq!(config.election.tick_interval, Duration::from_secs(2));
        assert_eq!(config.election.startup_delay, Duration::from_secs(3));
        assert_eq!(config.anomaly, AnomalyConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_errors() {
        let config = Config::default();
        assert!(matches!(config.validate(), Err(ConfigError::EmptyChain)));

        let mut config = Config {
            chain: vec![
                NodeConfig {
                    name: "a".into(),
                    address: "10.0.0.1".into(),
                },
                NodeConfig {
                    name: "a".into(),
                    address: "10.0.0.2".into(),
                },
            ],
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Chain(_))));

        config.chain.pop();
        // An unknown override is left to identity resolution
        config.identity.node_name = Some("b".into());
        assert!(config.validate().is_ok());

        config.identity.node_name = Some("A".into());
        config.election.tick_interval = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Zero("election.tick_interval"))
        ));
    }

    #[test]
    fn round_trips_through_toml() {
        let config = Config {
            chain: vec![NodeConfig {
                name: "a".into(),
                address: "10.0.0.1".into(),
            }],
            ..Config::default()
        };

        let rendered = config.to_toml().unwrap();
        let parsed = toml::from_str::<Config>(&rendered).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn secrets_are_redacted() {
        let pulse = PulseConfig {
            shared_secret: Some("hunter2".into()),
            ..PulseConfig::default()
        };

        assert!(!format!("{pulse:?}").contains("hunter2"));
    }
}

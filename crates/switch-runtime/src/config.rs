//! # Switch Configuration
//!
//! Unified configuration for all subsystems and runtime parameters,
//! loaded from a JSON file with environment overrides.
//!
//! ## Security Requirements
//!
//! - Every admitted channel MUST have a non-empty shared key.
//! - All timeouts and limits have sane defaults with override capability.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use ps_02_channel::{ChannelKeyring, Framing};
use ps_03_broker::AdmissionConfig;
use ps_04_dispatcher::{DispatcherConfig, HealthCheckConfig};
use ps_05_authorizer::{AccountRecord, AuthorizerConfig};
use shared_types::{ChannelId, ChannelKey, Endpoint, EndpointId, RoutingRule};

/// Complete switch configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchConfig {
    pub network: NetworkConfig,
    pub security: SecurityConfig,
    pub admission: AdmissionConfig,
    pub routing: Vec<RoutingRule>,
    /// Static endpoint descriptors. Optional: when empty, every endpoint a
    /// routing rule references is served by the in-process connector.
    pub endpoints: Vec<Endpoint>,
    pub dispatcher: DispatcherConfig,
    pub health: HealthCheckConfig,
    pub authorizer: AuthorizerConfig,
    /// Seed records for the in-process account directory, keyed by
    /// account reference.
    pub accounts: HashMap<String, AccountRecord>,
    /// Opening balances for the in-process ledger, in minor units.
    pub opening_balances: HashMap<String, i64>,
}

impl SwitchConfig {
    /// Loads configuration from a JSON file, then applies environment
    /// overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Unreadable(path.as_ref().display().to_string(), e))?;
        let mut config: Self =
            serde_json::from_str(&raw).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Environment overrides applied on top of any file-based values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("PS_LISTEN_ADDR") {
            self.network.listen_addr = addr;
        }
        if let Ok(port) = std::env::var("PS_METRICS_PORT") {
            if let Ok(p) = port.parse() {
                self.network.metrics_port = p;
            }
        }
    }

    /// Rejects configurations the switch cannot run safely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.routing.is_empty() {
            return Err(ConfigError::NoRoutingRules);
        }
        for rule in &self.routing {
            if rule.endpoints.is_empty() {
                return Err(ConfigError::RuleWithoutEndpoints(rule.name.clone()));
            }
            if !self.endpoints.is_empty() {
                for endpoint in &rule.endpoints {
                    if !self.endpoints.iter().any(|e| e.id == *endpoint) {
                        return Err(ConfigError::UndeclaredEndpoint(endpoint.to_string()));
                    }
                }
            }
        }
        for channel in self.admission.channels.keys() {
            match self.security.channel_keys.get(channel.as_str()) {
                Some(key) if !key.is_empty() => {}
                _ => return Err(ConfigError::MissingChannelKey(channel.to_string())),
            }
        }
        Ok(())
    }

    /// Builds the channel keyring from the configured hex keys.
    pub fn keyring(&self) -> Result<ChannelKeyring, ConfigError> {
        let mut keyring = ChannelKeyring::new();
        for (channel, key_hex) in &self.security.channel_keys {
            let key = hex::decode(key_hex)
                .map_err(|_| ConfigError::BadChannelKey(channel.clone()))?;
            keyring.insert(ChannelId::new(channel.clone()), ChannelKey::new(key));
        }
        info!(channels = keyring.len(), "Channel keyring loaded");
        Ok(keyring)
    }

    /// Every endpoint any routing rule references, deduplicated.
    #[must_use]
    pub fn endpoint_ids(&self) -> Vec<EndpointId> {
        let mut seen = Vec::new();
        for rule in &self.routing {
            for endpoint in &rule.endpoints {
                if !seen.contains(endpoint) {
                    seen.push(endpoint.clone());
                }
            }
        }
        seen
    }

    /// Declared transport descriptor for `id`, when one was configured.
    #[must_use]
    pub fn transport_of(&self, id: &EndpointId) -> Option<&str> {
        self.endpoints
            .iter()
            .find(|e| e.id == *id)
            .map(|e| e.transport.as_str())
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {0}: {1}")]
    Unreadable(String, #[source] std::io::Error),

    #[error("malformed config: {0}")]
    Malformed(String),

    #[error("routing table is empty; the switch would discard all traffic")]
    NoRoutingRules,

    #[error("routing rule '{0}' has no endpoints")]
    RuleWithoutEndpoints(String),

    #[error("routing rule references undeclared endpoint '{0}'")]
    UndeclaredEndpoint(String),

    #[error("admitted channel '{0}' has no shared key configured")]
    MissingChannelKey(String),

    #[error("channel '{0}' key is not valid hex")]
    BadChannelKey(String),
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Ingress listener address.
    pub listen_addr: String,
    /// Wire framing for channel connections.
    pub framing: FramingKind,
    /// Prometheus metrics port.
    pub metrics_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8583".to_string(),
            framing: FramingKind::LengthPrefixed,
            metrics_port: 9615,
        }
    }
}

/// Serializable mirror of the channel framing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FramingKind {
    #[default]
    LengthPrefixed,
    NewlineDelimited,
}

impl From<FramingKind> for Framing {
    fn from(kind: FramingKind) -> Self {
        match kind {
            FramingKind::LengthPrefixed => Framing::LengthPrefixed,
            FramingKind::NewlineDelimited => Framing::NewlineDelimited,
        }
    }
}

/// Security configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Shared HMAC keys per channel, hex encoded.
    pub channel_keys: HashMap<String, String>,
}

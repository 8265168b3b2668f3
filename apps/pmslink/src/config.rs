//! Client configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use pmslink_core::{BootstrapConfig, ClientIdentity, GdmConfig, Settings};
use serde::Deserialize;

/// Client configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Stable client identifier. A fresh one is generated per run when unset.
    /// Override: `PMSLINK_CLIENT_ID`
    pub client_id: Option<String>,

    /// Name shown by media servers. Defaults to the host name.
    /// Override: `PMSLINK_DEVICE_NAME`
    pub device_name: Option<String>,

    /// Port advertised for remote control.
    pub advertised_port: u16,

    /// Interface used for discovery searches.
    /// Override: `PMSLINK_INTERFACE`
    pub interface: Option<Ipv4Addr>,

    /// How long discovery replies are collected, in milliseconds.
    /// Override: `PMSLINK_DISCOVERY_WINDOW_MS`
    pub discovery_window_ms: u64,

    /// Interval between background discovery rounds, in seconds.
    pub discovery_interval_secs: u64,

    /// Authentication token attached to every server request.
    /// Override: `PMSLINK_TOKEN`
    pub token: Option<String>,

    /// Player settings.
    pub settings: Settings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let gdm = GdmConfig::default();
        Self {
            client_id: None,
            device_name: None,
            advertised_port: 3005,
            interface: None,
            discovery_window_ms: gdm.discovery_window.as_millis() as u64,
            discovery_interval_secs: gdm.discovery_interval.as_secs(),
            token: None,
            settings: Settings::default(),
        }
    }
}

impl ClientConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("PMSLINK_CLIENT_ID") {
            self.client_id = Some(val);
        }

        if let Ok(val) = std::env::var("PMSLINK_DEVICE_NAME") {
            self.device_name = Some(val);
        }

        if let Ok(val) = std::env::var("PMSLINK_INTERFACE") {
            if let Ok(ip) = val.parse() {
                self.interface = Some(ip);
            }
        }

        if let Ok(val) = std::env::var("PMSLINK_DISCOVERY_WINDOW_MS") {
            if let Ok(ms) = val.parse() {
                self.discovery_window_ms = ms;
            }
        }

        if let Ok(val) = std::env::var("PMSLINK_TOKEN") {
            self.token = Some(val);
        }
    }

    /// Builds the client identity, filling unset fields from the host.
    pub fn identity(&self) -> ClientIdentity {
        let mut identity = ClientIdentity::generate("pmslink", env!("CARGO_PKG_VERSION"));
        if let Some(id) = &self.client_id {
            identity.client_id = id.clone();
        }
        if let Some(name) = &self.device_name {
            identity.device_name = name.clone();
        }
        identity.port = self.advertised_port;
        identity
    }

    pub fn gdm_config(&self) -> GdmConfig {
        GdmConfig {
            interface: self.interface,
            discovery_window: Duration::from_millis(self.discovery_window_ms),
            discovery_interval: Duration::from_secs(self.discovery_interval_secs),
            ..GdmConfig::default()
        }
    }

    /// Converts to pmslink-core's bootstrap input.
    pub fn to_bootstrap_config(&self) -> BootstrapConfig {
        BootstrapConfig {
            identity: self.identity(),
            settings: self.settings.clone(),
            gdm: self.gdm_config(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmslink_core::StreamPolicy;

    #[test]
    fn yaml_overrides_defaults() {
        let yaml = r#"
client_id: fixed-id
device_name: Den
discovery_window_ms: 900
settings:
  stream_policy: smb
  force_dvd: true
"#;
        let config: ClientConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.settings.stream_policy, StreamPolicy::Smb);
        assert!(config.settings.force_dvd);
        assert!(config.settings.secure_connections);

        let identity = config.identity();
        assert_eq!(identity.client_id, "fixed-id");
        assert_eq!(identity.device_name, "Den");
        assert_eq!(config.gdm_config().discovery_window, Duration::from_millis(900));
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config: ClientConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.advertised_port, 3005);
        assert!(config.client_id.is_none());
        assert_eq!(config.settings.transcode_profiles.len(), 3);
    }
}

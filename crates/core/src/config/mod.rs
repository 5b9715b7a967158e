//! Broker configuration
//!
//! A TOML file describes the broker and the providers it hosts:
//!
//! ```toml
//! name = "cmpi-rs"
//! log_level = "info"
//! capabilities = ["basic_read", "instance_manipulation", "indications"]
//! indication_queue = 1024
//! provider_dir = "providers"
//!
//! [[provider]]
//! name = "Fan"
//! module = "acme_fan"
//! namespaces = ["root/cimv2"]
//! classes = ["ACME_Fan"]
//! kinds = ["instance", "method"]
//! ```
//!
//! A provider without `module` must be linked into the host and registered
//! as a static factory.

mod loader;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::broker::DEFAULT_QUEUE_CAPACITY;
use crate::engine::{LoadError, MiKind};
use crate::flags::Capabilities;

pub use loader::{cmpi_home, default_config_path, resolve, resolve_in, CONFIG_FILE_NAME, HOME_ENV};

/// Configuration system errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write config file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML content
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config to TOML
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Unknown broker capability: {0}")]
    UnknownCapability(String),

    #[error("Unknown provider kind '{kind}' for provider {provider}")]
    UnknownKind { provider: String, kind: String },

    /// A configured provider could not be loaded
    #[error("Failed to load provider {provider}: {source}")]
    Provider {
        provider: String,
        #[source]
        source: LoadError,
    },
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// One `[[provider]]` entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider name; factory symbols are `<name>_Create_<Kind>MI`
    pub name: String,
    /// Shared library to load (`lib<module>.so` or a path); none for linked-in providers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// Empty serves every namespace
    pub namespaces: Vec<String>,
    pub classes: Vec<String>,
    pub kinds: Vec<String>,
}

impl ProviderConfig {
    pub fn mi_kinds(&self) -> ConfigResult<Vec<MiKind>> {
        self.kinds
            .iter()
            .map(|k| {
                MiKind::parse(k).ok_or_else(|| ConfigError::UnknownKind {
                    provider: self.name.clone(),
                    kind: k.clone(),
                })
            })
            .collect()
    }
}

/// Broker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Config version for future migration support
    pub version: u32,

    /// Reported through `brokerName`
    pub name: String,

    /// Default tracing filter when `RUST_LOG` is not set
    pub log_level: String,

    /// Capability names, e.g. `basic_read` or `indications`
    pub capabilities: Vec<String>,

    /// Capacity of the indication queue
    pub indication_queue: usize,

    /// Directory searched for provider modules
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_dir: Option<PathBuf>,

    #[serde(rename = "provider")]
    pub providers: Vec<ProviderConfig>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            version: 1,
            name: "cmpi-rs".to_string(),
            log_level: "info".to_string(),
            capabilities: vec![
                "basic_read".to_string(),
                "instance_manipulation".to_string(),
                "association_traversal".to_string(),
                "indications".to_string(),
                "os_encapsulation_support".to_string(),
                "supports_extended_error".to_string(),
                "logging".to_string(),
                "tracing".to_string(),
                "property_filtering".to_string(),
                "codepage_conversion".to_string(),
            ],
            indication_queue: DEFAULT_QUEUE_CAPACITY,
            provider_dir: None,
            providers: Vec::new(),
        }
    }
}

impl BrokerConfig {
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load config from `path`, resolved against `CMPI_HOST_HOME`
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let path = resolve(path);
        let content = std::fs::read_to_string(&path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!("Loaded broker config from {:?}", path);
        Ok(config)
    }

    /// Load config from file, creating default if missing.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        let resolved = resolve(path);
        if resolved.exists() {
            Self::load(path)
        } else {
            let default = Self::default();
            default.save(path)?;
            tracing::info!("Created default broker config at {:?}", resolved);
            Ok(default)
        }
    }

    /// Save config to file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let path = resolve(path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        tracing::debug!("Saved broker config to {:?}", path);
        Ok(())
    }

    /// Capability mask from the configured names
    pub fn capability_flags(&self) -> ConfigResult<Capabilities> {
        self.capabilities.iter().try_fold(Capabilities::empty(), |acc, name| {
            Capabilities::from_name(&name.to_ascii_uppercase())
                .map(|c| acc | c)
                .ok_or_else(|| ConfigError::UnknownCapability(name.clone()))
        })
    }

    /// Provider directory resolved against `CMPI_HOST_HOME`
    pub fn provider_dir(&self) -> Option<PathBuf> {
        self.provider_dir.as_deref().map(resolve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
name = "test-broker"
capabilities = ["basic_read", "Indications"]
indication_queue = 16

[[provider]]
name = "Fan"
module = "acme_fan"
namespaces = ["root/cimv2"]
classes = ["ACME_Fan"]
kinds = ["instance", "Method"]

[[provider]]
name = "Linked"
classes = ["ACME_Linked"]
kinds = ["association"]
"#;

    #[test]
    fn test_parse_sample() {
        let config = BrokerConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.name, "test-broker");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.indication_queue, 16);
        assert_eq!(config.providers.len(), 2);
        assert_eq!(config.providers[0].module.as_deref(), Some("acme_fan"));
        assert_eq!(
            config.providers[0].mi_kinds().unwrap(),
            vec![MiKind::Instance, MiKind::Method]
        );
        assert!(config.providers[1].module.is_none());
        assert!(config.providers[1].namespaces.is_empty());

        let caps = config.capability_flags().unwrap();
        assert!(caps.contains(Capabilities::BASIC_READ | Capabilities::INDICATIONS));
    }

    #[test]
    fn test_unknown_names_rejected() {
        let config = BrokerConfig {
            capabilities: vec!["telepathy".to_string()],
            ..BrokerConfig::default()
        };
        assert!(matches!(config.capability_flags(), Err(ConfigError::UnknownCapability(c)) if c == "telepathy"));

        let provider = ProviderConfig {
            name: "Fan".to_string(),
            kinds: vec!["instance".to_string(), "widget".to_string()],
            ..ProviderConfig::default()
        };
        assert!(matches!(provider.mi_kinds(), Err(ConfigError::UnknownKind { kind, .. }) if kind == "widget"));
    }

    #[test]
    fn test_default_round_trip() {
        let config = BrokerConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("name = \"cmpi-rs\""));
        let parsed = BrokerConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
        assert!(parsed.capability_flags().unwrap().contains(Capabilities::LOGGING));
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("cmpi-config-{}", std::process::id()));
        let path = dir.join("broker.toml");
        let config = BrokerConfig::from_toml_str(SAMPLE).unwrap();
        config.save(&path).unwrap();
        assert_eq!(BrokerConfig::load(&path).unwrap(), config);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}

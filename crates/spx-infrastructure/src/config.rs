//! Stack configuration
//!
//! Loads the stack run configuration the figment way: defaults, then a TOML
//! file, then `SPX_`-prefixed environment variables, later sources winning.
//! The provider section is the boundary with the configuration loader
//! collaborator - each instance's `config` blob passes through unexamined
//! until its provider's own schema parses it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use spx_domain::capability::CapabilityId;
use spx_domain::error::{Error, Result};
use spx_domain::request::{ProviderInstanceConfig, StackRequest};
use tracing::debug;

use crate::runtime::LifecycleOptions;

/// Environment variable prefix for configuration overrides.
pub const CONFIG_ENV_PREFIX: &str = "SPX";

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Emit JSON-formatted events
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Lifecycle timeout section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Bound on each provider's `start()`, in seconds
    pub start_timeout_secs: u64,
    /// Bound on each provider's `stop()`, in seconds
    pub stop_timeout_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            start_timeout_secs: 30,
            stop_timeout_secs: 10,
        }
    }
}

impl LifecycleConfig {
    /// The runtime options this section configures.
    pub fn options(&self) -> LifecycleOptions {
        LifecycleOptions {
            start_timeout: Duration::from_secs(self.start_timeout_secs),
            stop_timeout: Duration::from_secs(self.stop_timeout_secs),
        }
    }
}

/// Top-level stack configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackConfig {
    /// Stack name, for diagnostics
    pub name: String,
    /// Logging section
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Lifecycle timeout section
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    /// Requested instances per capability
    #[serde(default)]
    pub providers: BTreeMap<CapabilityId, Vec<ProviderInstanceConfig>>,
}

impl StackConfig {
    /// The stack request this configuration describes, capabilities in
    /// canonical order.
    pub fn to_request(&self) -> StackRequest {
        let mut request = StackRequest::new();
        for (capability, instances) in &self.providers {
            request.insert(*capability, instances.clone());
        }
        request
    }
}

/// Configuration loader service.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a loader with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration file path.
    pub fn with_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration from all sources.
    ///
    /// Sources merge in this order, later overriding earlier:
    /// 1. `StackConfig::default()`
    /// 2. the TOML file, when one is configured and exists
    /// 3. environment variables (`SPX_LOGGING__LEVEL=debug` style, double
    ///    underscore separating nested keys)
    pub fn load(&self) -> Result<StackConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(StackConfig::default()));

        if let Some(path) = &self.config_path {
            if path.exists() {
                debug!(path = %path.display(), "merging configuration file");
                figment = figment.merge(Toml::file(path));
            } else {
                return Err(Error::config(format!(
                    "configuration file '{}' does not exist",
                    path.display()
                )));
            }
        }

        figment = figment.merge(Env::prefixed(&format!("{CONFIG_ENV_PREFIX}_")).split("__"));

        let config: StackConfig = figment
            .extract()
            .map_err(|e| Error::config(format!("failed to extract configuration: {e}")))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_without_a_file() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.lifecycle.start_timeout_secs, 30);
        assert!(config.providers.is_empty());
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            r#"
name = "dev"

[logging]
level = "debug"
json_format = true

[lifecycle]
start_timeout_secs = 5
stop_timeout_secs = 2

[[providers.inference]]
instance_id = "i1"
kind = "echo"

[providers.inference.config]
model = "m-test"
"#
        )
        .unwrap();

        let config = ConfigLoader::new()
            .with_config_path(file.path())
            .load()
            .unwrap();
        assert_eq!(config.name, "dev");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.lifecycle.options().start_timeout, Duration::from_secs(5));

        let request = config.to_request();
        let instances = request.instances(CapabilityId::Inference).unwrap();
        assert_eq!(instances[0].instance_id, "i1");
        assert_eq!(instances[0].raw_config["model"], "m-test");
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = ConfigLoader::new()
            .with_config_path("/nonexistent/stack.toml")
            .load()
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn request_uses_canonical_capability_order() {
        let mut config = StackConfig::default();
        config.providers.insert(
            CapabilityId::Safety,
            vec![ProviderInstanceConfig::new("s1", "keyword")],
        );
        config.providers.insert(
            CapabilityId::Inference,
            vec![ProviderInstanceConfig::new("i1", "echo")],
        );
        let request = config.to_request();
        assert_eq!(
            request.capabilities(),
            vec![CapabilityId::Inference, CapabilityId::Safety]
        );
    }
}

//! Reference inference kinds
//!
//! `echo` is the deterministic local reference: completions are the prompt
//! itself, tagged with the configured model name. `legacy` exists only to
//! carry a deprecation message; selecting it fails resolution.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use spx_domain::capability::CapabilityId;
use spx_domain::error::{Error, Result};
use spx_domain::ports::provider::{Provider, ProviderContext};
use spx_domain::spec::ProviderSpec;
use tracing::info;

use spx_application::registry::{PROVIDER_REGISTRATIONS, ProviderRegistration};

fn default_model() -> String {
    "echo-1".to_string()
}

/// Configuration schema for the `echo` kind.
#[derive(Debug, Deserialize)]
pub struct EchoConfig {
    /// Model name reported in completions
    #[serde(default = "default_model")]
    pub model: String,
}

/// Deterministic local inference: echoes prompts back.
pub struct EchoInference {
    instance_id: String,
    model: String,
    running: AtomicBool,
}

impl EchoInference {
    fn new(instance_id: &str, config: EchoConfig) -> Self {
        Self {
            instance_id: instance_id.to_string(),
            model: config.model,
            running: AtomicBool::new(false),
        }
    }

    /// The configured model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Produce a completion for `prompt`.
    pub fn complete(&self, prompt: &str) -> Result<String> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(Error::config(format!(
                "inference instance '{}' is not running",
                self.instance_id
            )));
        }
        Ok(format!("[{}] {prompt}", self.model))
    }
}

#[async_trait]
impl Provider for EchoInference {
    fn capability(&self) -> CapabilityId {
        CapabilityId::Inference
    }

    fn kind(&self) -> &str {
        "echo"
    }

    async fn start(&self) -> Result<()> {
        self.running.store(true, Ordering::SeqCst);
        info!(instance = %self.instance_id, model = %self.model, "echo inference started");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        info!(instance = %self.instance_id, "echo inference stopped");
        Ok(())
    }
}

fn echo_factory(ctx: &ProviderContext<'_>) -> Result<Arc<dyn Provider>> {
    let config: EchoConfig = ctx.parse_config()?;
    Ok(Arc::new(EchoInference::new(ctx.instance_id, config)))
}

#[linkme::distributed_slice(PROVIDER_REGISTRATIONS)]
static ECHO_INFERENCE: ProviderRegistration = ProviderRegistration {
    spec: ProviderSpec {
        capability: CapabilityId::Inference,
        kind: "echo",
        description: "Deterministic local inference (echoes prompts)",
        required_dependencies: &[],
        optional_dependencies: &[],
        external_packages: &[],
        config_schema_ref: "inference.echo.v1",
        deprecation: None,
    },
    factory: echo_factory,
};

// The factory is never reached through resolution - deprecated specs fail
// validation first - but the registration must still carry one.
#[linkme::distributed_slice(PROVIDER_REGISTRATIONS)]
static LEGACY_INFERENCE: ProviderRegistration = ProviderRegistration {
    spec: ProviderSpec {
        capability: CapabilityId::Inference,
        kind: "legacy",
        description: "Superseded local inference",
        required_dependencies: &[],
        optional_dependencies: &[],
        external_packages: &[],
        config_schema_ref: "inference.echo.v1",
        deprecation: Some("superseded by the 'echo' reference implementation; select kind 'echo'"),
    },
    factory: echo_factory,
};

//! Reference safety kind
//!
//! `keyword` screens text against a configured blocklist. It requires the
//! inference capability: real shields consult a model, so the dependency
//! edge is part of the reference wiring even though the keyword screen
//! itself never calls it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use spx_domain::capability::CapabilityId;
use spx_domain::error::Result;
use spx_domain::ports::provider::{CapabilityEndpoint, Provider, ProviderContext};
use spx_domain::spec::ProviderSpec;
use tracing::info;

use spx_application::registry::{PROVIDER_REGISTRATIONS, ProviderRegistration};

/// Configuration schema for the `keyword` kind.
#[derive(Debug, Default, Deserialize)]
pub struct KeywordConfig {
    /// Words that cause a screen to fail
    #[serde(default)]
    pub blocked: Vec<String>,
}

/// Blocklist-based safety screen.
pub struct KeywordSafety {
    instance_id: String,
    blocked: Vec<String>,
    inference: CapabilityEndpoint,
    running: AtomicBool,
}

impl KeywordSafety {
    /// Whether `text` passes the screen.
    pub fn screen(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        !self.blocked.iter().any(|word| lowered.contains(&word.to_lowercase()))
    }

    /// The inference endpoint this shield was wired to.
    pub fn inference(&self) -> &CapabilityEndpoint {
        &self.inference
    }
}

#[async_trait]
impl Provider for KeywordSafety {
    fn capability(&self) -> CapabilityId {
        CapabilityId::Safety
    }

    fn kind(&self) -> &str {
        "keyword"
    }

    async fn start(&self) -> Result<()> {
        self.running.store(true, Ordering::SeqCst);
        info!(
            instance = %self.instance_id,
            blocked = self.blocked.len(),
            "keyword safety started"
        );
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        info!(instance = %self.instance_id, "keyword safety stopped");
        Ok(())
    }
}

fn keyword_factory(ctx: &ProviderContext<'_>) -> Result<Arc<dyn Provider>> {
    let config: KeywordConfig = ctx.parse_config()?;
    let inference = ctx.required(CapabilityId::Inference)?;
    Ok(Arc::new(KeywordSafety {
        instance_id: ctx.instance_id.to_string(),
        blocked: config.blocked,
        inference,
        running: AtomicBool::new(false),
    }))
}

#[linkme::distributed_slice(PROVIDER_REGISTRATIONS)]
static KEYWORD_SAFETY: ProviderRegistration = ProviderRegistration {
    spec: ProviderSpec {
        capability: CapabilityId::Safety,
        kind: "keyword",
        description: "Blocklist safety screen backed by inference",
        required_dependencies: &[CapabilityId::Inference],
        optional_dependencies: &[],
        external_packages: &[],
        config_schema_ref: "safety.keyword.v1",
        deprecation: None,
    },
    factory: keyword_factory,
};

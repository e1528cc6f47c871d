//! Reference tool runtime kind
//!
//! `builtin` serves a fixed set of tool names. It takes the vector index as
//! an optional dependency: when an index is in the stack, the knowledge
//! search tool is listed as available.

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

/// Configuration schema for the `builtin` kind.
#[derive(Debug, Default, Deserialize)]
pub struct BuiltinToolConfig {
    /// Extra tool names to expose alongside the built-in set
    #[serde(default)]
    pub extra_tools: Vec<String>,
}

/// Fixed-set tool runtime.
pub struct BuiltinToolRuntime {
    instance_id: String,
    tools: Vec<String>,
    vector_index: Option<CapabilityEndpoint>,
    running: AtomicBool,
}

impl BuiltinToolRuntime {
    /// Tool names this runtime serves.
    pub fn tools(&self) -> &[String] {
        &self.tools
    }

    /// Whether a vector index was wired in.
    pub fn has_vector_index(&self) -> bool {
        self.vector_index.is_some()
    }
}

#[async_trait]
impl Provider for BuiltinToolRuntime {
    fn capability(&self) -> CapabilityId {
        CapabilityId::ToolRuntime
    }

    fn kind(&self) -> &str {
        "builtin"
    }

    async fn start(&self) -> Result<()> {
        self.running.store(true, Ordering::SeqCst);
        info!(
            instance = %self.instance_id,
            tools = self.tools.len(),
            "builtin tool runtime started"
        );
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        info!(instance = %self.instance_id, "builtin tool runtime stopped");
        Ok(())
    }
}

fn builtin_factory(ctx: &ProviderContext<'_>) -> Result<Arc<dyn Provider>> {
    let config: BuiltinToolConfig = ctx.parse_config()?;
    let vector_index = ctx.optional(CapabilityId::VectorIndex);

    let mut tools = vec!["web-search".to_string(), "code-interpreter".to_string()];
    if vector_index.is_some() {
        tools.push("knowledge-search".to_string());
    }
    tools.extend(config.extra_tools);

    Ok(Arc::new(BuiltinToolRuntime {
        instance_id: ctx.instance_id.to_string(),
        tools,
        vector_index,
        running: AtomicBool::new(false),
    }))
}

#[linkme::distributed_slice(PROVIDER_REGISTRATIONS)]
static BUILTIN_TOOL_RUNTIME: ProviderRegistration = ProviderRegistration {
    spec: ProviderSpec {
        capability: CapabilityId::ToolRuntime,
        kind: "builtin",
        description: "Fixed-set tool runtime, knowledge search when an index is present",
        required_dependencies: &[],
        optional_dependencies: &[CapabilityId::VectorIndex],
        external_packages: &[],
        config_schema_ref: "tool-runtime.builtin.v1",
        deprecation: None,
    },
    factory: builtin_factory,
};

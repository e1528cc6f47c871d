//! Reference agents orchestration kind
//!
//! `reference` composes the other capabilities: it requires inference,
//! safety, and the tool runtime, and picks up the vector index when one is
//! in the stack. Agents is the one capability that stays single-instance.

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

fn default_max_turns() -> u32 {
    10
}

/// Configuration schema for the `reference` kind.
#[derive(Debug, Deserialize)]
pub struct ReferenceAgentsConfig {
    /// Upper bound on orchestration turns per session
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
}

/// Orchestration layer over the composed capabilities.
pub struct ReferenceAgents {
    instance_id: String,
    max_turns: u32,
    inference: CapabilityEndpoint,
    safety: CapabilityEndpoint,
    tool_runtime: CapabilityEndpoint,
    vector_index: Option<CapabilityEndpoint>,
    running: AtomicBool,
}

impl ReferenceAgents {
    /// The configured turn bound.
    pub fn max_turns(&self) -> u32 {
        self.max_turns
    }

    /// The inference endpoint in use.
    pub fn inference(&self) -> &CapabilityEndpoint {
        &self.inference
    }

    /// The safety endpoint in use.
    pub fn safety(&self) -> &CapabilityEndpoint {
        &self.safety
    }

    /// The tool runtime endpoint in use.
    pub fn tool_runtime(&self) -> &CapabilityEndpoint {
        &self.tool_runtime
    }

    /// Whether a vector index was wired in.
    pub fn has_vector_index(&self) -> bool {
        self.vector_index.is_some()
    }
}

#[async_trait]
impl Provider for ReferenceAgents {
    fn capability(&self) -> CapabilityId {
        CapabilityId::Agents
    }

    fn kind(&self) -> &str {
        "reference"
    }

    async fn start(&self) -> Result<()> {
        self.running.store(true, Ordering::SeqCst);
        info!(
            instance = %self.instance_id,
            max_turns = self.max_turns,
            vector_index = self.vector_index.is_some(),
            "reference agents started"
        );
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        info!(instance = %self.instance_id, "reference agents stopped");
        Ok(())
    }
}

fn reference_factory(ctx: &ProviderContext<'_>) -> Result<Arc<dyn Provider>> {
    let config: ReferenceAgentsConfig = ctx.parse_config()?;
    Ok(Arc::new(ReferenceAgents {
        instance_id: ctx.instance_id.to_string(),
        max_turns: config.max_turns,
        inference: ctx.required(CapabilityId::Inference)?,
        safety: ctx.required(CapabilityId::Safety)?,
        tool_runtime: ctx.required(CapabilityId::ToolRuntime)?,
        vector_index: ctx.optional(CapabilityId::VectorIndex),
        running: AtomicBool::new(false),
    }))
}

#[linkme::distributed_slice(PROVIDER_REGISTRATIONS)]
static REFERENCE_AGENTS: ProviderRegistration = ProviderRegistration {
    spec: ProviderSpec {
        capability: CapabilityId::Agents,
        kind: "reference",
        description: "Orchestration over inference, safety, and tools",
        required_dependencies: &[
            CapabilityId::Inference,
            CapabilityId::Safety,
            CapabilityId::ToolRuntime,
        ],
        optional_dependencies: &[CapabilityId::VectorIndex],
        external_packages: &[],
        config_schema_ref: "agents.reference.v1",
        deprecation: None,
    },
    factory: reference_factory,
};

#[cfg(test)]
mod tests {
    use super::*;
    use spx_domain::error::Error;
    use spx_domain::ports::provider::{DependencyMap, LiveProvider};

    struct Noop(CapabilityId);

    #[async_trait]
    impl Provider for Noop {
        fn capability(&self) -> CapabilityId {
            self.0
        }
        fn kind(&self) -> &str {
            "noop"
        }
        async fn start(&self) -> Result<()> {
            Ok(())
        }
        async fn stop(&self) -> Result<()> {
            Ok(())
        }
    }

    fn endpoint(capability: CapabilityId, id: &str) -> CapabilityEndpoint {
        CapabilityEndpoint::Direct(Arc::new(LiveProvider::new(
            id,
            capability,
            "noop",
            Arc::new(Noop(capability)),
            Vec::new(),
        )))
    }

    fn full_deps() -> DependencyMap {
        let mut deps = DependencyMap::new();
        deps.insert(CapabilityId::Inference, endpoint(CapabilityId::Inference, "i1"));
        deps.insert(CapabilityId::Safety, endpoint(CapabilityId::Safety, "s1"));
        deps.insert(
            CapabilityId::ToolRuntime,
            endpoint(CapabilityId::ToolRuntime, "t1"),
        );
        deps
    }

    #[test]
    fn constructs_without_the_optional_index() {
        let deps = full_deps();
        let raw = serde_json::json!({"max_turns": 3});
        let ctx = ProviderContext {
            instance_id: "a1",
            raw_config: &raw,
            deps: &deps,
        };
        let provider = reference_factory(&ctx).unwrap();
        assert_eq!(provider.capability(), CapabilityId::Agents);
    }

    #[test]
    fn any_missing_requirement_is_an_invariant_violation() {
        let mut deps = DependencyMap::new();
        deps.insert(CapabilityId::Inference, endpoint(CapabilityId::Inference, "i1"));
        let raw = serde_json::json!({});
        let ctx = ProviderContext {
            instance_id: "a1",
            raw_config: &raw,
            deps: &deps,
        };
        assert!(matches!(
            reference_factory(&ctx),
            Err(Error::DependencyUnavailable { .. })
        ));
    }
}

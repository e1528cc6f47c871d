//! Remote proxy kind
//!
//! One registration per capability, all sharing the `remote` kind name. A
//! stack composed entirely of remote instances resolves each capability to a
//! single proxy handle; construction only records the endpoint address, and
//! start/stop are local no-ops - this core performs no transport.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use spx_domain::capability::CapabilityId;
use spx_domain::error::Result;
use spx_domain::ports::provider::{Provider, ProviderContext};
use spx_domain::spec::{ProviderSpec, REMOTE_KIND};
use tracing::info;

use spx_application::registry::{PROVIDER_REGISTRATIONS, ProviderRegistration};

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8321
}

/// Configuration schema shared by every remote registration.
#[derive(Debug, Deserialize)]
pub struct RemoteConfig {
    /// Host of the serving stack
    #[serde(default = "default_host")]
    pub host: String,
    /// Port of the serving stack
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Proxy handle for a capability served elsewhere.
pub struct RemoteProxy {
    instance_id: String,
    capability: CapabilityId,
    endpoint: String,
    running: AtomicBool,
}

impl RemoteProxy {
    /// The recorded endpoint address.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Provider for RemoteProxy {
    fn capability(&self) -> CapabilityId {
        self.capability
    }

    fn kind(&self) -> &str {
        REMOTE_KIND
    }

    async fn start(&self) -> Result<()> {
        self.running.store(true, Ordering::SeqCst);
        info!(
            instance = %self.instance_id,
            capability = %self.capability,
            endpoint = %self.endpoint,
            "remote proxy attached"
        );
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        info!(instance = %self.instance_id, "remote proxy detached");
        Ok(())
    }
}

fn remote_proxy(capability: CapabilityId, ctx: &ProviderContext<'_>) -> Result<Arc<dyn Provider>> {
    let config: RemoteConfig = ctx.parse_config()?;
    Ok(Arc::new(RemoteProxy {
        instance_id: ctx.instance_id.to_string(),
        capability,
        endpoint: format!("http://{}:{}", config.host, config.port),
        running: AtomicBool::new(false),
    }))
}

fn remote_inference(ctx: &ProviderContext<'_>) -> Result<Arc<dyn Provider>> {
    remote_proxy(CapabilityId::Inference, ctx)
}

fn remote_safety(ctx: &ProviderContext<'_>) -> Result<Arc<dyn Provider>> {
    remote_proxy(CapabilityId::Safety, ctx)
}

fn remote_vector_index(ctx: &ProviderContext<'_>) -> Result<Arc<dyn Provider>> {
    remote_proxy(CapabilityId::VectorIndex, ctx)
}

fn remote_agents(ctx: &ProviderContext<'_>) -> Result<Arc<dyn Provider>> {
    remote_proxy(CapabilityId::Agents, ctx)
}

fn remote_tool_runtime(ctx: &ProviderContext<'_>) -> Result<Arc<dyn Provider>> {
    remote_proxy(CapabilityId::ToolRuntime, ctx)
}

#[linkme::distributed_slice(PROVIDER_REGISTRATIONS)]
static REMOTE_INFERENCE: ProviderRegistration = ProviderRegistration {
    spec: ProviderSpec {
        capability: CapabilityId::Inference,
        kind: REMOTE_KIND,
        description: "Inference served by a remote stack",
        required_dependencies: &[],
        optional_dependencies: &[],
        external_packages: &[],
        config_schema_ref: "remote.v1",
        deprecation: None,
    },
    factory: remote_inference,
};

#[linkme::distributed_slice(PROVIDER_REGISTRATIONS)]
static REMOTE_SAFETY: ProviderRegistration = ProviderRegistration {
    spec: ProviderSpec {
        capability: CapabilityId::Safety,
        kind: REMOTE_KIND,
        description: "Safety served by a remote stack",
        required_dependencies: &[],
        optional_dependencies: &[],
        external_packages: &[],
        config_schema_ref: "remote.v1",
        deprecation: None,
    },
    factory: remote_safety,
};

#[linkme::distributed_slice(PROVIDER_REGISTRATIONS)]
static REMOTE_VECTOR_INDEX: ProviderRegistration = ProviderRegistration {
    spec: ProviderSpec {
        capability: CapabilityId::VectorIndex,
        kind: REMOTE_KIND,
        description: "Vector index served by a remote stack",
        required_dependencies: &[],
        optional_dependencies: &[],
        external_packages: &[],
        config_schema_ref: "remote.v1",
        deprecation: None,
    },
    factory: remote_vector_index,
};

#[linkme::distributed_slice(PROVIDER_REGISTRATIONS)]
static REMOTE_AGENTS: ProviderRegistration = ProviderRegistration {
    spec: ProviderSpec {
        capability: CapabilityId::Agents,
        kind: REMOTE_KIND,
        description: "Agents served by a remote stack",
        required_dependencies: &[],
        optional_dependencies: &[],
        external_packages: &[],
        config_schema_ref: "remote.v1",
        deprecation: None,
    },
    factory: remote_agents,
};

#[linkme::distributed_slice(PROVIDER_REGISTRATIONS)]
static REMOTE_TOOL_RUNTIME: ProviderRegistration = ProviderRegistration {
    spec: ProviderSpec {
        capability: CapabilityId::ToolRuntime,
        kind: REMOTE_KIND,
        description: "Tool runtime served by a remote stack",
        required_dependencies: &[],
        optional_dependencies: &[],
        external_packages: &[],
        config_schema_ref: "remote.v1",
        deprecation: None,
    },
    factory: remote_tool_runtime,
};

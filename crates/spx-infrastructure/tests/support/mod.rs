//! Scripted provider harness for runtime tests
//!
//! Providers built here behave according to their instance configuration:
//! they can fail or delay their start/stop and record every lifecycle event
//! into a per-test log, so tests can assert exact ordering.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use spx_application::catalog::CapabilityCatalog;
use spx_application::registry::ProviderRegistration;
use spx_domain::capability::CapabilityId;
use spx_domain::error::{Error, Result};
use spx_domain::ports::provider::{Provider, ProviderContext};
use spx_domain::request::{ProviderInstanceConfig, StackRequest};
use spx_domain::spec::ProviderSpec;
use spx_infrastructure::runtime::ShutdownSignal;

static LOGS: LazyLock<Mutex<HashMap<String, Arc<Mutex<Vec<String>>>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

static SIGNALS: LazyLock<Mutex<HashMap<String, Arc<ShutdownSignal>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// The event log for a test key, created on first use.
pub fn log_for(key: &str) -> Arc<Mutex<Vec<String>>> {
    LOGS.lock()
        .unwrap()
        .entry(key.to_string())
        .or_default()
        .clone()
}

/// Snapshot of the events recorded under a test key.
pub fn events(key: &str) -> Vec<String> {
    log_for(key).lock().unwrap().clone()
}

fn record(key: &str, event: String) {
    log_for(key).lock().unwrap().push(event);
}

/// Expose a runtime's shutdown handle to scripted providers under a test key.
pub fn install_signal(key: &str, signal: Arc<ShutdownSignal>) {
    SIGNALS.lock().unwrap().insert(key.to_string(), signal);
}

#[derive(Debug, Deserialize)]
struct ScriptConfig {
    /// Per-test log key; also addresses the installed shutdown signal
    log: String,
    #[serde(default)]
    fail_start: bool,
    #[serde(default)]
    fail_stop: bool,
    #[serde(default)]
    start_delay_ms: u64,
    #[serde(default)]
    stop_delay_ms: u64,
    /// Request stack shutdown from inside this provider's start
    #[serde(default)]
    signal_shutdown_on_start: bool,
}

struct ScriptedProvider {
    capability: CapabilityId,
    instance_id: String,
    config: ScriptConfig,
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn capability(&self) -> CapabilityId {
        self.capability
    }

    fn kind(&self) -> &str {
        "script"
    }

    async fn start(&self) -> Result<()> {
        if self.config.start_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.start_delay_ms)).await;
        }
        if self.config.signal_shutdown_on_start {
            if let Some(signal) = SIGNALS.lock().unwrap().get(&self.config.log) {
                signal.request();
            }
        }
        if self.config.fail_start {
            return Err(Error::config(format!(
                "scripted start failure for '{}'",
                self.instance_id
            )));
        }
        record(&self.config.log, format!("start:{}", self.instance_id));
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if self.config.stop_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.stop_delay_ms)).await;
        }
        record(&self.config.log, format!("stop:{}", self.instance_id));
        if self.config.fail_stop {
            return Err(Error::config(format!(
                "scripted stop failure for '{}'",
                self.instance_id
            )));
        }
        Ok(())
    }
}

fn scripted(capability: CapabilityId, ctx: &ProviderContext<'_>) -> Result<Arc<dyn Provider>> {
    let config: ScriptConfig = ctx.parse_config()?;
    Ok(Arc::new(ScriptedProvider {
        capability,
        instance_id: ctx.instance_id.to_string(),
        config,
    }))
}

fn scripted_inference(ctx: &ProviderContext<'_>) -> Result<Arc<dyn Provider>> {
    scripted(CapabilityId::Inference, ctx)
}

fn scripted_safety(ctx: &ProviderContext<'_>) -> Result<Arc<dyn Provider>> {
    scripted(CapabilityId::Safety, ctx)
}

fn scripted_agents(ctx: &ProviderContext<'_>) -> Result<Arc<dyn Provider>> {
    scripted(CapabilityId::Agents, ctx)
}

fn scripted_vector_index(ctx: &ProviderContext<'_>) -> Result<Arc<dyn Provider>> {
    scripted(CapabilityId::VectorIndex, ctx)
}

/// Catalog of scripted kinds: inference stands alone, safety requires
/// inference, agents requires both, vector-index stands alone.
pub fn scripted_catalog() -> CapabilityCatalog {
    let mut catalog = CapabilityCatalog::new();
    let entries: [(CapabilityId, &'static [CapabilityId], fn(&ProviderContext<'_>) -> Result<Arc<dyn Provider>>); 4] = [
        (CapabilityId::Inference, &[], scripted_inference),
        (CapabilityId::Safety, &[CapabilityId::Inference], scripted_safety),
        (
            CapabilityId::Agents,
            &[CapabilityId::Inference, CapabilityId::Safety],
            scripted_agents,
        ),
        (CapabilityId::VectorIndex, &[], scripted_vector_index),
    ];
    for (capability, required, factory) in entries {
        catalog
            .register(ProviderRegistration {
                spec: ProviderSpec {
                    capability,
                    kind: "script",
                    description: "scripted test kind",
                    required_dependencies: required,
                    optional_dependencies: &[],
                    external_packages: &[],
                    config_schema_ref: "test.script.v1",
                    deprecation: None,
                },
                factory,
            })
            .unwrap();
    }
    catalog
}

/// One scripted instance with the given overrides merged over the log key.
pub fn scripted_instance(id: &str, log: &str, overrides: serde_json::Value) -> ProviderInstanceConfig {
    let mut config = serde_json::json!({ "log": log });
    if let (Some(base), Some(extra)) = (config.as_object_mut(), overrides.as_object()) {
        for (k, v) in extra {
            base.insert(k.clone(), v.clone());
        }
    }
    ProviderInstanceConfig::new(id, "script").with_config(config)
}

/// Request over the scripted catalog with one instance per capability.
pub fn scripted_request(log: &str, capabilities: &[(CapabilityId, &str)]) -> StackRequest {
    let mut request = StackRequest::new();
    for (capability, id) in capabilities {
        request.insert(
            *capability,
            vec![scripted_instance(id, log, serde_json::json!({}))],
        );
    }
    request
}

//! Reference vector index kind
//!
//! `memory` keeps vectors in a process-local map. Deterministic and
//! offline; exists to exercise multi-instance routing and configuration
//! validation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::Deserialize;
use spx_domain::capability::CapabilityId;
use spx_domain::error::{Error, Result};
use spx_domain::ports::provider::{Provider, ProviderContext};
use spx_domain::spec::ProviderSpec;
use tracing::info;

use spx_application::registry::{PROVIDER_REGISTRATIONS, ProviderRegistration};

fn default_dimension() -> usize {
    384
}

/// Configuration schema for the `memory` kind.
#[derive(Debug, Deserialize)]
pub struct MemoryIndexConfig {
    /// Dimensionality every stored vector must match
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

/// Process-local vector index.
pub struct MemoryVectorIndex {
    instance_id: String,
    dimension: usize,
    vectors: RwLock<HashMap<String, Vec<f32>>>,
    running: AtomicBool,
}

impl MemoryVectorIndex {
    /// The configured dimensionality.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Store a vector under `key`, replacing any existing entry.
    pub fn upsert(&self, key: &str, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(Error::config(format!(
                "vector for '{key}' has dimension {}, index '{}' expects {}",
                vector.len(),
                self.instance_id,
                self.dimension
            )));
        }
        self.vectors
            .write()
            .expect("vector map lock poisoned")
            .insert(key.to_string(), vector);
        Ok(())
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.vectors.read().expect("vector map lock poisoned").len()
    }

    /// Whether the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Provider for MemoryVectorIndex {
    fn capability(&self) -> CapabilityId {
        CapabilityId::VectorIndex
    }

    fn kind(&self) -> &str {
        "memory"
    }

    async fn start(&self) -> Result<()> {
        self.running.store(true, Ordering::SeqCst);
        info!(
            instance = %self.instance_id,
            dimension = self.dimension,
            "memory vector index started"
        );
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        self.vectors
            .write()
            .expect("vector map lock poisoned")
            .clear();
        info!(instance = %self.instance_id, "memory vector index stopped");
        Ok(())
    }
}

fn memory_factory(ctx: &ProviderContext<'_>) -> Result<Arc<dyn Provider>> {
    let config: MemoryIndexConfig = ctx.parse_config()?;
    if config.dimension == 0 {
        return Err(Error::InvalidConfig {
            instance_id: ctx.instance_id.to_string(),
            message: "field 'dimension' must be greater than zero".to_string(),
        });
    }
    Ok(Arc::new(MemoryVectorIndex {
        instance_id: ctx.instance_id.to_string(),
        dimension: config.dimension,
        vectors: RwLock::new(HashMap::new()),
        running: AtomicBool::new(false),
    }))
}

#[linkme::distributed_slice(PROVIDER_REGISTRATIONS)]
static MEMORY_VECTOR_INDEX: ProviderRegistration = ProviderRegistration {
    spec: ProviderSpec {
        capability: CapabilityId::VectorIndex,
        kind: "memory",
        description: "Process-local vector index",
        required_dependencies: &[],
        optional_dependencies: &[],
        external_packages: &[],
        config_schema_ref: "vector-index.memory.v1",
        deprecation: None,
    },
    factory: memory_factory,
};

#[cfg(test)]
mod tests {
    use super::*;
    use spx_domain::ports::provider::DependencyMap;

    fn build(raw: serde_json::Value) -> Result<Arc<dyn Provider>> {
        let deps = DependencyMap::new();
        let ctx = ProviderContext {
            instance_id: "v1",
            raw_config: &raw,
            deps: &deps,
        };
        memory_factory(&ctx)
    }

    #[test]
    fn zero_dimension_is_invalid_config() {
        let err = build(serde_json::json!({"dimension": 0})).err().unwrap();
        match err {
            Error::InvalidConfig { message, .. } => assert!(message.contains("dimension")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn upsert_enforces_the_dimension() {
        let index = MemoryVectorIndex {
            instance_id: "v1".to_string(),
            dimension: 2,
            vectors: RwLock::new(HashMap::new()),
            running: AtomicBool::new(false),
        };
        index.upsert("a", vec![0.1, 0.2]).unwrap();
        assert!(index.upsert("b", vec![0.1]).is_err());
        assert_eq!(index.len(), 1);
    }

    #[tokio::test]
    async fn stop_clears_the_index() {
        let provider = build(serde_json::json!({"dimension": 2})).unwrap();
        provider.start().await.unwrap();
        provider.stop().await.unwrap();
    }
}

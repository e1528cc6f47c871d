//! Requested and resolved stack shapes
//!
//! A [`StackRequest`] is the caller's declarative selection: which provider
//! instances should serve each capability. The resolver turns it into a
//! [`ResolvedStack`], the dependency-ordered sequence the instantiator walks.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::capability::CapabilityId;

fn empty_config() -> Value {
    Value::Object(serde_json::Map::new())
}

/// One requested provider instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInstanceConfig {
    /// Instance identifier, unique within its capability
    pub instance_id: String,
    /// Provider kind; must match a registered spec
    pub kind: String,
    /// Opaque configuration blob, handed to the provider's own parser
    #[serde(rename = "config", default = "empty_config")]
    pub raw_config: Value,
}

impl ProviderInstanceConfig {
    /// Create an instance config with an empty configuration blob.
    pub fn new(instance_id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            kind: kind.into(),
            raw_config: empty_config(),
        }
    }

    /// Attach a configuration blob.
    pub fn with_config(mut self, raw_config: Value) -> Self {
        self.raw_config = raw_config;
        self
    }
}

/// The caller's requested stack: capability -> ordered instance configs.
///
/// Insertion order is preserved and used as the deterministic tie-breaker
/// when dependency edges leave the relative order of two capabilities open.
#[derive(Debug, Clone, Default)]
pub struct StackRequest {
    entries: Vec<(CapabilityId, Vec<ProviderInstanceConfig>)>,
}

impl StackRequest {
    /// Create an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add instances for a capability. Appends when the capability was
    /// already requested, preserving the earlier position in the order.
    pub fn insert(
        &mut self,
        capability: CapabilityId,
        instances: Vec<ProviderInstanceConfig>,
    ) -> &mut Self {
        if let Some((_, existing)) = self.entries.iter_mut().find(|(c, _)| *c == capability) {
            existing.extend(instances);
        } else {
            self.entries.push((capability, instances));
        }
        self
    }

    /// Builder-style variant of [`StackRequest::insert`].
    pub fn with(mut self, capability: CapabilityId, instances: Vec<ProviderInstanceConfig>) -> Self {
        self.insert(capability, instances);
        self
    }

    /// Requested capabilities, in caller order.
    pub fn capabilities(&self) -> Vec<CapabilityId> {
        self.entries.iter().map(|(c, _)| *c).collect()
    }

    /// Instances requested for a capability.
    pub fn instances(&self, capability: CapabilityId) -> Option<&[ProviderInstanceConfig]> {
        self.entries
            .iter()
            .find(|(c, _)| *c == capability)
            .map(|(_, v)| v.as_slice())
    }

    /// Iterate `(capability, instances)` in caller order.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (CapabilityId, &[ProviderInstanceConfig])> + '_ {
        self.entries.iter().map(|(c, v)| (*c, v.as_slice()))
    }

    /// Iterate every requested instance with its capability, in caller order.
    pub fn iter_instances(
        &self,
    ) -> impl Iterator<Item = (CapabilityId, &ProviderInstanceConfig)> + '_ {
        self.entries
            .iter()
            .flat_map(|(c, v)| v.iter().map(move |i| (*c, i)))
    }

    /// Whether nothing was requested.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The resolver's output: a dependency-ordered instantiation sequence.
///
/// For every entry, all capabilities named in its spec's required
/// dependencies appear strictly earlier. The sequence is a valid topological
/// order of the dependency graph restricted to the requested capabilities;
/// it is acyclic by construction.
#[derive(Debug, Clone)]
pub struct ResolvedStack {
    entries: Vec<(CapabilityId, ProviderInstanceConfig)>,
    remote_only: bool,
}

impl ResolvedStack {
    /// Build a resolved stack. Only the resolver should call this.
    pub fn new(entries: Vec<(CapabilityId, ProviderInstanceConfig)>, remote_only: bool) -> Self {
        Self {
            entries,
            remote_only,
        }
    }

    /// The ordered `(capability, instance)` pairs.
    pub fn entries(&self) -> &[(CapabilityId, ProviderInstanceConfig)] {
        &self.entries
    }

    /// Whether every instance resolved to the remote proxy kind.
    pub fn is_remote_only(&self) -> bool {
        self.remote_only
    }

    /// Distinct capabilities in instantiation order.
    pub fn capability_order(&self) -> Vec<CapabilityId> {
        let mut order = Vec::new();
        for (capability, _) in &self.entries {
            if !order.contains(capability) {
                order.push(*capability);
            }
        }
        order
    }

    /// Number of instances to construct.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the resolved stack is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

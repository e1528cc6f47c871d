//! Resource routing table
//!
//! One table per routable capability. The instance set is fixed when the
//! stack is instantiated; resource bindings are dynamic and start empty.
//! Bindings are held in a concurrent map so registration and lookup are safe
//! under many concurrent callers once the stack is running.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use spx_domain::capability::CapabilityId;
use spx_domain::error::{Error, Result};
use spx_domain::ports::provider::LiveProvider;
use spx_domain::ports::routing::{DEFAULT_RESOURCE_KEY, ResourceRouter};
use tracing::debug;

/// Maps caller-defined resource keys to the owning provider instance.
///
/// A capability served by exactly one instance answers the implicit
/// well-known key without registration; explicit bindings always win. The
/// moment several instances serve the capability, every lookup goes through
/// the bindings.
pub struct RoutingTable {
    capability: CapabilityId,
    instances: HashMap<String, Arc<LiveProvider>>,
    sole_instance: Option<Arc<LiveProvider>>,
    bindings: DashMap<String, String>,
}

impl RoutingTable {
    /// Build a table over the live instances of one capability.
    pub fn new(capability: CapabilityId, live: Vec<Arc<LiveProvider>>) -> Self {
        let sole_instance = (live.len() == 1).then(|| live[0].clone());
        let instances = live
            .into_iter()
            .map(|p| (p.instance_id().to_string(), p))
            .collect();
        Self {
            capability,
            instances,
            sole_instance,
            bindings: DashMap::new(),
        }
    }

    /// The live instances behind this table, in no particular order.
    pub fn instances(&self) -> Vec<Arc<LiveProvider>> {
        self.instances.values().cloned().collect()
    }
}

impl ResourceRouter for RoutingTable {
    fn capability(&self) -> CapabilityId {
        self.capability
    }

    fn register(&self, resource_key: &str, instance_id: &str, overwrite: bool) -> Result<()> {
        if !self.instances.contains_key(instance_id) {
            return Err(Error::UnknownInstance {
                capability: self.capability,
                instance_id: instance_id.to_string(),
            });
        }
        match self.bindings.entry(resource_key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if !overwrite {
                    return Err(Error::DuplicateResource {
                        capability: self.capability,
                        resource_key: resource_key.to_string(),
                        bound_to: occupied.get().clone(),
                    });
                }
                occupied.insert(instance_id.to_string());
            }
            Entry::Vacant(vacant) => {
                vacant.insert(instance_id.to_string());
            }
        }
        debug!(
            capability = %self.capability,
            resource = resource_key,
            instance = instance_id,
            "resource registered"
        );
        Ok(())
    }

    fn resolve(&self, resource_key: &str) -> Result<Arc<LiveProvider>> {
        if let Some(bound) = self.bindings.get(resource_key) {
            // the instance set is fixed at construction, so a binding always
            // names a live instance
            return Ok(self.instances[bound.value()].clone());
        }
        if resource_key == DEFAULT_RESOURCE_KEY {
            if let Some(sole) = &self.sole_instance {
                return Ok(sole.clone());
            }
        }
        Err(Error::UnregisteredResource {
            capability: self.capability,
            resource_key: resource_key.to_string(),
        })
    }

    fn unregister(&self, resource_key: &str) {
        if self.bindings.remove(resource_key).is_some() {
            debug!(
                capability = %self.capability,
                resource = resource_key,
                "resource unregistered"
            );
        }
    }

    fn bindings(&self) -> Vec<(String, String)> {
        self.bindings
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

impl std::fmt::Debug for RoutingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingTable")
            .field("capability", &self.capability)
            .field("instances", &self.instances.len())
            .field("bindings", &self.bindings.len())
            .finish()
    }
}

//! Provider instantiator
//!
//! Walks a resolved stack in order, invoking each entry's registered factory
//! with the endpoints built so far. Construction is synchronous and cheap by
//! contract - no sockets, no network - so every construction failure is
//! known before anything starts. Any failure aborts the whole attempt;
//! partial stacks are never returned.

use std::collections::HashMap;
use std::sync::Arc;

use spx_application::catalog::CapabilityCatalog;
use spx_domain::capability::CapabilityId;
use spx_domain::error::{Error, Result};
use spx_domain::ports::provider::{
    CapabilityEndpoint, DependencyMap, LiveProvider, ProviderContext,
};
use spx_domain::request::ResolvedStack;
use tracing::debug;

use crate::routing::RoutingTable;

/// The fully constructed, not-yet-started stack.
pub struct InstantiatedStack {
    providers: Vec<Arc<LiveProvider>>,
    endpoints: HashMap<CapabilityId, CapabilityEndpoint>,
    routers: HashMap<CapabilityId, Arc<RoutingTable>>,
}

impl InstantiatedStack {
    /// Every constructed provider, in instantiation (dependency) order.
    pub fn providers(&self) -> &[Arc<LiveProvider>] {
        &self.providers
    }

    /// The endpoint exposed for a capability, if it was requested.
    pub fn endpoint(&self, capability: CapabilityId) -> Option<&CapabilityEndpoint> {
        self.endpoints.get(&capability)
    }

    /// The routing table behind a routable capability.
    pub fn router(&self, capability: CapabilityId) -> Option<&Arc<RoutingTable>> {
        self.routers.get(&capability)
    }

    /// Requested capabilities, in instantiation order.
    pub fn capabilities(&self) -> Vec<CapabilityId> {
        let mut order = Vec::new();
        for provider in &self.providers {
            if !order.contains(&provider.capability()) {
                order.push(provider.capability());
            }
        }
        order
    }
}

impl std::fmt::Debug for InstantiatedStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstantiatedStack")
            .field("providers", &self.providers.len())
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

/// Constructs live providers from a resolved stack.
pub struct ProviderInstantiator<'a> {
    catalog: &'a CapabilityCatalog,
}

impl<'a> ProviderInstantiator<'a> {
    /// Create an instantiator over the given catalog.
    pub fn new(catalog: &'a CapabilityCatalog) -> Self {
        Self { catalog }
    }

    /// Construct every provider in resolved order.
    ///
    /// Dependents receive the dependency capability's endpoint - the routing
    /// multiplexer when the capability routes, never an arbitrary single
    /// instance.
    pub fn instantiate(&self, resolved: &ResolvedStack) -> Result<InstantiatedStack> {
        let mut providers: Vec<Arc<LiveProvider>> = Vec::with_capacity(resolved.len());
        let mut endpoints: HashMap<CapabilityId, CapabilityEndpoint> = HashMap::new();
        let mut routers: HashMap<CapabilityId, Arc<RoutingTable>> = HashMap::new();
        let mut built: HashMap<CapabilityId, Vec<Arc<LiveProvider>>> = HashMap::new();
        let mut deps = DependencyMap::new();

        for capability in resolved.capability_order() {
            let mut capability_instances = Vec::new();
            for (entry_capability, instance) in resolved.entries() {
                if *entry_capability != capability {
                    continue;
                }
                let registration = self.catalog.lookup(capability, &instance.kind)?;
                let spec = &registration.spec;

                let context = ProviderContext {
                    instance_id: &instance.instance_id,
                    raw_config: &instance.raw_config,
                    deps: &deps,
                };
                let handle = (registration.factory)(&context)?;

                let mut dependencies = Vec::new();
                for dependency in spec.required_dependencies {
                    let live = built.get(dependency).ok_or(Error::DependencyUnavailable {
                        dependency: *dependency,
                        instance_id: instance.instance_id.clone(),
                    })?;
                    dependencies.extend(live.iter().cloned());
                }
                for dependency in spec.optional_dependencies {
                    if let Some(live) = built.get(dependency) {
                        dependencies.extend(live.iter().cloned());
                    }
                }

                let live = Arc::new(LiveProvider::new(
                    &instance.instance_id,
                    capability,
                    &instance.kind,
                    handle,
                    dependencies,
                ));
                debug!(
                    capability = %capability,
                    kind = %instance.kind,
                    instance = %instance.instance_id,
                    "provider constructed"
                );
                providers.push(live.clone());
                capability_instances.push(live);
            }

            let endpoint = if capability.is_routable() {
                let router = Arc::new(RoutingTable::new(capability, capability_instances.clone()));
                routers.insert(capability, router.clone());
                CapabilityEndpoint::Routed(router)
            } else {
                // the resolver admits exactly one instance of a
                // single-instance capability
                CapabilityEndpoint::Direct(capability_instances[0].clone())
            };
            endpoints.insert(capability, endpoint.clone());
            deps.insert(capability, endpoint);
            built.insert(capability, capability_instances);
        }

        Ok(InstantiatedStack {
            providers,
            endpoints,
            routers,
        })
    }
}

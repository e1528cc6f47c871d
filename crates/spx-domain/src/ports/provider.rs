//! Provider port
//!
//! The minimal capability set every provider kind exposes: construct (via its
//! registered factory), `start`, `stop`. Providers receive typed handles to
//! their dependencies' public endpoints, never to internal state.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::capability::CapabilityId;
use crate::error::{Error, Result};
use crate::ports::routing::{DEFAULT_RESOURCE_KEY, ResourceRouter};

/// The polymorphic provider contract.
///
/// Construction happens through the factory registered with the provider's
/// spec and must not block on external network calls; all expensive or
/// fallible setup belongs in [`Provider::start`], so a batch of failed
/// constructions can be reported before anything is started.
#[async_trait]
pub trait Provider: Send + Sync {
    /// The capability this provider serves.
    fn capability(&self) -> CapabilityId;

    /// The provider kind, as registered in the catalog.
    fn kind(&self) -> &str;

    /// Bring the provider into service. Called in dependency order; every
    /// dependency is already running when this is invoked.
    async fn start(&self) -> Result<()>;

    /// Take the provider out of service. Called in reverse start order.
    async fn stop(&self) -> Result<()>;
}

/// An instantiated provider bound to its dependencies.
///
/// Shared by the stack runtime and by any dependent that references it; no
/// provider outlives the runtime that created it.
pub struct LiveProvider {
    instance_id: String,
    capability: CapabilityId,
    kind: String,
    handle: Arc<dyn Provider>,
    dependencies: Vec<Arc<LiveProvider>>,
}

impl LiveProvider {
    /// Wrap a constructed provider.
    pub fn new(
        instance_id: impl Into<String>,
        capability: CapabilityId,
        kind: impl Into<String>,
        handle: Arc<dyn Provider>,
        dependencies: Vec<Arc<LiveProvider>>,
    ) -> Self {
        Self {
            instance_id: instance_id.into(),
            capability,
            kind: kind.into(),
            handle,
            dependencies,
        }
    }

    /// Instance identifier, unique within the capability.
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// The capability this instance serves.
    pub fn capability(&self) -> CapabilityId {
        self.capability
    }

    /// The provider kind of this instance.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The underlying provider object.
    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.handle
    }

    /// The live providers this instance depends on.
    pub fn dependencies(&self) -> &[Arc<LiveProvider>] {
        &self.dependencies
    }

    /// Start the underlying provider.
    pub async fn start(&self) -> Result<()> {
        self.handle.start().await
    }

    /// Stop the underlying provider.
    pub async fn stop(&self) -> Result<()> {
        self.handle.stop().await
    }
}

impl fmt::Debug for LiveProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveProvider")
            .field("instance_id", &self.instance_id)
            .field("capability", &self.capability)
            .field("kind", &self.kind)
            .field("dependencies", &self.dependencies.len())
            .finish()
    }
}

/// The per-capability handle handed to dependents and external callers.
///
/// A capability served by a single structurally-unique instance is exposed
/// directly; capabilities that admit several concurrent instances are exposed
/// through their resource router, so new resources registered at runtime are
/// visible to every holder of the endpoint.
#[derive(Clone)]
pub enum CapabilityEndpoint {
    /// Sole instance, addressed without indirection
    Direct(Arc<LiveProvider>),
    /// Router-backed multiplexer; dispatches by resource key
    Routed(Arc<dyn ResourceRouter>),
}

impl CapabilityEndpoint {
    /// Resolve the instance owning `resource_key`.
    ///
    /// A direct endpoint answers only the implicit well-known key.
    pub fn resolve(&self, resource_key: &str) -> Result<Arc<LiveProvider>> {
        match self {
            CapabilityEndpoint::Direct(instance) => {
                if resource_key == DEFAULT_RESOURCE_KEY {
                    Ok(instance.clone())
                } else {
                    Err(Error::UnregisteredResource {
                        capability: instance.capability(),
                        resource_key: resource_key.to_string(),
                    })
                }
            }
            CapabilityEndpoint::Routed(router) => router.resolve(resource_key),
        }
    }
}

impl fmt::Debug for CapabilityEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityEndpoint::Direct(p) => f
                .debug_tuple("Direct")
                .field(&p.instance_id().to_string())
                .finish(),
            CapabilityEndpoint::Routed(r) => {
                f.debug_tuple("Routed").field(&r.capability()).finish()
            }
        }
    }
}

/// Dependency endpoints available to a provider under construction.
///
/// Required dependencies are always present (the resolver guarantees it);
/// optional dependencies that were not requested resolve to `None`.
#[derive(Clone, Default)]
pub struct DependencyMap {
    endpoints: HashMap<CapabilityId, CapabilityEndpoint>,
}

impl DependencyMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the endpoint for a capability.
    pub fn insert(&mut self, capability: CapabilityId, endpoint: CapabilityEndpoint) {
        self.endpoints.insert(capability, endpoint);
    }

    /// Fetch a required dependency.
    ///
    /// Absence is a [`Error::DependencyUnavailable`] invariant violation, not
    /// a user error: the resolver admits no stack that omits a requirement.
    pub fn required(
        &self,
        capability: CapabilityId,
        instance_id: &str,
    ) -> Result<CapabilityEndpoint> {
        self.endpoints
            .get(&capability)
            .cloned()
            .ok_or_else(|| Error::DependencyUnavailable {
                dependency: capability,
                instance_id: instance_id.to_string(),
            })
    }

    /// Fetch an optional dependency, `None` when it was not requested.
    pub fn optional(&self, capability: CapabilityId) -> Option<CapabilityEndpoint> {
        self.endpoints.get(&capability).cloned()
    }

    /// Whether an endpoint is recorded for the capability.
    pub fn contains(&self, capability: CapabilityId) -> bool {
        self.endpoints.contains_key(&capability)
    }
}

impl fmt::Debug for DependencyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyMap")
            .field("capabilities", &self.endpoints.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Everything a factory needs to construct one provider instance.
pub struct ProviderContext<'a> {
    /// The instance being constructed
    pub instance_id: &'a str,
    /// The opaque configuration blob from the request
    pub raw_config: &'a Value,
    /// Already-instantiated dependency endpoints
    pub deps: &'a DependencyMap,
}

impl ProviderContext<'_> {
    /// Parse the raw configuration blob into the provider's own config type.
    pub fn parse_config<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.raw_config.clone()).map_err(|e| Error::InvalidConfig {
            instance_id: self.instance_id.to_string(),
            message: e.to_string(),
        })
    }

    /// Fetch a required dependency endpoint.
    pub fn required(&self, capability: CapabilityId) -> Result<CapabilityEndpoint> {
        self.deps.required(capability, self.instance_id)
    }

    /// Fetch an optional dependency endpoint.
    pub fn optional(&self, capability: CapabilityId) -> Option<CapabilityEndpoint> {
        self.deps.optional(capability)
    }
}

/// Construction entry point registered alongside each provider spec.
pub type ProviderFactory = fn(&ProviderContext<'_>) -> Result<Arc<dyn Provider>>;

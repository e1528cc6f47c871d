//! Domain layer for Stackplex
//!
//! Pure types and port contracts for the capability composition core: the
//! closed capability set, static provider specs, requested and resolved stack
//! shapes, lifecycle states, the error taxonomy, and the provider/routing
//! ports. No I/O lives here.

/// Capability identifiers
pub mod capability;
/// Error taxonomy
pub mod error;
/// Runtime lifecycle states
pub mod lifecycle;
/// Port interfaces implemented by outer layers
pub mod ports;
/// Requested and resolved stack shapes
pub mod request;
/// Static provider descriptions
pub mod spec;

pub use capability::CapabilityId;
pub use error::{Error, Result};
pub use lifecycle::LifecycleState;
pub use ports::{
    CapabilityEndpoint, DEFAULT_RESOURCE_KEY, DependencyMap, LiveProvider, Provider,
    ProviderContext, ProviderFactory, ResourceRouter,
};
pub use request::{ProviderInstanceConfig, ResolvedStack, StackRequest};
pub use spec::{ProviderSpec, REMOTE_KIND};

//! Domain port interfaces
//!
//! Boundary contracts between the composition core and the layers that
//! implement it. The domain defines the interfaces; providers and
//! infrastructure implement them.
//!
//! - **provider** - the polymorphic provider contract and the handles built
//!   around constructed instances
//! - **routing** - resource-identity dispatch for multi-instance capabilities

/// Provider contract, live instances, dependency endpoints
pub mod provider;
/// Resource routing contract
pub mod routing;

// Re-export commonly used port types for convenience
pub use provider::{
    CapabilityEndpoint, DependencyMap, LiveProvider, Provider, ProviderContext, ProviderFactory,
};
pub use routing::{DEFAULT_RESOURCE_KEY, ResourceRouter};

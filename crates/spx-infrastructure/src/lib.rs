//! Infrastructure layer for Stackplex
//!
//! Everything that turns a resolved stack into a running one: the provider
//! instantiator, the stack runtime and its lifecycle state machine, the
//! resource routing table, configuration loading, and logging setup.

/// Stack configuration and the figment loader
pub mod config;
/// Provider instantiator
pub mod instantiator;
/// Logging setup
pub mod logging;
/// Resource routing table
pub mod routing;
/// Stack runtime and lifecycle
pub mod runtime;

pub use config::{ConfigLoader, LifecycleConfig, LoggingConfig, StackConfig};
pub use instantiator::{InstantiatedStack, ProviderInstantiator};
pub use logging::init_logging;
pub use routing::RoutingTable;
pub use runtime::{LifecycleOptions, ShutdownSignal, StackRuntime};

//! # Stackplex
//!
//! Declarative composition and routing of pluggable capability providers.
//!
//! A stack is assembled from independently developed provider kinds selected
//! per capability. Resolution validates the selection and orders it by
//! dependency, instantiation constructs each provider with its dependencies
//! injected, and capabilities with several concurrent instances dispatch by
//! resource identity through a routing table.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use spx::application::CapabilityCatalog;
//! use spx::domain::{CapabilityId, ProviderInstanceConfig, StackRequest};
//! use spx::infrastructure::{LifecycleOptions, StackRuntime};
//!
//! # async fn compose() -> spx::domain::Result<()> {
//! let catalog = Arc::new(CapabilityCatalog::from_registrations()?);
//! let request = StackRequest::new()
//!     .with(
//!         CapabilityId::Inference,
//!         vec![ProviderInstanceConfig::new("i1", "echo")],
//!     )
//!     .with(
//!         CapabilityId::Safety,
//!         vec![ProviderInstanceConfig::new("s1", "keyword")],
//!     );
//!
//! let mut runtime = StackRuntime::new(catalog, request, LifecycleOptions::default());
//! runtime.resolve()?;
//! runtime.instantiate()?;
//! runtime.start().await?;
//!
//! runtime.register_resource(CapabilityId::Inference, "my-model", "i1", false)?;
//! let provider = runtime.resolve_resource(CapabilityId::Inference, "my-model")?;
//! assert_eq!(provider.instance_id(), "i1");
//!
//! runtime.shutdown().await?;
//! # Ok(())
//! # }
//! ```

// Force-link spx-providers so its linkme registrations reach the catalog
extern crate spx_providers;

/// Domain layer - core types, ports, and the error taxonomy
pub mod domain {
    pub use spx_domain::*;
}

/// Application layer - catalog, resolver, and build planner
pub mod application {
    pub use spx_application::*;
}

/// Infrastructure layer - runtime, routing, configuration, logging
pub mod infrastructure {
    pub use spx_infrastructure::*;
}

/// Built-in provider kinds
pub mod providers {
    pub use spx_providers::*;
}

pub use spx_domain::{
    CapabilityId, Error, LifecycleState, ProviderInstanceConfig, Result, StackRequest,
};

//! Resource routing port
//!
//! Capabilities that admit several concurrently active instances are exposed
//! through a router that dispatches by resource identity (which model, which
//! index). Bindings are added after the stack is running, by explicit
//! registration calls.

use std::sync::Arc;

use crate::capability::CapabilityId;
use crate::error::Result;
use crate::ports::provider::LiveProvider;

/// The implicit well-known key a single-instance capability answers without
/// any prior registration.
pub const DEFAULT_RESOURCE_KEY: &str = "default";

/// Dispatch structure mapping a resource key to the instance that owns it.
///
/// Implementations must be safe under concurrent registration and lookup:
/// readers never observe a partially applied registration. Routing failures
/// are per-call and never disturb other in-flight calls.
pub trait ResourceRouter: Send + Sync {
    /// The capability this router dispatches for.
    fn capability(&self) -> CapabilityId;

    /// Bind `resource_key` to the live instance named by `instance_id`.
    ///
    /// Fails with `DuplicateResource` when the key is already bound and
    /// `overwrite` is false, and with `UnknownInstance` when no live instance
    /// of this capability carries the id.
    fn register(&self, resource_key: &str, instance_id: &str, overwrite: bool) -> Result<()>;

    /// Resolve the instance owning `resource_key`.
    ///
    /// Fails with `UnregisteredResource` when no binding exists and the fast
    /// path does not apply.
    fn resolve(&self, resource_key: &str) -> Result<Arc<LiveProvider>>;

    /// Remove the binding for `resource_key`. Idempotent; a missing key is
    /// not an error.
    fn unregister(&self, resource_key: &str);

    /// Current bindings as `(resource_key, instance_id)` pairs.
    fn bindings(&self) -> Vec<(String, String)>;
}

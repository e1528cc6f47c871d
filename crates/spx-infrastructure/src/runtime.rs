//! Stack runtime
//!
//! Owns the composed capability implementations and drives the lifecycle
//! state machine: `Unresolved -> Resolved -> Instantiated -> Starting ->
//! Running -> Stopping -> Stopped`, with `Failed` terminal from any
//! non-terminal state. Providers start in resolved order and stop in strict
//! reverse, every call bounded by a configurable timeout.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use spx_application::catalog::CapabilityCatalog;
use spx_application::resolver::DependencyResolver;
use spx_domain::capability::CapabilityId;
use spx_domain::error::{Error, Result};
use spx_domain::lifecycle::LifecycleState;
use spx_domain::ports::provider::{CapabilityEndpoint, LiveProvider};
use spx_domain::ports::routing::ResourceRouter;
use spx_domain::request::{ResolvedStack, StackRequest};
use tokio::sync::Notify;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::instantiator::{InstantiatedStack, ProviderInstantiator};

/// Caller-configurable lifecycle timeouts.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleOptions {
    /// Bound on each provider's `start()`
    pub start_timeout: Duration,
    /// Bound on each provider's `stop()`
    pub stop_timeout: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            start_timeout: Duration::from_secs(30),
            stop_timeout: Duration::from_secs(10),
        }
    }
}

/// Cross-task shutdown request flag.
///
/// A start sequence in flight observes the signal between providers and
/// unwinds in place instead of leaving the stack half-initialized.
pub struct ShutdownSignal {
    flag: AtomicBool,
    notify: Notify,
}

impl ShutdownSignal {
    fn new() -> Self {
        Self {
            flag: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Request shutdown. Idempotent.
    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Whether shutdown has been requested.
    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Wait asynchronously for a shutdown request.
    pub async fn wait(&self) {
        let mut notified = std::pin::pin!(self.notify.notified());
        // register before re-checking the flag so a request landing in
        // between is not lost
        notified.as_mut().enable();
        if self.is_requested() {
            return;
        }
        notified.await;
    }
}

impl std::fmt::Debug for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownSignal")
            .field("requested", &self.is_requested())
            .finish()
    }
}

/// The single object surfaced to callers: the composed stack plus its
/// lifecycle state.
pub struct StackRuntime {
    catalog: Arc<CapabilityCatalog>,
    request: StackRequest,
    options: LifecycleOptions,
    state: LifecycleState,
    resolved: Option<ResolvedStack>,
    stack: Option<InstantiatedStack>,
    started: Vec<Arc<LiveProvider>>,
    shutdown: Arc<ShutdownSignal>,
}

impl StackRuntime {
    /// Create a runtime for a requested stack. Nothing is validated or
    /// constructed until [`StackRuntime::resolve`] is called.
    pub fn new(
        catalog: Arc<CapabilityCatalog>,
        request: StackRequest,
        options: LifecycleOptions,
    ) -> Self {
        Self {
            catalog,
            request,
            options,
            state: LifecycleState::Unresolved,
            resolved: None,
            stack: None,
            started: Vec::new(),
            shutdown: Arc::new(ShutdownSignal::new()),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Handle for requesting shutdown from another task.
    pub fn shutdown_handle(&self) -> Arc<ShutdownSignal> {
        self.shutdown.clone()
    }

    /// The resolved instantiation order, once resolution has succeeded.
    pub fn resolved(&self) -> Option<&ResolvedStack> {
        self.resolved.as_ref()
    }

    /// Drive `Unresolved -> Resolved`.
    pub fn resolve(&mut self) -> Result<()> {
        self.expect_state("resolve", LifecycleState::Unresolved)?;
        match DependencyResolver::new(&self.catalog).resolve(&self.request) {
            Ok(resolved) => {
                info!(
                    instances = resolved.len(),
                    remote_only = resolved.is_remote_only(),
                    "stack resolved"
                );
                self.resolved = Some(resolved);
                self.state = LifecycleState::Resolved;
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "stack resolution failed");
                self.state = LifecycleState::Failed;
                Err(err)
            }
        }
    }

    /// Drive `Resolved -> Instantiated`.
    pub fn instantiate(&mut self) -> Result<()> {
        self.expect_state("instantiate", LifecycleState::Resolved)?;
        let resolved = self
            .resolved
            .as_ref()
            .expect("resolved state implies a resolved stack");
        match ProviderInstantiator::new(&self.catalog).instantiate(resolved) {
            Ok(stack) => {
                info!(providers = stack.providers().len(), "stack instantiated");
                self.stack = Some(stack);
                self.state = LifecycleState::Instantiated;
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "stack instantiation failed");
                self.state = LifecycleState::Failed;
                Err(err)
            }
        }
    }

    /// Drive `Instantiated -> Starting -> Running`.
    ///
    /// Providers start in resolved order; a dependency is always running
    /// before its dependent starts. On any failure the already-started
    /// prefix stops in reverse order, best-effort, and the runtime is
    /// `Failed`. A shutdown requested mid-start unwinds the same way and
    /// ends in `Stopped`.
    pub async fn start(&mut self) -> Result<()> {
        self.expect_state("start", LifecycleState::Instantiated)?;
        self.state = LifecycleState::Starting;

        let providers: Vec<Arc<LiveProvider>> = self
            .stack
            .as_ref()
            .expect("instantiated state implies a stack")
            .providers()
            .to_vec();

        for provider in providers {
            if self.shutdown.is_requested() {
                info!("shutdown requested during start; unwinding");
                self.unwind().await;
                self.state = LifecycleState::Stopped;
                return Ok(());
            }
            let outcome = timeout(self.options.start_timeout, provider.start()).await;
            let err = match outcome {
                Ok(Ok(())) => {
                    info!(
                        capability = %provider.capability(),
                        instance = %provider.instance_id(),
                        "provider started"
                    );
                    self.started.push(provider);
                    continue;
                }
                Ok(Err(err)) => err,
                Err(_) => Error::Timeout {
                    operation: "start",
                    instance_id: provider.instance_id().to_string(),
                    seconds: self.options.start_timeout.as_secs(),
                },
            };
            error!(
                capability = %provider.capability(),
                instance = %provider.instance_id(),
                error = %err,
                "provider start failed; unwinding started providers"
            );
            self.unwind().await;
            self.state = LifecycleState::Failed;
            return Err(err);
        }

        self.state = LifecycleState::Running;
        info!(providers = self.started.len(), "stack running");
        Ok(())
    }

    /// Drive `Running -> Stopping -> Stopped`.
    ///
    /// Providers stop in strict reverse start order. A stop exceeding its
    /// timeout is abandoned so shutdown always completes.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.expect_state("shutdown", LifecycleState::Running)?;
        self.shutdown.request();
        self.state = LifecycleState::Stopping;
        self.unwind().await;
        self.state = LifecycleState::Stopped;
        info!("stack stopped");
        Ok(())
    }

    /// The endpoint for a capability of the running stack.
    pub fn endpoint(&self, capability: CapabilityId) -> Result<CapabilityEndpoint> {
        self.expect_state("endpoint", LifecycleState::Running)?;
        self.stack
            .as_ref()
            .expect("running state implies a stack")
            .endpoint(capability)
            .cloned()
            .ok_or_else(|| {
                Error::config(format!("capability '{capability}' is not part of this stack"))
            })
    }

    /// Bind a resource key to a live instance of a routable capability.
    pub fn register_resource(
        &self,
        capability: CapabilityId,
        resource_key: &str,
        instance_id: &str,
        overwrite: bool,
    ) -> Result<()> {
        self.expect_state("register_resource", LifecycleState::Running)?;
        self.router(capability)?
            .register(resource_key, instance_id, overwrite)
    }

    /// Resolve the instance owning a resource key.
    pub fn resolve_resource(
        &self,
        capability: CapabilityId,
        resource_key: &str,
    ) -> Result<Arc<LiveProvider>> {
        self.expect_state("resolve_resource", LifecycleState::Running)?;
        let stack = self.stack.as_ref().expect("running state implies a stack");
        match stack.endpoint(capability) {
            Some(endpoint) => endpoint.resolve(resource_key),
            None => Err(Error::UnregisteredResource {
                capability,
                resource_key: resource_key.to_string(),
            }),
        }
    }

    /// Remove a resource binding. Idempotent.
    pub fn unregister_resource(&self, capability: CapabilityId, resource_key: &str) -> Result<()> {
        self.expect_state("unregister_resource", LifecycleState::Running)?;
        if let Ok(router) = self.router(capability) {
            router.unregister(resource_key);
        }
        Ok(())
    }

    fn router(&self, capability: CapabilityId) -> Result<&Arc<crate::routing::RoutingTable>> {
        self.stack
            .as_ref()
            .expect("running state implies a stack")
            .router(capability)
            .ok_or_else(|| {
                Error::config(format!("capability '{capability}' does not route by resource"))
            })
    }

    fn expect_state(&self, operation: &'static str, expected: LifecycleState) -> Result<()> {
        if self.state != expected {
            return Err(Error::InvalidLifecycleState {
                operation,
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    /// Stop every started provider in reverse start order, best-effort.
    /// Failures and timeouts are logged, never propagated - the primary
    /// outcome is already decided by the time an unwind runs.
    async fn unwind(&mut self) {
        let started = std::mem::take(&mut self.started);
        for provider in started.iter().rev() {
            match timeout(self.options.stop_timeout, provider.stop()).await {
                Ok(Ok(())) => {
                    info!(
                        capability = %provider.capability(),
                        instance = %provider.instance_id(),
                        "provider stopped"
                    );
                }
                Ok(Err(err)) => {
                    warn!(
                        instance = %provider.instance_id(),
                        error = %err,
                        "provider stop failed; continuing"
                    );
                }
                Err(_) => {
                    warn!(
                        instance = %provider.instance_id(),
                        seconds = self.options.stop_timeout.as_secs(),
                        "provider stop timed out; abandoning"
                    );
                }
            }
        }
    }
}

impl std::fmt::Debug for StackRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackRuntime")
            .field("state", &self.state)
            .field("capabilities", &self.request.capabilities())
            .finish()
    }
}

//! Error handling types
//!
//! Every failure the composition core can report carries a stable kind and
//! enough context (capability, kind, instance id, offending dependency or
//! cycle) for an operator to correct the configuration without reading
//! internals.

use thiserror::Error;

use crate::capability::CapabilityId;
use crate::lifecycle::LifecycleState;

/// Result type alias for operations that can fail
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the Stackplex composition core
#[derive(Error, Debug)]
pub enum Error {
    /// A requested provider kind is not in the catalog
    #[error("unknown provider '{kind}' for capability '{capability}' (available: {})", .available.join(", "))]
    UnknownProvider {
        /// Capability the lookup was scoped to
        capability: CapabilityId,
        /// The kind that failed to resolve
        kind: String,
        /// Kinds registered for this capability
        available: Vec<String>,
    },

    /// A provider kind was registered twice for the same capability
    #[error("provider kind '{kind}' already registered for capability '{capability}'")]
    DuplicateKind {
        /// Capability the duplicate was registered under
        capability: CapabilityId,
        /// The colliding kind
        kind: String,
    },

    /// A requested provider kind carries a deprecation message
    #[error("provider '{kind}' for capability '{capability}' is deprecated: {message}")]
    DeprecatedProvider {
        /// Capability of the deprecated spec
        capability: CapabilityId,
        /// The deprecated kind
        kind: String,
        /// Deprecation message, verbatim from the spec
        message: String,
    },

    /// A required dependency capability is not part of the requested stack
    #[error("capability '{requested_by}' (kind '{kind}') requires '{missing}', which is not in the requested stack")]
    MissingDependency {
        /// The capability that is absent from the request
        missing: CapabilityId,
        /// The capability whose spec declared the requirement
        requested_by: CapabilityId,
        /// The kind that declared the requirement
        kind: String,
    },

    /// The requested capabilities form a dependency cycle
    #[error("dependency cycle detected: {}", .cycle.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(" -> "))]
    CyclicDependency {
        /// The cycle, in dependency order; the last entry depends on the first
        cycle: Vec<CapabilityId>,
    },

    /// The requested stack mixes provider arrangements that cannot coexist
    #[error("invalid stack composition: {message}")]
    InvalidStackComposition {
        /// Description of the offending combination
        message: String,
    },

    /// An instance's raw configuration failed to parse against its schema
    #[error("invalid configuration for instance '{instance_id}': {message}")]
    InvalidConfig {
        /// The instance whose configuration was rejected
        instance_id: String,
        /// Parse failure detail, including the offending field where known
        message: String,
    },

    /// A resolved dependency was absent at instantiation time.
    ///
    /// This indicates a resolver/instantiator desynchronization and is a
    /// programming error, never a recoverable user-facing condition.
    #[error("dependency '{dependency}' unavailable while instantiating '{instance_id}' (resolver/instantiator desync)")]
    DependencyUnavailable {
        /// The capability that should already have been instantiated
        dependency: CapabilityId,
        /// The instance being constructed when the invariant broke
        instance_id: String,
    },

    /// An operation was attempted against the wrong lifecycle state
    #[error("operation '{operation}' requires state '{expected}', runtime is '{actual}'")]
    InvalidLifecycleState {
        /// The rejected operation
        operation: &'static str,
        /// The state the operation requires
        expected: LifecycleState,
        /// The state the runtime was actually in
        actual: LifecycleState,
    },

    /// A resource key is already bound and `overwrite` was not requested
    #[error("resource '{resource_key}' on capability '{capability}' is already bound to instance '{bound_to}'")]
    DuplicateResource {
        /// Capability whose table rejected the registration
        capability: CapabilityId,
        /// The already-bound resource key
        resource_key: String,
        /// The instance currently owning the key
        bound_to: String,
    },

    /// No binding exists for a resource key
    #[error("no instance registered for resource '{resource_key}' on capability '{capability}'")]
    UnregisteredResource {
        /// Capability whose table was consulted
        capability: CapabilityId,
        /// The unresolved resource key
        resource_key: String,
    },

    /// A registration named an instance that is not live for the capability
    #[error("no live instance '{instance_id}' for capability '{capability}'")]
    UnknownInstance {
        /// Capability the registration was scoped to
        capability: CapabilityId,
        /// The unrecognized instance id
        instance_id: String,
    },

    /// A provider start or stop call exceeded its configured timeout
    #[error("{operation} of instance '{instance_id}' timed out after {seconds}s")]
    Timeout {
        /// The timed-out operation ("start" or "stop")
        operation: &'static str,
        /// The instance that did not respond in time
        instance_id: String,
        /// The configured bound, in seconds
        seconds: u64,
    },

    /// Configuration loading or persistence error
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error
        message: String,
    },

    /// I/O operation error
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error
        #[from]
        source: std::io::Error,
    },

    /// JSON parsing or serialization error
    #[error("JSON error: {source}")]
    Json {
        /// The underlying JSON error
        #[from]
        source: serde_json::Error,
    },
}

impl Error {
    /// Create a configuration error from a message
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Create an invalid stack composition error from a message
    pub fn invalid_stack(message: impl Into<String>) -> Self {
        Error::InvalidStackComposition {
            message: message.into(),
        }
    }
}

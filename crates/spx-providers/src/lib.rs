//! Built-in provider kinds for Stackplex
//!
//! Reference local implementations of every capability plus the remote
//! proxy kind. Each kind self-registers into the
//! [`spx_application::registry::PROVIDER_REGISTRATIONS`] slice at compile
//! time; linking this crate is what completes catalog registration.
//!
//! The local kinds are deterministic and fully offline. They carry the
//! composition-relevant surface (configuration schema, dependency wiring,
//! lifecycle) without any real model, index, or tool behind them.

/// Reference agents orchestration kind
pub mod agents;
/// Reference inference kinds
pub mod inference;
/// Remote proxy kind, one registration per capability
pub mod remote;
/// Reference safety kind
pub mod safety;
/// Reference tool runtime kind
pub mod tool_runtime;
/// Reference vector index kind
pub mod vector_index;

pub use agents::ReferenceAgents;
pub use inference::EchoInference;
pub use remote::RemoteProxy;
pub use safety::KeywordSafety;
pub use tool_runtime::BuiltinToolRuntime;
pub use vector_index::MemoryVectorIndex;

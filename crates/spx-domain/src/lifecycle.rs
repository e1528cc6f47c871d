//! Stack runtime lifecycle states

use serde::Serialize;
use std::fmt;

/// Lifecycle states of a stack runtime.
///
/// The happy path is `Unresolved -> Resolved -> Instantiated -> Starting ->
/// Running -> Stopping -> Stopped`. `Failed` is terminal and reachable from
/// any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleState {
    /// Request accepted, dependency resolution not yet attempted
    Unresolved,
    /// Dependency resolution succeeded
    Resolved,
    /// Every provider constructed, none started
    Instantiated,
    /// Start sequence in flight
    Starting,
    /// Every provider started; routing is available
    Running,
    /// Shutdown sequence in flight
    Stopping,
    /// Shutdown complete
    Stopped,
    /// A resolution, instantiation, or start step failed
    Failed,
}

impl LifecycleState {
    /// Whether the runtime can make no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Stopped | LifecycleState::Failed)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Unresolved => "unresolved",
            LifecycleState::Resolved => "resolved",
            LifecycleState::Instantiated => "instantiated",
            LifecycleState::Starting => "starting",
            LifecycleState::Running => "running",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Stopped => "stopped",
            LifecycleState::Failed => "failed",
        };
        f.write_str(name)
    }
}

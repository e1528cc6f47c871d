//! Capability identifiers
//!
//! A capability is a named service contract the stack can fulfil. The set is
//! closed: every provider implements exactly one of these, and stack
//! configuration is keyed by their wire names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Closed set of capabilities a stack can compose.
///
/// The variants serialize as their kebab-case wire names (`"vector-index"`
/// etc.), which is also the form used as map keys in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapabilityId {
    /// Model serving (completion/chat style)
    Inference,
    /// Content safety screening
    Safety,
    /// Vector index storage and lookup
    VectorIndex,
    /// Agentic orchestration over the other capabilities
    Agents,
    /// Tool invocation runtime
    ToolRuntime,
}

impl CapabilityId {
    /// All capabilities, in canonical order.
    pub const ALL: [CapabilityId; 5] = [
        CapabilityId::Inference,
        CapabilityId::Safety,
        CapabilityId::VectorIndex,
        CapabilityId::Agents,
        CapabilityId::ToolRuntime,
    ];

    /// Wire name of the capability.
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityId::Inference => "inference",
            CapabilityId::Safety => "safety",
            CapabilityId::VectorIndex => "vector-index",
            CapabilityId::Agents => "agents",
            CapabilityId::ToolRuntime => "tool-runtime",
        }
    }

    /// Whether several instances of this capability may serve concurrently
    /// behind a routing table.
    ///
    /// Agents is a singleton orchestration layer; everything else dispatches
    /// by resource identity (model name, shield name, index name, tool group).
    pub fn is_routable(&self) -> bool {
        !matches!(self, CapabilityId::Agents)
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapabilityId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CapabilityId::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| Error::config(format!("unknown capability '{s}'")))
    }
}

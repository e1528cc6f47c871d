//! Static provider descriptions
//!
//! A [`ProviderSpec`] describes one provider kind for one capability. Specs
//! are created once at catalog load via the registration slice and are
//! immutable thereafter.

use crate::capability::CapabilityId;

/// The reserved kind name of the remote proxy provider.
///
/// A stack in which every instance uses this kind is a remote-only stack:
/// each capability resolves to a single remote handle and local dependency
/// validation is bypassed. Remote and local instances never mix.
pub const REMOTE_KIND: &str = "remote";

/// Static description of one provider kind for one capability.
#[derive(Debug, Clone, Copy)]
pub struct ProviderSpec {
    /// The capability this kind implements
    pub capability: CapabilityId,
    /// Kind name, unique within the capability
    pub kind: &'static str,
    /// Human-readable description, for catalog listings
    pub description: &'static str,
    /// Capabilities that must be instantiated before this kind
    pub required_dependencies: &'static [CapabilityId],
    /// Capabilities wired in opportunistically when requested alongside
    pub optional_dependencies: &'static [CapabilityId],
    /// External packages this kind needs at runtime; informational for the
    /// composition core, consumed by the build planner
    pub external_packages: &'static [&'static str],
    /// Opaque handle naming the configuration schema this kind parses
    pub config_schema_ref: &'static str,
    /// Deprecation message; presence makes the spec unusable
    pub deprecation: Option<&'static str>,
}

impl ProviderSpec {
    /// Whether this spec is the remote proxy kind.
    pub fn is_remote(&self) -> bool {
        self.kind == REMOTE_KIND
    }

    /// Whether this spec declares the given capability as a dependency,
    /// required or optional.
    pub fn depends_on(&self, capability: CapabilityId) -> bool {
        self.required_dependencies.contains(&capability)
            || self.optional_dependencies.contains(&capability)
    }
}

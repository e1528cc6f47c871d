//! Capability catalog
//!
//! Process-wide, read-mostly registry of the provider kinds available per
//! capability. Populated once at startup - normally from the linkme
//! registration slice - and never mutated while a stack is being resolved or
//! served.

use std::collections::BTreeMap;

use spx_domain::capability::CapabilityId;
use spx_domain::error::{Error, Result};
use spx_domain::spec::ProviderSpec;
use tracing::debug;

use crate::registry::{PROVIDER_REGISTRATIONS, ProviderRegistration};

/// Registry of available provider kinds, keyed by `(capability, kind)`.
#[derive(Debug, Default)]
pub struct CapabilityCatalog {
    table: BTreeMap<CapabilityId, Vec<ProviderRegistration>>,
}

impl CapabilityCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the catalog from the linkme registration slice.
    ///
    /// This is the normal production path: every linked provider crate has
    /// already submitted its registrations at compile time.
    pub fn from_registrations() -> Result<Self> {
        let mut catalog = Self::new();
        for registration in PROVIDER_REGISTRATIONS {
            catalog.register(*registration)?;
        }
        debug!(
            kinds = PROVIDER_REGISTRATIONS.len(),
            "capability catalog populated from registration slice"
        );
        Ok(catalog)
    }

    /// Register one provider kind.
    ///
    /// Fails with `DuplicateKind` when `(capability, kind)` is already
    /// present.
    pub fn register(&mut self, registration: ProviderRegistration) -> Result<()> {
        let spec = registration.spec;
        let kinds = self.table.entry(spec.capability).or_default();
        if kinds.iter().any(|r| r.spec.kind == spec.kind) {
            return Err(Error::DuplicateKind {
                capability: spec.capability,
                kind: spec.kind.to_string(),
            });
        }
        kinds.push(registration);
        Ok(())
    }

    /// Look up one provider kind.
    ///
    /// Fails with `UnknownProvider` listing the kinds that are registered
    /// for the capability.
    pub fn lookup(&self, capability: CapabilityId, kind: &str) -> Result<&ProviderRegistration> {
        self.table
            .get(&capability)
            .and_then(|kinds| kinds.iter().find(|r| r.spec.kind == kind))
            .ok_or_else(|| Error::UnknownProvider {
                capability,
                kind: kind.to_string(),
                available: self
                    .all_for_capability(capability)
                    .iter()
                    .map(|s| s.kind.to_string())
                    .collect(),
            })
    }

    /// The specs registered for a capability, in registration order.
    pub fn all_for_capability(&self, capability: CapabilityId) -> Vec<&ProviderSpec> {
        self.table
            .get(&capability)
            .map(|kinds| kinds.iter().map(|r| &r.spec).collect())
            .unwrap_or_default()
    }

    /// Capabilities with at least one registered kind, in canonical order.
    pub fn capabilities(&self) -> Vec<CapabilityId> {
        self.table.keys().copied().collect()
    }

    /// Every registered spec, grouped by capability in canonical order.
    ///
    /// Feeds the `providers` CLI listing.
    pub fn list(&self) -> Vec<&ProviderSpec> {
        self.table
            .values()
            .flat_map(|kinds| kinds.iter().map(|r| &r.spec))
            .collect()
    }
}

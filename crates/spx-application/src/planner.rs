//! Build planner
//!
//! Derives, from a capability/kind selection, the minimal external package
//! set and a persisted build/run descriptor. The planner consumes the
//! catalog only and instantiates nothing; the generated run descriptor is
//! what a stack runtime later loads.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use spx_domain::capability::CapabilityId;
use spx_domain::error::{Error, Result};
use spx_domain::request::ProviderInstanceConfig;
use tracing::info;

use crate::catalog::CapabilityCatalog;

/// The caller's build-time selection: capability -> ordered provider kinds.
#[derive(Debug, Clone, Default)]
pub struct BuildSelection {
    entries: Vec<(CapabilityId, Vec<String>)>,
}

impl BuildSelection {
    /// Create an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select kinds for a capability, appending when already present.
    pub fn insert(&mut self, capability: CapabilityId, kinds: Vec<String>) -> &mut Self {
        if let Some((_, existing)) = self.entries.iter_mut().find(|(c, _)| *c == capability) {
            existing.extend(kinds);
        } else {
            self.entries.push((capability, kinds));
        }
        self
    }

    /// Builder-style variant of [`BuildSelection::insert`].
    pub fn with(mut self, capability: CapabilityId, kinds: Vec<String>) -> Self {
        self.insert(capability, kinds);
        self
    }

    /// Iterate `(capability, kinds)` in caller order.
    pub fn iter(&self) -> impl Iterator<Item = (CapabilityId, &[String])> + '_ {
        self.entries.iter().map(|(c, k)| (*c, k.as_slice()))
    }

    /// Whether nothing was selected.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One selected provider kind in a build plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedProvider {
    /// Capability the kind serves
    pub capability: CapabilityId,
    /// The selected kind
    pub kind: String,
}

/// Planner output: the selected kinds, the deduplicated ordered union of
/// their external packages, and the generated run descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildPlan {
    /// Stack name, carried into the run descriptor
    pub name: String,
    /// External packages the selection needs, first-seen order, deduplicated
    pub external_packages: Vec<String>,
    /// Selected provider kinds, in selection order
    pub providers: Vec<PlannedProvider>,
}

impl BuildPlan {
    /// Serialize the plan as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("failed to serialize build plan: {e}")))
    }

    /// Persist the plan to a TOML file.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_toml()?)?;
        info!(path = %path.display(), "build plan written");
        Ok(())
    }
}

/// Persisted description of the instances a built stack will run.
///
/// Instance ids default to the kind name, or `kind-{i}` when a capability
/// selects several kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunDescriptor {
    /// Stack name
    pub name: String,
    /// Capability -> instance configs, canonical capability order
    pub providers: BTreeMap<CapabilityId, Vec<ProviderInstanceConfig>>,
}

impl RunDescriptor {
    /// Serialize the descriptor as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("failed to serialize run descriptor: {e}")))
    }

    /// Persist the descriptor to a TOML file.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_toml()?)?;
        info!(path = %path.display(), "run descriptor written");
        Ok(())
    }
}

/// Plans builds against a capability catalog.
pub struct BuildPlanner<'a> {
    catalog: &'a CapabilityCatalog,
}

impl<'a> BuildPlanner<'a> {
    /// Create a planner over the given catalog.
    pub fn new(catalog: &'a CapabilityCatalog) -> Self {
        Self { catalog }
    }

    /// Validate the selection and derive its build plan and run descriptor.
    pub fn plan(&self, name: &str, selection: &BuildSelection) -> Result<(BuildPlan, RunDescriptor)> {
        if selection.is_empty() {
            return Err(Error::invalid_stack("build selection is empty"));
        }

        let mut providers = Vec::new();
        let mut external_packages: Vec<String> = Vec::new();
        let mut run_providers: BTreeMap<CapabilityId, Vec<ProviderInstanceConfig>> =
            BTreeMap::new();

        for (capability, kinds) in selection.iter() {
            for (index, kind) in kinds.iter().enumerate() {
                let registration = self.catalog.lookup(capability, kind)?;
                let spec = &registration.spec;
                if let Some(message) = spec.deprecation {
                    return Err(Error::DeprecatedProvider {
                        capability,
                        kind: kind.clone(),
                        message: message.to_string(),
                    });
                }
                for package in spec.external_packages {
                    if !external_packages.iter().any(|p| p == package) {
                        external_packages.push((*package).to_string());
                    }
                }
                providers.push(PlannedProvider {
                    capability,
                    kind: kind.clone(),
                });
                let instance_id = if kinds.len() == 1 {
                    kind.clone()
                } else {
                    format!("{kind}-{index}")
                };
                run_providers
                    .entry(capability)
                    .or_default()
                    .push(ProviderInstanceConfig::new(instance_id, kind.clone()));
            }
        }

        let plan = BuildPlan {
            name: name.to_string(),
            providers,
            external_packages,
        };
        let descriptor = RunDescriptor {
            name: name.to_string(),
            providers: run_providers,
        };
        info!(
            name,
            providers = plan.providers.len(),
            packages = plan.external_packages.len(),
            "build planned"
        );
        Ok((plan, descriptor))
    }
}

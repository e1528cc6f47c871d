//! Provider registration slice
//!
//! Auto-registration for provider kinds using linkme distributed slices.
//! Each provider kind submits a [`ProviderRegistration`] pairing its static
//! spec with its factory; the catalog collects the slice once at startup.
//!
//! Registration replaces construct-by-name reflection with an explicit,
//! testable factory table: a crate that is not linked contributes nothing.

use spx_domain::ProviderFactory;
use spx_domain::spec::ProviderSpec;

/// One provider kind's catalog entry: the static spec plus the construction
/// entry point invoked by the instantiator.
#[derive(Clone, Copy)]
pub struct ProviderRegistration {
    /// Static description of the kind
    pub spec: ProviderSpec,
    /// Factory constructing one instance of the kind
    pub factory: ProviderFactory,
}

impl std::fmt::Debug for ProviderRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistration")
            .field("capability", &self.spec.capability)
            .field("kind", &self.spec.kind)
            .finish()
    }
}

// Auto-collection via linkme - provider kinds submit entries at compile time
#[linkme::distributed_slice]
pub static PROVIDER_REGISTRATIONS: [ProviderRegistration] = [..];

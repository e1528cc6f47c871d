//! Dependency resolver
//!
//! Turns a [`StackRequest`] into a [`ResolvedStack`]: a dependency-ordered
//! instantiation sequence over the requested capabilities. All validation
//! happens here, before any instantiation side effect.
//!
//! Dependencies are declared at the spec level, so the graph nodes are
//! capabilities, not instances: if any requested kind of capability A
//! requires B, the order must place B strictly before A. The topological
//! sort is deterministic - ties are broken by the caller-supplied capability
//! order - so resolving the same request twice yields identical output.

use std::collections::{BTreeMap, BTreeSet};

use spx_domain::capability::CapabilityId;
use spx_domain::error::{Error, Result};
use spx_domain::request::{ResolvedStack, StackRequest};
use spx_domain::spec::REMOTE_KIND;
use tracing::debug;

use crate::catalog::CapabilityCatalog;

/// Resolves requested stacks against a capability catalog.
pub struct DependencyResolver<'a> {
    catalog: &'a CapabilityCatalog,
}

impl<'a> DependencyResolver<'a> {
    /// Create a resolver over the given catalog.
    pub fn new(catalog: &'a CapabilityCatalog) -> Self {
        Self { catalog }
    }

    /// Resolve a requested stack into a valid instantiation order.
    pub fn resolve(&self, request: &StackRequest) -> Result<ResolvedStack> {
        self.validate_shape(request)?;

        let remote = request
            .iter_instances()
            .filter(|(_, i)| i.kind == REMOTE_KIND)
            .count();
        let total = request.iter_instances().count();

        if remote > 0 && remote < total {
            return Err(self.mixed_composition_error(request));
        }
        if remote == total {
            return self.resolve_remote(request);
        }
        self.resolve_local(request)
    }

    /// Reject structurally malformed requests before touching the catalog.
    fn validate_shape(&self, request: &StackRequest) -> Result<()> {
        if request.is_empty() {
            return Err(Error::invalid_stack("requested stack is empty"));
        }
        for (capability, instances) in request.iter() {
            if instances.is_empty() {
                return Err(Error::invalid_stack(format!(
                    "capability '{capability}' was requested with no instances"
                )));
            }
            if !capability.is_routable() && instances.len() > 1 {
                return Err(Error::invalid_stack(format!(
                    "capability '{capability}' is single-instance; {} instances were requested",
                    instances.len()
                )));
            }
            let mut seen = BTreeSet::new();
            for instance in instances {
                if !seen.insert(instance.instance_id.as_str()) {
                    return Err(Error::invalid_stack(format!(
                        "instance id '{}' appears twice for capability '{capability}'",
                        instance.instance_id
                    )));
                }
            }
        }
        Ok(())
    }

    fn mixed_composition_error(&self, request: &StackRequest) -> Error {
        let remote = request
            .iter_instances()
            .find(|(_, i)| i.kind == REMOTE_KIND);
        let local = request
            .iter_instances()
            .find(|(_, i)| i.kind != REMOTE_KIND);
        match (remote, local) {
            (Some((rc, ri)), Some((lc, li))) => Error::invalid_stack(format!(
                "remote instance '{}' ({rc}) cannot be combined with local instance '{}' ({lc}); \
                 remote and local composition are mutually exclusive for the whole stack",
                ri.instance_id, li.instance_id
            )),
            _ => Error::invalid_stack("remote and local instances cannot be mixed"),
        }
    }

    /// Remote-only path: every capability resolves to its remote proxy, in
    /// caller order, with local dependency validation bypassed.
    fn resolve_remote(&self, request: &StackRequest) -> Result<ResolvedStack> {
        let mut entries = Vec::new();
        for (capability, instances) in request.iter() {
            let registration = self.catalog.lookup(capability, REMOTE_KIND)?;
            if let Some(message) = registration.spec.deprecation {
                return Err(Error::DeprecatedProvider {
                    capability,
                    kind: REMOTE_KIND.to_string(),
                    message: message.to_string(),
                });
            }
            if instances.len() > 1 {
                return Err(Error::invalid_stack(format!(
                    "capability '{capability}' requested {} remote instances; \
                     a remote-only stack resolves each capability to a single remote handle",
                    instances.len()
                )));
            }
            entries.push((capability, instances[0].clone()));
        }
        debug!(capabilities = entries.len(), "resolved remote-only stack");
        Ok(ResolvedStack::new(entries, true))
    }

    /// Local path: full validation, then a deterministic topological sort.
    fn resolve_local(&self, request: &StackRequest) -> Result<ResolvedStack> {
        let requested: BTreeSet<CapabilityId> = request.capabilities().into_iter().collect();

        // Per-capability dependency edges, restricted to the requested set.
        // An optional dependency adds an edge only when it is itself
        // requested; otherwise the dependent is built without it.
        let mut deps: BTreeMap<CapabilityId, BTreeSet<CapabilityId>> = BTreeMap::new();
        for (capability, instances) in request.iter() {
            let edges = deps.entry(capability).or_default();
            for instance in instances {
                let registration = self.catalog.lookup(capability, &instance.kind)?;
                let spec = &registration.spec;
                if let Some(message) = spec.deprecation {
                    return Err(Error::DeprecatedProvider {
                        capability,
                        kind: spec.kind.to_string(),
                        message: message.to_string(),
                    });
                }
                for required in spec.required_dependencies {
                    if !requested.contains(required) {
                        return Err(Error::MissingDependency {
                            missing: *required,
                            requested_by: capability,
                            kind: spec.kind.to_string(),
                        });
                    }
                    edges.insert(*required);
                }
                for optional in spec.optional_dependencies {
                    if requested.contains(optional) {
                        edges.insert(*optional);
                    }
                }
            }
        }

        let order = self.topological_order(&request.capabilities(), &deps)?;

        let mut entries = Vec::new();
        for capability in &order {
            for instance in request.instances(*capability).unwrap_or_default() {
                entries.push((*capability, instance.clone()));
            }
        }
        debug!(
            order = ?order.iter().map(|c| c.as_str()).collect::<Vec<_>>(),
            instances = entries.len(),
            "resolved stack"
        );
        Ok(ResolvedStack::new(entries, false))
    }

    /// Kahn's algorithm with the ready set ordered by the caller-supplied
    /// capability order, so identical input yields identical output.
    fn topological_order(
        &self,
        caller_order: &[CapabilityId],
        deps: &BTreeMap<CapabilityId, BTreeSet<CapabilityId>>,
    ) -> Result<Vec<CapabilityId>> {
        let mut emitted: BTreeSet<CapabilityId> = BTreeSet::new();
        let mut order = Vec::with_capacity(caller_order.len());

        while order.len() < caller_order.len() {
            let next = caller_order.iter().copied().find(|capability| {
                !emitted.contains(capability)
                    && deps[capability].iter().all(|d| emitted.contains(d))
            });
            match next {
                Some(capability) => {
                    emitted.insert(capability);
                    order.push(capability);
                }
                None => {
                    let remaining: Vec<CapabilityId> = caller_order
                        .iter()
                        .copied()
                        .filter(|c| !emitted.contains(c))
                        .collect();
                    return Err(Error::CyclicDependency {
                        cycle: Self::extract_cycle(&remaining, deps),
                    });
                }
            }
        }
        Ok(order)
    }

    /// Walk unsatisfied edges among the stuck capabilities until one repeats;
    /// the repeated node opens and closes the reported cycle.
    fn extract_cycle(
        remaining: &[CapabilityId],
        deps: &BTreeMap<CapabilityId, BTreeSet<CapabilityId>>,
    ) -> Vec<CapabilityId> {
        let stuck: BTreeSet<CapabilityId> = remaining.iter().copied().collect();
        let mut path = vec![remaining[0]];
        loop {
            let current = *path.last().expect("path starts non-empty");
            let next = deps[&current]
                .iter()
                .copied()
                .find(|d| stuck.contains(d))
                .expect("a stuck capability has a stuck dependency");
            if let Some(start) = path.iter().position(|&c| c == next) {
                let mut cycle: Vec<CapabilityId> = path[start..].to_vec();
                cycle.push(next);
                return cycle;
            }
            path.push(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use spx_domain::ports::provider::{Provider, ProviderContext};
    use spx_domain::request::ProviderInstanceConfig;
    use spx_domain::spec::ProviderSpec;

    use crate::registry::ProviderRegistration;

    struct Stub;

    #[async_trait::async_trait]
    impl Provider for Stub {
        fn capability(&self) -> CapabilityId {
            CapabilityId::Inference
        }
        fn kind(&self) -> &str {
            "stub"
        }
        async fn start(&self) -> Result<()> {
            Ok(())
        }
        async fn stop(&self) -> Result<()> {
            Ok(())
        }
    }

    fn stub_factory(_ctx: &ProviderContext<'_>) -> Result<Arc<dyn Provider>> {
        Ok(Arc::new(Stub))
    }

    fn register(
        catalog: &mut CapabilityCatalog,
        capability: CapabilityId,
        kind: &'static str,
        required: &'static [CapabilityId],
        optional: &'static [CapabilityId],
        deprecation: Option<&'static str>,
    ) {
        catalog
            .register(ProviderRegistration {
                spec: ProviderSpec {
                    capability,
                    kind,
                    description: "test kind",
                    required_dependencies: required,
                    optional_dependencies: optional,
                    external_packages: &[],
                    config_schema_ref: "test.v1",
                    deprecation,
                },
                factory: stub_factory,
            })
            .unwrap();
    }

    /// Catalog with the shapes the tests below exercise.
    fn catalog() -> CapabilityCatalog {
        let mut catalog = CapabilityCatalog::new();
        register(&mut catalog, CapabilityId::Inference, "echo", &[], &[], None);
        register(
            &mut catalog,
            CapabilityId::Safety,
            "keyword",
            &[CapabilityId::Inference],
            &[],
            None,
        );
        register(&mut catalog, CapabilityId::VectorIndex, "memory", &[], &[], None);
        register(
            &mut catalog,
            CapabilityId::ToolRuntime,
            "builtin",
            &[],
            &[CapabilityId::VectorIndex],
            None,
        );
        register(
            &mut catalog,
            CapabilityId::Inference,
            "legacy",
            &[],
            &[],
            Some("use kind 'echo' instead"),
        );
        for capability in CapabilityId::ALL {
            register(&mut catalog, capability, REMOTE_KIND, &[], &[], None);
        }
        catalog
    }

    fn one(capability: CapabilityId, id: &str, kind: &str) -> (CapabilityId, Vec<ProviderInstanceConfig>) {
        (capability, vec![ProviderInstanceConfig::new(id, kind)])
    }

    fn request(entries: Vec<(CapabilityId, Vec<ProviderInstanceConfig>)>) -> StackRequest {
        let mut request = StackRequest::new();
        for (capability, instances) in entries {
            request.insert(capability, instances);
        }
        request
    }

    #[test]
    fn dependencies_precede_dependents() {
        let catalog = catalog();
        let resolver = DependencyResolver::new(&catalog);
        // safety listed first; its dependency on inference governs the order
        let resolved = resolver
            .resolve(&request(vec![
                one(CapabilityId::Safety, "s1", "keyword"),
                one(CapabilityId::Inference, "i1", "echo"),
            ]))
            .unwrap();
        assert_eq!(
            resolved.capability_order(),
            vec![CapabilityId::Inference, CapabilityId::Safety]
        );
        assert!(!resolved.is_remote_only());
    }

    #[test]
    fn input_order_does_not_change_dependency_forced_order() {
        let catalog = catalog();
        let resolver = DependencyResolver::new(&catalog);
        let forward = resolver
            .resolve(&request(vec![
                one(CapabilityId::Inference, "i1", "echo"),
                one(CapabilityId::Safety, "s1", "keyword"),
            ]))
            .unwrap();
        let reversed = resolver
            .resolve(&request(vec![
                one(CapabilityId::Safety, "s1", "keyword"),
                one(CapabilityId::Inference, "i1", "echo"),
            ]))
            .unwrap();
        assert_eq!(forward.capability_order(), reversed.capability_order());
    }

    #[test]
    fn ties_break_by_caller_order() {
        let catalog = catalog();
        let resolver = DependencyResolver::new(&catalog);
        // no edge between vector-index and inference; caller order decides
        let resolved = resolver
            .resolve(&request(vec![
                one(CapabilityId::VectorIndex, "v1", "memory"),
                one(CapabilityId::Inference, "i1", "echo"),
            ]))
            .unwrap();
        assert_eq!(
            resolved.capability_order(),
            vec![CapabilityId::VectorIndex, CapabilityId::Inference]
        );
    }

    #[test]
    fn instances_keep_caller_relative_order() {
        let catalog = catalog();
        let resolver = DependencyResolver::new(&catalog);
        let resolved = resolver
            .resolve(&request(vec![(
                CapabilityId::Inference,
                vec![
                    ProviderInstanceConfig::new("i1", "echo"),
                    ProviderInstanceConfig::new("i2", "echo"),
                ],
            )]))
            .unwrap();
        let ids: Vec<_> = resolved
            .entries()
            .iter()
            .map(|(_, i)| i.instance_id.as_str())
            .collect();
        assert_eq!(ids, vec!["i1", "i2"]);
    }

    #[test]
    fn resolution_is_idempotent() {
        let catalog = catalog();
        let resolver = DependencyResolver::new(&catalog);
        let req = request(vec![
            one(CapabilityId::ToolRuntime, "t1", "builtin"),
            one(CapabilityId::VectorIndex, "v1", "memory"),
            one(CapabilityId::Inference, "i1", "echo"),
        ]);
        let first = resolver.resolve(&req).unwrap();
        let second = resolver.resolve(&req).unwrap();
        let ids = |r: &ResolvedStack| {
            r.entries()
                .iter()
                .map(|(c, i)| (*c, i.instance_id.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn missing_required_dependency_is_named() {
        let catalog = catalog();
        let resolver = DependencyResolver::new(&catalog);
        let err = resolver
            .resolve(&request(vec![one(CapabilityId::Safety, "s1", "keyword")]))
            .unwrap_err();
        match err {
            Error::MissingDependency {
                missing,
                requested_by,
                ..
            } => {
                assert_eq!(missing, CapabilityId::Inference);
                assert_eq!(requested_by, CapabilityId::Safety);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn absent_optional_dependency_is_not_an_error() {
        let catalog = catalog();
        let resolver = DependencyResolver::new(&catalog);
        let resolved = resolver
            .resolve(&request(vec![one(CapabilityId::ToolRuntime, "t1", "builtin")]))
            .unwrap();
        assert_eq!(resolved.capability_order(), vec![CapabilityId::ToolRuntime]);
    }

    #[test]
    fn requested_optional_dependency_orders_first() {
        let catalog = catalog();
        let resolver = DependencyResolver::new(&catalog);
        let resolved = resolver
            .resolve(&request(vec![
                one(CapabilityId::ToolRuntime, "t1", "builtin"),
                one(CapabilityId::VectorIndex, "v1", "memory"),
            ]))
            .unwrap();
        assert_eq!(
            resolved.capability_order(),
            vec![CapabilityId::VectorIndex, CapabilityId::ToolRuntime]
        );
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let catalog = catalog();
        let resolver = DependencyResolver::new(&catalog);
        let err = resolver
            .resolve(&request(vec![one(CapabilityId::Inference, "i1", "nope")]))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownProvider { .. }));
    }

    #[test]
    fn deprecated_kind_is_fatal_with_verbatim_message() {
        let catalog = catalog();
        let resolver = DependencyResolver::new(&catalog);
        let err = resolver
            .resolve(&request(vec![one(CapabilityId::Inference, "i1", "legacy")]))
            .unwrap_err();
        match err {
            Error::DeprecatedProvider { message, .. } => {
                assert_eq!(message, "use kind 'echo' instead");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn cycle_is_reported_in_order() {
        let mut catalog = CapabilityCatalog::new();
        register(
            &mut catalog,
            CapabilityId::Inference,
            "loops",
            &[CapabilityId::Safety],
            &[],
            None,
        );
        register(
            &mut catalog,
            CapabilityId::Safety,
            "loops",
            &[CapabilityId::Inference],
            &[],
            None,
        );
        let resolver = DependencyResolver::new(&catalog);
        let err = resolver
            .resolve(&request(vec![
                one(CapabilityId::Inference, "i1", "loops"),
                one(CapabilityId::Safety, "s1", "loops"),
            ]))
            .unwrap_err();
        match err {
            Error::CyclicDependency { cycle } => {
                assert_eq!(cycle.first(), cycle.last());
                assert!(cycle.contains(&CapabilityId::Inference));
                assert!(cycle.contains(&CapabilityId::Safety));
                assert_eq!(cycle.len(), 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn remote_only_stack_resolves_in_caller_order() {
        let catalog = catalog();
        let resolver = DependencyResolver::new(&catalog);
        // safety's local kind requires inference; the remote path skips that
        let resolved = resolver
            .resolve(&request(vec![
                one(CapabilityId::Safety, "s1", REMOTE_KIND),
                one(CapabilityId::Agents, "a1", REMOTE_KIND),
            ]))
            .unwrap();
        assert!(resolved.is_remote_only());
        assert_eq!(
            resolved.capability_order(),
            vec![CapabilityId::Safety, CapabilityId::Agents]
        );
    }

    #[test]
    fn mixed_remote_and_local_is_rejected() {
        let catalog = catalog();
        let resolver = DependencyResolver::new(&catalog);
        let err = resolver
            .resolve(&request(vec![
                one(CapabilityId::Inference, "i1", "echo"),
                one(CapabilityId::Safety, "s1", REMOTE_KIND),
            ]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidStackComposition { .. }));
    }

    #[test]
    fn empty_request_is_rejected() {
        let catalog = catalog();
        let resolver = DependencyResolver::new(&catalog);
        let err = resolver.resolve(&StackRequest::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidStackComposition { .. }));
    }

    #[test]
    fn duplicate_instance_ids_are_rejected() {
        let catalog = catalog();
        let resolver = DependencyResolver::new(&catalog);
        let err = resolver
            .resolve(&request(vec![(
                CapabilityId::Inference,
                vec![
                    ProviderInstanceConfig::new("i1", "echo"),
                    ProviderInstanceConfig::new("i1", "echo"),
                ],
            )]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidStackComposition { .. }));
    }
}

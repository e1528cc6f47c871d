//! Resource routing through a running stack
//!
//! Run with: `cargo test -p spx-infrastructure --test routing_tests`

mod support;

use std::sync::Arc;
use std::time::Duration;

use spx_domain::capability::CapabilityId;
use spx_domain::error::Error;
use spx_domain::ports::routing::DEFAULT_RESOURCE_KEY;
use spx_infrastructure::runtime::{LifecycleOptions, StackRuntime};

use support::{scripted_catalog, scripted_instance, scripted_request};

fn options() -> LifecycleOptions {
    LifecycleOptions {
        start_timeout: Duration::from_millis(200),
        stop_timeout: Duration::from_millis(200),
    }
}

async fn running_runtime(log: &str, instances: &[&str]) -> StackRuntime {
    let catalog = Arc::new(scripted_catalog());
    let mut request = spx_domain::request::StackRequest::new();
    request.insert(
        CapabilityId::Inference,
        instances
            .iter()
            .map(|id| scripted_instance(id, log, serde_json::json!({})))
            .collect(),
    );
    let mut runtime = StackRuntime::new(catalog, request, options());
    runtime.resolve().unwrap();
    runtime.instantiate().unwrap();
    runtime.start().await.unwrap();
    runtime
}

#[tokio::test]
async fn register_then_resolve_returns_the_bound_instance() {
    let runtime = running_runtime("route_register", &["p1", "p2"]).await;
    runtime
        .register_resource(CapabilityId::Inference, "m1", "p1", false)
        .unwrap();
    let provider = runtime
        .resolve_resource(CapabilityId::Inference, "m1")
        .unwrap();
    assert_eq!(provider.instance_id(), "p1");
}

#[tokio::test]
async fn duplicate_registration_without_overwrite_fails() {
    let runtime = running_runtime("route_duplicate", &["p1", "p2"]).await;
    runtime
        .register_resource(CapabilityId::Inference, "m1", "p1", false)
        .unwrap();
    let err = runtime
        .register_resource(CapabilityId::Inference, "m1", "p2", false)
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateResource { .. }));

    // overwrite rebinds
    runtime
        .register_resource(CapabilityId::Inference, "m1", "p2", true)
        .unwrap();
    assert_eq!(
        runtime
            .resolve_resource(CapabilityId::Inference, "m1")
            .unwrap()
            .instance_id(),
        "p2"
    );
}

#[tokio::test]
async fn unregistered_key_fails_per_call() {
    let runtime = running_runtime("route_unregistered", &["p1", "p2"]).await;
    let err = runtime
        .resolve_resource(CapabilityId::Inference, "m2")
        .unwrap_err();
    assert!(matches!(err, Error::UnregisteredResource { .. }));

    // other routing calls are unaffected
    runtime
        .register_resource(CapabilityId::Inference, "m1", "p1", false)
        .unwrap();
    assert!(runtime.resolve_resource(CapabilityId::Inference, "m1").is_ok());
}

#[tokio::test]
async fn unregister_is_idempotent_through_the_runtime() {
    let runtime = running_runtime("route_unregister", &["p1"]).await;
    runtime
        .register_resource(CapabilityId::Inference, "m1", "p1", false)
        .unwrap();
    runtime
        .unregister_resource(CapabilityId::Inference, "m1")
        .unwrap();
    runtime
        .unregister_resource(CapabilityId::Inference, "m1")
        .unwrap();
    assert!(runtime.resolve_resource(CapabilityId::Inference, "m1").is_err());
}

#[tokio::test]
async fn sole_instance_answers_the_default_key() {
    let runtime = running_runtime("route_fast_path", &["p1"]).await;
    let provider = runtime
        .resolve_resource(CapabilityId::Inference, DEFAULT_RESOURCE_KEY)
        .unwrap();
    assert_eq!(provider.instance_id(), "p1");
}

#[tokio::test]
async fn second_instance_forces_explicit_registration() {
    let runtime = running_runtime("route_two_instances", &["p1", "p2"]).await;
    assert!(
        runtime
            .resolve_resource(CapabilityId::Inference, DEFAULT_RESOURCE_KEY)
            .is_err()
    );
    runtime
        .register_resource(CapabilityId::Inference, DEFAULT_RESOURCE_KEY, "p2", false)
        .unwrap();
    assert_eq!(
        runtime
            .resolve_resource(CapabilityId::Inference, DEFAULT_RESOURCE_KEY)
            .unwrap()
            .instance_id(),
        "p2"
    );
}

#[tokio::test]
async fn registering_an_unknown_instance_fails() {
    let runtime = running_runtime("route_unknown_instance", &["p1"]).await;
    let err = runtime
        .register_resource(CapabilityId::Inference, "m1", "ghost", false)
        .unwrap_err();
    assert!(matches!(err, Error::UnknownInstance { .. }));
}

#[tokio::test]
async fn routing_stops_with_the_runtime() {
    let mut runtime = running_runtime("route_stopped", &["p1"]).await;
    runtime.shutdown().await.unwrap();
    let err = runtime
        .resolve_resource(CapabilityId::Inference, DEFAULT_RESOURCE_KEY)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidLifecycleState { .. }));
}

#[tokio::test]
async fn concurrent_registration_and_lookup_are_safe() {
    let runtime = Arc::new(running_runtime("route_concurrent", &["p1", "p2"]).await);
    let mut handles = Vec::new();
    for worker in 0..8 {
        let runtime = runtime.clone();
        handles.push(tokio::spawn(async move {
            for round in 0..50 {
                let key = format!("m{}", (worker + round) % 4);
                let instance = if worker % 2 == 0 { "p1" } else { "p2" };
                let _ = runtime.register_resource(CapabilityId::Inference, &key, instance, true);
                if let Ok(provider) = runtime.resolve_resource(CapabilityId::Inference, &key) {
                    // a reader sees a fully applied binding or none at all
                    assert!(["p1", "p2"].contains(&provider.instance_id()));
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn agents_does_not_route_by_resource() {
    let catalog = Arc::new(scripted_catalog());
    let request = scripted_request(
        "route_agents",
        &[
            (CapabilityId::Inference, "i1"),
            (CapabilityId::Safety, "s1"),
            (CapabilityId::Agents, "a1"),
        ],
    );
    let mut runtime = StackRuntime::new(catalog, request, options());
    runtime.resolve().unwrap();
    runtime.instantiate().unwrap();
    runtime.start().await.unwrap();

    // the direct endpoint answers the implicit key
    let provider = runtime
        .resolve_resource(CapabilityId::Agents, DEFAULT_RESOURCE_KEY)
        .unwrap();
    assert_eq!(provider.instance_id(), "a1");

    // but resource registration has no table to land in
    assert!(
        runtime
            .register_resource(CapabilityId::Agents, "m1", "a1", false)
            .is_err()
    );
}

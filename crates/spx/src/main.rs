//! Stackplex - Entry Point
//!
//! Binary entry point for the `spx` CLI. Lives in the facade crate so the
//! provider registrations linked there are present for every subcommand.
//!
//! ## Subcommands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `providers` | List the registered provider kinds per capability |
//! | `build` | Validate a selection and write its build plan and run descriptor |
//! | `validate` | Resolve a stack configuration without instantiating it |
//! | `run` | Bring a configured stack up and keep it running until ctrl-c |

// Force-link spx-providers to ensure linkme registrations are included
extern crate spx_providers;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use spx_application::{BuildPlanner, BuildSelection, CapabilityCatalog};
use spx_domain::CapabilityId;
use spx_infrastructure::{ConfigLoader, StackRuntime, init_logging};

/// Command line interface for Stackplex
#[derive(Parser, Debug)]
#[command(name = "spx")]
#[command(about = "Stackplex - Compose and run capability provider stacks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the registered provider kinds per capability
    Providers,

    /// Validate a provider selection and write its build plan and run descriptor
    Build {
        /// Stack name recorded in the generated descriptors
        #[arg(long)]
        name: String,

        /// Selection entries, `capability=kind` (repeatable, kinds comma-separated)
        #[arg(long = "provider", value_name = "CAPABILITY=KIND[,KIND]")]
        providers: Vec<String>,

        /// Where to write the build plan
        #[arg(long, default_value = "build.toml")]
        plan_out: PathBuf,

        /// Where to write the run descriptor
        #[arg(long, default_value = "run.toml")]
        run_out: PathBuf,
    },

    /// Resolve a stack configuration without instantiating anything
    Validate {
        /// Path to the stack configuration file
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Bring a configured stack up and keep it running until ctrl-c
    Run {
        /// Path to the stack configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Providers => providers(),
        Command::Build {
            name,
            providers,
            plan_out,
            run_out,
        } => build(&name, &providers, &plan_out, &run_out),
        Command::Validate { config } => validate(&config),
        Command::Run { config } => run(&config).await,
    }
}

fn providers() -> anyhow::Result<()> {
    let catalog = CapabilityCatalog::from_registrations()?;
    for capability in catalog.capabilities() {
        println!("{capability}:");
        for spec in catalog.all_for_capability(capability) {
            let mut line = format!("  {} - {}", spec.kind, spec.description);
            if !spec.required_dependencies.is_empty() {
                let deps: Vec<_> = spec
                    .required_dependencies
                    .iter()
                    .map(|d| d.as_str())
                    .collect();
                line.push_str(&format!(" (requires: {})", deps.join(", ")));
            }
            if let Some(message) = spec.deprecation {
                line.push_str(&format!(" [deprecated: {message}]"));
            }
            println!("{line}");
        }
    }
    Ok(())
}

fn build(
    name: &str,
    providers: &[String],
    plan_out: &std::path::Path,
    run_out: &std::path::Path,
) -> anyhow::Result<()> {
    let catalog = CapabilityCatalog::from_registrations()?;
    let mut selection = BuildSelection::new();
    for entry in providers {
        let (capability, kinds) = entry
            .split_once('=')
            .with_context(|| format!("expected CAPABILITY=KIND, got '{entry}'"))?;
        let capability: CapabilityId = capability.parse()?;
        selection.insert(
            capability,
            kinds.split(',').map(|k| k.trim().to_string()).collect(),
        );
    }

    let (plan, descriptor) = BuildPlanner::new(&catalog).plan(name, &selection)?;
    plan.write_to(plan_out)?;
    descriptor.write_to(run_out)?;
    println!(
        "planned stack '{name}': {} providers, {} external packages",
        plan.providers.len(),
        plan.external_packages.len()
    );
    println!("build plan: {}", plan_out.display());
    println!("run descriptor: {}", run_out.display());
    Ok(())
}

fn validate(config_path: &std::path::Path) -> anyhow::Result<()> {
    let config = ConfigLoader::new().with_config_path(config_path).load()?;
    init_logging(&config.logging)?;

    let catalog = CapabilityCatalog::from_registrations()?;
    let resolver = spx_application::DependencyResolver::new(&catalog);
    let resolved = resolver.resolve(&config.to_request())?;

    println!("stack '{}' resolves; instantiation order:", config.name);
    for (capability, instance) in resolved.entries() {
        println!("  {capability}/{} ({})", instance.kind, instance.instance_id);
    }
    if resolved.is_remote_only() {
        println!("  (remote-only stack)");
    }
    Ok(())
}

async fn run(config_path: &std::path::Path) -> anyhow::Result<()> {
    let config = ConfigLoader::new().with_config_path(config_path).load()?;
    init_logging(&config.logging)?;

    let catalog = Arc::new(CapabilityCatalog::from_registrations()?);
    let mut runtime = StackRuntime::new(catalog, config.to_request(), config.lifecycle.options());
    runtime.resolve()?;
    runtime.instantiate()?;

    let shutdown = runtime.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.request();
        }
    });

    runtime.start().await?;
    if runtime.state() == spx_domain::LifecycleState::Running {
        println!("stack '{}' running; ctrl-c to stop", config.name);
        runtime.shutdown_handle().wait().await;
        runtime.shutdown().await?;
    }
    Ok(())
}

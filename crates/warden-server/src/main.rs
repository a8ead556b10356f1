use std::path::Path;
use std::sync::Arc;

use clap::Parser;

use warden_core::registry::ModelRegistry;
use warden_server::audit;
use warden_server::cli::{Cli, Command};
use warden_server::config::{AppConfig, LogFormat};
use warden_server::metrics::{self, Metrics};
use warden_server::rest;
use warden_server::service::AccessService;
use warden_store::{InMemoryPolicyStore, InMemoryResourceStore, LoadError, load_policy_file};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[cfg(feature = "telemetry")]
use warden_server::telemetry;

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    // OTel layer is typed to bare Registry, so it must be added first.
    // Layer order (bottom to top): Registry → OTel → EnvFilter → fmt
    let registry = tracing_subscriber::registry();

    #[cfg(feature = "telemetry")]
    let otel_provider = telemetry::init_telemetry(&config.tracing);

    #[cfg(feature = "telemetry")]
    let otel_layer = otel_provider.as_ref().map(telemetry::make_otel_layer);

    #[cfg(feature = "telemetry")]
    let registry = registry.with(otel_layer);

    let registry = registry.with(filter);

    match config.log.format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer().json();
            registry.with(fmt_layer).init();
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer().pretty();
            registry.with(fmt_layer).init();
        }
    }

    #[cfg(feature = "telemetry")]
    if otel_provider.is_some() {
        tracing::info!("OpenTelemetry tracing enabled");
    }

    // Leak the provider into a static to keep it alive for the process lifetime.
    // Shutdown is handled by the runtime on process exit.
    #[cfg(feature = "telemetry")]
    if let Some(provider) = otel_provider {
        std::mem::forget(provider);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    init_logging(&config);

    match cli.command {
        Some(Command::ValidatePolicies { file }) => run_validate(&config, &file),
        Some(Command::Serve) | None => run_serve(config).await,
    }
}

fn run_validate(config: &AppConfig, file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    match load_policy_file(file, &config.to_policy_limits()) {
        Ok(policy_file) => {
            println!("Policy file OK");
            println!("  Models:   {}", policy_file.models.len());
            println!("  Policies: {}", policy_file.policies.len());
            Ok(())
        }
        Err(LoadError::Invalid { errors, .. }) => {
            eprintln!("Policy file is invalid:");
            for error in &errors {
                eprintln!("  - {error}");
            }
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(http_addr = %config.http_addr(), "starting warden server");

    let (registry, policy_store) = match &config.policy.file {
        Some(path) => {
            let file = load_policy_file(path, &config.to_policy_limits())?;
            let registry = Arc::new(file.registry());
            let store = InMemoryPolicyStore::with_policies(file.policies);
            let snapshot = store.current();
            audit::audit_policy_reload(snapshot.version, snapshot.policies.len());
            (registry, Arc::new(store))
        }
        None => {
            tracing::warn!("no policy file configured; every non-super-admin request will deny");
            (
                Arc::new(ModelRegistry::new()),
                Arc::new(InMemoryPolicyStore::new()),
            )
        }
    };

    let resources = Arc::new(InMemoryResourceStore::new());
    let metrics = Arc::new(Metrics::new());
    let service = Arc::new(
        AccessService::new(policy_store, resources, registry).with_metrics(Arc::clone(&metrics)),
    );

    let state = rest::AppState {
        service,
        metrics: Arc::clone(&metrics),
    };
    let router = rest::create_router(state).route(
        "/metrics",
        axum::routing::get(metrics::metrics_handler).with_state(metrics),
    );

    let addr: std::net::SocketAddr = config.http_addr().parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = ctrl_c => {},
                _ = sigterm.recv() => {},
            }
        }
        Err(_) => {
            let _ = ctrl_c.await;
        }
    }
    tracing::info!("shutdown signal received");
}

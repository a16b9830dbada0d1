//! hydra-pool-factory server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use hydra_pool_factory::api;
use hydra_pool_factory::app_state::AppState;
use hydra_pool_factory::config::FactoryConfig;
use hydra_pool_factory::domain::{CollectionId, EventBus, PoolEndpointId};
use hydra_pool_factory::endpoint::{
    InMemoryEnvironment, ProbeBehavior, StaticCollection, StaticPoolEndpoint,
};
use hydra_pool_factory::persistence::{PostgresPersistence, run_event_writer, run_snapshotter};
use hydra_pool_factory::service::PoolFactory;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = FactoryConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    tracing::info!(
        addr = %config.listen_addr,
        admin = %config.admin_principal,
        factory = %config.factory_address,
        "starting hydra-pool-factory"
    );

    // Build collaborator ledger
    let environment = seed_environment(&config);

    // Build service layer
    let event_bus = EventBus::new(config.event_bus_capacity);
    let factory = Arc::new(
        PoolFactory::new(
            config.admin_principal,
            config.factory_address,
            environment,
            event_bus,
        )
        .with_multi_get_limit(config.multi_get_limit),
    );

    // Persistence: restore, then start writers
    let mut restored = false;
    if config.persistence_enabled {
        let persistence = PostgresPersistence::connect(&config).await?;
        restored = persistence.restore_into(&factory).await?;
        let rx = factory.event_bus().subscribe();
        tokio::spawn(run_event_writer(
            persistence.clone(),
            Arc::clone(&factory),
            rx,
            config.event_log_enabled,
        ));
        tokio::spawn(run_snapshotter(
            persistence,
            Arc::clone(&factory),
            Duration::from_secs(config.snapshot_interval_secs.max(1)),
        ));
        tracing::info!(restored, "persistence enabled");
    }

    if !restored && config.initial_balance > 0 {
        factory
            .receive(config.admin_principal, config.initial_balance)
            .await?;
    }

    // Build router
    let app = api::build_app(AppState::new(factory));

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Deploys the configured endpoints and collections into a fresh ledger.
///
/// Endpoints are owned by the factory so it can hand them over later.
fn seed_environment(config: &FactoryConfig) -> Arc<InMemoryEnvironment> {
    let environment = Arc::new(InMemoryEnvironment::new());
    for &address in &config.deployed_endpoints {
        environment.deploy_endpoint(
            PoolEndpointId::new(address),
            Arc::new(StaticPoolEndpoint::new(config.factory_address)),
        );
    }
    for &address in &config.deployed_collections {
        environment.deploy_collection(
            CollectionId::new(address),
            Arc::new(StaticCollection::new(ProbeBehavior::NonFungible)),
        );
    }
    tracing::info!(
        endpoints = config.deployed_endpoints.len(),
        collections = config.deployed_collections.len(),
        "development ledger seeded"
    );
    environment
}

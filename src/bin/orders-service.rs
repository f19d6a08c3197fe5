//! Orders service: in-memory order management that depends on the users
//! service for enrichment.

use std::sync::Arc;

use tokio::net::TcpListener;

use service_gateway::config::load_service_config;
use service_gateway::http::serve;
use service_gateway::lifecycle::{spawn_signal_listener, Shutdown};
use service_gateway::observability::logging;
use service_gateway::services::orders::{self, OrderStore, OrdersState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_service_config("Orders Service", 5002)?;
    logging::init_logging(
        config.log_format,
        "orders_service=debug,service_gateway=debug,tower_http=info",
    );

    let store = OrderStore::seeded();
    tracing::info!(
        service = %config.service_name,
        orders = store.len(),
        users_service = %config.users_service_url,
        bind_address = %config.bind_address,
        "Orders service starting"
    );

    let app = orders::router(OrdersState::new(&config, store)?);
    let listener = TcpListener::bind(&config.bind_address).await?;

    let shutdown = Arc::new(Shutdown::new());
    spawn_signal_listener(shutdown.clone());
    serve(app, listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

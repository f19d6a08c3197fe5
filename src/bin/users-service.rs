//! Users service: in-memory user management behind the gateway.

use std::sync::Arc;

use tokio::net::TcpListener;

use service_gateway::config::load_service_config;
use service_gateway::http::serve;
use service_gateway::lifecycle::{spawn_signal_listener, Shutdown};
use service_gateway::observability::logging;
use service_gateway::services::users::{self, UserStore, UsersState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_service_config("Users Service", 5001)?;
    logging::init_logging(
        config.log_format,
        "users_service=debug,service_gateway=debug,tower_http=info",
    );

    let store = UserStore::seeded();
    tracing::info!(
        service = %config.service_name,
        users = store.len(),
        bind_address = %config.bind_address,
        "Users service starting"
    );

    let app = users::router(UsersState::new(&config.service_name, store));
    let listener = TcpListener::bind(&config.bind_address).await?;

    let shutdown = Arc::new(Shutdown::new());
    spawn_signal_listener(shutdown.clone());
    serve(app, listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

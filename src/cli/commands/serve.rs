use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{debug, error, info, trace};

use super::initdb::run_migrations;
use crate::config::{initialize_app_state, AppConfig};
use crate::router::create_router;

pub async fn serve(
    database_url: Option<String>,
    bind_address: Option<String>,
    migrate: bool,
) -> Result<()> {
    trace!("Entering serve function");
    info!("Social backend starting up");

    let config = AppConfig::load()?.with_overrides(database_url, bind_address);
    debug!("Configuration: {:?}", config);

    // Initialize application state
    trace!("Initializing application state");
    let state = match initialize_app_state(&config).await {
        Ok(state) => {
            debug!("Application state initialized successfully");
            state
        }
        Err(e) => {
            error!("Failed to initialize application state: {}", e);
            return Err(e);
        }
    };

    if migrate {
        run_migrations(&state.db).await?;
    }

    // Create router
    trace!("Creating application router");
    let app = create_router(state);

    // Start server
    let bind_address = &config.bind_address;
    info!("Starting server on {}", bind_address);
    let listener = match TcpListener::bind(bind_address).await {
        Ok(listener) => {
            debug!("Successfully bound to address: {}", bind_address);
            listener
        }
        Err(e) => {
            error!("Failed to bind to address {}: {}", bind_address, e);
            return Err(e.into());
        }
    };

    info!("Social API server running on http://{}", bind_address);
    info!("Swagger UI available at http://{}/swagger-ui", bind_address);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("Server shutdown gracefully");
    Ok(())
}

//! Server mode
//!
//! Configures and starts the HTTP server with all link routes.

use actix_web::{App, HttpServer, middleware::DefaultHeaders, web};
use anyhow::Result;
use tracing::warn;

use crate::api::link_routes;
use crate::api::middleware::RequestTrace;
use crate::config::StaticConfig;
use crate::runtime::lifetime;

/// Run the HTTP server until it is stopped (actix handles SIGINT/SIGTERM).
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server(config: &StaticConfig) -> Result<()> {
    let startup = lifetime::prepare_server_startup(config)
        .await
        .map_err(|e| {
            tracing::error!("Server startup failed: {:#}", e);
            e
        })?;
    let resolver = startup.resolver;

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    warn!(
        "Starting server at http://{} ({} backend)",
        bind_address, startup.backend_name
    );

    HttpServer::new(move || {
        App::new()
            .wrap(RequestTrace)
            .wrap(DefaultHeaders::new().add(("Cache-Control", "no-cache, no-store, must-revalidate")))
            .app_data(web::Data::new(resolver.clone()))
            .service(link_routes())
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .bind(bind_address)?
    .run()
    .await?;

    warn!("Server stopped");
    Ok(())
}

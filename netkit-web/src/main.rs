//! The netkit HTTP API
//!
//! Serves the toolbox operations as JSON endpoints under `/api/v1`. See the
//! [handlers] module for the routes and [config] for the settings.
mod config;
mod gateway;
mod handlers;
mod logging;

use std::sync::Arc;

use actix_web::{middleware, App, HttpServer};
use anyhow::Context;
use netkit_toolbox::{build_resolver, MaxMindGeoIpStore, ToolboxService};
use tracing::info;

use crate::config::AppConfig;
use crate::gateway::{DefaultToolboxGateway, ToolTimeouts, ToolboxGateway};
use crate::handlers::AppState;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::load()?;
    let _log_guard = logging::init(&config.logging)?;

    let geoip = MaxMindGeoIpStore::open(
        config.geoip.city_db.as_deref(),
        config.geoip.asn_db.as_deref(),
    );
    let service = ToolboxService::new()
        .context("Failed to initialise the toolbox")?
        .with_resolver(build_resolver(config.dns.nameserver))
        .with_geoip(Arc::new(geoip));

    let state = AppState {
        gateway: Arc::new(DefaultToolboxGateway::new(service)) as Arc<dyn ToolboxGateway>,
        timeouts: ToolTimeouts::from(config.timeouts),
    };

    let address = (config.server.bind_address.clone(), config.server.port);
    info!("Starting netkit-web on {}:{}", address.0, address.1);

    let mut server = HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(middleware::Logger::default())
            .configure(move |cfg| state.configure(cfg))
    });
    if let Some(workers) = config.server.workers {
        server = server.workers(workers);
    }
    server
        .bind(address)
        .with_context(|| {
            format!(
                "Failed to bind {}:{}",
                config.server.bind_address, config.server.port
            )
        })?
        .run()
        .await?;

    info!("netkit-web stopped");
    Ok(())
}

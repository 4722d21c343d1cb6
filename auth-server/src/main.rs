// auth-server/src/main.rs
use std::io;
use std::time::Duration;
use actix::Actor;
use actix_web::middleware::{Condition, Logger};
use actix_web::{web, App, HttpServer};
use auth_server::api;
use auth_server::middleware::RateLimiter;
use auth_server::snapshot::{FlushSnapshot, SnapshotActor};
use auth_server::AppState;
use common::{setup_tracing, Config};

#[actix_web::main]
async fn main() -> io::Result<()> {
    setup_tracing();

    let config = Config::from_env();
    config
        .validate()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let state = AppState::from_config(&config)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    // Persist only when a snapshot path is configured
    let snapshot_actor = config.storage.snapshot_path.as_ref().map(|path| {
        SnapshotActor::new(state.store.clone(), path)
            .with_flush_interval(Duration::from_secs(config.storage.flush_interval_secs))
            .start()
    });

    let server_addr = config.auth_server_addr.clone();
    let rate_limit_enabled = config.rate_limit.enabled;
    let rate_limiter = RateLimiter::from_config(&config.rate_limit);

    tracing::info!(
        "Starting Auth Server on {} ({} users, rate limiting {})",
        server_addr,
        state.store.user_count(),
        if rate_limit_enabled { "on" } else { "off" }
    );

    let state_data = web::Data::new(state);

    HttpServer::new(move || {
        App::new()
            .app_data(state_data.clone())
            .wrap(Condition::new(rate_limit_enabled, rate_limiter.clone()))
            .wrap(Logger::default())
            .configure(api::configure)
    })
    .bind(&server_addr)?
    .run()
    .await?;

    if let Some(actor) = snapshot_actor {
        match actor.send(FlushSnapshot).await {
            Ok(Ok(_)) => tracing::info!("Store persisted on shutdown"),
            Ok(Err(e)) => tracing::error!("Failed to persist store on shutdown: {}", e),
            Err(e) => tracing::error!("Snapshot actor unavailable on shutdown: {}", e),
        }
    }

    Ok(())
}

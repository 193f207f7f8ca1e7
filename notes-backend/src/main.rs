use actix_cors::Cors;
use actix_files::{Files, NamedFile};
use actix_web::{middleware::Logger, web, App, HttpRequest, HttpServer};
use dotenv::dotenv;
use std::io;
use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::Arc;

use notes_backend::auth::TokenStore;
use notes_backend::config::{defaults, Config};
use notes_backend::{build_store, controllers, AppState};

/// Bind the preferred port, or let the OS pick one if it is taken
fn bind_listener(address: &str, port: u16) -> io::Result<TcpListener> {
    match TcpListener::bind((address, port)) {
        Ok(listener) => Ok(listener),
        Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
            let listener = TcpListener::bind((address, 0))?;
            log::warn!(
                "Port {} is in use, switched to {}",
                port,
                listener.local_addr()?.port()
            );
            Ok(listener)
        }
        Err(e) => Err(e),
    }
}

async fn spa_fallback(req: HttpRequest) -> actix_web::Result<NamedFile> {
    let dist = req
        .app_data::<web::Data<AppState>>()
        .and_then(|state| state.config.frontend_dist.clone())
        .unwrap_or_default();
    Ok(NamedFile::open(PathBuf::from(dist).join("index.html"))?)
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let store = build_store(&config).map_err(|e| io::Error::other(e.to_string()))?;
    let tokens = Arc::new(TokenStore::new());

    if config.require_auth() && config.admin_password.is_none() {
        log::warn!("[AUTH] Production mode without ADMIN_PASSWORD: nobody can log in to edit notes");
    }

    let listener = bind_listener(&config.bind_address, config.port)?;
    let port = listener.local_addr()?.port();

    if config.write_port_to_file {
        if let Err(e) = std::fs::write(defaults::PORT_FILE, port.to_string()) {
            log::warn!("Could not write {}: {}", defaults::PORT_FILE, e);
        }
    }

    let frontend_dist = config
        .frontend_dist
        .clone()
        .filter(|dist| std::path::Path::new(dist).exists());
    match &config.frontend_dist {
        Some(dist) if frontend_dist.is_none() => {
            log::warn!("Frontend dist {} not found - static file serving disabled", dist)
        }
        Some(dist) => log::info!("Serving frontend from: {}", dist),
        None => {}
    }

    log::info!(
        "Starting notes server on {}:{} ({} backend, auth {})",
        config.bind_address,
        port,
        store.backend_name(),
        if config.require_auth() { "required" } else { "off" }
    );

    let state = web::Data::new(AppState {
        store,
        config,
        tokens,
    });

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        let mut app = App::new()
            .app_data(state.clone())
            .app_data(controllers::json_config())
            .wrap(Logger::default())
            .wrap(cors)
            .configure(controllers::health::config_routes)
            .configure(controllers::auth::config)
            .configure(controllers::notes::config);

        if let Some(dist) = &frontend_dist {
            app = app.service(
                Files::new("/", dist.clone())
                    .index_file("index.html")
                    .default_handler(web::to(spa_fallback)),
            );
        }

        app
    })
    .listen(listener)?
    .run();

    let server_handle = server.handle();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        log::info!("Received Ctrl+C, shutting down...");

        let server_stop = server_handle.stop(true);
        if tokio::time::timeout(std::time::Duration::from_secs(5), server_stop)
            .await
            .is_err()
        {
            log::warn!("Timeout waiting for HTTP server to stop, forcing exit...");
        }

        log::info!("Shutdown complete");
    });

    server.await
}

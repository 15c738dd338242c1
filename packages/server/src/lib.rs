#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the civic map dashboard.
//!
//! Wraps one [`Dashboard`] over the `PostgREST` store plus the shared map
//! display state, and exposes load cycles, view projections, scenario
//! changes, and ticket submission as JSON under `/api`.

mod handlers;

use std::sync::{Mutex, MutexGuard, PoisonError};

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use civic_map_dashboard::{Dashboard, MapState};
use civic_map_store::PostgrestStore;

/// Shared application state.
pub struct AppState {
    /// Dashboard over the remote store.
    pub dashboard: Dashboard<PostgrestStore>,
    /// Scenario, layer, and selection state of the map.
    pub map_state: Mutex<MapState>,
}

impl AppState {
    #[must_use]
    pub fn new(store: PostgrestStore) -> Self {
        Self {
            dashboard: Dashboard::new(store),
            map_state: Mutex::new(MapState::default()),
        }
    }

    /// Locks the map state, recovering it from a poisoned lock.
    pub fn map_state(&self) -> MutexGuard<'_, MapState> {
        self.map_state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/dashboard", web::get().to(handlers::dashboard))
            .route("/dashboard/retry", web::post().to(handlers::retry))
            .route("/areas", web::get().to(handlers::search_areas))
            .route("/areas/{id}", web::get().to(handlers::area_dashboard))
            .route("/map", web::get().to(handlers::map_view))
            .route("/scenario", web::get().to(handlers::get_scenario))
            .route("/scenario", web::post().to(handlers::apply_scenario_action))
            .route("/facilities/{id}", web::get().to(handlers::facility_card))
            .route("/missions", web::get().to(handlers::missions))
            .route("/tickets", web::post().to(handlers::submit_ticket))
            .route("/admin", web::get().to(handlers::admin_board)),
    );
}

/// Starts the civic map API server.
///
/// Reads the store credentials from the environment, negotiates store
/// capabilities, and serves until shut down. Without credentials the server
/// still starts; every data route then answers with the not-configured
/// message.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP client cannot be built,
/// or the HTTP server fails to bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    log::info!("Connecting to remote store...");
    let store = PostgrestStore::from_env()
        .await
        .map_err(std::io::Error::other)?;

    let state = web::Data::new(AppState::new(store));

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}

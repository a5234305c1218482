//! HTTP API server with observability for the marketplace.
//!
//! Thin façade over the domain services: registration commands, the join
//! command that starts the saga, and operator views of the publication
//! ledger. Structured logging via tracing, Prometheus metrics at /metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use dispatcher::{DispatcherConfig, EventDispatcher, ListenerRegistry};
use domain::{
    FreelancerService, InMemoryFreelancerRepository, InMemoryProjectRepository, ProjectService,
};
use ledger::{EventLedger, InMemoryLedger};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub freelancer_service: FreelancerService<InMemoryFreelancerRepository>,
    pub project_service: ProjectService<InMemoryProjectRepository, InMemoryFreelancerRepository>,
    pub ledger: InMemoryLedger,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/freelancers", post(routes::freelancers::create))
        .route("/freelancers/{id}", get(routes::freelancers::get))
        .route("/projects", post(routes::projects::create))
        .route("/projects/{id}", get(routes::projects::get))
        .route("/projects/{id}/join", post(routes::projects::join))
        .route("/ledger/pending", get(routes::ledger::pending))
        .route("/ledger/failed", get(routes::ledger::failed))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default in-memory application state and its dispatcher.
///
/// The dispatcher is returned unstarted so the caller decides how to drive
/// it: `main` spawns workers, tests pump `poll_once` deterministically.
pub fn create_default_state(
    dispatcher_config: DispatcherConfig,
) -> (Arc<AppState>, EventDispatcher<InMemoryLedger>) {
    let ledger = InMemoryLedger::new();
    let ledger_dyn: Arc<dyn EventLedger> = Arc::new(ledger.clone());
    let freelancers = InMemoryFreelancerRepository::new(ledger_dyn.clone());
    let projects = InMemoryProjectRepository::new(ledger_dyn);

    let mut registry = ListenerRegistry::new();
    saga::register_listeners(&mut registry, freelancers.clone(), projects.clone());
    let dispatcher = EventDispatcher::new(ledger.clone(), registry, dispatcher_config);

    let state = Arc::new(AppState {
        freelancer_service: FreelancerService::new(freelancers.clone()),
        project_service: ProjectService::new(projects, freelancers),
        ledger,
    });

    (state, dispatcher)
}

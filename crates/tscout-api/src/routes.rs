//! API routes.

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::handlers::health::{health, ready};
use crate::handlers::jobs::{cancel_job, get_job};
use crate::handlers::projects::{
    analyze_project, check_resources, create_project, delete_project, discover_channels,
    finalize_project, generate_plot, generate_script, generate_thumbnails, get_outliers,
    get_potential_competitors, get_project, list_projects, prepare_resources,
};
use crate::handlers::secrets::{delete_secret, save_secret, test_secret};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let project_routes = Router::new()
        .route("/projects", get(list_projects))
        .route("/projects", post(create_project))
        .route("/projects/:project_id", get(get_project))
        .route("/projects/:project_id", delete(delete_project))
        .route(
            "/projects/:project_id/potential_competitors",
            get(get_potential_competitors),
        )
        .route("/projects/:project_id/finalize", post(finalize_project))
        .route("/projects/:project_id/analyze", post(analyze_project))
        .route("/projects/:project_id/outliers", get(get_outliers))
        .route("/projects/:project_id/resources", get(check_resources))
        .route("/projects/:project_id/resources", post(prepare_resources))
        .route("/projects/:project_id/plots", post(generate_plot))
        .route("/projects/:project_id/scripts", post(generate_script))
        .route("/projects/:project_id/thumbnails", post(generate_thumbnails));

    let job_routes = Router::new()
        .route("/jobs/:job_id", get(get_job))
        .route("/jobs/:job_id", delete(cancel_job));

    let secret_routes = Router::new()
        .route("/secrets", post(save_secret))
        .route("/secrets/:service", delete(delete_secret))
        .route("/secrets/:service/test", post(test_secret));

    let discovery_routes = Router::new().route("/discover", post(discover_channels));

    let rate_limiter = std::sync::Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let api_routes = Router::new()
        .merge(project_routes)
        .merge(job_routes)
        .merge(secret_routes)
        .merge(discovery_routes)
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

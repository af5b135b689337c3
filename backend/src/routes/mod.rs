//! Route definitions for the Rice Planting Advisor

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - planting recommendations
        .nest("/planting", planting_routes(state.clone()))
        // Protected routes - growth cycles
        .nest("/farms", farm_routes(state.clone()))
        .nest("/cycles", cycle_routes(state))
}

/// Planting recommendation routes (protected, except the schema)
fn planting_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/recommendations", post(handlers::create_recommendation))
        .route(
            "/analyses",
            get(handlers::list_analyses).post(handlers::save_analysis),
        )
        .route(
            "/analyses/:analysis_id",
            get(handlers::get_analysis).delete(handlers::delete_analysis),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
        // Public
        .route("/schema", get(handlers::get_schema))
}

/// Farm-scoped growth cycle routes (protected)
fn farm_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/:farm_id/cycles",
            get(handlers::list_cycles).put(handlers::upsert_cycle),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Growth cycle routes (protected)
fn cycle_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/:cycle_id", delete(handlers::delete_cycle))
        .route("/:cycle_id/harvest", put(handlers::confirm_harvest))
        .route(
            "/:cycle_id/boundaries",
            get(handlers::list_boundaries).put(handlers::replace_boundaries),
        )
        .route("/:cycle_id/stage", get(handlers::get_stage))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

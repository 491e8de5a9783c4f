use axum::Router;
use axum::routing::{get, post};

use crate::handlers::{employees, health};
use crate::middleware;
use crate::state::SharedState;

/// Build the application router with all routes and the middleware chain.
pub fn build_router(state: SharedState) -> Router {
    let router = Router::new()
        .route("/health", get(health::health_check))
        .route("/employees", post(employees::create_employee))
        .route(
            "/employees/{id}",
            get(employees::get_employee).put(employees::update_employee),
        )
        .with_state(state);

    middleware::apply(router)
}

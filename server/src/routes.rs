// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::handlers;
use axum::{
    Router,
    routing::{get, post},
};
use board::DirectClient;
use board::suggestions::BREAKDOWN_PATH;

/// Creates and configures the application router.
pub fn create_router(client: DirectClient) -> Router {
    Router::new()
        // Associates the `GET /` route with the `health` handler
        .route("/", get(handlers::health))
        // Associates the `POST /api/breakdown-task` route with the `breakdown_task` handler
        .route(BREAKDOWN_PATH, post(handlers::breakdown_task))
        // Adds the model client to the application state
        .with_state(client)
}

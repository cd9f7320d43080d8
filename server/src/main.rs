// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use anyhow::{Context, Result};
use axum::http::HeaderName;
use board::{DirectClient, Settings};
use server::routes;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

const DEFAULT_PORT: u16 = 8000;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting up the breakdown proxy...");

    let settings = Settings::from_env();
    if settings.gemini.api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; breakdown requests will fail until it is.");
    }
    let client = DirectClient::new(settings.gemini, settings.request_timeout)
        .context("Failed to build the model client")?;
    tracing::info!("Using model {}", client.model());

    let port = match std::env::var("PROXY_PORT") {
        Ok(raw) => raw
            .parse::<u16>()
            .with_context(|| format!("Invalid PROXY_PORT '{raw}'"))?,
        Err(_) => DEFAULT_PORT,
    };

    // Browsers call the proxy from another origin, so allow any origin
    // but only the headers the board sends.
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers([
            HeaderName::from_static("content-type"),
            HeaderName::from_static("accept"),
        ])
        .allow_origin(Any);

    let app = routes::create_router(client)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("The server listens on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

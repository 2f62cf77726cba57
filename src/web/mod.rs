mod assets;
mod handlers;
mod trace_layer;

use crate::{app::App, ShutdownRx};
use anyhow::Context;
use axum::{
    extract::Request,
    http::StatusCode,
    routing::{get, post},
    Router, ServiceExt,
};
use prometheus::{Encoder, TextEncoder};
use std::{
    net::{AddrParseError, SocketAddr},
    str::FromStr,
};
use tokio::net::TcpListener;
use tower_http::{normalize_path::NormalizePath, trace::TraceLayer};
use tracing::{debug, error, info};

pub async fn run(app: App, mut shutdown_rx: ShutdownRx) -> anyhow::Result<()> {
    let listen_address =
        parse_listen_addr(&app.config.listen_address).context("Invalid listen address")?;

    let app = NormalizePath::trim_trailing_slash(router(app));
    let listener = TcpListener::bind(listen_address).await?;

    info!("Listening on {listen_address}");

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(async move {
            shutdown_rx.changed().await.ok();
            debug!("Shutting down web task");
        })
        .await?;

    Ok(())
}

pub fn router(app: App) -> Router {
    Router::new()
        .route("/callback", post(handlers::callback))
        .route("/metrics", get(metrics))
        .with_state(app)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace_layer::make_span_with)
                .on_response(trace_layer::on_response),
        )
        .route("/static/*asset", get(assets::static_asset))
        .fallback(assets::not_found)
}

pub fn parse_listen_addr(addr: &str) -> Result<SocketAddr, AddrParseError> {
    if addr.starts_with(':') {
        SocketAddr::from_str(&format!("0.0.0.0{addr}"))
    } else {
        SocketAddr::from_str(addr)
    }
}

async fn metrics() -> Result<Vec<u8>, StatusCode> {
    let metric_families = prometheus::gather();

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).map_err(|err| {
        error!("Could not encode metrics: {err}");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(buffer)
}

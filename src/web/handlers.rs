use crate::{
    app::App,
    bot::{commands::Assets, Bot},
    config::Config,
    line::{
        signature::{self, SIGNATURE_HEADER},
        webhook::WebhookPayload,
    },
    Result,
};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap},
};
use tracing::{debug, info};

const FORWARDED_HOST_HEADER: &str = "X-Forwarded-Host";

pub async fn callback(
    State(app): State<App>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if let Err(err) = signature::verify(&app.config.channel_secret, &body, signature) {
        info!("Invalid signature. Please check your channel access token/channel secret.");
        return Err(err);
    }

    debug!("Request body: {}", String::from_utf8_lossy(&body));
    let payload: WebhookPayload = serde_json::from_slice(&body)?;
    debug!(
        "Received {} event(s) for {}",
        payload.events.len(),
        payload.destination
    );

    let assets = Assets::new(&public_url(&app.config, &headers));
    Bot::new(app, assets).handle_events(payload.events).await;

    Ok("OK")
}

/// Static assets must be linked over https, whatever scheme the proxy forwarded.
fn public_url(config: &Config, headers: &HeaderMap) -> String {
    if let Some(public_url) = &config.public_url {
        return public_url.clone();
    }

    let host = headers
        .get(FORWARDED_HOST_HEADER)
        .or_else(|| headers.get(header::HOST))
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");

    format!("https://{host}")
}

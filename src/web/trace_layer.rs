use crate::line::signature::SIGNATURE_HEADER;
use axum::{extract::Request, response::Response};
use std::time::Duration;
use tracing::{info, info_span, Span};

pub fn make_span_with(request: &Request) -> Span {
    let method = request.method().to_string();
    let url = request.uri().path().to_owned();
    let signed = request.headers().contains_key(SIGNATURE_HEADER);

    info_span!(
        "http-request",
        "http.method" = method.as_str(),
        "http.uri" = url.as_str(),
        "line.signed" = signed,
        "http.status" = tracing::field::Empty,
        "http.latency" = tracing::field::Empty,
    )
}

pub fn on_response(response: &Response, latency: Duration, span: &Span) {
    let status = response.status();
    let ms = latency.as_millis();

    span.record("http.status", status.as_u16());
    span.record("http.latency", ms as u64);

    info!("HTTP response {status} processed in {ms}ms");
}

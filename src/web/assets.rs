use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use rust_embed::RustEmbed;

const CACHE_CONTROL: &str = "public, max-age=86400";

// Quick reply icons and the pictures used by image and template replies
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/static"]
struct StaticAssets;

pub async fn static_asset(Path(asset): Path<String>) -> Response {
    match StaticAssets::get(&asset) {
        Some(content) => {
            let mime = mime_guess::from_path(&asset).first_or_octet_stream();
            (
                [
                    (header::CONTENT_TYPE, mime.as_ref()),
                    (header::CACHE_CONTROL, CACHE_CONTROL),
                ],
                content.data,
            )
                .into_response()
        }
        None => not_found().await,
    }
}

pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "404").into_response()
}

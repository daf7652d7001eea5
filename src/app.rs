use crate::{
    classify::Classifier,
    config::{Config, UploadMode},
    filename::NamingScheme,
    upload::upload_file,
};
use axum::{extract::DefaultBodyLimit, routing::any, Router};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Per-request view of the startup configuration.
#[derive(Clone)]
pub struct AppState {
    pub mode: UploadMode,
    pub naming: NamingScheme,
    pub upload_root: Arc<PathBuf>,
    pub tagger: Option<Arc<dyn Classifier>>,
}

impl From<&Config> for AppState {
    fn from(config: &Config) -> Self {
        Self {
            mode: config.mode,
            naming: config.naming,
            upload_root: Arc::new(config.upload_root.clone()),
            tagger: config.tagger.clone(),
        }
    }
}

/// Cap on URL-encoded bodies when no ceiling is configured. Form values are
/// held in memory, unlike multipart parts which are spooled to disk.
pub const URLENCODED_DEFAULT_LIMIT: usize = 10 * 1024 * 1024;

pub fn router(state: AppState, max_upload_size: Option<usize>) -> Router {
    let body_limit = match (max_upload_size, state.mode) {
        (Some(limit), _) => DefaultBodyLimit::max(limit),
        (None, UploadMode::UrlEncoded) => DefaultBodyLimit::max(URLENCODED_DEFAULT_LIMIT),
        (None, UploadMode::Multipart) => DefaultBodyLimit::disable(),
    };

    let middleware_stack = ServiceBuilder::new()
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(body_limit);

    Router::new()
        .route("/", any(upload_file))
        .layer(middleware_stack)
        .with_state(state)
}

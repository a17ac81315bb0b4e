use crate::signaling::{SignalingService, ws_handler};
use axum::Router;
use axum::routing::get;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

/// `/websocket` signaling endpoint, plus a static browser client when
/// `static_dir` is given.
pub fn router(service: SignalingService, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new().route("/websocket", get(ws_handler));
    let app = match static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    };

    app.layer(cors).with_state(service)
}

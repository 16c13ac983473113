use axum::{routing::get, Router};

pub fn app(api: Router) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/api", api)
}

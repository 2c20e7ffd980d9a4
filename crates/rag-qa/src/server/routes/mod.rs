//! HTTP routes for the question-answering server

pub mod collection;
pub mod query;

use axum::{
    response::Html,
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(welcome))
        .route("/health", get(health_check))
        .route("/ask", post(query::ask))
        .route("/collectioninfo", get(collection::collection_info))
}

/// GET / - welcome page
async fn welcome() -> Html<&'static str> {
    Html("<h1>Welcome to our Question/Answering application</h1>")
}

/// GET /health
async fn health_check() -> &'static str {
    "OK"
}

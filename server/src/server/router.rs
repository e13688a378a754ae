use std::any::Any;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{
    Json, Router,
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::api;
use crate::app::SharedState;

/// Create the axum router with all routes.
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        // --- Core ---
        .route("/status", get(status_handler))
        // --- Companion chat ---
        .route("/api/chat", post(api::chat::chat))
        .route("/api/usage", get(api::chat::usage))
        .route("/api/tiers", get(api::chat::list_tiers))
        .route("/api/voice", post(api::voice::synthesize))
        // --- Billing ---
        .route("/api/stripe/checkout", post(api::billing::checkout))
        .route("/api/stripe/webhook", post(api::billing::webhook))
        // --- Fanvue OAuth & posting ---
        .route("/api/fanvue/authorize", get(api::fanvue::authorize))
        .route("/api/fanvue/callback", get(api::fanvue::callback))
        .route("/api/fanvue/success", get(api::fanvue::success))
        .route("/api/fanvue/refresh", get(api::fanvue::refresh))
        .route("/api/fanvue/status", get(api::fanvue::status))
        .route("/api/fanvue/post", get(api::fanvue::post_status).post(api::fanvue::create_post))
        // --- Content queue ---
        .route(
            "/api/content/queue",
            get(api::content::list_queue)
                .post(api::content::enqueue)
                .delete(api::content::remove),
        )
        .route("/api/content/process", get(api::content::process))
        .route("/api/content/generate", get(api::content::generate_usage).post(api::content::generate))
        // --- Inbound webhooks ---
        .route("/api/webhooks/fanvue", get(api::webhooks::probe).post(api::webhooks::receive))
        // --- Settings ---
        .route("/api/settings", get(api::settings::get_settings).put(api::settings::update_settings))
        .route("/api/settings/status", get(api::settings::get_settings_status))
        // --- Middleware ---
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn status_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

fn handle_panic(_err: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("Handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "status": "error", "error": "Internal server error" })),
    )
        .into_response()
}

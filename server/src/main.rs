mod access;
mod api;
mod auth;
mod error;
mod settings;
mod stats;
mod store;
mod users;

use auth::{AppState, SharedState};
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use settings::Settings;
use std::net::SocketAddr;
use std::sync::Arc;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::load().expect("Failed to load settings");
    if settings.jwt_secret == Settings::default().jwt_secret {
        tracing::warn!("running with the default JWT secret — set one in settings.json");
    }

    let store = Store::open(&settings.db_path).expect("Failed to open database");
    tracing::info!(db = %settings.db_path, "store opened");

    let addr: SocketAddr = format!("{}:{}", settings.binding, settings.port)
        .parse()
        .expect("Invalid bind address");

    let state: SharedState = Arc::new(AppState { store, settings });

    // Everything except register/login/health sits behind the bearer check.
    let protected = Router::new()
        .route("/users/profile", put(users::update_profile))
        .route("/users/change-password", put(users::change_password))
        .route("/users/stats", get(users::user_stats))
        .route("/tasks", get(api::list_tasks).post(api::create_task))
        .route("/tasks/stats/dashboard", get(api::dashboard_stats))
        .route(
            "/tasks/:id",
            get(api::get_task).put(api::update_task).delete(api::delete_task),
        )
        .route("/tasks/:id/complete", post(api::complete_task))
        .layer(middleware::from_fn_with_state(state.clone(), auth::auth_middleware));

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/users/register", post(users::register))
        .route("/users/login", post(users::login))
        .merge(protected)
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    tracing::info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");
    axum::serve(listener, app).await.expect("Server error");
}

use crate::state::AppState;
use axum::{
    extract::Request,
    http::{header, Method},
    routing::get,
};
use tower_cookies::CookieManagerLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};

pub mod auth;
pub mod likes;
pub mod users;

/// Build the application router with all routes
pub fn routes(app_state: AppState) -> axum::Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(app_state.config.cors_origins.clone()))
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    axum::Router::new()
        // OAuth routes
        .route("/auth/login", get(auth::login))
        .route("/auth/callback", get(auth::callback))
        // Stored users and their likes
        .route("/users", get(users::list_users))
        .route("/likes/:user_id", get(likes::list_likes))
        .layer(cors)
        .layer(CookieManagerLayer::new())
        // Add trace layer for debugging
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(sentry_tower::SentryHttpLayer::with_transaction())
        .layer(sentry_tower::NewSentryLayer::<Request>::new_from_top())
        .with_state(app_state)
}

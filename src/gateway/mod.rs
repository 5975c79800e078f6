pub mod context;
pub mod handlers;
pub mod state;
pub mod types;


use std::any::Any;
use std::sync::Arc;

use axum::{
    Json, Router,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;

use crate::errors::ErrorKind;
use crate::rbac::{Permission, jwt_auth_middleware, require_permission};
use context::request_context_middleware;
use state::AppState;
use types::ApiResponse;

/// Turn a handler panic into a 500 envelope.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!(panic = %detail, "handler panicked");

    let status = StatusCode::INTERNAL_SERVER_ERROR;
    let body = ApiResponse::<()>::error(
        status,
        ErrorKind::Internal.name(),
        "An unexpected error occurred. Please try again later.",
    );
    (status, Json(body)).into_response()
}

/// Build the full `/api/v1` router.
pub fn build_router(state: Arc<AppState>) -> Router {
    // ==========================================================================
    // Public Routes (no auth required)
    // ==========================================================================
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    // ==========================================================================
    // Protected Routes: bearer token, then a permission gate per route
    // ==========================================================================
    let protected_routes = Router::new()
        .route(
            "/users",
            get(handlers::users::list_users)
                .route_layer(from_fn_with_state(Permission::ViewUsers, require_permission)),
        )
        .route(
            "/users/{id}",
            get(handlers::users::get_user)
                .route_layer(from_fn_with_state(Permission::ViewUsers, require_permission)),
        )
        .route(
            "/roles",
            get(handlers::roles::list_roles)
                .post(handlers::roles::create_role)
                .route_layer(from_fn_with_state(Permission::ManageRoles, require_permission)),
        )
        .route(
            "/roles/{id}",
            get(handlers::roles::get_role)
                .put(handlers::roles::update_role)
                .delete(handlers::roles::delete_role)
                .route_layer(from_fn_with_state(Permission::ManageRoles, require_permission)),
        )
        .route(
            "/permissions",
            get(handlers::permissions::list_permissions).route_layer(from_fn_with_state(
                Permission::ManagePermissions,
                require_permission,
            )),
        )
        .layer(from_fn_with_state(state.tokens.clone(), jwt_auth_middleware));

    let api = Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/auth", auth_routes)
        .merge(protected_routes);

    Router::new()
        .nest("/api/v1", api)
        .with_state(state)
        .layer(from_fn(request_context_middleware))
        .layer(CatchPanicLayer::custom(handle_panic))
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

/// Start the HTTP gateway and serve until a shutdown signal arrives.
pub async fn run_server(host: &str, port: u16, state: Arc<AppState>) -> std::io::Result<()> {
    let app = build_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        tracing::error!(
            "Failed to bind to {}: {} (port {} may already be in use)",
            addr,
            e,
            port
        );
        e
    })?;

    tracing::info!("Gateway listening on http://{}", addr);
    tracing::info!("Public API:    /api/v1/auth/*, /api/v1/health");
    tracing::info!("Protected API: /api/v1/users, /api/v1/roles, /api/v1/permissions");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Gateway shutdown complete");
    Ok(())
}

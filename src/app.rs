use std::{net::SocketAddr, time::Duration};

use axum::{middleware::from_fn_with_state, Router};
use tokio::signal;
use tracing::info;

use crate::{
    auth::{self, require_auth},
    config::AppConfig,
    error::ApiError,
    middleware::with_global_stack,
    state::AppState,
    tasks,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound("not found".into())
}

/// Public auth routes, plus private routes behind [`require_auth`], all inside
/// the global logging, CORS and timeout stack.
pub fn build_app(state: AppState) -> Router {
    let private = Router::new()
        .nest("/private", auth::handlers::whoami_routes())
        .merge(tasks::task_routes())
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let router = Router::new()
        .merge(auth::handlers::auth_routes())
        .merge(private)
        .fallback(not_found)
        .with_state(state);

    with_global_stack(router, REQUEST_TIMEOUT)
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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
    info!("stopping server");
}

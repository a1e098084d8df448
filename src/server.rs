//! HTTP listener plumbing shared by the webhook and MCP servers.

use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method};
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::CorsConfig;
use crate::error::ServerError;

fn is_wildcard(list: &[String]) -> bool {
    list.is_empty() || list.iter().any(|v| v == "*")
}

/// Build the CORS layer. `*` in any list means "allow all" for that list;
/// entries that are not valid header values are logged and skipped.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins = if is_wildcard(&config.allow_origins) {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(config.allow_origins.iter().filter_map(|o| {
            HeaderValue::from_str(o)
                .inspect_err(|_| tracing::warn!(origin = %o, "Ignoring invalid CORS origin"))
                .ok()
        }))
    };

    let methods = if is_wildcard(&config.allow_methods) {
        AllowMethods::any()
    } else {
        AllowMethods::list(config.allow_methods.iter().filter_map(|m| {
            Method::from_bytes(m.to_ascii_uppercase().as_bytes())
                .inspect_err(|_| tracing::warn!(method = %m, "Ignoring invalid CORS method"))
                .ok()
        }))
    };

    let headers = if is_wildcard(&config.allow_headers) {
        AllowHeaders::any()
    } else {
        AllowHeaders::list(config.allow_headers.iter().filter_map(|h| {
            HeaderName::from_bytes(h.as_bytes())
                .inspect_err(|_| tracing::warn!(header = %h, "Ignoring invalid CORS header"))
                .ok()
        }))
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers)
}

/// Add tracing and CORS to an app router.
pub fn with_middleware(router: Router, cors: &CorsConfig) -> Router {
    router
        .layer(cors_layer(cors))
        .layer(TraceLayer::new_for_http())
}

/// Parse and bind before anything is spawned so startup errors surface.
pub async fn bind(name: &str, host: &str, port: u16) -> Result<TcpListener, ServerError> {
    let addr: SocketAddr =
        format!("{}:{}", host, port)
            .parse()
            .map_err(|e| ServerError::StartupFailed {
                name: name.to_string(),
                reason: format!("Invalid address '{}:{}': {}", host, port, e),
            })?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::StartupFailed {
            name: name.to_string(),
            reason: format!("Failed to bind to {}: {}", addr, e),
        })?;

    tracing::info!("{} server listening on {}", name, addr);
    Ok(listener)
}

/// Serve `app` until `shutdown` resolves.
pub async fn serve<F>(
    name: &str,
    listener: TcpListener,
    app: Router,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServerError::Serve {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
    tracing::info!("{} server shut down", name);
    Ok(())
}

/// Resolves on Ctrl-C (and SIGTERM on unix).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_detection() {
        assert!(is_wildcard(&[]));
        assert!(is_wildcard(&["*".to_string()]));
        assert!(!is_wildcard(&["https://example.com".to_string()]));
    }

    #[tokio::test]
    async fn test_bind_invalid_address() {
        let err = bind("test", "not an address", 0).await.unwrap_err();
        assert!(matches!(err, ServerError::StartupFailed { .. }));
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let listener = bind("test", "127.0.0.1", 0).await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }
}

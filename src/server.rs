mod config;
mod http;

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{ClientRegistry, ProxyError, UpstreamClient};

pub use config::{ProxyConfig, RouteMode};

pub const TOKEN_PATH: &str = "/token";

/// The token endpoint proxy: routing, validation and relay for one registry.
#[derive(Clone)]
pub struct TokenProxy {
    config: ProxyConfig,
    registry: ClientRegistry,
    upstream: UpstreamClient,
}

impl TokenProxy {
    pub fn new(config: ProxyConfig, registry: ClientRegistry) -> Result<Self, ProxyError> {
        let upstream = UpstreamClient::new(config.upstream_timeout)?;
        Ok(Self {
            config,
            registry,
            upstream,
        })
    }

    pub fn with_upstream_client(mut self, upstream: UpstreamClient) -> Self {
        self.upstream = upstream;
        self
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn router(self) -> Router {
        Router::new()
            .fallback(http::dispatch)
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::new(self))
    }

    pub async fn serve(self, listener: TcpListener) -> Result<(), ProxyError> {
        self.serve_with_shutdown(listener, std::future::pending())
            .await
    }

    pub async fn serve_with_shutdown<F>(
        self,
        listener: TcpListener,
        shutdown: F,
    ) -> Result<(), ProxyError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}

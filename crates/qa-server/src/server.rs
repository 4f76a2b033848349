//! HTTP API server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::Method;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use qa_core::{QaError, Result, ServerConfig};
use qa_query::HybridSearcher;

use crate::handlers::AppState;
use crate::routes::create_router;

/// HTTP API server
pub struct HttpServer {
    config: ServerConfig,
    searcher: Arc<HybridSearcher>,
}

impl HttpServer {
    pub fn new(config: ServerConfig, searcher: Arc<HybridSearcher>) -> Self {
        Self { config, searcher }
    }

    fn listen_addr(&self) -> Result<SocketAddr> {
        self.config.bind_address.parse().map_err(|e| {
            QaError::config(format!(
                "invalid bind address {:?}: {}",
                self.config.bind_address, e
            ))
        })
    }

    /// Serve until `shutdown` fires.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let addr = self.listen_addr()?;

        let mut app = create_router(AppState::new(self.searcher.clone()));

        if self.config.cors_enabled {
            let cors = CorsLayer::new()
                .allow_methods([Method::GET, Method::OPTIONS])
                .allow_headers(Any)
                .allow_origin(Any);
            app = app.layer(cors);
        }

        app = app.layer(TraceLayer::new_for_http());

        let listener = TcpListener::bind(&addr).await?;

        info!(
            "HTTP API server listening on http://{} (collection {})",
            addr,
            self.searcher.settings().collection
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                info!("HTTP server shutting down");
            })
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qa_embed::{Bm25Encoder, MockEmbedder};
    use qa_query::SearchSettings;
    use qa_store::MemoryStore;

    fn server(bind_address: &str) -> HttpServer {
        let searcher = HybridSearcher::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MockEmbedder::new()),
            Arc::new(Bm25Encoder::new()),
            SearchSettings::default(),
        );
        HttpServer::new(
            ServerConfig {
                bind_address: bind_address.to_string(),
                cors_enabled: true,
            },
            Arc::new(searcher),
        )
    }

    #[test]
    fn test_listen_addr() {
        assert_eq!(server("0.0.0.0:8000").listen_addr().unwrap().port(), 8000);

        let err = server("localhost").listen_addr().unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
    }

    #[tokio::test]
    async fn test_shutdown() {
        let (tx, rx) = broadcast::channel(1);
        let server = server("127.0.0.1:0");

        let handle = tokio::spawn(async move { server.run(rx).await });
        tx.send(()).unwrap();

        handle.await.unwrap().unwrap();
    }
}

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use chatbridge_core::LLMProvider;
use chatbridge_runtime::ChatService;

use crate::config::{AppConfig, mask_key};
use crate::routes::{build_router, cors_layer};

pub struct ChatServer {
    config: AppConfig,
    service: Arc<ChatService>,
}

impl ChatServer {
    pub fn new(config: AppConfig, llm: Arc<dyn LLMProvider>) -> Self {
        let service = ChatService::with_provider(
            llm,
            config.server.system_prompt.clone(),
            config.memory.clone(),
        )
        .with_reply_config(&config.reply);

        Self {
            config,
            service: Arc::new(service),
        }
    }

    /// Builds the configured provider and wires the service around it.
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let provider = config.build_provider()?;
        match config.provider.api_key.as_deref() {
            Some(key) => info!(
                provider = config.provider.kind.as_str(),
                model = %config.provider.model,
                api_key = %mask_key(key),
                "Provider configured"
            ),
            None if provider.is_configured() => info!(
                provider = config.provider.kind.as_str(),
                model = %config.provider.model,
                "Provider configured without API key"
            ),
            None => info!("No API key found, replies will use the fallback responder"),
        }
        Ok(Self::new(config, Arc::new(provider)))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn service(&self) -> &Arc<ChatService> {
        &self.service
    }

    pub fn router(&self) -> Router {
        build_router(self.service.clone(), cors_layer(&self.config.server.cors_origins))
    }

    /// Serves until Ctrl-C or SIGTERM, letting in-flight requests finish.
    pub async fn run(self) -> anyhow::Result<()> {
        let app = self.router();
        let addr = self.config.bind_address();

        let listener = TcpListener::bind(&addr).await?;
        info!("Chat server listening on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Chat server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("Shutdown signal received");
}

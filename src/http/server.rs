//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the dispatch handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener (plain TCP or TLS)
//! - Apply live config updates (production domain)
//! - Stop on the shutdown signal, draining in-flight requests

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::RouterConfig;
use crate::http::dispatch::Dispatcher;
use crate::http::request::MakeRequestUuidV4;
use crate::routing::TenantResolver;
use crate::storage::{Storage, StoreError};

/// HTTP server for the site router.
pub struct HttpServer {
    router: Router,
    config: RouterConfig,
    dispatcher: Arc<Dispatcher>,
}

impl HttpServer {
    /// Create a server reading from the storage named in `config`.
    pub fn new(config: RouterConfig) -> Result<Self, StoreError> {
        let storage = Storage::from_config(&config.storage)?;
        Ok(Self::with_storage(config, storage))
    }

    /// Create a server over explicit stores.
    pub fn with_storage(config: RouterConfig, storage: Storage) -> Self {
        let dispatcher = Dispatcher::new(
            TenantResolver::new(&config.site.production_domain),
            storage,
            Duration::from_secs(config.timeouts.store_secs),
        );
        Self::with_dispatcher(config, dispatcher)
    }

    /// Create a server around an already-built dispatcher.
    pub fn with_dispatcher(config: RouterConfig, dispatcher: Dispatcher) -> Self {
        let dispatcher = Arc::new(dispatcher);
        let router = Self::build_router(&config, dispatcher.clone());
        Self {
            router,
            config,
            dispatcher,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &RouterConfig, dispatcher: Arc<Dispatcher>) -> Router {
        Router::new()
            .fallback(dispatch_handler)
            .with_state(dispatcher)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Run the server on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<RouterConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            production_domain = %self.config.site.production_domain,
            "HTTP server starting"
        );

        tokio::spawn(apply_config_updates(self.dispatcher.clone(), self.config.clone(), config_updates));

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server with TLS termination until `shutdown` fires.
    pub async fn run_tls(
        self,
        tls: axum_server::tls_rustls::RustlsConfig,
        config_updates: mpsc::UnboundedReceiver<RouterConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = self
            .config
            .listener
            .bind_address
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        tokio::spawn(apply_config_updates(self.dispatcher.clone(), self.config.clone(), config_updates));

        crate::net::tls::serve_tls(addr, tls, self.router, shutdown).await
    }
}

#[axum::debug_handler]
async fn dispatch_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    request: Request<Body>,
) -> Response {
    dispatcher.handle(request).await
}

/// Swap in the tenant resolver from each accepted reload.
async fn apply_config_updates(
    dispatcher: Arc<Dispatcher>,
    mut current: RouterConfig,
    mut updates: mpsc::UnboundedReceiver<RouterConfig>,
) {
    while let Some(new_config) = updates.recv().await {
        if new_config.site.production_domain != current.site.production_domain {
            dispatcher
                .tenants()
                .store(Arc::new(TenantResolver::new(&new_config.site.production_domain)));
            tracing::info!(
                production_domain = %new_config.site.production_domain,
                "Production domain updated"
            );
        }

        if new_config.storage != current.storage
            || new_config.listener.bind_address != current.listener.bind_address
            || new_config.timeouts.store_secs != current.timeouts.store_secs
            || new_config.timeouts.request_secs != current.timeouts.request_secs
        {
            tracing::warn!("Storage, listener or timeout changes take effect after restart");
        }

        current = new_config;
    }
}

//! TLS configuration and certificate loading.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tokio::sync::broadcast;

/// How long in-flight requests get to finish after shutdown is signalled.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Load TLS configuration from certificate and key files.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, std::io::Error> {
    if !cert_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Certificate file not found: {:?}", cert_path),
        ));
    }
    if !key_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Private key file not found: {:?}", key_path),
        ));
    }

    RustlsConfig::from_pem_file(cert_path, key_path).await
}

/// Serve `router` over TLS on `addr` until `shutdown` fires.
pub async fn serve_tls(
    addr: SocketAddr,
    tls: RustlsConfig,
    router: Router,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let handle = Handle::new();

    let drain = handle.clone();
    tokio::spawn(async move {
        let _ = shutdown.recv().await;
        tracing::info!("Shutdown signal received, draining TLS connections");
        drain.graceful_shutdown(Some(DRAIN_TIMEOUT));
    });

    tracing::info!(address = %addr, "HTTPS server starting");
    axum_server::bind_rustls(addr, tls)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;

    tracing::info!("HTTPS server stopped");
    Ok(())
}

//! Test server helpers.

use axum::Router;
use uds_client::config::ServerConfig;
use uds_client::transport::ReqwestTransport;

/// Serves `app` on an ephemeral local port and returns settings pointing at it.
pub async fn spawn(app: Router) -> ServerConfig {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    ServerConfig::new(format!("http://{addr}")).with_timeout(5)
}

/// Serves `app` and returns a transport connected to it.
pub async fn transport_for(app: Router) -> ReqwestTransport {
    let config = spawn(app).await;
    ReqwestTransport::new(&config).unwrap()
}

//! API server: bind and serve the router.

use std::net::SocketAddr;

use super::router::api_router;
use super::types::ApiContext;

/// Serve the API until the process is stopped.
pub async fn serve(ctx: ApiContext, addr: SocketAddr) -> Result<(), std::io::Error> {
    let router = api_router(ctx);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, router).await
}

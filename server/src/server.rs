use std::net::SocketAddr;

use tracing::info;

/// Serve the router on all interfaces at `port` until the process exits
pub async fn run_server(app: axum::Router, port: u16) -> color_eyre::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

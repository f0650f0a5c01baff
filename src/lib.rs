pub mod actions;
pub mod adapters;
pub mod auth;
pub mod config;
pub mod live;
pub mod model;
pub mod ports;
pub mod seed;
pub mod session;

mod app;
mod assets;
mod state;
mod templates;

#[cfg(test)]
mod testing;

pub use app::{StartupError, app, app_with_store};

use std::net::SocketAddr;

pub async fn serve(addr: SocketAddr, config: config::AppConfig) -> Result<(), StartupError> {
    let router = app(config).await?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{addr}");
    axum::serve(listener, router).await?;
    Ok(())
}

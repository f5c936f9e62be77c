use anyhow::Result;
use clap::Parser;
use msc_core::persist::IndexPaths;
use msc_core::LazyEngine;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Index directory path
    #[arg(long, default_value = "./index")]
    index: String,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Load the index before accepting requests instead of on the first search
    #[arg(long)]
    preload: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let engine = Arc::new(LazyEngine::open(IndexPaths::new(&args.index)));

    if args.preload {
        let lazy = Arc::clone(&engine);
        match tokio::task::spawn_blocking(move || lazy.get()).await? {
            Ok(e) => tracing::info!(num_docs = e.num_docs(), schemes = ?e.schemes(), "index preloaded"),
            // an index built later is picked up by the next request
            Err(err) if err.is_not_built() => tracing::warn!(error = %err, "index not built yet"),
            Err(err) => return Err(err.into()),
        }
    }

    let cors = std::env::var("CORS_ALLOW_ORIGIN").unwrap_or_else(|_| "*".to_string());
    let app = server::router(engine);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, index = %args.index, %cors, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

//! Doable sync server - HTTP API over synced todo files

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use doablecache::{DirectoryWatcher, DoableCache};
use doablestore::EntityStore;
use doabled::{config, logging, AppState, Config, LogLevel};
use tokio::net::TcpListener;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Bind address
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    bind: String,

    /// Sync directory holding `todos/` and `lists/`
    #[arg(short, long, default_value = "sync")]
    sync_dir: PathBuf,

    /// Directory for rotated JSON log files
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Log level, overrides LOG_LEVEL (DEBUG, INFO, WARN, ERROR, FATAL)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    config::load_dotenv();
    let mut config = Config::from_env();
    if let Some(level) = args.log_level.as_deref() {
        config.log_level = LogLevel::parse(level);
    }

    let _log_guard = logging::init(config.log_level, &args.log_dir)?;

    info!("Starting Doable sync server v{}", env!("CARGO_PKG_VERSION"));
    info!("Sync directory: {}", args.sync_dir.display());
    info!("Log level: {:?}", config.log_level);

    let store = Arc::new(EntityStore::new(&args.sync_dir));
    let cache = Arc::new(DoableCache::new(Arc::clone(&store)));

    let mut watcher = match DirectoryWatcher::new(Arc::clone(&cache)).start().await {
        Ok(handle) => handle,
        Err(e) => {
            error!("Cannot watch sync directory: {}", e);
            return Err(e).context("cannot set up directory watch");
        }
    };

    let listener = match TcpListener::bind(&args.bind).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Cannot bind {}: {}", args.bind, e);
            return Err(e).with_context(|| format!("cannot bind {}", args.bind));
        }
    };
    info!("Server listening on {}", args.bind);

    let app = doabled::app(AppState::new(store, cache), &config);
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal());

    tokio::select! {
        served = server.into_future() => {
            served.context("server error")?;
        }
        watched = watcher.finished() => {
            return match watched {
                Ok(()) => bail!("directory watcher exited unexpectedly"),
                Err(e) => {
                    error!("Directory watcher died: {}", e);
                    Err(e).context("directory watcher died")
                }
            };
        }
    }

    watcher.stop().await.context("cannot stop directory watcher")?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

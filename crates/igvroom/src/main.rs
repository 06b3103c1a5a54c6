use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use igvroom::IgvRoomServer;
use igvroom_room::RoomConfig;
use igvroom_store::{FileBackend, MemoryBackend, StoreProvider};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "igvroom")]
#[command(about = "Real-time collaboration server for shared genome-browser sessions")]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:8787")]
    bind: String,

    /// Directory for per-room state files (in-memory when omitted)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Seconds after which an idle cursor is dropped
    #[arg(long, default_value = "100")]
    cursor_ttl_secs: u64,

    /// Cursor entries inspected per join
    #[arg(long, default_value = "20")]
    cursor_backlog: usize,

    /// Seconds an empty room stays loaded
    #[arg(long, default_value = "30")]
    idle_timeout_secs: u64,

    /// Longest accepted display name, in UTF-16 code units
    #[arg(long, default_value = "64")]
    max_name_len: usize,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.debug { "igvroom=debug" } else { "igvroom=info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = RoomConfig {
        max_name_len: args.max_name_len,
        cursor_ttl: Duration::from_secs(args.cursor_ttl_secs),
        cursor_backlog_limit: args.cursor_backlog,
        idle_timeout: Duration::from_secs(args.idle_timeout_secs),
        ..RoomConfig::default()
    };

    match &args.data_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create data dir {}", dir.display()))?;
            info!(data_dir = %dir.display(), "using file store");
            serve(&args.bind, config, FileBackend::new(dir)).await
        }
        None => {
            info!("using in-memory store; state is lost on exit");
            serve(&args.bind, config, MemoryBackend::new()).await
        }
    }
}

async fn serve<P: StoreProvider>(bind: &str, config: RoomConfig, provider: P) -> Result<()> {
    let server = IgvRoomServer::<P>::builder()
        .bind(bind)
        .room_config(config)
        .build(provider)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;

    info!(addr = %server.local_addr()?, "listening");
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "ctrl-c handler unavailable");
                std::future::pending::<()>().await;
            }
        })
        .await?;
    Ok(())
}

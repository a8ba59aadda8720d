//! Twiniverse Stub Server Binary
//!
//! Serves the Twiniverse protocol with canned models, for exercising
//! clients without the real generation pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use twiniverse::network::{Server, StubHandler};
use twiniverse::ServerConfig;
use tracing_subscriber::{fmt, EnvFilter};

/// Twiniverse stub server
#[derive(Parser, Debug)]
#[command(name = "twiniverse-stub")]
#[command(about = "Stub server for the Twiniverse model-generation protocol")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:27172")]
    listen: String,

    /// Worker threads serving connections
    #[arg(short, long, default_value = "4")]
    workers: usize,

    /// Accepted account, as user:password (repeatable)
    #[arg(short, long = "account", value_name = "USER:PASSWORD")]
    accounts: Vec<String>,

    /// Model returned for IMAGE requests
    #[arg(long)]
    image_model: Option<PathBuf>,

    /// Model returned for VIDEO requests
    #[arg(long)]
    video_model: Option<PathBuf>,

    /// Model fetchable by hash, as hash=path (repeatable)
    #[arg(long = "store", value_name = "HASH=PATH")]
    stored: Vec<String>,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,twiniverse=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("Twiniverse stub server v{}", twiniverse::VERSION);

    let handler = match build_handler(&args) {
        Ok(h) => h,
        Err(e) => {
            tracing::error!("Invalid arguments: {}", e);
            std::process::exit(1);
        }
    };

    let config = ServerConfig::builder()
        .listen_addr(&args.listen)
        .workers(args.workers)
        .build();

    let server = match Server::bind(config, Arc::new(handler)) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

fn build_handler(args: &Args) -> Result<StubHandler, String> {
    let mut handler = StubHandler::new();

    for account in &args.accounts {
        let (user, password) = account
            .split_once(':')
            .ok_or_else(|| format!("account '{}' is not USER:PASSWORD", account))?;
        handler = handler.with_account(user, password);
    }

    for entry in &args.stored {
        let (hash, path) = entry
            .split_once('=')
            .ok_or_else(|| format!("store entry '{}' is not HASH=PATH", entry))?;
        handler = handler.with_artifact(hash, read_model(&PathBuf::from(path))?);
    }

    if let Some(path) = &args.image_model {
        handler = handler.with_image_result(model_hash(path), read_model(path)?);
    }
    if let Some(path) = &args.video_model {
        handler = handler.with_video_result(model_hash(path), read_model(path)?);
    }

    Ok(handler)
}

fn read_model(path: &PathBuf) -> Result<Vec<u8>, String> {
    std::fs::read(path).map_err(|e| format!("failed to read {}: {}", path.display(), e))
}

/// Models are addressed by their file stem
fn model_hash(path: &PathBuf) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string())
}

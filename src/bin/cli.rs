//! Twiniverse CLI Client
//!
//! Command-line interface for logging in, submitting media and fetching
//! generated models.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use twiniverse::{ArtifactHandle, ClientConfig, ProtocolClient, Result, TwinError};
use tracing_subscriber::{fmt, EnvFilter};

/// Twiniverse CLI
#[derive(Parser, Debug)]
#[command(name = "twiniverse-cli")]
#[command(about = "CLI for the Twiniverse model-generation server")]
#[command(version)]
struct Args {
    /// Server host
    #[arg(long, env = "TWINIVERSE_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, env = "TWINIVERSE_PORT", default_value = "27172")]
    port: u16,

    /// Username used in saved filenames
    #[arg(short, long, env = "TWINIVERSE_USER", default_value = "guest")]
    user: String,

    /// Directory where models are saved
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check credentials against the server
    Login {
        username: String,
        password: String,
    },

    /// Generate a model from one or more images
    Images {
        /// Image files, in upload order
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Generate a model from a video
    Video {
        file: PathBuf,
    },

    /// Download a previously generated model
    Fetch {
        hash: String,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("{}", e.user_message());
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = ClientConfig::builder()
        .host(&args.host)
        .port(args.port)
        .username(&args.user)
        .build();
    let client = ProtocolClient::new(config)?;

    match args.command {
        Commands::Login { username, password } => {
            let result = client.login(&username, &password);
            match (result.authenticated, result.server_reachable) {
                (true, _) => println!("Logged in as {}", username),
                (false, true) => println!("Invalid username or password"),
                (false, false) => {
                    return Err(TwinError::Connection(
                        "login exchange did not complete".to_string(),
                    ))
                }
            }
        }
        Commands::Images { files } => {
            let images = files
                .iter()
                .map(std::fs::read)
                .collect::<std::io::Result<Vec<_>>>()?;
            let artifact = client.upload_images(&images)?;
            report(&artifact, &args.out_dir)?;
        }
        Commands::Video { file } => {
            let video = std::fs::read(&file)?;
            let artifact = client.upload_video(video)?;
            report(&artifact, &args.out_dir)?;
        }
        Commands::Fetch { hash } => {
            let artifact = client.fetch_by_hash(&hash)?;
            report(&artifact, &args.out_dir)?;
        }
    }

    Ok(())
}

fn report(artifact: &ArtifactHandle, out_dir: &Path) -> Result<()> {
    let path = artifact.save_to(out_dir)?;
    println!("Saved {} bytes to {}", artifact.len(), path.display());
    Ok(())
}

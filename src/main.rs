use anyhow::{Context, Result};
use clap::{error::ErrorKind, Parser};
use dotenv::dotenv;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use twfollowers::commands::export_followers::{self, Progress};
use twfollowers::credentials;
use twfollowers::filename_utils::DEFAULT_AUTH_FILE;
use twfollowers::twitter::{TwitterClient, DEFAULT_PAGE_SIZE};
use twfollowers::username::parse_username;

#[derive(Parser, Debug)]
#[command(
    name = "twfollowers",
    version,
    about = "Export a Twitter account's followers",
    long_about = "A CLI tool that pages through a Twitter account's followers and writes one JSON object per follower to <username>_followers.jsonl"
)]
struct Cli {
    /// Twitter username (with or without @ symbol, or a profile URL)
    #[arg(required = true)]
    username: String,

    /// YAML file holding the auth_token and ct0 session cookies
    #[arg(long, env = "TWFOLLOWERS_AUTH_FILE", default_value = DEFAULT_AUTH_FILE)]
    auth_file: PathBuf,

    /// Directory the export file is written to
    #[arg(short, long = "data-dir", env = "TWFOLLOWERS_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// Followers requested per page
    #[arg(long, env = "TWFOLLOWERS_PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: u32,

    /// Do not draw a progress bar
    #[arg(long)]
    no_progress: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Parse command line arguments; credentials are still bootstrapped on a bad command line
    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            let auth_file = std::env::var_os("TWFOLLOWERS_AUTH_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_AUTH_FILE));
            credentials::load_or_bootstrap(&auth_file)?;
            err.exit()
        }
    };

    // Initialize logging
    let filter_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if args.verbose {
        debug!("Verbose mode enabled");
    }

    // A missing file is replaced by a template and reported as an error
    let credentials = credentials::load_or_bootstrap(&args.auth_file)?;

    let username = parse_username(&args.username)?;

    // Make sure data directory exists
    if !args.data_dir.exists() {
        std::fs::create_dir_all(&args.data_dir).context("Failed to create data directory")?;
        info!(
            "Created data directory: {path}",
            path = args.data_dir.display()
        );
    }

    let client = TwitterClient::new(&credentials)
        .context("Failed to initialize Twitter client")?
        .with_page_size(args.page_size);

    let progress = if args.no_progress {
        Progress::Hidden
    } else {
        Progress::Bar
    };

    export_followers::execute(&client, &username, &args.data_dir, progress).await?;

    Ok(())
}

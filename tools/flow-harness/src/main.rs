//! Flow harness — runs HTTP golden assertions against a live backend.
//!
//! # Usage
//!
//! ```bash
//! # Run all fixtures against a local backend
//! cargo run -p flow-harness -- --base-url http://localhost:5050/api
//!
//! # Run only the auth fixtures, with a session token for the
//! # authenticated ones
//! cargo run -p flow-harness -- --base-url http://localhost:5050/api \
//!     --flow auth --token "$CHATFORGE_TOKEN"
//! ```
//!
//! Exits 0 when all assertions pass, exits 1 when any fail.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod fixture;
mod reporter;
mod runner;

use fixture::Fixture;
use reporter::Reporter;
use runner::Runner;

#[derive(Parser)]
#[command(about = "Run HTTP flow assertions against a live backend")]
struct Args {
    /// Base URL of the backend API (e.g. http://localhost:5050/api)
    #[arg(long)]
    base_url: String,

    /// Run only fixtures for this flow: auth, chat, or bots
    #[arg(long)]
    flow: Option<String>,

    /// Session token attached as a bearer header to fixtures marked `auth`
    #[arg(long)]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let workspace_root = workspace_root();
    let fixtures: Vec<Fixture> = fixture::load_all(&workspace_root, args.flow.as_deref())?;

    if fixtures.is_empty() {
        eprintln!("No fixtures found.");
        return Ok(());
    }

    println!(
        "Running {} fixture(s) against {}",
        fixtures.len(),
        args.base_url
    );
    println!();

    let runner = Runner::new(&args.base_url, args.token.as_deref());
    let mut reporter = Reporter::new();

    for f in &fixtures {
        let result = runner.run(f).await;
        reporter.record(f, result);
    }

    reporter.print_summary();

    if reporter.all_passed() {
        Ok(())
    } else {
        std::process::exit(1);
    }
}

/// Walk up from the binary's own manifest dir to find the workspace root
/// (the directory containing `Cargo.lock`).
fn workspace_root() -> PathBuf {
    let start = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    start
        .ancestors()
        .find(|p| p.join("Cargo.lock").exists())
        .unwrap_or(&start)
        .to_path_buf()
}

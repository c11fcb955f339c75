//! UCI front end for the classical engine.
//!
//! Protocol output goes to stdout; logs go to stderr (`RUST_LOG=debug`).

mod uci;

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use classical_engine::{ClassicalEngine, SearchConfig};

use uci::UciSession;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML engine configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Search threads, overriding the config file
    #[arg(short, long)]
    threads: Option<usize>,

    /// Transposition table size in MiB, overriding the config file
    #[arg(long)]
    hash: Option<usize>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .write_style(env_logger::WriteStyle::Never)
        .init();

    let mut config = match &args.config {
        Some(path) => SearchConfig::load(path)
            .with_context(|| format!("loading engine config {}", path.display()))?,
        None => SearchConfig::default(),
    };
    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    if let Some(hash) = args.hash {
        config.hash_mb = hash;
    }
    log::debug!("engine config: {config:?}");

    let engine = ClassicalEngine::with_config(config).context("invalid engine config")?;
    let mut session = UciSession::new(engine, io::stdout());
    session.run(io::stdin().lock())
}

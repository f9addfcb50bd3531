use anyhow::{Context, Result};
use ayah_fetch::observer::ConsoleObserver;
use ayah_fetch::worker::build_client;
use ayah_fetch::{Args, BatchDownloader, Catalog, Fetcher, RunConfig, Settings, Throttle, Validator};
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Exit status after a forced quit (128 + SIGINT).
const FORCE_EXIT_CODE: i32 = 130;

#[derive(Debug, PartialEq, Eq)]
enum Interrupt {
    /// Finish the current file, then stop.
    Graceful,
    /// Exit without waiting.
    Force,
}

fn interrupt_action(received: usize) -> Interrupt {
    if received <= 1 {
        Interrupt::Graceful
    } else {
        Interrupt::Force
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref()).context("Failed to load settings")?;
    let config = RunConfig::resolve(&args, settings).context("Invalid configuration")?;

    let client = build_client(config.timeout).context("Failed to build HTTP client")?;
    let validator = Validator::new(config.min_file_size);
    let fetcher = Fetcher::new(client, validator, config.retry)
        .with_throttle(config.rate_limit.map(Throttle::per_second));

    let cancel_token = CancellationToken::new();
    let signal_token = cancel_token.clone();

    tokio::spawn(async move {
        let mut received = 0;
        while tokio::signal::ctrl_c().await.is_ok() {
            received += 1;
            match interrupt_action(received) {
                Interrupt::Graceful => {
                    println!("\n🛑 Received Ctrl+C. Stopping after the current file (press again to quit now)...");
                    signal_token.cancel();
                }
                Interrupt::Force => {
                    println!("\n🛑 Received Ctrl+C again. Quitting immediately.");
                    std::process::exit(FORCE_EXIT_CODE);
                }
            }
        }
    });

    for reciter in &config.reciters {
        if cancel_token.is_cancelled() {
            break;
        }

        let target_dir = config.target_dir(reciter);
        println!("\n{}", "=".repeat(60));
        println!("📖 Reciter: {}", reciter.id);
        println!("📁 Target directory: {}", target_dir.display());
        println!("{}\n", "=".repeat(60));

        let catalog = Catalog::new(&config.base_url, &reciter.url_path, target_dir)?;
        let batch = BatchDownloader::new(
            catalog,
            fetcher.clone(),
            validator,
            config.batch_options(),
            Arc::new(ConsoleObserver::new()),
        )
        .with_cancel_token(cancel_token.clone());

        let stats = batch
            .run(config.selection, config.verify_first)
            .await
            .with_context(|| format!("Batch for reciter {} could not start", reciter.id))?;

        println!("\n📊 DOWNLOAD SUMMARY FOR {}", reciter.id);
        println!("{}", stats);
    }

    Ok(())
}

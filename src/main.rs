use anyhow::{Context, Result};
use clap::Parser;
use segfetch::{
    Args, ConsoleObserver, Downloader, NoopObserver, ProgressObserver, Settings, utils,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose { "segfetch=debug" } else { "segfetch=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let settings = Settings::load().unwrap_or_else(|e| {
        warn!(error = %e, "ignoring settings file");
        Settings::default()
    });
    let config = args.download_config(&settings);

    let observer: Arc<dyn ProgressObserver> = if args.quiet {
        Arc::new(NoopObserver)
    } else {
        Arc::new(ConsoleObserver::new())
    };
    let downloader = Downloader::from_config(config)
        .context("Failed to build HTTP client")?
        .with_observer(observer);

    println!("Starting download for: {}", args.url);
    let result = downloader.download_with_stats(&args.url).await;
    downloader.close();
    let (buffer, stats) = result.with_context(|| format!("Failed to download {}", args.url))?;

    let filename = args
        .output
        .clone()
        .unwrap_or_else(|| utils::get_filename_from_url(&stats.resolved_url));
    let output_dir = args.output_dir(&settings);
    if output_dir != "." {
        tokio::fs::create_dir_all(&output_dir)
            .await
            .with_context(|| format!("Failed to create {}", output_dir))?;
    }

    let mut output_path = PathBuf::from(&output_dir);
    output_path.push(&filename);
    tokio::fs::write(&output_path, buffer.into_inner())
        .await
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    println!(
        "✅ Saved {} ({} bytes in {} chunks, {} retries, {:.2}s)",
        output_path.display(),
        stats.size,
        stats.concurrency,
        stats.retries,
        stats.elapsed.as_secs_f64()
    );

    Ok(())
}

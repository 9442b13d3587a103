use segfetch::{BlockingDownloader, ConsoleObserver, DownloadConfig, utils};
use std::path::PathBuf;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let url = "https://proof.ovh.net/files/10Mb.dat";
    let output_dir = ".";

    println!("Starting example download...");
    println!("URL: {}", url);

    let config = DownloadConfig::default().with_concurrency(4);
    let mut downloader =
        BlockingDownloader::new(config).with_observer(Arc::new(ConsoleObserver::new()));

    // No async runtime needed here; the downloader owns one.
    let (buffer, stats) = downloader.download_with_stats(url)?;
    downloader.close();

    let mut output_path = PathBuf::from(output_dir);
    output_path.push(utils::get_filename_from_url(&stats.resolved_url));
    std::fs::write(&output_path, buffer.get_ref())?;

    println!(
        "✅ Download completed: {} ({} bytes, {} retries)",
        output_path.display(),
        stats.size,
        stats.retries
    );
    Ok(())
}

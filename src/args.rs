use crate::config::{DownloadConfig, FailurePolicy, Settings};
use clap::Parser;

/// Fast, concurrent byte-range downloader.
///
/// Splits a remote file into chunks, fetches them in parallel and writes the
/// reassembled result to disk once every chunk has arrived.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The URL of the file to download.
    #[arg(short, long)]
    pub url: String,

    /// The name of the output file. Defaults to the last path segment of the
    /// resolved URL.
    #[arg(short, long)]
    pub output: Option<String>,

    /// The directory to save the file in. Defaults to the current directory.
    #[arg(short = 'd', long)]
    pub dir: Option<String>,

    /// Number of concurrent chunks. Defaults to the available CPU count.
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Let in-flight chunks finish after a failure instead of cancelling them.
    #[arg(long)]
    pub drain: bool,

    /// Hide the progress bar.
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Merges command-line flags over file settings.
    pub fn download_config(&self, settings: &Settings) -> DownloadConfig {
        let mut config = DownloadConfig::from_settings(settings);
        if let Some(threads) = self.threads {
            config = config.with_concurrency(threads);
        }
        if self.drain {
            config = config.with_failure_policy(FailurePolicy::Drain);
        }
        config
    }

    pub fn output_dir(&self, settings: &Settings) -> String {
        self.dir
            .clone()
            .or_else(|| settings.output_dir.clone())
            .unwrap_or_else(|| ".".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_settings() {
        let settings = Settings {
            concurrency: Some(2),
            output_dir: Some("/tmp/downloads".into()),
            ..Settings::default()
        };

        let args = Args::parse_from(["segfetch", "-u", "http://a/b.bin", "-t", "6", "--drain"]);
        let config = args.download_config(&settings);
        assert_eq!(config.concurrency, 6);
        assert_eq!(config.failure_policy, FailurePolicy::Drain);
        assert_eq!(args.output_dir(&settings), "/tmp/downloads");

        let args = Args::parse_from(["segfetch", "--url", "http://a/b.bin", "-d", "out"]);
        let config = args.download_config(&settings);
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
        assert_eq!(args.output_dir(&settings), "out");
    }
}

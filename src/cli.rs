use clap::Parser;
use std::path::PathBuf;

use crate::fetcher::BROWSER_USER_AGENT;

#[derive(Parser, Debug)]
#[command(
    name = "page-archiver",
    about = "Archive a web page as a self-contained offline snapshot",
    version,
    long_about = "Downloads an HTML page together with the stylesheets, scripts, images, fonts, and icons it references, rewrites the document to point at the local copies, and stores everything under a per-site cache directory so the page renders offline."
)]
pub struct ArchiveCommand {
    /// The URL of the page to archive (scheme defaults to https)
    #[arg(required = true)]
    pub url: String,

    /// Base directory holding the per-site page caches
    #[arg(short = 'o', long, default_value = "./browser_cache")]
    pub cache_dir: PathBuf,

    /// Connect/read timeout per request in seconds
    #[arg(long, default_value = "10")]
    pub timeout: u64,

    /// Maximum redirect hops to follow per request
    #[arg(long, default_value = "10")]
    pub max_redirects: usize,

    /// User agent string to use for requests
    #[arg(long, default_value = BROWSER_USER_AGENT)]
    pub user_agent: String,

    /// Print the archive summary as JSON instead of the readable report
    #[arg(long)]
    pub json: bool,

    /// Suppress the download progress spinner
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

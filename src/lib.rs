pub mod archiver;
pub mod classifier;
pub mod cli;
pub mod error;
pub mod fetcher;
pub mod request;
pub mod resolver;
pub mod store;

// Re-export main types for convenience
pub use archiver::{ArchiveSummary, PageArchiver};
pub use classifier::ResponseClassifier;
pub use cli::ArchiveCommand;
pub use error::ArchiveError;
pub use fetcher::{Fetch, FetcherConfig, HttpFetcher};
pub use request::{HttpRequest, HttpResponse};
pub use resolver::{RefKind, Resolution, UrlResolver};
pub use store::{Category, ResourceStore};

use std::error::Error as StdError;
use std::path::Path;

use thiserror::Error;

/// Failure taxonomy for the archive pipeline.
///
/// Failures while fetching a single embedded resource are recovered by the
/// archiver (the original reference stays in the document); failures on the
/// root document abort the whole call and surface one of these variants.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// DNS, timeout, refused connection. Retryable by the caller; never
    /// retried internally.
    #[error("transport failure for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// The resource host answered with something other than 200.
    #[error("upstream returned HTTP {status} for {url}")]
    UpstreamStatus { url: String, status: u16 },

    /// Redirect chain exceeded the hop limit.
    #[error("redirect limit of {limit} hops exceeded starting from {url}")]
    RedirectLoop { url: String, limit: usize },

    /// The root document came back blank.
    #[error("no usable content in document fetched from {url}")]
    EmptyDocument { url: String },

    /// The caller cancelled the archive run between resource downloads.
    #[error("archive cancelled while fetching {url}")]
    Cancelled { url: String },

    #[error("i/o failure at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid resource pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

impl ArchiveError {
    pub fn transport(url: impl Into<String>, source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        ArchiveError::Transport {
            url: url.into(),
            source: source.into(),
        }
    }

    pub(crate) fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        ArchiveError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Whether the caller may reasonably retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ArchiveError::Transport { .. })
    }
}

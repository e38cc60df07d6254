use std::fs;
use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::ArchiveError;
use crate::fetcher::Fetch;
use crate::resolver::{RefKind, Resolution, UrlResolver};
use crate::store::{Category, ResourceStore};

// Each pattern captures the raw resource reference in group 1. The passes
// use disjoint patterns, so a reference rewritten by an earlier pass is
// never reconsidered by a later one.
const CSS_LINK_PATTERN: &str = r#"<link[^>]*href=["']([^"']+\.css[^"']*)["'][^>]*>"#;
const CSS_IMPORT_PATTERN: &str = r#"@import\s+url\(["']?([^"')]+\.css[^"')]*)["']?\)"#;
const SCRIPT_PATTERN: &str = r#"<script[^>]*src=["']([^"']+\.js[^"']*)["'][^>]*>"#;
const IMG_PATTERN: &str =
    r#"<img[^>]*src=["']([^"']+\.(?:jpg|jpeg|png|gif|svg|webp|ico|bmp)[^"']*)["'][^>]*>"#;
const CSS_URL_IMAGE_PATTERN: &str =
    r#"url\(["']?([^"')]+\.(?:jpg|jpeg|png|gif|svg|webp)[^"')]*)["']?\)"#;
const ICON_LINK_PATTERN: &str =
    r#"<link[^>]*rel=["'](?:icon|shortcut icon|apple-touch-icon)["'][^>]*href=["']([^"']+)["'][^>]*>"#;
const FONT_URL_PATTERN: &str = r#"url\(["']?([^"')]+\.(?:woff2?|ttf|eot|otf)[^"')]*)["']?\)"#;

const HEAD_OPEN_PATTERN: &str = r"<head[^>]*>";

/// One extraction/rewrite pass: a pattern, the cache category its downloads
/// land in, and a short label for progress reporting.
struct RewritePass {
    label: &'static str,
    pattern: Regex,
    category: Category,
}

/// Result of one archive run.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveSummary {
    pub url: String,
    pub cache_root: PathBuf,
    pub index_path: PathBuf,
    pub downloaded: usize,
    pub reused: usize,
    pub failed: usize,
    pub from_cache: bool,
}

#[derive(Default)]
struct DownloadStats {
    downloaded: usize,
    reused: usize,
    failed: usize,
}

/// Downloads a page plus every resource it references, rewrites the document
/// to point at the local copies, and persists the snapshot under a per-host
/// cache directory.
///
/// Reusable across calls; each `fetch` owns its own [`ResourceStore`], so
/// concurrent runs never share mutable state.
pub struct PageArchiver<F: Fetch> {
    fetcher: F,
    base_dir: PathBuf,
    passes: Vec<RewritePass>,
    head_open: Regex,
    cancellation: CancellationToken,
    show_progress: bool,
}

impl<F: Fetch> PageArchiver<F> {
    pub fn new(fetcher: F, base_dir: impl Into<PathBuf>) -> Result<Self, ArchiveError> {
        Ok(Self {
            fetcher,
            base_dir: base_dir.into(),
            passes: build_passes()?,
            head_open: RegexBuilder::new(HEAD_OPEN_PATTERN)
                .case_insensitive(true)
                .build()?,
            cancellation: CancellationToken::new(),
            show_progress: false,
        })
    }

    /// Token checked between resource downloads; cancelling it aborts the
    /// current run without waiting out the remaining timeouts.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_progress(mut self) -> Self {
        self.show_progress = true;
        self
    }

    /// Archives `url` and returns the snapshot summary. A snapshot that
    /// already exists on disk is returned as-is: the cache never expires.
    pub async fn fetch(&self, url: &str) -> Result<ArchiveSummary, ArchiveError> {
        let cache_root = self.base_dir.join(derive_host_dir(url));
        fs::create_dir_all(&cache_root).map_err(|e| ArchiveError::io(&cache_root, e))?;

        let index_path = cache_root.join("index.html");
        if index_path.exists() {
            log::info!("loading {} from cache at {}", url, cache_root.display());
            return Ok(ArchiveSummary {
                url: url.to_string(),
                cache_root,
                index_path,
                downloaded: 0,
                reused: 0,
                failed: 0,
                from_cache: true,
            });
        }

        log::info!("fetching page {}", url);
        let mut html = self.fetcher.fetch_text(url).await?;
        if html.trim().is_empty() {
            return Err(ArchiveError::EmptyDocument {
                url: url.to_string(),
            });
        }
        log::debug!("fetched root document, {} bytes", html.len());

        let resolver = UrlResolver::new(url);
        let mut store = ResourceStore::new(&cache_root);
        let mut stats = DownloadStats::default();

        let progress = self.progress_bar();
        for pass in &self.passes {
            html = self
                .run_pass(&html, pass, &resolver, &mut store, &mut stats, progress.as_ref())
                .await?;
        }
        if let Some(bar) = &progress {
            bar.finish_and_clear();
        }

        let html = self.inject_base_tag(&html, url);
        fs::write(&index_path, html).map_err(|e| ArchiveError::io(&index_path, e))?;

        log::info!(
            "archived {} ({} downloaded, {} reused, {} failed)",
            url,
            stats.downloaded,
            stats.reused,
            stats.failed
        );

        Ok(ArchiveSummary {
            url: url.to_string(),
            cache_root,
            index_path,
            downloaded: stats.downloaded,
            reused: stats.reused,
            failed: stats.failed,
            from_cache: false,
        })
    }

    /// Scans the document with one pass's pattern and splices in local paths
    /// for every reference that gets downloaded.
    async fn run_pass(
        &self,
        html: &str,
        pass: &RewritePass,
        resolver: &UrlResolver,
        store: &mut ResourceStore,
        stats: &mut DownloadStats,
        progress: Option<&ProgressBar>,
    ) -> Result<String, ArchiveError> {
        let mut out = String::with_capacity(html.len());
        let mut last_end = 0;

        for caps in pass.pattern.captures_iter(html) {
            let (Some(whole), Some(reference)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(&html[last_end..whole.start()]);
            last_end = whole.end();

            match self
                .archive_reference(reference.as_str(), pass, resolver, store, stats, progress)
                .await?
            {
                Some(local_path) => {
                    out.push_str(&whole.as_str().replace(reference.as_str(), &local_path));
                }
                None => out.push_str(whole.as_str()),
            }
        }
        out.push_str(&html[last_end..]);
        Ok(out)
    }

    /// Returns the local path to substitute, or `None` when the reference
    /// must stay untouched (skip policy, failed resolution, failed download).
    async fn archive_reference(
        &self,
        raw: &str,
        pass: &RewritePass,
        resolver: &UrlResolver,
        store: &mut ResourceStore,
        stats: &mut DownloadStats,
        progress: Option<&ProgressBar>,
    ) -> Result<Option<String>, ArchiveError> {
        if UrlResolver::classify(raw) == RefKind::Skip {
            return Ok(None);
        }

        let absolute = match resolver.resolve(raw) {
            Resolution::Absolute(url) => url,
            Resolution::FailedOpen(reference) => {
                log::debug!("keeping unresolved reference verbatim: {}", reference);
                return Ok(None);
            }
        };

        if let Some(existing) = store.lookup(&absolute) {
            stats.reused += 1;
            return Ok(Some(existing.to_string()));
        }

        if self.cancellation.is_cancelled() {
            return Err(ArchiveError::Cancelled { url: absolute });
        }

        if let Some(bar) = progress {
            bar.set_message(format!("[{}] {}", pass.label, absolute));
            bar.tick();
        }

        match self.download(&absolute, pass.category, store).await {
            Ok(local_path) => {
                stats.downloaded += 1;
                log::debug!("[{}] downloaded {} -> {}", pass.label, absolute, local_path);
                Ok(Some(local_path))
            }
            Err(err) => {
                stats.failed += 1;
                log::warn!("[{}] failed {}: {}", pass.label, absolute, err);
                Ok(None)
            }
        }
    }

    /// Bytes land on disk before the URL is recorded, so the store mapping
    /// never points at a file that was not written.
    async fn download(
        &self,
        url: &str,
        category: Category,
        store: &mut ResourceStore,
    ) -> Result<String, ArchiveError> {
        let bytes = self.fetcher.fetch_binary(url).await?;
        let local_path = store.reserve(url, category)?;
        store.write(&local_path, &bytes)?;
        Ok(local_path)
    }

    /// References the rewrite passes missed still resolve against the origin.
    fn inject_base_tag(&self, html: &str, url: &str) -> String {
        if html.contains("<base") {
            return html.to_string();
        }

        let (scheme, host) = match Url::parse(url) {
            Ok(parsed) => (
                parsed.scheme().to_string(),
                parsed.host_str().unwrap_or_default().to_string(),
            ),
            Err(_) => ("https".to_string(), String::new()),
        };
        let base_tag = format!("<base href=\"{}://{}/\">", scheme, host);

        self.head_open
            .replace(html, |caps: &regex::Captures| {
                format!("{}\n{}", &caps[0], base_tag)
            })
            .into_owned()
    }

    fn progress_bar(&self) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} {msg}") {
            bar.set_style(style);
        }
        Some(bar)
    }
}

fn build_passes() -> Result<Vec<RewritePass>, ArchiveError> {
    let defs: [(&'static str, &'static str, Category); 7] = [
        ("link", CSS_LINK_PATTERN, Category::Css),
        ("import", CSS_IMPORT_PATTERN, Category::Css),
        ("script", SCRIPT_PATTERN, Category::Js),
        ("img", IMG_PATTERN, Category::Images),
        ("bg", CSS_URL_IMAGE_PATTERN, Category::Images),
        ("icon", ICON_LINK_PATTERN, Category::Images),
        ("font", FONT_URL_PATTERN, Category::Fonts),
    ];

    let mut passes = Vec::with_capacity(defs.len());
    for (label, pattern, category) in defs {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()?;
        passes.push(RewritePass {
            label,
            pattern,
            category,
        });
    }
    Ok(passes)
}

/// Cache directory name for a page: its host lower-cased, `www.` stripped,
/// dots replaced. The same host always maps to the same directory.
fn derive_host_dir(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => {
                let lowered = host.to_lowercase();
                let trimmed = lowered.strip_prefix("www.").unwrap_or(&lowered);
                trimmed.replace('.', "_")
            }
            None => "default".to_string(),
        },
        Err(_) => "default".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::MockFetch;
    use tempfile::tempdir;

    #[test]
    fn host_dir_is_deterministic_and_sanitized() {
        assert_eq!(derive_host_dir("https://www.Example.COM/page"), "example_com");
        assert_eq!(derive_host_dir("https://news.ycombinator.com"), "news_ycombinator_com");
        assert_eq!(derive_host_dir("::not a url::"), "default");
    }

    #[tokio::test]
    async fn cached_snapshot_short_circuits_without_network() {
        let dir = tempdir().unwrap();
        let cache_root = dir.path().join("example_com");
        fs::create_dir_all(&cache_root).unwrap();
        fs::write(cache_root.join("index.html"), "<html></html>").unwrap();

        // No expectations: any fetch would panic the mock.
        let archiver = PageArchiver::new(MockFetch::new(), dir.path()).unwrap();
        let summary = archiver.fetch("https://example.com").await.unwrap();

        assert!(summary.from_cache);
        assert_eq!(summary.index_path, cache_root.join("index.html"));
        assert_eq!(summary.downloaded, 0);
    }

    #[tokio::test]
    async fn root_fetch_failure_surfaces_to_the_caller() {
        let dir = tempdir().unwrap();
        let mut fetcher = MockFetch::new();
        fetcher.expect_fetch_text().returning(|url| {
            Err(ArchiveError::UpstreamStatus {
                url: url.to_string(),
                status: 500,
            })
        });

        let archiver = PageArchiver::new(fetcher, dir.path()).unwrap();
        let err = archiver.fetch("https://example.com").await.unwrap_err();
        assert!(matches!(err, ArchiveError::UpstreamStatus { status: 500, .. }));
    }

    #[tokio::test]
    async fn blank_root_document_is_fatal() {
        let dir = tempdir().unwrap();
        let mut fetcher = MockFetch::new();
        fetcher
            .expect_fetch_text()
            .returning(|_| Ok("   \n  ".to_string()));

        let archiver = PageArchiver::new(fetcher, dir.path()).unwrap();
        let err = archiver.fetch("https://example.com").await.unwrap_err();
        assert!(matches!(err, ArchiveError::EmptyDocument { .. }));
    }

    #[tokio::test]
    async fn cancelled_token_aborts_before_the_next_download() {
        let dir = tempdir().unwrap();
        let mut fetcher = MockFetch::new();
        fetcher.expect_fetch_text().returning(|_| {
            Ok(r#"<html><head></head><body><img src="/a.png"></body></html>"#.to_string())
        });

        let token = CancellationToken::new();
        token.cancel();
        let archiver = PageArchiver::new(fetcher, dir.path())
            .unwrap()
            .with_cancellation(token);

        let err = archiver.fetch("https://example.com").await.unwrap_err();
        assert!(matches!(err, ArchiveError::Cancelled { .. }));
    }
}

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use url::Url;

/// Outcome of resolving a reference against the page's base URL.
///
/// Resolution fails open: a reference that cannot be resolved is carried
/// verbatim so one bad link never aborts the archive run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The reference resolved to an absolute URL.
    Absolute(String),
    /// The base or reference did not parse; the original text is kept.
    FailedOpen(String),
}

/// Classification of a raw reference found in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    /// Inline data or local-only references that must never reach the downloader.
    Skip,
    /// A reference worth resolving and fetching.
    Fetchable,
}

/// Probe order matters: `.woff2` must be tested before `.woff`, and `.jpeg`
/// maps onto the `.jpg` extension.
const EXTENSION_PROBES: &[(&str, &str)] = &[
    (".css", ".css"),
    (".js", ".js"),
    (".png", ".png"),
    (".jpg", ".jpg"),
    (".jpeg", ".jpg"),
    (".gif", ".gif"),
    (".svg", ".svg"),
    (".woff2", ".woff2"),
    (".woff", ".woff"),
];

const MAX_FILENAME_LEN: usize = 200;

/// Resolves possibly-relative resource references against one base URL.
#[derive(Debug, Clone)]
pub struct UrlResolver {
    base: Option<Url>,
    scheme: String,
}

impl UrlResolver {
    /// Never fails: an unparseable base degrades every relative resolution
    /// to [`Resolution::FailedOpen`] instead of erroring.
    pub fn new(base_url: &str) -> Self {
        let base = Url::parse(base_url).ok();
        let scheme = base
            .as_ref()
            .map(|u| u.scheme().to_string())
            .unwrap_or_else(|| "https".to_string());
        Self { base, scheme }
    }

    pub fn resolve(&self, reference: &str) -> Resolution {
        let reference = reference.trim();

        if reference.starts_with("http://") || reference.starts_with("https://") {
            return Resolution::Absolute(reference.to_string());
        }

        // Protocol-relative: inherit the base scheme.
        if reference.starts_with("//") {
            return Resolution::Absolute(format!("{}:{}", self.scheme, reference));
        }

        match &self.base {
            Some(base) => match base.join(reference) {
                Ok(joined) => Resolution::Absolute(joined.to_string()),
                Err(_) => Resolution::FailedOpen(reference.to_string()),
            },
            None => Resolution::FailedOpen(reference.to_string()),
        }
    }

    /// Skip policy: inline payloads, fragments, local files, and blank
    /// references stay untouched in the document.
    pub fn classify(reference: &str) -> RefKind {
        let reference = reference.trim();
        if reference.is_empty()
            || reference.starts_with("data:")
            || reference.starts_with("blob:")
            || reference.starts_with('#')
            || reference.starts_with("file://")
        {
            RefKind::Skip
        } else {
            RefKind::Fetchable
        }
    }

    /// Derives a filesystem-safe cache filename from a resource URL.
    pub fn filename_for(url: &str) -> String {
        let path = url.split('?').next().unwrap_or_default();
        let path = path.split('#').next().unwrap_or_default();

        let last_segment = path.rsplit('/').next().unwrap_or_default();

        let filename = if last_segment.is_empty() || !last_segment.contains('.') {
            Self::synthesized_filename(url)
        } else {
            last_segment.to_string()
        };

        let sanitized: String = filename
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        Self::truncate_preserving_extension(sanitized)
    }

    fn synthesized_filename(url: &str) -> String {
        let mut hasher = DefaultHasher::new();
        url.hash(&mut hasher);
        let mut name = format!("resource_{}", hasher.finish());

        for (probe, ext) in EXTENSION_PROBES {
            if url.contains(probe) {
                name.push_str(ext);
                return name;
            }
        }
        name.push_str(".bin");
        name
    }

    fn truncate_preserving_extension(mut filename: String) -> String {
        if filename.len() <= MAX_FILENAME_LEN {
            return filename;
        }
        match filename.rfind('.') {
            Some(dot) if dot > 0 => {
                let ext = filename[dot..].to_string();
                let keep = MAX_FILENAME_LEN.saturating_sub(ext.len());
                filename.truncate(keep);
                filename.push_str(&ext);
            }
            _ => filename.truncate(MAX_FILENAME_LEN),
        }
        filename
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_against_document_directory() {
        let resolver = UrlResolver::new("https://a.com/dir/page.html");
        assert_eq!(
            resolver.resolve("img/x.png"),
            Resolution::Absolute("https://a.com/dir/img/x.png".to_string())
        );
    }

    #[test]
    fn resolves_protocol_relative_with_base_scheme() {
        let resolver = UrlResolver::new("https://a.com/p");
        assert_eq!(
            resolver.resolve("//cdn.com/y.js"),
            Resolution::Absolute("https://cdn.com/y.js".to_string())
        );
    }

    #[test]
    fn absolute_references_pass_through_unchanged() {
        let resolver = UrlResolver::new("https://a.com/p");
        assert_eq!(
            resolver.resolve("https://b.com/z"),
            Resolution::Absolute("https://b.com/z".to_string())
        );
    }

    #[test]
    fn malformed_base_fails_open() {
        let resolver = UrlResolver::new("not a url at all");
        assert_eq!(
            resolver.resolve("img/x.png"),
            Resolution::FailedOpen("img/x.png".to_string())
        );
        // Absolute references still resolve even without a usable base.
        assert_eq!(
            resolver.resolve("https://b.com/z"),
            Resolution::Absolute("https://b.com/z".to_string())
        );
    }

    #[test]
    fn skip_policy_covers_inline_and_local_references() {
        assert_eq!(UrlResolver::classify("data:image/png;base64,AAAA"), RefKind::Skip);
        assert_eq!(UrlResolver::classify("blob:https://a.com/uuid"), RefKind::Skip);
        assert_eq!(UrlResolver::classify("#section"), RefKind::Skip);
        assert_eq!(UrlResolver::classify("file:///etc/hosts"), RefKind::Skip);
        assert_eq!(UrlResolver::classify(""), RefKind::Skip);
        assert_eq!(UrlResolver::classify("   "), RefKind::Skip);
        assert_eq!(UrlResolver::classify("/style.css"), RefKind::Fetchable);
    }

    #[test]
    fn filename_strips_query_and_fragment() {
        assert_eq!(
            UrlResolver::filename_for("https://a.com/assets/app.js?v=1.2#top"),
            "app.js"
        );
    }

    #[test]
    fn filename_sanitizes_invalid_characters() {
        assert_eq!(
            UrlResolver::filename_for("https://a.com/we ird%name.css"),
            "we_ird_name.css"
        );
    }

    #[test]
    fn extensionless_urls_get_synthesized_names() {
        let name = UrlResolver::filename_for("https://a.com/fonts/loader?family=Roboto");
        assert!(name.starts_with("resource_"));
        assert!(name.ends_with(".bin"));

        let css = UrlResolver::filename_for("https://a.com/style.css?inline");
        assert_eq!(css, "style.css");

        let woff2 = UrlResolver::filename_for("https://a.com/deliver.woff2/");
        assert!(woff2.ends_with(".woff2"));
    }

    #[test]
    fn long_filenames_keep_their_extension() {
        let long = format!("https://a.com/{}.css", "x".repeat(300));
        let name = UrlResolver::filename_for(&long);
        assert_eq!(name.len(), 200);
        assert!(name.ends_with(".css"));
    }
}

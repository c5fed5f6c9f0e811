//! Request path → manifest entry.
//!
//! # Rules (tried in order, first match wins)
//! 1. `Exact`: the path itself.
//! 2. `TrailingSlash`: `/about/` → `/about`.
//! 3. `DirectoryIndex`: `/about/` → `/about/index.html`, `/about` → `/about/index.html`.
//! 4. `HtmlExtension`: final segment without a `.` → `path + ".html"`.
//!
//! # Design Decisions
//! - Each rule is a pure function of `(path, manifest)`
//! - The order is a single constant, so precedence is one place to read and test
//! - Rule 4 only inspects the final segment: `/v1.2/page` still gets the
//!   `.html` fallback, `/page.backup` does not. Changing that changes which
//!   URLs resolve, so it stays as is.

use std::fmt;

use crate::manifest::{Manifest, ManifestEntry};

/// One equivalence rule between a request path and a manifest key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathRule {
    Exact,
    TrailingSlash,
    DirectoryIndex,
    HtmlExtension,
}

impl PathRule {
    /// Evaluation order.
    pub const ORDER: [PathRule; 4] = [
        PathRule::Exact,
        PathRule::TrailingSlash,
        PathRule::DirectoryIndex,
        PathRule::HtmlExtension,
    ];

    /// Manifest key this rule would look up for `path`, if the rule applies.
    pub fn candidate(self, path: &str) -> Option<String> {
        match self {
            PathRule::Exact => Some(path.to_string()),
            PathRule::TrailingSlash => {
                if path.len() > 1 && path.ends_with('/') {
                    Some(path[..path.len() - 1].to_string())
                } else {
                    None
                }
            }
            PathRule::DirectoryIndex => {
                if path.ends_with('/') {
                    Some(format!("{}index.html", path))
                } else {
                    Some(format!("{}/index.html", path))
                }
            }
            PathRule::HtmlExtension => {
                let last_segment = path.rsplit('/').next().unwrap_or_default();
                if last_segment.contains('.') {
                    None
                } else {
                    Some(format!("{}.html", path))
                }
            }
        }
    }

    /// Apply this rule alone.
    pub fn apply<'m>(self, path: &str, manifest: &'m Manifest) -> Option<&'m ManifestEntry> {
        self.candidate(path).and_then(|key| manifest.get(&key))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PathRule::Exact => "exact",
            PathRule::TrailingSlash => "trailing_slash",
            PathRule::DirectoryIndex => "directory_index",
            PathRule::HtmlExtension => "html_extension",
        }
    }
}

impl fmt::Display for PathRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful resolution: the entry and the rule that found it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution<'m> {
    pub rule: PathRule,
    pub entry: &'m ManifestEntry,
}

/// Resolve `path` against `manifest`, reporting which rule matched.
pub fn resolve_with_rule<'m>(path: &str, manifest: &'m Manifest) -> Option<Resolution<'m>> {
    PathRule::ORDER.iter().find_map(|&rule| {
        rule.apply(path, manifest)
            .map(|entry| Resolution { rule, entry })
    })
}

/// Resolve `path` against `manifest`.
pub fn resolve<'m>(path: &str, manifest: &'m Manifest) -> Option<&'m ManifestEntry> {
    resolve_with_rule(path, manifest).map(|r| r.entry)
}

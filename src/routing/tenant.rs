//! Hostname → build id.
//!
//! # Rules (first match wins)
//! 1. Strip the port, lowercase.
//! 2. First label starts with the preview prefix (`pr-<token>`) → that label.
//! 3. Production domain itself, or `www.` + production domain → `main`.
//! 4. Exactly one label in front of the production domain → that label.
//! 5. Anything else → `main`.
//!
//! # Design Decisions
//! - Total: every host maps to some build id, failures surface later as
//!   "build not found"
//! - Immutable after construction; swapped wholesale on config reload

/// Build id of the production site.
pub const MAIN_BUILD: &str = "main";

/// Label prefix identifying preview builds.
pub const PREVIEW_PREFIX: &str = "pr-";

/// Derives build ids from request hostnames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantResolver {
    production_domain: String,
}

impl TenantResolver {
    /// The domain is normalized to lowercase for case-insensitive matching.
    pub fn new(production_domain: impl Into<String>) -> Self {
        Self {
            production_domain: production_domain.into().trim_end_matches('.').to_lowercase(),
        }
    }

    pub fn production_domain(&self) -> &str {
        &self.production_domain
    }

    /// Build id for `hostname`. Never fails.
    pub fn resolve(&self, hostname: &str) -> String {
        let host = strip_port(hostname).trim_end_matches('.').to_lowercase();
        let first_label = host.split('.').next().unwrap_or_default();

        if is_preview_label(first_label) {
            return first_label.to_string();
        }

        if host == self.production_domain {
            return MAIN_BUILD.to_string();
        }

        if let Some(label) = self.subdomain_label(&host) {
            if label != "www" {
                return label.to_string();
            }
        }

        MAIN_BUILD.to_string()
    }

    /// `label` when `host` is exactly `label.<production domain>`.
    fn subdomain_label<'a>(&self, host: &'a str) -> Option<&'a str> {
        if self.production_domain.is_empty() {
            return None;
        }
        let label = host
            .strip_suffix(self.production_domain.as_str())?
            .strip_suffix('.')?;
        (!label.is_empty() && !label.contains('.')).then_some(label)
    }
}

fn is_preview_label(label: &str) -> bool {
    label.len() > PREVIEW_PREFIX.len() && label.starts_with(PREVIEW_PREFIX)
}

/// Drop a `:port` suffix, keeping bracketed IPv6 literals intact.
fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> TenantResolver {
        TenantResolver::new("site.example")
    }

    #[test]
    fn test_preview_hosts() {
        let r = resolver();
        assert_eq!(r.resolve("pr-7.site.example"), "pr-7");
        assert_eq!(r.resolve("pr-142.site.example"), "pr-142");
        // Preview prefix wins on any domain
        assert_eq!(r.resolve("pr-9.workers.dev"), "pr-9");
        assert_eq!(r.resolve("pr-abc"), "pr-abc");
    }

    #[test]
    fn test_production_hosts() {
        let r = resolver();
        assert_eq!(r.resolve("site.example"), "main");
        assert_eq!(r.resolve("www.site.example"), "main");
        assert_eq!(r.resolve("WWW.Site.Example"), "main");
        assert_eq!(r.resolve("site.example."), "main");
    }

    #[test]
    fn test_ports_are_stripped() {
        let r = resolver();
        assert_eq!(r.resolve("pr-7.site.example:8443"), "pr-7");
        assert_eq!(r.resolve("site.example:8080"), "main");
        assert_eq!(r.resolve("localhost:3000"), "main");
        assert_eq!(r.resolve("[::1]:8080"), "main");
    }

    #[test]
    fn test_other_labels_under_production_domain() {
        let r = resolver();
        assert_eq!(r.resolve("nonexistent-build.site.example"), "nonexistent-build");
        assert_eq!(r.resolve("Staging.site.example"), "staging");
        // Deeper nesting is not a build
        assert_eq!(r.resolve("a.b.site.example"), "main");
    }

    #[test]
    fn test_unrelated_hosts_collapse_to_main() {
        let r = resolver();
        assert_eq!(r.resolve("localhost"), "main");
        assert_eq!(r.resolve("other.example"), "main");
        assert_eq!(r.resolve("notsite.example"), "main");
        assert_eq!(r.resolve(""), "main");
        // Bare prefix is not a preview id
        assert_eq!(r.resolve("pr-.other.example"), "main");
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("example.com:80"), "example.com");
        assert_eq!(strip_port("example.com"), "example.com");
        assert_eq!(strip_port("[2001:db8::1]:443"), "[2001:db8::1]");
        assert_eq!(strip_port("[2001:db8::1]"), "[2001:db8::1]");
    }
}

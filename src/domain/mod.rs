//! Site URL and domain helpers.
//!
//! Key functions:
//! - `canonical_site_url()` - Strips trailing slashes from a registry URL
//! - `extract_host()` - Host component of a site URL, used as the snapshot domain
//! - `is_excluded_site()` - Detects local and staging installs

use crate::config::EXCLUDED_SITE_PATTERNS;

/// Canonical form of a site URL: surrounding whitespace and trailing slashes removed.
pub fn canonical_site_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Extracts the host component of a site URL.
///
/// Returns `None` if the URL cannot be parsed or has no host (for example a
/// bare `example.com` without a scheme).
pub fn extract_host(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .host_str()
        .filter(|host| !host.is_empty())
        .map(str::to_string)
}

/// Returns `true` if the URL contains one of the exclusion patterns, ignoring case.
pub fn is_excluded_site(url: &str) -> bool {
    let lowered = url.to_lowercase();
    EXCLUDED_SITE_PATTERNS
        .iter()
        .any(|pattern| lowered.contains(pattern))
}

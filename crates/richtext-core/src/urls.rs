//! URL policy shared by attribute cleaning and Markdown link/image parsing.

use url::Url;

use crate::allowlist::Allowlist;

// Browsers skip leading C0 controls and spaces, and drop tab and newline
// characters anywhere, so "\u{1}java\tscript:" is read as "javascript:".
fn normalize(url: &str) -> String {
    url.trim_start_matches(|c: char| c <= '\u{20}')
        .trim_end()
        .chars()
        .filter(|c| !matches!(c, '\t' | '\n' | '\r'))
        .collect::<String>()
        .to_ascii_lowercase()
}

// "/x" is root-relative; "//host" and "/\\host" both name another host.
fn is_relative_path(normalized: &str) -> bool {
    if let Some(rest) = normalized.strip_prefix('/') {
        return !rest.starts_with(['/', '\\']);
    }
    normalized.starts_with("./") || normalized.starts_with("../")
}

fn is_image_data_url(normalized: &str, allowlist: &Allowlist) -> bool {
    allowlist
        .image_data_prefixes()
        .iter()
        .any(|prefix| normalized.starts_with(prefix.as_str()))
}

pub fn is_url_safe(url: &str, allowlist: &Allowlist) -> bool {
    let normalized = normalize(url);
    for scheme in allowlist.dangerous_schemes() {
        if !normalized.starts_with(scheme.as_str()) {
            continue;
        }
        if scheme == "data:" && is_image_data_url(&normalized, allowlist) {
            continue;
        }
        return false;
    }
    true
}

pub fn sanitize_url(url: &str, allowlist: &Allowlist) -> Option<String> {
    is_url_safe(url, allowlist).then(|| url.to_string())
}

pub fn sanitize_image_src(src: &str, allowlist: &Allowlist) -> Option<String> {
    let trimmed = src.trim();
    if trimmed.is_empty() {
        return None;
    }

    let normalized = normalize(trimmed);
    if is_relative_path(&normalized) {
        return Some(src.to_string());
    }

    if normalized.starts_with("data:") {
        return is_image_data_url(&normalized, allowlist).then(|| src.to_string());
    }

    let parsed = Url::parse(trimmed).ok()?;
    let accepted = match parsed.scheme() {
        "https" => true,
        "http" => matches!(parsed.host_str(), Some("localhost") | Some("127.0.0.1")),
        _ => false,
    };
    accepted.then(|| src.to_string())
}

use crate::UrlError;
use url::Url;

/// Schemes the crawler is able to fetch
const CRAWLABLE_SCHEMES: &[&str] = &["http", "https"];

/// Link prefixes that never point at a crawlable page
const SKIPPED_PREFIXES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Normalizes a URL according to Crawlspace's normalization rules
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything that is not http or https
/// 3. Require a host (parsing already lowercases it and drops default ports)
/// 4. Resolve dot segments (done by the parser); empty path becomes /
/// 5. Remove fragment (everything after #)
/// 6. Sort query parameters by key, keeping the order of repeated keys
/// 7. Remove empty query string (trailing ?)
///
/// # Examples
///
/// ```
/// use crawlspace::url::normalize_url;
///
/// let url = normalize_url("HTTP://Example.COM:80/a/../page?b=2&a=1#top").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/page?a=1&b=2");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(&mut url)?;
    Ok(url)
}

/// Resolves a link href against the page it was found on and normalizes it
///
/// Returns None if the link should not be followed:
/// - javascript:, mailto:, tel: and data: links
/// - fragment-only links (same page)
/// - anything that fails to resolve or normalize
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if SKIPPED_PREFIXES.iter().any(|prefix| lower.starts_with(prefix)) {
        return None;
    }

    let mut url = base_url.join(href).ok()?;
    normalize_parsed(&mut url).ok()?;
    Some(url)
}

fn normalize_parsed(url: &mut Url) -> Result<(), UrlError> {
    if !CRAWLABLE_SCHEMES.contains(&url.scheme()) {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    if url.path().is_empty() {
        url.set_path("/");
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let params = sorted_query_params(url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut()
                .clear()
                .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
    }

    Ok(())
}

/// Returns query parameters sorted by key; the sort is stable so repeated keys keep their order
fn sorted_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));

    params
}

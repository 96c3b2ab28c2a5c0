//! Raw HTTP response handed from a request to the crawler
//!
//! The crawler never interprets the response beyond its status code and the
//! decoded body text; everything else is passed through to the callbacks.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};

/// A fetched response, fully buffered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Final URL after redirects
    pub url: String,

    /// HTTP status code
    pub status_code: u16,

    /// Response headers
    pub headers: HeaderMap,

    /// Undecoded response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response with no headers
    pub fn new(url: impl Into<String>, status_code: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            status_code,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Adds a header; values that are not valid header text are ignored
    pub fn with_header(mut self, name: HeaderName, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    /// The Content-Type header value, if present and readable
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// The charset parameter of the Content-Type header, lowercased
    pub fn charset(&self) -> Option<String> {
        self.content_type()?
            .split(';')
            .skip(1)
            .filter_map(|param| param.split_once('='))
            .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
            .map(|(_, value)| value.trim().trim_matches('"').to_ascii_lowercase())
    }

    /// Returns true if the Content-Type declares an HTML document
    pub fn is_html(&self) -> bool {
        self.content_type().map_or(false, |ct| {
            let ct = ct.to_ascii_lowercase();
            ct.contains("text/html") || ct.contains("application/xhtml+xml")
        })
    }

    /// Decodes the body using the declared charset
    pub fn text(&self) -> String {
        decode_body(&self.body, self.charset().as_deref())
    }
}

/// Decodes a response body to text
///
/// UTF-8 is the default. ISO-8859-1 maps each byte to the code point of the same
/// value. Unknown charsets fall back to lossy UTF-8.
pub fn decode_body(body: &[u8], charset: Option<&str>) -> String {
    match charset {
        Some("iso-8859-1" | "latin1" | "latin-1" | "l1" | "iso_8859-1") => {
            body.iter().map(|&b| char::from(b)).collect()
        }
        _ => {
            let body = body.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(body);
            String::from_utf8_lossy(body).into_owned()
        }
    }
}

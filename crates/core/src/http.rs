//! Request and response model shared by every crate in the workspace.
//!
//! These are deliberately plain value types: the engine never holds a live
//! network stream. Bodies are [`Bytes`], so storing a response in a cache
//! and returning it to the caller are independent cheap clones rather than
//! a consumed-once stream.

use std::collections::HashMap;

use bytes::Bytes;
use url::Url;

/// How a request was initiated.
///
/// Top-level navigations get the document strategy even when the URL has
/// no recognizable extension (e.g. `GET /`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// Top-level document navigation.
    Navigate,
    /// Everything else: images, scripts, styles, fonts, data requests.
    #[default]
    Subresource,
}

/// An intercepted request.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method, uppercase.
    pub method: String,

    /// Absolute target URL.
    pub url: Url,

    /// Navigation mode.
    pub mode: RequestMode,
}

impl Request {
    /// A plain subresource GET.
    pub fn get(url: Url) -> Self {
        Self { method: "GET".to_string(), url, mode: RequestMode::Subresource }
    }

    /// A top-level navigation GET.
    pub fn navigate(url: Url) -> Self {
        Self { method: "GET".to_string(), url, mode: RequestMode::Navigate }
    }

    /// Whether this is a top-level navigation.
    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Cache identity for this request.
    ///
    /// The fragment never reaches the network, so `/page.html#top` and
    /// `/page.html` share one entry.
    pub fn cache_key(&self) -> CacheKey {
        let mut url = self.url.clone();
        url.set_fragment(None);
        CacheKey::new(&self.method, url.as_str())
    }
}

/// A response as seen by the engine: status, headers, body.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,

    /// Response headers.
    pub headers: HashMap<String, String>,

    /// Response body bytes.
    pub body: Bytes,
}

impl Response {
    /// Create a response with the given status and body and no headers.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, headers: HashMap::new(), body: body.into() }
    }

    /// Whether this response may be written to a cache store.
    ///
    /// Only plain 200 responses are ever cached; redirects, partial
    /// content, and errors are returned to callers but never stored.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200
    }
}

/// Cache entry identity: method plus origin-qualified URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// HTTP method, uppercase.
    pub method: String,

    /// Full URL string, origin included.
    pub url: String,
}

impl CacheKey {
    /// Create a key from a method and an absolute URL string.
    pub fn new(method: &str, url: &str) -> Self {
        Self { method: method.to_uppercase(), url: url.to_string() }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

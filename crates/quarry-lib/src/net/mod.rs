//! Network collaborators: raw byte fetching and URL normalization.

mod http;
mod resolver;

pub use http::HttpFetcher;
pub use resolver::{AdInterstitialRule, RuleNormalizer, ShortenerRule, UrlRule};

use futures::future::BoxFuture;
use futures::stream::BoxStream;

/// Used when a URL has no usable last path segment.
pub const DEFAULT_FILE_NAME: &str = "mod.zip";

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP error {status}: {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("invalid URL {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type ByteStream = BoxStream<'static, Result<Vec<u8>, TransportError>>;

/// Source of artifact bytes.
pub trait ByteFetcher: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<ByteStream, TransportError>>;
}

/// Maps an artifact URL to the URL that actually serves the bytes.
pub trait UrlNormalizer: Send + Sync {
    fn resolve<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, TransportError>>;
}

/// Normalizer that leaves every URL untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl UrlNormalizer for Passthrough {
    fn resolve<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, TransportError>> {
        Box::pin(async move { Ok(url.to_string()) })
    }
}

/// Last path segment of `url`, percent-decoded, or [`DEFAULT_FILE_NAME`].
pub fn file_name_from_url(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .map(|segment| match urlencoding::decode(&segment) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => segment,
        })
        .filter(|name| !name.is_empty() && !name.contains(['/', '\\']) && name != "..")
        .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string())
}

use super::{TransportError, UrlNormalizer};
use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::collections::HashSet;

static ADFLY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://(adf\.ly)/.*").expect("valid adf.ly pattern"));
static BITLY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://(bit\.ly)/.*").expect("valid bit.ly pattern"));
static INTERSTITIAL_TARGET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"var url = '(http[^']*)';").expect("valid target pattern"));

const DEFAULT_MAX_HOPS: usize = 16;

/// One indirection-bypass step.
pub trait UrlRule: Send + Sync {
    fn name(&self) -> &str;

    fn matches(&self, url: &str) -> bool;

    /// Returns the next URL, or `url` itself when nothing could be resolved.
    fn apply<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, TransportError>>;
}

/// Ad-interstitial pages that embed the destination in a script variable.
pub struct AdInterstitialRule {
    client: Client,
    pattern: Regex,
}

impl AdInterstitialRule {
    pub fn new(client: Client, pattern: Regex) -> Self {
        Self { client, pattern }
    }

    pub fn adfly(client: Client) -> Self {
        Self::new(client, ADFLY_PATTERN.clone())
    }
}

impl UrlRule for AdInterstitialRule {
    fn name(&self) -> &str {
        "interstitial"
    }

    fn matches(&self, url: &str) -> bool {
        self.pattern.is_match(url)
    }

    fn apply<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, TransportError>> {
        Box::pin(async move {
            let request_error = |source| TransportError::Request {
                url: url.to_string(),
                source,
            };
            let body = self
                .client
                .get(url)
                .send()
                .await
                .map_err(request_error)?
                .text()
                .await
                .map_err(request_error)?;

            match INTERSTITIAL_TARGET.captures(&body).and_then(|c| c.get(1)) {
                Some(target) => Ok(target.as_str().to_string()),
                None => {
                    log::warn!("No destination found on interstitial page {}", url);
                    Ok(url.to_string())
                }
            }
        })
    }
}

/// Link shorteners that answer a `HEAD` with a redirect.
pub struct ShortenerRule {
    client: Client,
    pattern: Regex,
}

impl ShortenerRule {
    /// `client` must not follow redirects; see [`ShortenerRule::no_redirect_client`].
    pub fn new(client: Client, pattern: Regex) -> Self {
        Self { client, pattern }
    }

    pub fn no_redirect_client() -> Result<Client, TransportError> {
        Client::builder()
            .redirect(Policy::none())
            .build()
            .map_err(TransportError::Client)
    }

    pub fn bitly() -> Result<Self, TransportError> {
        Ok(Self::new(Self::no_redirect_client()?, BITLY_PATTERN.clone()))
    }
}

impl UrlRule for ShortenerRule {
    fn name(&self) -> &str {
        "shortener"
    }

    fn matches(&self, url: &str) -> bool {
        self.pattern.is_match(url)
    }

    fn apply<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, TransportError>> {
        Box::pin(async move {
            let response = self
                .client
                .head(url)
                .send()
                .await
                .map_err(|source| TransportError::Request {
                    url: url.to_string(),
                    source,
                })?;

            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            Ok(location.unwrap_or_else(|| url.to_string()))
        })
    }
}

/// Applies [`UrlRule`]s until none of them changes the URL.
///
/// The rule scan restarts from the first rule after every change. A URL seen
/// before, or more than `max_hops` changes, ends the loop with the current URL.
pub struct RuleNormalizer {
    rules: Vec<Box<dyn UrlRule>>,
    max_hops: usize,
}

impl RuleNormalizer {
    pub fn new(rules: Vec<Box<dyn UrlRule>>) -> Self {
        Self {
            rules,
            max_hops: DEFAULT_MAX_HOPS,
        }
    }

    /// The interstitial and shortener bypasses for adf.ly and bit.ly.
    pub fn with_default_rules(client: Client) -> Result<Self, TransportError> {
        Ok(Self::new(vec![
            Box::new(AdInterstitialRule::adfly(client)),
            Box::new(ShortenerRule::bitly()?),
        ]))
    }

    pub fn max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    /// Apply the first rule that moves `url` elsewhere. A rule that leaves
    /// the URL unchanged passes it on; a transport failure aborts resolution.
    async fn step(&self, url: &str) -> Result<Option<String>, TransportError> {
        for rule in self.rules.iter().filter(|r| r.matches(url)) {
            let next = rule.apply(url).await.inspect_err(|e| {
                log::warn!("{} rule could not resolve {}: {}", rule.name(), url, e)
            })?;
            if next != url && !next.is_empty() {
                log::debug!("{} rule resolved {} -> {}", rule.name(), url, next);
                return Ok(Some(next));
            }
        }
        Ok(None)
    }
}

impl UrlNormalizer for RuleNormalizer {
    fn resolve<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, TransportError>> {
        Box::pin(async move {
            let mut current = url.to_string();
            let mut seen = HashSet::from([current.clone()]);

            for _ in 0..self.max_hops {
                let Some(next) = self.step(&current).await? else {
                    return Ok(current);
                };
                if !seen.insert(next.clone()) {
                    log::warn!("URL resolution loops back to {}, stopping", next);
                    return Ok(current);
                }
                current = next;
            }

            log::warn!("URL resolution for {} exceeded {} hops", url, self.max_hops);
            Ok(current)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Maps fixed URLs to fixed targets, counting calls.
    struct TableRule {
        from: &'static str,
        to: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl UrlRule for TableRule {
        fn name(&self) -> &str {
            "table"
        }

        fn matches(&self, url: &str) -> bool {
            url == self.from
        }

        fn apply<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<String, TransportError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move { Ok(self.to.to_string()) })
        }
    }

    fn rule(from: &'static str, to: &'static str) -> (Box<dyn UrlRule>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Box::new(TableRule {
                from,
                to,
                calls: calls.clone(),
            }),
            calls,
        )
    }

    #[tokio::test]
    async fn chains_rules_until_stable() {
        let (a, _) = rule("http://a", "http://b");
        let (b, _) = rule("http://b", "http://c");
        let normalizer = RuleNormalizer::new(vec![b, a]);
        assert_eq!(normalizer.resolve("http://a").await.unwrap(), "http://c");
    }

    #[tokio::test]
    async fn unmatched_url_is_untouched() {
        let (a, calls) = rule("http://a", "http://b");
        let normalizer = RuleNormalizer::new(vec![a]);
        assert_eq!(normalizer.resolve("http://z").await.unwrap(), "http://z");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cycle_terminates() {
        let (a, _) = rule("http://a", "http://b");
        let (b, _) = rule("http://b", "http://a");
        let normalizer = RuleNormalizer::new(vec![a, b]);
        assert_eq!(normalizer.resolve("http://a").await.unwrap(), "http://b");
    }

    #[tokio::test]
    async fn shortener_reads_location_header() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/abc"))
            .respond_with(
                ResponseTemplate::new(301).insert_header("Location", "https://files.example/mod.zip"),
            )
            .mount(&server)
            .await;

        let shortener = ShortenerRule::new(
            ShortenerRule::no_redirect_client().unwrap(),
            Regex::new(r"^http://127\.0\.0\.1:\d+/abc$").unwrap(),
        );
        let normalizer = RuleNormalizer::new(vec![Box::new(shortener)]);
        let resolved = normalizer
            .resolve(&format!("{}/abc", server.uri()))
            .await
            .unwrap();
        assert_eq!(resolved, "https://files.example/mod.zip");
    }

    #[tokio::test]
    async fn interstitial_scrapes_destination() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ad"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<script>var zzz = 1; var url = 'http://files.example/real.zip';</script>",
            ))
            .mount(&server)
            .await;

        let interstitial = AdInterstitialRule::new(
            Client::new(),
            Regex::new(r"^http://127\.0\.0\.1:\d+/ad$").unwrap(),
        );
        let normalizer = RuleNormalizer::new(vec![Box::new(interstitial)]);
        let resolved = normalizer
            .resolve(&format!("{}/ad", server.uri()))
            .await
            .unwrap();
        assert_eq!(resolved, "http://files.example/real.zip");
    }

    struct FailingRule;

    impl UrlRule for FailingRule {
        fn name(&self) -> &str {
            "failing"
        }

        fn matches(&self, _url: &str) -> bool {
            true
        }

        fn apply<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<String, TransportError>> {
            Box::pin(async move {
                Err(TransportError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "network down",
                )))
            })
        }
    }

    #[tokio::test]
    async fn transport_failure_propagates() {
        let normalizer = RuleNormalizer::new(vec![Box::new(FailingRule)]);
        let err = normalizer.resolve("http://adf.ly/xyz").await.unwrap_err();
        assert!(matches!(err, TransportError::Io(_)));
    }

    #[tokio::test]
    async fn unreachable_interstitial_is_an_error() {
        let interstitial = AdInterstitialRule::new(
            Client::new(),
            Regex::new(r"^http://127\.0\.0\.1:1/").unwrap(),
        );
        let normalizer = RuleNormalizer::new(vec![Box::new(interstitial)]);
        assert!(normalizer.resolve("http://127.0.0.1:1/gone").await.is_err());
    }

    #[tokio::test]
    async fn interstitial_without_destination_passes_url_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ad"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>no link here</html>"))
            .mount(&server)
            .await;

        let interstitial = AdInterstitialRule::new(
            Client::new(),
            Regex::new(r"^http://127\.0\.0\.1:\d+/ad$").unwrap(),
        );
        let normalizer = RuleNormalizer::new(vec![Box::new(interstitial)]);
        let url = format!("{}/ad", server.uri());
        assert_eq!(normalizer.resolve(&url).await.unwrap(), url);
    }

    #[tokio::test]
    async fn rule_returning_same_url_passes_through() {
        let (a, calls) = rule("http://a", "http://a");
        let normalizer = RuleNormalizer::new(vec![a]);
        assert_eq!(normalizer.resolve("http://a").await.unwrap(), "http://a");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn default_patterns_match_hosts() {
        assert!(ADFLY_PATTERN.is_match("http://adf.ly/1x2y"));
        assert!(BITLY_PATTERN.is_match("https://bit.ly/abc"));
        assert!(!BITLY_PATTERN.is_match("http://bitxly/abc"));
    }
}

use super::{ByteFetcher, ByteStream, TransportError};
use futures::future::BoxFuture;
use futures::StreamExt;
use reqwest::Client;
use std::time::Duration;

/// [`ByteFetcher`] backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn with_timeout(timeout: Duration, user_agent: &str) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(TransportError::Client)?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl ByteFetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<ByteStream, TransportError>> {
        Box::pin(async move {
            log::debug!("GET {}", url);
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|source| TransportError::Request {
                    url: url.to_string(),
                    source,
                })?;

            if !response.status().is_success() {
                return Err(TransportError::Status {
                    url: url.to_string(),
                    status: response.status(),
                });
            }

            log::debug!("Download size: {:?} bytes", response.content_length());

            let owned_url = url.to_string();
            let stream = response
                .bytes_stream()
                .map(move |chunk| {
                    chunk
                        .map(|bytes| bytes.to_vec())
                        .map_err(|source| TransportError::Request {
                            url: owned_url.clone(),
                            source,
                        })
                })
                .boxed();
            Ok(stream)
        })
    }
}

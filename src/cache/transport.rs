use crate::error::Result;
use async_trait::async_trait;

/// Raw response from a blob fetch
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl TransportResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Unified interface for fetching blobs over the network.
///
/// The cache talks to the network only through this seam, so tests can count
/// requests and serve canned bytes without a server.
#[async_trait]
pub trait BlobTransport: Send + Sync {
    /// Fetch `url`, attaching a bearer token when one is given.
    ///
    /// Non-2xx responses are returned as-is; interpreting the status is the
    /// caller's job. `Err` is reserved for connection-level failures.
    async fn get(&self, url: &str, auth_token: Option<&str>) -> Result<TransportResponse>;
}

#[async_trait]
impl<T: BlobTransport + ?Sized> BlobTransport for std::sync::Arc<T> {
    async fn get(&self, url: &str, auth_token: Option<&str>) -> Result<TransportResponse> {
        (**self).get(url, auth_token).await
    }
}

/// reqwest-backed transport
#[derive(Debug, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl BlobTransport for HttpTransport {
    async fn get(&self, url: &str, auth_token: Option<&str>) -> Result<TransportResponse> {
        let mut request = self
            .client
            .get(url)
            .header("User-Agent", concat!("loadout/", env!("CARGO_PKG_VERSION")));

        if let Some(token) = auth_token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let body = response.bytes().await?.to_vec();

        Ok(TransportResponse {
            status,
            content_type,
            body,
        })
    }
}

//! Outbound HTTP client for a running gateway.

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Errors returned by [`GatewayClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),
    /// The gateway answered with a non-2xx status; `message` is its body.
    #[error("{method} {url}: {status} {message}")]
    Status {
        method: Method,
        url: String,
        status: u16,
        message: String,
    },
    #[error("invalid json from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Calls gateway paths over HTTP.
///
/// `base_url` includes the dispatch prefix, e.g. `http://127.0.0.1:4000/api`.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
}

impl GatewayClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    #[must_use]
    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins `path` onto the base URL with exactly one `/` between them.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// `GET`s `path` and decodes the value, if any.
    ///
    /// # Errors
    ///
    /// See [`GatewayClient::send`].
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ClientError> {
        let url = self.url(path);
        let bytes = self.send(Method::GET, path, None).await?;
        decode(&url, &bytes)
    }

    /// `POST`s `body` as JSON to `path` and decodes the value, if any.
    ///
    /// # Errors
    ///
    /// See [`GatewayClient::send`]; also fails if `body` cannot be encoded.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<Option<T>, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let payload = serde_json::to_vec(body).map_err(ClientError::Encode)?;
        let bytes = self.send(Method::POST, path, Some(payload)).await?;
        decode(&url, &bytes)
    }

    /// Sends a raw request and returns the raw response body.
    ///
    /// A present body is sent with `content-type: application/json`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Request`] on transport failure and
    /// [`ClientError::Status`] on a non-2xx response.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Bytes, ClientError> {
        let url = self.url(path);
        let mut request = self.http.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(ClientError::Status {
                method,
                url,
                status: status.as_u16(),
                message: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        Ok(bytes)
    }
}

/// An empty body means the operation returned no value.
fn decode<T: DeserializeOwned>(url: &str, bytes: &[u8]) -> Result<Option<T>, ClientError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(bytes)
        .map(Some)
        .map_err(|source| ClientError::Decode {
            url: url.to_owned(),
            source,
        })
}

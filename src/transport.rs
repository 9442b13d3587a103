//! HTTP transport capability.
//!
//! The downloader never builds its own client. A [`Transport`] is constructed
//! by the caller, injected into the [`Downloader`](crate::Downloader), and
//! closed explicitly once the caller is done with it.
use crate::error::TransportError;
use bytes::Bytes;
use reqwest::header::{CONTENT_LENGTH, HeaderMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Default idle timeout: how long a single read may stall before the attempt
/// fails. It resets on every successful read, so large bodies that keep
/// flowing are never cut off.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Time allowed to establish a connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on the per-host connection limit.
pub const MAX_CONNECTIONS: usize = 1024;

/// A fully-read HTTP response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// URL of the final response, after any redirects.
    pub url: String,
    pub status: u16,
    pub headers: HeaderMap,
    /// Empty for HEAD requests.
    pub body: Bytes,
}

impl TransportResponse {
    /// Parsed `Content-Length` header, if present and numeric.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
    }

    pub fn is_error_status(&self) -> bool {
        self.status >= 400
    }
}

/// Request/response primitives plus a per-host connection limit.
///
/// Implementations follow redirects on their own and report the final URL
/// in [`TransportResponse::url`].
pub trait Transport: Send + Sync + 'static {
    /// Issue a HEAD request.
    fn head(
        &self,
        url: &str,
        headers: HeaderMap,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;

    /// Issue a GET request and read the whole body.
    fn get(
        &self,
        url: &str,
        headers: HeaderMap,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;

    /// Maximum number of requests in flight at once.
    fn connection_limit(&self) -> usize;

    /// Stop accepting requests. Subsequent calls fail with
    /// [`TransportError::Closed`].
    fn close(&self);
}

/// [`Transport`] backed by a `reqwest` client.
///
/// The per-host limit is enforced with a semaphore; each request holds one
/// permit from send until its body has been read. There is no deadline on a
/// whole request, only on connecting and on each individual read.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    permits: Arc<Semaphore>,
    limit: usize,
}

impl ReqwestTransport {
    pub fn new(connection_limit: usize) -> Result<Self, TransportError> {
        Self::with_options(connection_limit, DEFAULT_TIMEOUT, None)
    }

    pub fn with_options(
        connection_limit: usize,
        timeout: Duration,
        user_agent: Option<&str>,
    ) -> Result<Self, TransportError> {
        let limit = connection_limit.clamp(1, MAX_CONNECTIONS);
        let mut builder = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(timeout)
            .pool_max_idle_per_host(limit);
        if let Some(agent) = user_agent {
            builder = builder.user_agent(agent);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            permits: Arc::new(Semaphore::new(limit)),
            limit,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }
}

impl Transport for ReqwestTransport {
    async fn head(
        &self,
        url: &str,
        headers: HeaderMap,
    ) -> Result<TransportResponse, TransportError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| TransportError::Closed)?;

        let response = self.client.head(url).headers(headers).send().await?;

        Ok(TransportResponse {
            url: response.url().to_string(),
            status: response.status().as_u16(),
            headers: response.headers().clone(),
            body: Bytes::new(),
        })
    }

    async fn get(
        &self,
        url: &str,
        headers: HeaderMap,
    ) -> Result<TransportResponse, TransportError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| TransportError::Closed)?;

        let response = self.client.get(url).headers(headers).send().await?;
        let final_url = response.url().to_string();
        let status = response.status().as_u16();
        let response_headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(TransportResponse {
            url: final_url,
            status,
            headers: response_headers,
            body,
        })
    }

    fn connection_limit(&self) -> usize {
        self.limit
    }

    fn close(&self) {
        self.permits.close();
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn content_length_is_parsed_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("10000"));
        let response = TransportResponse {
            url: "http://example.com/a".into(),
            status: 200,
            headers,
            body: Bytes::new(),
        };
        assert_eq!(response.content_length(), Some(10_000));
        assert!(!response.is_error_status());
    }

    #[test]
    fn garbage_content_length_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("lots"));
        let response = TransportResponse {
            url: String::new(),
            status: 404,
            headers,
            body: Bytes::new(),
        };
        assert_eq!(response.content_length(), None);
        assert!(response.is_error_status());
    }

    #[tokio::test]
    async fn closed_reqwest_transport_rejects_requests() {
        let transport = ReqwestTransport::new(2).unwrap();
        assert_eq!(transport.connection_limit(), 2);
        transport.close();
        assert!(transport.is_closed());

        let err = transport
            .head("http://127.0.0.1:9/never", HeaderMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }

    #[test]
    fn connection_limit_is_clamped() {
        let transport = ReqwestTransport::new(usize::MAX).unwrap();
        assert_eq!(transport.connection_limit(), MAX_CONNECTIONS);

        let transport = ReqwestTransport::new(0).unwrap();
        assert_eq!(transport.connection_limit(), 1);
    }

    #[tokio::test]
    async fn slow_response_within_read_timeout_succeeds() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(206)
                    .set_body_bytes(vec![7u8; 64])
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;

        let transport =
            ReqwestTransport::with_options(1, Duration::from_secs(5), None).unwrap();
        let response = transport.get(&server.uri(), HeaderMap::new()).await.unwrap();
        assert_eq!(response.status, 206);
        assert_eq!(response.body.len(), 64);
    }

    #[tokio::test]
    async fn stalled_response_hits_read_timeout() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(206).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let transport =
            ReqwestTransport::with_options(1, Duration::from_millis(200), None).unwrap();
        let started = std::time::Instant::now();
        let err = transport.get(&server.uri(), HeaderMap::new()).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}

//! HTTP Client Abstraction
//!
//! Request/response types and the async client contract used for the song
//! catalog, artwork downloads and the preference API.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::Result;

/// HTTP method types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

/// HTTP request builder
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

/// HTTP response
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    /// Check if response status is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Server-side failure or rate limit worth another attempt (5xx, 429).
    pub fn is_retryable(&self) -> bool {
        self.status >= 500 || self.status == 429
    }
}

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts
    pub max_attempts: u32,
    /// Base delay between retries
    pub base_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Whether to use exponential backoff
    pub use_exponential_backoff: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            use_exponential_backoff: true,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based), capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = if self.use_exponential_backoff {
            let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
            self.base_delay.saturating_mul(factor)
        } else {
            self.base_delay
        };
        delay.min(self.max_delay)
    }
}

/// Async HTTP client trait
///
/// This trait abstracts HTTP operations to allow platform-specific implementations.
/// Implementations own transport concerns (TLS, pooling, timeouts) and map
/// failures to [`BridgeError`].
///
/// # Example
///
/// ```ignore
/// use bridge_traits::http::{HttpClient, HttpRequest, HttpMethod};
///
/// async fn fetch_data(client: &dyn HttpClient) -> Result<String> {
///     let request = HttpRequest::new(HttpMethod::Get, "https://api.example.com/api/v1/songs/user")
///         .header("Accept", "application/json");
///
///     let response = client.execute(request).await?;
///     Ok(String::from_utf8_lossy(&response.body).into_owned())
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Network connection fails
    /// - TLS validation fails
    /// - Request times out
    /// - Maximum retries exceeded
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Execute an HTTP request, retrying transient failures.
    ///
    /// Transient transport errors and retryable statuses are attempted again
    /// up to `policy.max_attempts` times, sleeping
    /// [`delay_for_attempt`](RetryPolicy::delay_for_attempt) in between. The
    /// last outcome is returned as is. Clients with their own retry loop
    /// override this.
    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let outcome = self.execute(request.clone()).await;
            let retry = match &outcome {
                Ok(response) => response.is_retryable(),
                Err(error) => error.is_transient(),
            };

            if !retry || attempt >= max_attempts {
                return outcome;
            }

            tokio::time::sleep(policy.delay_for_attempt(attempt)).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use std::sync::Mutex;

    /// Client replaying a fixed script of outcomes, one per call.
    struct ScriptedClient {
        script: Mutex<Vec<Result<u16>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedClient {
        fn new(mut script: Vec<Result<u16>>) -> Self {
            script.reverse();
            Self {
                script: Mutex::new(script),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl HttpClient for ScriptedClient {
        async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse> {
            *self.calls.lock().unwrap() += 1;
            let status = self.script.lock().unwrap().pop().unwrap()?;
            Ok(HttpResponse {
                status,
                headers: HashMap::new(),
                body: Bytes::new(),
            })
        }
    }

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            use_exponential_backoff: true,
        }
    }

    fn catalog_request() -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, "https://example.com/api/v1/songs/user")
    }

    #[test]
    fn test_http_request_builder() {
        let request = catalog_request()
            .header("Accept", "application/json")
            .timeout(Duration::from_secs(30));

        assert_eq!(request.url, "https://example.com/api/v1/songs/user");
        assert_eq!(
            request.headers.get("Accept").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(request.timeout, Some(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn test_default_retry_recovers_from_transient_failures() {
        let client = ScriptedClient::new(vec![
            Err(BridgeError::OperationFailed("connection reset".into())),
            Ok(503),
            Ok(200),
        ]);

        let response = client
            .execute_with_retry(catalog_request(), quick_policy(3))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn test_default_retry_stops_at_max_attempts() {
        let client = ScriptedClient::new(vec![Ok(500), Ok(502), Ok(200)]);

        let response = client
            .execute_with_retry(catalog_request(), quick_policy(2))
            .await
            .unwrap();

        assert_eq!(response.status, 502);
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn test_default_retry_skips_permanent_failures() {
        let client = ScriptedClient::new(vec![
            Err(BridgeError::NotAvailable("no network stack".into())),
            Ok(200),
        ]);
        let error = client
            .execute_with_retry(catalog_request(), quick_policy(3))
            .await
            .unwrap_err();
        assert!(matches!(error, BridgeError::NotAvailable(_)));
        assert_eq!(client.calls(), 1);

        let client = ScriptedClient::new(vec![Ok(404), Ok(200)]);
        let response = client
            .execute_with_retry(catalog_request(), quick_policy(3))
            .await
            .unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(client.calls(), 1);
    }

    #[test]
    fn test_http_response_status_checks() {
        let response = HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from("test"),
        };

        assert!(response.is_success());
        assert!(!response.is_retryable());

        let throttled = HttpResponse { status: 429, ..response };
        assert!(!throttled.is_success());
        assert!(throttled.is_retryable());
    }

    #[test]
    fn test_retry_policy_backoff_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
            use_exponential_backoff: true,
        };

        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(300));
    }
}

use crate::config::ScraperConfig;
use crate::error::SourceError;
use anyhow::{Context, Result};
use std::time::Duration;
use tokio::time::sleep;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::{debug, warn};

/// Shared by every worker; `reqwest::Client` pools connections internally.
pub struct HttpClient {
    inner: reqwest::Client,
    config: ScraperConfig,
}

impl HttpClient {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            // Accept cookies so session-based pages work
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            inner,
            config: config.clone(),
        })
    }

    /// Fetch `url` and run `parse` on the body, retrying the pair with
    /// jittered exponential backoff while the error is retryable.
    pub async fn fetch_with<T, F>(&self, url: &str, parse: F) -> Result<T, SourceError>
    where
        F: Fn(&str) -> Result<T, SourceError>,
    {
        let parse = &parse;
        let mut attempt = 0u32;
        let result = RetryIf::start(
            self.backoff(),
            || {
                attempt += 1;
                let n = attempt;
                async move {
                    let body = self.get_text(url, n).await?;
                    parse(&body)
                }
            },
            |e: &SourceError| {
                let retry = e.is_retryable();
                if retry {
                    warn!("{} failed: {}", url, e);
                }
                retry
            },
        )
        .await;

        result.map_err(|e| e.escalate(attempt))
    }

    /// Delays between attempts; the iterator length is the retry budget.
    fn backoff(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(2)
            .factor(self.config.backoff_base_ms.max(2) / 2)
            .max_delay(Duration::from_millis(self.config.backoff_max_ms))
            .map(jitter)
            .take(self.config.max_retries as usize)
    }

    /// Single GET decoded as EUC-KR (Naver serves legacy-encoded pages).
    async fn get_text(&self, url: &str, attempt: u32) -> Result<String, SourceError> {
        self.polite_delay().await;
        debug!("GET {} (attempt {})", url, attempt);

        let resp = self.inner.get(url).send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() || e.is_request() {
                SourceError::Transient(format!("request error: {}", e))
            } else {
                SourceError::Unavailable(format!("request error: {}", e))
            }
        })?;

        let status = resp.status();
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(SourceError::Transient(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(SourceError::Unavailable(format!("HTTP {}", status)));
        }

        resp.text_with_charset("euc-kr")
            .await
            .map_err(|e| SourceError::Transient(format!("failed to read body: {}", e)))
    }

    /// Sleep for the configured delay + random jitter.
    async fn polite_delay(&self) {
        let jitter_part = jitter(Duration::from_millis(self.config.jitter_ms));
        sleep(Duration::from_millis(self.config.request_delay_ms) + jitter_part).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn client(max_retries: u32) -> HttpClient {
        let config = ScraperConfig {
            max_retries,
            backoff_base_ms: 100,
            backoff_max_ms: 1_000,
            ..ScraperConfig::default()
        };
        HttpClient::new(&config).unwrap()
    }

    #[test]
    fn backoff_length_is_retry_budget() {
        assert_eq!(client(3).backoff().count(), 3);
        assert_eq!(client(0).backoff().count(), 0);
    }

    #[test]
    fn backoff_delays_are_capped() {
        for delay in client(10).backoff() {
            assert!(delay <= Duration::from_millis(1_000));
        }
    }

    /// Local HTTP server answering every connection with `status` and
    /// `body`; returns its URL and a hit counter.
    async fn serve(status: &'static str, body: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 4096];
                socket.read(&mut buf).await.ok();
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.ok();
                socket.shutdown().await.ok();
            }
        });

        (format!("http://{}/sise", addr), hits)
    }

    fn fast_client(max_retries: u32) -> HttpClient {
        let config = ScraperConfig {
            max_retries,
            backoff_base_ms: 2,
            backoff_max_ms: 10,
            request_delay_ms: 0,
            jitter_ms: 0,
            timeout_secs: 5,
            ..ScraperConfig::default()
        };
        HttpClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn server_error_is_retried_then_escalated() {
        let (url, hits) = serve("503 Service Unavailable", "").await;

        let result = fast_client(2).fetch_with(&url, |body| Ok(body.to_string())).await;

        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(
            result.unwrap_err(),
            SourceError::Unavailable("HTTP 503 Service Unavailable (after 3 attempts)".into())
        );
    }

    #[tokio::test]
    async fn not_available_is_never_retried() {
        let (url, hits) = serve("200 OK", "<html><body></body></html>").await;

        let result: Result<(), SourceError> = fast_client(2)
            .fetch_with(&url, |_| Err(SourceError::NotAvailable { requested: 4, available: 3 }))
            .await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(result.unwrap_err(), SourceError::NotAvailable { requested: 4, available: 3 });
    }

    #[tokio::test]
    async fn malformed_page_is_refetched() {
        let (url, hits) = serve("200 OK", "<html>점검중</html>").await;

        let result: Result<(), SourceError> = fast_client(1)
            .fetch_with(&url, |_| Err(SourceError::Malformed("no rank boxes on page".into())))
            .await;

        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert!(matches!(result, Err(SourceError::Malformed(_))));
    }

    #[tokio::test]
    async fn client_error_fails_without_retry() {
        let (url, hits) = serve("404 Not Found", "").await;

        let result = fast_client(3).fetch_with(&url, |body| Ok(body.to_string())).await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(result.unwrap_err(), SourceError::Unavailable("HTTP 404 Not Found".into()));
    }
}

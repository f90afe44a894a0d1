use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::ACCEPT;
use reqwest::{StatusCode, Url};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::entry::{parse_entries, record_from_entry, Entry};
use super::{BreachSource, FetchOutcome, SourceKind};
use crate::cache::Cache;
use crate::config::RemoteConfig;
use crate::error::{Error, Result};
use crate::model::normalize_email;

pub const DEFAULT_BASE_URL: &str = "https://haveibeenpwned.com/api/v3";
pub const DEFAULT_API_KEY_HEADER: &str = "hibp-api-key";
/// The upstream service asks for roughly 1.6s between calls.
pub const DEFAULT_RATE_LIMIT_MS: u64 = 1600;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

const USER_AGENT: &str = concat!("breachrisk/", env!("CARGO_PKG_VERSION"));

/// Breach lookups against a remote breach API.
///
/// Every network call is followed by the configured rate-limit delay before
/// `fetch` returns, whether the call succeeded or not. Cached answers skip
/// both the call and the delay.
pub struct RemoteBreachSource {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
    api_key_header: String,
    rate_limit: Duration,
    cache: Option<Cache>,
}

impl RemoteBreachSource {
    /// Creates a source with the default header, rate limit and timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid base URL, the timeout is
    /// zero or the HTTP client cannot be built.
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self> {
        Self::build(
            base_url,
            api_key.into(),
            DEFAULT_API_KEY_HEADER.to_string(),
            Duration::from_millis(DEFAULT_RATE_LIMIT_MS),
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    pub fn from_config(config: &RemoteConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Config("remote source requires an API key".to_string()))?;

        Self::build(
            &config.base_url,
            api_key,
            config.api_key_header.clone(),
            Duration::from_millis(config.rate_limit_ms),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn build(
        base_url: &str,
        api_key: String,
        api_key_header: String,
        rate_limit: Duration,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid base URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "base URL '{}' cannot hold a path",
                base_url
            )));
        }
        if timeout.is_zero() {
            return Err(Error::Config(
                "remote timeout must be greater than zero".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key,
            api_key_header,
            rate_limit,
            cache: None,
        })
    }

    pub fn with_cache(mut self, cache: Cache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: Duration) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// `{base}/breachedaccount/{email}?truncateResponse=false`
    fn account_url(&self, email: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("breachedaccount").push(email);
        }
        url.query_pairs_mut().append_pair("truncateResponse", "false");
        url
    }

    async fn request(&self, email: &str) -> std::result::Result<Vec<Entry>, String> {
        let response = self
            .client
            .get(self.account_url(email))
            .header(self.api_key_header.as_str(), self.api_key.as_str())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let status = response.status();
        // The API answers 404 for accounts with no breaches.
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(format!("breach API returned {}", status));
        }

        let body = response
            .text()
            .await
            .map_err(|e| format!("failed to read response: {}", e))?;
        parse_entries(&body).map_err(|e| format!("malformed response: {}", e))
    }
}

fn cache_key(email: &str) -> String {
    let digest = Sha256::digest(email.as_bytes());
    format!("breaches_{}", hex::encode(digest))
}

#[async_trait]
impl BreachSource for RemoteBreachSource {
    fn name(&self) -> &'static str {
        "Remote Breach API"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Remote
    }

    async fn fetch(&self, email: &str) -> FetchOutcome {
        let email = normalize_email(email);
        let key = cache_key(&email);
        let now = Utc::now();

        if let Some(entries) = self.cache.as_ref().and_then(|c| c.get::<Vec<Entry>>(&key)) {
            debug!(entries = entries.len(), "breach API cache hit");
            return FetchOutcome::Found(entries.iter().map(|e| record_from_entry(e, now)).collect());
        }

        let outcome = match self.request(&email).await {
            Ok(entries) => {
                if let Some(cache) = &self.cache {
                    if let Err(e) = cache.set(&key, &entries) {
                        debug!(error = %e, "failed to cache breach API response");
                    }
                }
                FetchOutcome::Found(entries.iter().map(|e| record_from_entry(e, now)).collect())
            }
            Err(reason) => {
                warn!(%reason, "breach API lookup failed");
                FetchOutcome::Unavailable(reason)
            }
        };

        if !self.rate_limit.is_zero() {
            tokio::time::sleep(self.rate_limit).await;
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serves one canned HTTP response and hands back the raw request.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/api/v3", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });

        (base, handle)
    }

    fn source(base: &str) -> RemoteBreachSource {
        RemoteBreachSource::new(base, "secret")
            .unwrap()
            .with_rate_limit(Duration::ZERO)
    }

    const TWO_BREACHES: &str = r#"[
        {"Name":"Adobe","Description":"Adobe leak","BreachDate":"2013-10-04","PwnCount":152445165,
         "DataClasses":["Email addresses","Passwords"]},
        {"Name":"Forum","Description":"Small forum","BreachDate":"2020-02-01","PwnCount":900}
    ]"#;

    #[tokio::test]
    async fn test_fetch_parses_breaches_and_sends_headers() {
        let (base, server) = serve_once("200 OK", TWO_BREACHES).await;

        let outcome = source(&base).fetch("Test@Example.com").await;
        let request = server.await.unwrap().to_lowercase();

        assert!(request.starts_with(
            "get /api/v3/breachedaccount/test@example.com?truncateresponse=false "
        ));
        assert!(request.contains("hibp-api-key: secret"));
        assert!(request.contains("user-agent: breachrisk/"));
        assert!(request.contains("accept: application/json"));

        let breaches = match outcome {
            FetchOutcome::Found(b) => b,
            other => panic!("unexpected outcome: {:?}", other),
        };
        assert_eq!(breaches.len(), 2);
        assert_eq!(breaches[0].source_name, "Adobe");
        assert_eq!(breaches[0].exposed_data, "Email addresses, Passwords");
        assert_eq!(breaches[1].pwn_count, Some(900));
    }

    #[tokio::test]
    async fn test_not_found_means_no_breaches() {
        let (base, server) = serve_once("404 Not Found", "").await;
        let outcome = source(&base).fetch("clean@example.com").await;
        server.await.unwrap();

        assert_eq!(outcome, FetchOutcome::Found(Vec::new()));
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let (base, server) = serve_once("503 Service Unavailable", "").await;
        let outcome = source(&base).fetch("a@example.com").await;
        server.await.unwrap();

        assert!(matches!(outcome, FetchOutcome::Unavailable(reason) if reason.contains("503")));
    }

    #[tokio::test]
    async fn test_malformed_body_is_unavailable() {
        let (base, server) = serve_once("200 OK", "{\"oops\":").await;
        let outcome = source(&base).fetch("a@example.com").await;
        server.await.unwrap();

        assert!(matches!(outcome, FetchOutcome::Unavailable(reason) if reason.contains("malformed")));
    }

    #[tokio::test]
    async fn test_connection_failure_still_waits_rate_limit() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let source = RemoteBreachSource::new(&base, "secret")
            .unwrap()
            .with_rate_limit(Duration::from_millis(150));

        let started = Instant::now();
        let outcome = source.fetch("a@example.com").await;

        assert!(!outcome.is_available());
        assert!(started.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let (base, server) = serve_once("200 OK", TWO_BREACHES).await;
        let source = source(&base).with_cache(Cache::in_dir(dir.path(), 1));

        let first = source.fetch("a@example.com").await;
        server.await.unwrap();
        // The server is gone now, so a second answer must come from the cache.
        let second = source.fetch("A@example.com").await;

        assert_eq!(first.into_breaches().len(), 2);
        let cached = second.into_breaches();
        assert_eq!(cached.len(), 2);
        assert_eq!(cached[0].source_name, "Adobe");
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(matches!(
            RemoteBreachSource::new("not a url", "k"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            RemoteBreachSource::new("mailto:someone@example.com", "k"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = RemoteConfig {
            api_key: Some("  ".to_string()),
            ..RemoteConfig::default()
        };
        assert!(matches!(
            RemoteBreachSource::from_config(&config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_from_config_rejects_zero_timeout() {
        let config = RemoteConfig {
            api_key: Some("k".to_string()),
            timeout_secs: 0,
            ..RemoteConfig::default()
        };
        match RemoteBreachSource::from_config(&config) {
            Err(Error::Config(msg)) => assert!(msg.contains("timeout")),
            other => panic!("expected config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_cache_key_is_stable_hex() {
        let key = cache_key("a@example.com");
        assert_eq!(key, cache_key("a@example.com"));
        assert_ne!(key, cache_key("b@example.com"));
        assert_eq!(key.len(), "breaches_".len() + 64);
    }
}

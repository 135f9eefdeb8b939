use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::limits::RateLimitSnapshot;
use crate::token::TokenProvider;
use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.onecta.daikin.eu/v1";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP access to the cloud. Every call runs under a single gate so no two
/// requests are ever in flight at once; the cloud both rate-limits
/// aggressively and serves stale reads that could race a just-issued write.
pub struct OnectaClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
    gate: tokio::sync::Mutex<()>,
    limits: Mutex<RateLimitSnapshot>,
    last_write: Mutex<Option<Instant>>,
}

impl OnectaClient {
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Self {
        Self::with_options(tokens, DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    pub fn with_options(
        tokens: Arc<dyn TokenProvider>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build HTTP client");

        OnectaClient {
            http,
            base_url: base_url.into(),
            tokens,
            gate: tokio::sync::Mutex::new(()),
            limits: Mutex::new(RateLimitSnapshot::default()),
            last_write: Mutex::new(None),
        }
    }

    /// GET expecting a 200 with a JSON body.
    pub async fn get(&self, path: &str) -> Result<Value> {
        let resp = self.send(Method::GET, path, None).await?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(status_error(status, path));
        }
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// PATCH expecting a 204. Records the write timestamp on success.
    pub async fn patch(&self, path: &str, body: &Value) -> Result<()> {
        self.write(Method::PATCH, path, body).await
    }

    /// POST expecting a 204. Records the write timestamp on success.
    pub async fn post(&self, path: &str, body: &Value) -> Result<()> {
        self.write(Method::POST, path, body).await
    }

    /// PUT expecting a 204. Records the write timestamp on success.
    pub async fn put(&self, path: &str, body: &Value) -> Result<()> {
        self.write(Method::PUT, path, body).await
    }

    /// Quota numbers from the most recent response.
    pub fn rate_limits(&self) -> RateLimitSnapshot {
        *self.limits.lock()
    }

    /// When the last successful mutation landed, if any.
    pub fn last_write(&self) -> Option<Instant> {
        *self.last_write.lock()
    }

    async fn write(&self, method: Method, path: &str, body: &Value) -> Result<()> {
        let resp = self.send(method, path, Some(body)).await?;
        let status = resp.status();
        if status != StatusCode::NO_CONTENT {
            return Err(status_error(status, path));
        }
        *self.last_write.lock() = Some(Instant::now());
        debug!(path, "write accepted");
        Ok(())
    }

    /// One gated request. A 401 forces a token refresh and a single retry
    /// while still holding the gate; the gate is released once response
    /// headers are in, before the body is read.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        let gate = self.gate.lock().await;

        let token = self.tokens.access_token().await?;
        debug!(%method, path, "sending request");
        let resp = self.request(&method, &url, body, &token).send().await?;
        self.capture_limits(resp.headers());

        let resp = if resp.status() == StatusCode::UNAUTHORIZED {
            debug!(path, "token rejected, refreshing and retrying");
            let token = self.tokens.refresh().await?;
            let retry = self.request(&method, &url, body, &token).send().await?;
            self.capture_limits(retry.headers());
            if retry.status() == StatusCode::UNAUTHORIZED {
                return Err(Error::AuthFailed);
            }
            retry
        } else {
            resp
        };

        drop(gate);
        Ok(resp)
    }

    fn request(
        &self,
        method: &Method,
        url: &str,
        body: Option<&Value>,
        token: &str,
    ) -> reqwest::RequestBuilder {
        let mut req = self.http.request(method.clone(), url).bearer_auth(token);
        if let Some(body) = body {
            req = req.json(body);
        }
        req
    }

    fn capture_limits(&self, headers: &HeaderMap) {
        let snap = RateLimitSnapshot::from_headers(headers);
        if snap.limit_day > 0 && snap.remaining_day == 0 {
            warn!(
                retry_after = snap.retry_after,
                "daily request quota exhausted"
            );
        } else {
            trace!(
                remaining_minute = snap.remaining_minute,
                remaining_day = snap.remaining_day,
                "rate limit headers"
            );
        }
        *self.limits.lock() = snap;
    }
}

fn status_error(status: StatusCode, path: &str) -> Error {
    Error::Status {
        status: status.as_u16(),
        path: path.to_string(),
    }
}

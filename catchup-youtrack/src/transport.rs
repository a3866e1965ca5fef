use std::{thread, time::Duration};

use anyhow::{Context, Result};
use catchup_config::CatchupConfig;
use reqwest::{
    blocking::{Client, Response},
    header::{self, HeaderMap, HeaderValue},
    Method,
};
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::error::{truncate_chars, TransportError, BODY_PREVIEW_CHARS};

const REQUEST_TIMEOUT_SECS: u64 = 30;
const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// `path` is relative to the API root. Empty and 204 responses decode to `{}`.
pub trait Transport {
    fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value, TransportError> {
        (**self).request(method, path, query, body)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_factor: Duration,
    pub statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: Duration::from_secs(1),
            statuses: RETRY_STATUSES.to_vec(),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn backoff(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let exponent = (retry - 1).min(16);
        self.backoff_factor.saturating_mul(1u32 << exponent)
    }

    pub fn retries_status(&self, method: &Method, status: u16) -> bool {
        is_idempotent(method) && self.statuses.contains(&status)
    }
}

fn is_idempotent(method: &Method) -> bool {
    [
        Method::HEAD,
        Method::GET,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
        Method::TRACE,
    ]
    .contains(method)
}

pub struct HttpTransport {
    api_base_url: String,
    token: String,
    http: Client,
    retry: RetryPolicy,
}

impl HttpTransport {
    pub fn from_config(config: &CatchupConfig) -> Result<Self> {
        Self::new(
            &config.api_base_url()?,
            config.require_token()?,
            config.insecure,
        )
    }

    pub fn new(api_base_url: &str, token: &str, insecure: bool) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let http = Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(insecure)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .with_context(|| "failed to build YouTrack HTTP client")?;

        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            http,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path.trim_start_matches('/'))
    }

    fn pause(&self, retry: u32, reason: &str) {
        let delay = self.retry.backoff(retry);
        warn!(
            retry,
            max_retries = self.retry.max_retries,
            delay_ms = delay.as_millis() as u64,
            reason,
            "retrying YouTrack request"
        );
        thread::sleep(delay);
    }
}

impl Transport for HttpTransport {
    fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value, TransportError> {
        let url = self.url(path);
        debug!(%method, %url, ?query, "sending YouTrack request");

        let mut retries = 0;
        loop {
            let mut request = self
                .http
                .request(method.clone(), url.as_str())
                .bearer_auth(&self.token)
                .query(query);
            if let Some(payload) = body {
                request = request.json(payload);
            }

            let response = match request.send() {
                Ok(response) => response,
                Err(source) => {
                    let transient = source.is_connect() || source.is_timeout();
                    if transient && is_idempotent(&method) && retries < self.retry.max_retries {
                        retries += 1;
                        self.pause(retries, "connection failure");
                        continue;
                    }
                    error!(%method, %url, error = %source, "YouTrack request failed");
                    return Err(TransportError::Network {
                        method: method.to_string(),
                        url,
                        source,
                    });
                }
            };

            let status = response.status().as_u16();
            if !response.status().is_success() {
                if self.retry.retries_status(&method, status) && retries < self.retry.max_retries {
                    retries += 1;
                    self.pause(retries, "retryable status");
                    continue;
                }
                let body = response.text().unwrap_or_default();
                let error = TransportError::from_status(status, &body);
                error!(%method, %url, status, "{error}");
                return Err(error);
            }

            return decode_json(response, &method, &url);
        }
    }
}

fn decode_json(response: Response, method: &Method, url: &str) -> Result<Value, TransportError> {
    let status = response.status().as_u16();
    let network_error = |source| TransportError::Network {
        method: method.to_string(),
        url: url.to_string(),
        source,
    };
    let bytes = response.bytes().map_err(network_error)?;

    if status == 204 || bytes.is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    serde_json::from_slice(&bytes).map_err(|_| {
        let body = truncate_chars(&String::from_utf8_lossy(&bytes), BODY_PREVIEW_CHARS);
        error!(%url, status, body = %body, "failed to parse JSON response");
        TransportError::InvalidJson { status, body }
    })
}

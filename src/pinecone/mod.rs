//! Blocking HTTP transport shared by the Pinecone inference, control-plane
//! and data-plane clients.
//!
//! Every request carries the `Api-Key` and `X-Pinecone-API-Version` headers.
//! Server errors and transport failures are retried with exponential backoff;
//! client errors are returned immediately with the message Pinecone sent.

#[cfg(test)]
mod tests;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, warn};
use ureq::http::Response;
use url::Url;

use crate::config::{ConfigError, PineconeConfig};
use crate::{NotesError, Result};

const API_KEY_HEADER: &str = "Api-Key";
const API_VERSION_HEADER: &str = "X-Pinecone-API-Version";
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
const EXPONENTIAL_BACKOFF_BASE: u32 = 2;
const MAX_ERROR_MESSAGE_CHARS: usize = 500;

#[derive(Clone)]
pub struct ApiClient {
    agent: ureq::Agent,
    api_key: String,
    api_version: String,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_key", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_delay", &self.retry_delay)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    #[inline]
    pub fn new(api_key: &str, config: &PineconeConfig) -> Result<Self> {
        Self::with_agent(agent_for(config), api_key, config)
    }

    /// Client sharing `agent`'s connection pool with every other clone of it
    #[inline]
    pub fn with_agent(agent: ureq::Agent, api_key: &str, config: &PineconeConfig) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey.into());
        }

        Ok(Self {
            agent,
            api_key: api_key.trim().to_string(),
            api_version: config.api_version.clone(),
            retry_attempts: config.retry_attempts.max(1),
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts.max(1);
        self
    }

    /// Base delay before the first retry; doubled on each further attempt
    #[inline]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    #[inline]
    pub fn get_json<T: DeserializeOwned>(&self, url: &Url, query: &[(&str, &str)]) -> Result<T> {
        debug!("GET {}", url);

        let response_text = self.send_with_retry(url, || {
            let mut request = self
                .agent
                .get(url.as_str())
                .header(API_KEY_HEADER, self.api_key.as_str())
                .header(API_VERSION_HEADER, self.api_version.as_str());
            for (key, value) in query {
                request = request.query(*key, *value);
            }
            request.call()
        })?;

        parse_response(url, &response_text)
    }

    #[inline]
    pub fn post_json<B, T>(&self, url: &Url, body: &B) -> Result<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        debug!("POST {}", url);

        let request_json = serde_json::to_string(body)
            .map_err(|e| NotesError::InvalidInput(format!("Failed to serialize request: {}", e)))?;

        let response_text = self.send_with_retry(url, || {
            self.agent
                .post(url.as_str())
                .header(API_KEY_HEADER, self.api_key.as_str())
                .header(API_VERSION_HEADER, self.api_version.as_str())
                .header("Content-Type", "application/json")
                .send(&request_json)
        })?;

        parse_response(url, &response_text)
    }

    fn send_with_retry<F>(&self, url: &Url, mut send: F) -> Result<String>
    where
        F: FnMut() -> std::result::Result<Response<ureq::Body>, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            match send() {
                Ok(mut response) => {
                    let status = response.status();
                    let response_text = response.body_mut().read_to_string().map_err(|e| {
                        NotesError::Network(format!("Failed to read response from {}: {}", url, e))
                    })?;

                    if status.is_success() {
                        debug!("Request succeeded on attempt {}", attempt);
                        return Ok(response_text);
                    }

                    let api_error = NotesError::Api {
                        status: status.as_u16(),
                        message: error_message(&response_text),
                    };

                    if status.is_server_error() {
                        warn!(
                            "Server error (status {}), attempt {}/{}",
                            status, attempt, self.retry_attempts
                        );
                        last_error = Some(api_error);
                    } else {
                        warn!("Client error (status {}), not retrying", status);
                        return Err(api_error);
                    }
                }
                Err(
                    error @ (ureq::Error::ConnectionFailed
                    | ureq::Error::HostNotFound
                    | ureq::Error::Timeout(_)
                    | ureq::Error::Io(_)),
                ) => {
                    warn!(
                        "Transport error: {}, attempt {}/{}",
                        error, attempt, self.retry_attempts
                    );
                    last_error = Some(NotesError::Network(format!(
                        "Request to {} failed: {}",
                        url, error
                    )));
                }
                Err(error) => {
                    warn!("Non-retryable error: {}", error);
                    return Err(NotesError::Network(format!(
                        "Request to {} failed: {}",
                        url, error
                    )));
                }
            }

            if attempt < self.retry_attempts {
                let delay = self.retry_delay * EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1);
                debug!("Waiting {:?} before retry", delay);
                std::thread::sleep(delay);
            }
        }

        error!("All retry attempts failed for request to {}", url);

        Err(last_error
            .unwrap_or_else(|| NotesError::Network("Request failed after retries".to_string())))
    }
}

/// Join `path` below a configured base URL, keeping any path prefix the base has
#[inline]
pub fn endpoint(base: &Url, path: &str) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let directory = format!("{}/", base.path());
        base.set_path(&directory);
    }

    base.join(path.trim_start_matches('/'))
        .map_err(|e| NotesError::Config(format!("Invalid endpoint {}{}: {}", base, path, e)))
}

/// HTTP agent configured with the Pinecone timeout
#[inline]
pub fn agent_for(config: &PineconeConfig) -> ureq::Agent {
    build_agent(Duration::from_secs(config.timeout_seconds))
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

fn parse_response<T: DeserializeOwned>(url: &Url, response_text: &str) -> Result<T> {
    serde_json::from_str(response_text).map_err(|e| {
        NotesError::Network(format!("Failed to parse response from {}: {}", url, e))
    })
}

/// Pull the human-readable message out of a Pinecone error body.
/// Both `{"error": {"message": ..}}` and `{"message": ..}` shapes occur.
fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let message = parsed.as_ref().and_then(|value| {
        value
            .pointer("/error/message")
            .or_else(|| value.get("message"))
            .and_then(serde_json::Value::as_str)
    });

    match message {
        Some(message) => message.to_string(),
        None if body.trim().is_empty() => "empty response body".to_string(),
        None => body.trim().chars().take(MAX_ERROR_MESSAGE_CHARS).collect(),
    }
}

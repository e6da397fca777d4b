use std::thread;
use std::time::Duration;

use anyhow::Result;
use rand::seq::SliceRandom;
use reqwest::Method;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, warn};
use url::Url;

use crate::config::Config;

pub const DEFAULT_API_BASE: &str = "https://app.overnads.xyz";

const ORIGIN: &str = "https://app.overnads.xyz";
const REFERER: &str = "https://app.overnads.xyz/";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(25);

/// The server rejected the credential (401). Nothing after this is worth
/// sending; the top level turns it into a non-zero exit.
#[derive(Debug, Error)]
#[error("authorization rejected (401): the auth token is expired or invalid")]
pub struct AuthRejected;

#[derive(Debug, Error)]
#[error("network error: {0}")]
pub struct TransportError(pub String);

pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200 || self.status == 201
    }
}

/// One wire round trip. The production backend is reqwest; tests script
/// responses through this seam instead of standing up a server.
pub trait Transport {
    fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut builder = self.client.request(request.method, request.url);
        for (name, value) in request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().map_err(|e| TransportError(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response.text().map_err(|e| TransportError(e.to_string()))?;

        Ok(ApiResponse { status, body })
    }
}

/// Blocking delay. Injected so tests can record the backoff and gameplay
/// waits instead of serving them.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

pub struct SystemSleeper;

impl Sleeper for SystemSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(3),
        }
    }
}

pub struct Endpoints {
    pub profile: Url,
    pub game_start: Url,
    pub game_end: Url,
}

impl Endpoints {
    pub fn new(base: &Url) -> Result<Self> {
        Ok(Self {
            profile: base.join("/api/auth/me")?,
            game_start: base.join("/api/game/start")?,
            game_end: base.join("/api/game/end")?,
        })
    }
}

pub struct ApiClient {
    transport: Box<dyn Transport>,
    sleeper: Box<dyn Sleeper>,
    auth_token: String,
    user_agents: Vec<String>,
    endpoints: Endpoints,
    retry: RetryPolicy,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let base = Url::parse(config.api_base.as_deref().unwrap_or(DEFAULT_API_BASE))?;
        Self::with_transport(
            Box::new(HttpTransport::new()?),
            Box::new(SystemSleeper),
            config.auth_token.clone(),
            config.user_agents.clone(),
            &base,
            RetryPolicy::default(),
        )
    }

    pub fn with_transport(
        transport: Box<dyn Transport>,
        sleeper: Box<dyn Sleeper>,
        auth_token: String,
        user_agents: Vec<String>,
        base: &Url,
        retry: RetryPolicy,
    ) -> Result<Self> {
        Ok(Self {
            transport,
            sleeper,
            auth_token,
            user_agents,
            endpoints: Endpoints::new(base)?,
            retry,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Sends a request with bounded retries and linear backoff.
    ///
    /// Responses below 500 come back as-is; 5xx and transport failures are
    /// retried up to `max_attempts` with a `backoff * attempt` delay after
    /// each failed attempt, then `Ok(None)`. A 401 is fatal and short
    /// circuits as `AuthRejected`.
    pub fn execute(
        &self,
        method: Method,
        url: &Url,
        payload: Option<Value>,
    ) -> Result<Option<ApiResponse>, AuthRejected> {
        for attempt in 1..=self.retry.max_attempts {
            let request = ApiRequest {
                method: method.clone(),
                url: url.clone(),
                headers: self.headers(),
                body: payload.clone(),
            };

            match self.transport.send(request) {
                Ok(response) => {
                    if response.status == 401 {
                        error!("CRITICAL: auth token is expired or invalid, stopping");
                        return Err(AuthRejected);
                    }
                    if response.status < 500 {
                        return Ok(Some(response));
                    }
                    warn!(
                        status = response.status,
                        attempt,
                        max = self.retry.max_attempts,
                        "server error, backing off"
                    );
                }
                Err(err) => {
                    warn!(%err, attempt, max = self.retry.max_attempts, "backing off");
                }
            }

            self.sleeper.sleep(self.retry.backoff * attempt);
        }

        error!(%url, "request failed after {} attempts", self.retry.max_attempts);
        Ok(None)
    }

    // Rebuilt on every attempt so the user agent is re-rolled each time.
    fn headers(&self) -> Vec<(&'static str, String)> {
        let user_agent = self
            .user_agents
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_default();

        vec![
            ("Accept", "*/*".to_owned()),
            ("Accept-Language", "en-US,en;q=0.9".to_owned()),
            ("Authorization", self.auth_token.clone()),
            ("Content-Type", "application/json".to_owned()),
            ("Origin", ORIGIN.to_owned()),
            ("Referer", REFERER.to_owned()),
            ("User-Agent", user_agent),
        ]
    }
}

//! One authenticated session against the Copper developer API.
//!
//! # Design
//! A `Connection` owns a ureq `Agent`, the session headers derived from the
//! account credentials, a swappable `Cache`, and a rate limiter. The agent
//! is configured with `http_status_as_error(false)` so 4xx/5xx come back as
//! plain `Response` data; only transport failures are `Err`.
//!
//! `get` and `delete` carry the cache-aware behavior (read-through and
//! invalidation respectively); the other verbs forward straight to
//! `request`.

use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::debug;
use ureq::Agent;
use url::Url;

use crate::cache::{Cache, InMemoryCache};
use crate::error::Error;
use crate::http::{Method, Response};

/// Default API root. The version segment is appended per connection.
pub const DEFAULT_URL: &str = "https://api.prosperworks.com/developer_api/";

/// Default rate budget, in calls per minute. Zero disables limiting.
pub const DEFAULT_RATE_LIMIT: u32 = 600;

/// API version segment appended to the base URL.
pub const DEFAULT_VERSION: &str = "v1";

/// Freshness window for GET responses stored in the cache.
const GET_FRESHNESS: Duration = Duration::from_secs(300);

/// Account credentials for the developer API.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub token: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            token: token.into(),
        }
    }
}

/// Construction parameters for a `Connection`.
///
/// Everything has a sensible default; override with struct-update syntax:
///
/// ```
/// use copper_core::connection::ConnectOptions;
///
/// let options = ConnectOptions {
///     rate_limit: 0,
///     ..ConnectOptions::default()
/// };
/// assert_eq!(options.name, "default");
/// ```
pub struct ConnectOptions {
    pub url: String,
    pub name: String,
    pub version: String,
    /// Cache implementation; `None` selects `InMemoryCache`.
    pub cache: Option<Box<dyn Cache>>,
    /// Calls per minute; 0 disables rate limiting.
    pub rate_limit: u32,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            name: crate::registry::DEFAULT_CONNECTION_NAME.to_string(),
            version: DEFAULT_VERSION.to_string(),
            cache: None,
            rate_limit: DEFAULT_RATE_LIMIT,
        }
    }
}

/// Enforces a minimum spacing between outbound calls.
///
/// The whole check-sleep-record sequence runs under one mutex owned by the
/// connection, so two racing callers cannot both observe a stale last-call
/// time and both skip sleeping.
struct RateLimiter {
    min_interval: Option<Duration>,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    fn new(calls_per_minute: u32) -> Self {
        let min_interval =
            (calls_per_minute > 0).then(|| Duration::from_secs_f64(60.0 / f64::from(calls_per_minute)));
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// Block the calling thread until the spacing requirement is satisfied,
    /// then record now as the last call time.
    fn acquire(&self) {
        let Some(min_interval) = self.min_interval else {
            return;
        };
        let mut last_call = self.last_call.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(last) = *last_call {
            let elapsed = last.elapsed();
            if elapsed < min_interval {
                let wait = min_interval - elapsed;
                debug!(?wait, "enforcing rate limit");
                thread::sleep(wait);
            }
        }
        // Recorded before the request goes out, not after it returns: the
        // round-trip time is not counted, so the achieved rate undershoots
        // the budget rather than exceeding it.
        *last_call = Some(Instant::now());
    }
}

/// An authenticated, rate-limited, caching session against the Copper API.
///
/// Safe to share between threads behind an `Arc`; every verb method takes
/// `&self`.
pub struct Connection {
    name: String,
    email: String,
    base_url: Url,
    api_url: Url,
    agent: Agent,
    headers: Vec<(String, String)>,
    cache: Box<dyn Cache>,
    limiter: RateLimiter,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("base_url", &self.base_url)
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Build a connection from credentials and options. The URL must already
    /// have passed `registry::validate_url`; parse failures still surface as
    /// `Configuration` errors.
    pub fn new(credentials: Credentials, options: ConnectOptions) -> Result<Self, Error> {
        let mut base_url = Url::parse(&options.url)
            .map_err(|e| Error::Configuration(format!("invalid API URL `{}`: {e}", options.url)))?;
        // A trailing slash makes relative joins append instead of replacing
        // the last path segment.
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }
        let api_url = base_url
            .join(&format!("{}/", options.version))
            .map_err(|e| Error::Configuration(format!("cannot append version segment: {e}")))?;

        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();

        Ok(Self {
            name: options.name,
            headers: session_headers(&credentials),
            email: credentials.email,
            base_url,
            api_url,
            agent,
            cache: options.cache.unwrap_or_else(|| Box::new(InMemoryCache::new())),
            limiter: RateLimiter::new(options.rate_limit),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// Resolve a caller-supplied `path` against this connection's API URL.
    /// A relative path appends; an absolute path resets to the host root.
    pub fn build_absolute_url(&self, path: &str) -> Result<Url, Error> {
        self.api_url.join(path).map_err(|e| {
            Error::Configuration(format!("cannot resolve `{path}` against `{}`: {e}", self.api_url))
        })
    }

    /// Send one HTTP request, gated by the rate limiter.
    ///
    /// Every status comes back as `Ok(Response)`; only transport-level
    /// failures are `Err`.
    pub fn request(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Response, Error> {
        self.limiter.acquire();
        self.execute(method, url, body)
    }

    /// GET with read-through caching. A hit skips the network and the rate
    /// limiter entirely; a miss fetches and stores the response for five
    /// minutes.
    pub fn get(&self, url: &str) -> Result<Response, Error> {
        if let Some(cached) = self.cache.get(url) {
            debug!(url, "serving GET from cache");
            return Ok(cached);
        }
        let response = self.request(Method::Get, url, None)?;
        self.cache.set(url, response.clone(), GET_FRESHNESS);
        Ok(response)
    }

    /// DELETE, invalidating the cache entry for `url` when the server
    /// confirms the deletion. A failed delete leaves the cache untouched.
    pub fn delete(&self, url: &str) -> Result<Response, Error> {
        let response = self.request(Method::Delete, url, None)?;
        if response.ok() {
            debug!(url, "invalidating cache entry after DELETE");
            self.cache.clear(url);
        }
        Ok(response)
    }

    pub fn post(&self, url: &str, body: &Value) -> Result<Response, Error> {
        self.request(Method::Post, url, Some(body))
    }

    pub fn put(&self, url: &str, body: &Value) -> Result<Response, Error> {
        self.request(Method::Put, url, Some(body))
    }

    pub fn patch(&self, url: &str, body: &Value) -> Result<Response, Error> {
        self.request(Method::Patch, url, Some(body))
    }

    pub fn options(&self, url: &str) -> Result<Response, Error> {
        self.request(Method::Options, url, None)
    }

    fn execute(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Response, Error> {
        let payload = match body {
            Some(value) => serde_json::to_vec(value)?,
            None => Vec::new(),
        };

        let mut builder = ureq::http::Request::builder().method(method.as_str()).uri(url);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let request = builder
            .body(payload.as_slice())
            .map_err(|e| Error::Configuration(format!("cannot build {} {url}: {e}", method.as_str())))?;

        let mut response = self.agent.run(request)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.body_mut().read_to_string()?;

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

/// Fixed headers bound to the session for the connection's lifetime.
fn session_headers(credentials: &Credentials) -> Vec<(String, String)> {
    vec![
        ("X-PW-Application".to_string(), "developer_api".to_string()),
        ("X-PW-AccessToken".to_string(), credentials.token.clone()),
        ("X-PW-UserEmail".to_string(), credentials.email.clone()),
        ("Accept".to_string(), "application/json".to_string()),
        ("Content-Type".to_string(), "application/json".to_string()),
    ]
}

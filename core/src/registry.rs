//! Named table of live connections.
//!
//! # Design
//! The registry is an explicit value with a controlled lifecycle rather than
//! process-global state: applications construct one `Registry`, share it
//! behind an `Arc`, and tests create isolated registries instead of mutating
//! shared globals between cases. Exactly one connection may be registered
//! per name at a time; `reset` drops everything.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;
use url::Url;

use crate::connection::{ConnectOptions, Connection, Credentials};
use crate::error::Error;

/// Name used when the caller does not argue one.
pub const DEFAULT_CONNECTION_NAME: &str = "default";

/// Process-lifetime mapping from name to connection.
pub struct Registry {
    connections: Mutex<HashMap<String, Arc<Connection>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Create and register a connection under `options.name`.
    ///
    /// The URL is validated before anything is stored. Registering a name
    /// that is already taken fails with a `Configuration` error naming the
    /// account that holds it, so operators can diagnose the conflict. The
    /// check-and-insert runs under one lock: of two concurrent registrations
    /// for the same name, exactly one wins.
    pub fn connect(
        &self,
        credentials: Credentials,
        options: ConnectOptions,
    ) -> Result<Arc<Connection>, Error> {
        validate_url(&options.url)?;

        let mut connections = self.connections.lock().unwrap_or_else(|e| e.into_inner());
        match connections.entry(options.name.clone()) {
            Entry::Occupied(existing) => Err(Error::Configuration(format!(
                "`{}` is already connected using account \"{}\"",
                options.name,
                existing.get().email()
            ))),
            Entry::Vacant(slot) => {
                let connection = Arc::new(Connection::new(credentials, options)?);
                debug!(name = connection.name(), "registered connection");
                slot.insert(Arc::clone(&connection));
                Ok(connection)
            }
        }
    }

    /// Fetch a previously registered connection by name.
    pub fn get(&self, name: &str) -> Result<Arc<Connection>, Error> {
        let connections = self.connections.lock().unwrap_or_else(|e| e.into_inner());
        connections.get(name).cloned().ok_or_else(|| {
            if name == DEFAULT_CONNECTION_NAME {
                Error::Configuration(
                    "there is no default connection; first call connect(...)".to_string(),
                )
            } else {
                Error::Configuration(format!(
                    "there is no connection named \"{name}\"; first call connect(..., name=\"{name}\")"
                ))
            }
        })
    }

    /// Drop every registered connection. Intended for test lifecycles.
    pub fn reset(&self) {
        self.connections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject URLs the API cannot be reached under.
///
/// The URL must carry an http/https scheme and a hostname, and must not
/// already contain a version path segment: the connection appends its own,
/// and a double-versioned URL would silently hit the wrong endpoints.
pub fn validate_url(url: &str) -> Result<(), Error> {
    let parsed = Url::parse(url).map_err(|_| {
        Error::Configuration(format!("API URL `{url}` must include a scheme (http, https)"))
    })?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(Error::Configuration(format!(
                "API URL `{url}` must use http or https, not `{other}`"
            )))
        }
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(Error::Configuration(format!(
            "API URL `{url}` must include a hostname"
        )));
    }
    if has_version_segment(url) {
        return Err(Error::Configuration(format!(
            "API URL `{url}` should not include a \"version\" path segment"
        )));
    }
    Ok(())
}

/// True if the URL contains `/v<digit>` anywhere.
fn has_version_segment(url: &str) -> bool {
    url.as_bytes()
        .windows(3)
        .any(|w| w[0] == b'/' && w[1] == b'v' && w[2].is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://api.example.com/developer_api/";

    fn credentials() -> Credentials {
        Credentials::new("ops@example.com", "secret")
    }

    fn options(name: &str) -> ConnectOptions {
        ConnectOptions {
            url: URL.to_string(),
            name: name.to_string(),
            ..ConnectOptions::default()
        }
    }

    #[test]
    fn connect_then_get_returns_the_same_connection() {
        let registry = Registry::new();
        let connected = registry.connect(credentials(), options("default")).unwrap();
        let fetched = registry.get("default").unwrap();
        assert!(Arc::ptr_eq(&connected, &fetched));
    }

    #[test]
    fn duplicate_name_is_rejected_and_names_the_holder() {
        let registry = Registry::new();
        registry.connect(credentials(), options("default")).unwrap();
        let err = registry
            .connect(Credentials::new("other@example.com", "t"), options("default"))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("already connected"), "{message}");
        assert!(message.contains("ops@example.com"), "{message}");
    }

    #[test]
    fn unknown_default_name_suggests_connecting_first() {
        let err = Registry::new().get("default").unwrap_err();
        assert!(err.to_string().contains("no default connection"));
    }

    #[test]
    fn unknown_custom_name_is_echoed_back() {
        let err = Registry::new().get("sandbox").unwrap_err();
        assert!(err.to_string().contains("\"sandbox\""));
    }

    #[test]
    fn reset_forgets_registered_connections() {
        let registry = Registry::new();
        registry.connect(credentials(), options("default")).unwrap();
        registry.reset();
        assert!(registry.get("default").is_err());
        // The name is free again.
        registry.connect(credentials(), options("default")).unwrap();
    }

    #[test]
    fn concurrent_registration_admits_exactly_one_winner() {
        let registry = Registry::new();
        let outcomes: Vec<bool> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let registry = &registry;
                    scope.spawn(move || registry.connect(credentials(), options("shared")).is_ok())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
    }

    #[test]
    fn valid_url_is_accepted() {
        assert!(validate_url("https://api.example.com/developer_api/").is_ok());
        assert!(validate_url("http://127.0.0.1:3000/").is_ok());
    }

    #[test]
    fn url_without_scheme_is_rejected() {
        let err = validate_url("api.example.com").unwrap_err();
        assert!(err.to_string().contains("scheme"));
    }

    #[test]
    fn non_http_scheme_is_rejected() {
        assert!(validate_url("ftp://api.example.com/").is_err());
    }

    #[test]
    fn version_segment_is_rejected() {
        let err = validate_url("https://api.example.com/developer_api/v2/").unwrap_err();
        assert!(err.to_string().contains("version"));
    }

    #[test]
    fn version_like_hostnames_are_fine() {
        // `v` followed by a digit only matters as a path segment.
        assert!(validate_url("https://vault9.example.com/api/").is_ok());
    }
}

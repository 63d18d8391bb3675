//! Synchronous client core for the Copper (ProsperWorks) developer API.
//!
//! # Overview
//! Applications register credentials with a [`Registry`], obtain a
//! [`Connection`] by name, and call its verb methods with URLs built via
//! [`Connection::build_absolute_url`]. The connection enforces the API's
//! rate budget, serves repeated GETs from a pluggable [`Cache`], and
//! invalidates cached entries when a DELETE succeeds. Raw JSON responses
//! are converted to and from typed records by a [`Schema`].
//!
//! # Design
//! - Blocking I/O on the calling thread; any number of threads may share a
//!   connection behind an `Arc`.
//! - HTTP failure statuses are data, not errors: every status comes back as
//!   a [`Response`], and only transport failures are `Err`.
//! - The registry is an explicit value, not process-global state, so tests
//!   get isolated registries for free.

pub mod cache;
pub mod connection;
pub mod error;
pub mod http;
pub mod registry;
pub mod schema;

pub use cache::{Cache, InMemoryCache, NoOpCache};
pub use connection::{ConnectOptions, Connection, Credentials, DEFAULT_RATE_LIMIT, DEFAULT_URL};
pub use error::Error;
pub use http::{Method, Response};
pub use registry::{validate_url, Registry, DEFAULT_CONNECTION_NAME};
pub use schema::{DumpSource, Field, FieldType, FieldValue, Record, Schema};

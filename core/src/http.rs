//! HTTP plain-data types shared by the connection and cache layers.
//!
//! # Design
//! `Response` is owned plain data (`String` body, `Vec` headers) rather than
//! a live transport handle, so it can be cloned into and out of the cache
//! freely and compared in tests. Status interpretation is left to callers:
//! a 404 is a perfectly good `Response`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The closed set of HTTP verbs the Copper API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
        }
    }
}

/// An HTTP response described as plain data.
///
/// Returned by `Connection` verb methods for every status, success or
/// failure; only transport-level problems surface as `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Response {
    /// True for 2xx statuses.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Translate this response into a hard `Error::Api`.
    ///
    /// The connection layer never does this itself; resource-level callers
    /// decide which failure statuses are fatal.
    pub fn api_error(&self) -> Error {
        Error::Api {
            status: self.status,
            body: self.body.clone(),
        }
    }
}

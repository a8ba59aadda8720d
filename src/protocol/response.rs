//! Response definitions
//!
//! Represents responses sent back to clients, and the typed results the
//! client derives from them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name the server sends when it has no real filename to offer
pub const PLACEHOLDER_NAME: &str = "NullName";

/// A decoded response body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// Server-suggested filename (IMAGE/VIDEO responses only)
    pub filename: Option<String>,

    /// Response data
    pub data: Vec<u8>,
}

impl Response {
    /// Create a data-only response (LOGIN, GET_BY_HASH)
    pub fn data(data: Vec<u8>) -> Self {
        Self {
            filename: None,
            data,
        }
    }

    /// Create a named response (IMAGE, VIDEO)
    pub fn named(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: Some(filename.into()),
            data,
        }
    }

    /// Create a failed generation response: placeholder name, no data
    pub fn empty_named() -> Self {
        Self::named(PLACEHOLDER_NAME, Vec::new())
    }

    /// Create an application-level error body (`ERROR_*` text)
    pub fn error(message: &str) -> Self {
        Self::data(message.as_bytes().to_vec())
    }
}

/// Outcome of a LOGIN exchange
///
/// `server_reachable = false` means the exchange itself failed, as opposed
/// to the server rejecting the credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginResult {
    pub authenticated: bool,
    pub server_reachable: bool,
}

impl LoginResult {
    pub fn accepted() -> Self {
        Self {
            authenticated: true,
            server_reachable: true,
        }
    }

    pub fn rejected() -> Self {
        Self {
            authenticated: false,
            server_reachable: true,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            authenticated: false,
            server_reachable: false,
        }
    }
}

/// LOGIN request body: `{"u": ..., "p": ...}`
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    #[serde(rename = "u")]
    pub username: String,

    #[serde(rename = "p")]
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Keep passwords out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

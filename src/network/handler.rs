//! Request Handlers
//!
//! Server-side dispatch for the stub server. `StubHandler` answers the
//! four commands the way the reference generation server does, with
//! canned artifacts standing in for real model generation.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::protocol::{
    decode_credentials, decode_image_batch, encode_login_result, CommandType, LoginResult,
    Request, Response,
};

/// Answers decoded requests
pub trait RequestHandler: Send + Sync + 'static {
    fn handle(&self, request: &Request) -> Response;
}

/// Adapts a closure into a [`RequestHandler`]
pub struct HandlerFn<F>(pub F);

impl<F> RequestHandler for HandlerFn<F>
where
    F: Fn(&Request) -> Response + Send + Sync + 'static,
{
    fn handle(&self, request: &Request) -> Response {
        (self.0)(request)
    }
}

/// A stored model, addressable by its hash
#[derive(Debug, Clone)]
struct StoredArtifact {
    hash: String,
    data: Vec<u8>,
}

/// In-memory stand-in for the generation server
#[derive(Default)]
pub struct StubHandler {
    /// username -> password
    accounts: RwLock<HashMap<String, String>>,

    /// hash -> model bytes
    store: RwLock<HashMap<String, Vec<u8>>>,

    /// Returned for IMAGE requests
    image_artifact: RwLock<Option<StoredArtifact>>,

    /// Returned for VIDEO requests
    video_artifact: RwLock<Option<StoredArtifact>>,
}

impl StubHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account accepted by LOGIN
    pub fn with_account(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.accounts.write().insert(username.into(), password.into());
        self
    }

    /// Store a model retrievable with GET_BY_HASH
    pub fn with_artifact(self, hash: impl Into<String>, data: Vec<u8>) -> Self {
        self.store.write().insert(hash.into(), data);
        self
    }

    /// Model returned (and stored) for IMAGE requests
    pub fn with_image_result(self, hash: impl Into<String>, data: Vec<u8>) -> Self {
        *self.image_artifact.write() = Some(StoredArtifact {
            hash: hash.into(),
            data,
        });
        self
    }

    /// Model returned (and stored) for VIDEO requests
    pub fn with_video_result(self, hash: impl Into<String>, data: Vec<u8>) -> Self {
        *self.video_artifact.write() = Some(StoredArtifact {
            hash: hash.into(),
            data,
        });
        self
    }

    fn login(&self, payload: &[u8]) -> Response {
        let result = match decode_credentials(payload) {
            Ok(creds) if !creds.username.is_empty() && !creds.password.is_empty() => {
                let accounts = self.accounts.read();
                match accounts.get(&creds.username) {
                    Some(password) if *password == creds.password => LoginResult::accepted(),
                    _ => LoginResult::rejected(),
                }
            }
            Ok(_) => LoginResult::unreachable(),
            Err(e) => {
                tracing::warn!("Unparsable LOGIN body: {}", e);
                LoginResult::unreachable()
            }
        };
        Response::data(encode_login_result(result))
    }

    fn generate(&self, artifact: &RwLock<Option<StoredArtifact>>) -> Response {
        match artifact.read().as_ref() {
            Some(stored) => {
                self.store
                    .write()
                    .insert(stored.hash.clone(), stored.data.clone());
                Response::named(format!("{}.glb", stored.hash), stored.data.clone())
            }
            None => Response::empty_named(),
        }
    }

    fn images(&self, payload: &[u8]) -> Response {
        match decode_image_batch(payload) {
            Ok(images) if !images.is_empty() => {
                tracing::debug!("Processing {} images", images.len());
                self.generate(&self.image_artifact)
            }
            Ok(_) => {
                tracing::warn!("IMAGE request with zero images");
                Response::empty_named()
            }
            Err(e) => {
                tracing::warn!("Invalid IMAGE payload: {}", e);
                Response::empty_named()
            }
        }
    }

    fn video(&self, payload: &[u8]) -> Response {
        tracing::debug!("Processing video ({} bytes)", payload.len());
        self.generate(&self.video_artifact)
    }

    fn get_by_hash(&self, payload: &[u8]) -> Response {
        let hash = String::from_utf8_lossy(payload);
        let hash = hash.trim();
        if hash.is_empty() {
            return Response::error("ERROR_INVALID_HASH");
        }
        match self.store.read().get(hash) {
            Some(data) => Response::data(data.clone()),
            None => Response::error("ERROR_HASH_NOT_FOUND"),
        }
    }
}

impl RequestHandler for StubHandler {
    fn handle(&self, request: &Request) -> Response {
        match request.command {
            CommandType::Login => self.login(&request.payload),
            CommandType::Image => self.images(&request.payload),
            CommandType::Video => self.video(&request.payload),
            CommandType::GetByHash => self.get_by_hash(&request.payload),
        }
    }
}

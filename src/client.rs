//! Protocol Client
//!
//! The caller-facing surface: login, image and video uploads, and fetching
//! a previously generated model by hash.
//!
//! ## Call sequence
//! Every operation is one blocking round trip:
//! open socket → write header + payload → read response → close socket.
//! The endpoint is snapshotted when a call starts, so changing it only
//! affects later calls.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::artifact::{synthesize_filename, ArtifactHandle, Clock, SystemClock};
use crate::config::ClientConfig;
use crate::error::{Result, TwinError};
use crate::network::{Connection, Endpoint};
use crate::protocol::{
    decode_login_result, encode_credentials, encode_image_batch, error_sentinel, CommandType,
    Credentials, LoginResult, Request, Response,
};

/// Blocking client for the generation server
pub struct ProtocolClient {
    /// Host and port used by the next call
    endpoint: RwLock<Endpoint>,

    /// Decorates generated filenames; only sent during login
    username: RwLock<String>,

    config: ClientConfig,
    clock: Arc<dyn Clock>,
}

impl ProtocolClient {
    /// Create a client using the system clock
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a client with a custom filename clock
    pub fn with_clock(config: ClientConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            endpoint: RwLock::new(Endpoint::new(config.host.clone(), config.port)),
            username: RwLock::new(config.username.clone()),
            config,
            clock,
        })
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Point subsequent calls at a different server
    pub fn set_endpoint(&self, host: impl Into<String>, port: u16) {
        *self.endpoint.write() = Endpoint::new(host, port);
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint.read().clone()
    }

    /// Set the name used in generated filenames; empty names are ignored
    pub fn set_current_username(&self, username: &str) {
        if !username.is_empty() {
            *self.username.write() = username.to_string();
        }
    }

    pub fn current_username(&self) -> String {
        self.username.read().clone()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Authenticate, collapsing every failure into "server unreachable"
    ///
    /// `{authenticated: false, server_reachable: true}` means the
    /// credentials were rejected; `server_reachable: false` means the
    /// exchange itself failed.
    pub fn login(&self, username: &str, password: &str) -> LoginResult {
        match self.try_login(username, password) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Login for {} failed: {}", username, e);
                LoginResult::unreachable()
            }
        }
    }

    /// Authenticate, surfacing the underlying error
    pub fn try_login(&self, username: &str, password: &str) -> Result<LoginResult> {
        let payload = encode_credentials(&Credentials::new(username, password))?;
        let response = self.send(CommandType::Login, payload)?;
        let result = decode_login_result(&response.data)?;

        if result.authenticated {
            *self.username.write() = username.to_string();
        }
        tracing::debug!(
            authenticated = result.authenticated,
            server_reachable = result.server_reachable,
            "Login response for {}",
            username
        );
        Ok(result)
    }

    /// Upload images, in order, for model generation
    pub fn upload_images<B: AsRef<[u8]>>(&self, images: &[B]) -> Result<ArtifactHandle> {
        let payload = encode_image_batch(images)?;
        let response = self.send(CommandType::Image, payload)?;
        self.named_artifact(response)
    }

    /// Upload one video for model generation
    ///
    /// Takes ownership so the bytes go on the wire without another copy.
    pub fn upload_video(&self, video: Vec<u8>) -> Result<ArtifactHandle> {
        let response = self.send(CommandType::Video, video)?;
        self.named_artifact(response)
    }

    /// Fetch a previously generated model by its hash
    pub fn fetch_by_hash(&self, hash: &str) -> Result<ArtifactHandle> {
        let response = self.send(CommandType::GetByHash, hash.as_bytes().to_vec())?;

        if let Some(message) = error_sentinel(&response.data) {
            return Err(TwinError::ServerError(message));
        }
        if response.data.is_empty() {
            return Err(TwinError::EmptyResponse);
        }

        let suggested = format!("{}.glb", hash);
        let filename = self.filename_for(Some(suggested.as_str()));
        Ok(ArtifactHandle::new(response.data, filename))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn named_artifact(&self, response: Response) -> Result<ArtifactHandle> {
        if response.data.is_empty() {
            return Err(TwinError::EmptyResponse);
        }
        let filename = self.filename_for(response.filename.as_deref());
        Ok(ArtifactHandle::new(response.data, filename))
    }

    fn filename_for(&self, suggested: Option<&str>) -> String {
        let username = self.username.read().clone();
        synthesize_filename(suggested, &username, self.clock.now_millis())
    }

    /// One full round trip on a fresh connection
    fn send(&self, command: CommandType, payload: Vec<u8>) -> Result<Response> {
        let endpoint = self.endpoint();
        let request = Request::new(command, payload);

        tracing::debug!(
            command = command.name(),
            payload_len = request.payload.len(),
            "Sending request to {}",
            endpoint
        );

        // Dropped on every return path, which closes the socket
        let mut connection = Connection::open(
            &endpoint,
            self.config.connect_timeout(),
            self.config.io_timeout(),
        )?;
        connection.exchange(&request)
    }
}

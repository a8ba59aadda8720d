//! Server Session
//!
//! Handles individual client connections on the stub server.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, TwinError};
use crate::network::RequestHandler;
use crate::protocol::{read_request, write_response};

/// Serves requests from a single client connection
pub struct Session {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Answers decoded requests
    handler: Arc<dyn RequestHandler>,

    /// Largest request body accepted
    max_request_size: usize,

    /// Peer address for logging
    peer_addr: String,
}

impl Session {
    /// Create a new session
    pub fn new(
        stream: TcpStream,
        handler: Arc<dyn RequestHandler>,
        max_request_size: usize,
    ) -> Result<Self> {
        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            handler,
            max_request_size,
            peer_addr,
        })
    }

    /// Configure session timeouts (0 leaves a timeout disabled)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Serve requests until the client disconnects or an error occurs
    pub fn run(&mut self) -> Result<()> {
        tracing::debug!("Session started for {}", self.peer_addr);

        loop {
            let request = match read_request(&mut self.reader, self.max_request_size) {
                Ok(Some(request)) => request,
                Ok(None) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(e @ TwinError::ShortRead { .. }) => {
                    tracing::warn!("Incomplete request from {}: {}", self.peer_addr, e);
                    return Ok(());
                }
                Err(e) => {
                    // Framing errors leave the stream desynchronized
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            };

            tracing::info!(
                command = request.command.name(),
                payload_len = request.payload.len(),
                "Request received from {}",
                self.peer_addr
            );

            let response = self.handler.handle(&request);

            if let Err(e) = write_response(
                &mut self.writer,
                request.command.response_shape(),
                &response,
            ) {
                if e.is_transport_failure() {
                    tracing::debug!(
                        "Client {} disconnected before response could be sent: {}",
                        self.peer_addr,
                        e
                    );
                    return Ok(());
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

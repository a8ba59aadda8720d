//! Client Connection
//!
//! One short-lived TCP connection carrying exactly one request/response
//! exchange. The socket is shut down and released when the `Connection`
//! is dropped, on success and error paths alike.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{Result, TwinError};
use crate::protocol::{read_response, write_request, Request, Response};

/// Host and port of the generation server
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    fn resolve(&self) -> Result<Vec<SocketAddr>> {
        let addrs: Vec<SocketAddr> = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| TwinError::Connection(format!("failed to resolve {}: {}", self, e)))?
            .collect();
        if addrs.is_empty() {
            return Err(TwinError::Connection(format!(
                "no addresses found for {}",
                self
            )));
        }
        Ok(addrs)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A single client connection to the server
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Open a connection, trying each resolved address in turn
    pub fn open(
        endpoint: &Endpoint,
        connect_timeout: Duration,
        io_timeout: Duration,
    ) -> Result<Self> {
        let mut last_error = None;

        for addr in endpoint.resolve()? {
            match TcpStream::connect_timeout(&addr, connect_timeout) {
                Ok(stream) => return Self::from_stream(stream, io_timeout),
                Err(e) => {
                    tracing::debug!("Connect to {} failed: {}", addr, e);
                    last_error = Some(e);
                }
            }
        }

        Err(TwinError::Connection(match last_error {
            Some(e) => format!("failed to connect to {}: {}", endpoint, e),
            None => format!("failed to connect to {}", endpoint),
        }))
    }

    /// Wrap an already connected stream
    ///
    /// Sets up buffered I/O and configures timeouts
    pub fn from_stream(stream: TcpStream, io_timeout: Duration) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        let setup = |stream: &TcpStream| -> std::io::Result<TcpStream> {
            stream.set_nodelay(true)?;
            stream.set_read_timeout(Some(io_timeout))?;
            stream.set_write_timeout(Some(io_timeout))?;
            stream.try_clone()
        };
        let read_stream = setup(&stream)
            .map_err(|e| TwinError::from_transport("failed to configure socket", e))?;

        tracing::debug!("Connection opened to {}", peer_addr);

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            peer_addr,
        })
    }

    /// Send one request and read its response
    pub fn exchange(&mut self, request: &Request) -> Result<Response> {
        write_request(&mut self.writer, request)?;

        let response = read_response(&mut self.reader, request.command.response_shape())?;

        tracing::debug!(
            command = request.command.name(),
            sent = request.payload.len(),
            received = response.data.len(),
            "Exchange with {} complete",
            self.peer_addr
        );
        Ok(response)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // Already-closed sockets report NotConnected here
        let _ = self.writer.get_ref().shutdown(Shutdown::Both);
        tracing::trace!("Connection to {} closed", self.peer_addr);
    }
}

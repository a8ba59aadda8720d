//! TCP Server
//!
//! Accepts connections and dispatches them to a fixed pool of worker
//! threads over a crossbeam channel.

use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel;
use parking_lot::Mutex;

use crate::config::ServerConfig;
use crate::error::{Result, TwinError};
use crate::network::{RequestHandler, Session};

/// Stub TCP server speaking the Twiniverse protocol
pub struct Server {
    config: ServerConfig,
    listener: TcpListener,
    handler: Arc<dyn RequestHandler>,
    shutdown: Arc<AtomicBool>,
    sessions: Arc<ActiveSessions>,
}

impl Server {
    /// Bind the listen address from `config`
    pub fn bind(config: ServerConfig, handler: Arc<dyn RequestHandler>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            TwinError::Config(format!("failed to bind {}: {}", config.listen_addr, e))
        })?;

        Ok(Self {
            config,
            listener,
            handler,
            shutdown: Arc::new(AtomicBool::new(false)),
            sessions: Arc::new(ActiveSessions::default()),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle that stops the accept loop from another thread
    pub fn shutdown_handle(&self) -> Result<ShutdownHandle> {
        Ok(ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            addr: self.local_addr()?,
        })
    }

    /// Start the server (blocking until shutdown)
    pub fn run(self) -> Result<()> {
        let workers = self.config.workers.max(1);
        let (tx, rx) = channel::bounded::<(u64, TcpStream)>(workers * 4);

        let mut pool = Vec::with_capacity(workers);
        for id in 0..workers {
            let rx = rx.clone();
            let handler = Arc::clone(&self.handler);
            let config = self.config.clone();
            let sessions = Arc::clone(&self.sessions);

            let worker = thread::Builder::new()
                .name(format!("twiniverse-worker-{}", id))
                .spawn(move || {
                    for (session_id, stream) in rx.iter() {
                        serve(stream, Arc::clone(&handler), &config);
                        sessions.remove(session_id);
                    }
                })?;
            pool.push(worker);
        }
        drop(rx);

        tracing::info!(
            "Listening on {} with {} workers",
            self.local_addr()?,
            workers
        );

        for stream in self.listener.incoming() {
            if self.shutdown.load(Ordering::Acquire) {
                break;
            }
            match stream {
                Ok(stream) => {
                    let session_id = match self.sessions.register(&stream) {
                        Ok(id) => id,
                        Err(e) => {
                            tracing::warn!("Failed to track connection: {}", e);
                            continue;
                        }
                    };
                    if tx.send((session_id, stream)).is_err() {
                        tracing::error!("Worker pool is gone, stopping accept loop");
                        break;
                    }
                }
                Err(e) => tracing::warn!("Accept failed: {}", e),
            }
        }

        // Unblock sessions still waiting on idle clients
        self.sessions.shutdown_all();
        drop(tx);
        for worker in pool {
            if worker.join().is_err() {
                tracing::error!("Worker thread panicked");
            }
        }

        tracing::info!("Server stopped");
        Ok(())
    }

    /// Run the server on a background thread
    pub fn spawn(self) -> Result<RunningServer> {
        let addr = self.local_addr()?;
        let shutdown = self.shutdown_handle()?;
        let thread = thread::Builder::new()
            .name("twiniverse-acceptor".to_string())
            .spawn(move || self.run())?;

        Ok(RunningServer {
            addr,
            shutdown,
            thread: Some(thread),
        })
    }
}

fn serve(stream: TcpStream, handler: Arc<dyn RequestHandler>, config: &ServerConfig) {
    let mut session = match Session::new(stream, handler, config.max_request_size) {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!("Failed to set up session: {}", e);
            return;
        }
    };
    if let Err(e) = session.set_timeouts(config.read_timeout_ms, config.write_timeout_ms) {
        tracing::warn!("Failed to set timeouts for {}: {}", session.peer_addr(), e);
        return;
    }
    if let Err(e) = session.run() {
        tracing::warn!("Session with {} ended with error: {}", session.peer_addr(), e);
    }
}

/// Sockets of connections accepted and not yet finished
#[derive(Default)]
struct ActiveSessions {
    next_id: AtomicU64,
    streams: Mutex<HashMap<u64, TcpStream>>,
}

impl ActiveSessions {
    fn register(&self, stream: &TcpStream) -> io::Result<u64> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.streams.lock().insert(id, stream.try_clone()?);
        Ok(id)
    }

    fn remove(&self, id: u64) {
        self.streams.lock().remove(&id);
    }

    fn shutdown_all(&self) {
        let streams = std::mem::take(&mut *self.streams.lock());
        if !streams.is_empty() {
            tracing::debug!("Closing {} open connections", streams.len());
        }
        for stream in streams.values() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

/// Stops a running server's accept loop
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    addr: SocketAddr,
}

impl ShutdownHandle {
    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        if self.flag.swap(true, Ordering::AcqRel) {
            return;
        }
        // Wake the blocking accept() so it observes the flag
        let mut wake = self.addr;
        if wake.ip().is_unspecified() {
            wake.set_ip(match wake.ip() {
                IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
                IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::LOCALHOST),
            });
        }
        if let Err(e) = TcpStream::connect(wake) {
            tracing::debug!("Shutdown wake-up connect failed: {}", e);
        }
    }
}

/// A server running on a background thread; shuts down on drop
pub struct RunningServer {
    addr: SocketAddr,
    shutdown: ShutdownHandle,
    thread: Option<JoinHandle<Result<()>>>,
}

impl RunningServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop the server and wait for the accept loop and workers to exit
    pub fn stop(mut self) -> Result<()> {
        self.stop_inner()
    }

    fn stop_inner(&mut self) -> Result<()> {
        self.shutdown.shutdown();
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| {
                TwinError::Io(io::Error::new(io::ErrorKind::Other, "server thread panicked"))
            })?,
            None => Ok(()),
        }
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        if let Err(e) = self.stop_inner() {
            tracing::warn!("Server shutdown failed: {}", e);
        }
    }
}

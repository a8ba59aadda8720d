//! Network Module
//!
//! TCP plumbing for both ends of the protocol.
//!
//! ## Architecture
//! - Client: one `Connection` per call, closed on drop
//! - Stub server: single acceptor thread, worker pool fed over a channel,
//!   requests routed through a `RequestHandler`

mod connection;
mod handler;
mod server;
mod session;

pub use connection::{Connection, Endpoint};
pub use handler::{HandlerFn, RequestHandler, StubHandler};
pub use server::{RunningServer, Server, ShutdownHandle};
pub use session::Session;

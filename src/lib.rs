//! Non-blocking WebSockets protocol engine for embedding in clients and servers.
//!
//! This library implements the framing and message rules of the
//! [WebSocket Protocol RFC](https://datatracker.ietf.org/doc/html/rfc6455)
//! without owning any I/O: bytes move only through callbacks supplied by the
//! host, so the engine drops into any event loop, reactor or coroutine
//! scheduler. It parses and serializes frames incrementally, enforces
//! fragmentation and masking rules, validates text payloads as UTF-8,
//! answers pings and drives the close handshake.
//!
//! The host implements [`EventHandler`] on top of its transport, wraps it in
//! a [`WebSocket`] for the client or server role, and pumps
//! [`WebSocket::recv`] and [`WebSocket::send`] whenever its transport is
//! ready; [`WebSocket::want_read`] and [`WebSocket::want_write`] tell the
//! host which readiness to wait for. The opening HTTP upgrade handshake,
//! TLS, and timers are left to the host.

mod buffer;
pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod frame;
pub mod message;
mod read;
pub mod session;
pub mod status;
mod utf8;
mod write;

pub use codec::FrameCodec;
pub use config::WebSocketConfig;
pub use context::{EventHandler, FrameStart, ReceivedMessage, WebSocket};
pub use error::Error;
pub use frame::{Frame, FrameIo, IoFlags, OpCode};
pub use message::FragmentedRead;
pub use session::{Role, Session};

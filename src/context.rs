use crate::codec::FrameCodec;
use crate::config::WebSocketConfig;
use crate::error::Error;
use crate::frame::{FrameIo, IoFlags, OpCode};
use crate::message::{FragmentedRead, InboundMessage};
use crate::session::{Role, Session};
use bytes::Bytes;

// Staging buffer for the fragmented send path; one source chunk is staged
// here and emitted as one frame.
pub(crate) const OUT_BUF_SIZE: usize = 4096;

/// Header fields of a frame that just started to arrive. Passed to
/// [`EventHandler::on_frame_recv_start`] once per frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameStart {
    pub fin: bool,
    pub rsv: u8,
    pub opcode: OpCode,
    pub payload_length: u64,
}

/// A completely received message.
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub rsv: u8,
    pub opcode: OpCode,
    /// The assembled payload. Empty for data messages when buffering is
    /// disabled; consume the per-chunk callback in that mode instead.
    pub payload: Bytes,
    /// Status code of a close message, 0 when the peer sent none. Unused for
    /// other opcodes.
    pub status_code: u16,
}

/// The host side of the engine: byte transport plus message notifications.
///
/// `recv`, `send` and `genmask` connect the engine to the host's transport
/// and follow the [`FrameIo`] contract; every `EventHandler` is usable as a
/// `FrameIo` through a blanket impl. The notification callbacks default to
/// no-ops. They receive the [`Session`] so a host can queue replies or shut
/// directions down from inside a callback; queued messages are picked up on
/// the next send pump iteration.
pub trait EventHandler {
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, Error>;

    fn send(&mut self, data: &[u8], flags: IoFlags) -> Result<usize, Error>;

    /// Produces a fresh mask key. Only clients need entropy here, so the
    /// default draws from the thread-local generator.
    fn genmask(&mut self, key: &mut [u8; 4]) -> Result<(), Error> {
        *key = rand::random::<[u8; 4]>();
        Ok(())
    }

    /// A new frame's header was parsed and validated.
    fn on_frame_recv_start(&mut self, _session: &mut Session, _frame: &FrameStart) {}

    /// A piece of the current frame's payload arrived. Chunks are delivered
    /// in order; masked payloads arrive already unmasked.
    fn on_frame_recv_chunk(&mut self, _session: &mut Session, _data: &[u8]) {}

    /// The current frame's payload is complete.
    fn on_frame_recv_end(&mut self, _session: &mut Session) {}

    /// A message finished assembling. Fires for every message including
    /// close, ping and pong; the automatic close echo and pong replies are
    /// queued before this runs.
    fn on_msg_recv(&mut self, _session: &mut Session, _msg: ReceivedMessage) {}
}

impl<H: EventHandler> FrameIo for H {
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        EventHandler::recv(self, buf)
    }

    fn send(&mut self, data: &[u8], flags: IoFlags) -> Result<usize, Error> {
        EventHandler::send(self, data, flags)
    }

    fn genmask(&mut self, key: &mut [u8; 4]) -> Result<(), Error> {
        EventHandler::genmask(self, key)
    }
}

/// A WebSocket protocol engine for one connection.
///
/// The engine owns no socket: bytes enter and leave through the handler's
/// transport callbacks, driven by the [`recv`](Self::recv) and
/// [`send`](Self::send) pumps. The host decides when to pump, typically from
/// an event loop using [`want_read`](Self::want_read) and
/// [`want_write`](Self::want_write) as interest flags.
pub struct WebSocket<H: EventHandler> {
    pub(crate) handler: H,
    pub(crate) codec: FrameCodec,
    pub(crate) session: Session,
    // Two assembly slots: slot 0 for the data message in progress, slot 1
    // for one control frame interleaved between its fragments.
    pub(crate) imsgs: [InboundMessage; 2],
    pub(crate) imsg_idx: usize,
    // Payload progress of the frame currently being received.
    pub(crate) ipayloadlen: u64,
    pub(crate) ipayloadoff: u64,
    // Staging state of the fragmented send path.
    pub(crate) obuf: [u8; OUT_BUF_SIZE],
    pub(crate) obufmark: usize,
    pub(crate) obuflimit: usize,
    // Payload progress of the frame currently being sent.
    pub(crate) opayloadlen: u64,
    pub(crate) opayloadoff: u64,
}

impl<H: EventHandler> WebSocket<H> {
    pub fn server(handler: H) -> Self {
        Self::with_config(Role::Server, handler, WebSocketConfig::default())
    }

    pub fn client(handler: H) -> Self {
        Self::with_config(Role::Client, handler, WebSocketConfig::default())
    }

    pub fn with_config(role: Role, handler: H, config: WebSocketConfig) -> Self {
        Self {
            handler,
            codec: FrameCodec::new(),
            session: Session::new(role, config),
            imsgs: [InboundMessage::new(), InboundMessage::new()],
            imsg_idx: 0,
            ipayloadlen: 0,
            ipayloadoff: 0,
            obuf: [0; OUT_BUF_SIZE],
            obufmark: 0,
            obuflimit: 0,
            opayloadlen: 0,
            opayloadoff: 0,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    // Queue operations and state queries, forwarded to the session so hosts
    // holding the engine do not need to go through session() every time.

    pub fn queue_msg(&mut self, opcode: OpCode, msg: Vec<u8>) -> Result<(), Error> {
        self.session.queue_msg(opcode, msg)
    }

    pub fn queue_fragmented_msg(
        &mut self,
        opcode: OpCode,
        source: Box<dyn FragmentedRead>,
    ) -> Result<(), Error> {
        self.session.queue_fragmented_msg(opcode, source)
    }

    pub fn queue_close(&mut self, status_code: u16, reason: &[u8]) -> Result<(), Error> {
        self.session.queue_close(status_code, reason)
    }

    pub fn want_read(&self) -> bool {
        self.session.want_read()
    }

    pub fn want_write(&self) -> bool {
        self.session.want_write()
    }

    pub fn shutdown_read(&mut self) {
        self.session.shutdown_read()
    }

    pub fn shutdown_write(&mut self) {
        self.session.shutdown_write()
    }

    pub fn close_received(&self) -> bool {
        self.session.close_received()
    }

    pub fn close_sent(&self) -> bool {
        self.session.close_sent()
    }

    pub fn status_code_received(&self) -> u16 {
        self.session.status_code_received()
    }

    pub fn status_code_sent(&self) -> u16 {
        self.session.status_code_sent()
    }

    pub fn queued_msg_count(&self) -> usize {
        self.session.queued_msg_count()
    }

    pub fn queued_msg_length(&self) -> usize {
        self.session.queued_msg_length()
    }
}

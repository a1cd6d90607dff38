use crate::error::Error;
use crate::frame::OpCode;
use crate::utf8::Utf8Validator;
use bytes::{Bytes, BytesMut};

/// Source of payload data for a fragmented outgoing message.
///
/// The engine pulls chunks from the source while sending and emits each chunk
/// as one frame; the first frame carries the message opcode and later frames
/// are continuations. Returning `Ok((n, eof))` hands over `n` bytes and, when
/// `eof` is true, marks the chunk as the last one so the closing frame gets
/// its fin bit set. `Ok((0, _))` means no data is available yet and suspends
/// the send pump without failing it. Errors other than
/// [`Error::WouldBlock`](crate::Error::WouldBlock) disable the write side.
pub trait FragmentedRead {
    fn read(&mut self, buf: &mut [u8]) -> Result<(usize, bool), Error>;
}

pub(crate) enum OutBody {
    NonFragmented(Vec<u8>),
    Fragmented(Box<dyn FragmentedRead>),
}

/// One queued outgoing message. `fin` and `opcode` mutate while the message
/// is in flight: a fragmented message flips its opcode to `Continue` after
/// the first frame and adopts `fin` when its source reports end of data.
pub(crate) struct OutMessage {
    pub fin: bool,
    pub opcode: OpCode,
    pub body: OutBody,
}

impl OutMessage {
    pub fn non_fragmented(opcode: OpCode, msg: Vec<u8>) -> Self {
        Self {
            fin: true,
            opcode,
            body: OutBody::NonFragmented(msg),
        }
    }

    pub fn fragmented(opcode: OpCode, source: Box<dyn FragmentedRead>) -> Self {
        Self {
            fin: false,
            opcode,
            body: OutBody::Fragmented(source),
        }
    }
}

/// One of the two inbound assembly slots.
///
/// An empty slot has `opcode == None`. A non-empty slot is mid-assembly:
/// `fin`/`rsv`/`opcode` come from the first frame of the message (`fin` is
/// updated by each continuation), `buf` accumulates the payload and the
/// UTF-8 automaton carries text validation state across frames.
pub(crate) struct InboundMessage {
    pub fin: bool,
    pub rsv: u8,
    pub opcode: Option<OpCode>,
    pub utf8: Utf8Validator,
    pub buf: BytesMut,
    pub msg_length: u64,
}

impl InboundMessage {
    pub fn new() -> Self {
        Self {
            fin: false,
            rsv: 0,
            opcode: None,
            utf8: Utf8Validator::new(),
            buf: BytesMut::new(),
            msg_length: 0,
        }
    }

    pub fn start(&mut self, fin: bool, rsv: u8, opcode: OpCode) {
        self.fin = fin;
        self.rsv = rsv;
        self.opcode = Some(opcode);
        self.msg_length = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.opcode.is_none()
    }

    /// Accounts for one incoming frame's payload and reserves room for it.
    pub fn announce_frame(&mut self, payload_length: u64) {
        self.buf.reserve(payload_length as usize);
        self.msg_length += payload_length;
    }

    /// Hands out the assembled message and returns the slot to empty.
    pub fn finish(&mut self) -> Bytes {
        let msg = self.buf.split().freeze();
        self.reset();
        msg
    }

    pub fn reset(&mut self) {
        self.fin = false;
        self.rsv = 0;
        self.opcode = None;
        self.utf8.reset();
        self.buf.clear();
        self.msg_length = 0;
    }
}

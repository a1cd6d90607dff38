use frame_flow::{
    Error, EventHandler, FragmentedRead, IoFlags, OpCode, ReceivedMessage, Session, WebSocket,
};
use log::*;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

// A server streams a large payload as a fragmented message, pulling chunks
// from a source while sending; a ping queued mid-stream overtakes the
// continuation frames. The client reassembles everything into one message.

type Wire = Rc<RefCell<VecDeque<u8>>>;

struct Endpoint {
    name: &'static str,
    rx: Wire,
    tx: Wire,
}

impl EventHandler for Endpoint {
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut rx = self.rx.borrow_mut();
        if rx.is_empty() {
            return Err(Error::WouldBlock);
        }
        let n = buf.len().min(rx.len());
        for slot in buf.iter_mut().take(n) {
            *slot = rx.pop_front().expect("length checked above");
        }
        Ok(n)
    }

    fn send(&mut self, data: &[u8], _flags: IoFlags) -> Result<usize, Error> {
        self.tx.borrow_mut().extend(data.iter().copied());
        Ok(data.len())
    }

    fn on_frame_recv_start(&mut self, _session: &mut Session, frame: &frame_flow::FrameStart) {
        debug!(
            "{}: frame {:?}, fin={}, {} bytes",
            self.name, frame.opcode, frame.fin, frame.payload_length
        );
    }

    fn on_msg_recv(&mut self, _session: &mut Session, msg: ReceivedMessage) {
        info!(
            "{}: {:?} message, {} bytes",
            self.name,
            msg.opcode,
            msg.payload.len()
        );
    }
}

/// Serves a byte vector a fixed chunk at a time, the way a host would feed a
/// file or an upstream stream into a fragmented message. Reports "no data
/// yet" after every chunk, like a rate-limited upstream, which suspends the
/// send pump between frames.
struct ChunkedPayload {
    data: Vec<u8>,
    pos: usize,
    chunk_size: usize,
    pending: bool,
}

impl FragmentedRead for ChunkedPayload {
    fn read(&mut self, buf: &mut [u8]) -> Result<(usize, bool), Error> {
        if self.pending {
            self.pending = false;
            return Ok((0, false));
        }
        self.pending = true;
        let n = buf
            .len()
            .min(self.chunk_size)
            .min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok((n, self.pos == self.data.len()))
    }
}

fn main() {
    env_logger::init();

    let upstream: Wire = Rc::new(RefCell::new(VecDeque::new()));
    let downstream: Wire = Rc::new(RefCell::new(VecDeque::new()));

    let mut client = WebSocket::client(Endpoint {
        name: "client",
        rx: downstream.clone(),
        tx: upstream.clone(),
    });
    let mut server = WebSocket::server(Endpoint {
        name: "server",
        rx: upstream,
        tx: downstream,
    });

    let payload: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
    let source = Box::new(ChunkedPayload {
        data: payload,
        pos: 0,
        chunk_size: 1500,
        pending: false,
    });
    server
        .queue_fragmented_msg(OpCode::Binary, source)
        .expect("queue fragmented message");

    // one pump round, then slip a ping in front of the continuations
    server.send().expect("server send");
    server
        .queue_msg(OpCode::Ping, b"still there?".to_vec())
        .expect("queue ping");

    for _ in 0..32 {
        if server.want_write() {
            server.send().expect("server send");
        }
        if client.want_read() {
            client.recv().expect("client recv");
        }
        if client.want_write() {
            client.send().expect("client send");
        }
        if server.want_read() {
            server.recv().expect("server recv");
        }
    }
}

use frame_flow::{Error, EventHandler, IoFlags, OpCode, ReceivedMessage, Session, WebSocket};
use log::*;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

// A client engine and a server engine wired back to back through two
// in-memory byte queues, standing in for a real socket. The engines never
// see the queues directly; all bytes move through the handler callbacks.

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

    fn on_msg_recv(&mut self, session: &mut Session, msg: ReceivedMessage) {
        info!(
            "{}: {:?} message, {} bytes",
            self.name,
            msg.opcode,
            msg.payload.len()
        );
        // the server echoes text right from the callback; the reply is
        // picked up by its next send pump
        if self.name == "server" && msg.opcode == OpCode::Text {
            let _ = session.queue_msg(OpCode::Text, msg.payload.to_vec());
        }
    }
}

fn pump(client: &mut WebSocket<Endpoint>, server: &mut WebSocket<Endpoint>) {
    // a real host would wait on I/O readiness; with in-memory queues a few
    // rounds are enough to reach quiescence
    for _ in 0..8 {
        if client.want_write() {
            client.send().expect("client send");
        }
        if server.want_read() {
            server.recv().expect("server recv");
        }
        if server.want_write() {
            server.send().expect("server send");
        }
        if client.want_read() {
            client.recv().expect("client recv");
        }
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

    client
        .queue_msg(OpCode::Text, b"hello over websockets".to_vec())
        .expect("queue message");
    pump(&mut client, &mut server);

    client.queue_close(1000, b"done").expect("queue close");
    pump(&mut client, &mut server);

    info!(
        "client: close sent={} received={} status_sent={} status_received={}",
        client.close_sent(),
        client.close_received(),
        client.status_code_sent(),
        client.status_code_received()
    );
    info!(
        "server: close sent={} received={} status_sent={} status_received={}",
        server.close_sent(),
        server.close_received(),
        server.status_code_sent(),
        server.status_code_received()
    );
}

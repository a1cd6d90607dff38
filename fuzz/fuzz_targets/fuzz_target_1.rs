#![no_main]

use frame_flow::{Error, EventHandler, IoFlags, WebSocket};
use libfuzzer_sys::fuzz_target;
use std::collections::VecDeque;

// Drives the receive pump of a server engine with arbitrary wire bytes,
// delivered one byte per callback to stress the resumable parser states,
// then drains whatever the engine queued in response. Anything short of a
// clean return is a bug; protocol violations must surface as a queued close,
// never as a panic.

struct FuzzTransport {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl EventHandler for FuzzTransport {
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        match self.input.pop_front() {
            Some(byte) if !buf.is_empty() => {
                buf[0] = byte;
                Ok(1)
            }
            _ => Err(Error::WouldBlock),
        }
    }

    fn send(&mut self, data: &[u8], _flags: IoFlags) -> Result<usize, Error> {
        self.output.extend_from_slice(data);
        Ok(data.len())
    }
}

fuzz_target!(|data: &[u8]| {
    let transport = FuzzTransport {
        input: data.iter().copied().collect(),
        output: Vec::new(),
    };
    let mut ws = WebSocket::server(transport);

    while ws.want_read() {
        if ws.recv().is_err() {
            break;
        }
        if ws.handler().input.is_empty() {
            break;
        }
    }
    while ws.want_write() {
        if ws.send().is_err() {
            break;
        }
    }
});

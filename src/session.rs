use crate::config::WebSocketConfig;
use crate::error::Error;
use crate::frame::OpCode;
use crate::message::{FragmentedRead, OutMessage};
use crate::status;
use log::debug;
use std::collections::VecDeque;

/// Which side of the connection this engine plays. Clients mask every frame
/// they send and expect unmasked frames back; servers do the opposite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Server,
    Client,
}

impl Role {
    pub(crate) fn is_server(&self) -> bool {
        matches!(self, Role::Server)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CloseStatus {
    pub received: bool,
    pub queued: bool,
    pub sent: bool,
}

/// Shared engine state: queueing, enable flags and the close handshake.
///
/// The pump callbacks receive `&mut Session`, so a host may queue replies or
/// inspect the connection state from inside a callback; anything queued there
/// is picked up by the next send pump iteration.
pub struct Session {
    pub(crate) role: Role,
    pub(crate) config: WebSocketConfig,
    pub(crate) read_enabled: bool,
    pub(crate) write_enabled: bool,
    pub(crate) close_status: CloseStatus,
    pub(crate) status_code_recv: u16,
    pub(crate) status_code_sent: u16,
    // Data and control frames queue separately; control frames win at every
    // frame boundary.
    pub(crate) send_queue: VecDeque<OutMessage>,
    pub(crate) ctrl_queue: VecDeque<OutMessage>,
    // The message currently being sent, if any.
    pub(crate) in_flight: Option<OutMessage>,
    pub(crate) queued_msg_count: usize,
    pub(crate) queued_msg_length: usize,
}

impl Session {
    pub(crate) fn new(role: Role, config: WebSocketConfig) -> Self {
        Self {
            role,
            config,
            read_enabled: true,
            write_enabled: true,
            close_status: CloseStatus::default(),
            status_code_recv: status::ABNORMAL_CLOSURE,
            status_code_sent: status::ABNORMAL_CLOSURE,
            send_queue: VecDeque::new(),
            ctrl_queue: VecDeque::new(),
            in_flight: None,
            queued_msg_count: 0,
            queued_msg_length: 0,
        }
    }

    fn is_msg_queueable(&self) -> bool {
        self.write_enabled && !self.close_status.queued
    }

    /// Queues one non-fragmented message. The whole payload is sent as a
    /// single frame with the fin bit set. Control messages go to the control
    /// queue and overtake queued data messages.
    pub fn queue_msg(&mut self, opcode: OpCode, msg: Vec<u8>) -> Result<(), Error> {
        if !self.is_msg_queueable() {
            return Err(Error::NoMoreMsg);
        }
        if opcode.is_control() && msg.len() > 125 {
            return Err(Error::InvalidArgument);
        }

        let msg_length = msg.len();
        let omsg = OutMessage::non_fragmented(opcode, msg);
        if opcode.is_control() {
            self.ctrl_queue.push_back(omsg);
        } else {
            self.send_queue.push_back(omsg);
        }

        self.queued_msg_count += 1;
        self.queued_msg_length += msg_length;
        Ok(())
    }

    /// Queues a message whose payload is pulled from `source` chunk by chunk
    /// while sending. Only data opcodes may be fragmented.
    pub fn queue_fragmented_msg(
        &mut self,
        opcode: OpCode,
        source: Box<dyn FragmentedRead>,
    ) -> Result<(), Error> {
        if !self.is_msg_queueable() {
            return Err(Error::NoMoreMsg);
        }
        if opcode.is_control() {
            return Err(Error::InvalidArgument);
        }
        self.send_queue
            .push_back(OutMessage::fragmented(opcode, source));
        self.queued_msg_count += 1;
        Ok(())
    }

    /// Queues a close frame, ending the conversation. A `status_code` of 0
    /// queues an empty close payload; otherwise the payload is the two
    /// status bytes followed by `reason`, which leaves room for at most 123
    /// reason bytes. Once the close is queued nothing further can be queued.
    pub fn queue_close(&mut self, status_code: u16, reason: &[u8]) -> Result<(), Error> {
        if !self.is_msg_queueable() {
            return Err(Error::NoMoreMsg);
        }
        if reason.len() > 123 {
            return Err(Error::InvalidArgument);
        }

        let msg = if status_code == 0 {
            Vec::new()
        } else {
            let mut msg = Vec::with_capacity(2 + reason.len());
            msg.extend_from_slice(&status_code.to_be_bytes());
            msg.extend_from_slice(reason);
            msg
        };

        self.queue_msg(OpCode::Close, msg)?;
        self.close_status.queued = true;
        Ok(())
    }

    /// Fails the connection: reading stops immediately and a close frame is
    /// queued for the peer. Tolerates a close already being queued.
    pub(crate) fn queue_close_on_violation(
        &mut self,
        status_code: u16,
        reason: &[u8],
    ) -> Result<(), Error> {
        self.read_enabled = false;
        debug!("read disabled, queueing close with status {}", status_code);
        match self.queue_close(status_code, reason) {
            Err(Error::NoMoreMsg) => Ok(()),
            r => r,
        }
    }

    /// Pops the next control message to send. After a close has been queued
    /// no other control frame may leave, so anything queued in front of the
    /// close is dropped on the way to it.
    pub(crate) fn pop_ctrl(&mut self) -> Option<OutMessage> {
        if !self.close_status.queued {
            return self.ctrl_queue.pop_front();
        }
        while let Some(msg) = self.ctrl_queue.pop_front() {
            if msg.opcode == OpCode::Close {
                return Some(msg);
            }
            debug!("dropping queued {:?} frame behind close", msg.opcode);
            self.queued_msg_count -= 1;
            if let crate::message::OutBody::NonFragmented(data) = &msg.body {
                self.queued_msg_length -= data.len();
            }
        }
        None
    }

    /// True while the engine accepts bytes from the peer.
    pub fn want_read(&self) -> bool {
        self.read_enabled
    }

    /// True while the engine has bytes it wants to put on the wire.
    pub fn want_write(&self) -> bool {
        self.write_enabled
            && (!self.send_queue.is_empty()
                || !self.ctrl_queue.is_empty()
                || self.in_flight.is_some())
    }

    /// Stops reading from the peer. The flag is never restored.
    pub fn shutdown_read(&mut self) {
        self.read_enabled = false;
    }

    /// Stops writing to the peer. The flag is never restored.
    pub fn shutdown_write(&mut self) {
        self.write_enabled = false;
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn config(&self) -> &WebSocketConfig {
        &self.config
    }

    pub fn close_received(&self) -> bool {
        self.close_status.received
    }

    pub fn close_queued(&self) -> bool {
        self.close_status.queued
    }

    pub fn close_sent(&self) -> bool {
        self.close_status.sent
    }

    /// Status code of the close frame received from the peer. Defaults to
    /// 1006 before any close arrives and to 1005 when the peer's close
    /// carried no status code.
    pub fn status_code_received(&self) -> u16 {
        self.status_code_recv
    }

    /// Status code of the close frame sent to the peer, with the same
    /// defaults as [`status_code_received`](Self::status_code_received).
    pub fn status_code_sent(&self) -> u16 {
        self.status_code_sent
    }

    /// Number of queued messages, including the one currently in flight.
    pub fn queued_msg_count(&self) -> usize {
        self.queued_msg_count
    }

    /// Total payload bytes of queued non-fragmented messages.
    pub fn queued_msg_length(&self) -> usize {
        self.queued_msg_length
    }
}

use crate::context::{EventHandler, FrameStart, ReceivedMessage, WebSocket};
use crate::error::Error;
use crate::frame::{is_control_opcode, OpCode};
use crate::status;
use bytes::Bytes;
use log::debug;

impl<H: EventHandler> WebSocket<H> {
    /// Receive pump. Pulls bytes through the handler's `recv` callback,
    /// parses frames and assembles messages, firing the notification
    /// callbacks along the way. One call keeps going until the transport has
    /// no more bytes, so several messages can be delivered per call.
    ///
    /// Protocol violations do not fail the pump: the engine queues a close
    /// frame carrying the matching status code, stops reading and returns
    /// `Ok(())`, leaving the close handshake to the send pump. An error from
    /// the `recv` callback other than
    /// [`WouldBlock`](Error::WouldBlock) disables the read side for good and
    /// surfaces as [`CallbackFailure`](Error::CallbackFailure).
    pub fn recv(&mut self) -> Result<(), Error> {
        while self.session.read_enabled {
            let frame = match self.codec.recv(&mut self.handler) {
                Ok(frame) => frame,
                Err(Error::WantRead) => break,
                Err(Error::Proto) => {
                    self.session
                        .queue_close_on_violation(status::PROTOCOL_ERROR, &[])?;
                    break;
                }
                Err(_) => {
                    self.session.queue_close_on_violation(0, &[])?;
                    return Err(Error::CallbackFailure);
                }
            };

            let fin = frame.fin;
            let rsv = frame.rsv;
            let opcode_raw = frame.opcode;
            let mask = frame.mask;
            let payload_length = frame.payload_length;
            let data = frame.data;

            // No extension is ever negotiated, so the reserved bits must be
            // zero. Masking is mandatory towards a server and forbidden
            // towards a client.
            let server = self.session.role.is_server();
            if rsv != 0 || (server && !mask) || (!server && mask) {
                self.session
                    .queue_close_on_violation(status::PROTOCOL_ERROR, &[])?;
                break;
            }

            // Chunks after the first repeat the header of a frame that was
            // already validated, so an unknown opcode always means a broken
            // first frame.
            let op = match OpCode::from_u8(opcode_raw) {
                Some(op) => op,
                None => {
                    self.session
                        .queue_close_on_violation(status::PROTOCOL_ERROR, &[])?;
                    break;
                }
            };

            let mut new_frame = false;
            if self.imsgs[self.imsg_idx].is_empty() {
                // A message must open with a data or control opcode; a
                // continuation with nothing in progress is a violation.
                if op == OpCode::Continue {
                    self.session
                        .queue_close_on_violation(status::PROTOCOL_ERROR, &[])?;
                    break;
                }
                self.imsgs[self.imsg_idx].start(fin, rsv, op);
                new_frame = true;
            } else if self.ipayloadlen == 0 && self.ipayloadoff == 0 {
                // Between frames of a fragmented message only continuations
                // and interleaved control frames may appear. Control frames
                // assemble in the second slot so the data message keeps its
                // state.
                match op {
                    OpCode::Continue => self.imsgs[self.imsg_idx].fin = fin,
                    OpCode::Close | OpCode::Ping | OpCode::Pong => {
                        self.imsg_idx = 1;
                        self.imsgs[1].start(fin, rsv, op);
                    }
                    _ => {
                        self.session
                            .queue_close_on_violation(status::PROTOCOL_ERROR, &[])?;
                        break;
                    }
                }
                new_frame = true;
            }

            if new_frame {
                if self.imsgs[self.imsg_idx].msg_length + payload_length
                    > self.session.config.max_recv_msg_length
                {
                    self.session
                        .queue_close_on_violation(status::MESSAGE_TOO_BIG, &[])?;
                    break;
                }
                self.ipayloadlen = payload_length;

                let start = FrameStart {
                    fin,
                    rsv,
                    opcode: op,
                    payload_length,
                };
                self.handler.on_frame_recv_start(&mut self.session, &start);

                if !self.session.config.no_buffering || op.is_control() {
                    self.imsgs[self.imsg_idx].announce_frame(payload_length);
                }
            }

            // Text payloads are validated as they stream in. A close payload
            // is text too, after its two leading status bytes.
            {
                let slot = &mut self.imsgs[self.imsg_idx];
                if matches!(slot.opcode, Some(OpCode::Text) | Some(OpCode::Close)) {
                    let skip = if slot.opcode == Some(OpCode::Close) {
                        2u64.saturating_sub(self.ipayloadoff) as usize
                    } else {
                        0
                    };
                    for &byte in data.iter().skip(skip) {
                        if !slot.utf8.feed(byte) {
                            self.session
                                .queue_close_on_violation(status::INVALID_FRAME_PAYLOAD_DATA, &[])?;
                            break;
                        }
                    }
                }
            }
            if self.imsgs[self.imsg_idx].utf8.is_rejected() {
                break;
            }

            self.handler.on_frame_recv_chunk(&mut self.session, data);

            if !data.is_empty() {
                if !self.session.config.no_buffering || is_control_opcode(opcode_raw) {
                    self.imsgs[self.imsg_idx].buf.extend_from_slice(data);
                }
                self.ipayloadoff += data.len() as u64;
            }

            if self.ipayloadoff == self.ipayloadlen {
                // A text message ending mid code point is as invalid as a bad
                // sequence.
                {
                    let slot = &self.imsgs[self.imsg_idx];
                    if slot.fin
                        && matches!(slot.opcode, Some(OpCode::Text) | Some(OpCode::Close))
                        && !slot.utf8.is_complete()
                    {
                        self.session
                            .queue_close_on_violation(status::INVALID_FRAME_PAYLOAD_DATA, &[])?;
                        break;
                    }
                }

                self.handler.on_frame_recv_end(&mut self.session);

                if self.imsgs[self.imsg_idx].fin {
                    self.message_complete()?;
                }
                self.ipayloadlen = 0;
                self.ipayloadoff = 0;
            }
        }
        Ok(())
    }

    /// Runs once the final frame of a message is fully buffered: flattens the
    /// payload, performs the automatic close and ping responses and notifies
    /// the host.
    fn message_complete(&mut self) -> Result<(), Error> {
        let cur = self.imsg_idx;
        let Some(opcode) = self.imsgs[cur].opcode else {
            return Ok(());
        };
        let rsv = self.imsgs[cur].rsv;

        let payload = if !self.session.config.no_buffering || opcode.is_control() {
            self.imsgs[cur].finish()
        } else {
            self.imsgs[cur].reset();
            Bytes::new()
        };

        let mut status_code: u16 = 0;
        match opcode {
            OpCode::Close => {
                if payload.len() >= 2 {
                    status_code = u16::from_be_bytes([payload[0], payload[1]]);
                    if !status::is_valid_status_code(status_code) {
                        self.session
                            .queue_close_on_violation(status::PROTOCOL_ERROR, &[])?;
                        return Ok(());
                    }
                }
                let reason = if payload.len() >= 2 { &payload[2..] } else { &[][..] };
                self.session.close_status.received = true;
                self.session.status_code_recv = if status_code == 0 {
                    status::NO_STATUS_RCVD
                } else {
                    status_code
                };
                debug!(
                    "close received with status {}, echoing",
                    self.session.status_code_recv
                );
                // Echo the close back with the peer's status and reason;
                // reading stops here.
                self.session.queue_close_on_violation(status_code, reason)?;
            }
            OpCode::Ping => {
                // A ping is answered with a pong carrying the same payload,
                // unless a close is already queued.
                match self.session.queue_msg(OpCode::Pong, payload.to_vec()) {
                    Ok(()) | Err(Error::NoMoreMsg) => {}
                    Err(e) => {
                        self.session.read_enabled = false;
                        return Err(e);
                    }
                }
            }
            _ => {}
        }

        let msg = ReceivedMessage {
            rsv,
            opcode,
            payload,
            status_code,
        };
        self.handler.on_msg_recv(&mut self.session, msg);

        if cur == 1 {
            self.imsg_idx = 0;
        }
        Ok(())
    }
}

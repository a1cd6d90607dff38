use crate::context::{EventHandler, WebSocket, OUT_BUF_SIZE};
use crate::error::Error;
use crate::frame::{Frame, OpCode};
use crate::message::OutBody;
use crate::status;
use log::debug;

impl<H: EventHandler> WebSocket<H> {
    /// Send pump. Drains the queues through the handler's `send` callback,
    /// one frame at a time, until everything queued is on the wire or the
    /// transport backs off.
    ///
    /// Control frames overtake data messages at every frame boundary: a
    /// fragmented message in progress is parked after the current frame,
    /// the waiting control frame goes out, and the fragmented message
    /// resumes with continuation frames. Completing a close frame disables
    /// the write side. An error from the `send` callback other than
    /// [`WouldBlock`](Error::WouldBlock) disables the write side for good
    /// and surfaces as [`CallbackFailure`](Error::CallbackFailure).
    pub fn send(&mut self) -> Result<(), Error> {
        while self.session.write_enabled
            && (self.session.in_flight.is_some()
                || !self.session.send_queue.is_empty()
                || !self.session.ctrl_queue.is_empty())
        {
            if self.session.in_flight.is_none() {
                if self.session.ctrl_queue.is_empty() {
                    self.session.in_flight = self.session.send_queue.pop_front();
                } else {
                    self.session.in_flight = self.session.pop_ctrl();
                    if self.session.in_flight.is_none() {
                        // Everything behind the close was dropped.
                        break;
                    }
                }
                self.prepare_in_flight();
            } else if self
                .session
                .in_flight
                .as_ref()
                .is_some_and(|msg| !msg.opcode.is_control())
                && self.codec.is_idle()
                && !self.session.ctrl_queue.is_empty()
            {
                // Preempt the data message between two of its frames; it goes
                // back to the head of the queue so ordering is preserved.
                if let Some(msg) = self.session.in_flight.take() {
                    self.session.send_queue.push_front(msg);
                }
                self.session.in_flight = self.session.pop_ctrl();
                if self.session.in_flight.is_none() {
                    break;
                }
                self.prepare_in_flight();
            }

            let mask = !self.session.role.is_server();
            let Some(msg) = self.session.in_flight.as_mut() else {
                break;
            };

            match &mut msg.body {
                OutBody::NonFragmented(data) => {
                    let frame = Frame {
                        fin: true,
                        rsv: 0,
                        opcode: msg.opcode.as_u8(),
                        mask,
                        payload_length: self.opayloadlen,
                        data: &data[self.opayloadoff as usize..],
                    };
                    match self.codec.send(&mut self.handler, &frame) {
                        Ok(n) => {
                            self.opayloadoff += n as u64;
                            if self.opayloadoff == self.opayloadlen {
                                self.complete_non_fragmented();
                            } else {
                                break;
                            }
                        }
                        Err(Error::WantWrite) => break,
                        Err(_) => {
                            self.session.write_enabled = false;
                            return Err(Error::CallbackFailure);
                        }
                    }
                }
                OutBody::Fragmented(source) => {
                    // Between frames, pull the next chunk from the source
                    // into the staging buffer; the chunk becomes one frame.
                    if !msg.fin && self.obufmark == self.obuflimit {
                        match source.read(&mut self.obuf) {
                            Ok((0, _)) | Err(Error::WouldBlock) => break,
                            Ok((n, eof)) => {
                                if n > OUT_BUF_SIZE {
                                    self.session.write_enabled = false;
                                    return Err(Error::InvalidCallback);
                                }
                                self.obufmark = 0;
                                self.obuflimit = n;
                                if eof {
                                    msg.fin = true;
                                }
                                self.opayloadlen = n as u64;
                                self.opayloadoff = 0;
                            }
                            Err(_) => {
                                self.session.write_enabled = false;
                                return Err(Error::CallbackFailure);
                            }
                        }
                    }

                    let frame = Frame {
                        fin: msg.fin,
                        rsv: 0,
                        opcode: msg.opcode.as_u8(),
                        mask,
                        payload_length: self.opayloadlen,
                        data: &self.obuf[self.obufmark..self.obuflimit],
                    };
                    match self.codec.send(&mut self.handler, &frame) {
                        Ok(n) => {
                            self.obufmark += n;
                            if self.obufmark == self.obuflimit {
                                self.obufmark = 0;
                                self.obuflimit = 0;
                                if msg.fin {
                                    self.session.queued_msg_count -= 1;
                                    self.session.in_flight = None;
                                } else {
                                    msg.opcode = OpCode::Continue;
                                }
                            } else {
                                break;
                            }
                        }
                        Err(Error::WantWrite) => break,
                        Err(_) => {
                            self.session.write_enabled = false;
                            return Err(Error::CallbackFailure);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Resets per-message send progress after a message is picked from a
    /// queue. Fragmented messages track their progress in the staging
    /// buffer instead.
    fn prepare_in_flight(&mut self) {
        if let Some(msg) = self.session.in_flight.as_mut() {
            if let OutBody::NonFragmented(data) = &msg.body {
                let len = data.len();
                msg.fin = true;
                self.opayloadlen = len as u64;
                self.opayloadoff = 0;
            }
        }
    }

    fn complete_non_fragmented(&mut self) {
        let Some(msg) = self.session.in_flight.take() else {
            return;
        };
        let data = match &msg.body {
            OutBody::NonFragmented(data) => data.as_slice(),
            OutBody::Fragmented(_) => &[],
        };
        self.session.queued_msg_count -= 1;
        self.session.queued_msg_length -= data.len();

        if msg.opcode == OpCode::Close {
            self.session.write_enabled = false;
            self.session.close_status.sent = true;
            let status_code = if data.len() >= 2 {
                u16::from_be_bytes([data[0], data[1]])
            } else {
                0
            };
            self.session.status_code_sent = if status_code == 0 {
                status::NO_STATUS_RCVD
            } else {
                status_code
            };
            debug!("close sent with status {}", self.session.status_code_sent);
        }
    }
}

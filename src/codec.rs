use crate::buffer::ReadBuffer;
use crate::error::Error;
use crate::frame::{is_control_opcode, Frame, FrameIo, IoFlags};

// A frame header is at most 14 bytes: 2 fixed bytes, an optional 8-byte
// extended length and an optional 4-byte mask key.
const MAX_HEADER_SIZE: usize = 14;

// Scratch size for masking outgoing payload, mirroring the read buffer size.
const MASK_SCRATCH_SIZE: usize = 4096;

enum SendState {
    PrepHeader,
    SendHeader,
    SendPayload,
}

enum RecvState {
    Header1,
    ExtPayloadLen,
    MaskKey,
    Payload,
}

/// Incremental serializer and parser for single WebSocket frames.
///
/// Both directions are resumable state machines: a call that cannot finish
/// because the transport backs off returns `WantRead`/`WantWrite` and the next
/// call picks up exactly where the previous one stopped. The codec performs no
/// message-level validation; that is the engine's job.
pub struct FrameCodec {
    // send side
    ostate: SendState,
    oheader: [u8; MAX_HEADER_SIZE],
    oheadermark: usize,
    oheaderlimit: usize,
    omask: bool,
    omaskkey: [u8; 4],
    opayloadlen: u64,
    opayloadoff: u64,
    // receive side
    istate: RecvState,
    ibuf: ReadBuffer,
    ireqread: usize,
    ifin: bool,
    irsv: u8,
    iopcode: u8,
    imask: bool,
    imaskkey: [u8; 4],
    ipayloadlen: u64,
    ipayloadoff: u64,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self {
            ostate: SendState::PrepHeader,
            oheader: [0; MAX_HEADER_SIZE],
            oheadermark: 0,
            oheaderlimit: 0,
            omask: false,
            omaskkey: [0; 4],
            opayloadlen: 0,
            opayloadoff: 0,
            istate: RecvState::Header1,
            ibuf: ReadBuffer::new(),
            ireqread: 2,
            ifin: false,
            irsv: 0,
            iopcode: 0,
            imask: false,
            imaskkey: [0; 4],
            ipayloadlen: 0,
            ipayloadoff: 0,
        }
    }

    /// True between frames, when no partially written frame is pending.
    pub(crate) fn is_idle(&self) -> bool {
        matches!(self.ostate, SendState::PrepHeader)
    }

    /// Serializes `frame` towards the transport, resuming any partially sent
    /// header or payload. Returns the number of *payload* bytes the transport
    /// accepted during this call; header bytes are not counted.
    ///
    /// `frame.data` does not have to cover the whole announced
    /// `payload_length`; the caller may feed the payload across several calls
    /// and the codec keeps the running offset, so masking stays aligned.
    pub fn send(&mut self, io: &mut impl FrameIo, frame: &Frame<'_>) -> Result<usize, Error> {
        if frame.data.len() as u64 > frame.payload_length {
            return Err(Error::InvalidArgument);
        }

        if let SendState::PrepHeader = self.ostate {
            // Control frames are never fragmented and carry at most 125
            // payload bytes, so they always fit the 7-bit length field.
            if is_control_opcode(frame.opcode) && frame.payload_length > 125 {
                return Err(Error::InvalidArgument);
            }

            let mut header = [0u8; MAX_HEADER_SIZE];
            header[0] = (frame.fin as u8) << 7
                | (frame.rsv & 0b0000_0111) << 4
                | (frame.opcode & 0b0000_1111);
            header[1] = (frame.mask as u8) << 7;

            // The payload length must use the shortest encoding that fits:
            // 7 bits, or 126 plus 2 bytes, or 127 plus 8 bytes big-endian.
            // Lengths with the top bit set are not representable.
            let mut end = 2;
            if frame.payload_length < 126 {
                header[1] |= frame.payload_length as u8;
            } else if frame.payload_length < (1 << 16) {
                header[1] |= 126;
                header[2..4].copy_from_slice(&(frame.payload_length as u16).to_be_bytes());
                end = 4;
            } else if frame.payload_length < (1 << 63) {
                header[1] |= 127;
                header[2..10].copy_from_slice(&frame.payload_length.to_be_bytes());
                end = 10;
            } else {
                return Err(Error::InvalidArgument);
            }

            if frame.mask {
                let mut key = [0u8; 4];
                if io.genmask(&mut key).is_err() {
                    return Err(Error::InvalidCallback);
                }
                header[end..end + 4].copy_from_slice(&key);
                end += 4;
                self.omaskkey = key;
                self.omask = true;
            } else {
                self.omask = false;
            }

            self.oheader = header;
            self.oheadermark = 0;
            self.oheaderlimit = end;
            self.opayloadlen = frame.payload_length;
            self.opayloadoff = 0;
            self.ostate = SendState::SendHeader;
        }

        if let SendState::SendHeader = self.ostate {
            let flags = IoFlags {
                msg_more: !frame.data.is_empty(),
                user_sending: false,
            };
            let len = self.oheaderlimit - self.oheadermark;
            match io.send(&self.oheader[self.oheadermark..self.oheaderlimit], flags) {
                Ok(0) | Err(Error::WouldBlock) => return Err(Error::WantWrite),
                Ok(n) if n > len => return Err(Error::InvalidCallback),
                Ok(n) => {
                    self.oheadermark += n;
                    if self.oheadermark == self.oheaderlimit {
                        self.ostate = SendState::SendPayload;
                    } else {
                        return Err(Error::WantWrite);
                    }
                }
                Err(e) => return Err(e),
            }
        }

        if let SendState::SendPayload = self.ostate {
            let mut total = 0usize;
            if !frame.data.is_empty() {
                if self.omask {
                    // Masked payload is XOR-ed into a scratch buffer first.
                    // The key index runs over the whole payload offset, not
                    // this call's data, so resumed sends stay aligned.
                    let mut scratch = [0u8; MASK_SCRATCH_SIZE];
                    let mut datamark = 0usize;
                    while datamark < frame.data.len() {
                        let writelen = (frame.data.len() - datamark).min(MASK_SCRATCH_SIZE);
                        for i in 0..writelen {
                            scratch[i] = frame.data[datamark + i]
                                ^ self.omaskkey[((self.opayloadoff + i as u64) & 3) as usize];
                        }
                        match io.send(&scratch[..writelen], IoFlags::default()) {
                            Ok(0) | Err(Error::WouldBlock) => {
                                if total > 0 {
                                    break;
                                }
                                return Err(Error::WantWrite);
                            }
                            Ok(n) if n > writelen => return Err(Error::InvalidCallback),
                            Ok(n) => {
                                datamark += n;
                                self.opayloadoff += n as u64;
                                total += n;
                            }
                            Err(e) => return Err(e),
                        }
                    }
                } else {
                    // Unmasked payload goes straight from the caller's buffer
                    // to the transport; user_sending tells the callback the
                    // bytes belong to the application.
                    let flags = IoFlags {
                        msg_more: false,
                        user_sending: true,
                    };
                    match io.send(frame.data, flags) {
                        Ok(0) | Err(Error::WouldBlock) => return Err(Error::WantWrite),
                        Ok(n) if n > frame.data.len() => return Err(Error::InvalidCallback),
                        Ok(n) => {
                            self.opayloadoff += n as u64;
                            total = n;
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
            if self.opayloadoff == self.opayloadlen {
                self.ostate = SendState::PrepHeader;
            }
            return Ok(total);
        }

        Err(Error::InvalidArgument)
    }

    /// Parses the next piece of a frame out of the transport.
    ///
    /// Yields as soon as any payload bytes of the current frame are buffered;
    /// a large frame surfaces as a sequence of results sharing the same
    /// header fields. A frame with an empty payload yields exactly one result
    /// with empty `data`. Masked payloads are unmasked in place before being
    /// handed out.
    pub fn recv(&mut self, io: &mut impl FrameIo) -> Result<Frame<'_>, Error> {
        if let RecvState::Header1 = self.istate {
            self.require(io, self.ireqread)?;
            let header = self.ibuf.take(2);
            let b0 = header[0];
            let b1 = header[1];

            // fin is the top bit of the first byte, the reserved bits follow
            // and the low nibble is the opcode. The top bit of the second
            // byte flags masking and the rest is the 7-bit payload length.
            let fin = b0 & 0b1000_0000 != 0;
            let rsv = (b0 >> 4) & 0b0000_0111;
            let opcode = b0 & 0b0000_1111;
            let mask = b1 & 0b1000_0000 != 0;
            let len7 = b1 & 0b0111_1111;

            self.ifin = fin;
            self.irsv = rsv;
            self.iopcode = opcode;
            self.imask = mask;

            if is_control_opcode(opcode) && (len7 > 125 || !fin) {
                return Err(Error::Proto);
            }

            if len7 == 126 {
                self.istate = RecvState::ExtPayloadLen;
                self.ireqread = 2;
            } else if len7 == 127 {
                self.istate = RecvState::ExtPayloadLen;
                self.ireqread = 8;
            } else {
                self.ipayloadlen = u64::from(len7);
                self.ipayloadoff = 0;
                if mask {
                    self.istate = RecvState::MaskKey;
                    self.ireqread = 4;
                } else {
                    self.istate = RecvState::Payload;
                }
            }
        }

        if let RecvState::ExtPayloadLen = self.istate {
            self.require(io, self.ireqread)?;
            let reqread = self.ireqread;
            let raw = self.ibuf.take(reqread);
            let len = if reqread == 2 {
                u64::from(u16::from_be_bytes([raw[0], raw[1]]))
            } else {
                u64::from_be_bytes([
                    raw[0], raw[1], raw[2], raw[3], raw[4], raw[5], raw[6], raw[7],
                ])
            };
            // The extension must use the minimal encoding; a 64-bit length
            // additionally must not have the top bit set.
            if reqread == 8 {
                if len < (1 << 16) || len & (1 << 63) != 0 {
                    return Err(Error::Proto);
                }
            } else if len < 126 {
                return Err(Error::Proto);
            }
            self.ipayloadlen = len;
            self.ipayloadoff = 0;
            if self.imask {
                self.istate = RecvState::MaskKey;
                self.ireqread = 4;
            } else {
                self.istate = RecvState::Payload;
            }
        }

        if let RecvState::MaskKey = self.istate {
            self.require(io, self.ireqread)?;
            let key = self.ibuf.take(4);
            self.imaskkey.copy_from_slice(key);
            self.istate = RecvState::Payload;
        }

        if let RecvState::Payload = self.istate {
            let remaining = self.ipayloadlen - self.ipayloadoff;
            if self.ibuf.available() == 0 && remaining > 0 {
                self.fill(io)?;
            }
            let n = remaining.min(self.ibuf.available() as u64) as usize;

            let off = self.ipayloadoff;
            self.ipayloadoff += n as u64;
            if self.ipayloadoff == self.ipayloadlen {
                self.istate = RecvState::Header1;
                self.ireqread = 2;
            }

            let fin = self.ifin;
            let rsv = self.irsv;
            let opcode = self.iopcode;
            let mask = self.imask;
            let payload_length = self.ipayloadlen;
            let key = self.imaskkey;

            let data: &[u8] = if mask {
                let chunk = self.ibuf.take_mut(n);
                for (i, byte) in chunk.iter_mut().enumerate() {
                    *byte ^= key[((off + i as u64) & 3) as usize];
                }
                chunk
            } else {
                self.ibuf.take(n)
            };

            return Ok(Frame {
                fin,
                rsv,
                opcode,
                mask,
                payload_length,
                data,
            });
        }

        Err(Error::InvalidArgument)
    }

    /// Ensures at least `n` unread bytes are buffered, refilling from the
    /// transport at most once.
    fn require(&mut self, io: &mut impl FrameIo, n: usize) -> Result<(), Error> {
        if self.ibuf.available() < n {
            self.fill(io)?;
            if self.ibuf.available() < n {
                return Err(Error::WantRead);
            }
        }
        Ok(())
    }

    fn fill(&mut self, io: &mut impl FrameIo) -> Result<(), Error> {
        self.ibuf.compact();
        let space = self.ibuf.space();
        let capacity = space.len();
        match io.recv(space) {
            Ok(0) | Err(Error::WouldBlock) => Err(Error::WantRead),
            Ok(n) if n > capacity => Err(Error::InvalidCallback),
            Ok(n) => {
                self.ibuf.extend(n);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

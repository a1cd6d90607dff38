//! Close handshake status codes, as assigned by RFC 6455 section 7.4.

pub const NORMAL_CLOSURE: u16 = 1000;
pub const GOING_AWAY: u16 = 1001;
pub const PROTOCOL_ERROR: u16 = 1002;
pub const UNSUPPORTED_DATA: u16 = 1003;
pub const NO_STATUS_RCVD: u16 = 1005;
pub const ABNORMAL_CLOSURE: u16 = 1006;
pub const INVALID_FRAME_PAYLOAD_DATA: u16 = 1007;
pub const POLICY_VIOLATION: u16 = 1008;
pub const MESSAGE_TOO_BIG: u16 = 1009;
pub const MANDATORY_EXT: u16 = 1010;
pub const INTERNAL_SERVER_ERROR: u16 = 1011;
pub const TLS_HANDSHAKE: u16 = 1015;

/// Whether `status_code` may appear in a close frame on the wire. 1004 is
/// reserved and 1005/1006 are for local reporting only; 3000-3999 are for
/// libraries and frameworks, 4000-4999 for private use.
pub fn is_valid_status_code(status_code: u16) -> bool {
    ((1000..=1011).contains(&status_code)
        && status_code != 1004
        && status_code != NO_STATUS_RCVD
        && status_code != ABNORMAL_CLOSURE)
        || (3000..=4999).contains(&status_code)
}

#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// When set, payloads of data frames are not accumulated; the message
    /// callback fires with an empty payload and hosts consume the data
    /// through the per-chunk callback instead. Control frame payloads are
    /// always buffered. Must be chosen before the first receive call, which
    /// is why the engine takes its configuration at construction time.
    pub no_buffering: bool,
    /// Upper bound on the assembled length of one incoming message. A
    /// message growing past this bound fails the connection with status
    /// 1009. With `no_buffering` set, the bound applies per frame.
    pub max_recv_msg_length: u64,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        WebSocketConfig {
            no_buffering: false,
            max_recv_msg_length: (1 << 31) - 1,
        }
    }
}

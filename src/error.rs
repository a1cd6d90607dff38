use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Recoverable conditions. The pump made as much progress as the transport
    // allowed; the caller should wait for I/O readiness and re-enter.
    #[error("the engine needs more data from the peer")]
    WantRead,

    #[error("the transport cannot accept more data right now")]
    WantWrite,

    // Framing errors
    #[error("peer violated the framing protocol")]
    Proto,

    // Caller errors
    #[error("invalid argument")]
    InvalidArgument,

    #[error("an I/O callback returned an impossible value")]
    InvalidCallback,

    #[error("close frame already queued, no further messages accepted")]
    NoMoreMsg,

    // Fatal: a host callback failed and the affected direction has been disabled
    #[error("a host callback failed")]
    CallbackFailure,

    // Returned by host callbacks to report non-blocking backpressure
    #[error("the host transport would block")]
    WouldBlock,
}

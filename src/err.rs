#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid peer address: {0}")]
    InvalidAddress(std::net::AddrParseError),

    #[error("checksum mismatch")]
    ChecksumMismatch,

    #[error("unexpected flags in reply: {0:?}")]
    UnexpectedFlags(super::Flags),

    #[error("short datagram: got {got} bytes, need at least {need}")]
    ShortDatagram { got: usize, need: usize },

    #[error("retries exhausted after {0} attempts")]
    RetriesExhausted(u32),

    #[error("message of {size} bytes needs more than 65536 segments at MSS {mss}")]
    SegmentNumberOverflow { size: usize, mss: usize },
}

mod err;
pub use err::*;

mod rudp;
pub use rudp::{
    Flags, Header, ACK_TIMEOUT, HEADER_LEN, MAX_RETRIES, MSS, RECV_TIMEOUT,
};
pub use rudp::{RecvOutcome, RudpReceiver, RudpSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

pub trait Logger: Send {
    fn log(&self, level: LogLevel, msg: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _level: LogLevel, _msg: &str) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StderrLogger;

impl Logger for StderrLogger {
    fn log(&self, level: LogLevel, msg: &str) {
        eprintln!("[{level:?}] {msg}");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RudpConfig {
    pub ack_timeout: std::time::Duration,
    pub recv_timeout: std::time::Duration,
    pub max_retries: u32,
}

impl Default for RudpConfig {
    fn default() -> Self {
        RudpConfig {
            ack_timeout: ACK_TIMEOUT,
            recv_timeout: RECV_TIMEOUT,
            max_retries: MAX_RETRIES,
        }
    }
}

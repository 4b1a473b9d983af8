//! Channel-level errors (§4.4): the four outcomes any channel operation
//! can return.

use registry_core::errors::{self, ErrorCode};

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// The target direction's single-message slot already holds an
    /// unclaimed message.
    #[error("channel slot busy")]
    Busy,
    /// A nil byte pointer or zero-length write, or an empty HMAC payload
    /// (§9 open question 3).
    #[error("invalid argument to channel operation")]
    InvalidArguments,
    /// A child channel failed (HMAC verification failure, or a read/write
    /// against a torn-down channel).
    #[error("channel operation failed")]
    Failure,
    /// The operation has no meaning for this channel variant (e.g.
    /// `server_recv` on a Loopback Server Channel, §4.5).
    #[error("operation not supported by this channel")]
    Unsupported,
}

impl ChannelError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ChannelError::Busy => errors::CHANNEL_BUSY,
            ChannelError::InvalidArguments => errors::INVALID_ARGUMENTS,
            ChannelError::Failure | ChannelError::Unsupported => errors::CHANNEL_FAILED,
        }
    }
}

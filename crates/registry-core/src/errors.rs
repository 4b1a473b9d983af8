//! Stable numeric error codes transported on the wire, and the typed error
//! enums that wrap them for in-process callers.
//!
//! The numeric values below are part of the wire contract (§6 of the design
//! spec) and must never be renumbered.

/// A single `i64` error code as carried in an `ERROR` packet payload.
pub type ErrorCode = i64;

pub const OK: ErrorCode = 0;
pub const UNKNOWN: ErrorCode = 1;
pub const MEMORY: ErrorCode = 2;
pub const INVALID_ARGUMENTS: ErrorCode = 3;
pub const EOF: ErrorCode = 4;
pub const BPACK_INVALID_FORMAT_STRING: ErrorCode = 5;
pub const BPACK_WRITE: ErrorCode = 6;
pub const BPACK_READ: ErrorCode = 7;
pub const BUNPACK_INVALID_DATA: ErrorCode = 8;
pub const CHANNEL_BUSY: ErrorCode = 9;
pub const CHANNEL_FAILED: ErrorCode = 10;
pub const REGISTRY_NO_SUCH_KEY: ErrorCode = 11;
pub const REGISTRY_UNKNOWN_IDENTIFIER: ErrorCode = 12;
pub const REGISTRY_INVALID_STATE: ErrorCode = 13;
pub const DATABASE_OPEN: ErrorCode = 14;
pub const DATABASE_INVALID: ErrorCode = 15;
pub const DATABASE_NO_SUCH_KEY: ErrorCode = 16;
pub const DATABASE_IO: ErrorCode = 17;
pub const DATABASE_TYPE_MISMATCH: ErrorCode = 18;
pub const DATABASE_TYPE_UNKNOWN: ErrorCode = 19;
pub const SERVER_INIT: ErrorCode = 20;
pub const SERVER_SHUTDOWN: ErrorCode = 21;
pub const SERVER_PROCESS: ErrorCode = 22;
pub const HMAC_VERIFICATION_FAILED: ErrorCode = 23;

/// Errors raised by the wire codec (Byte Buffer + Packer/Unpacker, §4.1-4.2).
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("unknown format character {0:?}")]
    InvalidFormatString(char),
    #[error("write past end of buffer")]
    Write,
    #[error("read past end of buffer")]
    Read,
    #[error("invalid packed double")]
    InvalidData,
    #[error("allocation failure unpacking length-prefixed value")]
    Memory,
    #[error("invalid argument to pack/unpack")]
    InvalidArguments,
}

impl WireError {
    pub fn code(&self) -> ErrorCode {
        match self {
            WireError::InvalidFormatString(_) => BPACK_INVALID_FORMAT_STRING,
            WireError::Write => BPACK_WRITE,
            WireError::Read => BPACK_READ,
            WireError::InvalidData => BUNPACK_INVALID_DATA,
            WireError::Memory => MEMORY,
            WireError::InvalidArguments => INVALID_ARGUMENTS,
        }
    }
}

/// Errors raised by the Message Authenticator (§4.3).
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("HMAC verification failed")]
    VerificationFailed,
    #[error("empty message rejected")]
    InvalidArguments,
}

impl AuthError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AuthError::VerificationFailed => HMAC_VERIFICATION_FAILED,
            AuthError::InvalidArguments => INVALID_ARGUMENTS,
        }
    }
}

/// Maps any raw numeric wire code back into a coarse semantic kind, for
/// clients that received an `ERROR` packet and need to react to it (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Ok,
    NoSuchKey,
    InvalidState,
    TypeMismatch,
    UnknownIdentifier,
    Busy,
    TransportFailure,
    ArgumentError,
    Unknown,
}

pub fn classify(code: ErrorCode) -> ErrorKind {
    match code {
        OK => ErrorKind::Ok,
        REGISTRY_NO_SUCH_KEY | DATABASE_NO_SUCH_KEY => ErrorKind::NoSuchKey,
        REGISTRY_INVALID_STATE | DATABASE_INVALID | DATABASE_IO => ErrorKind::InvalidState,
        DATABASE_TYPE_MISMATCH => ErrorKind::TypeMismatch,
        REGISTRY_UNKNOWN_IDENTIFIER => ErrorKind::UnknownIdentifier,
        CHANNEL_BUSY => ErrorKind::Busy,
        CHANNEL_FAILED | HMAC_VERIFICATION_FAILED => ErrorKind::TransportFailure,
        INVALID_ARGUMENTS => ErrorKind::ArgumentError,
        _ => ErrorKind::Unknown,
    }
}

//! The error type a `Registry` handle's client operations return (§7): a
//! coarse, typed view over whatever numeric code arrived in a wire `ERROR`
//! packet or was raised locally by the channel stack.

use registry_channel::ChannelError;
use registry_core::errors::{self, ErrorCode, ErrorKind};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no entry for this key")]
    NoSuchKey,
    #[error("entry exists with a different value kind")]
    TypeMismatch,
    #[error("registry or backing store is in an invalid state")]
    InvalidState,
    #[error("identifier did not match a recognized grammar")]
    UnknownIdentifier,
    #[error("channel slot busy")]
    Busy,
    #[error("transport or authentication failure")]
    TransportFailure,
    #[error("invalid argument")]
    ArgumentError,
    #[error("unrecognized error code {0}")]
    Unknown(ErrorCode),
}

impl RegistryError {
    /// Translates a wire `ERROR` packet's payload code into a typed error.
    pub fn from_wire_code(code: ErrorCode) -> Self {
        match errors::classify(code) {
            ErrorKind::Ok => RegistryError::Unknown(code),
            ErrorKind::NoSuchKey => RegistryError::NoSuchKey,
            ErrorKind::InvalidState => RegistryError::InvalidState,
            ErrorKind::TypeMismatch => RegistryError::TypeMismatch,
            ErrorKind::UnknownIdentifier => RegistryError::UnknownIdentifier,
            ErrorKind::Busy => RegistryError::Busy,
            ErrorKind::TransportFailure => RegistryError::TransportFailure,
            ErrorKind::ArgumentError => RegistryError::ArgumentError,
            ErrorKind::Unknown => RegistryError::Unknown(code),
        }
    }
}

impl From<ChannelError> for RegistryError {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::Busy => RegistryError::Busy,
            ChannelError::InvalidArguments => RegistryError::ArgumentError,
            ChannelError::Failure | ChannelError::Unsupported => RegistryError::TransportFailure,
        }
    }
}

//! The polymorphic Channel contract (§4.4, §9's "tagged variant" note).
//!
//! Every channel variant — [`crate::loopback::LoopbackServerChannel`],
//! [`crate::hmac::HmacChannel`], [`crate::connector::EndpointConnector`] —
//! implements this trait. A given variant only overrides the operations
//! §4.4-4.7 assign it; the rest fall back to the default [`ChannelError::Unsupported`].

use crate::error::ChannelError;

pub trait ChannelNode {
    fn client_send(&mut self, _bytes: Vec<u8>) -> Result<(), ChannelError> {
        Err(ChannelError::Unsupported)
    }

    fn client_recv(&mut self) -> Result<Vec<u8>, ChannelError> {
        Err(ChannelError::Unsupported)
    }

    fn server_send(&mut self, _bytes: Vec<u8>) -> Result<(), ChannelError> {
        Err(ChannelError::Unsupported)
    }

    fn server_recv(&mut self) -> Result<Vec<u8>, ChannelError> {
        Err(ChannelError::Unsupported)
    }
}

/// Rejects nil/empty writes per §4.4's invariant ("nil byte pointers and
/// zero sizes are rejected as argument-errors on write").
pub(crate) fn require_nonempty(bytes: &[u8]) -> Result<(), ChannelError> {
    if bytes.is_empty() {
        Err(ChannelError::InvalidArguments)
    } else {
        Ok(())
    }
}

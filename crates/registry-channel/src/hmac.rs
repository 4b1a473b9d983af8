//! HMAC Channel (§4.6): a wrapping channel that appends/strips a 20-byte
//! HMAC-SHA-1 tag per message, pass-through when unkeyed.

use registry_core::auth::{self, TAG_LEN};

use crate::error::ChannelError;
use crate::node::{require_nonempty, ChannelNode};

/// Wraps a child [`ChannelNode`]. An absent key (§4.8: an empty `hmac://`
/// key) makes every operation a pure pass-through, so a caller sees a
/// uniform stack shape whether or not a given hop is authenticated.
pub struct HmacChannel {
    key: Option<Vec<u8>>,
    child: Box<dyn ChannelNode>,
}

impl HmacChannel {
    pub fn new(key: Option<Vec<u8>>, child: Box<dyn ChannelNode>) -> Self {
        // An empty key string means "no authentication on this hop" (§4.8,
        // §9 open question 4); normalize it to `None` at construction so
        // the rest of this type never has to special-case it.
        let key = key.filter(|k| !k.is_empty());
        Self { key, child }
    }

    fn wrap(&self, bytes: Vec<u8>) -> Vec<u8> {
        match &self.key {
            None => bytes,
            Some(key) => {
                let tag = auth::compute(key, &bytes);
                let mut out = bytes;
                out.extend_from_slice(&tag);
                out
            }
        }
    }

    fn unwrap(&self, bytes: Vec<u8>) -> Result<Vec<u8>, ChannelError> {
        match &self.key {
            None => Ok(bytes),
            Some(key) => {
                if bytes.len() < TAG_LEN {
                    return Err(ChannelError::Failure);
                }
                let split = bytes.len() - TAG_LEN;
                let (prefix, tag) = bytes.split_at(split);
                auth::verify(key, prefix, tag).map_err(|err| {
                    tracing::warn!(?err, "HMAC verification failed");
                    ChannelError::Failure
                })?;
                Ok(prefix.to_vec())
            }
        }
    }
}

impl ChannelNode for HmacChannel {
    fn client_send(&mut self, bytes: Vec<u8>) -> Result<(), ChannelError> {
        // §9 open question 3: the HMAC channel rejects empty messages
        // even when unkeyed, unlike a plain pass-through channel.
        require_nonempty(&bytes)?;
        let wrapped = self.wrap(bytes);
        self.child.client_send(wrapped)
    }

    fn client_recv(&mut self) -> Result<Vec<u8>, ChannelError> {
        let bytes = self.child.client_recv()?;
        self.unwrap(bytes)
    }

    fn server_send(&mut self, bytes: Vec<u8>) -> Result<(), ChannelError> {
        require_nonempty(&bytes)?;
        let wrapped = self.wrap(bytes);
        self.child.server_send(wrapped)
    }

    fn server_recv(&mut self) -> Result<Vec<u8>, ChannelError> {
        let bytes = self.child.server_recv()?;
        self.unwrap(bytes)
    }
}

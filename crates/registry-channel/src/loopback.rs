//! Loopback Server Channel (§4.5): the bottom of every channel stack,
//! whose client-send is a synchronous call into the Request Dispatcher.

use std::rc::Rc;

use registry_core::RequestHandler;

use crate::error::ChannelError;
use crate::node::{require_nonempty, ChannelNode};

/// Carries requests into `handler` and stashes its reply in the
/// client-direction slot for the next `client_recv`.
pub struct LoopbackServerChannel {
    handler: Rc<dyn RequestHandler>,
    /// The single client-direction reply slot (§4.5's "client-direction
    /// reply buffer").
    pending_reply: Option<Vec<u8>>,
}

impl LoopbackServerChannel {
    pub fn new(handler: Rc<dyn RequestHandler>) -> Self {
        Self {
            handler,
            pending_reply: None,
        }
    }
}

impl ChannelNode for LoopbackServerChannel {
    fn client_send(&mut self, bytes: Vec<u8>) -> Result<(), ChannelError> {
        require_nonempty(&bytes)?;
        // `None` is the handler's `SHUTDOWN` response (§4.9): no reply
        // packet is queued, matching the original backend bypassing both
        // its success- and error-reply sends for that one request kind.
        let Some(reply) = self.handler.handle(&bytes) else {
            return Ok(());
        };
        // §4.5: busy-spin on server_send until the slot is free. In a
        // single-threaded caller the slot is always empty here, so this
        // terminates in one iteration; it is kept to document the
        // contract rather than to handle real contention.
        loop {
            match self.server_send(reply.clone()) {
                Ok(()) => return Ok(()),
                Err(ChannelError::Busy) => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn client_recv(&mut self) -> Result<Vec<u8>, ChannelError> {
        self.pending_reply.take().ok_or(ChannelError::Busy)
    }

    fn server_send(&mut self, bytes: Vec<u8>) -> Result<(), ChannelError> {
        if self.pending_reply.is_some() {
            return Err(ChannelError::Busy);
        }
        self.pending_reply = Some(bytes);
        Ok(())
    }

    // server_recv is unsupported (§4.5: "not supported (null)").
}

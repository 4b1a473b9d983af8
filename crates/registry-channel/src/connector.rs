//! Endpoint Connector (§4.7): bridges the bottom of a client-side HMAC
//! chain to the top of a mirrored server-side HMAC chain sharing the same
//! keys hop-for-hop, so both legs authenticate symmetrically.
//!
//! The original source reused the same HMAC wrapper objects as both the
//! client- and server-side chain, via a raw cyclic pointer — see §9's
//! design notes and §4.7's "Implementation redesign". This crate instead
//! builds a genuinely separate server-side chain (`crate::identifier`
//! constructs both halves) and threads two independent, non-owning links
//! between it and the connector:
//!
//! - [`ConnectorBridge`] is the *bottom* of the mirrored server-side
//!   chain's view into the connector: the server-side node nearest the
//!   connector holds one as its `child`, so its `server_recv`/`server_send`
//!   pull and push through the connector's buffers without ever touching
//!   the connector's own `&mut self`.
//! - `forward`, a `Weak` reference to the *top* of that same chain, is
//!   what [`EndpointConnector::client_send`] drives to process a request
//!   end to end (pull the raw request down through the mirrored chain,
//!   dispatch it, then push the raw reply back up through the same
//!   chain) — matching §4.7's "forward endpoint (the top of the server
//!   stack)" wording.
//!
//! Splitting the shared buffers out into [`SharedBuffers`] rather than
//! routing the mirrored chain's child calls back through
//! `Rc<RefCell<EndpointConnector>>` itself avoids a reentrant
//! `RefCell` borrow: `client_send` only ever holds its own borrow for the
//! instant it reads or writes a buffer, releasing it before driving the
//! mirrored chain.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::error::ChannelError;
use crate::node::{require_nonempty, ChannelNode};

#[derive(Default)]
struct SharedBuffers {
    /// Bytes submitted by `client_send`, awaiting a pull by the mirrored
    /// server-side chain (§4.7 invariant: "a second client_send while the
    /// server-direction buffer is non-empty returns busy").
    to_server: Option<Vec<u8>>,
    /// The fully server-wrapped reply, awaiting `client_recv`.
    to_client: Option<Vec<u8>>,
}

/// The connector's own face, as seen by the bottom of the mirrored
/// server-side chain.
pub struct ConnectorBridge(Rc<RefCell<SharedBuffers>>);

impl ChannelNode for ConnectorBridge {
    fn server_recv(&mut self) -> Result<Vec<u8>, ChannelError> {
        self.0
            .borrow_mut()
            .to_server
            .take()
            .ok_or(ChannelError::Busy)
    }

    fn server_send(&mut self, bytes: Vec<u8>) -> Result<(), ChannelError> {
        let mut buf = self.0.borrow_mut();
        if buf.to_client.is_some() {
            return Err(ChannelError::Busy);
        }
        buf.to_client = Some(bytes);
        Ok(())
    }
}

pub struct EndpointConnector {
    /// The owned inner Loopback Server Channel (or, in a deeper stack,
    /// whatever channel the `file://` segment yielded).
    inner: Box<dyn ChannelNode>,
    /// Non-owning reference to the top of the mirrored server-side chain;
    /// owned instead by the `Registry` handle alongside the client-side
    /// chain (§9 design note, resolved open item 5). `None` until
    /// [`EndpointConnector::set_forward`] wires it in — `Weak<RefCell<dyn
    /// ChannelNode>>` has no dangling sentinel of its own since `Weak::new`
    /// requires a `Sized` target, so the not-yet-wired state is modeled
    /// with `Option` instead of a placeholder `Weak`.
    forward: Option<Weak<RefCell<dyn ChannelNode>>>,
    buffers: Rc<RefCell<SharedBuffers>>,
}

impl EndpointConnector {
    /// `forward` is unresolved until [`EndpointConnector::set_forward`] is
    /// called; the identifier parser is responsible for wiring it in once
    /// the mirrored chain is built, and for keeping that chain alive for as
    /// long as the `Registry` handle that owns this stack.
    ///
    /// Building the mirrored chain requires this connector's
    /// [`ConnectorBridge`] before the chain's top node — and hence the
    /// `Weak` this connector needs — exists. Callers resolve that
    /// chicken-and-egg order by constructing with `forward` unset and
    /// filling it in via [`EndpointConnector::set_forward`] once the
    /// mirrored chain is built.
    pub fn new(inner: Box<dyn ChannelNode>) -> (Self, ConnectorBridge) {
        let buffers = Rc::new(RefCell::new(SharedBuffers::default()));
        let bridge = ConnectorBridge(buffers.clone());
        (
            Self {
                inner,
                forward: None,
                buffers,
            },
            bridge,
        )
    }

    pub fn set_forward(&mut self, forward: Weak<RefCell<dyn ChannelNode>>) {
        self.forward = Some(forward);
    }
}

impl ChannelNode for EndpointConnector {
    fn client_send(&mut self, bytes: Vec<u8>) -> Result<(), ChannelError> {
        require_nonempty(&bytes)?;
        {
            let mut buf = self.buffers.borrow_mut();
            if buf.to_server.is_some() {
                return Err(ChannelError::Busy);
            }
            buf.to_server = Some(bytes);
        }

        let forward = self
            .forward
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or(ChannelError::Failure)?;
        let raw_request = forward.borrow_mut().server_recv()?;

        self.inner.client_send(raw_request)?;
        let raw_reply = self.inner.client_recv()?;

        forward.borrow_mut().server_send(raw_reply)?;
        Ok(())
    }

    fn client_recv(&mut self) -> Result<Vec<u8>, ChannelError> {
        self.buffers
            .borrow_mut()
            .to_client
            .take()
            .ok_or(ChannelError::Busy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hmac::HmacChannel;
    use crate::loopback::LoopbackServerChannel;
    use registry_core::RequestHandler;

    struct Echo;
    impl RequestHandler for Echo {
        fn handle(&self, request: &[u8]) -> Option<Vec<u8>> {
            let mut out = b"echo:".to_vec();
            out.extend_from_slice(request);
            Some(out)
        }
    }

    /// Wires a connector and its single-key mirrored chain exactly as the
    /// identifier parser does for `file://x|hmac://k`: the connector is
    /// built first (with `forward` unset), its bridge becomes the mirrored
    /// node's child, and only then is `forward` filled in.
    fn single_key_stack(key: &str) -> HmacChannel {
        let inner = Box::new(LoopbackServerChannel::new(Rc::new(Echo)));
        let (mut connector, bridge) = EndpointConnector::new(inner);

        let mirrored_top = HmacChannel::new(Some(key.as_bytes().to_vec()), Box::new(bridge));
        let mirrored_top_rc: Rc<RefCell<dyn ChannelNode>> = Rc::new(RefCell::new(mirrored_top));
        connector.set_forward(Rc::downgrade(&mirrored_top_rc));

        HmacChannel::new(Some(key.as_bytes().to_vec()), Box::new(connector))
    }

    #[test]
    fn request_round_trips_through_connector_and_mirrored_chain() {
        let mut client_side = single_key_stack("thekey");

        client_side.client_send(b"hello".to_vec()).unwrap();
        let reply = client_side.client_recv().unwrap();
        assert_eq!(reply, b"echo:hello".to_vec());
    }

    #[test]
    fn second_request_before_the_first_reply_is_drained_is_busy() {
        // client_send drives the whole round trip synchronously, so the
        // server-direction buffer is empty again by the time it returns;
        // what a second send can still collide with is an unread reply
        // still sitting in the client-direction buffer.
        let mut client_side = single_key_stack("thekey");
        client_side.client_send(b"one".to_vec()).unwrap();
        assert_eq!(client_side.client_send(b"two".to_vec()), Err(ChannelError::Busy));
        assert_eq!(client_side.client_recv().unwrap(), b"echo:one".to_vec());
    }
}

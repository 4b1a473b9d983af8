//! The abstract boundary between a transport channel and whatever decodes
//! and answers request packets (§4.5, §4.9).
//!
//! A Loopback Server Channel (`registry-channel`) holds a `Rc<dyn
//! RequestHandler>` rather than depending on the crate that actually owns
//! the Value Store, so the channel stack composes independently of the
//! storage backend it happens to be wired to.

/// Something that can answer one request packet synchronously.
///
/// `handle` never itself returns an error: per §4.9, any failure in
/// decoding or executing a request is folded into an `ERROR` reply packet,
/// so the channel layer only ever sees a successful byte-for-byte reply.
///
/// `None` is reserved for the `SHUTDOWN` tag: the original backend sends no
/// packet at all for it (its success- and error-reply sends are both
/// bypassed), so a handler answering `SHUTDOWN` returns `None` rather than
/// an `INVALID`/`ERROR` reply, and the channel layer queues nothing.
pub trait RequestHandler {
    fn handle(&self, request: &[u8]) -> Option<Vec<u8>>;
}

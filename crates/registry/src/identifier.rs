//! Identifier Parser (§4.8): turns an identifier string of the form
//!
//! ```text
//! file://PATH('|'hmac://KEY)*
//! ```
//!
//! into a wired channel stack. The grammar is normative:
//!
//! - The first segment must be a `file://` segment; anything else
//!   (including a leading `hmac://` segment) is an unknown identifier.
//! - Every following segment must be `hmac://KEY`; an unrecognized scheme,
//!   or a trailing `|` with nothing after it, is an unknown identifier.
//! - An empty `KEY` means "no authentication on this hop" (§9 open
//!   question 4) — it still occupies a position in the chain, it just
//!   wraps/unwraps as a no-op.
//!
//! Each `hmac://` segment inserts one [`HmacChannel`] hop. The innermost
//! hop sits directly on the `file://` backend (for a bare `file://PATH`
//! identifier, there are no hops and no [`EndpointConnector`] at all); the
//! first such hop is reused as the [`EndpointConnector`]'s mirrored chain,
//! built in lockstep with the client-side chain so both legs authenticate
//! with the same keys hop-for-hop (§4.7).

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use registry_channel::{ChannelNode, EndpointConnector, HmacChannel, LoopbackServerChannel};
use registry_store::{RequestDispatcher, ValueStore};

use crate::error::RegistryError;

struct ParsedIdentifier {
    path: PathBuf,
    hmac_keys: Vec<Option<Vec<u8>>>,
}

fn parse(identifier: &str) -> Result<ParsedIdentifier, RegistryError> {
    if identifier.is_empty() || identifier.ends_with('|') {
        return Err(RegistryError::UnknownIdentifier);
    }

    let mut segments = identifier.split('|');
    let first = segments.next().ok_or(RegistryError::UnknownIdentifier)?;
    let path = first.strip_prefix("file://").ok_or(RegistryError::UnknownIdentifier)?;

    let mut hmac_keys = Vec::new();
    for segment in segments {
        let key = segment.strip_prefix("hmac://").ok_or(RegistryError::UnknownIdentifier)?;
        hmac_keys.push(if key.is_empty() { None } else { Some(key.as_bytes().to_vec()) });
    }

    Ok(ParsedIdentifier {
        path: PathBuf::from(path),
        hmac_keys,
    })
}

/// The wired-up result of opening an identifier: the client-facing end of
/// the chain, and (when present) the mirrored server-side chain that must
/// be kept alive for as long as the client chain is used, since the
/// connector only holds a `Weak` reference into it.
pub struct OpenedStack {
    pub client: Box<dyn ChannelNode>,
    pub server_chain: Option<Rc<RefCell<dyn ChannelNode>>>,
}

pub fn open(identifier: &str) -> Result<OpenedStack, RegistryError> {
    let parsed = parse(identifier)?;

    let store = ValueStore::open(parsed.path).map_err(|_| RegistryError::InvalidState)?;
    let dispatcher: Rc<dyn registry_core::RequestHandler> = Rc::new(RequestDispatcher::new(store));
    let loopback: Box<dyn ChannelNode> = Box::new(LoopbackServerChannel::new(dispatcher));

    if parsed.hmac_keys.is_empty() {
        return Ok(OpenedStack {
            client: loopback,
            server_chain: None,
        });
    }

    wire_hmac_chain(loopback, &parsed.hmac_keys)
}

/// Builds the connector and both of its mirrored chains. The connector is
/// constructed with `forward` unset first (its bridge has to exist before
/// the mirrored chain's top node does); once the mirrored chain is built,
/// [`EndpointConnector::set_forward`] wires the real reference in.
fn wire_hmac_chain(loopback: Box<dyn ChannelNode>, keys: &[Option<Vec<u8>>]) -> Result<OpenedStack, RegistryError> {
    let (mut connector, bridge) = EndpointConnector::new(loopback);

    let mut mirrored: Box<dyn ChannelNode> = Box::new(bridge);
    for key in &keys[..keys.len() - 1] {
        mirrored = Box::new(HmacChannel::new(key.clone(), mirrored));
    }
    let mirrored_top = HmacChannel::new(keys[keys.len() - 1].clone(), mirrored);
    let mirrored_top: Rc<RefCell<dyn ChannelNode>> = Rc::new(RefCell::new(mirrored_top));
    connector.set_forward(Rc::downgrade(&mirrored_top));

    let mut client: Box<dyn ChannelNode> = Box::new(connector);
    for key in keys {
        client = Box::new(HmacChannel::new(key.clone(), client));
    }

    Ok(OpenedStack {
        client,
        server_chain: Some(mirrored_top),
    })
}

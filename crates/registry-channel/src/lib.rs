//! registry-channel — the channel composition model (§4.4-§4.7): a
//! directed stack of single-buffer channels relaying length-delimited
//! request/response packets between a client and an in-process server,
//! with optional per-hop HMAC wrapping.

pub mod connector;
pub mod error;
pub mod hmac;
pub mod loopback;
pub mod node;

pub use connector::{ConnectorBridge, EndpointConnector};
pub use error::ChannelError;
pub use hmac::HmacChannel;
pub use loopback::LoopbackServerChannel;
pub use node::ChannelNode;

//! registry-core — wire format, HMAC authenticator, error/tag vocabulary,
//! and configuration shared by every other registry crate.

pub mod auth;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod tags;
pub mod wire;

pub use dispatch::RequestHandler;
pub use errors::{ErrorCode, ErrorKind};
pub use tags::{Tag, ValueKind};
pub use wire::{ByteBuffer, Field, Value};

//! The `Registry` handle (§3, §4.9): a typed client sitting on top of a
//! wired channel stack, translating typed calls into request packets and
//! `ERROR`/typed reply packets back into `Result`s.

use std::cell::RefCell;
use std::rc::Rc;

use registry_channel::ChannelNode;
use registry_core::wire::{pack, unpack, ByteBuffer, Field, Value};
use registry_core::{Tag, ValueKind};

use crate::error::RegistryError;
use crate::identifier;

/// An open connection to a registry backend, scoped to a single domain
/// label (§3: every operation implicitly targets the domain the handle
/// was opened with).
pub struct Registry {
    domain: String,
    client: Box<dyn ChannelNode>,
    /// Kept alive only so the connector's `Weak` reference into it stays
    /// valid for the handle's lifetime; never read directly.
    _server_chain: Option<Rc<RefCell<dyn ChannelNode>>>,
}

impl Registry {
    /// Opens `identifier` (§4.8) and scopes every subsequent operation to
    /// `domain`.
    pub fn open(identifier: &str, domain: &str) -> Result<Self, RegistryError> {
        let stack = identifier::open(identifier)?;
        Ok(Self {
            domain: domain.to_string(),
            client: stack.client,
            _server_chain: stack.server_chain,
        })
    }

    fn request(&mut self, tag: Tag, fmt: &str, fields: &[Field]) -> Result<Vec<u8>, RegistryError> {
        let mut buf = ByteBuffer::new();
        buf.write_byte(tag.as_u8()).map_err(|_| RegistryError::ArgumentError)?;
        pack(&mut buf, fmt, fields).map_err(|_| RegistryError::ArgumentError)?;
        let request = buf.into_vec();

        // Busy is advisory, not a suspension point (§5): in a correctly
        // wired stack these degenerate loops terminate in one iteration.
        loop {
            match self.client.client_send(request.clone()) {
                Ok(()) => break,
                Err(registry_channel::ChannelError::Busy) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        loop {
            match self.client.client_recv() {
                Ok(reply) => return Ok(reply),
                Err(registry_channel::ChannelError::Busy) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Decodes a reply's tag and, if it's an `ERROR` packet, translates its
    /// payload code into a [`RegistryError`].
    fn check_reply(reply: &[u8]) -> Result<(Tag, ByteBuffer), RegistryError> {
        let mut body = ByteBuffer::from_vec(reply.to_vec());
        let tag = Tag::from_u8(body.read_byte().map_err(|_| RegistryError::InvalidState)?);
        if tag == Tag::Error {
            let values = unpack(&mut body, "l").map_err(|_| RegistryError::InvalidState)?;
            let code = values
                .into_iter()
                .next()
                .and_then(Value::into_int)
                .ok_or(RegistryError::InvalidState)?;
            return Err(RegistryError::from_wire_code(code));
        }
        Ok((tag, body))
    }

    pub fn get_int(&mut self, key: &str) -> Result<i64, RegistryError> {
        let reply = self.request(Tag::GetInt, "ss", &[Field::Str(&self.domain), Field::Str(key)])?;
        let (_, mut body) = Self::check_reply(&reply)?;
        let values = unpack(&mut body, "l").map_err(|_| RegistryError::InvalidState)?;
        values
            .into_iter()
            .next()
            .and_then(Value::into_int)
            .ok_or(RegistryError::InvalidState)
    }

    pub fn set_int(&mut self, key: &str, value: i64) -> Result<(), RegistryError> {
        let reply = self.request(
            Tag::SetInt,
            "ssl",
            &[Field::Str(&self.domain), Field::Str(key), Field::Int(value)],
        )?;
        Self::check_reply(&reply).map(|_| ())
    }

    pub fn get_double(&mut self, key: &str) -> Result<f64, RegistryError> {
        let reply = self.request(Tag::GetDouble, "ss", &[Field::Str(&self.domain), Field::Str(key)])?;
        let (_, mut body) = Self::check_reply(&reply)?;
        let values = unpack(&mut body, "d").map_err(|_| RegistryError::InvalidState)?;
        values
            .into_iter()
            .next()
            .and_then(Value::into_double)
            .ok_or(RegistryError::InvalidState)
    }

    pub fn set_double(&mut self, key: &str, value: f64) -> Result<(), RegistryError> {
        let reply = self.request(
            Tag::SetDouble,
            "ssd",
            &[Field::Str(&self.domain), Field::Str(key), Field::Double(value)],
        )?;
        Self::check_reply(&reply).map(|_| ())
    }

    pub fn get_string(&mut self, key: &str) -> Result<String, RegistryError> {
        let reply = self.request(Tag::GetString, "ss", &[Field::Str(&self.domain), Field::Str(key)])?;
        let (_, mut body) = Self::check_reply(&reply)?;
        let values = unpack(&mut body, "s").map_err(|_| RegistryError::InvalidState)?;
        values
            .into_iter()
            .next()
            .and_then(Value::into_string)
            .ok_or(RegistryError::InvalidState)
    }

    pub fn set_string(&mut self, key: &str, value: &str) -> Result<(), RegistryError> {
        let reply = self.request(
            Tag::SetString,
            "sss",
            &[Field::Str(&self.domain), Field::Str(key), Field::Str(value)],
        )?;
        Self::check_reply(&reply).map(|_| ())
    }

    pub fn get_blob(&mut self, key: &str) -> Result<Vec<u8>, RegistryError> {
        let reply = self.request(Tag::GetBlob, "ss", &[Field::Str(&self.domain), Field::Str(key)])?;
        let (_, mut body) = Self::check_reply(&reply)?;
        let values = unpack(&mut body, "b").map_err(|_| RegistryError::InvalidState)?;
        values
            .into_iter()
            .next()
            .and_then(Value::into_blob)
            .ok_or(RegistryError::InvalidState)
    }

    pub fn set_blob(&mut self, key: &str, value: &[u8]) -> Result<(), RegistryError> {
        let reply = self.request(
            Tag::SetBlob,
            "ssb",
            &[Field::Str(&self.domain), Field::Str(key), Field::Bytes(value)],
        )?;
        Self::check_reply(&reply).map(|_| ())
    }

    pub fn get_value_type(&mut self, key: &str) -> Result<ValueKind, RegistryError> {
        let reply = self.request(Tag::GetValueType, "ss", &[Field::Str(&self.domain), Field::Str(key)])?;
        let (_, mut body) = Self::check_reply(&reply)?;
        let values = unpack(&mut body, "l").map_err(|_| RegistryError::InvalidState)?;
        let raw = values
            .into_iter()
            .next()
            .and_then(Value::into_int)
            .ok_or(RegistryError::InvalidState)?;
        ValueKind::from_i64(raw).ok_or(RegistryError::InvalidState)
    }

    /// Lists keys in this handle's domain matching the shell-glob
    /// `pattern` (§4.9, §4.10), sorted ascending.
    pub fn enum_keys(&mut self, pattern: &str) -> Result<Vec<String>, RegistryError> {
        let reply = self.request(Tag::GetEnum, "ss", &[Field::Str(&self.domain), Field::Str(pattern)])?;
        let (_, mut body) = Self::check_reply(&reply)?;
        let values = unpack(&mut body, "l").map_err(|_| RegistryError::InvalidState)?;
        let count = values
            .into_iter()
            .next()
            .and_then(Value::into_int)
            .ok_or(RegistryError::InvalidState)?;
        if count == 0 {
            return Ok(Vec::new());
        }
        let values = unpack(&mut body, "b").map_err(|_| RegistryError::InvalidState)?;
        let blob = values
            .into_iter()
            .next()
            .and_then(Value::into_blob)
            .ok_or(RegistryError::InvalidState)?;
        Ok(blob
            .split(|b| *b == 0)
            .filter(|chunk| !chunk.is_empty())
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect())
    }
}

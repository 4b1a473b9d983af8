//! Request Dispatcher (§4.9): decodes a request packet, invokes the Value
//! Store, and encodes a reply — the thing a Loopback Server Channel calls
//! synchronously on every `client_send`.

use registry_core::wire::{pack, unpack, ByteBuffer, Field, Value};
use registry_core::{RequestHandler, Tag};

use crate::{StoreError, ValueStore};

/// Owns the Value Store for its lifetime (§3) and answers one request
/// packet at a time; it retains no other state between requests (§4.9).
pub struct RequestDispatcher {
    store: ValueStore,
}

impl RequestDispatcher {
    pub fn new(store: ValueStore) -> Self {
        Self { store }
    }

    fn reply_ok(&self) -> Vec<u8> {
        encode(Tag::Ok, &[])
    }

    fn reply_error(&self, err: StoreError) -> Vec<u8> {
        encode(Tag::Error, &[Field::Int(err.code())])
    }

    fn dispatch(&self, request: &[u8]) -> Result<Vec<u8>, StoreError> {
        let mut buf = ByteBuffer::from_vec(request.to_vec());
        let tag = Tag::from_u8(buf.read_byte().map_err(|_| StoreError::InvalidState)?);

        match tag {
            Tag::GetInt => {
                let (domain, key) = read_ss(&mut buf)?;
                let value = self.store.get_int(&domain, &key)?;
                Ok(encode(Tag::Int, &[Field::Int(value)]))
            }
            Tag::SetInt => {
                let (domain, key, value) = read_ssl(&mut buf)?;
                self.store.set_int(&domain, &key, value)?;
                Ok(self.reply_ok())
            }
            Tag::GetDouble => {
                let (domain, key) = read_ss(&mut buf)?;
                let value = self.store.get_double(&domain, &key)?;
                Ok(encode(Tag::Double, &[Field::Double(value)]))
            }
            Tag::SetDouble => {
                let (domain, key, value) = read_ssd(&mut buf)?;
                self.store.set_double(&domain, &key, value)?;
                Ok(self.reply_ok())
            }
            Tag::GetString => {
                let (domain, key) = read_ss(&mut buf)?;
                let value = self.store.get_string(&domain, &key)?;
                Ok(encode(Tag::String, &[Field::Str(&value)]))
            }
            Tag::SetString => {
                let (domain, key, value) = read_sss(&mut buf)?;
                self.store.set_string(&domain, &key, &value)?;
                Ok(self.reply_ok())
            }
            Tag::GetBlob => {
                let (domain, key) = read_ss(&mut buf)?;
                let value = self.store.get_blob(&domain, &key)?;
                Ok(encode(Tag::Blob, &[Field::Bytes(&value)]))
            }
            Tag::SetBlob => {
                let (domain, key, value) = read_ssb(&mut buf)?;
                self.store.set_blob(&domain, &key, &value)?;
                Ok(self.reply_ok())
            }
            Tag::GetEnum => {
                let (domain, pattern) = read_ss(&mut buf)?;
                let keys = self.store.enum_keys(&domain, &pattern)?;
                Ok(encode_enum(&keys))
            }
            Tag::GetValueType => {
                let (domain, key) = read_ss(&mut buf)?;
                let kind = self.store.get_type(&domain, &key)?;
                Ok(encode(Tag::Type, &[Field::Int(kind.as_i64())]))
            }
            // A garbage/unrecognized tag byte (anything not in §4.9's
            // table, `SHUTDOWN` included) gets an `INVALID` reply; `handle`
            // below intercepts `SHUTDOWN` before this is ever reached, so
            // in practice this arm only covers a malformed tag byte.
            _ => Ok(encode(Tag::Invalid, &[])),
        }
    }
}

impl RequestHandler for RequestDispatcher {
    /// `SHUTDOWN` (§4.9) gets no reply packet at all: the original backend
    /// bypasses both its success- and error-reply sends for this one
    /// request kind, so this returns `None` rather than an `INVALID` or
    /// `ERROR` reply. This crate has no server process to tear down — the
    /// Value Store is just dropped along with the `RequestDispatcher` when
    /// its owning `Registry` handle goes out of scope — so there is no
    /// teardown step to perform here beyond suppressing the reply.
    fn handle(&self, request: &[u8]) -> Option<Vec<u8>> {
        let tag = request.first().copied().map(Tag::from_u8).unwrap_or(Tag::Invalid);
        let (domain, key) = peek_domain_key(request);

        if tag == Tag::Shutdown {
            tracing::trace!(?tag, "shutdown request received, no reply sent");
            return None;
        }

        match self.dispatch(request) {
            Ok(reply) => {
                tracing::trace!(?tag, ?domain, ?key, "request ok");
                Some(reply)
            }
            Err(err) => {
                tracing::trace!(?tag, ?domain, ?key, code = err.code(), "request failed");
                Some(self.reply_error(err))
            }
        }
    }
}

/// Every request schema in §4.9's table begins with `(domain, key)` as its
/// first two string fields (`GET_ENUM`'s second field is a glob pattern,
/// but it occupies the same slot). Peeked on a throwaway buffer purely for
/// the trace log above; decode failures here are swallowed since
/// `dispatch` will surface them on the real pass.
fn peek_domain_key(request: &[u8]) -> (Option<String>, Option<String>) {
    if request.len() <= 1 {
        return (None, None);
    }
    let mut buf = ByteBuffer::from_vec(request[1..].to_vec());
    match unpack(&mut buf, "ss") {
        Ok(values) => {
            let mut values = values;
            let key = values.pop().and_then(Value::into_string);
            let domain = values.pop().and_then(Value::into_string);
            (domain, key)
        }
        Err(_) => (None, None),
    }
}

fn encode(tag: Tag, fields: &[Field]) -> Vec<u8> {
    let mut buf = ByteBuffer::new();
    // A write failure here would mean the byte buffer itself is broken;
    // every reply shape here is fixed and small, so this never happens.
    buf.write_byte(tag.as_u8()).expect("tag byte always fits");
    let fmt: String = fields
        .iter()
        .map(|f| match f {
            Field::Int(_) => 'l',
            Field::Double(_) => 'd',
            Field::Str(_) => 's',
            Field::Bytes(_) => 'b',
        })
        .collect();
    pack(&mut buf, &fmt, fields).expect("reply fields always match their own format string");
    buf.into_vec()
}

/// `ENUM` replies (§4.9) are `l` (count) followed by `b` only when
/// `count > 0`; NUL-terminated tokens are concatenated into that blob.
fn encode_enum(keys: &[String]) -> Vec<u8> {
    let mut buf = ByteBuffer::new();
    buf.write_byte(Tag::Enum.as_u8()).expect("tag byte always fits");
    let count = keys.len() as i64;
    if keys.is_empty() {
        pack(&mut buf, "l", &[Field::Int(count)]).expect("count always fits");
        return buf.into_vec();
    }
    let mut concatenated = Vec::new();
    for key in keys {
        concatenated.extend_from_slice(key.as_bytes());
        concatenated.push(0);
    }
    pack(
        &mut buf,
        "lb",
        &[Field::Int(count), Field::Bytes(&concatenated)],
    )
    .expect("count and blob always fit");
    buf.into_vec()
}

fn read_ss(buf: &mut ByteBuffer) -> Result<(String, String), StoreError> {
    let values = unpack(buf, "ss").map_err(|_| StoreError::InvalidState)?;
    as_two_strings(values)
}

fn read_ssl(buf: &mut ByteBuffer) -> Result<(String, String, i64), StoreError> {
    let mut values = unpack(buf, "ssl").map_err(|_| StoreError::InvalidState)?;
    let value = pop_int(&mut values)?;
    let (domain, key) = as_two_strings(values)?;
    Ok((domain, key, value))
}

fn read_ssd(buf: &mut ByteBuffer) -> Result<(String, String, f64), StoreError> {
    let mut values = unpack(buf, "ssd").map_err(|_| StoreError::InvalidState)?;
    let value = pop_double(&mut values)?;
    let (domain, key) = as_two_strings(values)?;
    Ok((domain, key, value))
}

fn read_sss(buf: &mut ByteBuffer) -> Result<(String, String, String), StoreError> {
    let mut values = unpack(buf, "sss").map_err(|_| StoreError::InvalidState)?;
    let value = pop_string(&mut values)?;
    let (domain, key) = as_two_strings(values)?;
    Ok((domain, key, value))
}

fn read_ssb(buf: &mut ByteBuffer) -> Result<(String, String, Vec<u8>), StoreError> {
    let mut values = unpack(buf, "ssb").map_err(|_| StoreError::InvalidState)?;
    let value = pop_blob(&mut values)?;
    let (domain, key) = as_two_strings(values)?;
    Ok((domain, key, value))
}

fn as_two_strings(mut values: Vec<Value>) -> Result<(String, String), StoreError> {
    let key = pop_string(&mut values)?;
    let domain = pop_string(&mut values)?;
    Ok((domain, key))
}

fn pop_string(values: &mut Vec<Value>) -> Result<String, StoreError> {
    values
        .pop()
        .and_then(Value::into_string)
        .ok_or(StoreError::InvalidState)
}

fn pop_int(values: &mut Vec<Value>) -> Result<i64, StoreError> {
    values.pop().and_then(Value::into_int).ok_or(StoreError::InvalidState)
}

fn pop_double(values: &mut Vec<Value>) -> Result<f64, StoreError> {
    values
        .pop()
        .and_then(Value::into_double)
        .ok_or(StoreError::InvalidState)
}

fn pop_blob(values: &mut Vec<Value>) -> Result<Vec<u8>, StoreError> {
    values.pop().and_then(Value::into_blob).ok_or(StoreError::InvalidState)
}

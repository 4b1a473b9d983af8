//! Byte Buffer (§4.1) and Packer/Unpacker (§4.2): the tagged binary wire
//! format shared by every request and response packet.

use crate::errors::WireError;
use byteorder::{ByteOrder, BigEndian, LittleEndian};

const DOUBLE_NEG: u8 = 0x01;
const DOUBLE_NAN: u8 = 0x02;
const DOUBLE_INF: u8 = 0x04;
const DOUBLE_ZERO: u8 = 0x08;

/// A growable byte sequence with a read/write position cursor.
///
/// Packing always appends at the current position (so a fresh buffer just
/// grows); unpacking advances the cursor without ever reusing consumed
/// bytes. Both directions share one buffer/cursor pair so the same type
/// backs outbound packets (write-only) and inbound packets (read-only,
/// position starts at 0).
#[derive(Debug, Default, Clone)]
pub struct ByteBuffer {
    bytes: Vec<u8>,
    position: usize,
}

impl ByteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self { bytes, position: 0 }
    }

    pub fn read_byte(&mut self) -> Result<u8, WireError> {
        if self.position < self.bytes.len() {
            let b = self.bytes[self.position];
            self.position += 1;
            Ok(b)
        } else {
            Err(WireError::Read)
        }
    }

    pub fn write_byte(&mut self, b: u8) -> Result<(), WireError> {
        if self.position == self.bytes.len() {
            self.bytes.push(b);
            self.position += 1;
            Ok(())
        } else {
            // Packing is always append-at-tail in this implementation; a
            // cursor that has been rewound cannot be written through.
            Err(WireError::Write)
        }
    }

    pub fn view(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }
}

/// One decoded value slot, produced by [`unpack`] and consumed by callers
/// matching against the format string they passed in.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Double(f64),
    String(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn into_int(self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(v),
            _ => None,
        }
    }
    pub fn into_double(self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(v),
            _ => None,
        }
    }
    pub fn into_string(self) -> Option<String> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }
    pub fn into_blob(self) -> Option<Vec<u8>> {
        match self {
            Value::Blob(v) => Some(v),
            _ => None,
        }
    }
}

/// One value to pack, the write-side counterpart of [`Value`].
#[derive(Debug, Clone, Copy)]
pub enum Field<'a> {
    Int(i64),
    Double(f64),
    Str(&'a str),
    Bytes(&'a [u8]),
}

/// Packs `fields` into `buf` following `fmt`. `fmt` characters `l`, `d`,
/// `s`, `b` each consume one field from `fields` in order; `<`/`>` switch
/// endianness for subsequent fields and consume nothing.
///
/// Per §4.2's contract, bytes already written for earlier format
/// characters remain in `buf` even if a later character fails.
pub fn pack(buf: &mut ByteBuffer, fmt: &str, fields: &[Field]) -> Result<(), WireError> {
    let mut little_endian = true;
    let mut field_idx = 0;

    for ch in fmt.chars() {
        match ch {
            '<' => little_endian = true,
            '>' => little_endian = false,
            'l' => {
                let Field::Int(val) = next_field(fields, &mut field_idx)? else {
                    return Err(WireError::InvalidArguments);
                };
                write_i64(buf, val, little_endian)?;
            }
            'd' => {
                let Field::Double(val) = next_field(fields, &mut field_idx)? else {
                    return Err(WireError::InvalidArguments);
                };
                pack_double(buf, val, little_endian)?;
            }
            's' => {
                let Field::Str(val) = next_field(fields, &mut field_idx)? else {
                    return Err(WireError::InvalidArguments);
                };
                write_i64(buf, val.len() as i64, little_endian)?;
                for b in val.as_bytes() {
                    buf.write_byte(*b).map_err(|_| WireError::Write)?;
                }
            }
            'b' => {
                let Field::Bytes(val) = next_field(fields, &mut field_idx)? else {
                    return Err(WireError::InvalidArguments);
                };
                write_i64(buf, val.len() as i64, little_endian)?;
                for b in val {
                    buf.write_byte(*b).map_err(|_| WireError::Write)?;
                }
            }
            other => return Err(WireError::InvalidFormatString(other)),
        }
    }
    Ok(())
}

fn next_field<'a, 'b>(fields: &'b [Field<'a>], idx: &mut usize) -> Result<Field<'a>, WireError> {
    let f = fields.get(*idx).copied().ok_or(WireError::InvalidArguments)?;
    *idx += 1;
    Ok(f)
}

/// Unpacks values out of `buf` following `fmt`, returning one [`Value`] per
/// consuming format character in order.
pub fn unpack(buf: &mut ByteBuffer, fmt: &str) -> Result<Vec<Value>, WireError> {
    let mut little_endian = true;
    let mut out = Vec::new();

    for ch in fmt.chars() {
        match ch {
            '<' => little_endian = true,
            '>' => little_endian = false,
            'l' => {
                out.push(Value::Int(read_i64(buf, little_endian)?));
            }
            'd' => {
                out.push(Value::Double(unpack_double(buf, little_endian)?));
            }
            's' => {
                let bytes = read_length_prefixed(buf, little_endian)?;
                let s = String::from_utf8(bytes).map_err(|_| WireError::InvalidData)?;
                out.push(Value::String(s));
            }
            'b' => {
                let bytes = read_length_prefixed(buf, little_endian)?;
                out.push(Value::Blob(bytes));
            }
            other => return Err(WireError::InvalidFormatString(other)),
        }
    }
    Ok(out)
}

fn write_i64(buf: &mut ByteBuffer, val: i64, little_endian: bool) -> Result<(), WireError> {
    let mut tmp = [0u8; 8];
    if little_endian {
        LittleEndian::write_i64(&mut tmp, val);
    } else {
        BigEndian::write_i64(&mut tmp, val);
    }
    for b in tmp {
        buf.write_byte(b).map_err(|_| WireError::Write)?;
    }
    Ok(())
}

fn read_i64(buf: &mut ByteBuffer, little_endian: bool) -> Result<i64, WireError> {
    let mut tmp = [0u8; 8];
    for b in tmp.iter_mut() {
        *b = buf.read_byte().map_err(|_| WireError::Read)?;
    }
    Ok(if little_endian {
        LittleEndian::read_i64(&tmp)
    } else {
        BigEndian::read_i64(&tmp)
    })
}

fn read_length_prefixed(buf: &mut ByteBuffer, little_endian: bool) -> Result<Vec<u8>, WireError> {
    let len = read_i64(buf, little_endian)?;
    if len < 0 {
        return Err(WireError::InvalidData);
    }
    let len = len as usize;

    // A stored length longer than what's actually left in the buffer can
    // never be satisfied by the read loop below; reject it before
    // committing to an allocation of that size, mirroring bpack.c's
    // `rs > SIZE_MAX` guard against trusting an attacker-controlled length
    // outright.
    let remaining = buf.bytes.len().saturating_sub(buf.position);
    if len > remaining {
        return Err(WireError::Memory);
    }

    let mut bytes = Vec::new();
    bytes.try_reserve_exact(len).map_err(|_| WireError::Memory)?;
    for _ in 0..len {
        bytes.push(buf.read_byte().map_err(|_| WireError::Read)?);
    }
    Ok(bytes)
}

fn pack_double(buf: &mut ByteBuffer, val: f64, little_endian: bool) -> Result<(), WireError> {
    let sign_bit = if val.is_sign_negative() { DOUBLE_NEG } else { 0 };
    let (class_bit, special) = if val.is_nan() {
        // There is no negative NaN on the wire.
        (DOUBLE_NAN, true)
    } else if val.is_infinite() {
        (DOUBLE_INF, true)
    } else if val == 0.0 {
        (DOUBLE_ZERO, true)
    } else {
        (0, false)
    };

    let sign = if val.is_nan() { class_bit } else { sign_bit | class_bit };
    buf.write_byte(sign).map_err(|_| WireError::Write)?;
    if special {
        return Ok(());
    }

    let (mantissa, exponent) = frexp(val.abs());
    let exp16 = exponent as i16;
    let mut exp_bytes = [0u8; 2];
    if little_endian {
        LittleEndian::write_i16(&mut exp_bytes, exp16);
    } else {
        BigEndian::write_i16(&mut exp_bytes, exp16);
    }
    for b in exp_bytes {
        buf.write_byte(b).map_err(|_| WireError::Write)?;
    }

    let mantissa_bits = mantissa.to_bits() & 0x000f_ffff_ffff_ffff;
    write_i64(buf, mantissa_bits as i64, little_endian)
}

fn unpack_double(buf: &mut ByteBuffer, little_endian: bool) -> Result<f64, WireError> {
    let sign_byte = buf.read_byte().map_err(|_| WireError::Read)?;
    let negative = sign_byte & DOUBLE_NEG != 0;
    let class = sign_byte & !DOUBLE_NEG;

    if class == DOUBLE_NAN {
        if negative {
            return Err(WireError::InvalidData);
        }
        return Ok(f64::NAN);
    } else if class == DOUBLE_INF {
        return Ok(if negative { f64::NEG_INFINITY } else { f64::INFINITY });
    } else if class == DOUBLE_ZERO {
        return Ok(if negative { -0.0 } else { 0.0 });
    } else if class != 0 {
        return Err(WireError::InvalidData);
    }

    let mut exp_bytes = [0u8; 2];
    for b in exp_bytes.iter_mut() {
        *b = buf.read_byte().map_err(|_| WireError::Read)?;
    }
    let exponent = if little_endian {
        LittleEndian::read_i16(&exp_bytes)
    } else {
        BigEndian::read_i16(&exp_bytes)
    } as i32;

    let mantissa_raw = read_i64(buf, little_endian)? as u64;
    if mantissa_raw & 0xfff0_0000_0000_0000 != 0 {
        return Err(WireError::InvalidData);
    }
    let mantissa_bits = mantissa_raw | 0x3fe0_0000_0000_0000;
    let normalized = f64::from_bits(mantissa_bits);

    let value = ldexp(normalized, exponent);
    if value.is_infinite() {
        return Err(WireError::InvalidData);
    }

    Ok(if negative { -value } else { value })
}

/// Decomposes `x` (assumed finite, non-zero, non-negative) into `(m, e)`
/// such that `x == m * 2^e` and `m` lies in `[0.5, 1)`. Mirrors C's
/// `frexp`, including subnormal inputs.
fn frexp(x: f64) -> (f64, i32) {
    debug_assert!(x.is_finite() && x > 0.0);
    let mut x = x;
    let mut extra_exp = 0i32;
    if x < f64::MIN_POSITIVE {
        // Subnormal: scale up into the normal range before extracting bits.
        x *= 2f64.powi(54);
        extra_exp = -54;
    }
    let bits = x.to_bits();
    let raw_exp = ((bits >> 52) & 0x7ff) as i32;
    let frac = bits & 0x000f_ffff_ffff_ffff;
    let exponent = extra_exp + raw_exp - 1022;
    let mantissa_bits = (0x3feu64 << 52) | frac;
    (f64::from_bits(mantissa_bits), exponent)
}

/// `x * 2^exp`, mirroring C's `ldexp`. Multiplying by a power of two is
/// exact in binary floating point short of over/underflow.
fn ldexp(x: f64, exp: i32) -> f64 {
    x * 2f64.powi(exp)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_double(v: f64) -> f64 {
        let mut buf = ByteBuffer::new();
        pack(&mut buf, "d", &[Field::Double(v)]).unwrap();
        let mut reader = ByteBuffer::from_vec(buf.into_vec());
        unpack(&mut reader, "d").unwrap()[0].clone().into_double().unwrap()
    }

    #[test]
    fn int_roundtrip() {
        let mut buf = ByteBuffer::new();
        pack(&mut buf, "l", &[Field::Int(0x0123456789abcdefi64)]).unwrap();
        let mut reader = ByteBuffer::from_vec(buf.into_vec());
        let out = unpack(&mut reader, "l").unwrap();
        assert_eq!(out[0].clone().into_int().unwrap(), 0x0123456789abcdefi64);
    }

    #[test]
    fn string_roundtrip() {
        let mut buf = ByteBuffer::new();
        pack(&mut buf, "s", &[Field::Str("abc")]).unwrap();
        let mut reader = ByteBuffer::from_vec(buf.into_vec());
        let out = unpack(&mut reader, "s").unwrap();
        assert_eq!(out[0].clone().into_string().unwrap(), "abc");
    }

    #[test]
    fn blob_roundtrip() {
        let bytes = [0x42u8, 0x21, 0x13, 0x23];
        let mut buf = ByteBuffer::new();
        pack(&mut buf, "b", &[Field::Bytes(&bytes)]).unwrap();
        let mut reader = ByteBuffer::from_vec(buf.into_vec());
        let out = unpack(&mut reader, "b").unwrap();
        assert_eq!(out[0].clone().into_blob().unwrap(), bytes.to_vec());
    }

    #[test]
    fn double_roundtrip_common_values() {
        for v in [1.0, -1.0, 0.5, 123.456, -987654.321, 1e-10, 1e300, f64::MIN_POSITIVE] {
            assert_eq!(roundtrip_double(v).to_bits(), v.to_bits());
        }
    }

    #[test]
    fn double_positive_infinity_is_single_byte() {
        let mut buf = ByteBuffer::new();
        pack(&mut buf, "d", &[Field::Double(f64::INFINITY)]).unwrap();
        assert_eq!(buf.view(), &[0x04]);
        assert_eq!(roundtrip_double(f64::INFINITY), f64::INFINITY);
    }

    #[test]
    fn double_negative_zero_byte_is_0x09() {
        let mut buf = ByteBuffer::new();
        pack(&mut buf, "d", &[Field::Double(-0.0)]).unwrap();
        assert_eq!(buf.view(), &[0x09]);
        let out = roundtrip_double(-0.0);
        assert!(out == 0.0 && out.is_sign_negative());
    }

    #[test]
    fn double_nan_roundtrips_to_positive_nan() {
        let out = roundtrip_double(-f64::NAN);
        assert!(out.is_nan());
        assert!(!out.is_sign_negative());
    }

    #[test]
    fn negative_nan_byte_is_rejected_on_unpack() {
        let mut buf = ByteBuffer::new();
        buf.write_byte(DOUBLE_NAN | DOUBLE_NEG).unwrap();
        let mut reader = ByteBuffer::from_vec(buf.into_vec());
        assert_eq!(unpack_double(&mut reader, true), Err(WireError::InvalidData));
    }

    #[test]
    fn unknown_format_char_is_rejected() {
        let mut buf = ByteBuffer::new();
        assert_eq!(pack(&mut buf, "z", &[Field::Int(1)]), Err(WireError::InvalidFormatString('z')));
    }

    #[test]
    fn oversized_length_prefix_is_a_memory_error_not_an_allocation() {
        // A length prefix claiming far more bytes than the buffer actually
        // holds must be rejected before any allocation is attempted.
        let mut buf = ByteBuffer::new();
        write_i64(&mut buf, i64::MAX, true).unwrap();
        buf.write_byte(b'x').unwrap();
        let mut reader = ByteBuffer::from_vec(buf.into_vec());
        assert_eq!(unpack(&mut reader, "b"), Err(WireError::Memory));
    }
}

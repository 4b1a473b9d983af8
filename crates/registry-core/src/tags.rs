//! Packet tag codes (§6) — the 1-byte discriminator that opens every packet.

/// A packet tag. The numeric values are part of the wire contract and must
/// never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tag {
    Invalid = 0,
    Ok = 1,
    Error = 2,
    Int = 3,
    GetInt = 4,
    SetInt = 5,
    Double = 6,
    GetDouble = 7,
    SetDouble = 8,
    String = 9,
    GetString = 10,
    SetString = 11,
    Blob = 12,
    GetBlob = 13,
    SetBlob = 14,
    Enum = 15,
    GetEnum = 16,
    Type = 17,
    GetValueType = 18,
    Shutdown = 19,
}

impl Tag {
    pub fn from_u8(b: u8) -> Tag {
        match b {
            0 => Tag::Invalid,
            1 => Tag::Ok,
            2 => Tag::Error,
            3 => Tag::Int,
            4 => Tag::GetInt,
            5 => Tag::SetInt,
            6 => Tag::Double,
            7 => Tag::GetDouble,
            8 => Tag::SetDouble,
            9 => Tag::String,
            10 => Tag::GetString,
            11 => Tag::SetString,
            12 => Tag::Blob,
            13 => Tag::GetBlob,
            14 => Tag::SetBlob,
            15 => Tag::Enum,
            16 => Tag::GetEnum,
            17 => Tag::Type,
            18 => Tag::GetValueType,
            19 => Tag::Shutdown,
            _ => Tag::Invalid,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// The kind tag returned by `GET_VALUE_TYPE` (§4.9): a separate, smaller
/// numbering from `Tag` above, carried as the `l` payload of a `TYPE` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int = 0,
    Double = 1,
    String = 2,
    Blob = 3,
}

impl ValueKind {
    pub fn from_i64(v: i64) -> Option<ValueKind> {
        match v {
            0 => Some(ValueKind::Int),
            1 => Some(ValueKind::Double),
            2 => Some(ValueKind::String),
            3 => Some(ValueKind::Blob),
            _ => None,
        }
    }

    pub fn as_i64(self) -> i64 {
        self as i64
    }
}

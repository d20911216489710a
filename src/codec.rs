//! Leaf decoders: fixed-width integers, floats and UUIDs from byte slices.
//!
//! These are the byte -> value conversions the layout engine calls once a field's
//! byte range is known. Custom decoders plug in through [`LeafDecoder`].

use crate::error::LayoutError;
use crate::value::Value;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::fmt::Debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Big,
    Little,
}

/// Fixed-width numeric types understood by [`decode_base`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    Float,
    Double,
}

impl BaseType {
    pub fn size(&self) -> usize {
        match self {
            BaseType::U8 | BaseType::I8 => 1,
            BaseType::U16 | BaseType::I16 => 2,
            BaseType::U32 | BaseType::I32 | BaseType::Float => 4,
            BaseType::U64 | BaseType::I64 | BaseType::Double => 8,
        }
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            BaseType::I8 | BaseType::I16 | BaseType::I32 | BaseType::I64 | BaseType::Float | BaseType::Double
        )
    }

    /// Short name used in log lines and profile labels.
    pub fn name(&self) -> &'static str {
        match self {
            BaseType::U8 => "u8",
            BaseType::U16 => "u16",
            BaseType::U32 => "u32",
            BaseType::U64 => "u64",
            BaseType::I8 => "i8",
            BaseType::I16 => "i16",
            BaseType::I32 => "i32",
            BaseType::I64 => "i64",
            BaseType::Float => "f32",
            BaseType::Double => "f64",
        }
    }
}

/// A user-supplied byte -> value conversion with a fixed length.
pub trait LeafDecoder: Debug + Send + Sync {
    /// Number of bytes consumed per decode. Must be non-zero.
    fn length(&self) -> usize;

    /// Decodes exactly [`LeafDecoder::length`] bytes.
    fn decode(&self, bytes: &[u8]) -> Result<Value, LayoutError>;
}

/// Decodes `bytes` (exactly `bt.size()` long) as `bt`.
pub fn decode_base(bt: BaseType, endianness: Endianness, bytes: &[u8]) -> Value {
    debug_assert_eq!(bytes.len(), bt.size());
    match endianness {
        Endianness::Big => decode_with::<BigEndian>(bt, bytes),
        Endianness::Little => decode_with::<LittleEndian>(bt, bytes),
    }
}

fn decode_with<B: ByteOrder>(bt: BaseType, b: &[u8]) -> Value {
    match bt {
        BaseType::U8 => Value::U8(b[0]),
        BaseType::I8 => Value::I8(b[0] as i8),
        BaseType::U16 => Value::U16(B::read_u16(b)),
        BaseType::U32 => Value::U32(B::read_u32(b)),
        BaseType::U64 => Value::U64(B::read_u64(b)),
        BaseType::I16 => Value::I16(B::read_i16(b)),
        BaseType::I32 => Value::I32(B::read_i32(b)),
        BaseType::I64 => Value::I64(B::read_i64(b)),
        BaseType::Float => Value::Float(B::read_f32(b)),
        BaseType::Double => Value::Double(B::read_f64(b)),
    }
}

/// Decodes 16 bytes as a UUID. `Big` keeps RFC 4122 byte order; `Little` reads the first
/// three groups little-endian, as Windows GUIDs are stored.
pub fn decode_uuid(field: &str, endianness: Endianness, bytes: &[u8]) -> Result<Value, LayoutError> {
    let raw: [u8; 16] = bytes
        .try_into()
        .map_err(|_| LayoutError::out_of_range(field, 0, 16, bytes.len()))?;
    Ok(Value::Uuid(match endianness {
        Endianness::Big => Uuid::from_bytes(raw),
        Endianness::Little => Uuid::from_bytes_le(raw),
    }))
}

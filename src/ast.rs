//! Format definitions: the descriptor tree a buffer is parsed against.
//!
//! Descriptors are plain immutable data. They are validated when built, then shared
//! read-only by any number of [`Descriptor::parse`](crate::Descriptor::parse) calls.

use crate::bits::{low_mask, range_mask};
use crate::codec::{BaseType, Endianness, LeafDecoder};
use crate::error::LayoutError;
use crate::value::Value;
use std::sync::Arc;

/// Constant comparison attached to a field.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueCheck {
    /// Decoded value must equal this one, else [`LayoutError::ValueMismatch`].
    Expect(Value),
    /// Store `Bool(decoded == value)` instead of the decoded value. Never fails.
    Equals(Value),
}

impl ValueCheck {
    pub(crate) fn apply(&self, field: &str, decoded: Value) -> Result<Value, LayoutError> {
        match self {
            ValueCheck::Expect(expected) => {
                if *expected == decoded {
                    Ok(decoded)
                } else {
                    Err(LayoutError::ValueMismatch {
                        field: field.to_string(),
                        expected: expected.clone(),
                        found: decoded,
                    })
                }
            }
            ValueCheck::Equals(expected) => Ok(Value::Bool(*expected == decoded)),
        }
    }

    fn value(&self) -> &Value {
        match self {
            ValueCheck::Expect(v) | ValueCheck::Equals(v) => v,
        }
    }
}

/// How a leaf field turns its bytes into a value.
#[derive(Debug, Clone)]
pub enum LeafType {
    Base(BaseType, Endianness),
    /// Raw bytes, returned unchanged.
    Bytes(usize),
    /// One byte read as a boolean. With `Some(n)`, a nonzero byte must be exactly `n`.
    Flag(Option<u8>),
    /// 16-byte UUID. `Little` swaps the first three groups (Microsoft GUID layout).
    Uuid(Endianness),
    Custom(Arc<dyn LeafDecoder>),
}

impl LeafType {
    pub fn length(&self) -> usize {
        match self {
            LeafType::Base(bt, _) => bt.size(),
            LeafType::Bytes(n) => *n,
            LeafType::Flag(_) => 1,
            LeafType::Uuid(_) => 16,
            LeafType::Custom(d) => d.length(),
        }
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            LeafType::Base(bt, _) => bt.name(),
            LeafType::Bytes(_) => "bytes",
            LeafType::Flag(_) => "flag",
            LeafType::Uuid(_) => "uuid",
            LeafType::Custom(_) => "custom",
        }
    }

    /// `bytes` is exactly [`LeafType::length`] long.
    pub(crate) fn decode(&self, field: &str, bytes: &[u8]) -> Result<Value, LayoutError> {
        match self {
            LeafType::Base(bt, e) => Ok(crate::codec::decode_base(*bt, *e, bytes)),
            LeafType::Bytes(_) => Ok(Value::Bytes(bytes.to_vec())),
            LeafType::Flag(expected) => {
                let b = bytes[0];
                if b == 0 {
                    return Ok(Value::Bool(false));
                }
                match expected {
                    Some(n) if *n != b => Err(LayoutError::ValueMismatch {
                        field: field.to_string(),
                        expected: Value::U8(*n),
                        found: Value::U8(b),
                    }),
                    _ => Ok(Value::Bool(true)),
                }
            }
            LeafType::Uuid(e) => crate::codec::decode_uuid(field, *e, bytes),
            LeafType::Custom(d) => d.decode(bytes),
        }
    }

    /// Whether a decoded value of this type can ever equal `v`. Custom decoders accept anything.
    fn admits(&self, v: &Value) -> bool {
        match (self, v) {
            (LeafType::Base(bt, _), v) => base_admits(*bt, v),
            (LeafType::Bytes(n), Value::Bytes(b)) => b.len() == *n,
            (LeafType::Flag(_), Value::Bool(_)) => true,
            (LeafType::Uuid(_), Value::Uuid(_)) => true,
            (LeafType::Custom(_), _) => true,
            _ => false,
        }
    }
}

fn base_admits(bt: BaseType, v: &Value) -> bool {
    matches!(
        (bt, v),
        (BaseType::U8, Value::U8(_))
            | (BaseType::U16, Value::U16(_))
            | (BaseType::U32, Value::U32(_))
            | (BaseType::U64, Value::U64(_))
            | (BaseType::I8, Value::I8(_))
            | (BaseType::I16, Value::I16(_))
            | (BaseType::I32, Value::I32(_))
            | (BaseType::I64, Value::I64(_))
            | (BaseType::Float, Value::Float(_))
            | (BaseType::Double, Value::Double(_))
    )
}

fn check_mismatch(field: &str, kind: &str, v: &Value) -> LayoutError {
    LayoutError::DuplicateConfiguration(format!(
        "{} {}: constant {:?} can never match the decoded value",
        kind, field, v
    ))
}

/// A named, fixed-length field.
#[derive(Debug, Clone)]
pub struct LeafField {
    pub(crate) name: String,
    pub(crate) address: Option<usize>,
    pub(crate) ty: LeafType,
    pub(crate) check: Option<ValueCheck>,
}

impl LeafField {
    /// Fails with [`LayoutError::DuplicateConfiguration`] for zero-length types or a flag
    /// expecting zero.
    pub fn new(name: &str, ty: LeafType) -> Result<Self, LayoutError> {
        if ty.length() == 0 {
            return Err(LayoutError::DuplicateConfiguration(format!(
                "field {}: length must be at least 1 byte",
                name
            )));
        }
        if let LeafType::Flag(Some(0)) = ty {
            return Err(LayoutError::DuplicateConfiguration(format!(
                "flag {}: expected value must be nonzero",
                name
            )));
        }
        Ok(Self {
            name: name.to_string(),
            address: None,
            ty,
            check: None,
        })
    }

    fn base(name: &str, bt: BaseType, e: Endianness) -> Self {
        Self {
            name: name.to_string(),
            address: None,
            ty: LeafType::Base(bt, e),
            check: None,
        }
    }

    pub fn u8(name: &str) -> Self {
        Self::base(name, BaseType::U8, Endianness::Little)
    }

    pub fn i8(name: &str) -> Self {
        Self::base(name, BaseType::I8, Endianness::Little)
    }

    pub fn u16(name: &str, e: Endianness) -> Self {
        Self::base(name, BaseType::U16, e)
    }

    pub fn u32(name: &str, e: Endianness) -> Self {
        Self::base(name, BaseType::U32, e)
    }

    pub fn u64(name: &str, e: Endianness) -> Self {
        Self::base(name, BaseType::U64, e)
    }

    pub fn i16(name: &str, e: Endianness) -> Self {
        Self::base(name, BaseType::I16, e)
    }

    pub fn i32(name: &str, e: Endianness) -> Self {
        Self::base(name, BaseType::I32, e)
    }

    pub fn i64(name: &str, e: Endianness) -> Self {
        Self::base(name, BaseType::I64, e)
    }

    pub fn f32(name: &str, e: Endianness) -> Self {
        Self::base(name, BaseType::Float, e)
    }

    pub fn f64(name: &str, e: Endianness) -> Self {
        Self::base(name, BaseType::Double, e)
    }

    /// A single raw byte.
    pub fn byte(name: &str) -> Self {
        Self {
            name: name.to_string(),
            address: None,
            ty: LeafType::Bytes(1),
            check: None,
        }
    }

    pub fn bytes(name: &str, len: usize) -> Result<Self, LayoutError> {
        Self::new(name, LeafType::Bytes(len))
    }

    pub fn flag(name: &str, expected: Option<u8>) -> Result<Self, LayoutError> {
        Self::new(name, LeafType::Flag(expected))
    }

    pub fn uuid(name: &str, e: Endianness) -> Self {
        Self {
            name: name.to_string(),
            address: None,
            ty: LeafType::Uuid(e),
            check: None,
        }
    }

    pub fn custom(name: &str, decoder: Arc<dyn LeafDecoder>) -> Result<Self, LayoutError> {
        Self::new(name, LeafType::Custom(decoder))
    }

    /// Pins the field to `address` (in the enclosing chunk's frame).
    pub fn at(mut self, address: usize) -> Self {
        self.address = Some(address);
        self
    }

    pub fn renamed(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Fails with [`LayoutError::DuplicateConfiguration`] if `value` has a different variant
    /// (or byte length) than this field decodes to.
    pub fn expect(self, value: Value) -> Result<Self, LayoutError> {
        self.with_check(ValueCheck::Expect(value))
    }

    pub fn equals(self, value: Value) -> Result<Self, LayoutError> {
        self.with_check(ValueCheck::Equals(value))
    }

    fn with_check(mut self, check: ValueCheck) -> Result<Self, LayoutError> {
        if !self.ty.admits(check.value()) {
            return Err(check_mismatch(&self.name, self.ty.kind_name(), check.value()));
        }
        self.check = Some(check);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> Option<usize> {
        self.address
    }

    pub fn length(&self) -> usize {
        self.ty.length()
    }
}

/// One or more bits inside a single byte. Bit 0 is the most significant bit.
#[derive(Debug, Clone, PartialEq)]
pub struct BitField {
    pub(crate) name: String,
    pub(crate) bit_start: u8,
    pub(crate) bit_length: u8,
    pub(crate) check: Option<ValueCheck>,
}

impl BitField {
    pub fn new(name: &str, bit_start: u8, bit_length: u8) -> Result<Self, LayoutError> {
        // A whole byte is a `LeafField::u8`, not a bit field.
        if bit_length == 0 || bit_length >= 8 || bit_start as u16 + bit_length as u16 > 8 {
            return Err(LayoutError::DuplicateConfiguration(format!(
                "bit field {}: bits {}..{} are not a partial range of one byte",
                name,
                bit_start,
                bit_start as u16 + bit_length as u16
            )));
        }
        Ok(Self {
            name: name.to_string(),
            bit_start,
            bit_length,
            check: None,
        })
    }

    /// Single bit, decoded as `Bool`.
    pub fn flag(name: &str, bit: u8) -> Result<Self, LayoutError> {
        Self::new(name, bit, 1)
    }

    /// Multi-bit unsigned word, decoded as `U8` (a 1-bit word is still a `Bool`).
    pub fn word(name: &str, bit_start: u8, bit_length: u8) -> Result<Self, LayoutError> {
        Self::new(name, bit_start, bit_length)
    }

    /// 1-bit fields compare against `Bool`, wider ones against a `U8` that fits the width.
    pub fn expect(self, value: Value) -> Result<Self, LayoutError> {
        self.with_check(ValueCheck::Expect(value))
    }

    pub fn equals(self, value: Value) -> Result<Self, LayoutError> {
        self.with_check(ValueCheck::Equals(value))
    }

    fn with_check(mut self, check: ValueCheck) -> Result<Self, LayoutError> {
        let fits = match check.value() {
            Value::Bool(_) => self.bit_length == 1,
            Value::U8(v) => self.bit_length > 1 && *v <= low_mask(self.bit_length),
            _ => false,
        };
        if !fits {
            return Err(check_mismatch(&self.name, "bit field", check.value()));
        }
        self.check = Some(check);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn mask(&self) -> u8 {
        range_mask(self.bit_start, self.bit_length)
    }
}

/// Bit fields sharing one byte. Consumes exactly one byte.
#[derive(Debug, Clone, PartialEq)]
pub struct BitGroup {
    pub(crate) address: Option<usize>,
    pub(crate) fields: Vec<BitField>,
}

impl BitGroup {
    pub fn new(fields: Vec<BitField>) -> Result<Self, LayoutError> {
        if fields.is_empty() {
            return Err(LayoutError::DuplicateConfiguration(
                "bit group needs at least one field".to_string(),
            ));
        }
        for (i, f) in fields.iter().enumerate() {
            if let Some(prev) = fields[..i].iter().find(|p| p.mask() & f.mask() != 0) {
                return Err(LayoutError::OverlappingBitRange {
                    field: f.name.clone(),
                    other: prev.name.clone(),
                });
            }
        }
        Ok(Self { address: None, fields })
    }

    pub fn at(mut self, address: usize) -> Self {
        self.address = Some(address);
        self
    }

    pub fn fields(&self) -> &[BitField] {
        &self.fields
    }
}

/// Claims every byte left in the current window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Remnant {
    pub(crate) name: Option<String>,
}

/// Ordered group of descriptors parsed with one cursor.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub(crate) name: Option<String>,
    pub(crate) address: Option<usize>,
    pub(crate) relative: bool,
    pub(crate) optional: bool,
    pub(crate) length: Option<usize>,
    pub(crate) children: Vec<Descriptor>,
}

impl Chunk {
    /// Builds a relative, unnamed chunk.
    ///
    /// Fails with [`LayoutError::MisplacedRemnant`] if a remnant is not the last child and
    /// with [`LayoutError::NonMonotonicAddress`] if an explicit address can never be reached
    /// because earlier siblings already extend past it.
    pub fn new(children: Vec<Descriptor>) -> Result<Self, LayoutError> {
        let last = children.len().saturating_sub(1);
        let mut floor = 0usize;
        for (i, child) in children.iter().enumerate() {
            if child.claims_rest() && i != last {
                return Err(LayoutError::MisplacedRemnant { index: i });
            }
            if let Some(address) = child.address() {
                if address < floor {
                    return Err(LayoutError::NonMonotonicAddress {
                        address,
                        position: floor,
                    });
                }
                floor = address;
            }
            floor = floor.checked_add(child.min_size()).ok_or_else(|| {
                LayoutError::DuplicateConfiguration(format!(
                    "child {} at 0x{:x} extends past the end of the address space",
                    i, floor
                ))
            })?;
        }
        Ok(Self {
            name: None,
            address: None,
            relative: true,
            optional: false,
            length: None,
            children,
        })
    }

    /// Nests this chunk's output under `name` instead of merging it into the parent.
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn at(mut self, address: usize) -> Self {
        self.address = Some(address);
        self
    }

    /// Child addresses use the parent's frame instead of this chunk's start.
    pub fn absolute(mut self) -> Self {
        self.relative = false;
        self
    }

    /// Data errors inside this chunk make it contribute nothing instead of failing the parse.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Fixes the chunk to `length` bytes; unread bytes at its end become a spacer.
    pub fn with_length(mut self, length: usize) -> Result<Self, LayoutError> {
        if length == 0 {
            return Err(LayoutError::DuplicateConfiguration(
                "chunk length must be at least 1 byte".to_string(),
            ));
        }
        self.length = Some(length);
        Ok(self)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_relative(&self) -> bool {
        self.relative
    }

    pub fn children(&self) -> &[Descriptor] {
        &self.children
    }
}

/// Any element of a format definition.
#[derive(Debug, Clone)]
pub enum Descriptor {
    Field(LeafField),
    Bits(BitGroup),
    Chunk(Chunk),
    /// Moves the cursor forward to an address, emitting a spacer for the skipped bytes.
    PadTo(usize),
    Remnant(Remnant),
}

impl Descriptor {
    pub fn pad_to(address: usize) -> Self {
        Descriptor::PadTo(address)
    }

    pub fn remnant() -> Self {
        Descriptor::Remnant(Remnant::default())
    }

    pub fn named_remnant(name: &str) -> Self {
        Descriptor::Remnant(Remnant {
            name: Some(name.to_string()),
        })
    }

    /// Explicit address, if any.
    pub fn address(&self) -> Option<usize> {
        match self {
            Descriptor::Field(f) => f.address,
            Descriptor::Bits(b) => b.address,
            Descriptor::Chunk(c) => c.address,
            Descriptor::PadTo(a) => Some(*a),
            Descriptor::Remnant(_) => None,
        }
    }

    /// True for a remnant, or a non-optional chunk without a fixed length whose last child
    /// claims the rest: either way nothing after it in the same window can be reached.
    fn claims_rest(&self) -> bool {
        match self {
            Descriptor::Remnant(_) => true,
            Descriptor::Chunk(c) if !c.optional && c.length.is_none() => {
                c.children.last().map_or(false, Descriptor::claims_rest)
            }
            _ => false,
        }
    }

    /// Bytes this descriptor always consumes after its address, used for construction checks.
    fn min_size(&self) -> usize {
        match self {
            Descriptor::Field(f) => f.length(),
            Descriptor::Bits(_) => 1,
            Descriptor::Chunk(c) if c.optional => 0,
            Descriptor::Chunk(c) => c.length.unwrap_or(0),
            Descriptor::PadTo(_) | Descriptor::Remnant(_) => 0,
        }
    }
}

impl From<LeafField> for Descriptor {
    fn from(f: LeafField) -> Self {
        Descriptor::Field(f)
    }
}

impl From<BitGroup> for Descriptor {
    fn from(b: BitGroup) -> Self {
        Descriptor::Bits(b)
    }
}

impl From<Chunk> for Descriptor {
    fn from(c: Chunk) -> Self {
        Descriptor::Chunk(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_length_rejected() {
        assert!(matches!(
            LeafField::bytes("b", 0),
            Err(LayoutError::DuplicateConfiguration(_))
        ));
        assert!(matches!(
            Chunk::new(vec![]).and_then(|c| c.with_length(0)),
            Err(LayoutError::DuplicateConfiguration(_))
        ));
    }

    #[test]
    fn test_flag_expecting_zero_rejected() {
        assert!(LeafField::flag("f", Some(0)).is_err());
        assert!(LeafField::flag("f", Some(0x5a)).is_ok());
        assert!(LeafField::flag("f", None).is_ok());
    }

    #[test]
    fn test_bit_field_bounds() {
        assert!(BitField::new("a", 0, 7).is_ok());
        assert!(BitField::new("a", 1, 7).is_ok());
        assert!(BitField::new("a", 7, 1).is_ok());
        assert!(BitField::new("a", 0, 8).is_err());
        assert!(BitField::new("a", 255, 255).is_err());
        assert!(BitField::new("a", 8, 1).is_err());
        assert!(BitField::new("a", 5, 4).is_err());
        assert!(BitField::new("a", 0, 0).is_err());
    }

    #[test]
    fn test_overlapping_bits_rejected() {
        let res = BitGroup::new(vec![
            BitField::word("hi", 0, 4).unwrap(),
            BitField::flag("x", 3).unwrap(),
        ]);
        assert_eq!(
            res,
            Err(LayoutError::OverlappingBitRange {
                field: "x".to_string(),
                other: "hi".to_string()
            })
        );
        let ok = BitGroup::new(vec![
            BitField::word("hi", 0, 4).unwrap(),
            BitField::word("lo", 4, 4).unwrap(),
        ]);
        assert!(ok.is_ok());
        assert!(BitGroup::new(vec![]).is_err());
    }

    #[test]
    fn test_misplaced_remnant_rejected() {
        let res = Chunk::new(vec![Descriptor::remnant(), LeafField::u8("a").into()]);
        assert!(matches!(res, Err(LayoutError::MisplacedRemnant { index: 0 })));
        assert!(Chunk::new(vec![LeafField::u8("a").into(), Descriptor::remnant()]).is_ok());
    }

    #[test]
    fn test_backward_addresses_rejected_at_construction() {
        let res = Chunk::new(vec![
            LeafField::u32("a", Endianness::Little).at(8).into(),
            LeafField::u8("b").at(10).into(),
        ]);
        assert!(matches!(
            res,
            Err(LayoutError::NonMonotonicAddress { address: 10, position: 12 })
        ));
        let dup = Chunk::new(vec![
            LeafField::u8("a").at(4).into(),
            LeafField::u8("b").at(4).into(),
        ]);
        assert!(dup.is_err());
        let pad = Chunk::new(vec![LeafField::u16("a", Endianness::Big).into(), Descriptor::pad_to(1)]);
        assert!(pad.is_err());
        let adjacent = Chunk::new(vec![
            LeafField::u16("a", Endianness::Big).into(),
            LeafField::u8("b").at(2).into(),
        ]);
        assert!(adjacent.is_ok());
    }

    #[test]
    fn test_value_check() {
        let expect = ValueCheck::Expect(Value::U8(3));
        assert_eq!(expect.apply("f", Value::U8(3)), Ok(Value::U8(3)));
        assert!(matches!(
            expect.apply("f", Value::U8(4)),
            Err(LayoutError::ValueMismatch { .. })
        ));
        let equals = ValueCheck::Equals(Value::U8(3));
        assert_eq!(equals.apply("f", Value::U8(3)), Ok(Value::Bool(true)));
        assert_eq!(equals.apply("f", Value::U8(4)), Ok(Value::Bool(false)));
    }
}

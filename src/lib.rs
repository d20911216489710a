//! # bytelayout — Declarative binary layout decoding
//!
//! Describe a binary structure as a tree of descriptors, then parse byte buffers into
//! an insertion-ordered [`Record`] of named values. Every byte is accounted for: gaps
//! between explicitly addressed fields become `spacer_0x<start>-0x<end>` entries and a
//! trailing [`Descriptor::remnant`] claims whatever is left as `remnant_0x<start>`.
//!
//! ## Descriptors
//!
//! - [`LeafField`]: fixed-length field (`u8`..`u64`, `i8`..`i64`, `f32`, `f64`, raw bytes,
//!   byte flags, UUIDs, or a custom [`LeafDecoder`]), optionally pinned to an address and checked
//!   against a constant
//! - [`BitGroup`] of [`BitField`]s: sub-byte values sharing one byte (bit 0 = MSB)
//! - [`Chunk`]: ordered children with their own cursor; relative (default) or absolute
//!   addressing, optional fixed length, named (nested record) or unnamed (merged)
//! - [`Descriptor::pad_to`] and [`Descriptor::remnant`]: cursor directives
//!
//! Sibling fields with the same name are all kept: the second is stored as `"name 1"`,
//! the third as `"name 2"`, and so on.
//!
//! ## Example
//!
//! ```
//! use bytelayout::{Chunk, Descriptor, Endianness, LeafField, Value};
//!
//! let mut data = 45.23f64.to_le_bytes().to_vec();
//! data.extend([0u8; 120]);
//! data.extend(21.23f64.to_le_bytes());
//!
//! let format = Chunk::new(vec![
//!     LeafField::f64("fnum1", Endianness::Little).into(),
//!     LeafField::f64("fnum2", Endianness::Little).at(128).into(),
//! ])
//! .unwrap();
//! let parsed = format.parse(&data).unwrap();
//! assert_eq!(parsed.record.get("fnum2"), Some(&Value::Double(21.23)));
//! assert_eq!(
//!     parsed.record.get("spacer_0x8-0x7f"),
//!     Some(&Value::Bytes(vec![0; 120]))
//! );
//! assert!(parsed.is_complete());
//! # let _: Descriptor = format.into();
//! ```

pub mod ast;
pub mod bits;
pub mod codec;
pub mod cursor;
pub mod dump;
pub mod engine;
pub mod error;
pub mod frame;
pub mod profile;
pub mod value;

pub use ast::{BitField, BitGroup, Chunk, Descriptor, LeafField, LeafType, Remnant, ValueCheck};
pub use codec::{BaseType, Endianness, LeafDecoder};
pub use cursor::{Span, SpanKind};
pub use dump::dump_record;
pub use engine::Parsed;
pub use error::LayoutError;
pub use frame::{decode_frame, FrameDecodeResult};
pub use profile::{get_decode_profile, reset_decode_profile};
pub use value::{Record, Value};

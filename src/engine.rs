//! Parse a buffer against a descriptor tree.
//!
//! Every descriptor is handled by one `match` arm; chunks recurse with a fresh cursor
//! over their own window. Output goes into a [`Record`] plus a flat list of [`Span`]s
//! that together account for every consumed byte.

use crate::ast::{BitGroup, Chunk, Descriptor, LeafField, Remnant};
use crate::bits::read_bits;
use crate::cursor::{Cursor, Sink, Span, SpanKind};
use crate::error::LayoutError;
use crate::profile::ProfileGuard;
use crate::value::{remnant_label, Record, Value};
use log::{debug, trace};
use std::ops::Range;

/// Result of a successful parse.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub record: Record,
    /// Bytes claimed by the format, `[0, end)` for a root parse.
    pub consumed: Range<usize>,
    /// Consumed-range report: contiguous, ordered, covering `consumed` exactly once.
    pub spans: Vec<Span>,
    total_len: usize,
}

impl Parsed {
    /// Bytes after the consumed range that no descriptor claimed.
    pub fn trailing(&self) -> Range<usize> {
        self.consumed.end..self.total_len
    }

    pub fn is_complete(&self) -> bool {
        self.consumed.end == self.total_len
    }
}

fn parse_with<F>(data: &[u8], decode: F) -> Result<Parsed, LayoutError>
where
    F: FnOnce(&mut Cursor<'_>, &mut Sink<'_>) -> Result<(), LayoutError>,
{
    let mut record = Record::new();
    let mut spans = Vec::new();
    let mut cursor = Cursor::new(data);
    {
        let mut sink = Sink::root(&mut record, &mut spans);
        decode(&mut cursor, &mut sink)?;
    }
    debug!(
        "parsed {} of {} bytes into {} entries",
        cursor.position(),
        data.len(),
        record.len()
    );
    Ok(Parsed {
        record,
        consumed: 0..cursor.position(),
        spans,
        total_len: data.len(),
    })
}

impl Descriptor {
    /// Parses `data` from offset 0.
    pub fn parse(&self, data: &[u8]) -> Result<Parsed, LayoutError> {
        parse_with(data, |cur, sink| self.decode(cur, sink))
    }

    pub(crate) fn decode(&self, cur: &mut Cursor<'_>, sink: &mut Sink<'_>) -> Result<(), LayoutError> {
        match self {
            Descriptor::Field(f) => {
                let _g = ProfileGuard::new("Field");
                decode_field(f, cur, sink)
            }
            Descriptor::Bits(g) => {
                let _g = ProfileGuard::new("Bits");
                decode_bits(g, cur, sink)
            }
            Descriptor::Chunk(c) => {
                let _g = ProfileGuard::new("Chunk");
                decode_chunk(c, cur, sink)
            }
            Descriptor::PadTo(address) => {
                let _g = ProfileGuard::new("PadTo");
                cur.seek(*address, sink)
            }
            Descriptor::Remnant(r) => {
                let _g = ProfileGuard::new("Remnant");
                decode_remnant(r, cur, sink);
                Ok(())
            }
        }
    }
}

impl LeafField {
    pub fn parse(&self, data: &[u8]) -> Result<Parsed, LayoutError> {
        parse_with(data, |cur, sink| decode_field(self, cur, sink))
    }
}

impl BitGroup {
    pub fn parse(&self, data: &[u8]) -> Result<Parsed, LayoutError> {
        parse_with(data, |cur, sink| decode_bits(self, cur, sink))
    }
}

impl Chunk {
    pub fn parse(&self, data: &[u8]) -> Result<Parsed, LayoutError> {
        parse_with(data, |cur, sink| decode_chunk(self, cur, sink))
    }
}

fn decode_field(f: &LeafField, cur: &mut Cursor<'_>, sink: &mut Sink<'_>) -> Result<(), LayoutError> {
    if let Some(address) = f.address {
        cur.seek(address, sink)?;
    }
    let start = cur.absolute_position();
    let bytes = cur.take(f.ty.length(), &f.name)?;
    let mut value = f.ty.decode(&f.name, bytes)?;
    if let Some(check) = &f.check {
        value = check.apply(&f.name, value)?;
    }
    trace!("{} {} @0x{:x} = {:?}", f.ty.kind_name(), f.name, start, value);
    sink.emit(&f.name, value, SpanKind::Field, start..start + bytes.len());
    Ok(())
}

fn decode_bits(g: &BitGroup, cur: &mut Cursor<'_>, sink: &mut Sink<'_>) -> Result<(), LayoutError> {
    if let Some(address) = g.address {
        cur.seek(address, sink)?;
    }
    let start = cur.absolute_position();
    let byte = cur.take(1, "bit group")?[0];
    let mut values = Vec::with_capacity(g.fields.len());
    for bf in &g.fields {
        let raw = read_bits(byte, bf.bit_start, bf.bit_length);
        let mut value = if bf.bit_length == 1 {
            Value::Bool(raw != 0)
        } else {
            Value::U8(raw)
        };
        if let Some(check) = &bf.check {
            value = check.apply(&bf.name, value)?;
        }
        trace!("bits {} @0x{:x}[{}+{}] = {:?}", bf.name, start, bf.bit_start, bf.bit_length, value);
        values.push((bf.name.as_str(), value));
    }
    let keys: Vec<String> = values
        .into_iter()
        .map(|(name, value)| sink.insert(name, value))
        .collect();
    sink.span(&keys.join(","), SpanKind::Bits, start..start + 1);
    Ok(())
}

fn decode_chunk(c: &Chunk, cur: &mut Cursor<'_>, sink: &mut Sink<'_>) -> Result<(), LayoutError> {
    if !c.optional {
        return decode_chunk_body(c, cur, sink);
    }
    let mark = sink.mark();
    let saved = cur.position();
    match decode_chunk_body(c, cur, sink) {
        Err(e) if e.is_data_error() => {
            debug!(
                "optional chunk {} skipped at 0x{:x}: {}",
                c.name.as_deref().unwrap_or("<unnamed>"),
                cur.absolute_position(),
                e
            );
            sink.rollback(mark);
            cur.set_position(saved);
            Ok(())
        }
        other => other,
    }
}

fn decode_chunk_body(c: &Chunk, cur: &mut Cursor<'_>, sink: &mut Sink<'_>) -> Result<(), LayoutError> {
    if let Some(address) = c.address {
        cur.seek(address, sink)?;
    }
    let start = cur.position();
    let end = match c.length {
        Some(n) if n > cur.remaining() => {
            return Err(LayoutError::out_of_range(
                c.name.as_deref().unwrap_or("chunk"),
                start,
                n,
                cur.remaining(),
            ));
        }
        Some(n) => start + n,
        None => cur.len(),
    };
    let mut inner = if c.relative {
        cur.relative_window(start, end)
    } else {
        cur.absolute_window(start, end)
    };
    debug!(
        "chunk {} at abs 0x{:x} ({}, {} children)",
        c.name.as_deref().unwrap_or("<unnamed>"),
        inner.absolute_position(),
        if c.relative { "relative" } else { "absolute" },
        c.children.len()
    );

    match &c.name {
        Some(name) => {
            let key = sink.unique_key(name);
            let mut record = Record::new();
            {
                let mut nested = sink.nested(&mut record, &key);
                decode_children(c, &mut inner, &mut nested)?;
            }
            sink.insert(&key, Value::Record(record));
        }
        None => decode_children(c, &mut inner, sink)?,
    }

    let next = if c.relative {
        start + inner.position()
    } else {
        inner.position()
    };
    cur.set_position(next);
    Ok(())
}

fn decode_children(c: &Chunk, inner: &mut Cursor<'_>, sink: &mut Sink<'_>) -> Result<(), LayoutError> {
    for child in &c.children {
        child.decode(inner, sink)?;
    }
    if c.length.is_some() {
        let end = inner.len();
        inner.seek(end, sink)?;
    }
    Ok(())
}

fn decode_remnant(r: &Remnant, cur: &mut Cursor<'_>, sink: &mut Sink<'_>) {
    let start = cur.position();
    let abs = cur.absolute_position();
    let rest = cur.take_rest();
    if rest.is_empty() {
        return;
    }
    let label = r.name.clone().unwrap_or_else(|| remnant_label(start));
    debug!("{} ({} bytes at abs 0x{:x})", label, rest.len(), abs);
    sink.emit(&label, Value::Bytes(rest.to_vec()), SpanKind::Remnant, abs..abs + rest.len());
}

//! Read cursor and address resolution.
//!
//! A [`Cursor`] walks one chunk's window of the buffer. Positions are local to the
//! window; `origin` is the window's absolute offset in the root buffer so that spans
//! can be reported in root coordinates. Any jump forward (explicit address or pad)
//! emits the skipped bytes as a spacer entry, so no byte is dropped silently.

use crate::error::LayoutError;
use crate::value::{spacer_label, Record, Value};
use log::debug;
use std::ops::Range;

/// What produced a span in the consumed-range report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Field,
    Bits,
    Spacer,
    Remnant,
}

/// One byte-level entry of the consumed-range report, in absolute buffer offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// Key path of the entry; nested records are joined with `/`, bit groups list their keys with `,`.
    pub path: String,
    pub kind: SpanKind,
    pub range: Range<usize>,
}

/// Destination for entries produced while parsing one chunk.
pub(crate) struct Sink<'r> {
    record: &'r mut Record,
    spans: &'r mut Vec<Span>,
    prefix: String,
}

impl<'r> Sink<'r> {
    pub(crate) fn root(record: &'r mut Record, spans: &'r mut Vec<Span>) -> Self {
        Sink {
            record,
            spans,
            prefix: String::new(),
        }
    }

    /// Sink for a named sub-record stored under `key` of this sink.
    pub(crate) fn nested<'s>(&'s mut self, record: &'s mut Record, key: &str) -> Sink<'s> {
        Sink {
            record,
            spans: &mut *self.spans,
            prefix: format!("{}{}/", self.prefix, key),
        }
    }

    pub(crate) fn unique_key(&self, name: &str) -> String {
        self.record.unique_key(name)
    }

    /// Stores a value without recording a span. Returns the key used.
    pub(crate) fn insert(&mut self, name: &str, value: Value) -> String {
        self.record.insert_unique(name, value)
    }

    pub(crate) fn span(&mut self, keys: &str, kind: SpanKind, range: Range<usize>) {
        self.spans.push(Span {
            path: format!("{}{}", self.prefix, keys),
            kind,
            range,
        });
    }

    pub(crate) fn emit(&mut self, name: &str, value: Value, kind: SpanKind, range: Range<usize>) -> String {
        let key = self.insert(name, value);
        self.span(&key, kind, range);
        key
    }

    pub(crate) fn mark(&self) -> (usize, usize) {
        (self.record.len(), self.spans.len())
    }

    pub(crate) fn rollback(&mut self, mark: (usize, usize)) {
        self.record.truncate(mark.0);
        self.spans.truncate(mark.1);
    }
}

#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    origin: usize,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Cursor {
            data,
            origin: 0,
            pos: 0,
        }
    }

    /// Position relative to the start of this cursor's window.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn absolute_position(&self) -> usize {
        self.origin + self.pos
    }

    /// Window length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn set_position(&mut self, pos: usize) {
        debug_assert!(pos <= self.data.len());
        self.pos = pos;
    }

    /// Cursor over `[start, end)` of this window with positions restarting at 0.
    pub(crate) fn relative_window(&self, start: usize, end: usize) -> Cursor<'a> {
        Cursor {
            data: &self.data[start..end],
            origin: self.origin + start,
            pos: 0,
        }
    }

    /// Cursor sharing this window's frame, truncated at `end` and positioned at `start`.
    pub(crate) fn absolute_window(&self, start: usize, end: usize) -> Cursor<'a> {
        Cursor {
            data: &self.data[..end],
            origin: self.origin,
            pos: start,
        }
    }

    /// Moves forward to `address`. Bytes skipped over are stored as a spacer.
    pub(crate) fn seek(&mut self, address: usize, sink: &mut Sink<'_>) -> Result<(), LayoutError> {
        if address < self.pos {
            return Err(LayoutError::NonMonotonicAddress {
                address,
                position: self.pos,
            });
        }
        if address > self.data.len() {
            return Err(LayoutError::out_of_range(
                &format!("address 0x{:x}", address),
                self.pos,
                address - self.pos,
                self.remaining(),
            ));
        }
        if address > self.pos {
            let start = self.pos;
            let abs = self.origin + start;
            let label = spacer_label(start, address);
            debug!("spacer {} ({} bytes at abs 0x{:x})", label, address - start, abs);
            sink.emit(
                &label,
                Value::Bytes(self.data[start..address].to_vec()),
                SpanKind::Spacer,
                abs..self.origin + address,
            );
            self.pos = address;
        }
        Ok(())
    }

    /// Reads exactly `len` bytes and advances.
    pub(crate) fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8], LayoutError> {
        if self.remaining() < len {
            return Err(LayoutError::out_of_range(what, self.pos, len, self.remaining()));
        }
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    /// Reads everything up to the end of the window.
    pub(crate) fn take_rest(&mut self) -> &'a [u8] {
        let out = &self.data[self.pos..];
        self.pos = self.data.len();
        out
    }
}

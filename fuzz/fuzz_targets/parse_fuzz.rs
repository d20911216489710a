//! Parse fuzz target: feed arbitrary bytes to a fixed format mixing addressed fields,
//! bit groups, optional and fixed-length chunks and a remnant.
//! Parsing must not panic; it returns Ok(Parsed) whose spans cover the consumed range,
//! or Err(LayoutError).
//! Build with: cargo fuzz run parse_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use bytelayout::{BitField, BitGroup, Chunk, Descriptor, Endianness, LeafField, Value};
#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fn format() -> Option<Chunk> {
    let header = Chunk::new(vec![
        LeafField::u16("len", Endianness::Big).into(),
        BitGroup::new(vec![
            BitField::flag("ext", 0).ok()?,
            BitField::new("ver", 1, 3).ok()?,
            BitField::new("kind", 4, 4).ok()?,
        ])
        .ok()?
        .into(),
    ])
    .ok()?
    .named("header")
    .with_length(4)
    .ok()?;
    let ext = Chunk::new(vec![
        LeafField::u8("tag").expect(Value::U8(0xe1)).ok()?.into(),
        LeafField::f32("gain", Endianness::Little).into(),
    ])
    .ok()?
    .named("ext")
    .optional();
    Chunk::new(vec![
        header.into(),
        ext.into(),
        LeafField::flag("armed", Some(1)).ok()?.at(12).into(),
        LeafField::i64("stamp", Endianness::Little).into(),
        Descriptor::pad_to(32),
        Descriptor::remnant(),
    ])
    .ok()
}

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let Some(format) = format() else { return };
    if let Ok(parsed) = format.parse(data) {
        let mut at = parsed.consumed.start;
        for span in &parsed.spans {
            assert_eq!(span.range.start, at);
            at = span.range.end;
        }
        assert_eq!(at, parsed.consumed.end);
        assert!(parsed.consumed.end <= data.len());
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run parse_fuzz");
}

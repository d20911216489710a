//! Integration tests: end-to-end parses of complete formats (floats, spacers, remnants,
//! repeated nested records, frames).

use bytelayout::{
    decode_frame, dump_record, Chunk, Descriptor, Endianness, LeafField, Parsed, SpanKind, Value,
};

fn f64le(v: f64) -> Vec<u8> {
    v.to_le_bytes().to_vec()
}

/// 180-byte record: sparse bytes, an int, a float, a double and a pad to 180.
fn record_format() -> Chunk {
    Chunk::new(vec![
        LeafField::byte("byte_0").into(),
        LeafField::byte("byte_100").at(100).into(),
        LeafField::byte("byte_150").at(150).into(),
        LeafField::bytes("bytes_151", 3).unwrap().into(),
        LeafField::i32("int_154", Endianness::Little).into(),
        LeafField::f32("float_158", Endianness::Little).into(),
        LeafField::f64("float_158", Endianness::Little).into(),
        Descriptor::pad_to(180),
    ])
    .expect("record format")
}

fn record_bytes() -> Vec<u8> {
    let mut arr: Vec<u8> = (0u8..154).collect();
    arr.extend(14768i32.to_le_bytes());
    arr.extend(45.23f32.to_le_bytes());
    arr.extend(45.23f64.to_le_bytes());
    arr.extend(0u8..10);
    assert_eq!(arr.len(), 180);
    arr
}

fn assert_accounted(parsed: &Parsed) {
    let mut at = parsed.consumed.start;
    for span in &parsed.spans {
        assert_eq!(span.range.start, at, "gap or overlap before {}", span.path);
        at = span.range.end;
    }
    assert_eq!(at, parsed.consumed.end);
}

#[test]
fn test_single_double() -> anyhow::Result<()> {
    let data = f64le(45.23);
    let parsed = LeafField::f64("fnum", Endianness::Little).parse(&data)?;
    assert_eq!(parsed.record.len(), 1);
    assert_eq!(parsed.record.get("fnum"), Some(&Value::Double(45.23)));
    assert!(parsed.is_complete());
    Ok(())
}

#[test]
fn test_two_sequential_doubles() -> anyhow::Result<()> {
    let mut data = f64le(45.23);
    data.extend(f64le(21.23));
    let format = Chunk::new(vec![
        LeafField::f64("fnum1", Endianness::Little).into(),
        LeafField::f64("fnum2", Endianness::Little).into(),
    ])?;
    let parsed = format.parse(&data)?;
    assert_eq!(parsed.record.keys().collect::<Vec<_>>(), vec!["fnum1", "fnum2"]);
    assert_eq!(parsed.record.get("fnum1"), Some(&Value::Double(45.23)));
    assert_eq!(parsed.record.get("fnum2"), Some(&Value::Double(21.23)));
    Ok(())
}

#[test]
fn test_addressed_double_leaves_spacer() -> anyhow::Result<()> {
    let mut data = f64le(45.23);
    data.extend([0u8; 120]);
    data.extend(f64le(21.23));
    let format = Chunk::new(vec![
        LeafField::f64("fnum1", Endianness::Little).into(),
        LeafField::f64("fnum2", Endianness::Little).at(128).into(),
    ])?;
    let parsed = format.parse(&data)?;
    assert_eq!(
        parsed.record.keys().collect::<Vec<_>>(),
        vec!["fnum1", "spacer_0x8-0x7f", "fnum2"]
    );
    assert_eq!(parsed.record.get("spacer_0x8-0x7f"), Some(&Value::Bytes(vec![0; 120])));
    assert_eq!(parsed.record.get("fnum2"), Some(&Value::Double(21.23)));
    assert_eq!(parsed.spans[1].kind, SpanKind::Spacer);
    assert_eq!(parsed.spans[1].range, 8..128);
    assert_accounted(&parsed);
    Ok(())
}

#[test]
fn test_remnant_captures_tail() -> anyhow::Result<()> {
    let mut data = f64le(45.23);
    data.extend([9, 8, 7, 6, 5]);
    let without = Chunk::new(vec![LeafField::f64("fnum", Endianness::Little).into()])?;
    let parsed = without.parse(&data)?;
    assert_eq!(parsed.trailing(), 8..13);

    let with = Chunk::new(vec![
        LeafField::f64("fnum", Endianness::Little).into(),
        Descriptor::remnant(),
    ])?;
    let parsed = with.parse(&data)?;
    assert_eq!(parsed.record.get("remnant_0x8"), Some(&Value::Bytes(vec![9, 8, 7, 6, 5])));
    assert!(parsed.is_complete());
    assert_accounted(&parsed);
    Ok(())
}

#[test]
fn test_repeated_named_records_with_remnant() -> anyhow::Result<()> {
    let mut data = record_bytes();
    data.extend(record_bytes());
    data.extend([0, 0, 0]);

    let rec = record_format();
    let overall = Chunk::new(vec![
        rec.clone().named("First_chunk").into(),
        rec.named("Second_chunk").into(),
        Descriptor::remnant(),
    ])?;
    let parsed = overall.parse(&data)?;
    assert_eq!(
        parsed.record.keys().collect::<Vec<_>>(),
        vec!["First_chunk", "Second_chunk", "remnant_0x168"]
    );
    assert_eq!(parsed.record.get("remnant_0x168"), Some(&Value::Bytes(vec![0, 0, 0])));

    for key in ["First_chunk", "Second_chunk"] {
        let r = parsed.record.get(key).and_then(Value::as_record).expect("nested record");
        assert_eq!(
            r.keys().collect::<Vec<_>>(),
            vec![
                "byte_0",
                "spacer_0x1-0x63",
                "byte_100",
                "spacer_0x65-0x95",
                "byte_150",
                "bytes_151",
                "int_154",
                "float_158",
                "float_158 1",
                "spacer_0xaa-0xb3",
            ]
        );
        assert_eq!(r.get("byte_100"), Some(&Value::Bytes(vec![100])));
        assert_eq!(r.get("bytes_151"), Some(&Value::Bytes(vec![151, 152, 153])));
        assert_eq!(r.get("int_154"), Some(&Value::I32(14768)));
        assert_eq!(r.get("float_158"), Some(&Value::Float(45.23f32)));
        assert_eq!(r.get("float_158 1"), Some(&Value::Double(45.23)));
        assert_eq!(
            r.get("spacer_0xaa-0xb3"),
            Some(&Value::Bytes((0u8..10).collect()))
        );
    }

    let second_spacer = parsed
        .spans
        .iter()
        .find(|s| s.path == "Second_chunk/spacer_0x1-0x63")
        .expect("span for nested spacer");
    assert_eq!(second_spacer.range, 181..280);
    assert_accounted(&parsed);
    Ok(())
}

#[test]
fn test_frame_of_records() -> anyhow::Result<()> {
    let mut data = record_bytes();
    data.extend(record_bytes());
    data.extend([0, 0, 0]);

    let format: Descriptor = record_format().into();
    let res = decode_frame(None, &format, &data)?;
    assert_eq!(res.records.len(), 2);
    assert_eq!(res.records[0].byte_range, 0..180);
    assert_eq!(res.records[1].byte_range, 180..360);
    let trailing = res.trailing.expect("trailing bytes");
    assert_eq!(trailing.range, 360..363);
    assert!(trailing.reason.map(|e| e.is_data_error()).unwrap_or(false));
    Ok(())
}

#[test]
fn test_dump_of_parsed_record() -> anyhow::Result<()> {
    let format = Chunk::new(vec![
        LeafField::u8("kind").into(),
        Chunk::new(vec![LeafField::u16("len", Endianness::Big).into()])?
            .named("body")
            .into(),
        Descriptor::remnant(),
    ])?;
    let parsed = format.parse(&[7, 0x01, 0x00, 0xde, 0xad])?;
    assert_eq!(
        dump_record(&parsed.record),
        "kind: 7\nbody: {\n  len: 256\n}\nremnant_0x3: hex(de ad)"
    );
    Ok(())
}

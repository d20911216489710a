//! Format decoded records for display (dump text).

use crate::value::{Record, Value};

/// Raw scalar string.
pub fn format_scalar_raw(v: &Value) -> String {
    match v {
        Value::U8(x) => format!("{}", x),
        Value::U16(x) => format!("{}", x),
        Value::U32(x) => format!("{}", x),
        Value::U64(x) => format!("{}", x),
        Value::I8(x) => format!("{}", x),
        Value::I16(x) => format!("{}", x),
        Value::I32(x) => format!("{}", x),
        Value::I64(x) => format!("{}", x),
        Value::Bool(x) => format!("{}", x),
        Value::Float(x) => format!("{}", x),
        Value::Double(x) => format!("{}", x),
        Value::Bytes(b) => format!("hex({})", hex_string(b)),
        Value::Uuid(u) => u.to_string(),
        Value::Record(r) => format!("{{{} entries}}", r.len()),
    }
}

/// Space separated lowercase hex pairs.
pub fn hex_string(b: &[u8]) -> String {
    b.iter().map(|x| format!("{:02x}", x)).collect::<Vec<_>>().join(" ")
}

/// Multi-line dump of a record, nested records indented two spaces per level.
pub fn dump_record(record: &Record) -> String {
    let mut lines = Vec::new();
    dump_into(record, 0, &mut lines);
    lines.join("\n")
}

fn dump_into(record: &Record, indent: usize, lines: &mut Vec<String>) {
    let pad = "  ".repeat(indent);
    for (k, v) in record.iter() {
        match v {
            Value::Record(inner) => {
                lines.push(format!("{}{}: {{", pad, k));
                dump_into(inner, indent + 1, lines);
                lines.push(format!("{}}}", pad));
            }
            _ => lines.push(format!("{}{}: {}", pad, k, format_scalar_raw(v))),
        }
    }
}

//! Decoded values and the insertion-ordered record they are stored in.

use indexmap::IndexMap;
use uuid::Uuid;

/// A single decoded value (leaf or nested record).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Bool(bool),
    Float(f32),
    Double(f64),
    /// Raw bytes: `byte`/`bytes` fields, spacers and remnants.
    Bytes(Vec<u8>),
    Uuid(Uuid),
    /// Output of a named chunk.
    Record(Record),
}

impl Value {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U8(x) => Some(*x as u64),
            Value::U16(x) => Some(*x as u64),
            Value::U32(x) => Some(*x as u64),
            Value::U64(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I8(x) => Some(*x as i64),
            Value::I16(x) => Some(*x as i64),
            Value::I32(x) => Some(*x as i64),
            Value::I64(x) => Some(*x),
            Value::U8(x) => Some(*x as i64),
            Value::U16(x) => Some(*x as i64),
            Value::U32(x) => Some(*x as i64),
            Value::U64(x) => (*x).try_into().ok(),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(x) => Some(*x),
            Value::Float(x) => Some(*x as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Value::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}

/// Insertion-ordered mapping from key to [`Value`].
///
/// Keys are unique by construction: [`Record::insert_unique`] never overwrites, it
/// appends `" 1"`, `" 2"`, ... to a key that is already taken.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    entries: IndexMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// The key [`Record::insert_unique`] would store `name` under.
    pub fn unique_key(&self, name: &str) -> String {
        if !self.entries.contains_key(name) {
            return name.to_string();
        }
        let mut i = 1usize;
        loop {
            let candidate = format!("{} {}", name, i);
            if !self.entries.contains_key(&candidate) {
                return candidate;
            }
            i += 1;
        }
    }

    /// Stores `value` under `name`, or under the first free `"name N"`. Returns the key used.
    pub fn insert_unique(&mut self, name: &str, value: Value) -> String {
        let key = self.unique_key(name);
        self.entries.insert(key.clone(), value);
        key
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Drops every entry after the first `len`.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Label for the unlabeled gap `[start, end)`; the end in the label is inclusive.
pub fn spacer_label(start: usize, end: usize) -> String {
    if end - start > 1 {
        format!("spacer_0x{:x}-0x{:x}", start, end - 1)
    } else {
        format!("spacer_0x{:x}", start)
    }
}

pub fn remnant_label(start: usize) -> String {
    format!("remnant_0x{:x}", start)
}

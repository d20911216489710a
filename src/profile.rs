//! Where parse time goes, per descriptor kind.
//!
//! Built with the `decode_profile` feature, the engine times every descriptor it decodes
//! and adds the elapsed nanoseconds to a per-thread table under one of `"Field"`, `"Bits"`,
//! `"Chunk"`, `"PadTo"` or `"Remnant"`. A chunk's time includes its children, so
//! `"Chunk"` overlaps the other rows whenever formats nest.
//!
//! Without the feature the guard is a zero-sized no-op and [`get_decode_profile`] is
//! always empty. `benches/parse_records.rs` prints the table when the feature is on.

use std::collections::HashMap;

#[cfg(feature = "decode_profile")]
mod imp {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::time::Instant;

    thread_local! {
        static NANOS_BY_KIND: RefCell<HashMap<&'static str, u64>> = RefCell::new(HashMap::new());
    }

    pub(crate) fn clear() {
        NANOS_BY_KIND.with(|t| t.borrow_mut().clear());
    }

    pub(crate) fn snapshot() -> HashMap<String, u64> {
        NANOS_BY_KIND.with(|t| t.borrow().iter().map(|(k, v)| (k.to_string(), *v)).collect())
    }

    /// Charges the time between construction and drop to `kind`.
    pub(crate) struct ProfileGuard {
        kind: &'static str,
        started: Instant,
    }

    impl ProfileGuard {
        pub(crate) fn new(kind: &'static str) -> Self {
            Self {
                kind,
                started: Instant::now(),
            }
        }
    }

    impl Drop for ProfileGuard {
        fn drop(&mut self) {
            let ns = self.started.elapsed().as_nanos() as u64;
            NANOS_BY_KIND.with(|t| *t.borrow_mut().entry(self.kind).or_insert(0) += ns);
        }
    }
}

#[cfg(not(feature = "decode_profile"))]
mod imp {
    use std::collections::HashMap;

    pub(crate) fn clear() {}

    pub(crate) fn snapshot() -> HashMap<String, u64> {
        HashMap::new()
    }

    pub(crate) struct ProfileGuard;

    impl ProfileGuard {
        #[inline(always)]
        pub(crate) fn new(_kind: &'static str) -> Self {
            ProfileGuard
        }
    }
}

pub(crate) use imp::ProfileGuard;

/// Clears this thread's table.
pub fn reset_decode_profile() {
    imp::clear();
}

/// This thread's table: descriptor kind -> total nanoseconds since the last reset.
pub fn get_decode_profile() -> HashMap<String, u64> {
    imp::snapshot()
}

#[cfg(all(test, feature = "decode_profile"))]
mod tests {
    use super::*;
    use crate::{Chunk, LeafField};

    #[test]
    fn test_profile_counts_descriptor_kinds() {
        let format = Chunk::new(vec![LeafField::u8("a").into(), LeafField::u8("b").into()]).unwrap();
        reset_decode_profile();
        format.parse(&[1, 2]).unwrap();
        let profile = get_decode_profile();
        assert!(profile.contains_key("Field"));
        reset_decode_profile();
        assert!(get_decode_profile().is_empty());
    }
}

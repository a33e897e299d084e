//! Message and phonebook storage areas.
//!
//! Modems name their storages with short tokens (`"SM"` for the SIM card,
//! `"ME"` for modem flash, ...). The same tokens appear in `+CPMS`,
//! `+CPBS` and `+CMTI` payloads, and storage capability lists are compact
//! enough to keep as a bitset.

use crate::parse::Cursor;

/// A storage area for SMS messages or phonebook entries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MemoryKind {
    #[default]
    Unknown = 0,
    /// SIM card storage
    Sm,
    /// Modem internal storage
    Me,
    /// Combined SIM and modem storage
    Mt,
    /// Broadcast messages
    Bm,
    /// Status reports
    Sr,
    /// Own numbers
    On,
    /// Fixed-dialing phonebook
    Fd,
    /// Last-dialed numbers
    Ld,
    /// Missed calls
    Mc,
    /// Received calls
    Rc,
    /// Emergency numbers
    En,
}

/// Storage tokens understood by the driver, tried in declaration order.
///
/// This is the device table: a modem that spells a storage differently can
/// still be driven, its extra storages just parse as
/// [`MemoryKind::Unknown`].
pub const MEMORY_MAP: &[(&str, MemoryKind)] = &[
    ("SM", MemoryKind::Sm),
    ("ME", MemoryKind::Me),
    ("MT", MemoryKind::Mt),
    ("BM", MemoryKind::Bm),
    ("SR", MemoryKind::Sr),
    ("ON", MemoryKind::On),
    ("FD", MemoryKind::Fd),
    ("LD", MemoryKind::Ld),
    ("MC", MemoryKind::Mc),
    ("RC", MemoryKind::Rc),
    ("EN", MemoryKind::En),
];

impl MemoryKind {
    /// The wire token for this storage, for building `+CPMS`/`+CPBS`
    /// commands. `Unknown` has no token.
    pub fn token(self) -> Option<&'static str> {
        MEMORY_MAP
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(token, _)| *token)
    }
}

/// The set of storages a modem reports as selectable.
///
/// Bit `k` is set iff `MemoryKind` with discriminant `k` was listed.
/// `MemoryKind` must stay below 32 variants for this to hold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MemoryBitset(u32);

impl MemoryBitset {
    pub const EMPTY: MemoryBitset = MemoryBitset(0);

    pub fn set(&mut self, kind: MemoryKind) {
        self.0 |= 1 << kind as u32;
    }

    pub fn contains(self, kind: MemoryKind) -> bool {
        self.0 & (1 << kind as u32) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Parse one storage token, e.g. `"SM"`. Unrecognized tokens are drained
/// and yield [`MemoryKind::Unknown`].
pub fn parse_memory(cur: &mut Cursor<'_>) -> MemoryKind {
    cur.eat(b',');
    cur.eat(b'"');

    for (token, kind) in MEMORY_MAP {
        if cur.rest().starts_with(token.as_bytes()) {
            cur.advance(token.len());
            cur.eat(b'"');
            return *kind;
        }
    }

    cur.skip_string();
    cur.eat(b'"');
    MemoryKind::Unknown
}

/// Parse a parenthesized storage list, e.g. `("SM","ME","MT")`, into a
/// bitset. Stops at the closing `)` (consumed) or the end of the input.
pub fn parse_memories(cur: &mut Cursor<'_>) -> MemoryBitset {
    let mut set = MemoryBitset::EMPTY;

    cur.eat(b',');
    cur.eat(b'(');
    loop {
        match cur.rest().first() {
            None | Some(b')') => break,
            Some(_) => set.set(parse_memory(cur)),
        }
    }
    cur.eat(b')');
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        let mut cur = Cursor::from_str("\"ME\",10");
        assert_eq!(parse_memory(&mut cur), MemoryKind::Me);
        assert_eq!(cur.number(), 10);
    }

    #[test]
    fn unknown_token_is_drained() {
        let mut cur = Cursor::from_str("\"XX\",10");
        assert_eq!(parse_memory(&mut cur), MemoryKind::Unknown);
        assert_eq!(cur.number(), 10);
    }

    #[test]
    fn memories_bitset_exact() {
        let mut cur = Cursor::from_str("(\"SM\",\"ME\",\"MT\"),rest");
        let set = parse_memories(&mut cur);

        for (_, kind) in MEMORY_MAP {
            assert_eq!(
                set.contains(*kind),
                matches!(kind, MemoryKind::Sm | MemoryKind::Me | MemoryKind::Mt),
            );
        }
        assert!(!set.contains(MemoryKind::Unknown));
        assert_eq!(cur.number(), 0);
        assert_eq!(cur.rest(), b"rest");
    }

    #[test]
    fn empty_list_is_empty_set() {
        let mut cur = Cursor::from_str("()");
        assert!(parse_memories(&mut cur).is_empty());
        assert!(cur.at_line_end());
    }
}

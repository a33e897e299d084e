use core::fmt::Write;
use heapless::String;

use super::cpms::StorageQuery;
use super::{AtRequest, GenericOk};
use crate::device::MemoryPool;
use crate::memory::{parse_memories, parse_memory, MemoryKind};
use crate::parse::Cursor;

/// AT+CPBS=?
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueryPhonebookOptions;

impl AtRequest for QueryPhonebookOptions {
    type Response = GenericOk;
    fn encode(&self) -> String<256> {
        "AT+CPBS=?\r".into()
    }
}

/// AT+CPBS?
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueryPhonebookStorage;

impl AtRequest for QueryPhonebookStorage {
    type Response = GenericOk;
    fn encode(&self) -> String<256> {
        "AT+CPBS?\r".into()
    }
}

/// AT+CPBS=..., select the phonebook storage
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SelectPhonebookStorage {
    pub storage: MemoryKind,
}

impl AtRequest for SelectPhonebookStorage {
    type Response = GenericOk;
    fn encode(&self) -> String<256> {
        let mut buf = String::new();
        write!(
            buf,
            "AT+CPBS=\"{}\"\r",
            self.storage.token().unwrap_or_default()
        )
        .unwrap();
        buf
    }
}

/// Parse a `+CPBS` payload into the phonebook storage pool.
pub(crate) fn parse(rest: &str, query: StorageQuery, pool: &mut MemoryPool) {
    let mut cur = Cursor::from_str(rest);
    match query {
        StorageQuery::Options => {
            pool.available = parse_memories(&mut cur);
        }
        StorageQuery::Current => {
            pool.current = parse_memory(&mut cur);
            pool.used = cur.number() as u16;
            pool.total = cur.number() as u16;
        }
        StorageQuery::Select => {
            pool.used = cur.number() as u16;
            pool.total = cur.number() as u16;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_info() {
        let mut pool = MemoryPool::new();
        parse("\"SM\",31,250", StorageQuery::Current, &mut pool);
        assert_eq!(pool.current, MemoryKind::Sm);
        assert_eq!((pool.used, pool.total), (31, 250));
    }

    #[test]
    fn options_list() {
        let mut pool = MemoryPool::new();
        parse("(\"SM\",\"FD\",\"ON\")", StorageQuery::Options, &mut pool);
        for kind in [MemoryKind::Sm, MemoryKind::Fd, MemoryKind::On] {
            assert!(pool.available.contains(kind));
        }
        assert!(!pool.available.contains(MemoryKind::Me));
    }
}

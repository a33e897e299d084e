use core::fmt::Write;
use heapless::String;

use super::{AtRequest, GenericOk};
use crate::device::MemoryPool;
use crate::memory::{parse_memories, parse_memory, MemoryKind};
use crate::parse::Cursor;

/// Which flavor of `+CPMS`/`+CPBS` answer to expect. The three forms are
/// not distinguishable from the line alone, so the in-flight command
/// carries this.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageQuery {
    /// `=?`: lists of selectable storages
    Options,
    /// `?`: current storage plus used/total counts
    Current,
    /// `=`: used/total counts only
    Select,
}

/// AT+CPMS=?
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueryStorageOptions;

impl AtRequest for QueryStorageOptions {
    type Response = GenericOk;
    fn encode(&self) -> String<256> {
        "AT+CPMS=?\r".into()
    }
}

/// AT+CPMS?
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueryStorage;

impl AtRequest for QueryStorage {
    type Response = GenericOk;
    fn encode(&self) -> String<256> {
        "AT+CPMS?\r".into()
    }
}

/// AT+CPMS=..., select the operation/receive/sent storages
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SelectStorage {
    pub operation: MemoryKind,
    pub receive: MemoryKind,
    pub sent: MemoryKind,
}

impl AtRequest for SelectStorage {
    type Response = GenericOk;
    fn encode(&self) -> String<256> {
        let mut buf = String::new();
        write!(
            buf,
            "AT+CPMS=\"{}\",\"{}\",\"{}\"\r",
            self.operation.token().unwrap_or_default(),
            self.receive.token().unwrap_or_default(),
            self.sent.token().unwrap_or_default(),
        )
        .unwrap();
        buf
    }
}

/// Parse a `+CPMS` payload into the three SMS storage slots.
pub(crate) fn parse(rest: &str, query: StorageQuery, pools: &mut [MemoryPool; 3]) {
    let mut cur = Cursor::from_str(rest);
    for pool in pools {
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBitset;

    #[test]
    fn current_info_three_slots() {
        let mut pools = [MemoryPool::new(); 3];
        parse(
            "\"ME\",10,20,\"SM\",2,10,\"ME\",0,20",
            StorageQuery::Current,
            &mut pools,
        );

        assert_eq!(pools[0].current, MemoryKind::Me);
        assert_eq!((pools[0].used, pools[0].total), (10, 20));
        assert_eq!(pools[1].current, MemoryKind::Sm);
        assert_eq!((pools[1].used, pools[1].total), (2, 10));
        assert_eq!(pools[2].current, MemoryKind::Me);
        assert_eq!((pools[2].used, pools[2].total), (0, 20));
    }

    #[test]
    fn options_lists() {
        let mut pools = [MemoryPool::new(); 3];
        parse(
            "(\"SM\",\"ME\"),(\"SM\"),(\"ME\")",
            StorageQuery::Options,
            &mut pools,
        );

        let mut both = MemoryBitset::EMPTY;
        both.set(MemoryKind::Sm);
        both.set(MemoryKind::Me);
        assert_eq!(pools[0].available, both);
        assert!(pools[1].available.contains(MemoryKind::Sm));
        assert!(!pools[1].available.contains(MemoryKind::Me));
        assert!(pools[2].available.contains(MemoryKind::Me));
    }

    #[test]
    fn select_info_counts_only() {
        let mut pools = [MemoryPool::new(); 3];
        parse("1,20,2,30,3,40", StorageQuery::Select, &mut pools);
        assert_eq!((pools[0].used, pools[0].total), (1, 20));
        assert_eq!((pools[1].used, pools[1].total), (2, 30));
        assert_eq!((pools[2].used, pools[2].total), (3, 40));
    }
}

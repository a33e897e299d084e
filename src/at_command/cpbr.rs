use core::fmt::Write;
use heapless::String;

use super::clcc::NumberType;
use super::{AtRequest, GenericOk};
use crate::parse::Cursor;

/// One phonebook slot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhonebookEntry {
    pub position: u16,
    pub name: String<20>,
    pub number_type: NumberType,
    pub number: String<26>,
}

/// AT+CPBR=..., read a range of phonebook positions. Each used position
/// produces one `+CPBR` row.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReadPhonebook {
    pub start: u16,
    pub end: u16,
}

impl AtRequest for ReadPhonebook {
    type Response = GenericOk;
    fn encode(&self) -> String<256> {
        let mut buf = String::new();
        write!(buf, "AT+CPBR={},{}\r", self.start, self.end).unwrap();
        buf
    }
}

/// Parse the payload of one `+CPBR`/`+CPBF` row.
pub(crate) fn parse_row(rest: &str) -> PhonebookEntry {
    let mut cur = Cursor::from_str(rest);

    let position = cur.number() as u16;
    let name = cur.string(true);
    let number_type = NumberType::from_code(cur.number());
    let number = cur.string(true);

    PhonebookEntry {
        position,
        name,
        number_type,
        number,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row() {
        let entry = parse_row("7,\"Alice\",145,\"+38640111222\"");
        assert_eq!(
            entry,
            PhonebookEntry {
                position: 7,
                name: "Alice".into(),
                number_type: NumberType::International,
                number: "+38640111222".into(),
            }
        );
    }

    #[test]
    fn row_with_overlong_name_still_yields_number() {
        let entry = parse_row("2,\"A name that does not fit the buffer at all\",129,\"112\"");
        assert_eq!(entry.position, 2);
        assert_eq!(entry.name.as_str(), "A name that does not");
        assert_eq!(entry.number.as_str(), "112");
    }
}

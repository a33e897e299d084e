use core::fmt::Write;
use heapless::String;

use super::cmgr::{SmsEntry, SmsStatus};
use super::{AtRequest, GenericOk};
use crate::parse::Cursor;

/// AT+CMGL=..., list stored messages by status.
///
/// Each matching message produces a `+CMGL: <pos>,<stat>,...` header line
/// followed by body lines; the dispatcher collects them into the sink the
/// caller registered.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ListSms {
    pub status: SmsStatus,
}

impl AtRequest for ListSms {
    type Response = GenericOk;
    fn encode(&self) -> String<256> {
        let mut buf = String::new();
        write!(buf, "AT+CMGL=\"{}\"\r", self.status.query_token()).unwrap();
        buf
    }
}

/// Parse the payload of one `+CMGL` header line. The storage is not on
/// the wire; the caller copies it from the request.
pub(crate) fn parse_row(rest: &str) -> SmsEntry {
    let mut cur = Cursor::from_str(rest);
    let mut entry = SmsEntry {
        position: cur.number() as u16,
        ..SmsEntry::default()
    };
    entry.parse_header(&mut cur);
    entry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_status_selector() {
        let all = ListSms {
            status: SmsStatus::All,
        };
        assert_eq!(all.encode().as_str(), "AT+CMGL=\"ALL\"\r");

        let unread = ListSms {
            status: SmsStatus::Unread,
        };
        assert_eq!(unread.encode().as_str(), "AT+CMGL=\"REC UNREAD\"\r");
    }

    #[test]
    fn row_parse() {
        let entry = parse_row("3,\"REC READ\",\"041999888\",\"\",\"02/01/24,10:00:30+04\"");
        assert_eq!(entry.position, 3);
        assert_eq!(entry.status, SmsStatus::Read);
        assert_eq!(entry.number.as_str(), "041999888");
        assert!(entry.name.is_empty());
        assert_eq!(entry.timestamp.year, 2024);
        assert_eq!(entry.timestamp.month, 1);
    }
}

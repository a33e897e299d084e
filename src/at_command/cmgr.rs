use core::fmt::Write;
use heapless::String;

use super::{AtRequest, GenericOk};
use crate::memory::MemoryKind;
use crate::parse::{Cursor, DateTime};

/// Where a stored message sits in its lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SmsStatus {
    /// Matches every status; only meaningful when listing.
    #[default]
    All,
    Unread,
    Read,
    Unsent,
    Sent,
}

impl SmsStatus {
    /// The status selector of `AT+CMGL=...`.
    pub(crate) fn query_token(self) -> &'static str {
        match self {
            SmsStatus::All => "ALL",
            SmsStatus::Unread => "REC UNREAD",
            SmsStatus::Read => "REC READ",
            SmsStatus::Unsent => "STO UNSENT",
            SmsStatus::Sent => "STO SENT",
        }
    }
}

/// Parse the quoted status token of a `+CMGR`/`+CMGL` header. `None`
/// (an unrecognized token) means "leave the record's status alone".
pub(crate) fn parse_status(cur: &mut Cursor<'_>) -> Option<SmsStatus> {
    let token: String<10> = cur.string(true);
    match token.as_str() {
        "REC UNREAD" => Some(SmsStatus::Unread),
        "REC READ" => Some(SmsStatus::Read),
        "STO UNSENT" => Some(SmsStatus::Unsent),
        "REC SENT" => Some(SmsStatus::Sent),
        _ => None,
    }
}

/// One stored SMS.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SmsEntry {
    /// Storage the message lives in.
    pub memory: MemoryKind,
    /// Position within that storage.
    pub position: u16,
    pub status: SmsStatus,
    /// Originator or destination number.
    pub number: String<26>,
    /// Phonebook name for the number, when known.
    pub name: String<20>,
    pub timestamp: DateTime,
    pub text: String<160>,
}

impl SmsEntry {
    /// Attach one body line. Multi-line bodies keep their line breaks;
    /// overflow is clipped.
    pub(crate) fn append_text(&mut self, line: &str) {
        if !self.text.is_empty() {
            let _ = self.text.push('\n');
        }
        let free = self.text.capacity() - self.text.len();
        let take = line
            .char_indices()
            .map(|(at, c)| at + c.len_utf8())
            .take_while(|&end| end <= free)
            .last()
            .unwrap_or(0);
        let _ = self.text.push_str(&line[..take]);
    }

    /// Fill the header fields from the payload of a `+CMGR`/`+CMGL` line
    /// (after any position field). The body arrives on its own lines.
    pub(crate) fn parse_header(&mut self, cur: &mut Cursor<'_>) {
        if let Some(status) = parse_status(cur) {
            self.status = status;
        }
        self.number = cur.string(true);
        self.name = cur.string(true);
        self.timestamp = cur.datetime();
    }
}

/// AT+CMGR=..., read one stored message
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReadSms {
    pub position: u16,
}

impl AtRequest for ReadSms {
    type Response = GenericOk;
    fn encode(&self) -> String<256> {
        let mut buf = String::new();
        write!(buf, "AT+CMGR={}\r", self.position).unwrap();
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_parse() {
        let mut entry = SmsEntry::default();
        let mut cur =
            Cursor::from_str("\"REC UNREAD\",\"+386123456\",\"John\",\"01/03/24,08:15:00+04\"");
        entry.parse_header(&mut cur);

        assert_eq!(entry.status, SmsStatus::Unread);
        assert_eq!(entry.number.as_str(), "+386123456");
        assert_eq!(entry.name.as_str(), "John");
        assert_eq!(entry.timestamp.year, 2024);
        assert_eq!(entry.timestamp.day, 1);
        assert_eq!(entry.timestamp.hours, 8);
    }

    #[test]
    fn unknown_status_is_ignored() {
        let mut entry = SmsEntry {
            status: SmsStatus::Read,
            ..SmsEntry::default()
        };
        let mut cur = Cursor::from_str("\"STO WEIRD\",\"12345\",,");
        entry.parse_header(&mut cur);
        assert_eq!(entry.status, SmsStatus::Read);
        assert_eq!(entry.number.as_str(), "12345");
    }

    #[test]
    fn body_lines_accumulate() {
        let mut entry = SmsEntry::default();
        entry.append_text("first");
        entry.append_text("second");
        assert_eq!(entry.text.as_str(), "first\nsecond");
    }
}

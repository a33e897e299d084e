use core::fmt::Write;
use core::mem;

use heapless::{String, Vec};

use super::{AtRequest, GenericOk};
use crate::parse::Cursor;

/// How the operator in a `+COPS` payload is identified.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatorFormat {
    LongName = 0,
    ShortName = 1,
    /// Numeric MCC/MNC, e.g. 29340
    Number = 2,
    /// The modem reported no format (not registered yet).
    Invalid,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatorMode {
    #[default]
    Automatic = 0,
    Manual = 1,
    ManualDeregister = 2,
    SetFormatOnly = 3,
    ManualAutomatic = 4,
}

impl OperatorMode {
    fn from_code(code: i32) -> Self {
        match code {
            1 => OperatorMode::Manual,
            2 => OperatorMode::ManualDeregister,
            3 => OperatorMode::SetFormatOnly,
            4 => OperatorMode::ManualAutomatic,
            _ => OperatorMode::Automatic,
        }
    }
}

/// Availability of a scanned operator, the first term of each `+COPS=?`
/// tuple.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatorStatus {
    #[default]
    Unknown = 0,
    Available = 1,
    Current = 2,
    Forbidden = 3,
}

impl OperatorStatus {
    fn from_code(code: u16) -> Self {
        match code {
            1 => OperatorStatus::Available,
            2 => OperatorStatus::Current,
            3 => OperatorStatus::Forbidden,
            _ => OperatorStatus::Unknown,
        }
    }
}

/// The operator identification out of a `+COPS?` answer, tagged by the
/// format the modem chose.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatorIdentity {
    LongName(String<20>),
    ShortName(String<10>),
    Number(u32),
    #[default]
    Invalid,
}

/// The operator we are registered to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Operator {
    pub mode: OperatorMode,
    pub identity: OperatorIdentity,
}

impl Operator {
    pub fn format(&self) -> OperatorFormat {
        match self.identity {
            OperatorIdentity::LongName(_) => OperatorFormat::LongName,
            OperatorIdentity::ShortName(_) => OperatorFormat::ShortName,
            OperatorIdentity::Number(_) => OperatorFormat::Number,
            OperatorIdentity::Invalid => OperatorFormat::Invalid,
        }
    }
}

/// Parse the payload of a solicited `+COPS: <mode>[,<format>,<oper>[,...]]`.
pub(crate) fn parse_operator(rest: &str) -> Operator {
    let mut cur = Cursor::from_str(rest);

    let mode = OperatorMode::from_code(cur.number());
    if cur.at_line_end() {
        // Not registered: mode only.
        return Operator {
            mode,
            identity: OperatorIdentity::Invalid,
        };
    }

    let format = cur.number();
    let identity = if cur.at_line_end() {
        OperatorIdentity::Invalid
    } else {
        match format {
            0 => OperatorIdentity::LongName(cur.string(true)),
            1 => OperatorIdentity::ShortName(cur.string(true)),
            2 => OperatorIdentity::Number(cur.number() as u32),
            _ => OperatorIdentity::Invalid,
        }
    };

    Operator { mode, identity }
}

/// AT+COPS?
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GetOperatorInfo;

impl AtRequest for GetOperatorInfo {
    type Response = GenericOk;
    fn encode(&self) -> String<256> {
        "AT+COPS?\r".into()
    }
}

/// AT+COPS=..., select an operator (or go back to automatic selection)
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetOperator {
    pub mode: OperatorMode,
    /// For the manual modes: which operator, in which format.
    pub operator: Option<OperatorIdentity>,
}

impl AtRequest for SetOperator {
    type Response = GenericOk;
    fn encode(&self) -> String<256> {
        let mut buf = String::new();
        write!(buf, "AT+COPS={}", self.mode as u8).unwrap();
        match &self.operator {
            Some(OperatorIdentity::LongName(name)) => write!(buf, ",0,\"{name}\"").unwrap(),
            Some(OperatorIdentity::ShortName(name)) => write!(buf, ",1,\"{name}\"").unwrap(),
            Some(OperatorIdentity::Number(code)) => write!(buf, ",2,\"{code}\"").unwrap(),
            Some(OperatorIdentity::Invalid) | None => {}
        }
        buf.push('\r').unwrap();
        buf
    }
}

/// AT+COPS=?, scan for operators. The modem may take minutes to answer.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanOperators;

impl AtRequest for ScanOperators {
    type Response = GenericOk;
    fn encode(&self) -> String<256> {
        "AT+COPS=?\r".into()
    }
}

/// One operator out of a `+COPS=?` scan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OperatorEntry {
    pub status: OperatorStatus,
    pub long_name: String<20>,
    pub short_name: String<10>,
    /// Numeric MCC/MNC code.
    pub number: u32,
}

/// Byte machine for the `(<stat>,"<long>","<short>","<num>"),(...),...`
/// stream of a `+COPS=?` scan.
///
/// The full response can outgrow any line buffer, so it is parsed byte by
/// byte and the machine keeps its state across line chunks. Constructing
/// it is the reset; one machine lives exactly as long as its scan command.
pub struct OperatorScanner {
    /// Inside a `(...)` tuple.
    in_tuple: bool,
    /// Two consecutive commas (or a leading one): no operators follow.
    no_operators: bool,
    /// Term within the tuple: status, long name, short name, number.
    term: u8,
    prev: u8,
    status_code: u16,
    current: OperatorEntry,
}

impl OperatorScanner {
    pub fn new() -> Self {
        OperatorScanner {
            in_tuple: false,
            no_operators: false,
            term: 0,
            prev: 0,
            status_code: 0,
            current: OperatorEntry::default(),
        }
    }

    /// Feed one byte. Completed tuples land in `found`; once `found`
    /// holds `limit` entries the rest of the stream is discarded.
    pub fn feed<const N: usize>(
        &mut self,
        byte: u8,
        found: &mut Vec<OperatorEntry, N>,
        limit: usize,
    ) {
        if self.prev == 0 {
            if byte == b' ' {
                // leading spaces don't count as a first byte
                return;
            }
            if byte == b',' {
                self.no_operators = true;
            }
        }

        if self.no_operators || found.len() >= limit.min(found.capacity()) {
            return;
        }

        if self.in_tuple {
            match byte {
                b')' => {
                    self.in_tuple = false;
                    self.term = 0;
                    self.current.status = OperatorStatus::from_code(self.status_code);
                    self.status_code = 0;
                    let entry = mem::take(&mut self.current);
                    // capacity checked above
                    let _ = found.push(entry);
                }
                b',' => self.term = self.term.saturating_add(1),
                b'"' => {}
                _ => match self.term {
                    0 => {
                        if byte.is_ascii_digit() {
                            self.status_code = self
                                .status_code
                                .saturating_mul(10)
                                .saturating_add(u16::from(byte - b'0'));
                        }
                    }
                    // overflow bytes are dropped
                    1 => {
                        let _ = self.current.long_name.push(char::from(byte));
                    }
                    2 => {
                        let _ = self.current.short_name.push(char::from(byte));
                    }
                    3 => {
                        if byte.is_ascii_digit() {
                            self.current.number = self
                                .current
                                .number
                                .saturating_mul(10)
                                .saturating_add(u32::from(byte - b'0'));
                        }
                    }
                    _ => {}
                },
            }
        } else if byte == b'(' {
            self.in_tuple = true;
        } else if byte == b',' && self.prev == b',' {
            self.no_operators = true;
        }

        self.prev = byte;
    }
}

impl Default for OperatorScanner {
    fn default() -> Self {
        OperatorScanner::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan<const N: usize>(input: &str, limit: usize) -> Vec<OperatorEntry, N> {
        let mut scanner = OperatorScanner::new();
        let mut found = Vec::new();
        for byte in input.bytes() {
            scanner.feed(byte, &mut found, limit);
        }
        found
    }

    #[test]
    fn query_long_name() {
        let operator = parse_operator("0,0,\"Operator X\",7");
        assert_eq!(operator.mode, OperatorMode::Automatic);
        assert_eq!(operator.format(), OperatorFormat::LongName);
        assert_eq!(
            operator.identity,
            OperatorIdentity::LongName("Operator X".into())
        );
    }

    #[test]
    fn query_numeric() {
        let operator = parse_operator("1,2,\"29340\"");
        assert_eq!(operator.mode, OperatorMode::Manual);
        assert_eq!(operator.identity, OperatorIdentity::Number(29340));
    }

    #[test]
    fn query_unregistered() {
        let operator = parse_operator("0");
        assert_eq!(operator.format(), OperatorFormat::Invalid);
    }

    #[test]
    fn scan_two_operators() {
        let found: Vec<OperatorEntry, 4> = scan(
            " (2,\"Op1\",\"O1\",\"00101\"),(1,\"Op2\",\"O2\",\"00102\")",
            2,
        );

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].status, OperatorStatus::Current);
        assert_eq!(found[0].long_name.as_str(), "Op1");
        assert_eq!(found[0].short_name.as_str(), "O1");
        assert_eq!(found[0].number, 101);
        assert_eq!(found[1].status, OperatorStatus::Available);
        assert_eq!(found[1].long_name.as_str(), "Op2");
        assert_eq!(found[1].short_name.as_str(), "O2");
        assert_eq!(found[1].number, 102);
    }

    #[test]
    fn scan_respects_limit() {
        let input = "(1,\"A\",\"A\",\"1\"),(1,\"B\",\"B\",\"2\"),(1,\"C\",\"C\",\"3\")";
        let found: Vec<OperatorEntry, 4> = scan(input, 2);
        assert_eq!(found.len(), 2);

        // and never exceeds the sink either
        let found: Vec<OperatorEntry, 2> = scan(input, 8);
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn scan_state_survives_chunk_boundaries() {
        let mut scanner = OperatorScanner::new();
        let mut found: Vec<OperatorEntry, 4> = Vec::new();
        for chunk in ["(2,\"Op", "1\",\"O1\",\"001", "01\")"] {
            for byte in chunk.bytes() {
                scanner.feed(byte, &mut found, 4);
            }
        }
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].long_name.as_str(), "Op1");
        assert_eq!(found[0].number, 101);
    }

    #[test]
    fn leading_comma_means_no_operators() {
        let found: Vec<OperatorEntry, 4> = scan(",,(2,\"Op1\",\"O1\",\"00101\")", 4);
        assert!(found.is_empty());

        let found: Vec<OperatorEntry, 4> = scan("  ,(1,\"A\",\"A\",\"1\")", 4);
        assert!(found.is_empty());
    }

    #[test]
    fn long_names_are_clipped_not_fatal() {
        let found: Vec<OperatorEntry, 1> =
            scan("(1,\"An Operator With A Very Long Name\",\"SHORTNAME++\",\"00101\")", 1);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].long_name.as_str(), "An Operator With A V");
        assert_eq!(found[0].short_name.as_str(), "SHORTNAME+");
    }
}

use crate::at_command::{AtParseErr, AtParseLine};
use crate::memory::{parse_memory, MemoryKind};
use crate::parse::Cursor;

/// `+CMTI: <mem>,<index>`, a new message was stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SmsIndication {
    pub memory: MemoryKind,
    pub position: u16,
}

impl AtParseLine for SmsIndication {
    fn from_line(line: &str) -> Result<Self, AtParseErr> {
        let rest = line.strip_prefix("+CMTI: ").ok_or("Missing '+CMTI: '")?;
        let mut cur = Cursor::from_str(rest);

        Ok(SmsIndication {
            memory: parse_memory(&mut cur),
            position: cur.number() as u16,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indication() {
        let urc = SmsIndication::from_line("+CMTI: \"SM\",4").unwrap();
        assert_eq!(urc.memory, MemoryKind::Sm);
        assert_eq!(urc.position, 4);
    }
}

use core::fmt::Write;
use heapless::String;

use super::{AtParseErr, AtParseLine, AtRequest, GenericOk};
use crate::parse::Cursor;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CallDirection {
    #[default]
    MobileOriginated,
    MobileTerminated,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CallState {
    Active,
    Held,
    Dialing,
    Alerting,
    Incoming,
    Waiting,
    #[default]
    Disconnected,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CallType {
    #[default]
    Voice,
    Data,
    Fax,
}

/// Type-of-address octet attached to a phone number.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NumberType {
    /// 129, unknown numbering plan
    #[default]
    Unknown,
    /// 145, international, number starts with `+`
    International,
    /// 161, national
    National,
    Other(u8),
}

impl NumberType {
    pub(crate) fn from_code(code: i32) -> Self {
        match code {
            129 => NumberType::Unknown,
            145 => NumberType::International,
            161 => NumberType::National,
            other => NumberType::Other(other as u8),
        }
    }

    pub(crate) fn code(self) -> u8 {
        match self {
            NumberType::Unknown => 129,
            NumberType::International => 145,
            NumberType::National => 161,
            NumberType::Other(code) => code,
        }
    }
}

/// One `+CLCC` report: the state of a current call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CallRecord {
    pub id: u8,
    pub direction: CallDirection,
    pub state: CallState,
    pub call_type: CallType,
    pub multiparty: bool,
    pub number: String<26>,
    pub number_type: NumberType,
    /// Phonebook name for the number, when the modem knows one.
    pub name: String<20>,
}

impl AtParseLine for CallRecord {
    fn from_line(line: &str) -> Result<Self, AtParseErr> {
        let rest = line.strip_prefix("+CLCC: ").ok_or("Missing '+CLCC: '")?;
        let mut cur = Cursor::from_str(rest);

        let id = cur.number() as u8;
        let direction = match cur.number() {
            1 => CallDirection::MobileTerminated,
            _ => CallDirection::MobileOriginated,
        };
        let state = match cur.number() {
            0 => CallState::Active,
            1 => CallState::Held,
            2 => CallState::Dialing,
            3 => CallState::Alerting,
            4 => CallState::Incoming,
            5 => CallState::Waiting,
            _ => CallState::Disconnected,
        };
        let call_type = match cur.number() {
            1 => CallType::Data,
            2 => CallType::Fax,
            _ => CallType::Voice,
        };
        let multiparty = cur.number() != 0;
        let number = cur.string(true);
        let number_type = NumberType::from_code(cur.number());
        let name = cur.string(true);

        Ok(CallRecord {
            id,
            direction,
            state,
            call_type,
            multiparty,
            number,
            number_type,
            name,
        })
    }
}

/// AT+CLCC=..., make the modem push a `+CLCC` report on call changes
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigureCallReports(pub bool);

impl AtRequest for ConfigureCallReports {
    type Response = GenericOk;
    fn encode(&self) -> String<256> {
        let mut buf = String::new();
        write!(buf, "AT+CLCC={}\r", self.0 as u8).unwrap();
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incoming_call() {
        let call = CallRecord::from_line("+CLCC: 1,1,4,0,0,\"+386123456\",145,\"John\"").unwrap();
        assert_eq!(
            call,
            CallRecord {
                id: 1,
                direction: CallDirection::MobileTerminated,
                state: CallState::Incoming,
                call_type: CallType::Voice,
                multiparty: false,
                number: "+386123456".into(),
                number_type: NumberType::International,
                name: "John".into(),
            }
        );
    }

    #[test]
    fn nameless_call() {
        let call = CallRecord::from_line("+CLCC: 2,0,2,0,0,\"040123456\",129").unwrap();
        assert_eq!(call.state, CallState::Dialing);
        assert_eq!(call.direction, CallDirection::MobileOriginated);
        assert_eq!(call.number.as_str(), "040123456");
        assert!(call.name.is_empty());
    }
}

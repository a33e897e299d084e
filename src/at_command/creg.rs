use core::fmt::Write;
use heapless::String;

use super::{AtParseErr, AtParseLine, AtRequest, GenericOk};
use crate::parse::Cursor;

/// Network registration status, numeric as `+CREG` emits it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegistrationStatus {
    NotRegistered,
    /// Registered to the home network.
    RegisteredHome,
    Searching,
    RegistrationDenied,
    #[default]
    Unknown,
    RegisteredRoaming,
}

impl RegistrationStatus {
    pub(crate) fn from_code(code: i32) -> Self {
        match code {
            1 => RegistrationStatus::RegisteredHome,
            2 => RegistrationStatus::Searching,
            3 => RegistrationStatus::RegistrationDenied,
            4 => RegistrationStatus::Unknown,
            5 => RegistrationStatus::RegisteredRoaming,
            _ => RegistrationStatus::NotRegistered,
        }
    }

    /// Camped on a cell, home or roaming.
    pub fn is_registered(self) -> bool {
        matches!(
            self,
            RegistrationStatus::RegisteredHome | RegistrationStatus::RegisteredRoaming
        )
    }
}

/// A `+CREG` line, either the URC or the answer to `AT+CREG?`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Registration {
    pub status: RegistrationStatus,
}

impl AtParseLine for Registration {
    fn from_line(line: &str) -> Result<Self, AtParseErr> {
        let rest = line.strip_prefix("+CREG: ").ok_or("Missing '+CREG: '")?;

        // The URC carries <stat>[,<lac>,<ci>[,<act>]], the query response
        // prepends the <n> mode field. Field count tells them apart.
        let fields = 1 + rest.matches(',').count();
        let mut cur = Cursor::from_str(rest);
        if matches!(fields, 2 | 5) {
            cur.number();
        }

        Ok(Registration {
            status: RegistrationStatus::from_code(cur.number()),
        })
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegistrationUrc {
    Disable = 0,
    /// `+CREG: <stat>` on registration changes
    Enable = 1,
    /// `+CREG: <stat>,<lac>,<ci>` on registration or cell changes
    EnableWithLocation = 2,
}

/// AT+CREG=...
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigureRegistrationUrc(pub RegistrationUrc);

impl AtRequest for ConfigureRegistrationUrc {
    type Response = GenericOk;
    fn encode(&self) -> String<256> {
        let mut buf = String::new();
        write!(buf, "AT+CREG={}\r", self.0 as u8).unwrap();
        buf
    }
}

/// AT+CREG?
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueryRegistration;

impl AtRequest for QueryRegistration {
    type Response = GenericOk;
    fn encode(&self) -> String<256> {
        "AT+CREG?\r".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_form_skips_mode() {
        let reg = Registration::from_line("+CREG: 0,1").unwrap();
        assert_eq!(reg.status, RegistrationStatus::RegisteredHome);
    }

    #[test]
    fn urc_form() {
        let reg = Registration::from_line("+CREG: 5").unwrap();
        assert_eq!(reg.status, RegistrationStatus::RegisteredRoaming);

        let reg = Registration::from_line("+CREG: 2,\"28A0\",\"2776\",0").unwrap();
        assert_eq!(reg.status, RegistrationStatus::Searching);
    }

    #[test]
    fn query_form_with_location() {
        let reg = Registration::from_line("+CREG: 2,5,\"FFFE\",\"1A8670B\",7").unwrap();
        assert_eq!(reg.status, RegistrationStatus::RegisteredRoaming);
    }
}

use core::fmt::Write;
use heapless::String;

use super::clcc::NumberType;
use super::{AtRequest, GenericOk};

/// AT+CPBW=..., write a phonebook slot
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WritePhonebook {
    pub position: u16,
    pub number: String<26>,
    pub number_type: NumberType,
    pub name: String<20>,
}

impl AtRequest for WritePhonebook {
    type Response = GenericOk;
    fn encode(&self) -> String<256> {
        let mut buf = String::new();
        write!(
            buf,
            "AT+CPBW={},\"{}\",{},\"{}\"\r",
            self.position,
            self.number,
            self.number_type.code(),
            self.name,
        )
        .unwrap();
        buf
    }
}

/// AT+CPBW=<pos>, clear a phonebook slot
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ErasePhonebook {
    pub position: u16,
}

impl AtRequest for ErasePhonebook {
    type Response = GenericOk;
    fn encode(&self) -> String<256> {
        let mut buf = String::new();
        write!(buf, "AT+CPBW={}\r", self.position).unwrap();
        buf
    }
}

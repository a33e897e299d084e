use core::fmt::Write;
use heapless::String;

use super::{AtRequest, GenericOk};

#[repr(u8)]
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SmsFormat {
    Pdu = 0,
    Text = 1,
}

/// AT+CMGF=..., select SMS message format. This driver parses text mode.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetSmsFormat(pub SmsFormat);

impl AtRequest for SetSmsFormat {
    type Response = GenericOk;
    fn encode(&self) -> String<256> {
        let mut buf = String::new();
        write!(buf, "AT+CMGF={}\r", self.0 as u8).unwrap();
        buf
    }
}

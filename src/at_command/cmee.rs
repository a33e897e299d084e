use core::fmt::Write;
use heapless::String;

use super::{AtRequest, GenericOk};

#[repr(u8)]
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CmeErrorMode {
    /// Report every failure as a bare `ERROR`
    Disable = 0,
    Numeric = 1,
    Verbose = 2,
}

/// AT+CMEE=..., select how the modem reports equipment errors
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigureCmeErrors(pub CmeErrorMode);

impl AtRequest for ConfigureCmeErrors {
    type Response = GenericOk;
    fn encode(&self) -> String<256> {
        let mut buf = String::new();
        write!(buf, "AT+CMEE={}\r", self.0 as u8).unwrap();
        buf
    }
}

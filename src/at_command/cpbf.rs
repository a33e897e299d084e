use core::fmt::Write;
use heapless::String;

use super::{AtRequest, GenericOk};

/// AT+CPBF=..., search the selected phonebook by name. Matches come back
/// as `+CPBF` rows with the same shape as `+CPBR`.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FindPhonebook {
    pub text: String<20>,
}

impl AtRequest for FindPhonebook {
    type Response = GenericOk;
    fn encode(&self) -> String<256> {
        let mut buf = String::new();
        write!(buf, "AT+CPBF=\"{}\"\r", self.text).unwrap();
        buf
    }
}

use core::fmt::Write;
use heapless::String;

use super::{AtRequest, GenericOk};

/// AT+CMGD=..., delete the message at a storage position
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeleteSms {
    pub position: u16,
}

impl AtRequest for DeleteSms {
    type Response = GenericOk;
    fn encode(&self) -> String<256> {
        let mut buf = String::new();
        write!(buf, "AT+CMGD={}\r", self.position).unwrap();
        buf
    }
}

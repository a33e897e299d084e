use core::fmt::Write;
use heapless::String;

use super::{AtRequest, GenericOk};

/// ATE, enable/disable command echo
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetEcho(pub bool);

impl AtRequest for SetEcho {
    type Response = GenericOk;
    fn encode(&self) -> String<256> {
        let mut buf = String::new();
        write!(buf, "ATE{}\r", self.0 as u8).unwrap();
        buf
    }
}

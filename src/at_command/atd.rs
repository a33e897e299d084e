use core::fmt::Write;
use heapless::String;

use super::{AtRequest, GenericOk};

/// ATD, originate a voice call (the trailing `;` keeps it out of data
/// mode). Progress arrives through `+CLCC` reports, not the `OK`.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Dial {
    pub number: String<26>,
}

impl AtRequest for Dial {
    type Response = GenericOk;
    fn encode(&self) -> String<256> {
        let mut buf = String::new();
        write!(buf, "ATD{};\r", self.number).unwrap();
        buf
    }
}

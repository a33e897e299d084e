use heapless::String;

use super::{AtRequest, GenericOk};

/// ATH, hang up the current call
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HangUp;

impl AtRequest for HangUp {
    type Response = GenericOk;
    fn encode(&self) -> String<256> {
        "ATH\r".into()
    }
}

use heapless::String;

use super::{AtRequest, GenericOk};

/// ATA, answer an incoming call
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Answer;

impl AtRequest for Answer {
    type Response = GenericOk;
    fn encode(&self) -> String<256> {
        "ATA\r".into()
    }
}

use heapless::String;

use super::{AtRequest, GenericOk};

/// AT+CNMI=..., route new-message indications to the host.
///
/// Mode 2 buffers indications while the line is busy, mt 1 delivers
/// `+CMTI` with the storage position instead of the whole message.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigureSmsIndications;

impl AtRequest for ConfigureSmsIndications {
    type Response = GenericOk;
    fn encode(&self) -> String<256> {
        "AT+CNMI=2,1,0,0,0\r".into()
    }
}

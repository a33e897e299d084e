use heapless::String;

use super::{AtParseErr, AtParseLine, AtRequest, AtResponse, GenericOk, ResponseCode};

/// AT+CCID, read the ICCID off the SIM
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ShowIccid;

impl AtRequest for ShowIccid {
    type Response = (Iccid, GenericOk);
    fn encode(&self) -> String<256> {
        "AT+CCID\r".into()
    }
}

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Iccid {
    pub iccid: String<22>,
}

impl AtParseLine for Iccid {
    fn from_line(line: &str) -> Result<Self, AtParseErr> {
        // A bare string of 18-22 digits (the checksum digit may be a
        // hex letter). Nothing else the modem prints looks like this,
        // but keep this parser last in the chain anyway.
        let plausible = (18..=22).contains(&line.len())
            && line.bytes().all(|b| b.is_ascii_alphanumeric())
            && line.bytes().take(10).all(|b| b.is_ascii_digit());

        if !plausible {
            return Err("Not an ICCID".into());
        }

        Ok(Iccid {
            iccid: line.into(),
        })
    }
}

impl AtResponse for Iccid {
    fn from_generic(code: ResponseCode) -> Result<Self, ResponseCode> {
        match code {
            ResponseCode::Iccid(iccid) => Ok(iccid),
            _ => Err(code),
        }
    }
}

use core::fmt::Write;
use heapless::String;

use super::{AtParseErr, AtParseLine, AtRequest, AtResponse, GenericOk, ResponseCode, WritePrompt};

/// AT+CMGS=..., open an SMS send.
///
/// The modem answers with the `> ` prompt; [`SmsPayload`] must follow
/// immediately.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SendSms {
    pub destination: String<26>,
}

/// The message text, terminated by Ctrl-Z. Only valid directly after
/// [`SendSms`].
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SmsPayload(pub String<160>);

impl AtRequest for SendSms {
    type Response = WritePrompt;
    fn encode(&self) -> String<256> {
        let mut buf = String::new();
        write!(buf, "AT+CMGS=\"{}\"\r", self.destination).unwrap();
        buf
    }
}

impl AtRequest for SmsPayload {
    type Response = (MessageReference, GenericOk);
    fn encode(&self) -> String<256> {
        let mut buf = String::new();
        write!(buf, "{}\x1A", self.0).unwrap();
        buf
    }
}

/// `+CMGS: <mr>`, the reference the network assigned to a sent message.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MessageReference {
    pub value: u32,
}

impl AtParseLine for MessageReference {
    fn from_line(line: &str) -> Result<Self, AtParseErr> {
        let rest = line.strip_prefix("+CMGS: ").ok_or("Missing '+CMGS: '")?;
        Ok(MessageReference {
            value: rest.trim().parse()?,
        })
    }
}

impl AtResponse for MessageReference {
    fn from_generic(code: ResponseCode) -> Result<Self, ResponseCode> {
        match code {
            ResponseCode::MessageReference(reference) => Ok(reference),
            _ => Err(code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_is_two_phase() {
        let open = SendSms {
            destination: "+386123456".into(),
        };
        assert_eq!(open.encode().as_str(), "AT+CMGS=\"+386123456\"\r");

        let payload = SmsPayload("hello".into());
        assert_eq!(payload.encode().as_str(), "hello\x1A");
    }

    #[test]
    fn reference_parse() {
        assert_eq!(MessageReference::from_line("+CMGS: 31").unwrap().value, 31);
        assert!(MessageReference::from_line("+CMGR: 31").is_err());
    }
}

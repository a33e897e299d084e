use core::fmt::Write;
use heapless::String;

use super::{AtParseErr, AtParseLine, AtRequest, GenericOk};

/// What the SIM wants from us, as reported by `+CPIN`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SimState {
    /// Unlocked and usable.
    Ready,
    /// Still booting, or in an error state.
    NotReady,
    NotInserted,
    /// Waiting for the PIN.
    Pin,
    /// PIN retries exhausted, waiting for the PUK.
    Puk,
}

impl AtParseLine for SimState {
    fn from_line(line: &str) -> Result<Self, AtParseErr> {
        let rest = line.strip_prefix("+CPIN: ").ok_or("Missing '+CPIN: '")?;

        // Prefix matching: some modems append detail after the token.
        let state = if rest.starts_with("READY") {
            SimState::Ready
        } else if rest.starts_with("NOT READY") {
            SimState::NotReady
        } else if rest.starts_with("NOT INSERTED") {
            SimState::NotInserted
        } else if rest.starts_with("SIM PIN") {
            SimState::Pin
        } else if rest.starts_with("PIN PUK") {
            SimState::Puk
        } else {
            SimState::NotReady
        };
        Ok(state)
    }
}

/// AT+CPIN?, ask the SIM what it wants. The state lands in the device
/// state; the conversation itself just ends in `OK`.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QuerySimState;

impl AtRequest for QuerySimState {
    type Response = GenericOk;
    fn encode(&self) -> String<256> {
        "AT+CPIN?\r".into()
    }
}

/// AT+CPIN="...", present the PIN
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EnterPin {
    pub pin: String<8>,
}

impl AtRequest for EnterPin {
    type Response = GenericOk;
    fn encode(&self) -> String<256> {
        let mut buf = String::new();
        write!(buf, "AT+CPIN=\"{}\"\r", self.pin).unwrap();
        buf
    }
}

/// AT+CPIN="...","...", present the PUK and a replacement PIN
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EnterPuk {
    pub puk: String<8>,
    pub new_pin: String<8>,
}

impl AtRequest for EnterPuk {
    type Response = GenericOk;
    fn encode(&self) -> String<256> {
        let mut buf = String::new();
        write!(buf, "AT+CPIN=\"{}\",\"{}\"\r", self.puk, self.new_pin).unwrap();
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_tokens() {
        let cases = [
            ("+CPIN: READY", SimState::Ready),
            ("+CPIN: NOT READY", SimState::NotReady),
            ("+CPIN: NOT INSERTED", SimState::NotInserted),
            ("+CPIN: SIM PIN", SimState::Pin),
            ("+CPIN: PIN PUK", SimState::Puk),
            ("+CPIN: SOMETHING ELSE", SimState::NotReady),
        ];
        for (line, expected) in cases {
            assert_eq!(SimState::from_line(line).unwrap(), expected);
        }
        assert!(SimState::from_line("READY").is_err());
    }
}

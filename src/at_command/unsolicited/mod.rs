//! Unsolicited Result Codes.
//!
//! Lines the modem pushes on its own, without a pending request. The
//! dispatcher tries these after the in-flight command had its chance and
//! before the generic response codes.

use super::{AtParseErr, AtParseLine};

mod cmti;
mod ready;

pub use super::clcc::CallRecord;
pub use super::cpin::SimState;
pub use super::creg::{Registration, RegistrationStatus};
pub use cmti::SmsIndication;
pub use ready::{CallReady, Ready, SmsReady};

/// Unsolicited Result Code
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Urc {
    Registration(Registration),
    SimState(SimState),
    SmsIndication(SmsIndication),
    CallStatus(CallRecord),
    Ready(Ready),
    SmsReady(SmsReady),
    CallReady(CallReady),
}

impl AtParseLine for Urc {
    fn from_line(line: &str) -> Result<Self, AtParseErr> {
        /// Returns a function that tries to parse the line into a Urc::T
        fn parse<'a, T: AtParseLine>(
            line: &'a str,
            f: impl Fn(T) -> Urc + 'a,
        ) -> impl Fn(AtParseErr) -> Result<Urc, AtParseErr> + 'a {
            move |_| Ok(f(T::from_line(line)?))
        }

        Err(AtParseErr::default())
            .or_else(parse(line, Urc::Registration))
            .or_else(parse(line, Urc::SimState))
            .or_else(parse(line, Urc::SmsIndication))
            .or_else(parse(line, Urc::CallStatus))
            .or_else(parse(line, Urc::Ready))
            .or_else(parse(line, Urc::SmsReady))
            .or_else(parse(line, Urc::CallReady))
            .map_err(|_| AtParseErr::from("Failed to parse as a URC"))
    }
}

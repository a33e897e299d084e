//! Boot-progress markers. Carried so they don't show up as unknown lines;
//! the driver only logs them.

use crate::at_command::{AtParseErr, AtParseLine};

fn exactly<T>(line: &str, token: &'static str, t: T) -> Result<T, AtParseErr> {
    (line == token).then_some(t).ok_or("No match".into())
}

/// `RDY`, the modem finished booting
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ready;

impl AtParseLine for Ready {
    fn from_line(line: &str) -> Result<Self, AtParseErr> {
        exactly(line, "RDY", Ready)
    }
}

/// `SMS Ready`, the SMS subsystem is up
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SmsReady;

impl AtParseLine for SmsReady {
    fn from_line(line: &str) -> Result<Self, AtParseErr> {
        exactly(line, "SMS Ready", SmsReady)
    }
}

/// `Call Ready`, the call subsystem is up
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CallReady;

impl AtParseLine for CallReady {
    fn from_line(line: &str) -> Result<Self, AtParseErr> {
        exactly(line, "Call Ready", CallReady)
    }
}

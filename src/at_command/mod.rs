//! Typed requests and responses for the 3GPP AT command set.
//!
//! Each module covers one command mnemonic: a request type that knows how
//! to encode itself, and, where the command has a payload response, the
//! record type and its parser. Parsers that need to know which command is
//! in flight (multi-row listings, storage reports) are plain functions
//! invoked by the dispatcher; everything else implements [`AtParseLine`]
//! and is recognized by prefix alone.

use core::fmt::Debug;
use core::num::ParseIntError;

pub mod generic_response;
pub mod unsolicited;

pub mod at;
pub mod ata;
pub mod atd;
pub mod ate;
pub mod ath;
pub mod ccid;
pub mod clcc;
pub mod cmee;
pub mod cmgd;
pub mod cmgf;
pub mod cmgl;
pub mod cmgr;
pub mod cmgs;
pub mod cnmi;
pub mod cops;
pub mod cpbf;
pub mod cpbr;
pub mod cpbs;
pub mod cpbw;
pub mod cpin;
pub mod cpms;
pub mod creg;

pub use generic_response::{GenericOk, ModemError, WritePrompt};

pub use ccid::Iccid;
pub use clcc::{CallDirection, CallRecord, CallState, CallType, NumberType};
pub use cmgr::{SmsEntry, SmsStatus};
pub use cmgs::MessageReference;
pub use cops::{
    Operator, OperatorEntry, OperatorFormat, OperatorIdentity, OperatorMode, OperatorStatus,
};
pub use cpbr::PhonebookEntry;
pub use cpin::SimState;
pub use cpms::StorageQuery;
pub use creg::RegistrationStatus;

#[derive(Clone, Copy, Default, Debug)]
pub(crate) struct AtParseErr {
    #[allow(dead_code)]
    message: &'static str,
}

pub(crate) trait AtParseLine: Sized {
    fn from_line(line: &str) -> Result<Self, AtParseErr>;
}

#[cfg(feature = "defmt")]
pub trait AtRequest: Debug + defmt::Format {
    type Response;
    fn encode(&self) -> heapless::String<256>;
}

#[cfg(not(feature = "defmt"))]
pub trait AtRequest: Debug {
    type Response;
    fn encode(&self) -> heapless::String<256>;
}

pub trait AtResponse: Sized {
    fn from_generic(code: ResponseCode) -> Result<Self, ResponseCode>;
}

/// A response line that can be understood without knowing which command is
/// in flight. These are what the dispatcher forwards to whoever holds the
/// command lock.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResponseCode {
    Ok(GenericOk),
    Error(ModemError),
    WritePrompt(WritePrompt), // "> "
    MessageReference(MessageReference),
    Iccid(Iccid),
}

impl AtParseLine for ResponseCode {
    fn from_line(line: &str) -> Result<Self, AtParseErr> {
        /// Returns a function that tries to parse the line into a ResponseCode::T
        fn parse<'a, T: AtParseLine>(
            line: &'a str,
            f: impl Fn(T) -> ResponseCode + 'a,
        ) -> impl Fn(AtParseErr) -> Result<ResponseCode, AtParseErr> + 'a {
            move |_| Ok(f(T::from_line(line)?))
        }

        Err(AtParseErr::default())
            .or_else(parse(line, ResponseCode::Ok))
            .or_else(parse(line, ResponseCode::Error))
            .or_else(parse(line, ResponseCode::WritePrompt))
            .or_else(parse(line, ResponseCode::MessageReference))
            // Iccid is a bare digit string and must stay last; anything it
            // would shadow has to be tried before it.
            .or_else(parse(line, ResponseCode::Iccid))
            .map_err(|_| "Unknown response code".into())
    }
}

impl From<&'static str> for AtParseErr {
    fn from(message: &'static str) -> Self {
        AtParseErr { message }
    }
}

impl From<ParseIntError> for AtParseErr {
    fn from(_: ParseIntError) -> Self {
        AtParseErr {
            message: "Failed to parse integer",
        }
    }
}

use super::{AtParseErr, AtParseLine, AtResponse, ResponseCode};

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GenericOk;

/// A failure reported by the modem itself.
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModemError {
    /// Plain `ERROR`, no further detail.
    Generic,

    /// Mobile-equipment or network error (`+CME ERROR`).
    Cme { code: u32 },

    /// Message-service error (`+CMS ERROR`).
    Cms { code: u32 },
}

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WritePrompt;

/// True for the lines that end a command conversation. These must reach
/// the command runner even while a multi-line response is being collected.
pub(crate) fn is_terminal(line: &str) -> bool {
    line == "OK"
        || line == "ERROR"
        || line.starts_with("+CME ERROR")
        || line.starts_with("+CMS ERROR")
}

impl AtParseLine for GenericOk {
    fn from_line(line: &str) -> Result<Self, AtParseErr> {
        (line == "OK").then_some(GenericOk).ok_or("Not 'OK'".into())
    }
}

impl AtResponse for GenericOk {
    fn from_generic(code: ResponseCode) -> Result<Self, ResponseCode> {
        match code {
            ResponseCode::Ok(ok) => Ok(ok),
            _ => Err(code),
        }
    }
}

impl AtParseLine for ModemError {
    fn from_line(line: &str) -> Result<Self, AtParseErr> {
        if let Some(code) = line.strip_prefix("+CME ERROR: ") {
            // Verbose mode sends text instead of a code; still an error.
            Ok(code
                .trim()
                .parse()
                .map_or(ModemError::Generic, |code| ModemError::Cme { code }))
        } else if let Some(code) = line.strip_prefix("+CMS ERROR: ") {
            Ok(code
                .trim()
                .parse()
                .map_or(ModemError::Generic, |code| ModemError::Cms { code }))
        } else if line == "ERROR" {
            Ok(ModemError::Generic)
        } else {
            Err("Not a valid error code".into())
        }
    }
}

impl AtParseLine for WritePrompt {
    fn from_line(line: &str) -> Result<Self, AtParseErr> {
        (line == "> ")
            .then_some(WritePrompt)
            .ok_or("Not '> '".into())
    }
}

impl AtResponse for WritePrompt {
    fn from_generic(code: ResponseCode) -> Result<Self, ResponseCode> {
        match code {
            ResponseCode::WritePrompt(prompt) => Ok(prompt),
            _ => Err(code),
        }
    }
}

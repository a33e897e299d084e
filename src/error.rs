use embassy_time::TimeoutError;

use crate::at_command::ModemError;

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// The modem sent bytes that are not valid UTF-8.
    InvalidUtf8,
    BufferOverflow,
    /// The modem answered with `ERROR`, `+CME ERROR` or `+CMS ERROR`.
    Modem(ModemError),
    /// The modem did not answer within the command timeout.
    Timeout,
    /// A non-blocking enqueue found the command mailbox full.
    Busy,
    /// An argument does not fit the command it was meant for.
    Parameter,
    Serial,
}

impl embedded_io_async::Error for Error {
    fn kind(&self) -> embedded_io_async::ErrorKind {
        match self {
            Error::InvalidUtf8 => embedded_io_async::ErrorKind::InvalidData,
            Error::BufferOverflow => embedded_io_async::ErrorKind::OutOfMemory,
            Error::Modem(_) => embedded_io_async::ErrorKind::Other,
            Error::Timeout => embedded_io_async::ErrorKind::TimedOut,
            Error::Busy => embedded_io_async::ErrorKind::Other,
            Error::Parameter => embedded_io_async::ErrorKind::InvalidInput,
            Error::Serial => embedded_io_async::ErrorKind::Other,
        }
    }
}

impl From<TimeoutError> for Error {
    fn from(_: TimeoutError) -> Self {
        Error::Timeout
    }
}

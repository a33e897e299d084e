use core::str::from_utf8;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pipe::Reader;
use embedded_io_async::Read;
use heapless::{String, Vec};

use crate::{log, Error};

pub(crate) const RX_PIPE_LEN: usize = 2048;

/// Capacity of one assembled line. Longer responses (a `+COPS=?` scan can
/// exceed any fixed buffer) are delivered in full-buffer chunks; the
/// dispatcher's byte machine keeps its state across chunks.
pub const LINE_CAPACITY: usize = 256;

/// Assembles the modem byte stream into lines.
///
/// The modem talks in CR/LF-delimited lines, except for the bare `"> "`
/// prompt it prints when it wants SMS payload input, which is returned as
/// a line of its own.
pub struct ModemReader<'context> {
    source: Reader<'context, CriticalSectionRawMutex, RX_PIPE_LEN>,
    pending: Vec<u8, LINE_CAPACITY>,
}

impl<'context> ModemReader<'context> {
    pub fn new(source: Reader<'context, CriticalSectionRawMutex, RX_PIPE_LEN>) -> Self {
        ModemReader {
            source,
            pending: Vec::new(),
        }
    }

    pub async fn read_line(&mut self) -> Result<String<LINE_CAPACITY>, Error> {
        const INPUT_PROMPT: &str = "> ";

        loop {
            if self.pending.starts_with(INPUT_PROMPT.as_bytes()) {
                // No CR/LF follows the prompt, so the newline scan below
                // would sit on it forever.
                self.discard(INPUT_PROMPT.len());
                return Ok(INPUT_PROMPT.into());
            }

            if let Some(position) = self.pending.iter().position(|&b| b == b'\n') {
                match self.take_line(position) {
                    Some(line) => return line,
                    None => continue,
                }
            }

            if self.pending.is_full() {
                // A response longer than the buffer: flush what we have
                // as a chunk and keep assembling.
                let Ok(chunk) = from_utf8(&self.pending) else {
                    self.pending.clear();
                    return Err(Error::InvalidUtf8);
                };
                let chunk = String::from(chunk);
                self.pending.clear();
                return Ok(chunk);
            }

            let mut buf = [0u8; LINE_CAPACITY];
            let free = self.pending.capacity() - self.pending.len();
            let amount = Read::read(&mut self.source, &mut buf[..free])
                .await
                .map_err(|_| Error::Serial)?;
            self.pending
                .extend_from_slice(&buf[..amount])
                .map_err(|_| Error::BufferOverflow)?;
        }
    }

    /// Cut the line ending at `newline` out of the buffer. Returns None
    /// for lines not worth delivering (blank lines, our own echo).
    fn take_line(&mut self, newline: usize) -> Option<Result<String<LINE_CAPACITY>, Error>> {
        let Ok(line) = from_utf8(&self.pending[..newline]) else {
            self.discard(newline + 1);
            return Some(Err(Error::InvalidUtf8));
        };
        log::trace!("modem line: {:?}", line);

        // Echoed commands come back as "...\r\r\n"; drop them along with
        // blank keep-alive lines. The modem is inconsistent with
        // whitespace, so everything else gets trimmed.
        if line.trim().is_empty() || line.ends_with("\r\r") {
            self.discard(newline + 1);
            return None;
        }

        let line = String::from(line.trim());
        self.discard(newline + 1);
        Some(Ok(line))
    }

    fn discard(&mut self, count: usize) {
        self.pending.rotate_left(count);
        self.pending.truncate(self.pending.len() - count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::pipe::Pipe;

    fn poll_line(reader: &mut ModemReader<'_>) -> Option<Result<String<LINE_CAPACITY>, Error>> {
        let mut cx = core::task::Context::from_waker(core::task::Waker::noop());
        let mut fut = core::pin::pin!(reader.read_line());
        match core::future::Future::poll(fut.as_mut(), &mut cx) {
            core::task::Poll::Ready(line) => Some(line),
            core::task::Poll::Pending => None,
        }
    }

    #[test]
    fn lines_echo_and_prompt() {
        static PIPE: Pipe<CriticalSectionRawMutex, RX_PIPE_LEN> = Pipe::new();
        let mut reader = ModemReader::new(PIPE.reader());

        assert!(PIPE.try_write(b"AT+CMGS=\"123\"\r\r\n").is_ok());
        assert!(PIPE.try_write(b"\r\n+CMGS: 12\r\n\r\nOK\r\n> ").is_ok());

        assert_eq!(poll_line(&mut reader).unwrap().unwrap(), "+CMGS: 12");
        assert_eq!(poll_line(&mut reader).unwrap().unwrap(), "OK");
        assert_eq!(poll_line(&mut reader).unwrap().unwrap(), "> ");
        assert!(poll_line(&mut reader).is_none());
    }

    #[test]
    fn oversized_line_is_chunked() {
        static PIPE: Pipe<CriticalSectionRawMutex, RX_PIPE_LEN> = Pipe::new();
        let mut reader = ModemReader::new(PIPE.reader());

        for _ in 0..LINE_CAPACITY {
            assert!(PIPE.try_write(b"x").is_ok());
        }
        assert!(PIPE.try_write(b"yy\r\n").is_ok());

        let chunk = poll_line(&mut reader).unwrap().unwrap();
        assert_eq!(chunk.len(), LINE_CAPACITY);
        assert_eq!(poll_line(&mut reader).unwrap().unwrap(), "yy");
    }
}

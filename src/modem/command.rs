use core::future::Future;
use core::mem;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Receiver, Sender};
use embassy_sync::mutex::{Mutex, MutexGuard};
use embassy_time::{with_timeout, Duration, TimeoutError};
use heapless::{String, Vec};

use crate::at_command::cmgr::SmsEntry;
use crate::at_command::cops::{self, OperatorEntry, OperatorScanner};
use crate::at_command::cpbr::{self, PhonebookEntry};
use crate::at_command::cpms::StorageQuery;
use crate::at_command::{cmgl, cpbs, cpms};
use crate::at_command::{AtRequest, AtResponse, ResponseCode};
use crate::device::DeviceState;
use crate::log;
use crate::memory::MemoryKind;
use crate::modem::ModemContext;
use crate::Error;

/// The default timeout of AT commands
pub const AT_DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Sink capacities for the multi-row responses. A caller may ask for
/// less, never for more.
pub const OPERATOR_SCAN_SLOTS: usize = 10;
pub const SMS_LIST_SLOTS: usize = 10;
pub const PHONEBOOK_SLOTS: usize = 10;

/// An encoded command line (or SMS payload chunk) on its way to the UART.
pub(crate) type RawAtCommand = String<256>;

/// What the in-flight command expects back, for the response lines that
/// cannot be understood without that context: multi-row listings, body
/// lines, and the `+CPMS`/`+CPBS` answers whose three forms look alike.
///
/// Exactly one of these is installed while its command runs; progress
/// counters are the `len()` of the bounded sinks. A line that finds no
/// matching variant here is simply not consumed.
pub(crate) enum CommandContext {
    /// `AT+COPS?`: the parsed operator is both copied here and written to
    /// the device state.
    OperatorGet { operator: Option<cops::Operator> },
    /// `AT+COPS=?`: the byte machine and the operators it completed.
    OperatorScan {
        scanner: OperatorScanner,
        found: Vec<OperatorEntry, OPERATOR_SCAN_SLOTS>,
        limit: usize,
    },
    /// `AT+CMGR`: header fields land in `entry`, body lines follow until
    /// the terminal `OK`.
    SmsRead { entry: SmsEntry, got_header: bool },
    /// `AT+CMGL`: one entry per header row, body lines attach to the
    /// last entry.
    SmsList {
        memory: MemoryKind,
        entries: Vec<SmsEntry, SMS_LIST_SLOTS>,
        limit: usize,
        awaiting_text: bool,
    },
    /// `AT+CPMS` in any of its three forms.
    SmsStorage(StorageQuery),
    /// `AT+CPBS` in any of its three forms.
    PhonebookStorage(StorageQuery),
    /// `AT+CPBR`.
    PhonebookRead {
        entries: Vec<PhonebookEntry, PHONEBOOK_SLOTS>,
        limit: usize,
    },
    /// `AT+CPBF`.
    PhonebookFind {
        entries: Vec<PhonebookEntry, PHONEBOOK_SLOTS>,
        limit: usize,
    },
}

/// Likely an unsolicited report rather than response payload; body
/// capture leaves these alone.
fn looks_like_urc(line: &str) -> bool {
    line.starts_with('+') && line.contains(": ")
}

impl CommandContext {
    pub(crate) fn operator_scan(limit: usize) -> Self {
        CommandContext::OperatorScan {
            scanner: OperatorScanner::new(),
            found: Vec::new(),
            limit: limit.min(OPERATOR_SCAN_SLOTS),
        }
    }

    pub(crate) fn sms_list(memory: MemoryKind, limit: usize) -> Self {
        CommandContext::SmsList {
            memory,
            entries: Vec::new(),
            limit: limit.min(SMS_LIST_SLOTS),
            awaiting_text: false,
        }
    }

    pub(crate) fn phonebook_read(limit: usize) -> Self {
        CommandContext::PhonebookRead {
            entries: Vec::new(),
            limit: limit.min(PHONEBOOK_SLOTS),
        }
    }

    pub(crate) fn phonebook_find(limit: usize) -> Self {
        CommandContext::PhonebookFind {
            entries: Vec::new(),
            limit: limit.min(PHONEBOOK_SLOTS),
        }
    }

    /// Offer a non-terminal line to the in-flight command. Returns false
    /// if the line is not for this command; the dispatcher then tries the
    /// context-free parsers.
    pub(crate) fn consume_line(&mut self, line: &str, device: &mut DeviceState) -> bool {
        match self {
            CommandContext::OperatorGet { operator } => {
                let Some(rest) = line.strip_prefix("+COPS: ") else {
                    return false;
                };
                let parsed = cops::parse_operator(rest);
                device.network.operator = Some(parsed.clone());
                *operator = Some(parsed);
                true
            }

            CommandContext::OperatorScan {
                scanner,
                found,
                limit,
            } => {
                let bytes = if let Some(rest) = line.strip_prefix("+COPS: ") {
                    rest.as_bytes()
                } else if line.starts_with('+') {
                    // some other report, not scan data
                    return false;
                } else {
                    // continuation chunk of an oversized scan line
                    line.as_bytes()
                };
                for &byte in bytes {
                    scanner.feed(byte, found, *limit);
                }
                true
            }

            CommandContext::SmsRead { entry, got_header } => {
                if let Some(rest) = line.strip_prefix("+CMGR: ") {
                    entry.parse_header(&mut crate::parse::Cursor::from_str(rest));
                    *got_header = true;
                    true
                } else if *got_header && !looks_like_urc(line) {
                    entry.append_text(line);
                    true
                } else {
                    false
                }
            }

            CommandContext::SmsList {
                memory,
                entries,
                limit,
                awaiting_text,
            } => {
                if let Some(rest) = line.strip_prefix("+CMGL: ") {
                    if entries.len() >= *limit {
                        // sink full: not consumed, the row is dropped
                        return false;
                    }
                    let mut entry = cmgl::parse_row(rest);
                    entry.memory = *memory;
                    let _ = entries.push(entry);
                    *awaiting_text = true;
                    true
                } else if *awaiting_text && !looks_like_urc(line) {
                    if let Some(entry) = entries.last_mut() {
                        entry.append_text(line);
                    }
                    true
                } else {
                    false
                }
            }

            CommandContext::SmsStorage(query) => {
                let Some(rest) = line.strip_prefix("+CPMS: ") else {
                    return false;
                };
                cpms::parse(rest, *query, &mut device.sms_storage);
                true
            }

            CommandContext::PhonebookStorage(query) => {
                let Some(rest) = line.strip_prefix("+CPBS: ") else {
                    return false;
                };
                cpbs::parse(rest, *query, &mut device.phonebook_storage);
                true
            }

            CommandContext::PhonebookRead { entries, limit } => {
                let Some(rest) = line.strip_prefix("+CPBR: ") else {
                    return false;
                };
                if entries.len() >= *limit {
                    return false;
                }
                let _ = entries.push(cpbr::parse_row(rest));
                true
            }

            CommandContext::PhonebookFind { entries, limit } => {
                let Some(rest) = line.strip_prefix("+CPBF: ") else {
                    return false;
                };
                if entries.len() >= *limit {
                    return false;
                }
                let _ = entries.push(cpbr::parse_row(rest));
                true
            }
        }
    }
}

#[derive(Clone)]
pub struct CommandRunner<'a> {
    command_lock: &'a Mutex<CriticalSectionRawMutex, ()>,
    commands: Sender<'a, CriticalSectionRawMutex, RawAtCommand, 4>,
    responses: Receiver<'a, CriticalSectionRawMutex, ResponseCode, 1>,
}

impl<'a> CommandRunner<'a> {
    pub fn create(ctx: &'a ModemContext) -> Self {
        CommandRunner {
            command_lock: &ctx.command_lock,
            commands: ctx.commands.sender(),
            responses: ctx.generic_response.receiver(),
        }
    }

    /// Take the conversation lock: commands run strictly one at a time,
    /// in lock-acquisition order.
    pub async fn lock(&'a self) -> CommandRunnerGuard<'a> {
        CommandRunnerGuard {
            _commands_guard: self.command_lock.lock().await,
            runner: self,
            timeout: Some(AT_DEFAULT_TIMEOUT),
        }
    }
}

pub struct CommandRunnerGuard<'a> {
    _commands_guard: MutexGuard<'a, CriticalSectionRawMutex, ()>,
    runner: &'a CommandRunner<'a>,
    timeout: Option<Duration>,
}

impl<'a> CommandRunnerGuard<'a> {
    /// Run a future with the timeout configured for self
    async fn timeout<T, F: Future<Output = T>>(&self, future: F) -> Result<T, TimeoutError> {
        Ok(match self.timeout {
            Some(timeout) => with_timeout(timeout, future).await?,
            None => future.await,
        })
    }

    /// Send a request to the modem, but do not wait for a response.
    pub async fn send_request<R: AtRequest>(&self, request: &R) -> Result<(), TimeoutError> {
        self.timeout(async {
            self.runner.commands.send(request.encode()).await;
        })
        .await
    }

    /// Wait for the modem to return a specific response.
    pub async fn expect_response<T: AtResponse>(&self) -> Result<T, Error> {
        self.timeout(async {
            loop {
                let response = self.runner.responses.receive().await;

                match T::from_generic(response) {
                    Ok(response) => return Ok(response),
                    Err(ResponseCode::Error(error)) => return Err(Error::Modem(error)),
                    Err(unexpected) => {
                        log::warn!("Unexpected response: {:?}", unexpected);
                    }
                }
            }
        })
        .await?
    }

    /// Send a request to the modem, and wait for the modem to respond.
    pub async fn run<Request, Response>(&self, command: Request) -> Result<Response, Error>
    where
        Request: AtRequest<Response = Response>,
        Response: ExpectResponse,
    {
        // A response to a command that timed out may still be sitting in
        // the channel; it must not complete this command.
        while self.runner.responses.try_receive().is_ok() {}

        log::trace!("Running AT command: {:?}", command);
        self.send_request(&command).await?;
        let result = Response::expect(self).await;
        log::trace!("Completed AT command: {:?}", command);

        if let Err(e) = &result {
            log::error!("AT command {:?} error: {:?}", command, e);
        }

        result
    }

    /// Send a request to the modem and wait for the modem to respond.
    ///
    /// Use the provided timeout value instead of the configured one.
    pub async fn run_with_timeout<Request, Response>(
        &mut self,
        mut timeout: Option<Duration>,
        command: Request,
    ) -> Result<Response, Error>
    where
        Request: AtRequest<Response = Response>,
        Response: ExpectResponse,
    {
        mem::swap(&mut self.timeout, &mut timeout);
        let result = self.run(command).await;
        mem::swap(&mut self.timeout, &mut timeout);
        result
    }

    /// Set the timeout of subsequent commands
    ///
    /// Note that the timeout defaults to [AT_DEFAULT_TIMEOUT].
    pub fn with_timeout(self, timeout: Option<Duration>) -> Self {
        Self { timeout, ..self }
    }
}

/// Implemented for (tuples of) AtResponse.
///
/// In order to support AtRequest::Response being a tuple of arbitrary size, we
/// implement the ExpectResponse trait for tuples with as many member as we need.
pub trait ExpectResponse: Sized {
    type Fut<'a>: Future<Output = Result<Self, Error>> + 'a
    where
        Self: 'a;

    fn expect<'a>(runner: &'a CommandRunnerGuard<'a>) -> Self::Fut<'a>;
}

impl<T: AtResponse> ExpectResponse for T {
    type Fut<'a>
        = impl Future<Output = Result<Self, Error>> + 'a
    where
        Self: 'a;

    fn expect<'a>(runner: &'a CommandRunnerGuard<'a>) -> Self::Fut<'a> {
        runner.expect_response()
    }
}

impl<T: AtResponse, Y: AtResponse> ExpectResponse for (T, Y) {
    type Fut<'a>
        = impl Future<Output = Result<Self, Error>> + 'a
    where
        Self: 'a;

    fn expect<'a>(runner: &'a CommandRunnerGuard<'a>) -> Self::Fut<'a> {
        async {
            let r1 = runner.expect_response().await?;
            let r2 = runner.expect_response().await?;
            Ok((r1, r2))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::at_command::cmgr::SmsStatus;
    use crate::at_command::cops::{OperatorIdentity, OperatorMode};
    use crate::device::SmsSlot;

    #[test]
    fn operator_get_fills_sink_and_state() {
        let mut device = DeviceState::new();
        let mut ctx = CommandContext::OperatorGet { operator: None };

        assert!(ctx.consume_line("+COPS: 0,0,\"Operator X\",7", &mut device));
        assert!(!ctx.consume_line("+CMTI: \"SM\",2", &mut device));

        let CommandContext::OperatorGet { operator: Some(op) } = ctx else {
            panic!("sink not filled");
        };
        assert_eq!(op.mode, OperatorMode::Automatic);
        assert_eq!(op.identity, OperatorIdentity::LongName("Operator X".into()));
        assert_eq!(device.network.operator, Some(op));
    }

    #[test]
    fn sms_list_collects_rows_and_bodies() {
        let mut device = DeviceState::new();
        let mut ctx = CommandContext::sms_list(MemoryKind::Sm, 2);

        assert!(ctx.consume_line(
            "+CMGL: 1,\"REC UNREAD\",\"+386123\",\"\",\"01/01/24,10:00:00+04\"",
            &mut device
        ));
        assert!(ctx.consume_line("first line", &mut device));
        assert!(ctx.consume_line("second line", &mut device));
        assert!(ctx.consume_line(
            "+CMGL: 2,\"REC READ\",\"+386456\",\"\",\"01/01/24,11:00:00+04\"",
            &mut device
        ));
        assert!(ctx.consume_line("other body", &mut device));
        // sink is full: the third row is left for the dispatcher to drop
        assert!(!ctx.consume_line(
            "+CMGL: 3,\"REC READ\",\"+386789\",\"\",\"01/01/24,12:00:00+04\"",
            &mut device
        ));

        let CommandContext::SmsList { entries, .. } = ctx else {
            unreachable!();
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].memory, MemoryKind::Sm);
        assert_eq!(entries[0].position, 1);
        assert_eq!(entries[0].status, SmsStatus::Unread);
        assert_eq!(entries[0].text.as_str(), "first line\nsecond line");
        assert_eq!(entries[1].text.as_str(), "other body");
    }

    #[test]
    fn storage_answer_updates_device() {
        let mut device = DeviceState::new();
        let mut ctx = CommandContext::SmsStorage(StorageQuery::Current);

        assert!(ctx.consume_line("+CPMS: \"ME\",10,20,\"SM\",2,10,\"ME\",0,20", &mut device));
        assert_eq!(device.sms_pool(SmsSlot::Operation).current, MemoryKind::Me);
        assert_eq!(device.sms_pool(SmsSlot::Receive).current, MemoryKind::Sm);
        assert_eq!(device.sms_pool(SmsSlot::Receive).used, 2);
        assert_eq!(device.sms_pool(SmsSlot::Sent).total, 20);
    }

    #[test]
    fn scan_consumes_chunks_but_not_urcs() {
        let mut device = DeviceState::new();
        let mut ctx = CommandContext::operator_scan(4);

        assert!(ctx.consume_line("+COPS: (2,\"Op1\",\"O1\",\"00101\"),(1,\"Op2", &mut device));
        assert!(!ctx.consume_line("+CREG: 1", &mut device));
        assert!(ctx.consume_line("\",\"O2\",\"00102\")", &mut device));

        let CommandContext::OperatorScan { found, .. } = ctx else {
            unreachable!();
        };
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].long_name.as_str(), "Op2");
        assert_eq!(found[1].number, 102);
    }
}

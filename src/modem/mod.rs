mod command;
mod context;

use embassy_time::{with_timeout, Duration, Timer};
use futures::{select_biased, FutureExt};
use heapless::{String, Vec};

pub use command::{
    CommandRunner, CommandRunnerGuard, AT_DEFAULT_TIMEOUT, OPERATOR_SCAN_SLOTS, PHONEBOOK_SLOTS,
    SMS_LIST_SLOTS,
};
pub use context::ModemContext;
pub(crate) use command::RawAtCommand;
pub(crate) use context::{EngineState, FollowUp, TX_PIPE_LEN};

use crate::at_command::clcc::{self, CallRecord, NumberType};
use crate::at_command::cmgr::{SmsEntry, SmsStatus};
use crate::at_command::cops::{self, Operator, OperatorEntry, OperatorIdentity, OperatorMode};
use crate::at_command::cpbr::PhonebookEntry;
use crate::at_command::cpin::{self, SimState};
use crate::at_command::cpms::StorageQuery;
use crate::at_command::creg::{self, RegistrationStatus, RegistrationUrc};
use crate::at_command::{
    at, ata, atd, ate, ath, ccid, cmee, cmgd, cmgf, cmgl, cmgr, cmgs, cnmi, cpbf, cpbr, cpbs,
    cpbw, cpms, ModemError,
};
use crate::device::{DeviceState, MemoryPool, SmsSlot};
use crate::event::EventListener;
use crate::log;
use crate::memory::MemoryKind;
use crate::pump::{FollowUpPump, RawIoPump, RxPump, TxPump};
use crate::read::ModemReader;
use crate::{BuildIo, Error};

use self::command::CommandContext;

/// `AT+COPS?` may stall until the modem settles; the datasheets allow
/// two minutes.
const OPERATOR_QUERY_TIMEOUT: Duration = Duration::from_secs(121);
/// A full `AT+COPS=?` scan visits every channel. Minutes, not seconds.
const OPERATOR_SCAN_TIMEOUT: Duration = Duration::from_secs(180);
const SMS_SEND_TIMEOUT: Duration = Duration::from_secs(60);
const REGISTRATION_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Handle for driving the modem. Every method is a complete command
/// conversation: it takes the command lock, runs, and returns the typed
/// result.
pub struct Modem<'c> {
    context: &'c ModemContext,
    commands: CommandRunner<'c>,
}

impl<'c> Modem<'c> {
    /// Build the modem handle plus the pump tasks that feed it. The pumps
    /// must be spawned for anything to move; see `spawn_modem!`.
    pub fn new<I: BuildIo>(
        io: I,
        context: &'c ModemContext,
    ) -> (
        Modem<'c>,
        RawIoPump<'c, I>,
        TxPump<'c>,
        RxPump<'c>,
        FollowUpPump<'c>,
    ) {
        let modem = Modem {
            context,
            commands: context.commands(),
        };

        let io_pump = RawIoPump {
            io,
            rx: context.rx_pipe.writer(),
            tx: context.tx_pipe.reader(),
        };

        let rx_pump = RxPump {
            context,
            reader: ModemReader::new(context.rx_pipe.reader()),
            generic_response: context.generic_response.sender(),
        };

        let tx_pump = TxPump {
            writer: context.tx_pipe.writer(),
            commands: context.commands.receiver(),
        };

        let follow_up_pump = FollowUpPump { context };

        (modem, io_pump, tx_pump, rx_pump, follow_up_pump)
    }

    /// Bring the modem to a known state: echo off, numeric errors, SMS
    /// text mode, message indications, registration and call reports on.
    pub async fn init(&mut self) -> Result<(), Error> {
        log::info!("initializing modem");
        let commands = self.commands.lock().await;

        // The modem ignores us while it boots; poke it until it answers.
        for _ in 0..5 {
            if let Ok(Ok(_)) = with_timeout(Duration::from_millis(1000), commands.run(at::At)).await
            {
                break;
            }
        }

        commands.run(ate::SetEcho(false)).await?;
        commands
            .run(cmee::ConfigureCmeErrors(cmee::CmeErrorMode::Numeric))
            .await?;
        commands
            .run(cmgf::SetSmsFormat(cmgf::SmsFormat::Text))
            .await?;
        commands.run(cnmi::ConfigureSmsIndications).await?;
        commands
            .run(creg::ConfigureRegistrationUrc(RegistrationUrc::Enable))
            .await?;
        commands.run(clcc::ConfigureCallReports(true)).await?;
        drop(commands);

        // Prime the SIM state; a READY answer also schedules the
        // SIM-info fetch.
        self.query_sim_state().await?;

        log::info!("modem initialized");
        Ok(())
    }

    /// A copy of everything the driver currently knows about the modem.
    pub fn state(&self) -> DeviceState {
        self.context.snapshot()
    }

    /// Claim the event queue. Returns None if something already holds it.
    pub fn claim_events(&self) -> Option<EventListener<'c>> {
        self.context.events.claim()
    }

    // --- network ---

    pub async fn query_registration(&self) -> Result<RegistrationStatus, Error> {
        let guard = self.commands.lock().await;
        guard.run(creg::QueryRegistration).await?;
        drop(guard);
        Ok(self.context.device(|device| device.network.status))
    }

    /// Wait until the modem has registered to a cell tower.
    pub async fn wait_for_registration(&self) -> Result<(), Error> {
        log::debug!("waiting for cell registration");
        let wait_for_registration = async {
            self.context
                .registration
                .wait_until(|status| status.is_registered())
                .await;
        };

        let warn_on_long_wait = async {
            for i in 1u32.. {
                Timer::after(Duration::from_secs(20)).await;
                log::warn!("registration is taking a long time ({}s)...", i * 20);
            }
        };

        select_biased! {
            _ = wait_for_registration.fuse() => Ok(()),
            _ = warn_on_long_wait.fuse() => unreachable!(),
            _ = Timer::after(REGISTRATION_TIMEOUT).fuse() => Err(Error::Timeout),
        }
    }

    /// Ask which operator we are camped on. Also refreshes the operator
    /// in the device state.
    pub async fn query_operator(&self) -> Result<Operator, Error> {
        query_operator(self.context).await
    }

    /// Scan for visible operators, up to `limit` of them. Expect this to
    /// take minutes.
    pub async fn scan_operators(
        &self,
        limit: usize,
    ) -> Result<Vec<OperatorEntry, OPERATOR_SCAN_SLOTS>, Error> {
        let runner = self.context.commands();
        let mut guard = runner.lock().await;

        self.context
            .install_command(CommandContext::operator_scan(limit));
        let result = guard
            .run_with_timeout(Some(OPERATOR_SCAN_TIMEOUT), cops::ScanOperators)
            .await;
        let taken = self.context.take_command();
        result?;

        match taken {
            Some(CommandContext::OperatorScan { found, .. }) => Ok(found),
            _ => Ok(Vec::new()),
        }
    }

    /// Select an operator, or hand selection back to the modem with
    /// [`OperatorMode::Automatic`].
    pub async fn set_operator(
        &self,
        mode: OperatorMode,
        operator: Option<OperatorIdentity>,
    ) -> Result<(), Error> {
        let guard = self.commands.lock().await;
        guard
            .run(cops::SetOperator { mode, operator })
            .await
            .map(drop)
    }

    // --- SIM ---

    pub async fn query_sim_state(&self) -> Result<SimState, Error> {
        let guard = self.commands.lock().await;
        guard.run(cpin::QuerySimState).await?;
        drop(guard);
        Ok(self.context.device(|device| device.sim))
    }

    pub async fn enter_pin(&self, pin: &str) -> Result<(), Error> {
        let pin = check_pin(pin)?;
        let guard = self.commands.lock().await;
        guard.run(cpin::EnterPin { pin }).await.map(drop)
    }

    pub async fn enter_puk(&self, puk: &str, new_pin: &str) -> Result<(), Error> {
        let puk = check_pin(puk)?;
        let new_pin = check_pin(new_pin)?;
        let guard = self.commands.lock().await;
        guard.run(cpin::EnterPuk { puk, new_pin }).await.map(drop)
    }

    /// Read the ICCID off the SIM. Also cached in the device state.
    pub async fn query_iccid(&self) -> Result<String<22>, Error> {
        refresh_sim_info(self.context).await
    }

    // --- calls ---

    /// Start a voice call. The `OK` only means the dial began; watch
    /// [`Event::CallChanged`](crate::Event::CallChanged) for progress.
    pub async fn dial(&self, number: &str) -> Result<(), Error> {
        let number = check_number(number)?;
        let guard = self.commands.lock().await;
        guard.run(atd::Dial { number }).await.map(drop)
    }

    /// Answer an incoming call.
    pub async fn answer(&self) -> Result<(), Error> {
        let guard = self.commands.lock().await;
        guard.run(ata::Answer).await.map(drop)
    }

    /// Hang up the current call.
    pub async fn hang_up(&self) -> Result<(), Error> {
        let guard = self.commands.lock().await;
        guard.run(ath::HangUp).await.map(drop)
    }

    /// The last call state the modem reported, if any.
    pub fn current_call(&self) -> Option<CallRecord> {
        self.context.device(|device| device.call.clone())
    }

    // --- SMS ---

    /// Send a text message. Returns the network-assigned message
    /// reference.
    pub async fn send_sms(&self, destination: &str, text: &str) -> Result<u32, Error> {
        let destination = check_number(destination)?;
        let text = check_text::<160>(text)?;

        let mut guard = self.commands.lock().await;
        guard.run(cmgs::SendSms { destination }).await?;
        let (reference, _) = guard
            .run_with_timeout(Some(SMS_SEND_TIMEOUT), cmgs::SmsPayload(text))
            .await?;
        Ok(reference.value)
    }

    /// Read the message stored at `position` in the operation storage.
    pub async fn read_sms(&self, position: u16) -> Result<SmsEntry, Error> {
        let runner = self.context.commands();
        let guard = runner.lock().await;

        let entry = SmsEntry {
            memory: self
                .context
                .device(|device| device.sms_pool(SmsSlot::Operation).current),
            position,
            ..SmsEntry::default()
        };
        self.context.install_command(CommandContext::SmsRead {
            entry,
            got_header: false,
        });
        let result = guard.run(cmgr::ReadSms { position }).await;
        let taken = self.context.take_command();
        result?;

        match taken {
            Some(CommandContext::SmsRead {
                entry,
                got_header: true,
            }) => Ok(entry),
            // OK without a header: nothing stored there
            _ => Err(Error::Modem(ModemError::Generic)),
        }
    }

    /// List stored messages by status, up to `limit` of them.
    pub async fn list_sms(
        &self,
        status: SmsStatus,
        limit: usize,
    ) -> Result<Vec<SmsEntry, SMS_LIST_SLOTS>, Error> {
        let runner = self.context.commands();
        let guard = runner.lock().await;

        let memory = self
            .context
            .device(|device| device.sms_pool(SmsSlot::Operation).current);
        self.context
            .install_command(CommandContext::sms_list(memory, limit));
        let result = guard.run(cmgl::ListSms { status }).await;
        let taken = self.context.take_command();
        result?;

        match taken {
            Some(CommandContext::SmsList { entries, .. }) => Ok(entries),
            _ => Ok(Vec::new()),
        }
    }

    pub async fn delete_sms(&self, position: u16) -> Result<(), Error> {
        let guard = self.commands.lock().await;
        guard.run(cmgd::DeleteSms { position }).await.map(drop)
    }

    /// Which storages the modem offers for the three SMS slots.
    pub async fn query_sms_storage_options(&self) -> Result<[MemoryPool; 3], Error> {
        self.sms_storage_command(cpms::QueryStorageOptions, StorageQuery::Options)
            .await
    }

    /// Current storage selection and fill levels.
    pub async fn query_sms_storage(&self) -> Result<[MemoryPool; 3], Error> {
        self.sms_storage_command(cpms::QueryStorage, StorageQuery::Current)
            .await
    }

    /// Select the storages used for operations, reception, and sent
    /// messages.
    pub async fn select_sms_storage(
        &self,
        operation: MemoryKind,
        receive: MemoryKind,
        sent: MemoryKind,
    ) -> Result<[MemoryPool; 3], Error> {
        for kind in [operation, receive, sent] {
            if kind.token().is_none() {
                return Err(Error::Parameter);
            }
        }
        self.sms_storage_command(
            cpms::SelectStorage {
                operation,
                receive,
                sent,
            },
            StorageQuery::Select,
        )
        .await?;

        // The select answer carries counts only; remember what was
        // selected ourselves.
        Ok(self.context.engine(|state| {
            let pools = &mut state.device.sms_storage;
            pools[SmsSlot::Operation as usize].current = operation;
            pools[SmsSlot::Receive as usize].current = receive;
            pools[SmsSlot::Sent as usize].current = sent;
            *pools
        }))
    }

    async fn sms_storage_command<R>(
        &self,
        request: R,
        query: StorageQuery,
    ) -> Result<[MemoryPool; 3], Error>
    where
        R: crate::at_command::AtRequest<Response = crate::at_command::GenericOk>,
    {
        let runner = self.context.commands();
        let guard = runner.lock().await;

        self.context
            .install_command(CommandContext::SmsStorage(query));
        let result = guard.run(request).await;
        self.context.take_command();
        result?;

        Ok(self.context.device(|device| device.sms_storage))
    }

    // --- phonebook ---

    pub async fn query_phonebook_options(&self) -> Result<MemoryPool, Error> {
        self.phonebook_storage_command(cpbs::QueryPhonebookOptions, StorageQuery::Options)
            .await
    }

    pub async fn query_phonebook_storage(&self) -> Result<MemoryPool, Error> {
        self.phonebook_storage_command(cpbs::QueryPhonebookStorage, StorageQuery::Current)
            .await
    }

    pub async fn select_phonebook_storage(&self, storage: MemoryKind) -> Result<MemoryPool, Error> {
        if storage.token().is_none() {
            return Err(Error::Parameter);
        }
        self.phonebook_storage_command(cpbs::SelectPhonebookStorage { storage }, StorageQuery::Select)
            .await?;

        Ok(self.context.engine(|state| {
            state.device.phonebook_storage.current = storage;
            state.device.phonebook_storage
        }))
    }

    async fn phonebook_storage_command<R>(
        &self,
        request: R,
        query: StorageQuery,
    ) -> Result<MemoryPool, Error>
    where
        R: crate::at_command::AtRequest<Response = crate::at_command::GenericOk>,
    {
        let runner = self.context.commands();
        let guard = runner.lock().await;

        self.context
            .install_command(CommandContext::PhonebookStorage(query));
        let result = guard.run(request).await;
        self.context.take_command();
        result?;

        Ok(self.context.device(|device| device.phonebook_storage))
    }

    /// Read `count` phonebook positions starting at `start`.
    pub async fn read_phonebook(
        &self,
        start: u16,
        count: u16,
    ) -> Result<Vec<PhonebookEntry, PHONEBOOK_SLOTS>, Error> {
        if count == 0 {
            return Err(Error::Parameter);
        }
        let runner = self.context.commands();
        let guard = runner.lock().await;

        self.context
            .install_command(CommandContext::phonebook_read(count as usize));
        let result = guard
            .run(cpbr::ReadPhonebook {
                start,
                end: start.saturating_add(count - 1),
            })
            .await;
        let taken = self.context.take_command();
        result?;

        match taken {
            Some(CommandContext::PhonebookRead { entries, .. }) => Ok(entries),
            _ => Ok(Vec::new()),
        }
    }

    /// Search the selected phonebook by name.
    pub async fn find_phonebook(
        &self,
        text: &str,
    ) -> Result<Vec<PhonebookEntry, PHONEBOOK_SLOTS>, Error> {
        if text.is_empty() {
            return Err(Error::Parameter);
        }
        let text = check_text::<20>(text)?;

        let runner = self.context.commands();
        let guard = runner.lock().await;

        self.context
            .install_command(CommandContext::phonebook_find(PHONEBOOK_SLOTS));
        let result = guard.run(cpbf::FindPhonebook { text }).await;
        let taken = self.context.take_command();
        result?;

        match taken {
            Some(CommandContext::PhonebookFind { entries, .. }) => Ok(entries),
            _ => Ok(Vec::new()),
        }
    }

    pub async fn write_phonebook(
        &self,
        position: u16,
        number: &str,
        name: &str,
    ) -> Result<(), Error> {
        let number = check_number(number)?;
        let name = check_text::<20>(name)?;
        let number_type = if number.starts_with('+') {
            NumberType::International
        } else {
            NumberType::Unknown
        };

        let guard = self.commands.lock().await;
        guard
            .run(cpbw::WritePhonebook {
                position,
                number,
                number_type,
                name,
            })
            .await
            .map(drop)
    }

    pub async fn erase_phonebook(&self, position: u16) -> Result<(), Error> {
        let guard = self.commands.lock().await;
        guard.run(cpbw::ErasePhonebook { position }).await.map(drop)
    }
}

/// `AT+COPS?` as a standalone flow, shared between [`Modem`] and the
/// follow-up pump.
pub(crate) async fn query_operator(context: &ModemContext) -> Result<Operator, Error> {
    let runner = context.commands();
    let mut guard = runner.lock().await;

    context.install_command(CommandContext::OperatorGet { operator: None });
    let result = guard
        .run_with_timeout(Some(OPERATOR_QUERY_TIMEOUT), cops::GetOperatorInfo)
        .await;
    let taken = context.take_command();
    result?;

    match taken {
        Some(CommandContext::OperatorGet {
            operator: Some(operator),
        }) => Ok(operator),
        _ => Ok(Operator::default()),
    }
}

/// Fetch and cache the SIM ICCID. Runs from the follow-up pump when the
/// SIM reports ready.
pub(crate) async fn refresh_sim_info(context: &ModemContext) -> Result<String<22>, Error> {
    let runner = context.commands();
    let guard = runner.lock().await;

    let (response, _) = guard.run(ccid::ShowIccid).await?;
    drop(guard);

    context.engine(|state| state.device.iccid = Some(response.iccid.clone()));
    Ok(response.iccid)
}

fn check_number(number: &str) -> Result<String<26>, Error> {
    let valid = !number.is_empty()
        && number.len() <= 26
        && number
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'*' | b'#'));
    if !valid {
        return Err(Error::Parameter);
    }
    Ok(number.into())
}

fn check_pin(pin: &str) -> Result<String<8>, Error> {
    let valid = (4..=8).contains(&pin.len()) && pin.bytes().all(|b| b.is_ascii_digit());
    if !valid {
        return Err(Error::Parameter);
    }
    Ok(pin.into())
}

fn check_text<const N: usize>(text: &str) -> Result<String<N>, Error> {
    if text.len() > N {
        return Err(Error::Parameter);
    }
    Ok(text.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_validation() {
        assert!(check_number("+38640123456").is_ok());
        assert!(check_number("*123#").is_ok());
        assert!(check_number("").is_err());
        assert!(check_number("not a number").is_err());
        assert!(check_number("123456789012345678901234567").is_err());
    }

    #[test]
    fn pin_validation() {
        assert!(check_pin("1234").is_ok());
        assert!(check_pin("12345678").is_ok());
        assert!(check_pin("123").is_err());
        assert!(check_pin("12a4").is_err());
    }
}

use core::cell::RefCell;

use embassy_sync::blocking_mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex;
use embassy_sync::pipe::Pipe;

use super::command::{CommandContext, CommandRunner, RawAtCommand};
use crate::at_command::creg::RegistrationStatus;
use crate::at_command::ResponseCode;
use crate::device::DeviceState;
use crate::event::EventQueue;
use crate::read::RX_PIPE_LEN;
use crate::util::Watch;
use crate::Error;

pub(crate) const TX_PIPE_LEN: usize = 2048;

/// Work the dispatcher wants done but must not do itself: it would need
/// the command lock it can never take (it is the one answering commands).
/// The follow-up pump runs these as ordinary commands.
pub(crate) enum FollowUp {
    /// Registration changed to registered: refresh the current operator.
    QueryOperator,
    /// SIM became ready: fetch its ICCID.
    RefreshSimInfo,
}

/// Everything a response parser may touch, behind one lock: the device
/// state and the in-flight command descriptor.
pub(crate) struct EngineState {
    pub(crate) device: DeviceState,
    pub(crate) in_flight: Option<CommandContext>,
}

/// The shared heart of the driver: channels between the pumps, the device
/// state, and the event queue. Lives in a `static`, handed out by
/// reference.
pub struct ModemContext {
    pub(crate) command_lock: Mutex<CriticalSectionRawMutex, ()>,
    pub(crate) commands: Channel<CriticalSectionRawMutex, RawAtCommand, 4>,
    pub(crate) generic_response: Channel<CriticalSectionRawMutex, ResponseCode, 1>,
    pub(crate) follow_up: Channel<CriticalSectionRawMutex, FollowUp, 2>,
    pub(crate) state: blocking_mutex::Mutex<CriticalSectionRawMutex, RefCell<EngineState>>,
    pub(crate) registration: Watch<CriticalSectionRawMutex, RegistrationStatus>,
    pub(crate) events: EventQueue,
    pub(crate) tx_pipe: Pipe<CriticalSectionRawMutex, TX_PIPE_LEN>,
    pub(crate) rx_pipe: Pipe<CriticalSectionRawMutex, RX_PIPE_LEN>,
}

impl ModemContext {
    pub const fn new() -> Self {
        ModemContext {
            command_lock: Mutex::new(()),
            commands: Channel::new(),
            generic_response: Channel::new(),
            follow_up: Channel::new(),
            state: blocking_mutex::Mutex::new(RefCell::new(EngineState {
                device: DeviceState::new(),
                in_flight: None,
            })),
            registration: Watch::new(RegistrationStatus::Unknown),
            events: EventQueue::new(),
            tx_pipe: Pipe::new(),
            rx_pipe: Pipe::new(),
        }
    }

    pub fn commands(&self) -> CommandRunner<'_> {
        CommandRunner::create(self)
    }

    pub(crate) fn engine<R>(&self, f: impl FnOnce(&mut EngineState) -> R) -> R {
        self.state.lock(|state| f(&mut state.borrow_mut()))
    }

    /// Read access to the device state.
    pub fn device<R>(&self, f: impl FnOnce(&DeviceState) -> R) -> R {
        self.engine(|state| f(&state.device))
    }

    pub fn snapshot(&self) -> DeviceState {
        self.device(Clone::clone)
    }

    /// Register what the command about to be sent expects back. Callers
    /// hold the command lock while one of these is installed.
    pub(crate) fn install_command(&self, command: CommandContext) {
        self.engine(|state| state.in_flight = Some(command));
    }

    /// Remove and return the in-flight descriptor. Also run when a
    /// command fails or times out, so a late response finds nothing to
    /// complete and is dropped.
    pub(crate) fn take_command(&self) -> Option<CommandContext> {
        self.engine(|state| state.in_flight.take())
    }

    /// Schedule deferred work for the follow-up pump without blocking.
    pub(crate) fn defer(&self, job: FollowUp) -> Result<(), Error> {
        self.follow_up.try_send(job).map_err(|_| Error::Busy)
    }
}

impl Default for ModemContext {
    fn default() -> Self {
        ModemContext::new()
    }
}

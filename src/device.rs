//! The driver's view of the modem.
//!
//! One modem holds one conversation, so there is exactly one
//! [`DeviceState`] per [`ModemContext`](crate::modem::ModemContext). Only
//! the rx pump mutates it, while parsing responses; everyone else takes
//! snapshots through [`Modem::state`](crate::modem::Modem::state).

use heapless::String;

use crate::at_command::clcc::CallRecord;
use crate::at_command::cops::Operator;
use crate::at_command::cpin::SimState;
use crate::at_command::unsolicited::RegistrationStatus;
use crate::memory::{MemoryBitset, MemoryKind};

/// Usage of one storage area, as reported by `+CPMS`/`+CPBS`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MemoryPool {
    /// Storages the modem offers for this slot.
    pub available: MemoryBitset,
    /// The storage currently selected.
    pub current: MemoryKind,
    pub used: u16,
    pub total: u16,
}

impl MemoryPool {
    pub const fn new() -> Self {
        MemoryPool {
            available: MemoryBitset::EMPTY,
            current: MemoryKind::Unknown,
            used: 0,
            total: 0,
        }
    }
}

/// The three SMS storage slots of `+CPMS`, in wire order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(usize)]
pub enum SmsSlot {
    /// Read/delete/send operations
    Operation = 0,
    /// Where incoming messages land
    Receive = 1,
    /// Where sent and unsent messages land
    Sent = 2,
}

#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NetworkState {
    pub status: RegistrationStatus,
    /// The operator we are camped on, filled by `+COPS` responses.
    pub operator: Option<Operator>,
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceState {
    pub sim: SimState,
    /// ICCID of the inserted SIM, fetched once the SIM reports ready.
    pub iccid: Option<String<22>>,
    pub network: NetworkState,
    /// The most recently reported call, from `+CLCC`.
    pub call: Option<CallRecord>,
    pub sms_storage: [MemoryPool; 3],
    pub phonebook_storage: MemoryPool,
}

impl DeviceState {
    pub const fn new() -> Self {
        DeviceState {
            sim: SimState::NotReady,
            iccid: None,
            network: NetworkState {
                status: RegistrationStatus::Unknown,
                operator: None,
            },
            call: None,
            sms_storage: [MemoryPool::new(), MemoryPool::new(), MemoryPool::new()],
            phonebook_storage: MemoryPool::new(),
        }
    }

    pub fn sms_pool(&self, slot: SmsSlot) -> &MemoryPool {
        &self.sms_storage[slot as usize]
    }
}

impl Default for DeviceState {
    fn default() -> Self {
        DeviceState::new()
    }
}

#![no_std]
#![feature(type_alias_impl_trait)]
#![feature(impl_trait_in_assoc_type)]
#![allow(clippy::unnecessary_lazy_evaluations)]
#![allow(clippy::single_component_path_imports)]
// large enum variants are unavoidable in no_std, since we can't box things
#![allow(clippy::large_enum_variant, clippy::result_large_err)]

//! Async driver for 3GPP AT-command cellular modems.
//!
//! Talks the generic Hayes/3GPP command set over a UART: network
//! registration, SIM management, voice calls, SMS, and phonebook access,
//! without the application ever touching an AT string. Plug in a HAL
//! UART through [`BuildIo`], spawn the pumps with [`spawn_modem!`], and
//! drive everything through [`modem::Modem`].

pub mod at_command;
pub mod device;
mod error;
pub mod event;
pub mod memory;
pub mod modem;
pub mod parse;
pub mod pump;
pub mod read;
mod util;

pub use util::Watch;

#[cfg(all(feature = "log", feature = "defmt"))]
compile_error!("'log' and 'defmt' features are mutually exclusive");
#[cfg(not(any(feature = "log", feature = "defmt")))]
compile_error!("please enable a logging feature, e.g. 'log' or 'defmt'");
#[cfg(feature = "defmt")]
pub(crate) use defmt as log;
#[cfg(feature = "log")]
pub(crate) use log;

use embedded_io_async::{Read, Write};

pub use at_command::ModemError;
pub use error::Error;
pub use event::{Event, EventListener, Lagged};

/// This trait is for building a `BuildIo::IO` that implements [SplitIo].
///
/// It lets the user of this library plug in UART driver types from
/// whatever HAL they're using; the `RawIoPump` constructs the UART IO
/// through it.
pub trait BuildIo {
    type IO<'d>: SplitIo
    where
        Self: 'd;

    /// Construct a `BuildIo::IO` that implements [SplitIo].
    fn build(&mut self) -> Self::IO<'_>;
}

/// Split self into a reader and a writer. See documentation on [SplitIo::split].
pub trait SplitIo: Sized {
    type Reader<'u>: Read
    where
        Self: 'u;
    type Writer<'u>: Write
    where
        Self: 'u;

    /// Split self into a reader and a writer.
    ///
    /// **NOTE**: This method **must not** be called with None. Implementations are allowed to panic
    /// on None. This method takes a `&mut Option<Self>` so that implementations can choose to
    /// borrow `Self`, or to take ownership of it. This is to maintain compatibility with as many
    /// HALs as possible.
    fn split(this: &mut Option<Self>) -> (Self::Reader<'_>, Self::Writer<'_>);
}

/// This macro sets up a modem for use, statically allocating the context
/// and spawning the pump tasks.
///
/// You can call `Modem::new` directly if you want more control over initialization.
#[macro_export]
macro_rules! spawn_modem {
    ($spawner:expr, $io_ty:ty as $io:expr $(,)?) => {{
        static CONTEXT: ::gsm_async::modem::ModemContext =
            ::gsm_async::modem::ModemContext::new();

        let spawner: &Spawner = $spawner;
        let (modem, io_pump, tx_pump, rx_pump, follow_up_pump) =
            ::gsm_async::modem::Modem::new($io, &CONTEXT);

        mod __tasks {
            use super::*;
            use ::gsm_async::pump_task;
            pump_task!(tx_pump, ::gsm_async::pump::TxPump<'static>);
            pump_task!(rx_pump, ::gsm_async::pump::RxPump<'static>);
            pump_task!(follow_up_pump, ::gsm_async::pump::FollowUpPump<'static>);
            pump_task!(io_pump, ::gsm_async::pump::RawIoPump<'static, $io_ty>);
        }

        spawner.must_spawn(__tasks::tx_pump(tx_pump));
        spawner.must_spawn(__tasks::rx_pump(rx_pump));
        spawner.must_spawn(__tasks::follow_up_pump(follow_up_pump));
        spawner.must_spawn(__tasks::io_pump(io_pump));

        modem
    }};
}

//! The driver's tasks.
//!
//! Four pumps, each an endless loop over one await point:
//!
//! - [`RawIoPump`]: UART <-> the rx/tx pipes
//! - [`TxPump`]: command channel -> tx pipe
//! - [`RxPump`]: rx pipe -> line dispatcher (response parsing, device
//!   state, events)
//! - [`FollowUpPump`]: runs the commands the dispatcher schedules
//!
//! `RxPump` is the engine: the only place device state is mutated and
//! responses are correlated with the in-flight command.

use core::future::Future;

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Receiver, Sender};
use embassy_sync::pipe::{Reader, Writer};
use embassy_time::{with_timeout, Duration};
use embedded_io_async::{Read, Write};

use crate::at_command::generic_response::is_terminal;
use crate::at_command::unsolicited::Urc;
use crate::at_command::{AtParseLine, ResponseCode};
use crate::event::Event;
use crate::log;
use crate::modem::{self, EngineState, FollowUp, ModemContext, TX_PIPE_LEN};
use crate::read::{ModemReader, RX_PIPE_LEN};
use crate::{BuildIo, Error, SplitIo};

pub const PUMP_COUNT: usize = 4;

pub trait Pump {
    type Err;
    type Fut<'a>: Future<Output = Result<(), Self::Err>> + 'a
    where
        Self: 'a;

    /// One iteration of the pump's loop.
    fn pump(&mut self) -> Self::Fut<'_>;
}

/// Reads lines from the modem and dispatches them: in-flight command
/// first, then unsolicited reports, then the generic response codes.
pub struct RxPump<'context> {
    pub(crate) context: &'context ModemContext,
    pub(crate) reader: ModemReader<'context>,
    pub(crate) generic_response: Sender<'context, CriticalSectionRawMutex, ResponseCode, 1>,
}

impl RxPump<'_> {
    fn handle_urc(&mut self, urc: Urc) {
        match urc {
            Urc::Registration(registration) => {
                let status = registration.status;
                log::info!("registration status: {:?}", status);
                self.context
                    .engine(|state| state.device.network.status = status);
                self.context.registration.set(status);

                // Freshly registered: learn who we registered to before
                // telling the application. If the follow-up queue is
                // full, the event alone has to do.
                let deferred =
                    status.is_registered() && self.context.defer(FollowUp::QueryOperator).is_ok();
                if !deferred {
                    self.context.events.push(Event::NetworkRegistration(status));
                }
            }

            Urc::SimState(sim) => {
                log::info!("sim state: {:?}", sim);
                self.context.engine(|state| state.device.sim = sim);
                if sim == crate::at_command::SimState::Ready {
                    if let Err(error) = self.context.defer(FollowUp::RefreshSimInfo) {
                        log::warn!("skipping SIM info fetch: {:?}", error);
                    }
                }
                self.context.events.push(Event::SimState(sim));
            }

            Urc::SmsIndication(indication) => {
                self.context.events.push(Event::SmsReceived {
                    memory: indication.memory,
                    position: indication.position,
                });
            }

            Urc::CallStatus(call) => {
                self.context
                    .engine(|state| state.device.call = Some(call.clone()));
                self.context.events.push(Event::CallChanged(call));
            }

            Urc::Ready(_) | Urc::SmsReady(_) | Urc::CallReady(_) => {
                log::debug!("modem boot marker");
            }
        }
    }
}

impl<'context> Pump for RxPump<'context> {
    type Err = Error;
    type Fut<'a>
        = impl Future<Output = Result<(), Self::Err>> + 'a
    where
        Self: 'a;

    fn pump(&mut self) -> Self::Fut<'_> {
        async {
            let line = self.reader.read_line().await?;

            if line.is_empty() {
                log::warn!("received empty line from modem");
            }

            // Terminal codes end the conversation no matter what is in
            // flight; everything else is offered to the in-flight
            // command first.
            if !is_terminal(&line) {
                let consumed = self.context.engine(|state| {
                    let EngineState { device, in_flight } = state;
                    in_flight
                        .as_mut()
                        .is_some_and(|command| command.consume_line(&line, device))
                });
                if consumed {
                    return Ok(());
                }
            }

            if let Ok(urc) = Urc::from_line(&line) {
                log::debug!("URC: {:?}", line.as_str());
                self.handle_urc(urc);
            } else if let Ok(response) = ResponseCode::from_line(&line) {
                log::debug!("response: {:?}", line.as_str());

                if let ResponseCode::MessageReference(reference) = &response {
                    self.context.events.push(Event::SmsSent {
                        reference: reference.value,
                    });
                }

                // Nobody waiting (a command that timed out, say) must not
                // wedge the pump forever.
                if with_timeout(
                    Duration::from_secs(10),
                    self.generic_response.send(response),
                )
                .await
                .is_err()
                {
                    log::error!("response channel send timed out");
                }
            } else {
                // Discarded: either modem gibberish or a row whose
                // command already gave up on it.
                log::warn!("unknown line from modem: {:?}", line.as_str());
            }

            Ok(())
        }
    }
}

/// Moves encoded commands from the command channel onto the tx pipe.
pub struct TxPump<'context> {
    pub(crate) writer: Writer<'context, CriticalSectionRawMutex, TX_PIPE_LEN>,
    pub(crate) commands: Receiver<'context, CriticalSectionRawMutex, crate::modem::RawAtCommand, 4>,
}

impl<'context> Pump for TxPump<'context> {
    type Err = Error;
    type Fut<'a>
        = impl Future<Output = Result<(), Self::Err>> + 'a
    where
        Self: 'a;

    fn pump(&mut self) -> Self::Fut<'_> {
        async {
            let command = self.commands.receive().await;
            log::debug!("write to modem: {:?}", command.as_str());

            // `Writer` is infallible, these cannot fail.
            let _ = self.writer.write_all(command.as_bytes()).await;
            let _ = self.writer.flush().await;

            Ok(())
        }
    }
}

/// Runs the deferred commands the dispatcher cannot run itself.
pub struct FollowUpPump<'context> {
    pub(crate) context: &'context ModemContext,
}

impl<'context> Pump for FollowUpPump<'context> {
    type Err = Error;
    type Fut<'a>
        = impl Future<Output = Result<(), Self::Err>> + 'a
    where
        Self: 'a;

    fn pump(&mut self) -> Self::Fut<'_> {
        async {
            match self.context.follow_up.receive().await {
                FollowUp::QueryOperator => {
                    let result = modem::query_operator(self.context).await;
                    // Deliver the registration event the dispatcher held
                    // back, operator now refreshed (or given up on).
                    let status = self.context.device(|device| device.network.status);
                    self.context.events.push(Event::NetworkRegistration(status));
                    result?;
                }
                FollowUp::RefreshSimInfo => {
                    modem::refresh_sim_info(self.context).await?;
                }
            }
            Ok(())
        }
    }
}

/// Shovels raw bytes between the UART and the rx/tx pipes.
pub struct RawIoPump<'context, RW> {
    pub(crate) io: RW,
    /// sends data to the rx pump
    pub(crate) rx: Writer<'context, CriticalSectionRawMutex, RX_PIPE_LEN>,
    /// reads data from the tx pump
    pub(crate) tx: Reader<'context, CriticalSectionRawMutex, TX_PIPE_LEN>,
}

impl<'context, RW: 'static + BuildIo> Pump for RawIoPump<'context, RW> {
    type Err = Error;
    type Fut<'a>
        = impl Future<Output = Result<(), Self::Err>> + 'a
    where
        Self: 'a;

    fn pump(&mut self) -> Self::Fut<'_> {
        async {
            let mut io = Some(self.io.build());
            let (mut reader, mut writer) = SplitIo::split(&mut io);

            loop {
                let mut tx_buf = [0u8; 256];
                let mut rx_buf = [0u8; 256];

                match select(self.tx.read(&mut tx_buf), reader.read(&mut rx_buf)).await {
                    Either::First(bytes) => {
                        writer
                            .write_all(&tx_buf[..bytes])
                            .await
                            .map_err(|_| Error::Serial)?;
                        writer.flush().await.map_err(|_| Error::Serial)?;
                    }
                    Either::Second(result) => {
                        let bytes = result.map_err(|_| Error::Serial)?;
                        self.rx.write_all(&rx_buf[..bytes]).await.ok(/* infallible */);
                        self.rx.flush().await.ok(/* infallible */);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::at_command::creg::RegistrationStatus;
    use crate::memory::MemoryKind;

    fn rx_pump(context: &'static ModemContext) -> RxPump<'static> {
        RxPump {
            context,
            reader: ModemReader::new(context.rx_pipe.reader()),
            generic_response: context.generic_response.sender(),
        }
    }

    fn pump_all(pump: &mut RxPump<'static>) {
        let mut cx = core::task::Context::from_waker(core::task::Waker::noop());
        loop {
            let mut fut = core::pin::pin!(pump.pump());
            match Future::poll(fut.as_mut(), &mut cx) {
                core::task::Poll::Ready(result) => result.unwrap(),
                // out of input
                core::task::Poll::Pending => return,
            }
        }
    }

    #[test]
    fn registration_urc_schedules_operator_query() {
        static CONTEXT: ModemContext = ModemContext::new();
        let mut pump = rx_pump(&CONTEXT);

        CONTEXT.rx_pipe.try_write(b"+CREG: 0,1\r\n").unwrap();
        pump_all(&mut pump);

        assert_eq!(
            CONTEXT.device(|device| device.network.status),
            RegistrationStatus::RegisteredHome
        );
        assert!(matches!(
            CONTEXT.follow_up.try_receive(),
            Ok(FollowUp::QueryOperator)
        ));
    }

    #[test]
    fn denied_registration_is_an_event_not_a_query() {
        static CONTEXT: ModemContext = ModemContext::new();
        let mut pump = rx_pump(&CONTEXT);
        let mut events = CONTEXT.events.claim().unwrap();

        CONTEXT.rx_pipe.try_write(b"+CREG: 3\r\n").unwrap();
        pump_all(&mut pump);

        assert!(CONTEXT.follow_up.try_receive().is_err());
        let mut cx = core::task::Context::from_waker(core::task::Waker::noop());
        let mut next = core::pin::pin!(events.next());
        let polled = Future::poll(next.as_mut(), &mut cx);
        assert!(matches!(
            polled,
            core::task::Poll::Ready(Ok(Event::NetworkRegistration(
                RegistrationStatus::RegistrationDenied
            )))
        ));
    }

    #[test]
    fn sim_pin_request_updates_state_and_events() {
        use crate::at_command::SimState;

        static CONTEXT: ModemContext = ModemContext::new();
        let mut pump = rx_pump(&CONTEXT);
        let mut events = CONTEXT.events.claim().unwrap();

        CONTEXT.rx_pipe.try_write(b"+CPIN: SIM PIN\r\n").unwrap();
        pump_all(&mut pump);

        assert_eq!(CONTEXT.device(|device| device.sim), SimState::Pin);
        // a locked SIM must not trigger the SIM-info fetch
        assert!(CONTEXT.follow_up.try_receive().is_err());

        let mut cx = core::task::Context::from_waker(core::task::Waker::noop());
        let mut next = core::pin::pin!(events.next());
        let polled = Future::poll(next.as_mut(), &mut cx);
        assert!(matches!(
            polled,
            core::task::Poll::Ready(Ok(Event::SimState(SimState::Pin)))
        ));
    }

    #[test]
    fn cmti_urc_becomes_event() {
        static CONTEXT: ModemContext = ModemContext::new();
        let mut pump = rx_pump(&CONTEXT);
        let mut events = CONTEXT.events.claim().unwrap();

        CONTEXT.rx_pipe.try_write(b"+CMTI: \"SM\",4\r\n").unwrap();
        pump_all(&mut pump);

        let mut cx = core::task::Context::from_waker(core::task::Waker::noop());
        let mut next = core::pin::pin!(events.next());
        let polled = Future::poll(next.as_mut(), &mut cx);
        assert!(matches!(
            polled,
            core::task::Poll::Ready(Ok(Event::SmsReceived {
                memory: MemoryKind::Sm,
                position: 4
            }))
        ));
    }

    #[test]
    fn terminal_line_reaches_the_response_channel() {
        static CONTEXT: ModemContext = ModemContext::new();
        let mut pump = rx_pump(&CONTEXT);

        CONTEXT.rx_pipe.try_write(b"OK\r\n").unwrap();
        pump_all(&mut pump);

        assert!(matches!(
            CONTEXT.generic_response.try_receive(),
            Ok(ResponseCode::Ok(_))
        ));
    }

    #[test]
    fn late_row_without_command_is_discarded() {
        static CONTEXT: ModemContext = ModemContext::new();
        let mut pump = rx_pump(&CONTEXT);

        // no in-flight command: the row must not show up anywhere
        CONTEXT
            .rx_pipe
            .try_write(b"+CPBR: 1,\"Alice\",129,\"040\"\r\n")
            .unwrap();
        pump_all(&mut pump);

        assert!(CONTEXT.generic_response.try_receive().is_err());
        assert!(CONTEXT.follow_up.try_receive().is_err());
    }
}

/// Wrap each pump in an embassy task that keeps it running and logs its
/// failures.
#[macro_export]
macro_rules! pump_task {
    ($name:ident, $type:ty) => {
        #[embassy_executor::task]
        pub(crate) async fn $name(mut pump: $type) {
            use ::gsm_async::pump::Pump;
            loop {
                if let Err(err) = pump.pump().await {
                    #[cfg(feature = "log")]
                    log::error!("Error pumping {} {:?}", stringify!($name), err);
                    #[cfg(feature = "defmt")]
                    defmt::error!("Error pumping {} {:?}", stringify!($name), err);
                }
            }
        }
    };
}

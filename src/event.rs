//! Typed events pushed by the driver when the modem reports something the
//! application did not explicitly ask for.

use core::cell::RefCell;
use core::future::poll_fn;
use core::sync::atomic::{AtomicBool, Ordering};
use core::task::Poll;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::{blocking_mutex, waitqueue::WakerRegistration};
use heapless::Deque;

use crate::at_command::clcc::CallRecord;
use crate::at_command::cpin::SimState;
use crate::at_command::unsolicited::RegistrationStatus;
use crate::memory::MemoryKind;

pub const EVENT_QUEUE_DEPTH: usize = 8;

#[derive(Clone, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Event {
    /// The SIM changed state, e.g. it now wants a PIN.
    SimState(SimState),
    /// Network registration changed. When the change was "registered",
    /// the operator in the device state has been refreshed first.
    NetworkRegistration(RegistrationStatus),
    /// A call changed state (`+CLCC`).
    CallChanged(CallRecord),
    /// An SMS send completed; `reference` is the modem-assigned message
    /// reference from `+CMGS`.
    SmsSent { reference: u32 },
    /// An SMS arrived and was stored (`+CMTI`).
    SmsReceived { memory: MemoryKind, position: u16 },
}

/// The events consumer missed some events since it last polled; the queue
/// dropped the oldest ones.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Lagged;

/// Fixed-depth event queue with drop-oldest overflow, claimable by a
/// single consumer.
pub struct EventQueue {
    claimed: AtomicBool,
    state: blocking_mutex::Mutex<CriticalSectionRawMutex, RefCell<QueueState>>,
}

struct QueueState {
    dropped: bool,
    waker: WakerRegistration,
    buf: Deque<Event, EVENT_QUEUE_DEPTH>,
}

impl EventQueue {
    pub(crate) const fn new() -> Self {
        EventQueue {
            claimed: AtomicBool::new(false),
            state: blocking_mutex::Mutex::new(RefCell::new(QueueState {
                dropped: false,
                waker: WakerRegistration::new(),
                buf: Deque::new(),
            })),
        }
    }

    /// Deliver an event, dropping the oldest queued one if full.
    pub(crate) fn push(&self, event: Event) {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            if let Err(event) = state.buf.push_back(event) {
                state.buf.pop_front();
                // the pop made room
                let _ = state.buf.push_back(event);
                state.dropped = true;
            }
            state.waker.wake();
        });
    }

    pub(crate) fn claim(&self) -> Option<EventListener<'_>> {
        (!self.claimed.fetch_or(true, Ordering::Relaxed)).then(|| EventListener { queue: self })
    }
}

/// The consuming side of the driver's event queue. At most one exists at
/// a time; dropping it allows a new claim.
pub struct EventListener<'a> {
    queue: &'a EventQueue,
}

impl EventListener<'_> {
    /// Wait for the next event. `Err(Lagged)` reports that events were
    /// dropped since the previous call; the next call yields data again.
    pub async fn next(&mut self) -> Result<Event, Lagged> {
        poll_fn(|cx| {
            self.queue.state.lock(|state| {
                let mut state = state.borrow_mut();
                if state.dropped {
                    state.dropped = false;
                    Poll::Ready(Err(Lagged))
                } else if let Some(event) = state.buf.pop_front() {
                    Poll::Ready(Ok(event))
                } else {
                    state.waker.register(cx.waker());
                    Poll::Pending
                }
            })
        })
        .await
    }
}

impl Drop for EventListener<'_> {
    fn drop(&mut self) {
        self.queue.claimed.store(false, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(listener: &mut EventListener<'_>) -> (usize, bool) {
        let mut count = 0;
        let mut lagged = false;
        let mut cx = core::task::Context::from_waker(core::task::Waker::noop());
        loop {
            let mut next = core::pin::pin!(listener.next());
            match next.as_mut().poll(&mut cx) {
                Poll::Ready(Ok(_)) => count += 1,
                Poll::Ready(Err(Lagged)) => lagged = true,
                Poll::Pending => return (count, lagged),
            }
        }
    }

    use core::future::Future;

    #[test]
    fn single_claim() {
        let queue = EventQueue::new();
        let listener = queue.claim();
        assert!(listener.is_some());
        assert!(queue.claim().is_none());
        drop(listener);
        assert!(queue.claim().is_some());
    }

    #[test]
    fn overflow_drops_oldest_and_reports_lag() {
        let queue = EventQueue::new();
        for _ in 0..EVENT_QUEUE_DEPTH + 2 {
            queue.push(Event::SimState(SimState::Ready));
        }

        let mut listener = queue.claim().unwrap();
        let (count, lagged) = drain(&mut listener);
        assert!(lagged);
        assert_eq!(count, EVENT_QUEUE_DEPTH);
    }
}

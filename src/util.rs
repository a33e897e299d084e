use core::cell::RefCell;
use core::future::{poll_fn, Future};
use core::task::Poll;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::{blocking_mutex, waitqueue::WakerRegistration};

/// A cell that always holds the latest value of something and can be
/// awaited for changes.
///
/// Unlike a channel there is no queue: setters overwrite, and a waiter
/// only ever observes the current value. Used for states that are
/// idempotent to re-observe, like network registration.
pub struct Watch<M: RawMutex, T> {
    inner: blocking_mutex::Mutex<M, RefCell<WatchState<T>>>,
}

struct WatchState<T> {
    value: T,
    waker: WakerRegistration,
}

impl<M: RawMutex, T: Clone> Watch<M, T> {
    pub const fn new(value: T) -> Self {
        Watch {
            inner: blocking_mutex::Mutex::new(RefCell::new(WatchState {
                value,
                waker: WakerRegistration::new(),
            })),
        }
    }

    /// Replace the value and wake the waiter.
    pub fn set(&self, value: T) {
        self.inner.lock(|state| {
            let mut state = state.borrow_mut();
            state.value = value;
            state.waker.wake();
        })
    }

    pub fn get(&self) -> T {
        self.inner.lock(|state| state.borrow().value.clone())
    }

    /// Resolve as soon as the value satisfies `accept`, including the
    /// value already present when called.
    pub fn wait_until<'a>(
        &'a self,
        mut accept: impl FnMut(&T) -> bool + 'a,
    ) -> impl Future<Output = T> + 'a {
        poll_fn(move |cx| {
            self.inner.lock(|state| {
                let mut state = state.borrow_mut();
                if accept(&state.value) {
                    Poll::Ready(state.value.clone())
                } else {
                    state.waker.register(cx.waker());
                    Poll::Pending
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

    #[test]
    fn watch_overwrites() {
        let watch: Watch<CriticalSectionRawMutex, u32> = Watch::new(1);
        assert_eq!(watch.get(), 1);
        watch.set(2);
        watch.set(3);
        assert_eq!(watch.get(), 3);
    }
}

// Single-slot, latest-wins handoff between the command context and the
// motion thread.
//
// publish() never blocks on the reader and overwrites anything unread.
// take_blocking() waits for a value published since the previous take.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::messages::BodyCommand;

pub type CommandMailbox = Mailbox<BodyCommand>;

#[derive(Debug)]
pub struct Mailbox<T> {
    slot: Mutex<Option<T>>,
    ready: Condvar,
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    // The slot is a plain Option; a poisoned lock still holds a valid value
    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `value`, dropping any unread one. Returns true if a value was
    /// superseded.
    pub fn publish(&self, value: T) -> bool {
        let superseded = self.lock().replace(value).is_some();
        self.ready.notify_one();
        superseded
    }

    /// Wait until a value is available and take it
    pub fn take_blocking(&self) -> T {
        let mut slot = self.lock();
        loop {
            if let Some(value) = slot.take() {
                return value;
            }
            slot = self.ready.wait(slot).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like `take_blocking`, but gives up after `timeout`
    pub fn take_timeout(&self, timeout: Duration) -> Option<T> {
        let (mut slot, _) = self
            .ready
            .wait_timeout_while(self.lock(), timeout, |slot| slot.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        slot.take()
    }

    /// Take a pending value without waiting
    pub fn try_take(&self) -> Option<T> {
        self.lock().take()
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

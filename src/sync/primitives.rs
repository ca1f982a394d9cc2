//! Interrupt-safe building blocks for the shared channel wrapper.

use core::cell::RefCell;
#[cfg(feature = "async")]
use core::task::Waker;
use critical_section::Mutex;

/// `RefCell` guarded by a critical section
///
/// Task code and the channel interrupt handler both reach the channel
/// through this cell; every access runs with interrupts masked.
pub struct CriticalSectionCell<T> {
    inner: Mutex<RefCell<T>>,
}

impl<T> CriticalSectionCell<T> {
    /// Wrap `value` (const, usable in a `static`)
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }

    /// Run `f` with exclusive access
    ///
    /// # Panics
    /// When called from inside another `with` on the same cell.
    #[inline]
    pub fn with<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }

    /// Like [`with`](Self::with), but `None` instead of a panic when the
    /// cell is already borrowed
    #[inline]
    pub fn try_with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        critical_section::with(|cs| {
            self.inner
                .borrow(cs)
                .try_borrow_mut()
                .ok()
                .map(|mut value| f(&mut value))
        })
    }
}

// SAFETY: every access to the inner value happens inside a critical section.
unsafe impl<T> Sync for CriticalSectionCell<T> {}

/// Single waker slot filled by a future and emptied by the interrupt
#[cfg(feature = "async")]
pub struct AtomicWaker {
    waker: CriticalSectionCell<Option<Waker>>,
}

#[cfg(feature = "async")]
impl AtomicWaker {
    /// Empty slot (const, usable in a `static`)
    pub const fn new() -> Self {
        Self {
            waker: CriticalSectionCell::new(None),
        }
    }

    /// Store `waker`, replacing any waker that would not wake the same task
    pub fn register(&self, waker: &Waker) {
        self.waker.with(|slot| match slot {
            Some(stored) if stored.will_wake(waker) => {}
            _ => *slot = Some(waker.clone()),
        });
    }

    /// Wake and forget the stored waker
    ///
    /// Returns whether a task was woken.
    #[inline]
    pub fn wake(&self) -> bool {
        // Woken outside the critical section
        match self.waker.with(Option::take) {
            Some(waker) => {
                waker.wake();
                true
            }
            None => false,
        }
    }
}

#[cfg(feature = "async")]
impl Default for AtomicWaker {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: the waker slot is only touched through CriticalSectionCell.
#[cfg(feature = "async")]
unsafe impl Send for AtomicWaker {}
// SAFETY: the waker slot is only touched through CriticalSectionCell.
#[cfg(feature = "async")]
unsafe impl Sync for AtomicWaker {}

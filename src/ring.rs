//! Descriptor ring storage and bookkeeping
//!
//! List-mode channels chain hardware descriptors through a fixed array of
//! [`RingSlot`]s supplied by the caller. Each slot holds the hardware image
//! followed by a copy of the [`TransferDescriptor`] that produced it, so a
//! completion can be reported without a raw back-pointer into caller memory.
//!
//! One slot is always kept free: a ring of `N` slots holds at most `N - 1`
//! elements, which keeps `head == tail` equivalent to "empty".
//!
//! # Ownership
//!
//! Task context writes `tail` and `last`; interrupt context writes `head`
//! and `active`. Every element image is completely written before any other
//! element is linked to it.

use crate::backend::{Backend, DescriptorImage};
use crate::error::{ConfigError, ConfigResult, Result, RingError};
use crate::transfer::TransferDescriptor;

/// Smallest usable ring: one element plus the always-free slot
pub const MIN_RING_SLOTS: usize = 2;

// =============================================================================
// Ring Index
// =============================================================================

/// Position in a descriptor ring
///
/// Wrap-around is checked against the ring length on every step; an index
/// outside the ring is a corrupted ring and panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RingIndex(usize);

impl RingIndex {
    /// First slot
    pub const ZERO: Self = Self(0);

    /// Slot number
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }

    /// Following slot, wrapping to zero
    #[must_use]
    pub fn next(self, len: usize) -> Self {
        assert!(self.0 < len, "ring index {} outside ring of {}", self.0, len);
        if self.0 + 1 == len { Self(0) } else { Self(self.0 + 1) }
    }

    /// Preceding slot, wrapping to the end
    #[must_use]
    pub fn prev(self, len: usize) -> Self {
        assert!(self.0 < len, "ring index {} outside ring of {}", self.0, len);
        if self.0 == 0 { Self(len - 1) } else { Self(self.0 - 1) }
    }
}

// =============================================================================
// Ring Slot
// =============================================================================

/// One element of ring storage
///
/// The image comes first and the slot is 8-byte aligned, so the slot address
/// is the descriptor address the controller is given.
#[derive(Debug)]
#[repr(C, align(8))]
pub struct RingSlot<D> {
    image: D,
    transfer: Option<TransferDescriptor>,
}

impl<D: DescriptorImage> RingSlot<D> {
    /// Empty slot, usable in `static` and array initializers:
    ///
    /// ```ignore
    /// static mut SLOTS: [RingSlot<MdcDescriptor>; 8] = [const { RingSlot::new() }; 8];
    /// ```
    #[must_use]
    pub const fn new() -> Self {
        Self {
            image: D::EMPTY,
            transfer: None,
        }
    }

    /// Hardware image
    pub fn image(&self) -> &D {
        &self.image
    }

    /// Transfer currently occupying the slot
    pub fn transfer(&self) -> Option<&TransferDescriptor> {
        self.transfer.as_ref()
    }
}

impl<D: DescriptorImage> Default for RingSlot<D> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// List Status
// =============================================================================

/// Snapshot of ring bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ListStatus {
    /// Oldest element not yet retired
    pub head: usize,
    /// Next free slot
    pub tail: usize,
    /// Most recently appended element
    pub last: usize,
    /// Element the hardware is working on
    pub active: usize,
    /// Elements in the ring
    pub in_use: usize,
    /// Maximum number of elements
    pub capacity: usize,
    /// Elements required before the list may start
    pub start_threshold: usize,
    /// The list has no terminator
    pub circular: bool,
}

/// Outcome of a successful append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Appended {
    /// Slot the new element went into
    pub slot: RingIndex,
    /// Consumed circular elements freed by terminating the list
    pub released: usize,
}

/// Outcome of retiring the active element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Retired {
    /// Transfer the element carried
    pub transfer: TransferDescriptor,
    /// The hardware has moved onto the terminal element
    pub reached_last: bool,
    /// A terminated list has no elements left
    pub drained: bool,
}

// =============================================================================
// Descriptor Ring
// =============================================================================

/// Circular list of hardware descriptors in caller storage
pub(crate) struct DescriptorRing<'a, D> {
    slots: &'a mut [RingSlot<D>],
    head: RingIndex,
    tail: RingIndex,
    last: RingIndex,
    active: RingIndex,
    in_use: usize,
    start_threshold: usize,
    circular: bool,
}

impl<'a, D: DescriptorImage> DescriptorRing<'a, D> {
    /// Take over `slots`, clearing every element
    pub(crate) fn new(slots: &'a mut [RingSlot<D>], start_threshold: usize) -> ConfigResult<Self> {
        if slots.len() < MIN_RING_SLOTS || start_threshold > slots.len() - 1 {
            return Err(ConfigError::InvalidParameters);
        }

        let mut ring = Self {
            slots,
            head: RingIndex::ZERO,
            tail: RingIndex::ZERO,
            last: RingIndex::ZERO,
            active: RingIndex::ZERO,
            in_use: 0,
            start_threshold,
            circular: false,
        };
        ring.clear();
        Ok(ring)
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.len() - 1
    }

    pub(crate) fn in_use(&self) -> usize {
        self.in_use
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.in_use == 0
    }

    pub(crate) fn is_full(&self) -> bool {
        self.in_use >= self.capacity()
    }

    /// An empty list never meets the threshold, even when it is zero
    pub(crate) fn threshold_met(&self) -> bool {
        self.in_use >= self.start_threshold.max(1)
    }

    pub(crate) fn is_circular(&self) -> bool {
        self.circular
    }

    /// Hardware is on the terminal element or the one before it
    ///
    /// Appending now could race the controller committing to the end of a
    /// terminated list.
    pub(crate) fn near_end(&self) -> bool {
        if self.circular {
            return false;
        }
        let penultimate = self.last.prev(self.len());
        self.active == self.last || self.active == penultimate
    }

    /// Write `transfer` into the free slot and link it in
    ///
    /// The new image is written in full before the previous last element is
    /// pointed at it. A terminated element ends the list; any other element
    /// links back to `head`, making the list circular. Terminating a circular
    /// list frees the elements the hardware has already run through. On error
    /// the ring is unchanged.
    pub(crate) fn append<B>(&mut self, backend: &B, transfer: &TransferDescriptor, terminate: bool) -> Result<Appended>
    where
        B: Backend<Descriptor = D>,
    {
        if self.is_full() {
            return Err(RingError::StorageFull.into());
        }

        let was_empty = self.is_empty();
        let was_circular = self.circular;
        let slot = self.tail;
        let previous = self.last;
        let next = if terminate {
            None
        } else {
            Some(&self.slots[self.head.get()].image)
        };
        backend.program_descriptor(&self.slots[slot.get()].image, was_empty, Some(transfer), next)?;

        self.slots[slot.get()].transfer = Some(*transfer);
        self.last = slot;
        self.tail = slot.next(self.len());
        self.circular = !terminate;
        self.in_use += 1;

        if !was_empty {
            let first = self.head == previous;
            backend.program_descriptor(
                &self.slots[previous.get()].image,
                first,
                None,
                Some(&self.slots[slot.get()].image),
            )?;
        }

        let released = if was_circular && terminate {
            self.release_consumed()
        } else {
            0
        };

        Ok(Appended { slot, released })
    }

    /// Free every element between `head` and `active`
    ///
    /// These completed while the list was circular and were reported then, so
    /// only their slots are given back.
    fn release_consumed(&mut self) -> usize {
        let len = self.len();
        let mut released = 0;
        while self.head != self.active {
            assert!(self.in_use > 1, "active element {} outside the list", self.active.get());
            self.slots[self.head.get()].transfer = None;
            self.head = self.head.next(len);
            self.in_use -= 1;
            released += 1;
        }
        released
    }

    /// Rewind `active` to `head` and return the image the hardware starts at
    pub(crate) fn restart(&mut self) -> &D {
        self.active = self.head;
        &self.slots[self.head.get()].image
    }

    /// Transfer carried by the active element
    pub(crate) fn active_transfer(&self) -> Option<TransferDescriptor> {
        self.slots[self.active.get()].transfer
    }

    /// Retire the element the hardware just finished
    ///
    /// `finishing` is set when the finished element is the terminal one; the
    /// active index then stays put. Circular lists keep their elements.
    pub(crate) fn retire(&mut self, finishing: bool) -> Retired {
        let len = self.len();
        let slot = &mut self.slots[self.active.get()];
        let transfer = if self.circular {
            slot.transfer
        } else {
            slot.transfer.take()
        };
        let Some(transfer) = transfer else {
            panic!("completion for empty ring slot {}", self.active.get());
        };

        let mut reached_last = false;
        if !finishing {
            // Hardware follows the link after `last` back to `head`
            self.active = if self.active == self.last {
                self.head
            } else {
                self.active.next(len)
            };
            reached_last = !self.circular && self.active == self.last;
        }

        if !self.circular {
            assert!(self.in_use > 0, "ring retired with no elements in use");
            self.in_use -= 1;
            if self.in_use == 0 {
                self.head = RingIndex::ZERO;
                self.tail = RingIndex::ZERO;
                self.last = RingIndex::ZERO;
                self.active = RingIndex::ZERO;
            } else {
                self.head = self.head.next(len);
            }
        }

        Retired {
            transfer,
            reached_last,
            drained: !self.circular && self.in_use == 0,
        }
    }

    /// Remove every outstanding element, oldest first, then reset the ring
    pub(crate) fn drain<F>(&mut self, mut f: F)
    where
        F: FnMut(TransferDescriptor),
    {
        let len = self.len();
        let mut index = self.head;
        for _ in 0..self.in_use {
            if let Some(transfer) = self.slots[index.get()].transfer.take() {
                f(transfer);
            }
            index = index.next(len);
        }
        self.clear();
    }

    /// Forget every element and zero the images
    pub(crate) fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.image.clear();
            slot.transfer = None;
        }
        self.head = RingIndex::ZERO;
        self.tail = RingIndex::ZERO;
        self.last = RingIndex::ZERO;
        self.active = RingIndex::ZERO;
        self.in_use = 0;
        self.circular = false;
    }

    pub(crate) fn status(&self) -> ListStatus {
        ListStatus {
            head: self.head.get(),
            tail: self.tail.get(),
            last: self.last.get(),
            active: self.active.get(),
            in_use: self.in_use,
            capacity: self.capacity(),
            start_threshold: self.start_threshold,
            circular: self.circular,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

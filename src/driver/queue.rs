//! Queued I/O for channels not in bypass mode
//!
//! Submissions reserve a control block from a fixed pool, wait in a pending
//! queue until the channel can take them, and come back through a mailbox
//! once retired. A block returns to the pool when its completion is drained
//! from the mailbox.

use heapless::Deque;

use super::callbacks::CompletionStatus;
use crate::error::{WaitError, WaitResult};
use crate::transfer::TransferDescriptor;

/// A retired transfer as returned by the wait call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Completion {
    /// Copy of the submitted descriptor
    pub transfer: TransferDescriptor,
    /// How it was retired
    pub status: CompletionStatus,
}

impl Completion {
    /// The transfer if it finished normally, `Cancelled` otherwise
    pub fn ok(self) -> WaitResult<TransferDescriptor> {
        match self.status {
            CompletionStatus::Normal => Ok(self.transfer),
            CompletionStatus::Cancelled => Err(WaitError::Cancelled),
        }
    }
}

/// Control-block pool, pending queue and completion mailbox
pub(crate) struct QueuedIo<const Q: usize> {
    pending: Deque<TransferDescriptor, Q>,
    mailbox: Deque<Completion, Q>,
    reserved: usize,
    pool_size: usize,
}

impl<const Q: usize> QueuedIo<Q> {
    pub(crate) const fn new() -> Self {
        Self {
            pending: Deque::new(),
            mailbox: Deque::new(),
            reserved: 0,
            pool_size: 0,
        }
    }

    /// Size the pool; `pool_size` is at most `Q`
    pub(crate) fn configure(&mut self, pool_size: usize) {
        self.clear();
        self.pool_size = pool_size.min(Q);
    }

    pub(crate) fn available(&self) -> usize {
        self.pool_size - self.reserved
    }

    /// Take one control block
    ///
    /// An exhausted pool fails with `Timeout` instead of blocking.
    pub(crate) fn reserve(&mut self) -> WaitResult<()> {
        if self.reserved >= self.pool_size {
            return Err(WaitError::Timeout);
        }
        self.reserved += 1;
        Ok(())
    }

    /// Give back a block whose submission did not go through
    pub(crate) fn release(&mut self) {
        assert!(self.reserved > 0, "control block released twice");
        self.reserved -= 1;
    }

    /// Reserve a block and queue `transfer` behind earlier submissions
    pub(crate) fn submit(&mut self, transfer: TransferDescriptor) -> WaitResult<()> {
        self.reserve()?;
        if self.pending.push_back(transfer).is_err() {
            self.release();
            return Err(WaitError::Timeout);
        }
        Ok(())
    }

    pub(crate) fn next_pending(&mut self) -> Option<TransferDescriptor> {
        self.pending.pop_front()
    }

    pub(crate) fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Hand a retired transfer's block to the mailbox
    pub(crate) fn post(&mut self, completion: Completion) {
        // Each posted completion carries a reserved block, and the pool never
        // exceeds the mailbox depth
        if self.mailbox.push_back(completion).is_err() {
            panic!("completion mailbox overflow");
        }
    }

    /// Drain the oldest completion, returning its block to the pool
    pub(crate) fn take(&mut self) -> Option<Completion> {
        let completion = self.mailbox.pop_front()?;
        self.release();
        Some(completion)
    }

    pub(crate) fn completions(&self) -> usize {
        self.mailbox.len()
    }

    /// Drop everything and refill the pool
    pub(crate) fn clear(&mut self) {
        self.pending.clear();
        self.mailbox.clear();
        self.reserved = 0;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

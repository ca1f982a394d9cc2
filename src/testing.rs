//! Testing utilities and mock implementations
//!
//! Mock register blocks, callbacks and delays for exercising the channel
//! engine on the host without hardware access.
//!
//! Only available when running `cargo test`.

// Note: The #[cfg(test)] attribute is applied in lib.rs where this module is declared
#![allow(missing_docs)]
#![allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]

extern crate std;

use std::boxed::Box;
use std::vec::Vec;

use crate::driver::callbacks::{ChannelCallbacks, CompletionStatus};
use crate::internal::register::mdc::{CMDS_INT_ACTIVE, CMDS_PROCESSED_OFFSET};
use crate::internal::register::sysbus::{ISTAT_FIN, ISTAT_OFFSET};
use crate::internal::volatile::VolatileCell;
use crate::transfer::TransferDescriptor;

/// Memory side of the transfers built by [`transfer`]
pub const TEST_MEMORY: usize = 0x2000_0000;

/// Peripheral side of the transfers built by [`transfer`]
pub const TEST_PERIPHERAL: usize = 0x0200_0010;

/// A valid 64-byte memory-to-peripheral transfer for either controller,
/// tagged with `tag`
pub fn transfer(tag: usize) -> TransferDescriptor {
    TransferDescriptor::memory_to_peripheral(TEST_MEMORY + tag * 0x100, TEST_PERIPHERAL, 4, 64)
        .with_user_tag(tag)
}

// =============================================================================
// Mock Register Block
// =============================================================================

/// Heap-allocated stand-in for a channel register block
///
/// The block's address is used as the channel base, so backends read and
/// write it exactly as they would the real registers.
///
/// # Example
///
/// ```ignore
/// let regs = MockRegisters::new();
/// let dma = unsafe { SysBus::bind(ChannelBinding::new(0, regs.base())) };
/// ```
pub struct MockRegisters {
    words: Box<[VolatileCell<u32>; 16]>,
}

impl MockRegisters {
    /// Zeroed register block
    pub fn new() -> Self {
        Self {
            words: Box::new([const { VolatileCell::new(0) }; 16]),
        }
    }

    /// Address to bind a backend to
    pub fn base(&self) -> usize {
        self.words.as_ptr() as usize
    }

    /// Read the register at byte `offset`
    pub fn read(&self, offset: usize) -> u32 {
        self.words[offset / 4].get()
    }

    /// Write the register at byte `offset`
    pub fn write(&self, offset: usize, value: u32) {
        self.words[offset / 4].set(value);
    }

    /// The first eight registers
    pub fn snapshot(&self) -> [u32; 8] {
        core::array::from_fn(|i| self.words[i].get())
    }

    /// Raise the system-bus "transfer finished" interrupt
    pub fn fire_sysbus_completion(&self) {
        self.write(ISTAT_OFFSET, self.read(ISTAT_OFFSET) | ISTAT_FIN);
    }

    /// Raise the MDC command interrupt
    pub fn fire_mdc_completion(&self) {
        self.write(
            CMDS_PROCESSED_OFFSET,
            self.read(CMDS_PROCESSED_OFFSET) | CMDS_INT_ACTIVE,
        );
    }
}

impl Default for MockRegisters {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Recording Callbacks
// =============================================================================

/// Callback set that records every invocation
#[derive(Debug, Default)]
pub struct RecordingCallbacks {
    /// `(user_tag, status)` per completion, in order
    pub completions: Vec<(usize, CompletionStatus)>,
    pub inits: usize,
    pub starts: usize,
    pub cancels: usize,
}

impl RecordingCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags of completions with `status`, in order
    pub fn tags(&self, status: CompletionStatus) -> Vec<usize> {
        self.completions
            .iter()
            .filter(|(_, s)| *s == status)
            .map(|(tag, _)| *tag)
            .collect()
    }
}

impl ChannelCallbacks for RecordingCallbacks {
    fn completion(&mut self, transfer: &TransferDescriptor, status: CompletionStatus) {
        self.completions.push((transfer.user_tag, status));
    }

    fn init_device(&mut self) {
        self.inits += 1;
    }

    fn start_device(&mut self) {
        self.starts += 1;
    }

    fn cancel_device(&mut self) {
        self.cancels += 1;
    }
}

// =============================================================================
// Mock Delay
// =============================================================================

/// Mock delay for testing without actual timing
///
/// Records delays for verification without actually waiting.
#[derive(Debug, Default)]
pub struct MockDelay {
    total_ns: u64,
}

impl MockDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total nanoseconds that were "delayed"
    pub fn total_ns(&self) -> u64 {
        self.total_ns
    }
}

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::delay::DelayNs;

    #[test]
    fn mock_registers_are_word_addressed() {
        let regs = MockRegisters::new();
        regs.write(0x1C, 0xDEAD_BEEF);
        assert_eq!(regs.read(0x1C), 0xDEAD_BEEF);
        assert_eq!(regs.snapshot()[7], 0xDEAD_BEEF);
        assert_eq!(regs.base() % 4, 0);
    }

    #[test]
    fn mock_delay_accumulates() {
        let mut delay = MockDelay::new();
        delay.delay_us(3);
        delay.delay_ns(500);
        assert_eq!(delay.total_ns(), 3_500);
    }
}

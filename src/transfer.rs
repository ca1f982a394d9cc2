//! Transfer descriptors
//!
//! A [`TransferDescriptor`] describes one movement of `size` bytes between a
//! read address and a write address. Exactly one side auto-increments; the
//! side that does not increment is the peripheral.
//!
//! The engine keeps a copy of every submitted descriptor, but the memory the
//! addresses point at belongs to the caller and must stay valid until the
//! transfer completes or is cancelled.

/// Direction of a transfer relative to the peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Read side increments (memory), write side is the peripheral
    MemoryToPeripheral,
    /// Write side increments (memory), read side is the peripheral
    PeripheralToMemory,
}

/// One DMA transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferDescriptor {
    /// Source address
    pub read_addr: usize,
    /// Increment the source address after each access
    pub inc_read: bool,
    /// Source access width in bytes
    pub read_width: u8,
    /// Destination address
    pub write_addr: usize,
    /// Increment the destination address after each access
    pub inc_write: bool,
    /// Destination access width in bytes
    pub write_width: u8,
    /// Transfer length in bytes
    pub size: u32,
    /// Burst size in bytes
    pub burst_size: u32,
    /// Transfer priority (0..=255, high half selects the high-priority lane)
    pub priority: u8,
    /// Reverse byte order of each word
    pub byte_swap: bool,
    /// Wait for unpacking before issuing the next write (MDC only)
    pub wait_unpack: bool,
    /// Hold-off between bursts (MDC only, 0..=15)
    pub hold_off: u8,
    /// Opaque caller value returned with the completion
    pub user_tag: usize,
}

impl TransferDescriptor {
    /// Create an empty descriptor
    #[must_use]
    pub const fn new() -> Self {
        Self {
            read_addr: 0,
            inc_read: false,
            read_width: 0,
            write_addr: 0,
            inc_write: false,
            write_width: 0,
            size: 0,
            burst_size: 0,
            priority: 0,
            byte_swap: false,
            wait_unpack: false,
            hold_off: 0,
            user_tag: 0,
        }
    }

    /// Memory buffer to peripheral register transfer
    ///
    /// The memory side increments; both sides use `width`.
    #[must_use]
    pub const fn memory_to_peripheral(memory: usize, peripheral: usize, width: u8, size: u32) -> Self {
        let mut t = Self::new();
        t.read_addr = memory;
        t.inc_read = true;
        t.read_width = width;
        t.write_addr = peripheral;
        t.write_width = width;
        t.size = size;
        t.burst_size = width as u32;
        t
    }

    /// Peripheral register to memory buffer transfer
    ///
    /// The memory side increments; both sides use `width`.
    #[must_use]
    pub const fn peripheral_to_memory(peripheral: usize, memory: usize, width: u8, size: u32) -> Self {
        let mut t = Self::new();
        t.read_addr = peripheral;
        t.read_width = width;
        t.write_addr = memory;
        t.inc_write = true;
        t.write_width = width;
        t.size = size;
        t.burst_size = width as u32;
        t
    }

    /// Set the source and destination widths
    #[must_use]
    pub const fn with_widths(mut self, read: u8, write: u8) -> Self {
        self.read_width = read;
        self.write_width = write;
        self
    }

    /// Set the burst size in bytes
    #[must_use]
    pub const fn with_burst_size(mut self, bytes: u32) -> Self {
        self.burst_size = bytes;
        self
    }

    /// Set the priority
    #[must_use]
    pub const fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Enable or disable byte swapping
    #[must_use]
    pub const fn with_byte_swap(mut self, enabled: bool) -> Self {
        self.byte_swap = enabled;
        self
    }

    /// Enable or disable wait-for-unpack
    #[must_use]
    pub const fn with_wait_unpack(mut self, enabled: bool) -> Self {
        self.wait_unpack = enabled;
        self
    }

    /// Set the hold-off between bursts
    #[must_use]
    pub const fn with_hold_off(mut self, hold_off: u8) -> Self {
        self.hold_off = hold_off;
        self
    }

    /// Attach an opaque caller value
    #[must_use]
    pub const fn with_user_tag(mut self, tag: usize) -> Self {
        self.user_tag = tag;
        self
    }

    /// Transfer direction, or `None` unless exactly one side increments
    #[must_use]
    pub const fn direction(&self) -> Option<Direction> {
        match (self.inc_read, self.inc_write) {
            (true, false) => Some(Direction::MemoryToPeripheral),
            (false, true) => Some(Direction::PeripheralToMemory),
            _ => None,
        }
    }

    /// Peripheral and memory addresses, in that order
    #[must_use]
    pub const fn split_addresses(&self, direction: Direction) -> (usize, usize) {
        match direction {
            Direction::MemoryToPeripheral => (self.write_addr, self.read_addr),
            Direction::PeripheralToMemory => (self.read_addr, self.write_addr),
        }
    }

    /// Access width of the peripheral side in bytes
    #[must_use]
    pub const fn peripheral_width(&self, direction: Direction) -> u8 {
        match direction {
            Direction::MemoryToPeripheral => self.write_width,
            Direction::PeripheralToMemory => self.read_width,
        }
    }

    /// Checks shared by both controllers: non-null addresses, non-zero
    /// widths, size and burst
    pub(crate) const fn has_required_fields(&self) -> bool {
        self.read_addr != 0
            && self.write_addr != 0
            && self.read_width != 0
            && self.write_width != 0
            && self.size != 0
            && self.burst_size != 0
    }
}

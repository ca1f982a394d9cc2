//! Memory-mapped register access for the DMA controllers
//!
//! Both controllers expose one register block per channel. The block base is
//! supplied when the channel is defined; offsets and bit fields live in the
//! [`sysbus`] and [`mdc`] submodules.

pub(crate) mod mdc;
pub(crate) mod sysbus;

/// Read a 32-bit register at the given address
///
/// # Safety
/// The caller must ensure the address is valid and properly aligned.
#[inline(always)]
pub unsafe fn read_reg(addr: usize) -> u32 {
    unsafe { core::ptr::read_volatile(addr as *const u32) }
}

/// Write a 32-bit value to a register at the given address
///
/// # Safety
/// The caller must ensure the address is valid and properly aligned.
#[inline(always)]
pub unsafe fn write_reg(addr: usize, value: u32) {
    unsafe { core::ptr::write_volatile(addr as *mut u32, value) }
}

/// Modify a register using a read-modify-write operation
///
/// # Safety
/// The caller must ensure the address is valid and properly aligned.
#[inline(always)]
pub unsafe fn modify_reg<F>(addr: usize, f: F)
where
    F: FnOnce(u32) -> u32,
{
    // SAFETY: caller guarantees address validity
    let value = unsafe { read_reg(addr) };
    unsafe { write_reg(addr, f(value)) }
}

// =============================================================================
// Register Block
// =============================================================================

/// One channel's register block
///
/// Constructed from a base address that was validated when the channel was
/// defined. All accessors are volatile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RegisterBlock {
    base: usize,
}

impl RegisterBlock {
    /// Bind to a register block
    ///
    /// # Safety
    /// `base` must be the 4-byte aligned address of a register block that
    /// stays mapped for as long as the returned value is used.
    pub(crate) const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    #[inline(always)]
    pub(crate) fn read(&self, offset: usize) -> u32 {
        // SAFETY: base validity is established by `RegisterBlock::new`
        unsafe { read_reg(self.base + offset) }
    }

    #[inline(always)]
    pub(crate) fn write(&self, offset: usize, value: u32) {
        // SAFETY: base validity is established by `RegisterBlock::new`
        unsafe { write_reg(self.base + offset, value) }
    }

    #[inline(always)]
    pub(crate) fn modify<F>(&self, offset: usize, f: F)
    where
        F: FnOnce(u32) -> u32,
    {
        // SAFETY: base validity is established by `RegisterBlock::new`
        unsafe { modify_reg(self.base + offset, f) }
    }

    /// Set bits (read-modify-write)
    #[inline(always)]
    pub(crate) fn set_bits(&self, offset: usize, bits: u32) {
        self.modify(offset, |v| v | bits);
    }

    /// Clear bits (read-modify-write)
    #[inline(always)]
    pub(crate) fn clear_bits(&self, offset: usize, bits: u32) {
        self.modify(offset, |v| v & !bits);
    }
}

// =============================================================================
// Field helpers
// =============================================================================

/// Place `value` into the field `mask` starting at `shift`
#[inline(always)]
pub(crate) const fn field(value: u32, shift: u32, mask: u32) -> u32 {
    (value << shift) & mask
}

//! System-bus DMA controller register definitions
//!
//! One register block per channel. Transfer lengths are counted in units of
//! the peripheral width and burst sizes in 4-byte units.

// =============================================================================
// Register Offsets
// =============================================================================

/// Memory start address (or first list element address in list mode)
pub const SETUP_OFFSET: usize = 0x00;
/// Count and control register offset
pub const COUNT_OFFSET: usize = 0x04;
/// Peripheral control register offset (burst size, increment)
pub const PERADDR_OFFSET: usize = 0x08;
/// Interrupt status register offset
pub const ISTAT_OFFSET: usize = 0x0C;
/// 2D mode register offset
pub const MODE_2D_OFFSET: usize = 0x10;
/// Peripheral address register offset
pub const PERADDR2_OFFSET: usize = 0x14;

// =============================================================================
// Count Register (COUNT) Bits
// =============================================================================

/// Interrupt on list element completion
pub const COUNT_LIST_IEN: u32 = 1 << 31;
/// Byte swap
pub const COUNT_BSWAP: u32 = 1 << 30;
/// Interrupt on transfer completion
pub const COUNT_IEN: u32 = 1 << 29;
/// Peripheral width shift
pub const COUNT_PW_SHIFT: u32 = 27;
/// Peripheral width mask
pub const COUNT_PW_MASK: u32 = 0x3 << 27;
/// Direction: set for peripheral to memory
pub const COUNT_DIR: u32 = 1 << 26;
/// Soft reset
pub const COUNT_SRST: u32 = 1 << 19;
/// List mode enable
pub const COUNT_LIST_EN: u32 = 1 << 18;
/// Channel enable
pub const COUNT_EN: u32 = 1 << 16;
/// Transfer count mask (peripheral width units)
pub const COUNT_CNT_MASK: u32 = 0xFFFF;

// =============================================================================
// Peripheral Control Register (PERADDR) Bits
// =============================================================================

/// Burst size shift (4-byte units)
pub const PERADDR_BURST_SHIFT: u32 = 24;
/// Burst size mask
pub const PERADDR_BURST_MASK: u32 = 0x7 << 24;
/// Largest burst size value the field holds
pub const PERADDR_BURST_MAX: u32 = 0x7;

// =============================================================================
// Interrupt Status Register (ISTAT) Bits
// =============================================================================

/// List finished
pub const ISTAT_LIST_FIN: u32 = 1 << 21;
/// List element interrupt
pub const ISTAT_LIST_INT: u32 = 1 << 20;
/// Transfer (or list element) finished
pub const ISTAT_FIN: u32 = 1 << 17;
/// All defined status bits
pub const ISTAT_VALID_MASK: u32 = ISTAT_LIST_FIN | ISTAT_LIST_INT | ISTAT_FIN;

// =============================================================================
// List Descriptor Words
// =============================================================================

/// Word 0: byte swap
pub const LL_W0_BSWAP: u32 = 1 << 31;
/// Word 0: direction, set for peripheral to memory
pub const LL_W0_DIR: u32 = 1 << 30;
/// Word 0: peripheral width shift
pub const LL_W0_PW_SHIFT: u32 = 28;
/// Word 0: peripheral width mask
pub const LL_W0_PW_MASK: u32 = 0x3 << 28;
/// Word 1: last element of the list
pub const LL_W1_LIST_FIN: u32 = 1 << 31;
/// Word 1: length mask (peripheral width units)
pub const LL_W1_LEN_MASK: u32 = 0xFFFF;
/// Word 3: burst size shift (4-byte units)
pub const LL_W3_BURST_SHIFT: u32 = 26;
/// Word 3: burst size mask
pub const LL_W3_BURST_MASK: u32 = 0x7 << 26;

/// Encode a peripheral width in bytes as the hardware value
#[must_use]
pub const fn peripheral_width_code(bytes: u8) -> Option<u32> {
    match bytes {
        1 => Some(2),
        2 => Some(1),
        4 => Some(0),
        _ => None,
    }
}

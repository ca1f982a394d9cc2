//! Multi-channel DMA controller (MDC) register definitions
//!
//! Each channel has eight consecutive registers. A list element in memory is
//! an image of the same eight words, which the controller loads into the
//! channel registers when it follows a list link.

// =============================================================================
// Register Offsets
// =============================================================================

/// General configuration
pub const GENERAL_CONFIG_OFFSET: usize = 0x00;
/// Read port configuration
pub const READ_PORT_CONFIG_OFFSET: usize = 0x04;
/// Read (source) address
pub const READ_ADDRESS_OFFSET: usize = 0x08;
/// Write (destination) address
pub const WRITE_ADDRESS_OFFSET: usize = 0x0C;
/// Transfer size, in bytes minus one
pub const TRANSFER_SIZE_OFFSET: usize = 0x10;
/// Next list node address, 0 terminates
pub const LIST_NODE_ADDRESS_OFFSET: usize = 0x14;
/// Commands processed counter
pub const CMDS_PROCESSED_OFFSET: usize = 0x18;
/// Control and status
pub const CONTROL_AND_STATUS_OFFSET: usize = 0x1C;

// =============================================================================
// General Configuration Bits
// =============================================================================

/// Interrupt on list element completion
pub const GEN_LIST_IEN: u32 = 1 << 31;
/// Byte swap
pub const GEN_BSWAP: u32 = 1 << 30;
/// Interrupt on transfer completion
pub const GEN_IEN: u32 = 1 << 29;
/// Level (rather than edge) interrupt
pub const GEN_LEVEL_INT: u32 = 1 << 28;
/// Channel group shift
pub const GEN_CHANNEL_SHIFT: u32 = 20;
/// Channel group mask
pub const GEN_CHANNEL_MASK: u32 = 0x3F << 20;
/// Largest channel group value the field holds
pub const GEN_CHANNEL_MAX: u8 = 0x3F;
/// Wait for unpack
pub const GEN_WAIT_UNPACK: u32 = 1 << 13;
/// Increment write address
pub const GEN_INC_W: u32 = 1 << 12;
/// Increment read address
pub const GEN_INC_R: u32 = 1 << 8;
/// Write address is physical
pub const GEN_PHYSICAL_W: u32 = 1 << 7;
/// Write width shift
pub const GEN_WIDTH_W_SHIFT: u32 = 4;
/// Write width mask
pub const GEN_WIDTH_W_MASK: u32 = 0x7 << 4;
/// Read address is physical
pub const GEN_PHYSICAL_R: u32 = 1 << 3;
/// Read width mask
pub const GEN_WIDTH_R_MASK: u32 = 0x7;

// =============================================================================
// Read Port Configuration Bits
// =============================================================================

/// High priority lane
pub const READ_PORT_PRIORITY: u32 = 1 << 20;
/// Hold-off shift
pub const READ_PORT_HOLD_OFF_SHIFT: u32 = 12;
/// Hold-off mask
pub const READ_PORT_HOLD_OFF_MASK: u32 = 0xF << 12;
/// Burst size (bytes minus one) shift
pub const READ_PORT_BURST_SIZE_SHIFT: u32 = 4;
/// Burst size mask
pub const READ_PORT_BURST_SIZE_MASK: u32 = 0xFF << 4;
/// Peripheral DREQ enable
pub const READ_PORT_DREQ_ENABLE: u32 = 1 << 1;

// =============================================================================
// Transfer Size
// =============================================================================

/// Transfer size mask
pub const TRANSFER_SIZE_CNT_MASK: u32 = 0x00FF_FFFF;

// =============================================================================
// Commands Processed Bits
// =============================================================================

/// Commands processed shift
pub const CMDS_PROCESSED_SHIFT: u32 = 16;
/// Commands processed mask
pub const CMDS_PROCESSED_MASK: u32 = 0x3F << 16;
/// Interrupt active
pub const CMDS_INT_ACTIVE: u32 = 1 << 8;

// =============================================================================
// Control and Status Bits
// =============================================================================

/// Cancel the current transfer
pub const CONTROL_CANCEL: u32 = 1 << 20;
/// List mode enable
pub const CONTROL_LIST_EN: u32 = 1 << 4;
/// Channel enable
pub const CONTROL_EN: u32 = 1 << 0;

/// Encode an access width in bytes as log2
///
/// Any power of two representable in a byte fits the 3-bit width fields.
#[must_use]
pub const fn width_code(bytes: u8) -> Option<u32> {
    if !bytes.is_power_of_two() {
        return None;
    }
    Some(bytes.trailing_zeros())
}

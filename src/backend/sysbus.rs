//! System-bus DMA controller backend
//!
//! Single-shot transfers are programmed straight into the channel registers.
//! List transfers use 8-word descriptors in memory, chained through word 7
//! and terminated by the `LIST_FIN` flag in word 1.
//!
//! Lengths are expressed in units of the peripheral width and burst sizes
//! in 4-byte units. The controller can pause an active transfer.

use super::{Backend, ChannelBinding, DescriptorImage, Sealed};
use crate::error::{ConfigError, ConfigResult, StateError, StateResult};
use crate::internal::register::sysbus::*;
use crate::internal::register::{RegisterBlock, field};
use crate::internal::volatile::VolatileCell;
use crate::transfer::{Direction, TransferDescriptor};

// =============================================================================
// List Descriptor
// =============================================================================

/// In-memory list element for the system-bus controller
///
/// | Word | Contents                                   |
/// |------|--------------------------------------------|
/// | 0    | byte swap, direction, peripheral width     |
/// | 1    | end-of-list flag, length in width units    |
/// | 2    | peripheral address                         |
/// | 3    | burst size (4-byte units)                  |
/// | 4-5  | 2D mode (unused)                           |
/// | 6    | memory address                             |
/// | 7    | next element address >> 2                  |
#[derive(Debug)]
#[repr(C)]
pub struct SysBusDescriptor {
    words: [VolatileCell<u32>; 8],
}

impl Sealed for SysBusDescriptor {}

impl DescriptorImage for SysBusDescriptor {
    const EMPTY: Self = Self {
        words: [const { VolatileCell::new(0) }; 8],
    };

    fn clear(&self) {
        for word in &self.words {
            word.set(0);
        }
    }

    fn words(&self) -> [u32; 8] {
        core::array::from_fn(|i| self.words[i].get())
    }
}

// =============================================================================
// Transfer checks
// =============================================================================

/// Derived values for a transfer that passed argument checks
#[derive(Debug, Clone, Copy)]
struct Checked {
    direction: Direction,
    width: u32,
    width_code: u32,
    peripheral: usize,
    memory: usize,
}

fn check(transfer: &TransferDescriptor) -> ConfigResult<Checked> {
    // The non-incrementing side is the peripheral
    let Some(direction) = transfer.direction() else {
        return Err(ConfigError::InvalidParameters);
    };
    if !transfer.has_required_fields() {
        return Err(ConfigError::InvalidParameters);
    }

    let width = transfer.peripheral_width(direction);
    let Some(width_code) = peripheral_width_code(width) else {
        return Err(ConfigError::InvalidParameters);
    };
    let width = u32::from(width);
    if transfer.size % width != 0 {
        return Err(ConfigError::InvalidParameters);
    }

    let (peripheral, memory) = transfer.split_addresses(direction);
    Ok(Checked {
        direction,
        width,
        width_code,
        peripheral,
        memory,
    })
}

fn burst_units(transfer: &TransferDescriptor) -> ConfigResult<u32> {
    let units = transfer.burst_size >> 2;
    if units > PERADDR_BURST_MAX {
        return Err(ConfigError::OutOfRange);
    }
    Ok(units)
}

// =============================================================================
// Backend
// =============================================================================

/// System-bus DMA controller channel
#[derive(Debug)]
pub struct SysBus {
    binding: ChannelBinding,
    regs: RegisterBlock,
}

impl Sealed for SysBus {}

impl Backend for SysBus {
    type Descriptor = SysBusDescriptor;

    const NAME: &'static str = "sysbus";

    unsafe fn bind(binding: ChannelBinding) -> Self {
        Self {
            binding,
            // SAFETY: the caller vouches for the binding's base address
            regs: unsafe { RegisterBlock::new(binding.base()) },
        }
    }

    fn binding(&self) -> &ChannelBinding {
        &self.binding
    }

    fn set_group(&mut self, _group: u8) -> ConfigResult<()> {
        Ok(())
    }

    fn reset(&mut self) {
        self.regs.write(COUNT_OFFSET, COUNT_SRST);
        self.regs.write(ISTAT_OFFSET, 0);
        self.regs.write(SETUP_OFFSET, 0);
        self.regs.write(PERADDR_OFFSET, 0);
        self.regs.write(PERADDR2_OFFSET, 0);
        self.regs.write(COUNT_OFFSET, 0);
        self.regs.write(MODE_2D_OFFSET, 0);
    }

    fn enable(&mut self, list_mode: bool) {
        let bit = if list_mode { COUNT_LIST_EN } else { COUNT_EN };
        self.regs.set_bits(COUNT_OFFSET, bit);
    }

    fn disable(&mut self, _transferring: bool) -> StateResult<()> {
        self.regs.clear_bits(COUNT_OFFSET, COUNT_LIST_EN);
        self.regs.clear_bits(COUNT_OFFSET, COUNT_EN);
        Ok(())
    }

    fn current_transfer_count(&self) -> u32 {
        self.regs.read(COUNT_OFFSET) & COUNT_CNT_MASK
    }

    fn interrupt_pending(&self) -> bool {
        self.regs.read(ISTAT_OFFSET) & ISTAT_FIN != 0
    }

    fn read_and_clear_interrupts(&mut self) -> StateResult<()> {
        let status = self.regs.read(ISTAT_OFFSET) & ISTAT_VALID_MASK;
        assert!(status != 0, "sysbus interrupt serviced with no cause set");
        assert!(
            status & ISTAT_LIST_INT == 0,
            "sysbus list element interrupt is never enabled"
        );

        // No clear register: the status bits are cleared in place, keeping
        // the read-to-write window as short as possible.
        self.regs.clear_bits(ISTAT_OFFSET, status);

        if status & ISTAT_FIN != 0 {
            Ok(())
        } else {
            Err(StateError::UnexpectedState)
        }
    }

    fn validate(&self, transfer: &TransferDescriptor) -> ConfigResult<()> {
        let checked = check(transfer)?;
        if transfer.size / checked.width >= COUNT_CNT_MASK {
            return Err(ConfigError::OutOfRange);
        }
        burst_units(transfer).map(|_| ())
    }

    fn program_descriptor(
        &self,
        image: &SysBusDescriptor,
        _first: bool,
        transfer: Option<&TransferDescriptor>,
        next: Option<&SysBusDescriptor>,
    ) -> ConfigResult<()> {
        if let Some(transfer) = transfer {
            let checked = check(transfer)?;

            let mut w0 = field(checked.width_code, LL_W0_PW_SHIFT, LL_W0_PW_MASK);
            if transfer.byte_swap {
                w0 |= LL_W0_BSWAP;
            }
            if checked.direction == Direction::PeripheralToMemory {
                w0 |= LL_W0_DIR;
            }

            if transfer.size < checked.width {
                return Err(ConfigError::OutOfRange);
            }
            let length = transfer.size / checked.width;
            if length > LL_W1_LEN_MASK {
                return Err(ConfigError::OutOfRange);
            }

            let w3 = field(burst_units(transfer)?, LL_W3_BURST_SHIFT, LL_W3_BURST_MASK);

            image.clear();
            image.words[0].set(w0);
            image.words[1].set(length);
            // Peripheral address is programmed as is
            image.words[2].set(checked.peripheral as u32);
            image.words[3].set(w3);
            image.words[6].set(self.binding.physical(checked.memory));
        }

        match next {
            None => {
                image.words[1].update(|w| w | LL_W1_LIST_FIN);
                image.words[7].set(0);
            }
            Some(next) => {
                // Pointer before flag: the controller may be reading this element
                image.words[7].set(self.binding.physical(next.address()) >> 2);
                image.words[1].update(|w| w & !LL_W1_LIST_FIN);
            }
        }

        Ok(())
    }

    fn prepare_single_shot(&mut self, transfer: &TransferDescriptor) -> ConfigResult<()> {
        let checked = check(transfer)?;

        let mut count = COUNT_IEN | field(checked.width_code, COUNT_PW_SHIFT, COUNT_PW_MASK);
        if transfer.byte_swap {
            count |= COUNT_BSWAP;
        }
        if checked.direction == Direction::PeripheralToMemory {
            count |= COUNT_DIR;
        }

        let units = transfer.size / checked.width;
        if units >= COUNT_CNT_MASK {
            return Err(ConfigError::OutOfRange);
        }
        count |= units;

        let peraddr = field(burst_units(transfer)?, PERADDR_BURST_SHIFT, PERADDR_BURST_MASK);

        self.regs.write(COUNT_OFFSET, count);
        self.regs.write(PERADDR_OFFSET, peraddr);
        self.regs.write(PERADDR2_OFFSET, checked.peripheral as u32);
        self.regs
            .write(SETUP_OFFSET, self.binding.physical(checked.memory));
        self.regs.write(MODE_2D_OFFSET, 0);

        Ok(())
    }

    fn prepare_list_start(&mut self, first: &SysBusDescriptor) {
        self.regs
            .write(SETUP_OFFSET, self.binding.physical(first.address()));
        self.regs.write(COUNT_OFFSET, COUNT_LIST_IEN | COUNT_IEN);
    }
}

// =============================================================================
// Tests
// =============================================================================

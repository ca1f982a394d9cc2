//! Multi-channel DMA controller (MDC) backend
//!
//! A list element is an image of the channel's eight registers; the
//! controller loads the next image into the registers whenever it follows a
//! `LIST_NODE_ADDRESS` link, and a zero link ends the list.
//!
//! Widths are log2 codes, bursts are raw byte counts and transfer sizes are
//! bytes minus one. The controller cannot pause a running transfer.

use super::{Backend, ChannelBinding, DescriptorImage, Sealed};
use crate::error::{ConfigError, ConfigResult, StateError, StateResult};
use crate::internal::register::mdc::*;
use crate::internal::register::{RegisterBlock, field};
use crate::internal::volatile::VolatileCell;
use crate::transfer::TransferDescriptor;

// =============================================================================
// List Descriptor
// =============================================================================

/// In-memory list element for the MDC, laid out exactly like the channel
/// register block
#[derive(Debug)]
#[repr(C)]
pub struct MdcDescriptor {
    gen_config: VolatileCell<u32>,
    read_port: VolatileCell<u32>,
    read_address: VolatileCell<u32>,
    write_address: VolatileCell<u32>,
    transfer_size: VolatileCell<u32>,
    list_node: VolatileCell<u32>,
    cmds_processed: VolatileCell<u32>,
    control: VolatileCell<u32>,
}

impl MdcDescriptor {
    fn load(&self) -> RegisterImage {
        RegisterImage {
            gen_config: self.gen_config.get(),
            read_port: self.read_port.get(),
            read_address: self.read_address.get(),
            write_address: self.write_address.get(),
            transfer_size: self.transfer_size.get(),
            list_node: self.list_node.get(),
            cmds_processed: self.cmds_processed.get(),
            control: self.control.get(),
        }
    }

    fn store(&self, image: &RegisterImage) {
        self.gen_config.set(image.gen_config);
        self.read_port.set(image.read_port);
        self.read_address.set(image.read_address);
        self.write_address.set(image.write_address);
        self.transfer_size.set(image.transfer_size);
        self.list_node.set(image.list_node);
        self.cmds_processed.set(image.cmds_processed);
        // Self-enable last
        self.control.set(image.control);
    }
}

impl Sealed for MdcDescriptor {}

impl DescriptorImage for MdcDescriptor {
    const EMPTY: Self = Self {
        gen_config: VolatileCell::new(0),
        read_port: VolatileCell::new(0),
        read_address: VolatileCell::new(0),
        write_address: VolatileCell::new(0),
        transfer_size: VolatileCell::new(0),
        list_node: VolatileCell::new(0),
        cmds_processed: VolatileCell::new(0),
        control: VolatileCell::new(0),
    };

    fn clear(&self) {
        self.store(&RegisterImage::default());
    }

    fn words(&self) -> [u32; 8] {
        self.load().to_words()
    }
}

/// Register values assembled in CPU memory before they are committed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RegisterImage {
    gen_config: u32,
    read_port: u32,
    read_address: u32,
    write_address: u32,
    transfer_size: u32,
    list_node: u32,
    cmds_processed: u32,
    control: u32,
}

impl RegisterImage {
    fn to_words(self) -> [u32; 8] {
        [
            self.gen_config,
            self.read_port,
            self.read_address,
            self.write_address,
            self.transfer_size,
            self.list_node,
            self.cmds_processed,
            self.control,
        ]
    }
}

fn check(transfer: &TransferDescriptor) -> ConfigResult<()> {
    if transfer.has_required_fields() {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameters)
    }
}

// =============================================================================
// Backend
// =============================================================================

/// MDC channel
#[derive(Debug)]
pub struct Mdc {
    binding: ChannelBinding,
    regs: RegisterBlock,
    group: u8,
}

impl Mdc {
    /// General configuration bits shared by transfers and bare relinks
    fn link_config(&self, gen_config: u32, list: bool, interrupt: bool) -> u32 {
        let mut value = gen_config;
        if interrupt {
            value |= if list { GEN_LIST_IEN } else { GEN_IEN };
        }
        value |= GEN_LEVEL_INT;
        value &= !GEN_CHANNEL_MASK;
        value |= field(u32::from(self.group), GEN_CHANNEL_SHIFT, GEN_CHANNEL_MASK);
        value | GEN_PHYSICAL_W | GEN_PHYSICAL_R
    }

    /// Next node as seen by the controller; zero stays zero (end of list)
    fn node_address(&self, next: usize) -> u32 {
        if next == 0 { 0 } else { self.binding.physical(next) }
    }

    /// Fill every transfer-dependent field of `image`
    fn transfer_fields(
        &self,
        image: &mut RegisterImage,
        transfer: &TransferDescriptor,
        list: bool,
        enable: bool,
    ) -> ConfigResult<()> {
        let mut gen_config = image.gen_config;
        if transfer.byte_swap {
            gen_config |= GEN_BSWAP;
        }
        if transfer.wait_unpack {
            gen_config |= GEN_WAIT_UNPACK;
        } else {
            gen_config &= !GEN_WAIT_UNPACK;
        }
        if transfer.inc_write {
            gen_config |= GEN_INC_W;
        }
        if transfer.inc_read {
            gen_config |= GEN_INC_R;
        }
        let write_code = width_code(transfer.write_width).ok_or(ConfigError::OutOfRange)?;
        gen_config |= field(write_code, GEN_WIDTH_W_SHIFT, GEN_WIDTH_W_MASK);
        let read_code = width_code(transfer.read_width).ok_or(ConfigError::OutOfRange)?;
        gen_config |= read_code & GEN_WIDTH_R_MASK;

        let mut read_port = READ_PORT_DREQ_ENABLE;
        if transfer.priority >= 128 {
            read_port |= READ_PORT_PRIORITY;
        }
        if transfer.hold_off >= 16 {
            return Err(ConfigError::OutOfRange);
        }
        read_port |= field(
            u32::from(transfer.hold_off),
            READ_PORT_HOLD_OFF_SHIFT,
            READ_PORT_HOLD_OFF_MASK,
        );
        if transfer.burst_size >= 0xFF {
            return Err(ConfigError::OutOfRange);
        }
        read_port |= field(
            transfer.burst_size - 1,
            READ_PORT_BURST_SIZE_SHIFT,
            READ_PORT_BURST_SIZE_MASK,
        );

        let transfer_size = transfer.size - 1;
        if transfer_size > TRANSFER_SIZE_CNT_MASK {
            return Err(ConfigError::OutOfRange);
        }

        image.gen_config = gen_config;
        image.read_port = read_port;
        image.read_address = self.binding.physical(transfer.read_addr);
        image.write_address = self.binding.physical(transfer.write_addr);
        image.transfer_size = transfer_size;
        image.cmds_processed = 0;
        image.control = match (enable, list) {
            (false, _) => 0,
            (true, true) => CONTROL_LIST_EN | CONTROL_EN,
            (true, false) => CONTROL_EN,
        };

        Ok(())
    }
}

impl Sealed for Mdc {}

impl Backend for Mdc {
    type Descriptor = MdcDescriptor;

    const NAME: &'static str = "mdc";

    unsafe fn bind(binding: ChannelBinding) -> Self {
        Self {
            binding,
            // SAFETY: the caller vouches for the binding's base address
            regs: unsafe { RegisterBlock::new(binding.base()) },
            group: 0,
        }
    }

    fn binding(&self) -> &ChannelBinding {
        &self.binding
    }

    fn set_group(&mut self, group: u8) -> ConfigResult<()> {
        if group > GEN_CHANNEL_MAX {
            return Err(ConfigError::OutOfRange);
        }
        self.group = group;
        Ok(())
    }

    fn reset(&mut self) {
        // Cancels any outstanding operation
        self.regs.write(CONTROL_AND_STATUS_OFFSET, CONTROL_CANCEL);
        self.regs.write(GENERAL_CONFIG_OFFSET, 0);
        self.regs.write(READ_PORT_CONFIG_OFFSET, 0);
        self.regs.write(READ_ADDRESS_OFFSET, 0);
        self.regs.write(WRITE_ADDRESS_OFFSET, 0);
        self.regs.write(TRANSFER_SIZE_OFFSET, 0);
        self.regs.write(CONTROL_AND_STATUS_OFFSET, 0);
    }

    fn enable(&mut self, list_mode: bool) {
        let control = self.regs.read(CONTROL_AND_STATUS_OFFSET);
        assert!(
            control & (CONTROL_LIST_EN | CONTROL_EN) == 0,
            "mdc channel enabled twice"
        );
        let bit = if list_mode { CONTROL_LIST_EN } else { CONTROL_EN };
        self.regs.write(CONTROL_AND_STATUS_OFFSET, control | bit);
    }

    fn disable(&mut self, transferring: bool) -> StateResult<()> {
        if transferring {
            return Err(StateError::NotSupported);
        }
        Ok(())
    }

    fn current_transfer_count(&self) -> u32 {
        self.regs.read(TRANSFER_SIZE_OFFSET) & TRANSFER_SIZE_CNT_MASK
    }

    fn interrupt_pending(&self) -> bool {
        self.regs.read(CMDS_PROCESSED_OFFSET) & CMDS_INT_ACTIVE != 0
    }

    fn read_and_clear_interrupts(&mut self) -> StateResult<()> {
        let processed = self.regs.read(CMDS_PROCESSED_OFFSET);
        let count = ((processed & CMDS_PROCESSED_MASK) >> CMDS_PROCESSED_SHIFT) + 1;
        let count = count & (CMDS_PROCESSED_MASK >> CMDS_PROCESSED_SHIFT);
        self.regs.write(CMDS_PROCESSED_OFFSET, count << CMDS_PROCESSED_SHIFT);
        Ok(())
    }

    fn validate(&self, transfer: &TransferDescriptor) -> ConfigResult<()> {
        check(transfer)?;
        let mut scratch = RegisterImage::default();
        self.transfer_fields(&mut scratch, transfer, false, false)
    }

    fn program_descriptor(
        &self,
        image: &MdcDescriptor,
        first: bool,
        transfer: Option<&TransferDescriptor>,
        next: Option<&MdcDescriptor>,
    ) -> ConfigResult<()> {
        // The element that starts a list raises no "loaded" interrupt: that
        // interrupt retires the previous element and the first has none.
        let interrupt = !first;
        let next_node = self.node_address(next.map_or(0, DescriptorImage::address));

        match transfer {
            Some(transfer) => {
                check(transfer)?;
                let mut regs = RegisterImage {
                    list_node: next_node,
                    ..RegisterImage::default()
                };
                regs.gen_config = self.link_config(0, true, interrupt);
                self.transfer_fields(&mut regs, transfer, true, true)?;
                image.store(&regs);
            }
            None => {
                let gen_config = self.link_config(image.gen_config.get(), true, interrupt);
                image.list_node.set(next_node);
                image.gen_config.set(gen_config);
            }
        }

        Ok(())
    }

    fn prepare_single_shot(&mut self, transfer: &TransferDescriptor) -> ConfigResult<()> {
        check(transfer)?;

        let mut regs = RegisterImage {
            gen_config: self.link_config(0, false, true),
            ..RegisterImage::default()
        };
        self.transfer_fields(&mut regs, transfer, false, false)?;

        self.regs.write(GENERAL_CONFIG_OFFSET, regs.gen_config);
        self.regs.write(READ_PORT_CONFIG_OFFSET, regs.read_port);
        self.regs.write(READ_ADDRESS_OFFSET, regs.read_address);
        self.regs.write(WRITE_ADDRESS_OFFSET, regs.write_address);
        self.regs.write(TRANSFER_SIZE_OFFSET, regs.transfer_size);
        self.regs.write(LIST_NODE_ADDRESS_OFFSET, 0);
        self.regs.write(CONTROL_AND_STATUS_OFFSET, regs.control);

        Ok(())
    }

    fn prepare_list_start(&mut self, first: &MdcDescriptor) {
        // The register copy needs the interrupt enabled or no element ever
        // interrupts.
        let gen_config = self.link_config(0, true, true);
        self.regs.write(GENERAL_CONFIG_OFFSET, gen_config);
        self.regs
            .write(LIST_NODE_ADDRESS_OFFSET, self.node_address(first.address()));
    }
}

// =============================================================================
// Tests
// =============================================================================

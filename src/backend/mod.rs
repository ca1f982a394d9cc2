//! Hardware backends
//!
//! The channel engine drives two incompatible DMA controller designs through
//! one contract, [`Backend`]:
//!
//! - [`SysBus`]: the system-bus DMA controller. Lengths are counted in
//!   peripheral-width units and bursts in 4-byte units. Active transfers can
//!   be paused.
//! - [`Mdc`]: the multi-channel DMA controller. List elements are images of
//!   the channel's eight registers. Active transfers cannot be paused.
//!
//! Backends are used by the channel state machine only. They translate a
//! [`TransferDescriptor`] plus list linkage into the bit-exact register or
//! descriptor image and perform the reset, enable, disable and
//! interrupt-status primitives.
//!
//! Neither [`Backend::prepare_single_shot`] nor
//! [`Backend::prepare_list_start`] sets the "go" bit. [`Backend::enable`]
//! does that separately so the caller controls when the hardware first
//! fetches a list.

pub mod mdc;
pub mod sysbus;

pub use mdc::{Mdc, MdcDescriptor};
pub use sysbus::{SysBus, SysBusDescriptor};

use crate::error::{ConfigResult, StateResult};
use crate::transfer::TransferDescriptor;

mod sealed {
    pub trait Sealed {}
}

pub(crate) use sealed::Sealed;

// =============================================================================
// Channel Binding
// =============================================================================

/// Virtual to physical address translation hook
pub type AddressTranslation = fn(usize) -> u32;

/// Binding of a logical channel to its register block
///
/// Supplied once when the channel is defined and immutable thereafter.
#[derive(Debug, Clone, Copy)]
pub struct ChannelBinding {
    index: u8,
    base: usize,
    translate: Option<AddressTranslation>,
}

#[cfg(feature = "defmt")]
impl defmt::Format for ChannelBinding {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "ChannelBinding {{ index: {}, base: {=usize:#x}, translated: {} }}",
            self.index,
            self.base,
            self.translate.is_some()
        );
    }
}

impl ChannelBinding {
    /// Bind channel `index` to the register block at `base`
    #[must_use]
    pub const fn new(index: u8, base: usize) -> Self {
        Self {
            index,
            base,
            translate: None,
        }
    }

    /// Route every memory address through `translate` before it reaches
    /// the hardware
    #[must_use]
    pub const fn with_translation(mut self, translate: AddressTranslation) -> Self {
        self.translate = Some(translate);
        self
    }

    /// Logical channel index
    #[must_use]
    pub const fn index(&self) -> u8 {
        self.index
    }

    /// Register block base address
    #[must_use]
    pub const fn base(&self) -> usize {
        self.base
    }

    /// Address as seen by the DMA controller
    #[inline]
    pub(crate) fn physical(&self, addr: usize) -> u32 {
        match self.translate {
            Some(translate) => translate(addr),
            None => addr as u32,
        }
    }
}

// =============================================================================
// Descriptor Image
// =============================================================================

/// Hardware image of one list element
///
/// Images live in caller-provided ring storage and are read by the DMA
/// controller, so every field access is volatile.
pub trait DescriptorImage: Sealed + Sized {
    /// All-zero image, used to build ring storage in const context
    #[allow(clippy::declare_interior_mutable_const)]
    const EMPTY: Self;

    /// Zero every word
    fn clear(&self);

    /// Snapshot of the eight descriptor words
    fn words(&self) -> [u32; 8];

    /// Address of the image in CPU address space
    #[inline]
    fn address(&self) -> usize {
        core::ptr::from_ref(self) as usize
    }
}

// =============================================================================
// Backend Contract
// =============================================================================

/// Register-model specific half of a DMA channel
///
/// This trait is sealed; the crate implements it for [`SysBus`] and [`Mdc`].
pub trait Backend: Sealed {
    /// List element image for this controller
    type Descriptor: DescriptorImage;

    /// Short controller name for diagnostics
    const NAME: &'static str;

    /// Bind a backend to a channel definition
    ///
    /// # Safety
    /// The binding's base must be the address of this controller's register
    /// block for the channel, and no other backend may drive the same block.
    unsafe fn bind(binding: ChannelBinding) -> Self;

    /// The definition this backend was bound to
    fn binding(&self) -> &ChannelBinding;

    /// Select the hardware channel group
    ///
    /// Controllers without priority grouping ignore the value.
    fn set_group(&mut self, group: u8) -> ConfigResult<()>;

    /// Cancel anything in flight and return every register to its reset value
    fn reset(&mut self);

    /// Set the "go" bit for a list or single-shot transfer
    fn enable(&mut self, list_mode: bool);

    /// Pause the channel
    ///
    /// Fails with `NotSupported` when `transferring` is set and the
    /// controller cannot pause an active transfer.
    fn disable(&mut self, transferring: bool) -> StateResult<()>;

    /// Remaining (SysBus) or programmed (MDC) transfer count
    fn current_transfer_count(&self) -> u32;

    /// Whether the channel interrupt is asserted
    fn interrupt_pending(&self) -> bool;

    /// Acknowledge one "element finished" interrupt
    ///
    /// Returns `UnexpectedState` when the interrupt had another cause.
    fn read_and_clear_interrupts(&mut self) -> StateResult<()>;

    /// Every argument and range check `prepare_single_shot` performs,
    /// without touching the hardware
    fn validate(&self, transfer: &TransferDescriptor) -> ConfigResult<()>;

    /// Write one list element
    ///
    /// With `transfer` present the image is rebuilt from scratch. Without it
    /// only the link to `next` (or the end-of-list marker when `next` is
    /// `None`) is rewritten, leaving an in-flight element intact.
    fn program_descriptor(
        &self,
        image: &Self::Descriptor,
        first: bool,
        transfer: Option<&TransferDescriptor>,
        next: Option<&Self::Descriptor>,
    ) -> ConfigResult<()>;

    /// Load the registers for a single transfer without starting it
    fn prepare_single_shot(&mut self, transfer: &TransferDescriptor) -> ConfigResult<()>;

    /// Point the channel at the first list element without starting it
    fn prepare_list_start(&mut self, first: &Self::Descriptor);
}

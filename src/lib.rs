//! Generic DMA Channel Engine
//!
//! A `no_std`, `no_alloc` driver core that runs DMA channels on two
//! incompatible controller designs behind one channel state machine.
//!
//! # Architecture
//!
//! 1. **Transfers** ([`transfer`]): Controller-neutral description of one
//!    DMA operation
//! 2. **Backends** ([`backend`]): Register-level translation for the
//!    system-bus controller ([`SysBus`]) and the multi-channel controller
//!    ([`Mdc`])
//! 3. **Rings** ([`ring`]): Caller-owned storage for linked list elements
//! 4. **Channels** ([`driver`]): Lifecycle, list and single-shot transfers,
//!    queued I/O with a completion mailbox
//!
//! A channel runs either a linked list of elements (circular until an element
//! is added with `terminate`) or one transfer at a time. Completions are
//! reported by callback, and in queued mode also through a mailbox read by
//! [`Channel::wait_object`].
//!
//! # Features
//!
//! - `defmt`: defmt formatting for public types and defmt logging
//! - `log`: Logging through the `log` facade when `defmt` is off
//! - `critical-section`: ISR-safe [`sync::SharedChannel`] wrapper
//! - `async`: Async completion waits with wakers
//!
//! # Example
//!
//! ```ignore
//! use ph_gdma::{Channel, ChannelBinding, ChannelConfig, ChannelRegistry, RingSlot};
//! use ph_gdma::{SysBus, SysBusDescriptor, TransferDescriptor, WaitTimeout};
//!
//! static mut RING: [RingSlot<SysBusDescriptor>; 9] = [const { RingSlot::new() }; 9];
//!
//! let mut registry: ChannelRegistry = ChannelRegistry::new();
//! unsafe { registry.define(ChannelBinding::new(0, 0x0200_0000))? };
//!
//! let mut channel: Channel<'_, SysBus> = Channel::new(registry.claim(0)?);
//! let config = ChannelConfig::new()
//!     .with_list_mode(true)
//!     .with_autostart(true)
//!     .with_start_threshold(2);
//! channel.initialise(config, None, Some(unsafe { &mut *core::ptr::addr_of_mut!(RING) }))?;
//! channel.configure()?;
//!
//! let rx = TransferDescriptor::peripheral_to_memory(UART_RX, buffer, 1, 64);
//! channel.list_add(&rx, false)?;
//! channel.list_add(&rx.with_user_tag(1), true)?;
//!
//! let done = channel.wait_object(WaitTimeout::Forever, &mut delay)?;
//! ```

#![no_std]
#![deny(missing_docs)]
#![allow(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::correctness)]
#![warn(
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::cloned_instead_of_copied,
    clippy::explicit_iter_loop,
    clippy::implicit_clone,
    clippy::inconsistent_struct_constructor,
    clippy::manual_assert,
    clippy::manual_let_else,
    clippy::match_same_arms,
    clippy::needless_pass_by_value,
    clippy::semicolon_if_nothing_returned,
    clippy::uninlined_format_args,
    clippy::unnested_or_patterns,
    clippy::std_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::alloc_instead_of_core
)]
#![allow(
    clippy::mod_module_files,
    clippy::self_named_module_files,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::struct_excessive_bools,
    clippy::fn_params_excessive_bools,
    clippy::type_complexity,
    clippy::must_use_candidate,
    clippy::assertions_on_constants,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_lossless,
    clippy::panic_in_result_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::items_after_statements,
    clippy::let_underscore_future
)]

// Logging macros, must come first
mod fmt;

// =============================================================================
// Modules
// =============================================================================

pub mod backend;
pub mod driver;
pub mod error;
pub mod ring;
pub mod transfer;

// Internal implementation details (pub(crate) only)
mod internal;

#[cfg(feature = "critical-section")]
#[cfg_attr(docsrs, doc(cfg(feature = "critical-section")))]
pub mod sync;

// Test utilities (only available during testing)
#[cfg(test)]
pub mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use backend::{AddressTranslation, Backend, ChannelBinding, DescriptorImage};
pub use backend::{Mdc, MdcDescriptor, SysBus, SysBusDescriptor};
pub use driver::{
    Channel, ChannelCallbacks, ChannelConfig, ChannelRegistry, Completion, CompletionStatus,
    NoCallbacks, State, WaitTimeout,
};
pub use error::{
    ConfigError, ConfigResult, Error, Result, RingError, RingResult, StateError, StateResult,
    WaitError, WaitResult,
};
pub use ring::{ListStatus, RingIndex, RingSlot};
pub use transfer::{Direction, TransferDescriptor};

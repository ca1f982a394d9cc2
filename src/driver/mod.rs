//! Channel engine
//!
//! Everything above the hardware backends:
//!
//! - [`config`] - Channel configuration, lifecycle states, wait timeouts
//! - [`callbacks`] - Completion and device hooks
//! - [`queue`] - Queued-I/O control blocks and the completion mailbox
//! - [`channel`] - The channel state machine
//! - [`registry`] - Channel definitions and backend ownership
//!
//! # Example
//!
//! ```ignore
//! use ph_gdma::driver::{Channel, ChannelConfig, ChannelRegistry, WaitTimeout};
//! use ph_gdma::backend::{ChannelBinding, SysBus};
//!
//! let mut registry: ChannelRegistry = ChannelRegistry::new();
//! unsafe { registry.define(ChannelBinding::new(0, SYSBUS_CH0_BASE))? };
//!
//! let mut channel: Channel<'_, SysBus> = Channel::new(registry.claim(0)?);
//! channel.initialise(ChannelConfig::new().with_autostart(true), None, None)?;
//! channel.configure()?;
//!
//! channel.single_shot(&transfer, WaitTimeout::Forever)?;
//! let done = channel.wait_object(WaitTimeout::Micros(500), &mut delay)?;
//! ```

// Submodules
pub mod callbacks;
pub mod channel;
pub mod config;
pub mod queue;
pub mod registry;

// Re-exports for convenience
pub use callbacks::{ChannelCallbacks, CompletionStatus, NoCallbacks};
pub use channel::{Channel, DEFAULT_QUEUE_DEPTH, DEVICE_NAME_LEN};
pub use config::{ChannelConfig, DEFAULT_POOL_SIZE, State, WaitTimeout};
pub use queue::Completion;
pub use registry::{ChannelRegistry, DEFAULT_MAX_CHANNELS};

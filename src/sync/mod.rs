//! Interrupt-safe channel access
//!
//! - **Primitives**
//!   - [`CriticalSectionCell`] - ISR-safe interior mutability
//!   - [`AtomicWaker`] - Waker slot filled by a future, emptied by the
//!     interrupt (feature `async`)
//!
//! - **Shared wrapper**
//!   - [`SharedChannel`] - A [`Channel`](crate::driver::Channel) reachable
//!     from both task code and its interrupt handler
//!
//! # Feature Flags
//!
//! - `critical-section`: Enables this module
//! - `async`: Adds [`AtomicWaker`] and `SharedChannel::wait_object_async`
//!
//! # Example
//!
//! ```ignore
//! use ph_gdma::sync::SharedChannel;
//!
//! static CHANNEL: SharedChannel<'static, SysBus, SpiDma> = SharedChannel::new();
//!
//! #[interrupt]
//! fn DMA_CH0() {
//!     CHANNEL.on_interrupt();
//! }
//! ```

mod primitives;

#[cfg(feature = "async")]
pub use primitives::AtomicWaker;
pub use primitives::CriticalSectionCell;

mod shared;

pub use shared::SharedChannel;

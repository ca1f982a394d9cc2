//! Completion and device-extension hooks
//!
//! A peripheral driver that owns a channel supplies one [`ChannelCallbacks`]
//! implementation. The completion hook is required; the device hooks default
//! to doing nothing.

use crate::transfer::TransferDescriptor;

/// Why a transfer was retired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CompletionStatus {
    /// The hardware finished the transfer
    Normal,
    /// The transfer was removed by a flush or unconfigure
    Cancelled,
}

impl CompletionStatus {
    /// Whether the hardware finished the transfer
    #[must_use]
    pub const fn is_normal(self) -> bool {
        matches!(self, Self::Normal)
    }
}

/// Hooks invoked by a channel
///
/// `completion` runs in interrupt context for normal completions and in the
/// caller's context for cancellations. State that would be the callback's
/// user pointer lives in the implementing type.
pub trait ChannelCallbacks {
    /// One transfer was retired
    fn completion(&mut self, transfer: &TransferDescriptor, status: CompletionStatus);

    /// Channel resources were bound
    fn init_device(&mut self) {}

    /// The hardware was started
    fn start_device(&mut self) {}

    /// Outstanding work was cancelled
    fn cancel_device(&mut self) {}
}

/// Callback type for channels initialised without callbacks
///
/// Such channels report completions through the wait call only.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCallbacks;

impl ChannelCallbacks for NoCallbacks {
    fn completion(&mut self, _transfer: &TransferDescriptor, _status: CompletionStatus) {}
}

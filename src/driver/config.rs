//! Configuration types for DMA channels

use crate::error::{ConfigError, ConfigResult};

/// Default number of queued-I/O control blocks
pub const DEFAULT_POOL_SIZE: usize = 4;

/// Channel lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// No resources bound
    #[default]
    Uninitialised,
    /// Resources bound, channel stopped
    Initialised,
    /// Accepting submissions, hardware not running
    Idle,
    /// Hardware actively transferring
    Running,
    /// Hardware has begun the terminal list element
    Finishing,
    /// Paused from `Idle` or `Running`
    Disabled,
}

impl State {
    /// Short name for diagnostics
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialised => "uninitialised",
            Self::Initialised => "initialised",
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Finishing => "finishing",
            Self::Disabled => "disabled",
        }
    }
}

impl core::fmt::Display for State {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How long a blocking call may wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaitTimeout {
    /// Return immediately
    #[default]
    NoWait,
    /// Wait until the event happens
    Forever,
    /// Wait at most this many microseconds
    Micros(u32),
}

/// Channel configuration
///
/// Fixed for the lifetime of an initialised channel.
///
/// # Example
/// ```ignore
/// let config = ChannelConfig::new()
///     .with_list_mode(true)
///     .with_autostart(true)
///     .with_start_threshold(2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelConfig {
    /// Hardware channel group (priority grouping, ignored where unsupported)
    pub group: u8,
    /// Chain descriptors through a ring instead of single-shot transfers
    pub list_mode: bool,
    /// Start the hardware as soon as the start criteria are met
    pub autostart: bool,
    /// Elements required before a list may start or resume
    pub start_threshold: usize,
    /// Skip queued I/O; completions are reported by callback only
    pub bypass: bool,
    /// Control blocks available to queued submissions
    pub pool_size: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelConfig {
    /// Single-shot, queued, manually started
    #[must_use]
    pub const fn new() -> Self {
        Self {
            group: 0,
            list_mode: false,
            autostart: false,
            start_threshold: 1,
            bypass: false,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }

    /// Set the hardware channel group
    #[must_use]
    pub const fn with_group(mut self, group: u8) -> Self {
        self.group = group;
        self
    }

    /// Select list mode
    #[must_use]
    pub const fn with_list_mode(mut self, enabled: bool) -> Self {
        self.list_mode = enabled;
        self
    }

    /// Select autostart
    #[must_use]
    pub const fn with_autostart(mut self, enabled: bool) -> Self {
        self.autostart = enabled;
        self
    }

    /// Set the list start threshold
    #[must_use]
    pub const fn with_start_threshold(mut self, elements: usize) -> Self {
        self.start_threshold = elements;
        self
    }

    /// Bypass queued I/O
    #[must_use]
    pub const fn with_bypass(mut self, enabled: bool) -> Self {
        self.bypass = enabled;
        self
    }

    /// Set the number of queued-I/O control blocks
    #[must_use]
    pub const fn with_pool_size(mut self, blocks: usize) -> Self {
        self.pool_size = blocks;
        self
    }

    /// Check the parts of the configuration that do not depend on storage
    ///
    /// `queue_depth` is the channel's mailbox capacity.
    pub(crate) fn validate(&self, queue_depth: usize) -> ConfigResult<()> {
        if !self.bypass && (self.pool_size == 0 || self.pool_size > queue_depth) {
            return Err(ConfigError::InvalidParameters);
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! Error types for the DMA channel engine
//!
//! Errors are organized by domain for better diagnostics:
//! - [`ConfigError`]: malformed call arguments and out-of-range fields
//! - [`StateError`]: operations attempted in the wrong channel state
//! - [`RingError`]: descriptor ring capacity and threshold failures
//! - [`WaitError`]: completion retrieval failures
//!
//! The unified [`Error`] enum wraps all domain errors and is returned
//! by most channel methods.
//!
//! Internal-consistency violations (an unexpected interrupt cause, a
//! completion delivered in an impossible state, a corrupt ring index) are
//! not represented here; they panic.

// =============================================================================
// Configuration Errors
// =============================================================================

/// Argument validation errors
///
/// These are reported before any register or ring state is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Malformed call arguments (null address, zero width, bad combination)
    InvalidParameters,
    /// A value does not fit the hardware field it is encoded into
    OutOfRange,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConfigError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConfigError::InvalidParameters => "invalid parameters",
            ConfigError::OutOfRange => "value out of range for hardware field",
        }
    }
}

// =============================================================================
// State Errors
// =============================================================================

/// Channel state errors
///
/// The operation is not valid for the current channel state or mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StateError {
    /// Operation not valid in the current state
    UnexpectedState,
    /// Structurally disallowed even though the state matches
    OperationProhibited,
    /// The backend cannot perform the requested hardware action
    NotSupported,
    /// A bypass-mode operation is already outstanding
    Busy,
    /// Nothing has been submitted that could be started
    NotInitialised,
}

impl core::fmt::Display for StateError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StateError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            StateError::UnexpectedState => "unexpected channel state",
            StateError::OperationProhibited => "operation prohibited",
            StateError::NotSupported => "not supported by hardware",
            StateError::Busy => "operation already outstanding",
            StateError::NotInitialised => "no transfer submitted",
        }
    }
}

// =============================================================================
// Ring Errors
// =============================================================================

/// Descriptor ring errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RingError {
    /// No free slot left in the ring
    StorageFull,
    /// No elements queued in the ring
    StorageEmpty,
    /// Fewer elements queued than the start threshold requires
    MinimumLimitNotMet,
}

impl core::fmt::Display for RingError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RingError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            RingError::StorageFull => "descriptor ring full",
            RingError::StorageEmpty => "descriptor ring empty",
            RingError::MinimumLimitNotMet => "start threshold not met",
        }
    }
}

// =============================================================================
// Wait Errors
// =============================================================================

/// Completion retrieval errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaitError {
    /// Nothing completed before the deadline, or no control block was free
    Timeout,
    /// The operation was retired by a flush or unconfigure
    Cancelled,
}

impl core::fmt::Display for WaitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl WaitError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            WaitError::Timeout => "operation timed out",
            WaitError::Cancelled => "operation cancelled",
        }
    }
}

// =============================================================================
// Unified Error Type
// =============================================================================

/// This enum wraps all domain-specific errors for unified error handling.
///
/// Match on the inner domain error for specific handling:
/// ```ignore
/// match channel.list_add(transfer, false) {
///     Err(Error::Ring(RingError::StorageFull)) => { /* retry later */ }
///     Err(Error::State(StateError::OperationProhibited)) => { /* too close to the end */ }
///     _ => {}
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Argument error
    Config(ConfigError),
    /// State error
    State(StateError),
    /// Ring error
    Ring(RingError),
    /// Wait error
    Wait(WaitError),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Config(e) => write!(f, "config: {}", e.as_str()),
            Error::State(e) => write!(f, "state: {}", e.as_str()),
            Error::Ring(e) => write!(f, "ring: {}", e.as_str()),
            Error::Wait(e) => write!(f, "wait: {}", e.as_str()),
        }
    }
}

// From impls for automatic conversion
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<StateError> for Error {
    fn from(e: StateError) -> Self {
        Error::State(e)
    }
}

impl From<RingError> for Error {
    fn from(e: RingError) -> Self {
        Error::Ring(e)
    }
}

impl From<WaitError> for Error {
    fn from(e: WaitError) -> Self {
        Error::Wait(e)
    }
}

/// Result type alias for channel operations
pub type Result<T> = core::result::Result<T, Error>;

/// Result type alias for argument validation
pub type ConfigResult<T> = core::result::Result<T, ConfigError>;

/// Result type alias for state checks
pub type StateResult<T> = core::result::Result<T, StateError>;

/// Result type alias for ring operations
pub type RingResult<T> = core::result::Result<T, RingError>;

/// Result type alias for completion retrieval
pub type WaitResult<T> = core::result::Result<T, WaitError>;

// =============================================================================
// Unit Tests
// =============================================================================

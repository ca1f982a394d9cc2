//! Channel definitions
//!
//! The registry records which register block backs each logical channel
//! and hands out at most one backend per definition. It replaces any
//! process-wide table: the application owns the registry and passes the
//! claimed backends to [`Channel::new`](super::Channel::new).

use crate::backend::{Backend, ChannelBinding};
use crate::error::{ConfigError, Result, StateError};

/// Hardware instances a default registry can hold
pub const DEFAULT_MAX_CHANNELS: usize = 10;

#[derive(Debug, Clone, Copy)]
struct Definition {
    binding: ChannelBinding,
    claimed: bool,
}

/// Table of channel definitions, indexed by logical channel number
///
/// # Example
/// ```ignore
/// let mut registry: ChannelRegistry = ChannelRegistry::new();
/// unsafe { registry.define(ChannelBinding::new(0, 0x0200_0000))? };
///
/// let backend = registry.claim::<SysBus>(0)?;
/// let mut channel: Channel<'_, SysBus> = Channel::new(backend);
/// // ...
/// registry.release(channel.into_backend())?;
/// ```
#[derive(Debug)]
pub struct ChannelRegistry<const N: usize = DEFAULT_MAX_CHANNELS> {
    definitions: [Option<Definition>; N],
}

impl<const N: usize> ChannelRegistry<N> {
    /// Empty registry
    pub const fn new() -> Self {
        Self {
            definitions: [None; N],
        }
    }

    /// Record the register block behind a channel index
    ///
    /// # Safety
    /// `binding.base()` must be the register block of the controller the
    /// channel will later be claimed as, and must stay valid for as long as
    /// any backend claimed from this definition is alive.
    ///
    /// # Errors
    /// `InvalidParameters` when the index does not fit the registry,
    /// `UnexpectedState` when it is already defined.
    pub unsafe fn define(&mut self, binding: ChannelBinding) -> Result<()> {
        let slot = self
            .definitions
            .get_mut(usize::from(binding.index()))
            .ok_or(ConfigError::InvalidParameters)?;
        if slot.is_some() {
            return Err(StateError::UnexpectedState.into());
        }
        *slot = Some(Definition {
            binding,
            claimed: false,
        });
        debug!("channel {} defined", binding.index());
        Ok(())
    }

    /// Whether `index` has a definition
    pub fn is_defined(&self, index: u8) -> bool {
        self.binding(index).is_some()
    }

    /// The binding recorded for `index`
    pub fn binding(&self, index: u8) -> Option<ChannelBinding> {
        self.definitions
            .get(usize::from(index))
            .copied()
            .flatten()
            .map(|definition| definition.binding)
    }

    /// Take the backend for a defined channel
    ///
    /// # Errors
    /// `InvalidParameters` when `index` is not defined, `Busy` while an
    /// earlier claim has not been released.
    pub fn claim<B: Backend>(&mut self, index: u8) -> Result<B> {
        let definition = self
            .definitions
            .get_mut(usize::from(index))
            .and_then(Option::as_mut)
            .ok_or(ConfigError::InvalidParameters)?;
        if definition.claimed {
            return Err(StateError::Busy.into());
        }
        definition.claimed = true;
        // SAFETY: `define` guarantees the binding, and `claimed` keeps a
        // second backend away from the same block.
        Ok(unsafe { B::bind(definition.binding) })
    }

    /// Return a claimed backend so the channel can be claimed again
    ///
    /// # Errors
    /// `InvalidParameters` when the backend's channel is not defined,
    /// `UnexpectedState` when it is not claimed.
    pub fn release<B: Backend>(&mut self, backend: B) -> Result<()> {
        let index = backend.binding().index();
        let definition = self
            .definitions
            .get_mut(usize::from(index))
            .and_then(Option::as_mut)
            .ok_or(ConfigError::InvalidParameters)?;
        if !definition.claimed {
            return Err(StateError::UnexpectedState.into());
        }
        definition.claimed = false;
        Ok(())
    }
}

impl<const N: usize> Default for ChannelRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}

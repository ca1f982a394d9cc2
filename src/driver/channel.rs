//! DMA channel state machine
//!
//! A [`Channel`] owns one hardware backend plus everything needed to drive
//! it: configuration, lifecycle state, the descriptor ring in list mode, the
//! single active transfer in single-shot mode, and the queued-I/O resources
//! when queueing is not bypassed.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialised --initialise--> Initialised --configure--> Idle
//!       ^                           |   ^                   |  ^
//!       +-------deinitialise--------+   +--unconfigure--+   |  | completion
//!                                                        |   v  |
//!                         Disabled <--disable-- Idle / Running --> Finishing
//!                            |
//!                            +--enable--> pre-disable state
//!                            +--flush---> Idle
//! ```
//!
//! # Context rules
//!
//! [`Channel::on_interrupt`] is the only path that retires work and the only
//! writer of transitions out of `Running` and `Finishing`. Every other
//! operation runs in task context and returns promptly; only
//! [`Channel::wait_object`] may block.

use core::fmt::Write as _;

use embedded_hal::delay::DelayNs;
use heapless::String;

use super::callbacks::{ChannelCallbacks, CompletionStatus, NoCallbacks};
use super::config::{ChannelConfig, State, WaitTimeout};
use super::queue::{Completion, QueuedIo};
use crate::backend::Backend;
use crate::error::{ConfigError, ConfigResult, Result, RingError, StateError, WaitError};
use crate::ring::{DescriptorRing, ListStatus, RingSlot};
use crate::transfer::TransferDescriptor;

/// Default completion mailbox depth
pub const DEFAULT_QUEUE_DEPTH: usize = 8;

/// Capacity of the string returned by [`Channel::device_name`]
pub const DEVICE_NAME_LEN: usize = 16;

const DEVICE_NAME_PREFIX: &str = "GDMAC_CHAN";

// =============================================================================
// Channel
// =============================================================================

/// One physical DMA channel
///
/// # Type Parameters
/// * `B` - Hardware backend ([`SysBus`](crate::backend::SysBus) or
///   [`Mdc`](crate::backend::Mdc))
/// * `C` - Completion and device hooks
/// * `Q` - Depth of the pending queue and completion mailbox
///
/// # Example
/// ```ignore
/// static mut SLOTS: [RingSlot<MdcDescriptor>; 5] = [const { RingSlot::new() }; 5];
///
/// let backend = registry.claim::<Mdc>(2)?;
/// let mut channel: Channel<'_, Mdc, UartDma> = Channel::new(backend);
///
/// let config = ChannelConfig::new()
///     .with_list_mode(true)
///     .with_autostart(true)
///     .with_start_threshold(2);
/// channel.initialise(config, Some(UartDma::new()), Some(unsafe { &mut SLOTS }))?;
/// channel.configure()?;
///
/// channel.list_add(&first, false)?;
/// channel.list_add(&second, true)?; // threshold met: starts
/// ```
pub struct Channel<'a, B: Backend, C: ChannelCallbacks = NoCallbacks, const Q: usize = DEFAULT_QUEUE_DEPTH> {
    backend: B,
    config: ChannelConfig,
    state: State,
    pre_disable: State,
    callbacks: Option<C>,
    /// Single-shot transfer loaded into the hardware
    current: Option<TransferDescriptor>,
    ring: Option<DescriptorRing<'a, B::Descriptor>>,
    queue: QueuedIo<Q>,
}

impl<'a, B: Backend, C: ChannelCallbacks, const Q: usize> Channel<'a, B, C, Q> {
    /// Wrap a bound backend; the channel starts `Uninitialised`
    pub const fn new(backend: B) -> Self {
        Self {
            backend,
            config: ChannelConfig::new(),
            state: State::Uninitialised,
            pre_disable: State::Idle,
            callbacks: None,
            current: None,
            ring: None,
            queue: QueuedIo::new(),
        }
    }

    /// Current state
    #[inline(always)]
    pub fn status(&self) -> State {
        self.state
    }

    /// State the channel was in when it was last disabled
    #[inline(always)]
    pub fn pre_disable_state(&self) -> State {
        self.pre_disable
    }

    /// Active configuration
    #[inline(always)]
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Logical channel index
    #[inline(always)]
    pub fn index(&self) -> u8 {
        self.backend.binding().index()
    }

    /// The backend driving this channel
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Give the backend back, e.g. to release it to a registry
    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Registered hooks
    pub fn callbacks(&self) -> Option<&C> {
        self.callbacks.as_ref()
    }

    /// Registered hooks, mutably
    pub fn callbacks_mut(&mut self) -> Option<&mut C> {
        self.callbacks.as_mut()
    }

    /// Device name, `GDMAC_CHAN` followed by the three-digit channel index
    pub fn device_name(&self) -> String<DEVICE_NAME_LEN> {
        let mut name = String::new();
        // Prefix plus three digits always fits
        let _ = write!(name, "{DEVICE_NAME_PREFIX}{:03}", self.index());
        name
    }

    /// Whether the hardware interrupt is asserted
    pub fn interrupt_pending(&self) -> bool {
        self.backend.interrupt_pending()
    }

    /// Remaining (SysBus) or programmed (MDC) transfer count
    pub fn current_transfer_count(&self) -> u32 {
        self.backend.current_transfer_count()
    }

    /// Snapshot of the ring bookkeeping (list mode only)
    pub fn list_status(&self) -> Option<ListStatus> {
        self.ring.as_ref().map(DescriptorRing::status)
    }

    /// Transfer the hardware is working on, if any
    pub fn active_transfer(&self) -> Option<TransferDescriptor> {
        if !matches!(self.state, State::Running | State::Finishing) {
            return None;
        }
        match self.ring.as_ref() {
            Some(ring) => ring.active_transfer(),
            None => self.current,
        }
    }

    /// Whether queued single-shot submissions wait for the hardware
    pub fn has_pending(&self) -> bool {
        self.queue.has_pending()
    }

    /// Control blocks left for new submissions
    pub fn free_control_blocks(&self) -> usize {
        self.queue.available()
    }

    /// Completions waiting in the mailbox
    pub fn completions_waiting(&self) -> usize {
        self.queue.completions()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Bind resources to the channel
    ///
    /// `ring` must be supplied exactly when `config.list_mode` is set, and
    /// `callbacks` is mandatory in bypass mode. The hardware is reset and
    /// the `init_device` hook runs. Every argument is checked before
    /// anything is touched.
    pub fn initialise(
        &mut self,
        config: ChannelConfig,
        callbacks: Option<C>,
        ring: Option<&'a mut [RingSlot<B::Descriptor>]>,
    ) -> Result<()> {
        if self.state != State::Uninitialised {
            return Err(StateError::UnexpectedState.into());
        }

        config.validate(Q)?;
        if config.bypass && callbacks.is_none() {
            return Err(ConfigError::InvalidParameters.into());
        }
        if config.list_mode != ring.is_some() {
            return Err(ConfigError::InvalidParameters.into());
        }
        let ring = ring
            .map(|slots| DescriptorRing::new(slots, config.start_threshold))
            .transpose()?;

        self.backend.set_group(config.group)?;
        self.backend.reset();

        self.queue
            .configure(if config.bypass { 0 } else { config.pool_size });
        self.config = config;
        self.ring = ring;
        self.callbacks = callbacks;
        self.current = None;
        self.pre_disable = State::Idle;

        if let Some(callbacks) = self.callbacks.as_mut() {
            callbacks.init_device();
        }
        self.set_state(State::Initialised);

        info!(
            "{}: {} channel initialised (list: {}, bypass: {})",
            self.index(),
            B::NAME,
            config.list_mode,
            config.bypass
        );
        Ok(())
    }

    /// Open the channel for submissions
    pub fn configure(&mut self) -> Result<()> {
        if self.state != State::Initialised {
            return Err(StateError::UnexpectedState.into());
        }
        self.pre_disable = State::Idle;
        self.set_state(State::Idle);
        Ok(())
    }

    /// Reset the hardware of an initialised channel
    pub fn reset(&mut self) -> Result<()> {
        if self.state != State::Initialised {
            return Err(StateError::UnexpectedState.into());
        }
        self.backend.reset();
        Ok(())
    }

    /// Cancel everything outstanding and return to `Initialised`
    pub fn unconfigure(&mut self) -> Result<()> {
        if self.state != State::Disabled {
            return Err(StateError::UnexpectedState.into());
        }
        self.cancel_outstanding();
        self.cancel_device();
        self.pre_disable = State::Idle;
        self.set_state(State::Initialised);
        Ok(())
    }

    /// Release every resource bound by [`initialise`](Self::initialise)
    pub fn deinitialise(&mut self) -> Result<()> {
        if self.state != State::Initialised {
            return Err(StateError::UnexpectedState.into());
        }
        self.queue.clear();
        self.ring = None;
        self.callbacks = None;
        self.current = None;
        self.config = ChannelConfig::new();
        self.set_state(State::Uninitialised);
        Ok(())
    }

    // =========================================================================
    // Pause and resume
    // =========================================================================

    /// Pause the channel
    ///
    /// Fails with `NotSupported`, leaving the state unchanged, when the
    /// hardware cannot pause an active transfer.
    pub fn disable(&mut self) -> Result<()> {
        if !matches!(self.state, State::Idle | State::Running) {
            return Err(StateError::UnexpectedState.into());
        }
        self.backend.disable(self.state == State::Running)?;
        self.pre_disable = self.state;
        self.set_state(State::Disabled);
        Ok(())
    }

    /// Resume from `Disabled`
    ///
    /// A list paused while running only resumes with at least the start
    /// threshold of elements queued; otherwise it stays `Disabled` and
    /// `MinimumLimitNotMet` is returned.
    pub fn enable(&mut self) -> Result<()> {
        if self.state != State::Disabled {
            return Err(StateError::UnexpectedState.into());
        }

        if self.pre_disable == State::Running {
            if let Some(ring) = self.ring.as_ref()
                && !ring.threshold_met()
            {
                warn!(
                    "{}: resume refused, {} of {} elements queued",
                    self.index(),
                    ring.in_use(),
                    self.config.start_threshold
                );
                return Err(RingError::MinimumLimitNotMet.into());
            }
            self.set_state(State::Running);
            self.backend.enable(self.config.list_mode);
            return Ok(());
        }

        if self.autostart_ready() {
            self.start_list();
        } else {
            self.set_state(State::Idle);
            self.dispatch_pending();
        }
        Ok(())
    }

    /// Cancel everything outstanding on a disabled channel
    ///
    /// The channel returns to `Idle` and forgets it was ever running, so it
    /// cannot be resumed with [`enable`](Self::enable).
    pub fn flush(&mut self) -> Result<()> {
        if self.state != State::Disabled {
            return Err(StateError::UnexpectedState.into());
        }
        self.cancel_outstanding();
        self.pre_disable = State::Idle;
        self.set_state(State::Idle);
        self.cancel_device();
        Ok(())
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Append one element to the descriptor ring
    ///
    /// A `terminate`d element ends the list; otherwise the list stays
    /// circular. While running, appending within one element of the end of
    /// a terminated list is refused with `OperationProhibited`. With
    /// autostart, an idle channel starts once the threshold is met.
    pub fn list_add(&mut self, transfer: &TransferDescriptor, terminate: bool) -> Result<()> {
        if !matches!(self.state, State::Idle | State::Disabled | State::Running) {
            return Err(StateError::UnexpectedState.into());
        }
        let Some(ring) = self.ring.as_mut() else {
            return Err(StateError::UnexpectedState.into());
        };
        if ring.is_full() {
            return Err(RingError::StorageFull.into());
        }
        if self.state == State::Running && ring.near_end() {
            return Err(StateError::OperationProhibited.into());
        }

        let queued = !self.config.bypass;
        if queued {
            self.queue.reserve()?;
        }
        let appended = match ring.append(&self.backend, transfer, terminate) {
            Ok(appended) => appended,
            Err(e) => {
                if queued {
                    self.queue.release();
                }
                return Err(e);
            }
        };
        if queued {
            // Consumed circular elements never reach the mailbox
            for _ in 0..appended.released {
                self.queue.release();
            }
        }
        trace!(
            "{}: element {} queued in slot {} ({} in use, {} released)",
            self.backend.binding().index(),
            transfer.user_tag,
            appended.slot.get(),
            ring.in_use(),
            appended.released
        );

        if self.state == State::Idle && self.autostart_ready() {
            self.start_list();
        }
        Ok(())
    }

    /// Submit a single-shot transfer
    ///
    /// In bypass mode only one transfer may be outstanding (`Busy`
    /// otherwise), the channel must be `Idle`, and only
    /// [`WaitTimeout::NoWait`] is accepted. Queued submissions reserve a
    /// control block, failing with `Timeout` when the pool is exhausted,
    /// and are loaded into the hardware as soon as the channel is free.
    pub fn single_shot(&mut self, transfer: &TransferDescriptor, timeout: WaitTimeout) -> Result<()> {
        if self.config.bypass {
            if self.current.is_some() {
                return Err(StateError::Busy.into());
            }
            if self.state != State::Idle || self.config.list_mode {
                return Err(StateError::UnexpectedState.into());
            }
            if timeout != WaitTimeout::NoWait {
                return Err(ConfigError::InvalidParameters.into());
            }
            self.dispatch(*transfer)?;
            return Ok(());
        }

        if !matches!(self.state, State::Idle | State::Running | State::Disabled)
            || self.config.list_mode
        {
            return Err(StateError::UnexpectedState.into());
        }
        self.backend.validate(transfer)?;
        self.queue.submit(*transfer)?;
        self.dispatch_pending();
        Ok(())
    }

    /// Start a channel that does not autostart
    pub fn start_transfer(&mut self) -> Result<()> {
        if !matches!(self.state, State::Idle | State::Running | State::Finishing)
            || self.config.autostart
        {
            return Err(StateError::UnexpectedState.into());
        }
        if self.state != State::Idle {
            return Err(StateError::OperationProhibited.into());
        }

        match self.ring.as_ref() {
            Some(ring) => {
                if !ring.threshold_met() {
                    return Err(RingError::MinimumLimitNotMet.into());
                }
                self.start_list();
            }
            None => {
                if self.current.is_none() {
                    return Err(StateError::NotInitialised.into());
                }
                self.backend.enable(false);
                self.set_state(State::Running);
                self.start_device();
            }
        }
        Ok(())
    }

    /// Whether a manual start would succeed
    ///
    /// Only meaningful without autostart, from `Idle` or `Disabled`.
    pub fn ready_to_start(&self) -> Result<bool> {
        if !matches!(self.state, State::Idle | State::Disabled) || self.config.autostart {
            return Err(StateError::UnexpectedState.into());
        }
        Ok(match self.ring.as_ref() {
            Some(ring) => ring.threshold_met(),
            None => self.current.is_some(),
        })
    }

    /// Ring occupancy: `StorageEmpty`, `StorageFull`, or `Ok` in between
    pub fn list_state(&self) -> Result<()> {
        let Some(ring) = self.ring.as_ref() else {
            return Err(StateError::UnexpectedState.into());
        };
        if ring.is_empty() {
            Err(RingError::StorageEmpty.into())
        } else if ring.is_full() {
            Err(RingError::StorageFull.into())
        } else {
            Ok(())
        }
    }

    // =========================================================================
    // Completion
    // =========================================================================

    /// Interrupt entry point
    ///
    /// Acknowledges the hardware and retires one element or transfer. An
    /// interrupt with any other cause is logged and otherwise ignored.
    pub fn on_interrupt(&mut self) {
        match self.backend.read_and_clear_interrupts() {
            Ok(()) => self.complete(),
            Err(e) => warn!("{}: interrupt ignored: {}", self.index(), e.as_str()),
        }
    }

    /// Service a pending interrupt from task context
    ///
    /// Returns whether anything was retired.
    pub fn poll(&mut self) -> bool {
        if matches!(self.state, State::Running | State::Finishing) && self.backend.interrupt_pending() {
            self.on_interrupt();
            true
        } else {
            false
        }
    }

    /// Next retired transfer from the completion mailbox
    ///
    /// `Micros` waits poll the hardware once per microsecond. Channels that
    /// are `Initialised` or `Disabled` never wait. Not available in bypass
    /// mode, which reports completions by callback only.
    pub fn wait_object<D: DelayNs>(&mut self, timeout: WaitTimeout, delay: &mut D) -> Result<Completion> {
        let mut budget = self.wait_budget(timeout)?;
        loop {
            if let Some(completion) = self.queue.take() {
                return Ok(completion);
            }
            if self.poll() {
                continue;
            }
            match budget.as_mut() {
                Some(0) => return Err(WaitError::Timeout.into()),
                Some(remaining) => *remaining -= 1,
                None => {}
            }
            delay.delay_us(1);
        }
    }

    /// Non-blocking [`wait_object`](Self::wait_object) that does not poll
    /// the hardware
    pub fn try_completion(&mut self) -> Result<Option<Completion>> {
        self.wait_budget(WaitTimeout::NoWait)?;
        Ok(self.queue.take())
    }

    /// Microseconds a wait may spend, `None` for no limit
    pub(crate) fn wait_budget(&self, timeout: WaitTimeout) -> Result<Option<u32>> {
        if self.state == State::Uninitialised {
            return Err(StateError::UnexpectedState.into());
        }
        if self.config.bypass {
            return Err(StateError::OperationProhibited.into());
        }
        let timeout = match self.state {
            State::Initialised | State::Disabled => WaitTimeout::NoWait,
            _ => timeout,
        };
        Ok(match timeout {
            WaitTimeout::NoWait => Some(0),
            WaitTimeout::Micros(us) => Some(us),
            WaitTimeout::Forever => None,
        })
    }

    fn complete(&mut self) {
        assert!(
            matches!(self.state, State::Running | State::Finishing),
            "channel {} completion while {}",
            self.index(),
            self.state
        );
        if self.config.list_mode {
            self.complete_list_element();
        } else {
            self.complete_single_shot();
        }
    }

    fn complete_single_shot(&mut self) {
        let Some(transfer) = self.current.take() else {
            panic!("channel {} single-shot completion with nothing loaded", self.index());
        };
        self.set_state(State::Idle);
        Self::deliver(
            &mut self.callbacks,
            &mut self.queue,
            transfer,
            CompletionStatus::Normal,
            !self.config.bypass,
        );
        self.dispatch_pending();
    }

    fn complete_list_element(&mut self) {
        let Some(ring) = self.ring.as_mut() else {
            panic!("channel {} list completion without a ring", self.index());
        };
        let finishing = self.state == State::Finishing;
        let circular = ring.is_circular();
        let retired = ring.retire(finishing);

        let next = if finishing || retired.drained {
            State::Idle
        } else if retired.reached_last {
            State::Finishing
        } else {
            self.state
        };
        self.set_state(next);

        // Circular elements stay in the ring and are reported by callback only
        Self::deliver(
            &mut self.callbacks,
            &mut self.queue,
            retired.transfer,
            CompletionStatus::Normal,
            !self.config.bypass && !circular,
        );
    }

    fn deliver(
        callbacks: &mut Option<C>,
        queue: &mut QueuedIo<Q>,
        transfer: TransferDescriptor,
        status: CompletionStatus,
        post: bool,
    ) {
        if let Some(callbacks) = callbacks.as_mut() {
            callbacks.completion(&transfer, status);
        }
        if post {
            queue.post(Completion { transfer, status });
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn set_state(&mut self, state: State) {
        if self.state != state {
            debug!("{}: {} -> {}", self.index(), self.state.as_str(), state.as_str());
        }
        self.state = state;
    }

    fn autostart_ready(&self) -> bool {
        self.config.autostart && self.ring.as_ref().is_some_and(DescriptorRing::threshold_met)
    }

    fn start_device(&mut self) {
        if let Some(callbacks) = self.callbacks.as_mut() {
            callbacks.start_device();
        }
    }

    fn cancel_device(&mut self) {
        if let Some(callbacks) = self.callbacks.as_mut() {
            callbacks.cancel_device();
        }
    }

    /// Reset the hardware and point it at the ring head, then go
    fn start_list(&mut self) {
        let Some(ring) = self.ring.as_mut() else {
            return;
        };
        self.backend.reset();
        let first = ring.restart();
        self.backend.prepare_list_start(first);
        self.backend.enable(true);
        self.set_state(State::Running);
        self.start_device();
    }

    /// Load a single-shot transfer, starting it with autostart
    fn dispatch(&mut self, transfer: TransferDescriptor) -> ConfigResult<()> {
        self.backend.prepare_single_shot(&transfer)?;
        self.current = Some(transfer);
        if self.config.autostart {
            self.backend.enable(false);
            self.set_state(State::Running);
            self.start_device();
        }
        Ok(())
    }

    /// Move queued submissions into a free, idle channel
    fn dispatch_pending(&mut self) {
        while self.state == State::Idle && self.current.is_none() {
            let Some(transfer) = self.queue.next_pending() else {
                break;
            };
            if let Err(e) = self.dispatch(transfer) {
                warn!("{}: queued transfer rejected: {}", self.index(), e.as_str());
                Self::deliver(
                    &mut self.callbacks,
                    &mut self.queue,
                    transfer,
                    CompletionStatus::Cancelled,
                    true,
                );
            }
        }
    }

    /// Reset the hardware and retire every outstanding transfer as cancelled
    fn cancel_outstanding(&mut self) {
        self.backend.reset();

        let post = !self.config.bypass;
        let mut cancelled = 0usize;
        if let Some(transfer) = self.current.take() {
            Self::deliver(&mut self.callbacks, &mut self.queue, transfer, CompletionStatus::Cancelled, post);
            cancelled += 1;
        }
        while let Some(transfer) = self.queue.next_pending() {
            Self::deliver(&mut self.callbacks, &mut self.queue, transfer, CompletionStatus::Cancelled, post);
            cancelled += 1;
        }
        if let Some(ring) = self.ring.as_mut() {
            let callbacks = &mut self.callbacks;
            let queue = &mut self.queue;
            ring.drain(|transfer| {
                Self::deliver(callbacks, queue, transfer, CompletionStatus::Cancelled, post);
                cancelled += 1;
            });
        }

        info!("{}: {} transfers cancelled", self.index(), cancelled);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::backend::{ChannelBinding, DescriptorImage, Mdc, MdcDescriptor, SysBus, SysBusDescriptor};
    use crate::driver::DEFAULT_POOL_SIZE;
    use crate::error::Error;
    use crate::internal::register::mdc::{
        CMDS_PROCESSED_OFFSET, CMDS_PROCESSED_SHIFT, CONTROL_AND_STATUS_OFFSET, CONTROL_LIST_EN, GEN_LIST_IEN,
    };
    use crate::internal::register::sysbus::{COUNT_EN, COUNT_LIST_EN, COUNT_OFFSET};
    use crate::testing::{MockDelay, MockRegisters, RecordingCallbacks, transfer};
    use std::vec;

    type SysBusChannel<'a> = Channel<'a, SysBus, RecordingCallbacks, 4>;

    fn sysbus(regs: &MockRegisters) -> SysBus {
        unsafe { SysBus::bind(ChannelBinding::new(7, regs.base())) }
    }

    fn slots<const N: usize>() -> [RingSlot<SysBusDescriptor>; N] {
        [const { RingSlot::new() }; N]
    }

    fn list_config(threshold: usize) -> ChannelConfig {
        ChannelConfig::new()
            .with_list_mode(true)
            .with_autostart(true)
            .with_start_threshold(threshold)
    }

    fn list_channel<'a>(
        regs: &MockRegisters,
        storage: &'a mut [RingSlot<SysBusDescriptor>],
        config: ChannelConfig,
    ) -> SysBusChannel<'a> {
        let mut channel = Channel::new(sysbus(regs));
        channel
            .initialise(config, Some(RecordingCallbacks::new()), Some(storage))
            .unwrap();
        channel.configure().unwrap();
        channel
    }

    fn single_channel(regs: &MockRegisters, config: ChannelConfig) -> SysBusChannel<'static> {
        let mut channel = Channel::new(sysbus(regs));
        channel
            .initialise(config, Some(RecordingCallbacks::new()), None)
            .unwrap();
        channel.configure().unwrap();
        channel
    }

    fn complete(regs: &MockRegisters, channel: &mut SysBusChannel<'_>) {
        regs.fire_sysbus_completion();
        channel.on_interrupt();
    }

    fn recorded(channel: &SysBusChannel<'_>, status: CompletionStatus) -> std::vec::Vec<usize> {
        channel.callbacks().unwrap().tags(status)
    }

    fn in_use(channel: &SysBusChannel<'_>) -> usize {
        channel.list_status().unwrap().in_use
    }

    const UNEXPECTED: Error = Error::State(StateError::UnexpectedState);

    // -------------------------------------------------------------------------
    // Initialise
    // -------------------------------------------------------------------------

    #[test]
    fn initialise_binds_resources_and_calls_init_hook() {
        let regs = MockRegisters::new();
        let mut channel: SysBusChannel<'_> = Channel::new(sysbus(&regs));

        channel
            .initialise(ChannelConfig::new(), Some(RecordingCallbacks::new()), None)
            .unwrap();

        assert_eq!(channel.status(), State::Initialised);
        assert_eq!(channel.callbacks().unwrap().inits, 1);
        assert_eq!(
            channel.initialise(ChannelConfig::new(), None, None),
            Err(UNEXPECTED)
        );
    }

    #[test]
    fn bypass_requires_completion_callback() {
        let regs = MockRegisters::new();
        let mut channel: SysBusChannel<'_> = Channel::new(sysbus(&regs));

        assert_eq!(
            channel.initialise(ChannelConfig::new().with_bypass(true), None, None),
            Err(ConfigError::InvalidParameters.into())
        );
        assert_eq!(channel.status(), State::Uninitialised);
    }

    #[test]
    fn ring_storage_must_match_list_mode() {
        let regs = MockRegisters::new();
        let mut storage = slots::<4>();
        let mut channel: SysBusChannel<'_> = Channel::new(sysbus(&regs));

        assert_eq!(
            channel.initialise(ChannelConfig::new().with_list_mode(true), None, None),
            Err(ConfigError::InvalidParameters.into())
        );
        assert_eq!(
            channel.initialise(ChannelConfig::new(), None, Some(&mut storage)),
            Err(ConfigError::InvalidParameters.into())
        );
        assert_eq!(channel.status(), State::Uninitialised);
    }

    #[test]
    fn threshold_beyond_capacity_is_rejected() {
        let regs = MockRegisters::new();
        let mut storage = slots::<4>();
        let mut channel: SysBusChannel<'_> = Channel::new(sysbus(&regs));

        assert_eq!(
            channel.initialise(list_config(4), None, Some(&mut storage)),
            Err(ConfigError::InvalidParameters.into())
        );
    }

    #[test]
    fn pool_larger_than_mailbox_is_rejected() {
        let regs = MockRegisters::new();
        let mut channel: SysBusChannel<'_> = Channel::new(sysbus(&regs));

        assert_eq!(
            channel.initialise(ChannelConfig::new().with_pool_size(5), None, None),
            Err(ConfigError::InvalidParameters.into())
        );
    }

    #[test]
    fn device_name_carries_channel_index() {
        let regs = MockRegisters::new();
        let channel: SysBusChannel<'_> = Channel::new(sysbus(&regs));
        assert_eq!(channel.device_name().as_str(), "GDMAC_CHAN007");
    }

    // -------------------------------------------------------------------------
    // State legality
    // -------------------------------------------------------------------------

    #[test]
    fn uninitialised_channel_rejects_everything() {
        let regs = MockRegisters::new();
        let mut channel: SysBusChannel<'_> = Channel::new(sysbus(&regs));
        let mut delay = MockDelay::new();
        let t = transfer(1);

        assert_eq!(channel.configure(), Err(UNEXPECTED));
        assert_eq!(channel.reset(), Err(UNEXPECTED));
        assert_eq!(channel.unconfigure(), Err(UNEXPECTED));
        assert_eq!(channel.deinitialise(), Err(UNEXPECTED));
        assert_eq!(channel.disable(), Err(UNEXPECTED));
        assert_eq!(channel.enable(), Err(UNEXPECTED));
        assert_eq!(channel.flush(), Err(UNEXPECTED));
        assert_eq!(channel.list_add(&t, true), Err(UNEXPECTED));
        assert_eq!(channel.single_shot(&t, WaitTimeout::NoWait), Err(UNEXPECTED));
        assert_eq!(channel.start_transfer(), Err(UNEXPECTED));
        assert_eq!(channel.ready_to_start(), Err(UNEXPECTED));
        assert_eq!(channel.list_state(), Err(UNEXPECTED));
        assert_eq!(
            channel.wait_object(WaitTimeout::NoWait, &mut delay).err(),
            Some(UNEXPECTED)
        );
        assert_eq!(channel.status(), State::Uninitialised);
    }

    #[test]
    fn initialised_channel_only_configures_resets_or_deinitialises() {
        let regs = MockRegisters::new();
        let mut storage = slots::<4>();
        let mut channel: SysBusChannel<'_> = Channel::new(sysbus(&regs));
        channel
            .initialise(list_config(1), None, Some(&mut storage))
            .unwrap();
        let t = transfer(1);

        assert_eq!(channel.disable(), Err(UNEXPECTED));
        assert_eq!(channel.enable(), Err(UNEXPECTED));
        assert_eq!(channel.flush(), Err(UNEXPECTED));
        assert_eq!(channel.unconfigure(), Err(UNEXPECTED));
        assert_eq!(channel.list_add(&t, true), Err(UNEXPECTED));
        assert_eq!(channel.start_transfer(), Err(UNEXPECTED));
        assert_eq!(channel.status(), State::Initialised);

        channel.reset().unwrap();
        channel.deinitialise().unwrap();
        assert_eq!(channel.status(), State::Uninitialised);
    }

    #[test]
    fn idle_channel_rejects_disabled_only_operations() {
        let regs = MockRegisters::new();
        let mut channel = single_channel(&regs, ChannelConfig::new());

        assert_eq!(channel.enable(), Err(UNEXPECTED));
        assert_eq!(channel.flush(), Err(UNEXPECTED));
        assert_eq!(channel.unconfigure(), Err(UNEXPECTED));
        assert_eq!(channel.deinitialise(), Err(UNEXPECTED));
        assert_eq!(channel.configure(), Err(UNEXPECTED));
        // List operations in single-shot mode
        assert_eq!(channel.list_add(&transfer(1), false), Err(UNEXPECTED));
        assert_eq!(channel.list_state(), Err(UNEXPECTED));
        assert_eq!(channel.status(), State::Idle);
    }

    #[test]
    fn disable_twice_is_rejected() {
        let regs = MockRegisters::new();
        let mut channel = single_channel(&regs, ChannelConfig::new());

        channel.disable().unwrap();
        assert_eq!(channel.disable(), Err(UNEXPECTED));
        assert_eq!(channel.pre_disable_state(), State::Idle);
    }

    #[test]
    fn finishing_list_cannot_be_disabled_or_extended() {
        let regs = MockRegisters::new();
        let mut storage = slots::<5>();
        let mut channel = list_channel(&regs, &mut storage, list_config(2));
        channel.list_add(&transfer(1), false).unwrap();
        channel.list_add(&transfer(2), true).unwrap();
        complete(&regs, &mut channel);
        assert_eq!(channel.status(), State::Finishing);

        assert_eq!(channel.disable(), Err(UNEXPECTED));
        assert_eq!(channel.list_add(&transfer(3), true), Err(UNEXPECTED));
        assert_eq!(channel.status(), State::Finishing);
    }

    #[test]
    fn running_channel_rejects_lifecycle_operations() {
        let regs = MockRegisters::new();
        let mut channel = single_channel(&regs, ChannelConfig::new().with_autostart(true));
        channel.single_shot(&transfer(1), WaitTimeout::NoWait).unwrap();
        assert_eq!(channel.status(), State::Running);

        assert_eq!(channel.configure(), Err(UNEXPECTED));
        assert_eq!(channel.unconfigure(), Err(UNEXPECTED));
        assert_eq!(channel.flush(), Err(UNEXPECTED));
        assert_eq!(channel.enable(), Err(UNEXPECTED));
        assert_eq!(channel.deinitialise(), Err(UNEXPECTED));
        assert_eq!(channel.reset(), Err(UNEXPECTED));
        assert_eq!(channel.status(), State::Running);
        assert_eq!(channel.active_transfer().map(|t| t.user_tag), Some(1));
    }

    #[test]
    fn disabled_channel_rejects_lifecycle_operations_and_start() {
        let regs = MockRegisters::new();
        let mut channel = single_channel(&regs, ChannelConfig::new());
        channel.single_shot(&transfer(1), WaitTimeout::NoWait).unwrap();
        channel.disable().unwrap();

        assert_eq!(channel.configure(), Err(UNEXPECTED));
        assert_eq!(channel.deinitialise(), Err(UNEXPECTED));
        assert_eq!(channel.reset(), Err(UNEXPECTED));
        assert_eq!(channel.start_transfer(), Err(UNEXPECTED));
        assert_eq!(channel.status(), State::Disabled);

        channel.enable().unwrap();
        channel.start_transfer().unwrap();
        assert_eq!(channel.status(), State::Running);
    }

    #[test]
    fn finishing_list_rejects_resume_flush_and_start() {
        let regs = MockRegisters::new();
        let mut storage = slots::<5>();
        let config = list_config(2).with_autostart(false);
        let mut channel = list_channel(&regs, &mut storage, config);
        channel.list_add(&transfer(1), false).unwrap();
        channel.list_add(&transfer(2), true).unwrap();
        channel.start_transfer().unwrap();
        complete(&regs, &mut channel);
        assert_eq!(channel.status(), State::Finishing);

        assert_eq!(channel.enable(), Err(UNEXPECTED));
        assert_eq!(channel.flush(), Err(UNEXPECTED));
        assert_eq!(
            channel.start_transfer(),
            Err(StateError::OperationProhibited.into())
        );
        assert_eq!(channel.status(), State::Finishing);

        complete(&regs, &mut channel);
        assert_eq!(channel.status(), State::Idle);
    }

    #[test]
    #[should_panic(expected = "completion while idle")]
    fn completion_while_idle_is_fatal() {
        let regs = MockRegisters::new();
        let mut channel = single_channel(&regs, ChannelConfig::new());
        complete(&regs, &mut channel);
    }

    // -------------------------------------------------------------------------
    // List mode
    // -------------------------------------------------------------------------

    #[test]
    fn list_round_trip() {
        let regs = MockRegisters::new();
        let mut storage = slots::<5>();
        let mut channel = list_channel(&regs, &mut storage, list_config(2));
        assert_eq!(channel.status(), State::Idle);
        assert_eq!(channel.list_status().unwrap().capacity, 4);

        channel.list_add(&transfer(1), false).unwrap();
        assert_eq!(channel.status(), State::Idle);
        assert_eq!(in_use(&channel), 1);

        channel.list_add(&transfer(2), true).unwrap();
        assert_eq!(channel.status(), State::Running);
        assert_eq!(in_use(&channel), 2);
        assert_ne!(regs.read(COUNT_OFFSET) & COUNT_LIST_EN, 0);
        assert_eq!(channel.callbacks().unwrap().starts, 1);
        assert_eq!(channel.active_transfer().map(|t| t.user_tag), Some(1));

        complete(&regs, &mut channel);
        assert_eq!(channel.status(), State::Finishing);
        assert_eq!(channel.active_transfer().map(|t| t.user_tag), Some(2));
        complete(&regs, &mut channel);
        assert_eq!(channel.status(), State::Idle);
        assert_eq!(channel.active_transfer(), None);
        assert_eq!(channel.completions_waiting(), 2);

        let status = channel.list_status().unwrap();
        assert_eq!(
            (status.in_use, status.head, status.tail, status.last),
            (0, 0, 0, 0)
        );
        assert_eq!(recorded(&channel, CompletionStatus::Normal), vec![1, 2]);
    }

    #[test]
    fn queued_list_completions_reach_the_mailbox() {
        let regs = MockRegisters::new();
        let mut storage = slots::<5>();
        let mut channel = list_channel(&regs, &mut storage, list_config(2));
        let mut delay = MockDelay::new();
        channel.list_add(&transfer(1), false).unwrap();
        channel.list_add(&transfer(2), true).unwrap();
        complete(&regs, &mut channel);
        complete(&regs, &mut channel);

        let first = channel.wait_object(WaitTimeout::NoWait, &mut delay).unwrap();
        let second = channel.wait_object(WaitTimeout::NoWait, &mut delay).unwrap();
        assert_eq!(first.ok().map(|t| t.user_tag), Ok(1));
        assert_eq!(second.ok().map(|t| t.user_tag), Ok(2));
        assert_eq!(
            channel.wait_object(WaitTimeout::NoWait, &mut delay).err(),
            Some(WaitError::Timeout.into())
        );
    }

    #[test]
    fn single_element_list_returns_to_idle() {
        let regs = MockRegisters::new();
        let mut storage = slots::<3>();
        let mut channel = list_channel(&regs, &mut storage, list_config(1));

        channel.list_add(&transfer(1), true).unwrap();
        assert_eq!(channel.status(), State::Running);

        complete(&regs, &mut channel);
        assert_eq!(channel.status(), State::Idle);
        assert_eq!(in_use(&channel), 0);
    }

    #[test]
    fn ring_invariants_hold_through_a_session() {
        let regs = MockRegisters::new();
        let mut storage = slots::<4>();
        let mut channel = list_channel(&regs, &mut storage, list_config(2));

        fn check(channel: &SysBusChannel<'_>) {
            let s = channel.list_status().unwrap();
            assert!(s.in_use <= s.capacity);
            assert_eq!(s.head == s.tail, s.in_use == 0);
        }

        for round in 0..3 {
            let base = round * 10;
            channel.list_add(&transfer(base + 1), false).unwrap();
            check(&channel);
            channel.list_add(&transfer(base + 2), false).unwrap();
            check(&channel);
            channel.list_add(&transfer(base + 3), true).unwrap();
            check(&channel);
            assert_eq!(channel.list_add(&transfer(99), true), Err(RingError::StorageFull.into()));

            while channel.status() != State::Idle {
                complete(&regs, &mut channel);
                check(&channel);
            }
            channel.try_completion().unwrap();
            channel.try_completion().unwrap();
            channel.try_completion().unwrap();
        }
        assert_eq!(recorded(&channel, CompletionStatus::Normal).len(), 9);
    }

    #[test]
    fn append_near_end_of_terminated_list_is_prohibited() {
        let regs = MockRegisters::new();
        let mut storage = slots::<5>();
        let mut channel = list_channel(&regs, &mut storage, list_config(3));
        channel.list_add(&transfer(1), false).unwrap();
        channel.list_add(&transfer(2), false).unwrap();
        channel.list_add(&transfer(3), true).unwrap();
        complete(&regs, &mut channel);

        // Hardware on the element before the last one
        assert_eq!(channel.list_status().unwrap().active, 1);
        assert_eq!(channel.status(), State::Running);
        assert_eq!(
            channel.list_add(&transfer(4), true),
            Err(StateError::OperationProhibited.into())
        );
        assert_eq!(in_use(&channel), 2);
    }

    #[test]
    fn append_to_circular_list_of_same_shape_succeeds() {
        let regs = MockRegisters::new();
        let mut storage = slots::<5>();
        let mut channel = list_channel(&regs, &mut storage, list_config(3));
        channel.list_add(&transfer(1), false).unwrap();
        channel.list_add(&transfer(2), false).unwrap();
        channel.list_add(&transfer(3), false).unwrap();
        complete(&regs, &mut channel);

        assert_eq!(channel.list_status().unwrap().active, 1);
        channel.list_add(&transfer(4), true).unwrap();
        // The element already run through leaves with the circular link
        assert_eq!(in_use(&channel), 3);
        assert!(!channel.list_status().unwrap().circular);
    }

    #[test]
    fn terminated_circular_list_drains_to_idle() {
        let regs = MockRegisters::new();
        let mut storage = slots::<5>();
        let mut channel = list_channel(&regs, &mut storage, list_config(3));
        for tag in 1..=3 {
            channel.list_add(&transfer(tag), false).unwrap();
        }
        complete(&regs, &mut channel);
        assert_eq!(channel.free_control_blocks(), 1);

        channel.list_add(&transfer(4), true).unwrap();
        assert_eq!(channel.free_control_blocks(), 1);
        assert_eq!(channel.list_status().unwrap().head, 1);

        while channel.status() != State::Idle {
            complete(&regs, &mut channel);
        }

        let status = channel.list_status().unwrap();
        assert_eq!((status.in_use, status.head, status.tail, status.active), (0, 0, 0, 0));
        assert_eq!(recorded(&channel, CompletionStatus::Normal), vec![1, 2, 3, 4]);

        // Only elements retired after termination are posted
        let mut posted = vec![];
        while let Some(c) = channel.try_completion().unwrap() {
            posted.push(c.transfer.user_tag);
        }
        assert_eq!(posted, vec![2, 3, 4]);
        assert_eq!(channel.free_control_blocks(), DEFAULT_POOL_SIZE);
    }

    #[test]
    fn list_restarts_cleanly_after_terminated_circular_list() {
        let regs = MockRegisters::new();
        let mut storage = slots::<4>();
        let mut channel = list_channel(&regs, &mut storage, list_config(1));
        channel.list_add(&transfer(1), false).unwrap();
        channel.list_add(&transfer(2), false).unwrap();
        complete(&regs, &mut channel);
        channel.list_add(&transfer(3), true).unwrap();
        complete(&regs, &mut channel);
        complete(&regs, &mut channel);
        assert_eq!(channel.status(), State::Idle);
        assert_eq!(in_use(&channel), 0);

        channel.list_add(&transfer(4), true).unwrap();
        assert_eq!(channel.status(), State::Running);
        assert_eq!(channel.active_transfer().map(|t| t.user_tag), Some(4));
        complete(&regs, &mut channel);

        assert_eq!(channel.status(), State::Idle);
        assert_eq!(in_use(&channel), 0);
        assert_eq!(recorded(&channel, CompletionStatus::Normal), vec![1, 2, 3, 4]);
    }

    #[test]
    fn circular_completions_use_callback_only() {
        let regs = MockRegisters::new();
        let mut storage = slots::<4>();
        let mut channel = list_channel(&regs, &mut storage, list_config(2));
        channel.list_add(&transfer(1), false).unwrap();
        channel.list_add(&transfer(2), false).unwrap();

        for _ in 0..4 {
            complete(&regs, &mut channel);
        }

        assert_eq!(channel.status(), State::Running);
        assert_eq!(in_use(&channel), 2);
        assert_eq!(recorded(&channel, CompletionStatus::Normal), vec![1, 2, 1, 2]);
        assert_eq!(channel.try_completion(), Ok(None));
    }

    #[test]
    fn list_state_reports_occupancy() {
        let regs = MockRegisters::new();
        let mut storage = slots::<3>();
        let config = list_config(2).with_autostart(false);
        let mut channel = list_channel(&regs, &mut storage, config);

        assert_eq!(channel.list_state(), Err(RingError::StorageEmpty.into()));
        channel.list_add(&transfer(1), false).unwrap();
        assert_eq!(channel.list_state(), Ok(()));
        channel.list_add(&transfer(2), true).unwrap();
        assert_eq!(channel.list_state(), Err(RingError::StorageFull.into()));
    }

    #[test]
    fn manual_list_start_honours_threshold() {
        let regs = MockRegisters::new();
        let mut storage = slots::<5>();
        let config = list_config(2).with_autostart(false);
        let mut channel = list_channel(&regs, &mut storage, config);

        channel.list_add(&transfer(1), false).unwrap();
        assert_eq!(channel.ready_to_start(), Ok(false));
        assert_eq!(
            channel.start_transfer(),
            Err(RingError::MinimumLimitNotMet.into())
        );

        channel.list_add(&transfer(2), true).unwrap();
        assert_eq!(channel.status(), State::Idle);
        assert_eq!(channel.ready_to_start(), Ok(true));

        channel.start_transfer().unwrap();
        assert_eq!(channel.status(), State::Running);
        assert_eq!(
            channel.start_transfer(),
            Err(StateError::OperationProhibited.into())
        );
        assert_eq!(channel.ready_to_start(), Err(UNEXPECTED));
    }

    #[test]
    fn autostart_channel_rejects_manual_start() {
        let regs = MockRegisters::new();
        let mut storage = slots::<3>();
        let mut channel = list_channel(&regs, &mut storage, list_config(1));

        assert_eq!(channel.start_transfer(), Err(UNEXPECTED));
        assert_eq!(channel.ready_to_start(), Err(UNEXPECTED));
    }

    #[test]
    fn queued_append_fails_when_pool_is_exhausted() {
        let regs = MockRegisters::new();
        let mut storage = slots::<5>();
        let config = list_config(2).with_autostart(false).with_pool_size(2);
        let mut channel = list_channel(&regs, &mut storage, config);

        channel.list_add(&transfer(1), false).unwrap();
        channel.list_add(&transfer(2), false).unwrap();
        assert_eq!(
            channel.list_add(&transfer(3), false),
            Err(WaitError::Timeout.into())
        );
        assert_eq!(in_use(&channel), 2);
    }

    // -------------------------------------------------------------------------
    // Disable / Enable / Flush
    // -------------------------------------------------------------------------

    #[test]
    fn resume_below_threshold_is_refused() {
        let regs = MockRegisters::new();
        let mut storage = slots::<6>();
        let mut channel = list_channel(&regs, &mut storage, list_config(3));
        for tag in 1..=3 {
            channel.list_add(&transfer(tag), false).unwrap();
        }
        channel.list_add(&transfer(4), true).unwrap();
        complete(&regs, &mut channel);
        complete(&regs, &mut channel);
        assert_eq!(channel.status(), State::Running);
        assert_eq!(in_use(&channel), 2);

        channel.disable().unwrap();
        assert_eq!(regs.read(COUNT_OFFSET) & (COUNT_EN | COUNT_LIST_EN), 0);
        assert_eq!(
            channel.enable(),
            Err(RingError::MinimumLimitNotMet.into())
        );
        assert_eq!(channel.status(), State::Disabled);

        // Topping the list up while paused allows the resume
        channel.list_add(&transfer(5), true).unwrap();
        channel.enable().unwrap();
        assert_eq!(channel.status(), State::Running);
        assert_ne!(regs.read(COUNT_OFFSET) & COUNT_LIST_EN, 0);
    }

    #[test]
    fn enable_from_idle_autostarts_when_threshold_met() {
        let regs = MockRegisters::new();
        let mut storage = slots::<5>();
        let mut channel = list_channel(&regs, &mut storage, list_config(2));

        channel.disable().unwrap();
        channel.list_add(&transfer(1), false).unwrap();
        channel.list_add(&transfer(2), true).unwrap();
        assert_eq!(channel.status(), State::Disabled);

        channel.enable().unwrap();
        assert_eq!(channel.status(), State::Running);
    }

    #[test]
    fn flush_cancels_and_forbids_resume() {
        let regs = MockRegisters::new();
        let mut storage = slots::<5>();
        let mut channel = list_channel(&regs, &mut storage, list_config(2));
        let mut delay = MockDelay::new();
        channel.list_add(&transfer(1), false).unwrap();
        channel.list_add(&transfer(2), false).unwrap();
        channel.list_add(&transfer(3), true).unwrap();

        channel.disable().unwrap();
        channel.flush().unwrap();

        assert_eq!(channel.status(), State::Idle);
        assert_eq!(channel.pre_disable_state(), State::Idle);
        assert_eq!(in_use(&channel), 0);
        assert_eq!(recorded(&channel, CompletionStatus::Cancelled), vec![1, 2, 3]);
        assert_eq!(channel.callbacks().unwrap().cancels, 1);

        // Cancellations are also posted in queued mode
        let c = channel.wait_object(WaitTimeout::NoWait, &mut delay).unwrap();
        assert_eq!(c.status, CompletionStatus::Cancelled);

        channel.disable().unwrap();
        assert_eq!(channel.flush(), Ok(()));
        assert_eq!(channel.status(), State::Idle);
        assert_eq!(channel.enable(), Err(UNEXPECTED));
    }

    #[test]
    fn disable_flush_enable_is_unexpected() {
        let regs = MockRegisters::new();
        let mut channel = single_channel(&regs, ChannelConfig::new().with_autostart(true));
        channel.single_shot(&transfer(1), WaitTimeout::NoWait).unwrap();
        assert_eq!(channel.status(), State::Running);

        channel.disable().unwrap();
        channel.flush().unwrap();

        assert_eq!(channel.enable(), Err(UNEXPECTED));
    }

    #[test]
    fn unconfigure_cancels_and_returns_to_initialised() {
        let regs = MockRegisters::new();
        let mut channel = single_channel(&regs, ChannelConfig::new());
        let mut delay = MockDelay::new();
        channel.single_shot(&transfer(1), WaitTimeout::NoWait).unwrap();
        channel.single_shot(&transfer(2), WaitTimeout::NoWait).unwrap();

        channel.disable().unwrap();
        channel.unconfigure().unwrap();

        assert_eq!(channel.status(), State::Initialised);
        assert_eq!(recorded(&channel, CompletionStatus::Cancelled), vec![1, 2]);
        assert_eq!(channel.callbacks().unwrap().cancels, 1);

        // Initialised channels never wait, even when asked to
        let first = channel.wait_object(WaitTimeout::Forever, &mut delay).unwrap();
        assert_eq!(first.ok(), Err(WaitError::Cancelled));
        channel.wait_object(WaitTimeout::Forever, &mut delay).unwrap();
        assert_eq!(
            channel.wait_object(WaitTimeout::Forever, &mut delay).err(),
            Some(WaitError::Timeout.into())
        );
        assert_eq!(delay.total_ns(), 0);
    }

    #[test]
    fn mdc_cannot_pause_a_running_transfer() {
        let regs = MockRegisters::new();
        let backend = unsafe { Mdc::bind(ChannelBinding::new(1, regs.base())) };
        let mut storage: [RingSlot<MdcDescriptor>; 3] = [const { RingSlot::new() }; 3];
        let mut channel: Channel<'_, Mdc, RecordingCallbacks, 4> = Channel::new(backend);
        channel
            .initialise(list_config(1), Some(RecordingCallbacks::new()), Some(&mut storage))
            .unwrap();
        channel.configure().unwrap();
        channel.list_add(&transfer(1), true).unwrap();
        assert_eq!(channel.status(), State::Running);

        assert_eq!(channel.disable(), Err(StateError::NotSupported.into()));
        assert_eq!(channel.status(), State::Running);

        regs.fire_mdc_completion();
        assert!(channel.poll());
        assert_eq!(channel.status(), State::Idle);
        channel.disable().unwrap();
        assert_eq!(channel.status(), State::Disabled);
    }

    #[test]
    fn mdc_list_round_trip() {
        let regs = MockRegisters::new();
        let backend = unsafe { Mdc::bind(ChannelBinding::new(1, regs.base())) };
        let mut storage: [RingSlot<MdcDescriptor>; 4] = [const { RingSlot::new() }; 4];
        let mut channel: Channel<'_, Mdc, RecordingCallbacks, 4> = Channel::new(backend);
        channel
            .initialise(list_config(2), Some(RecordingCallbacks::new()), Some(&mut storage))
            .unwrap();
        channel.configure().unwrap();

        channel.list_add(&transfer(1), false).unwrap();
        assert_eq!(channel.status(), State::Idle);
        channel.list_add(&transfer(2), false).unwrap();
        assert_eq!(channel.status(), State::Running);
        assert_ne!(regs.read(CONTROL_AND_STATUS_OFFSET) & CONTROL_LIST_EN, 0);
        channel.list_add(&transfer(3), true).unwrap();
        assert_eq!(channel.list_status().unwrap().in_use, 3);

        regs.fire_mdc_completion();
        channel.on_interrupt();
        assert_eq!(channel.status(), State::Running);
        regs.fire_mdc_completion();
        channel.on_interrupt();
        assert_eq!(channel.status(), State::Finishing);
        regs.fire_mdc_completion();
        assert!(channel.poll());
        assert_eq!(channel.status(), State::Idle);

        assert_eq!(regs.read(CMDS_PROCESSED_OFFSET), 3 << CMDS_PROCESSED_SHIFT);
        assert_eq!(channel.list_status().unwrap().in_use, 0);
        assert_eq!(channel.completions_waiting(), 3);
        assert_eq!(
            channel.callbacks().unwrap().tags(CompletionStatus::Normal),
            vec![1, 2, 3]
        );
        drop(channel);

        // The list head raises no interrupt; every relinked element does
        let words: [[u32; 8]; 3] = core::array::from_fn(|i| storage[i].image().words());
        assert_eq!(words[0][0] & GEN_LIST_IEN, 0);
        assert_ne!(words[1][0] & GEN_LIST_IEN, 0);
        assert_ne!(words[2][0] & GEN_LIST_IEN, 0);
        assert_eq!(words[0][5], storage[1].image().address() as u32);
        assert_eq!(words[1][5], storage[2].image().address() as u32);
        assert_eq!(words[2][5], 0);
    }

    // -------------------------------------------------------------------------
    // Single-shot mode
    // -------------------------------------------------------------------------

    #[test]
    fn bypass_allows_one_outstanding_transfer() {
        let regs = MockRegisters::new();
        let config = ChannelConfig::new().with_bypass(true).with_autostart(true);
        let mut channel = single_channel(&regs, config);

        channel.single_shot(&transfer(1), WaitTimeout::NoWait).unwrap();
        assert_eq!(channel.status(), State::Running);
        assert_ne!(regs.read(COUNT_OFFSET) & COUNT_EN, 0);
        assert_eq!(
            channel.single_shot(&transfer(2), WaitTimeout::NoWait),
            Err(StateError::Busy.into())
        );

        complete(&regs, &mut channel);
        assert_eq!(channel.status(), State::Idle);
        assert_eq!(recorded(&channel, CompletionStatus::Normal), vec![1]);

        channel.single_shot(&transfer(2), WaitTimeout::NoWait).unwrap();
        assert_eq!(channel.status(), State::Running);
    }

    #[test]
    fn bypass_accepts_no_wait_only() {
        let regs = MockRegisters::new();
        let config = ChannelConfig::new().with_bypass(true);
        let mut channel = single_channel(&regs, config);

        assert_eq!(
            channel.single_shot(&transfer(1), WaitTimeout::Micros(10)),
            Err(ConfigError::InvalidParameters.into())
        );
    }

    #[test]
    fn bypass_prohibits_wait_object() {
        let regs = MockRegisters::new();
        let mut channel = single_channel(&regs, ChannelConfig::new().with_bypass(true));
        let mut delay = MockDelay::new();

        assert_eq!(
            channel.wait_object(WaitTimeout::NoWait, &mut delay).err(),
            Some(StateError::OperationProhibited.into())
        );
    }

    #[test]
    fn bypass_submission_errors_leave_channel_free() {
        let regs = MockRegisters::new();
        let mut channel = single_channel(&regs, ChannelConfig::new().with_bypass(true));
        let bad = transfer(1).with_burst_size(64);

        assert_eq!(
            channel.single_shot(&bad, WaitTimeout::NoWait),
            Err(ConfigError::OutOfRange.into())
        );
        channel.single_shot(&transfer(2), WaitTimeout::NoWait).unwrap();
    }

    #[test]
    fn queued_transfers_run_in_submission_order() {
        let regs = MockRegisters::new();
        let mut channel = single_channel(&regs, ChannelConfig::new().with_autostart(true));
        let mut delay = MockDelay::new();

        channel.single_shot(&transfer(1), WaitTimeout::Forever).unwrap();
        channel.single_shot(&transfer(2), WaitTimeout::Forever).unwrap();
        assert_eq!(channel.status(), State::Running);
        assert!(channel.has_pending());
        assert_eq!(channel.free_control_blocks(), 2);

        complete(&regs, &mut channel);
        // Second transfer loaded and started from the completion path
        assert_eq!(channel.status(), State::Running);
        assert_eq!(channel.callbacks().unwrap().starts, 2);
        complete(&regs, &mut channel);
        assert_eq!(channel.status(), State::Idle);

        let tags: std::vec::Vec<usize> = (0..2)
            .map(|_| channel.wait_object(WaitTimeout::NoWait, &mut delay).unwrap())
            .map(|c| c.transfer.user_tag)
            .collect();
        assert_eq!(tags, vec![1, 2]);
    }

    #[test]
    fn queued_submission_validates_before_queueing() {
        let regs = MockRegisters::new();
        let mut channel = single_channel(&regs, ChannelConfig::new());

        assert_eq!(
            channel.single_shot(&transfer(1).with_burst_size(64), WaitTimeout::NoWait),
            Err(ConfigError::OutOfRange.into())
        );
        assert_eq!(channel.ready_to_start(), Ok(false));
    }

    #[test]
    fn exhausted_pool_times_out_until_drained() {
        let regs = MockRegisters::new();
        let config = ChannelConfig::new().with_autostart(true).with_pool_size(1);
        let mut channel = single_channel(&regs, config);
        let mut delay = MockDelay::new();

        channel.single_shot(&transfer(1), WaitTimeout::NoWait).unwrap();
        assert_eq!(
            channel.single_shot(&transfer(2), WaitTimeout::Micros(100)),
            Err(WaitError::Timeout.into())
        );

        complete(&regs, &mut channel);
        // Completion still holds the block
        assert_eq!(
            channel.single_shot(&transfer(2), WaitTimeout::NoWait),
            Err(WaitError::Timeout.into())
        );
        channel.wait_object(WaitTimeout::NoWait, &mut delay).unwrap();
        channel.single_shot(&transfer(2), WaitTimeout::NoWait).unwrap();
    }

    #[test]
    fn manual_single_shot_start() {
        let regs = MockRegisters::new();
        let mut channel = single_channel(&regs, ChannelConfig::new());

        assert_eq!(channel.ready_to_start(), Ok(false));
        assert_eq!(
            channel.start_transfer(),
            Err(StateError::NotInitialised.into())
        );

        channel.single_shot(&transfer(1), WaitTimeout::NoWait).unwrap();
        assert_eq!(channel.status(), State::Idle);
        assert_eq!(regs.read(COUNT_OFFSET) & COUNT_EN, 0);
        assert_eq!(channel.ready_to_start(), Ok(true));

        channel.start_transfer().unwrap();
        assert_eq!(channel.status(), State::Running);
        assert_ne!(regs.read(COUNT_OFFSET) & COUNT_EN, 0);
        assert_eq!(
            channel.start_transfer(),
            Err(StateError::OperationProhibited.into())
        );
    }

    #[test]
    fn wait_object_polls_until_completion() {
        let regs = MockRegisters::new();
        let mut channel = single_channel(&regs, ChannelConfig::new().with_autostart(true));
        let mut delay = MockDelay::new();
        channel.single_shot(&transfer(1), WaitTimeout::NoWait).unwrap();

        regs.fire_sysbus_completion();
        let completion = channel
            .wait_object(WaitTimeout::Micros(10), &mut delay)
            .unwrap();

        assert_eq!(completion.ok().map(|t| t.user_tag), Ok(1));
        assert_eq!(channel.status(), State::Idle);
        assert_eq!(delay.total_ns(), 0);
    }

    #[test]
    fn wait_object_times_out_at_microsecond_granularity() {
        let regs = MockRegisters::new();
        let mut channel = single_channel(&regs, ChannelConfig::new().with_autostart(true));
        let mut delay = MockDelay::new();
        channel.single_shot(&transfer(1), WaitTimeout::NoWait).unwrap();

        assert_eq!(
            channel.wait_object(WaitTimeout::Micros(5), &mut delay).err(),
            Some(WaitError::Timeout.into())
        );
        assert_eq!(delay.total_ns(), 5_000);
        assert_eq!(channel.status(), State::Running);
    }

    #[test]
    fn unexpected_interrupt_cause_is_ignored() {
        use crate::internal::register::sysbus::{ISTAT_LIST_FIN, ISTAT_OFFSET};

        let regs = MockRegisters::new();
        let mut channel = single_channel(&regs, ChannelConfig::new().with_autostart(true));
        channel.single_shot(&transfer(1), WaitTimeout::NoWait).unwrap();

        regs.write(ISTAT_OFFSET, ISTAT_LIST_FIN);
        channel.on_interrupt();

        assert_eq!(channel.status(), State::Running);
        assert!(channel.callbacks().unwrap().completions.is_empty());
    }
}

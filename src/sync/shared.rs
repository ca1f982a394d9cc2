//! Channel shared between task code and its interrupt handler.

use embedded_hal::delay::DelayNs;

#[cfg(feature = "async")]
use super::primitives::AtomicWaker;
use super::primitives::CriticalSectionCell;
use crate::backend::Backend;
use crate::driver::{
    Channel, ChannelCallbacks, Completion, DEFAULT_QUEUE_DEPTH, NoCallbacks, WaitTimeout,
};
use crate::error::{Result, StateError, WaitError};

/// ISR-safe home for one [`Channel`]
///
/// The slot starts empty so it can live in a `static`; the channel is moved
/// in once its backend has been claimed. The interrupt handler calls
/// [`on_interrupt`](Self::on_interrupt), task code uses
/// [`with`](Self::with) for submissions and
/// [`wait_object`](Self::wait_object) for completions. Blocking waits
/// sleep outside the critical section so the interrupt can be taken.
///
/// # Example
///
/// ```ignore
/// static UART_DMA: SharedChannel<'static, Mdc, UartDma> = SharedChannel::new();
///
/// UART_DMA.install(channel);
/// UART_DMA.with(|ch| ch.single_shot(&tx, WaitTimeout::Forever));
/// let done = UART_DMA.wait_object(WaitTimeout::Micros(1_000), &mut delay)?;
///
/// #[interrupt]
/// fn DMA_CH2() {
///     UART_DMA.on_interrupt();
/// }
/// ```
pub struct SharedChannel<
    'a,
    B: Backend,
    C: ChannelCallbacks = NoCallbacks,
    const Q: usize = DEFAULT_QUEUE_DEPTH,
> {
    inner: CriticalSectionCell<Option<Channel<'a, B, C, Q>>>,
    #[cfg(feature = "async")]
    waker: AtomicWaker,
}

impl<'a, B: Backend, C: ChannelCallbacks, const Q: usize> SharedChannel<'a, B, C, Q> {
    /// Empty slot (const, suitable for static initialization)
    pub const fn new() -> Self {
        Self {
            inner: CriticalSectionCell::new(None),
            #[cfg(feature = "async")]
            waker: AtomicWaker::new(),
        }
    }

    /// Move a channel in, handing back any channel already installed
    pub fn install(&self, channel: Channel<'a, B, C, Q>) -> Option<Channel<'a, B, C, Q>> {
        self.inner.with(|slot| slot.replace(channel))
    }

    /// Move the channel out
    pub fn take(&self) -> Option<Channel<'a, B, C, Q>> {
        self.inner.with(Option::take)
    }

    /// Run `f` on the channel with interrupts masked
    ///
    /// `None` when no channel is installed.
    #[inline]
    pub fn with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut Channel<'a, B, C, Q>) -> R,
    {
        self.inner.with(|slot| slot.as_mut().map(f))
    }

    /// Like [`with`](Self::with), but `None` also when the channel is
    /// already borrowed
    #[inline]
    pub fn try_with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut Channel<'a, B, C, Q>) -> R,
    {
        self.inner.try_with(|slot| slot.as_mut().map(f)).flatten()
    }

    /// Interrupt handler body
    ///
    /// Retires the finished element or transfer. A pending
    /// [`wait_object_async`](Self::wait_object_async) is woken only once a
    /// completion is waiting in the mailbox; circular and bypass completions
    /// reach the callback alone.
    pub fn on_interrupt(&self) {
        let serviced = self.with(|ch| {
            ch.on_interrupt();
            (ch.index(), ch.completions_waiting() > 0)
        });
        let Some((index, posted)) = serviced else {
            warn!("interrupt for a channel that is not installed");
            return;
        };
        #[cfg(feature = "async")]
        if posted && self.waker.wake() {
            trace!("{}: completion waiter woken", index);
        }
        #[cfg(not(feature = "async"))]
        let _ = (index, posted);
    }

    /// Blocking wait for the next completion
    ///
    /// Same rules as [`Channel::wait_object`]. Each attempt runs in a
    /// critical section; the one-microsecond sleeps between attempts do not.
    pub fn wait_object<D: DelayNs>(&self, timeout: WaitTimeout, delay: &mut D) -> Result<Completion> {
        let mut budget = self
            .with(|ch| ch.wait_budget(timeout))
            .ok_or(StateError::NotInitialised)??;
        loop {
            if let Some(completion) = self.attempt()? {
                return Ok(completion);
            }
            match budget.as_mut() {
                Some(0) => return Err(WaitError::Timeout.into()),
                Some(remaining) => *remaining -= 1,
                None => {}
            }
            delay.delay_us(1);
        }
    }

    /// Wait for the next completion without blocking the executor
    ///
    /// Relies on [`on_interrupt`](Self::on_interrupt) running from the
    /// channel interrupt. Resolves to `Timeout` straight away when the
    /// channel is `Initialised` or `Disabled` and nothing is waiting.
    #[cfg(feature = "async")]
    pub async fn wait_object_async(&self) -> Result<Completion> {
        use core::future::poll_fn;
        use core::task::Poll;

        poll_fn(|cx| {
            let polled = self.with(|ch| -> Result<Option<Completion>> {
                let budget = ch.wait_budget(WaitTimeout::Forever)?;
                if let Some(completion) = ch.try_completion()? {
                    return Ok(Some(completion));
                }
                if budget == Some(0) {
                    return Err(WaitError::Timeout.into());
                }
                // Registered inside the critical section so a completion
                // between the check and the registration still wakes us
                self.waker.register(cx.waker());
                Ok(None)
            });

            match polled {
                None => Poll::Ready(Err(StateError::NotInitialised.into())),
                Some(Ok(Some(completion))) => Poll::Ready(Ok(completion)),
                Some(Ok(None)) => Poll::Pending,
                Some(Err(e)) => Poll::Ready(Err(e)),
            }
        })
        .await
    }

    fn attempt(&self) -> Result<Option<Completion>> {
        self.with(|ch| {
            if let Some(completion) = ch.try_completion()? {
                return Ok(Some(completion));
            }
            // Covers channels whose interrupt is not routed to on_interrupt
            if ch.poll() {
                ch.try_completion()
            } else {
                Ok(None)
            }
        })
        .unwrap_or(Err(StateError::NotInitialised.into()))
    }
}

impl<B: Backend, C: ChannelCallbacks, const Q: usize> Default for SharedChannel<'_, B, C, Q> {
    fn default() -> Self {
        Self::new()
    }
}

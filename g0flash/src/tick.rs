//! Timeout clock.

/// Free-running tick counter used to bound flash waits.
///
/// Timeouts are counted in observed ticks, not in elapsed wall-clock time.
pub trait TickSource {
    /// Discards a pending tick.
    fn clear(&mut self);

    /// Returns `true` once per tick period and consumes the tick.
    fn elapsed(&mut self) -> bool;
}

/// SysTick as tick source.
///
/// `COUNTFLAG` is set when the counter wraps and cleared by reading it.
/// The counter must be configured and enabled by the caller.
#[cfg(feature = "cortex-m")]
impl TickSource for cortex_m::peripheral::SYST {
    fn clear(&mut self) {
        self.has_wrapped();
    }

    fn elapsed(&mut self) -> bool {
        self.has_wrapped()
    }
}

impl<T: TickSource + ?Sized> TickSource for &mut T {
    fn clear(&mut self) {
        (**self).clear()
    }

    fn elapsed(&mut self) -> bool {
        (**self).elapsed()
    }
}

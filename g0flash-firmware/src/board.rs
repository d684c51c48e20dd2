//! Board.

/// Board-specific functionality.
pub trait Board {
    /// Processor clock speed.
    ///
    /// The G0 runs from HSI16 after reset.
    const CPU_CLOCK: u32 = 16_000_000;

    /// Frequency of the flash timeout tick.
    const TICK_HZ: u32 = 1_000;

    /// Number of pages at the end of flash used for the bring-up check.
    const SCRATCH_PAGES: u16 = 2;

    /// Creates a new instance.
    fn new() -> Self;

    /// Board model.
    fn model(&self) -> &'static str;

    /// Switch the status LED.
    fn led(&mut self, _on: bool) {}
}

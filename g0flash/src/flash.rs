//! Flash driver.

use core::{fmt, mem::size_of};

use crate::{
    irq::{InterruptMask, Masked},
    layout::{DoubleWordAddr, EraseRequest, RowAddr, ROW_WORDS},
    regs::{FlashRegisters, Sr, KEY1, KEY2},
    state::OperationState,
    status::{ErrorFlags, FlashError},
    tick::TickSource,
};

/// Budget of a wait for completion.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Timeout {
    /// Give up after this many observed ticks.
    ///
    /// `Ticks(0)` behaves like `Ticks(1)`.
    Ticks(u32),
    /// Wait forever.
    Infinite,
}

impl Timeout {
    /// Default timeout of flash operations.
    pub const DEFAULT: Self = Self::Ticks(2000);
}

impl Default for Timeout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Driver configuration.
#[derive(Default, Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Timeout of each wait performed by [`Flash::program`] and [`Flash::erase`].
    pub timeout: Timeout,
}

/// What to program.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ProgramRequest<'a> {
    /// Program 64 bits.
    DoubleWord {
        /// Target address.
        address: DoubleWordAddr,
        /// Value to program.
        data: u64,
    },
    /// Fast program a row.
    FastRow {
        /// Target address.
        address: RowAddr,
        /// Words to program.
        data: &'a [u32; ROW_WORDS],
    },
}

impl ProgramRequest<'_> {
    /// Target address.
    pub fn address(&self) -> u32 {
        match self {
            Self::DoubleWord { address, .. } => address.get(),
            Self::FastRow { address, .. } => address.get(),
        }
    }
}

/// Failure of an erase.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EraseError {
    /// Status of the erase.
    pub error: FlashError,
    /// First page that failed to erase.
    ///
    /// `None` if the erase failed before or without erasing a page.
    pub page: Option<u16>,
}

impl From<FlashError> for EraseError {
    fn from(error: FlashError) -> Self {
        Self { error, page: None }
    }
}

impl fmt::Display for EraseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.page {
            Some(page) => write!(f, "{} at page {}", self.error, page),
            None => write!(f, "{}", self.error),
        }
    }
}

/// Flash driver.
///
/// Owns the flash register block, the timeout clock and the interrupt mask.
/// Handles sharing the same [`OperationState`] exclude each other: a second
/// operation started while one is in progress fails with [`FlashError::Busy`].
pub struct Flash<'s, R, T, M> {
    state: &'s OperationState,
    regs: R,
    ticks: T,
    mask: M,
    config: Config,
}

impl<'s, R, T, M> Flash<'s, R, T, M>
where
    R: FlashRegisters,
    T: TickSource,
    M: InterruptMask,
{
    /// Creates a flash driver with default configuration.
    pub fn new(state: &'s OperationState, regs: R, ticks: T, mask: M) -> Self {
        Self::with_config(state, regs, ticks, mask, Config::default())
    }

    /// Creates a flash driver.
    pub fn with_config(state: &'s OperationState, regs: R, ticks: T, mask: M, config: Config) -> Self {
        Self { state, regs, ticks, mask, config }
    }

    /// Configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared operation state.
    pub fn state(&self) -> &'s OperationState {
        self.state
    }

    /// Error flags latched by the last operation.
    pub fn error_code(&self) -> ErrorFlags {
        self.state.error_code()
    }

    /// Register block.
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Releases the owned peripherals.
    pub fn free(self) -> (R, T, M) {
        (self.regs, self.ticks, self.mask)
    }

    /// Whether the control register is locked.
    pub fn is_locked(&self) -> bool {
        self.regs.read_cr().lock()
    }

    /// Unlocks the control register for writing.
    ///
    /// Fails with [`FlashError::Error`] without writing the keys if it is
    /// already unlocked. Success of the key sequence is not verified; use
    /// [`is_locked`](Self::is_locked) for that.
    pub fn unlock(&mut self) -> Result<(), FlashError> {
        if !self.regs.read_cr().lock() {
            warn!("flash: unlock requested but already unlocked");
            return Err(FlashError::Error);
        }

        self.regs.write_keyr(KEY1);
        self.regs.write_keyr(KEY2);
        Ok(())
    }

    /// Locks the control register.
    ///
    /// It stays locked until the next [`unlock`](Self::unlock).
    pub fn lock(&mut self) -> Result<(), FlashError> {
        self.regs.modify_cr(|cr| cr.with_lock(true));
        Ok(())
    }

    /// Waits for the flash operation in progress to complete.
    ///
    /// Hardware error flags found after completion are accumulated into
    /// the [error code](OperationState::error_code), cleared in hardware
    /// and reported as [`FlashError::Error`].
    pub fn wait(&mut self, timeout: Timeout) -> Result<(), FlashError> {
        // A stale tick would be counted immediately.
        self.ticks.clear();

        if let Err(err) = self.busy_wait(timeout) {
            warn!("flash: timeout waiting for operation to complete");
            return Err(err);
        }

        // BSY1 is also cleared when the operation failed.
        let sr = self.regs.read_sr();
        let eccr = self.regs.read_eccr();
        let errors = sr.errors() | eccr.correction();
        if !errors.is_empty() {
            if eccr.eccc() {
                debug!("flash: ecc correction at double word {}", eccr.addr_ecc());
            }
            self.state.latch(errors);
            self.regs.write_sr(Sr(ErrorFlags::SR_ERRORS));
            self.regs.modify_eccr(|eccr| eccr.with_eccc(true));
            errors.log();
            return Err(FlashError::Error);
        }

        // Wait for the control register write to retire.
        if self.busy_wait(timeout).is_err() {
            debug!("flash: timeout waiting for control register");
        }

        Ok(())
    }

    fn busy_wait(&mut self, timeout: Timeout) -> Result<(), FlashError> {
        let mut remaining = timeout;
        while self.regs.read_sr().bsy1() {
            if let Timeout::Ticks(ticks) = &mut remaining {
                if self.ticks.elapsed() {
                    *ticks = ticks.saturating_sub(1);
                    if *ticks == 0 {
                        return Err(FlashError::Timeout);
                    }
                }
            }
        }
        Ok(())
    }

    /// Starts erasing a page.
    ///
    /// Does not wait for completion.
    pub fn page_erase(&mut self, page: u16) {
        trace!("flash: erase page {}", page);
        self.regs.modify_cr(|cr| cr.with_pnb(page).with_per(true).with_strt(true));
    }

    /// Starts erasing the whole flash bank.
    ///
    /// Does not wait for completion.
    pub fn mass_erase(&mut self) {
        self.regs.modify_cr(|cr| cr.with_mer1(true).with_strt(true));
    }

    /// Starts programming a double word.
    ///
    /// Does not wait for completion.
    pub fn program_double_word(&mut self, address: DoubleWordAddr, data: u64) {
        self.regs.modify_cr(|cr| cr.with_pg(true));

        // The flash interface is 32 bits wide.
        let addr = address.get();
        unsafe {
            self.regs.write_word(addr, data as u32);
            self.regs.write_word(addr + size_of::<u32>() as u32, (data >> 32) as u32);
        }
    }

    /// Fast programs a row.
    ///
    /// Interrupts are disabled while the row is transferred and programmed,
    /// since fast programming fails if it takes too long.
    pub fn program_fast(&mut self, address: RowAddr, data: &[u32; ROW_WORDS]) {
        self.regs.modify_cr(|cr| cr.with_fstpg(true));

        let _masked = Masked::new(&mut self.mask);

        let mut addr = address.get();
        for &word in data {
            unsafe { self.regs.write_word(addr, word) };
            addr += size_of::<u32>() as u32;
        }

        // Prefetch from flash must not resume before programming has ended.
        // Errors are collected by the caller's wait.
        while self.regs.read_sr().bsy1() {}
    }

    /// Programs a double word or fast programs a row.
    ///
    /// The target must have been erased and the flash unlocked.
    /// Fails with [`FlashError::Busy`] if another operation is in progress.
    pub fn program(&mut self, request: ProgramRequest<'_>) -> Result<(), FlashError> {
        let state = self.state;
        let _lock = state.try_lock()?;
        state.reset_errors();

        let timeout = self.config.timeout;
        self.wait(timeout)?;

        state.begin_program(request.address());
        match request {
            ProgramRequest::DoubleWord { address, data } => self.program_double_word(address, data),
            ProgramRequest::FastRow { address, data } => self.program_fast(address, data),
        }

        let result = self.wait(timeout);

        self.regs.modify_cr(|cr| match request {
            ProgramRequest::DoubleWord { .. } => cr.with_pg(false),
            ProgramRequest::FastRow { .. } => cr.with_fstpg(false),
        });

        if result.is_err() {
            warn!("flash: programming at {:#x} failed", request.address());
        }
        result
    }

    /// Erases the whole flash bank or a range of pages.
    ///
    /// Pages are erased in ascending order. Erasing stops at the first page
    /// that fails, which is reported in [`EraseError::page`]; pages after it
    /// are not touched.
    ///
    /// `PER` is cleared after a page erase and `MER1` after a mass erase,
    /// also when the erase failed. A `MER1` left set would turn the next page
    /// erase into a mass erase request.
    ///
    /// The flash must be unlocked.
    /// Fails with [`FlashError::Busy`] if another operation is in progress.
    pub fn erase(&mut self, request: EraseRequest) -> Result<(), EraseError> {
        let state = self.state;
        let _lock = state.try_lock()?;
        state.reset_errors();

        let timeout = self.config.timeout;
        self.wait(timeout)?;

        match request {
            EraseRequest::Mass => {
                debug!("flash: mass erase");
                state.begin_mass_erase();
                self.mass_erase();
                let result = self.wait(timeout);
                self.regs.modify_cr(|cr| cr.with_mer1(false));
                result?;
            }
            EraseRequest::Pages { start, count } => {
                debug!("flash: erase {} pages from page {}", count, start);
                let mut failed = None;
                for offset in 0..count {
                    let page = start.wrapping_add(offset);
                    state.begin_page_erase(page, count - offset);

                    self.page_erase(page);
                    if let Err(error) = self.wait(timeout) {
                        failed = Some(EraseError { error, page: Some(page) });
                        break;
                    }
                }

                // Also when interrupted.
                self.regs.modify_cr(|cr| cr.with_per(false));

                if let Some(err) = failed {
                    warn!("flash: erase of page {} failed", err.page);
                    return Err(err);
                }
            }
        }

        Ok(())
    }
}

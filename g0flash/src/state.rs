//! Shared operation state.

use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicU8, Ordering};

use crate::status::{ErrorFlags, FlashError};

/// Category of the flash operation in progress.
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Procedure {
    /// No operation.
    None = 0,
    /// Page erase.
    PageErase = 1,
    /// Mass erase.
    MassErase = 2,
    /// Double-word or fast row programming.
    Program = 3,
}

impl Procedure {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::PageErase,
            2 => Self::MassErase,
            3 => Self::Program,
            _ => Self::None,
        }
    }
}

/// State shared by all users of one flash peripheral.
///
/// Holds the advisory operation lock and the error flags latched by the
/// last operation. Create it once as a `static` and pass it to every
/// [`Flash`](crate::Flash) handle.
///
/// Only load and store atomics are used, since Cortex-M0+ lacks
/// compare-and-swap. The lock's test-and-set runs in a critical section.
pub struct OperationState {
    locked: AtomicBool,
    error_code: AtomicU32,
    procedure: AtomicU8,
    address: AtomicU32,
    page: AtomicU16,
    remaining_pages: AtomicU16,
}

impl OperationState {
    /// Creates an unlocked state without errors.
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
            error_code: AtomicU32::new(0),
            procedure: AtomicU8::new(Procedure::None as u8),
            address: AtomicU32::new(0),
            page: AtomicU16::new(0),
            remaining_pages: AtomicU16::new(0),
        }
    }

    /// Acquires the operation lock without blocking.
    ///
    /// Fails with [`FlashError::Busy`] if it is already held.
    pub fn try_lock(&self) -> Result<LockGuard<'_>, FlashError> {
        let acquired = critical_section::with(|_cs| {
            if self.locked.load(Ordering::Relaxed) {
                false
            } else {
                self.locked.store(true, Ordering::Relaxed);
                true
            }
        });

        if acquired {
            Ok(LockGuard { state: self })
        } else {
            debug!("flash: operation lock busy");
            Err(FlashError::Busy)
        }
    }

    /// Whether the operation lock is held.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    /// Error flags latched since the start of the last operation.
    pub fn error_code(&self) -> ErrorFlags {
        ErrorFlags(self.error_code.load(Ordering::Acquire))
    }

    /// Operation in progress.
    pub fn procedure(&self) -> Procedure {
        Procedure::from_u8(self.procedure.load(Ordering::Acquire))
    }

    /// Address of the program operation in progress.
    pub fn address(&self) -> u32 {
        self.address.load(Ordering::Acquire)
    }

    /// Page currently being erased.
    pub fn page(&self) -> u16 {
        self.page.load(Ordering::Acquire)
    }

    /// Pages left to erase, including the current one.
    pub fn remaining_pages(&self) -> u16 {
        self.remaining_pages.load(Ordering::Acquire)
    }
}

impl OperationState {
    pub(crate) fn reset_errors(&self) {
        self.error_code.store(0, Ordering::Release);
    }

    pub(crate) fn latch(&self, errors: ErrorFlags) {
        let old = self.error_code.load(Ordering::Acquire);
        self.error_code.store(old | errors.bits(), Ordering::Release);
    }

    pub(crate) fn begin_program(&self, address: u32) {
        self.address.store(address, Ordering::Release);
        self.procedure.store(Procedure::Program as u8, Ordering::Release);
    }

    pub(crate) fn begin_mass_erase(&self) {
        self.procedure.store(Procedure::MassErase as u8, Ordering::Release);
    }

    pub(crate) fn begin_page_erase(&self, page: u16, remaining: u16) {
        self.page.store(page, Ordering::Release);
        self.remaining_pages.store(remaining, Ordering::Release);
        self.procedure.store(Procedure::PageErase as u8, Ordering::Release);
    }
}

impl Default for OperationState {
    fn default() -> Self {
        Self::new()
    }
}

/// Held operation lock.
///
/// Dropping it releases the lock and resets the procedure.
pub struct LockGuard<'a> {
    state: &'a OperationState,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.state.procedure.store(Procedure::None as u8, Ordering::Release);
        self.state.remaining_pages.store(0, Ordering::Release);
        self.state.locked.store(false, Ordering::Release);
    }
}

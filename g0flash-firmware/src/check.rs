//! Flash bring-up check.

use core::ptr;

use defmt::Format;
use g0flash::{
    AddressError, EraseError, Flash, FlashError, FlashRegisters, InterruptMask, Layout, ProgramRequest, TickSource,
};

/// Value programmed by the double-word check.
pub const PATTERN: u64 = 0x1122_3344_5566_7788;

/// Check failure.
#[derive(Clone, Copy, PartialEq, Eq, Format)]
pub enum Failure {
    /// Invalid scratch area.
    Address(AddressError),
    /// Flash operation failed.
    Flash(FlashError),
    /// Erase failed.
    Erase(EraseError),
    /// Read back value differs.
    Verify { addr: u32, expected: u32, actual: u32 },
}

impl From<AddressError> for Failure {
    fn from(err: AddressError) -> Self {
        Self::Address(err)
    }
}

impl From<FlashError> for Failure {
    fn from(err: FlashError) -> Self {
        Self::Flash(err)
    }
}

impl From<EraseError> for Failure {
    fn from(err: EraseError) -> Self {
        Self::Erase(err)
    }
}

fn read(addr: u32) -> u32 {
    unsafe { ptr::read_volatile(addr as *const u32) }
}

fn verify(addr: u32, expected: u32) -> Result<(), Failure> {
    let actual = read(addr);
    if actual != expected {
        return Err(Failure::Verify { addr, expected, actual });
    }
    Ok(())
}

/// Erases the scratch pages at the end of flash, programs a double word into
/// them and reads it back.
///
/// The flash is locked again on all paths.
pub fn run<R, T, M>(flash: &mut Flash<'_, R, T, M>, layout: &Layout, scratch_pages: u16) -> Result<(), Failure>
where
    R: FlashRegisters,
    T: TickSource,
    M: InterruptMask,
{
    if flash.is_locked() {
        flash.unlock()?;
    }
    if flash.is_locked() {
        defmt::error!("flash: key sequence did not unlock");
        return Err(Failure::Flash(FlashError::Error));
    }

    let result = program_scratch(flash, layout, scratch_pages);
    flash.lock()?;
    result
}

fn program_scratch<R, T, M>(flash: &mut Flash<'_, R, T, M>, layout: &Layout, scratch_pages: u16) -> Result<(), Failure>
where
    R: FlashRegisters,
    T: TickSource,
    M: InterruptMask,
{
    let first = layout.page_count().saturating_sub(scratch_pages);
    let request = layout.pages(first, scratch_pages)?;
    let base = Layout::page_address(first);

    defmt::info!("erasing {} pages from {:#x}", scratch_pages, base);
    flash.erase(request)?;
    verify(base, 0xffff_ffff)?;

    defmt::info!("programming double word");
    flash.program(ProgramRequest::DoubleWord { address: layout.double_word(base)?, data: PATTERN })?;
    verify(base, PATTERN as u32)?;
    verify(base + 4, (PATTERN >> 32) as u32)?;

    defmt::info!("erasing scratch pages again");
    flash.erase(request)?;
    verify(base, 0xffff_ffff)?;

    Ok(())
}

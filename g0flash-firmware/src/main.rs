//
// g0flash: flash program and erase driver for STM32G0 microcontrollers
// Copyright (C) 2024 The g0flash developers
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//

//! g0flash bring-up firmware.
//!
//! Exercises the flash driver on the target: erases scratch pages at the end
//! of flash, programs them and verifies the result.

#![no_std]
#![no_main]

mod board;
mod boards;
mod check;

use defmt_rtt as _;
use panic_probe as _;

use cortex_m::peripheral::syst::SystClkSource;
use cortex_m_rt::entry;
use defmt::unwrap;
use stm32g0::stm32g071::Peripherals;

use g0flash::{CriticalSectionMask, Flash, Layout, OperationState};

use crate::board::Board;

type BoardImpl = boards::Chosen;

/// Flash operation state.
static STATE: OperationState = OperationState::new();

#[entry]
fn main() -> ! {
    let mut board = BoardImpl::new();
    defmt::info!("g0flash firmware {} on {}", env!("CARGO_PKG_VERSION"), board.model());

    let dp = unwrap!(Peripherals::take());
    let mut cp = unwrap!(cortex_m::Peripherals::take());

    // Flash timeout clock.
    cp.SYST.set_clock_source(SystClkSource::Core);
    cp.SYST.set_reload(BoardImpl::CPU_CLOCK / BoardImpl::TICK_HZ - 1);
    cp.SYST.clear_current();
    cp.SYST.enable_counter();

    let layout = Layout::from_device();
    defmt::info!("flash size {} KiB with {} pages", layout.size() / 1024, layout.page_count());

    let mut flash = Flash::new(&STATE, dp.FLASH, cp.SYST, CriticalSectionMask);
    match check::run(&mut flash, &layout, BoardImpl::SCRATCH_PAGES) {
        Ok(()) => {
            defmt::info!("flash check passed");
            board.led(true);
        }
        Err(failure) => defmt::error!("flash check failed: {}", failure),
    }

    loop {
        cortex_m::asm::wfi();
    }
}

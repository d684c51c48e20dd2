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

//! STM32G0 flash driver.
//!
//! Sequences page erase, mass erase, double-word programming and fast row
//! programming of the embedded flash memory.
//!
//! Every public operation is bracketed by the same protocol:
//!
//! 1. acquire the advisory operation lock of the shared [`OperationState`],
//! 2. reset the accumulated [`ErrorFlags`],
//! 3. wait for a previous operation to finish,
//! 4. start the operation,
//! 5. wait for its completion, latching hardware error flags,
//! 6. clear the control bit that started it,
//! 7. release the lock.
//!
//! The hardware is reached through the [`FlashRegisters`], [`TickSource`] and
//! [`InterruptMask`] traits. Enable the `stm32g071` feature for implementations
//! backed by the device peripherals.
//!
//! ```ignore
//! static STATE: OperationState = OperationState::new();
//!
//! let mut flash = Flash::new(&STATE, dp.FLASH, cp.SYST, CriticalSectionMask);
//! let layout = Layout::from_device();
//!
//! flash.unlock()?;
//! flash.erase(layout.pages(60, 2)?)?;
//! flash.program(ProgramRequest::DoubleWord { address: layout.double_word(0x0801_E000)?, data: 0x1122_3344_5566_7788 })?;
//! flash.lock()?;
//! ```

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod flash;
pub mod irq;
pub mod layout;
pub mod regs;
pub mod state;
pub mod status;
pub mod tick;

#[cfg(feature = "stm32g071")]
pub mod stm32g071;

#[cfg(test)]
mod sim;

pub use flash::{Config, EraseError, Flash, ProgramRequest, Timeout};
pub use irq::{CriticalSectionMask, InterruptMask};
pub use layout::{AddressError, DoubleWordAddr, EraseRequest, Layout, RowAddr};
pub use regs::FlashRegisters;
pub use state::{LockGuard, OperationState, Procedure};
pub use status::{ErrorFlags, FlashError};
pub use tick::TickSource;

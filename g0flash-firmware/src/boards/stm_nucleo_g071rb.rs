//! ST NUCLEO-G071RB board.

use crate::board::Board;

/// NUCLEO-G071RB.
pub struct BoardImpl;

impl Board for BoardImpl {
    const SCRATCH_PAGES: u16 = 4;

    fn new() -> Self {
        Self
    }

    fn model(&self) -> &'static str {
        "stm_nucleo_g071rb"
    }

    fn led(&mut self, on: bool) {
        // LD4 on PA5.
        let dp = unsafe { stm32g0::stm32g071::Peripherals::steal() };
        dp.RCC.iopenr.modify(|r, w| unsafe { w.bits(r.bits() | 1) });
        dp.GPIOA.moder.modify(|r, w| unsafe { w.bits((r.bits() & !(0b11 << 10)) | (0b01 << 10)) });
        dp.GPIOA.bsrr.write(|w| unsafe { w.bits(if on { 1 << 5 } else { 1 << (5 + 16) }) });
    }
}

//! STM32G071 flash peripheral.

use core::ptr;

use stm32g0::stm32g071::FLASH;

use crate::regs::{Cr, Eccr, FlashRegisters, Sr};

impl FlashRegisters for FLASH {
    fn read_cr(&self) -> Cr {
        Cr(self.cr.read().bits())
    }

    fn write_cr(&mut self, cr: Cr) {
        self.cr.write(|w| unsafe { w.bits(cr.0) });
    }

    fn read_sr(&self) -> Sr {
        Sr(self.sr.read().bits())
    }

    fn write_sr(&mut self, sr: Sr) {
        self.sr.write(|w| unsafe { w.bits(sr.0) });
    }

    fn read_eccr(&self) -> Eccr {
        Eccr(self.eccr.read().bits())
    }

    fn write_eccr(&mut self, eccr: Eccr) {
        self.eccr.write(|w| unsafe { w.bits(eccr.0) });
    }

    fn write_keyr(&mut self, key: u32) {
        self.keyr.write(|w| unsafe { w.bits(key) });
    }

    unsafe fn write_word(&mut self, addr: u32, word: u32) {
        ptr::write_volatile(addr as *mut u32, word);
    }
}

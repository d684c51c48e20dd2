//! Flash register block.
//!
//! Register values are plain `u32` newtypes with one accessor pair per field,
//! so read-modify-write sequences stay typed:
//!
//! ```ignore
//! regs.modify_cr(|cr| cr.with_pnb(page).with_per(true).with_strt(true));
//! ```

use crate::status::ErrorFlags;

/// Key to write first into the key register for unlocking.
pub const KEY1: u32 = 0x4567_0123;

/// Key to write second into the key register for unlocking.
pub const KEY2: u32 = 0xCDEF_89AB;

macro_rules! bit {
    ($get:ident, $set:ident, $bit:expr, $doc:literal) => {
        #[doc = $doc]
        pub const fn $get(&self) -> bool {
            self.0 & (1 << $bit) != 0
        }

        #[doc = $doc]
        #[must_use]
        pub const fn $set(self, value: bool) -> Self {
            if value {
                Self(self.0 | (1 << $bit))
            } else {
                Self(self.0 & !(1 << $bit))
            }
        }
    };
}

/// Control register (FLASH_CR).
#[repr(transparent)]
#[derive(Default, Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cr(pub u32);

impl Cr {
    /// Page number field offset.
    pub const PNB_OFFSET: u32 = 3;

    /// Page number field mask (unshifted).
    ///
    /// Covers the widest page number of the series; unused high bits
    /// are reserved and written as zero.
    pub const PNB_MASK: u32 = 0x3ff;

    bit!(pg, with_pg, 0, "Programming.");
    bit!(per, with_per, 1, "Page erase.");
    bit!(mer1, with_mer1, 2, "Mass erase.");
    bit!(strt, with_strt, 16, "Start erase operation.");
    bit!(fstpg, with_fstpg, 18, "Fast programming.");
    bit!(eopie, with_eopie, 24, "End of operation interrupt enable.");
    bit!(optlock, with_optlock, 30, "Options lock.");
    bit!(lock, with_lock, 31, "Control register lock.");

    /// Page number selected for erase.
    pub const fn pnb(&self) -> u16 {
        ((self.0 >> Self::PNB_OFFSET) & Self::PNB_MASK) as u16
    }

    /// Replaces the page number selected for erase.
    #[must_use]
    pub const fn with_pnb(self, page: u16) -> Self {
        let cleared = self.0 & !(Self::PNB_MASK << Self::PNB_OFFSET);
        Self(cleared | ((page as u32 & Self::PNB_MASK) << Self::PNB_OFFSET))
    }
}

/// Status register (FLASH_SR).
///
/// Error flags and `EOP` are cleared by writing one.
#[repr(transparent)]
#[derive(Default, Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sr(pub u32);

impl Sr {
    bit!(eop, with_eop, 0, "End of operation.");
    bit!(bsy1, with_bsy1, 16, "Busy.");

    /// Error flags that are set.
    pub const fn errors(&self) -> ErrorFlags {
        ErrorFlags(self.0 & ErrorFlags::SR_ERRORS)
    }
}

/// ECC register (FLASH_ECCR).
///
/// `ECCC` is cleared by writing one.
#[repr(transparent)]
#[derive(Default, Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Eccr(pub u32);

impl Eccr {
    bit!(eccc, with_eccc, 30, "ECC single error corrected.");

    /// Address of the double word where the ECC error occurred.
    pub const fn addr_ecc(&self) -> u16 {
        (self.0 & 0x3fff) as u16
    }

    /// Correction flag as error flags.
    pub const fn correction(&self) -> ErrorFlags {
        ErrorFlags(self.0 & ErrorFlags::ECCC)
    }
}

/// Access to the flash peripheral.
///
/// Implementations provide raw register access and word writes into the
/// flash memory array. Field semantics are handled by the driver.
pub trait FlashRegisters {
    /// Reads the control register.
    fn read_cr(&self) -> Cr;

    /// Writes the control register.
    fn write_cr(&mut self, cr: Cr);

    /// Reads the status register.
    fn read_sr(&self) -> Sr;

    /// Writes the status register.
    fn write_sr(&mut self, sr: Sr);

    /// Reads the ECC register.
    fn read_eccr(&self) -> Eccr;

    /// Writes the ECC register.
    fn write_eccr(&mut self, eccr: Eccr);

    /// Writes the key register.
    fn write_keyr(&mut self, key: u32);

    /// Writes a word into flash memory.
    ///
    /// # Safety
    /// `addr` must be word-aligned and located inside flash memory.
    unsafe fn write_word(&mut self, addr: u32, word: u32);

    /// Reads, modifies and writes back the control register.
    fn modify_cr(&mut self, f: impl FnOnce(Cr) -> Cr) {
        let cr = self.read_cr();
        self.write_cr(f(cr));
    }

    /// Reads, modifies and writes back the ECC register.
    fn modify_eccr(&mut self, f: impl FnOnce(Eccr) -> Eccr) {
        let eccr = self.read_eccr();
        self.write_eccr(f(eccr));
    }
}

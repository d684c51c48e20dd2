//! Operation status and hardware error flags.

use displaydoc::Display;

/// Failure of a flash operation.
///
/// Together with `Ok(())` this forms the closed set of outcomes every
/// flash operation reports.
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// flash operation failed with a hardware error
    Error,
    /// flash operation already in progress
    Busy,
    /// flash operation timed out
    Timeout,
}

/// Latched hardware error flags.
///
/// Bits are located at their positions in the flash status register,
/// except [`ECCC`](Self::ECCC) which is at its position in the ECC register.
#[repr(transparent)]
#[derive(Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ErrorFlags(pub u32);

impl ErrorFlags {
    /// No error.
    pub const NONE: Self = Self(0);

    /// Operation error.
    pub const OPERR: u32 = 1 << 1;

    /// Programming error.
    pub const PROGERR: u32 = 1 << 3;

    /// Write protection error.
    pub const WRPERR: u32 = 1 << 4;

    /// Programming alignment error.
    pub const PGAERR: u32 = 1 << 5;

    /// Size error.
    pub const SIZERR: u32 = 1 << 6;

    /// Programming sequence error.
    pub const PGSERR: u32 = 1 << 7;

    /// Fast programming data miss error.
    pub const MISERR: u32 = 1 << 8;

    /// Fast programming error.
    pub const FASTERR: u32 = 1 << 9;

    /// PCROP read error.
    pub const RDERR: u32 = 1 << 14;

    /// Option and engineering bits loading validity error.
    pub const OPTVERR: u32 = 1 << 15;

    /// ECC single error corrected.
    pub const ECCC: u32 = 1 << 30;

    /// All error flags of the status register.
    pub const SR_ERRORS: u32 = Self::OPERR
        | Self::PROGERR
        | Self::WRPERR
        | Self::PGAERR
        | Self::SIZERR
        | Self::PGSERR
        | Self::MISERR
        | Self::FASTERR
        | Self::RDERR
        | Self::OPTVERR;

    /// Raw bits.
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// No flag is set.
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// All bits of `flags` are set.
    pub const fn contains(&self, flags: u32) -> bool {
        self.0 & flags == flags
    }

    /// Operation error.
    pub const fn is_operation(&self) -> bool {
        self.0 & Self::OPERR != 0
    }

    /// Programming error.
    pub const fn is_programming(&self) -> bool {
        self.0 & Self::PROGERR != 0
    }

    /// Write protection error.
    pub const fn is_write_protection(&self) -> bool {
        self.0 & Self::WRPERR != 0
    }

    /// Programming alignment error.
    pub const fn is_alignment(&self) -> bool {
        self.0 & Self::PGAERR != 0
    }

    /// Size error.
    pub const fn is_size(&self) -> bool {
        self.0 & Self::SIZERR != 0
    }

    /// Programming sequence error.
    pub const fn is_sequence(&self) -> bool {
        self.0 & Self::PGSERR != 0
    }

    /// Fast programming data miss error.
    pub const fn is_fast_miss(&self) -> bool {
        self.0 & Self::MISERR != 0
    }

    /// Fast programming error.
    pub const fn is_fast(&self) -> bool {
        self.0 & Self::FASTERR != 0
    }

    /// PCROP read error.
    pub const fn is_read(&self) -> bool {
        self.0 & Self::RDERR != 0
    }

    /// Option validity error.
    pub const fn is_option_validity(&self) -> bool {
        self.0 & Self::OPTVERR != 0
    }

    /// ECC single error corrected.
    pub const fn is_ecc_corrected(&self) -> bool {
        self.0 & Self::ECCC != 0
    }

    /// Logs the error flags.
    pub fn log(&self) {
        warn!(
            "flash errors:   0x{:08x} {}{}{}{}{}{}{}{}{}{}{}",
            self.0,
            if self.is_operation() { "operation " } else { "" },
            if self.is_programming() { "programming " } else { "" },
            if self.is_write_protection() { "write-protection " } else { "" },
            if self.is_alignment() { "alignment " } else { "" },
            if self.is_size() { "size " } else { "" },
            if self.is_sequence() { "sequence " } else { "" },
            if self.is_fast_miss() { "fast-miss " } else { "" },
            if self.is_fast() { "fast " } else { "" },
            if self.is_read() { "read " } else { "" },
            if self.is_option_validity() { "option-validity " } else { "" },
            if self.is_ecc_corrected() { "ecc-corrected " } else { "" },
        );
    }
}

impl core::ops::BitOr for ErrorFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl core::ops::BitOrAssign for ErrorFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl core::fmt::Debug for ErrorFlags {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "ErrorFlags(0x{:08x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_register_errors_exclude_busy_and_eop() {
        assert_eq!(ErrorFlags::SR_ERRORS & 1, 0);
        assert_eq!(ErrorFlags::SR_ERRORS & (1 << 16), 0);
        assert_eq!(ErrorFlags::SR_ERRORS & ErrorFlags::ECCC, 0);
        assert_eq!(ErrorFlags::SR_ERRORS, 0xc3fa);
    }

    #[test]
    fn accumulates_flags() {
        let mut flags = ErrorFlags::NONE;
        assert!(flags.is_empty());

        flags |= ErrorFlags(ErrorFlags::PROGERR);
        flags |= ErrorFlags(ErrorFlags::ECCC);

        assert!(flags.is_programming());
        assert!(flags.is_ecc_corrected());
        assert!(!flags.is_write_protection());
        assert!(flags.contains(ErrorFlags::PROGERR | ErrorFlags::ECCC));
        assert!(!flags.contains(ErrorFlags::PROGERR | ErrorFlags::WRPERR));
    }

    #[test]
    fn displays_status() {
        assert_eq!(FlashError::Busy.to_string(), "flash operation already in progress");
        assert_eq!(FlashError::Timeout.to_string(), "flash operation timed out");
    }
}

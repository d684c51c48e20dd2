//! Flash memory layout and validated request arguments.

use core::mem::size_of;

use displaydoc::Display;

/// Address of start of flash memory.
pub const START: u32 = 0x0800_0000;

/// Flash page size.
pub const PAGE_SIZE: u32 = 2048;

/// Number of words written by one fast row program.
pub const ROW_WORDS: usize = 32;

/// Size of one fast programming row in bytes.
pub const ROW_SIZE: u32 = (ROW_WORDS * size_of::<u32>()) as u32;

/// Size of one double word in bytes.
pub const DOUBLE_WORD_SIZE: u32 = size_of::<u64>() as u32;

/// Invalid flash address or page range.
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressError {
    /// address 0x{0:08x} is outside flash memory
    OutOfRange(u32),
    /// address 0x{0:08x} is not aligned
    Unaligned(u32),
    /// pages {start}..{end} exceed {page_count} flash pages
    PageRange {
        /// First page.
        start: u16,
        /// End page (exclusive).
        end: u32,
        /// Number of flash pages.
        page_count: u16,
    },
}

/// Flash memory layout of a device.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Layout {
    size: u32,
}

impl Layout {
    /// Layout of a flash bank of `size` bytes.
    pub const fn new(size: u32) -> Self {
        Self { size }
    }

    /// Layout of the running device, read from the flash size register.
    #[cfg(feature = "stm32g071")]
    pub fn from_device() -> Self {
        const FLASHSIZE_BASE: usize = 0x1fff_75e0;
        let size_kb = unsafe { core::ptr::read_volatile(FLASHSIZE_BASE as *const u16) };
        Self::new(u32::from(size_kb) * 1024)
    }

    /// Total flash size.
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Address of end of flash memory (exclusive).
    ///
    /// Returned address is first byte beyond end of flash memory.
    pub const fn end(&self) -> u32 {
        START + self.size
    }

    /// Number of flash pages.
    pub const fn page_count(&self) -> u16 {
        (self.size / PAGE_SIZE) as u16
    }

    /// Whether the address is inside flash memory.
    pub const fn contains(&self, addr: u32) -> bool {
        addr >= START && addr < self.end()
    }

    /// Base address of a flash page.
    pub const fn page_base(addr: u32) -> u32 {
        (addr / PAGE_SIZE) * PAGE_SIZE
    }

    /// Returns true, if the address points to the beginning of a flash page.
    pub const fn is_page_aligned(addr: u32) -> bool {
        addr % PAGE_SIZE == 0
    }

    /// Start address of a flash page.
    pub const fn page_address(page: u16) -> u32 {
        START + page as u32 * PAGE_SIZE
    }

    /// Page containing the address.
    pub fn page_of(&self, addr: u32) -> Result<u16, AddressError> {
        if !self.contains(addr) {
            return Err(AddressError::OutOfRange(addr));
        }
        Ok(((addr - START) / PAGE_SIZE) as u16)
    }

    /// Validates a double-word program address.
    pub fn double_word(&self, addr: u32) -> Result<DoubleWordAddr, AddressError> {
        self.check(addr, DOUBLE_WORD_SIZE)?;
        Ok(DoubleWordAddr(addr))
    }

    /// Validates a fast row program address.
    pub fn row(&self, addr: u32) -> Result<RowAddr, AddressError> {
        self.check(addr, ROW_SIZE)?;
        Ok(RowAddr(addr))
    }

    /// Validates a page erase request.
    pub fn pages(&self, start: u16, count: u16) -> Result<EraseRequest, AddressError> {
        let end = u32::from(start) + u32::from(count);
        if end > u32::from(self.page_count()) {
            return Err(AddressError::PageRange { start, end, page_count: self.page_count() });
        }
        Ok(EraseRequest::Pages { start, count })
    }

    /// Validates a page erase request covering the address range `[from, to)`.
    ///
    /// Both addresses must be page aligned.
    pub fn pages_in(&self, from: u32, to: u32) -> Result<EraseRequest, AddressError> {
        for addr in [from, to] {
            if !Self::is_page_aligned(addr) {
                return Err(AddressError::Unaligned(addr));
            }
        }
        if to < from || to > self.end() {
            return Err(AddressError::OutOfRange(to));
        }
        let start = self.page_of(from)?;
        self.pages(start, ((to - from) / PAGE_SIZE) as u16)
    }

    fn check(&self, addr: u32, size: u32) -> Result<(), AddressError> {
        if addr % size != 0 {
            return Err(AddressError::Unaligned(addr));
        }
        if !self.contains(addr) || addr.checked_add(size).map_or(true, |end| end > self.end()) {
            return Err(AddressError::OutOfRange(addr));
        }
        Ok(())
    }
}

/// Flash address aligned to a double word.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DoubleWordAddr(u32);

impl DoubleWordAddr {
    /// Creates an address without checking it.
    ///
    /// # Safety
    /// `addr` must be 8-byte aligned and the double word must lie inside flash memory.
    pub const unsafe fn new_unchecked(addr: u32) -> Self {
        Self(addr)
    }

    /// Address value.
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// Flash address aligned to a fast programming row.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RowAddr(u32);

impl RowAddr {
    /// Creates an address without checking it.
    ///
    /// # Safety
    /// `addr` must be aligned to [`ROW_SIZE`] and the row must lie inside flash memory.
    pub const unsafe fn new_unchecked(addr: u32) -> Self {
        Self(addr)
    }

    /// Address value.
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// What to erase.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EraseRequest {
    /// Whole flash bank.
    Mass,
    /// `count` pages starting at page `start`.
    ///
    /// Use [`Layout::pages`] to build a request within the device's flash.
    Pages {
        /// First page.
        start: u16,
        /// Number of pages.
        count: u16,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: Layout = Layout::new(128 * 1024);

    #[test]
    fn geometry() {
        assert_eq!(LAYOUT.page_count(), 64);
        assert_eq!(LAYOUT.end(), 0x0802_0000);
        assert_eq!(Layout::page_address(3), 0x0800_1800);
        assert_eq!(Layout::page_base(0x0800_1a34), 0x0800_1800);
        assert!(Layout::is_page_aligned(0x0800_0800));
        assert!(!Layout::is_page_aligned(0x0800_0801));
        assert_eq!(LAYOUT.page_of(0x0800_1fff), Ok(3));
        assert_eq!(LAYOUT.page_of(0x0802_0000), Err(AddressError::OutOfRange(0x0802_0000)));
        assert_eq!(ROW_SIZE, 128);
    }

    #[test]
    fn double_word_alignment() {
        assert_eq!(LAYOUT.double_word(0x0800_0008).map(DoubleWordAddr::get), Ok(0x0800_0008));
        assert_eq!(LAYOUT.double_word(0x0800_0004), Err(AddressError::Unaligned(0x0800_0004)));
        assert_eq!(LAYOUT.double_word(0x0801_fff8).map(DoubleWordAddr::get), Ok(0x0801_fff8));
        assert_eq!(LAYOUT.double_word(0x0802_0000), Err(AddressError::OutOfRange(0x0802_0000)));
        assert_eq!(LAYOUT.double_word(0x0000_0000), Err(AddressError::OutOfRange(0)));
    }

    #[test]
    fn row_alignment() {
        assert!(LAYOUT.row(0x0800_0080).is_ok());
        assert_eq!(LAYOUT.row(0x0800_0040), Err(AddressError::Unaligned(0x0800_0040)));
        assert!(LAYOUT.row(0x0801_ff80).is_ok());
        assert_eq!(LAYOUT.row(0xffff_ff80), Err(AddressError::OutOfRange(0xffff_ff80)));
    }

    #[test]
    fn page_ranges() {
        assert_eq!(LAYOUT.pages(3, 5), Ok(EraseRequest::Pages { start: 3, count: 5 }));
        assert_eq!(LAYOUT.pages(60, 4), Ok(EraseRequest::Pages { start: 60, count: 4 }));
        assert_eq!(LAYOUT.pages(60, 5), Err(AddressError::PageRange { start: 60, end: 65, page_count: 64 }));
        assert!(LAYOUT.pages(u16::MAX, u16::MAX).is_err());
    }

    #[test]
    fn page_ranges_from_addresses() {
        assert_eq!(LAYOUT.pages_in(0x0800_1800, 0x0800_4000), Ok(EraseRequest::Pages { start: 3, count: 5 }));
        assert_eq!(LAYOUT.pages_in(0x0800_1801, 0x0800_4000), Err(AddressError::Unaligned(0x0800_1801)));
        assert_eq!(LAYOUT.pages_in(0x0800_4000, 0x0800_1800), Err(AddressError::OutOfRange(0x0800_1800)));
        assert_eq!(LAYOUT.pages_in(0x0801_f800, 0x0802_0000), Ok(EraseRequest::Pages { start: 63, count: 1 }));
    }

    #[test]
    fn displays_errors() {
        assert_eq!(AddressError::Unaligned(0x0800_0004).to_string(), "address 0x08000004 is not aligned");
        assert_eq!(
            AddressError::PageRange { start: 60, end: 65, page_count: 64 }.to_string(),
            "pages 60..65 exceed 64 flash pages"
        );
    }
}

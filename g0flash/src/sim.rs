//! Simulated flash peripheral for host tests.

use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    rc::Rc,
};

use crate::{
    irq::InterruptMask,
    layout::{Layout, PAGE_SIZE, ROW_WORDS},
    regs::{Cr, Eccr, FlashRegisters, Sr, KEY1, KEY2},
    status::ErrorFlags,
    tick::TickSource,
};

/// Flash peripheral model.
///
/// Starts locked. Operations start on the control register write with `STRT`
/// (erase) or on the last word written (program) and then report busy for
/// [`busy_polls`](Self::busy_polls) status register reads.
pub struct SimFlash {
    pub layout: Layout,
    cr: Cr,
    sr: Cell<Sr>,
    eccr: Eccr,
    key_stage: u8,
    /// Key register writes.
    pub keys: Vec<u32>,
    /// Wrong key sequence seen; locked until reset.
    pub key_error: bool,
    /// Flash words that are not erased.
    pub memory: BTreeMap<u32, u32>,
    /// Flash word writes in order, with the interrupt mask state at the time of write.
    pub writes: Vec<(u32, u32, bool)>,
    /// Pages erased in order.
    pub erased_pages: Vec<u16>,
    /// Number of mass erases.
    pub mass_erases: usize,
    /// Control register writes in order.
    pub cr_writes: Vec<Cr>,
    /// Status register reads reporting busy after an operation start.
    pub busy_polls: u32,
    /// Busy flag never clears.
    pub stuck: bool,
    /// Fail the page erase with this index (counted from zero) with the given status flags.
    pub fail_erase: Option<(usize, u32)>,
    /// Status flags set by every program operation.
    pub fail_program: u32,
    /// Set ECC correction flag when an operation completes.
    pub ecc_correction: bool,
    /// Report busy on every status register read after the ECC register was read.
    pub busy_after_check: bool,
    /// Probe of the interrupt mask.
    pub mask: Option<SimMask>,
    /// Called on every status register read.
    pub on_poll: RefCell<Option<Box<dyn FnMut()>>>,
    pending_busy: Cell<u32>,
    checked: Cell<bool>,
    accesses: Cell<usize>,
    page_erases: usize,
    words_in_op: usize,
}

impl SimFlash {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            cr: Cr::default().with_lock(true).with_optlock(true),
            sr: Cell::new(Sr::default()),
            eccr: Eccr::default(),
            key_stage: 0,
            keys: Vec::new(),
            key_error: false,
            memory: BTreeMap::new(),
            writes: Vec::new(),
            erased_pages: Vec::new(),
            mass_erases: 0,
            cr_writes: Vec::new(),
            busy_polls: 2,
            stuck: false,
            fail_erase: None,
            fail_program: 0,
            ecc_correction: false,
            busy_after_check: false,
            mask: None,
            on_poll: RefCell::new(None),
            pending_busy: Cell::new(0),
            checked: Cell::new(false),
            accesses: Cell::new(0),
            page_erases: 0,
            words_in_op: 0,
        }
    }

    /// Unlocked peripheral.
    pub fn unlocked(layout: Layout) -> Self {
        let mut this = Self::new(layout);
        this.cr = this.cr.with_lock(false);
        this
    }

    /// Number of register and memory accesses.
    pub fn accesses(&self) -> usize {
        self.accesses.get()
    }

    /// Current control register value.
    pub fn cr(&self) -> Cr {
        self.cr
    }

    /// Current status register value.
    pub fn sr(&self) -> Sr {
        self.sr.get()
    }

    /// Current ECC register value.
    pub fn eccr(&self) -> Eccr {
        self.eccr
    }

    /// Marks the peripheral busy, as if an operation had been started before.
    pub fn set_busy(&mut self, polls: u32) {
        self.pending_busy.set(polls);
    }

    /// Raises status flags.
    pub fn raise(&mut self, flags: u32) {
        self.sr.set(Sr(self.sr.get().0 | flags));
    }

    fn touch(&self) {
        self.accesses.set(self.accesses.get() + 1);
    }

    fn start(&mut self, flags: u32) {
        self.pending_busy.set(self.busy_polls);
        self.sr.set(Sr(self.sr.get().0 | flags));
        if self.ecc_correction {
            self.eccr = self.eccr.with_eccc(true);
        }
    }

    fn erase_page(&mut self, page: u16) {
        let from = Layout::page_address(page);
        self.memory.retain(|&addr, _| addr < from || addr >= from + PAGE_SIZE);
    }
}

impl FlashRegisters for SimFlash {
    fn read_cr(&self) -> Cr {
        self.touch();
        self.cr
    }

    fn write_cr(&mut self, cr: Cr) {
        self.touch();
        if self.cr.lock() {
            return;
        }
        self.cr_writes.push(cr);
        self.cr = cr;

        if cr.strt() {
            self.cr = self.cr.with_strt(false);
            if cr.mer1() {
                self.mass_erases += 1;
                self.memory.clear();
                self.start(0);
            } else if cr.per() {
                let index = self.page_erases;
                self.page_erases += 1;
                self.erased_pages.push(cr.pnb());
                match self.fail_erase {
                    Some((fail, flags)) if fail == index => self.start(flags),
                    _ => {
                        self.erase_page(cr.pnb());
                        self.start(0);
                    }
                }
            } else {
                self.start(ErrorFlags::PGSERR);
            }
        }
    }

    fn read_sr(&self) -> Sr {
        self.touch();
        if let Some(on_poll) = self.on_poll.borrow_mut().as_mut() {
            on_poll();
        }

        let pending = self.pending_busy.get();
        let busy = self.stuck || pending > 0 || (self.busy_after_check && self.checked.get());
        if pending > 0 {
            self.pending_busy.set(pending - 1);
        }
        self.sr.get().with_bsy1(busy)
    }

    fn write_sr(&mut self, sr: Sr) {
        self.touch();
        let clear = sr.0 & (ErrorFlags::SR_ERRORS | 1);
        self.sr.set(Sr(self.sr.get().0 & !clear));
    }

    fn read_eccr(&self) -> Eccr {
        self.touch();
        self.checked.set(true);
        self.eccr
    }

    fn write_eccr(&mut self, eccr: Eccr) {
        self.touch();
        let clear = eccr.0 & 0xc000_0000;
        self.eccr = Eccr((self.eccr.0 & !clear & 0xc000_0000) | (eccr.0 & !0xc000_0000));
    }

    fn write_keyr(&mut self, key: u32) {
        self.touch();
        self.keys.push(key);
        match (self.key_stage, key) {
            (0, KEY1) => self.key_stage = 1,
            (1, KEY2) => {
                self.key_stage = 0;
                if !self.key_error {
                    self.cr = self.cr.with_lock(false);
                }
            }
            _ => {
                self.key_stage = 0;
                self.key_error = true;
            }
        }
    }

    unsafe fn write_word(&mut self, addr: u32, word: u32) {
        self.touch();
        let masked = self.mask.as_ref().map(SimMask::is_masked).unwrap_or_default();
        self.writes.push((addr, word, masked));
        assert!(self.layout.contains(addr) && addr % 4 == 0, "invalid flash write at 0x{addr:08x}");

        if self.cr.lock() || !(self.cr.pg() || self.cr.fstpg()) {
            self.start(ErrorFlags::PGSERR);
            return;
        }

        self.memory.insert(addr, word);
        self.words_in_op += 1;
        let words = if self.cr.fstpg() { ROW_WORDS } else { 2 };
        if self.words_in_op == words {
            self.words_in_op = 0;
            self.start(self.fail_program);
        }
    }
}

/// Tick source that elapses every `period` polls.
#[derive(Default)]
pub struct SimTicks {
    /// Polls per tick; zero means time stands still.
    pub period: u32,
    /// Ticks reported.
    pub observed: u32,
    /// Number of clears.
    pub cleared: u32,
    polls: u32,
}

impl SimTicks {
    pub fn every(period: u32) -> Self {
        Self { period, ..Default::default() }
    }
}

impl TickSource for SimTicks {
    fn clear(&mut self) {
        self.cleared += 1;
        self.polls = 0;
    }

    fn elapsed(&mut self) -> bool {
        if self.period == 0 {
            return false;
        }
        self.polls += 1;
        if self.polls == self.period {
            self.polls = 0;
            self.observed += 1;
            true
        } else {
            false
        }
    }
}

/// Interrupt mask model.
///
/// Clones share state, so a clone can be handed to [`SimFlash`] as probe.
#[derive(Default, Clone)]
pub struct SimMask {
    masked: Rc<Cell<bool>>,
    entered: Rc<Cell<usize>>,
}

impl SimMask {
    pub fn is_masked(&self) -> bool {
        self.masked.get()
    }

    pub fn set_masked(&self, masked: bool) {
        self.masked.set(masked);
    }

    /// Number of critical sections entered.
    pub fn entered(&self) -> usize {
        self.entered.get()
    }
}

impl InterruptMask for SimMask {
    type State = bool;

    fn save_and_disable(&mut self) -> bool {
        self.entered.set(self.entered.get() + 1);
        self.masked.replace(true)
    }

    fn restore(&mut self, state: bool) {
        self.masked.set(state);
    }
}

//! Interrupt masking.

/// Save and restore of the global interrupt mask.
pub trait InterruptMask {
    /// Saved mask state.
    type State: Copy;

    /// Saves the current interrupt mask and disables interrupts.
    fn save_and_disable(&mut self) -> Self::State;

    /// Restores a previously saved interrupt mask.
    fn restore(&mut self, state: Self::State);
}

/// Interrupt mask implemented by the `critical-section` provider.
///
/// On single-core Cortex-M (`cortex-m/critical-section-single-core`)
/// this saves and disables PRIMASK.
#[derive(Default, Clone, Copy, Debug)]
pub struct CriticalSectionMask;

impl InterruptMask for CriticalSectionMask {
    type State = critical_section::RestoreState;

    fn save_and_disable(&mut self) -> Self::State {
        unsafe { critical_section::acquire() }
    }

    fn restore(&mut self, state: Self::State) {
        unsafe { critical_section::release(state) }
    }
}

/// Interrupts masked until dropped.
///
/// The saved mask is restored on every exit path.
pub struct Masked<'a, M: InterruptMask> {
    mask: &'a mut M,
    state: M::State,
}

impl<'a, M: InterruptMask> Masked<'a, M> {
    /// Saves the mask and disables interrupts.
    pub fn new(mask: &'a mut M) -> Self {
        let state = mask.save_and_disable();
        Self { mask, state }
    }
}

impl<M: InterruptMask> Drop for Masked<'_, M> {
    fn drop(&mut self) {
        self.mask.restore(self.state);
    }
}

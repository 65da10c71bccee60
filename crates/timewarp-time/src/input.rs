//! Input capability consumed by the speed sampler

use timewarp_core::ModifierSet;

/// Something that can report which modifier keys are held right now
pub trait ModifierSource: Send {
    /// Poll the current modifier state
    fn poll(&mut self) -> ModifierSet;
}

/// Input source used when no real input is available: nothing is ever held,
/// so the sampler publishes real time
#[derive(Clone, Copy, Debug, Default)]
pub struct NoInput;

impl ModifierSource for NoInput {
    fn poll(&mut self) -> ModifierSet {
        ModifierSet::empty()
    }
}

impl<F> ModifierSource for F
where
    F: FnMut() -> ModifierSet + Send,
{
    fn poll(&mut self) -> ModifierSet {
        self()
    }
}

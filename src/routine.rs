//! Routine — the resumable body behind a task
//!
//! A routine runs until it reaches its single suspension point and returns
//! control to the scheduler. Any state that must survive to the next
//! activation lives in the routine value itself (closure captures or the
//! fields of a hand-written state machine), never on a hidden stack.
//!
//! Author: Moroya Sakamoto

/// Outcome of one resumption
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Suspended; resume at the next activation
    Yield,
    /// Finished for good. Periodic control tasks are not expected to do this.
    Complete,
}

/// Resumable task body
pub trait Routine {
    /// Run until the next suspension point
    fn resume(&mut self) -> Step;
}

impl<F> Routine for F
where
    F: FnMut() -> Step,
{
    fn resume(&mut self) -> Step {
        self()
    }
}

/// Routine that performs one-time setup on its first resumption
///
/// Mirrors the usual shape of a control task: configure peripherals, then loop
/// forever doing one iteration per activation. The setup result is handed to
/// every subsequent step.
pub struct Staged<S, I, F> {
    phase: Phase<S, I>,
    step: F,
}

enum Phase<S, I> {
    Setup(I),
    Running(S),
    /// Setup panicked mid-transition
    Poisoned,
}

/// Build a [`Staged`] routine
///
/// ```
/// use cotask::{staged, Routine, Step};
///
/// let mut counter = staged(|| 10u32, |n: &mut u32| {
///     *n += 1;
///     Step::Yield
/// });
/// assert_eq!(counter.resume(), Step::Yield);
/// ```
pub fn staged<S, I, F>(setup: I, step: F) -> Staged<S, I, F>
where
    I: FnOnce() -> S,
    F: FnMut(&mut S) -> Step,
{
    Staged {
        phase: Phase::Setup(setup),
        step,
    }
}

impl<S, I, F> Staged<S, I, F> {
    /// Has the setup closure run yet?
    pub fn is_initialized(&self) -> bool {
        matches!(self.phase, Phase::Running(_))
    }
}

impl<S, I, F> Routine for Staged<S, I, F>
where
    I: FnOnce() -> S,
    F: FnMut(&mut S) -> Step,
{
    fn resume(&mut self) -> Step {
        if let Phase::Setup(_) = self.phase {
            if let Phase::Setup(setup) = core::mem::replace(&mut self.phase, Phase::Poisoned) {
                self.phase = Phase::Running(setup());
            }
        }
        match &mut self.phase {
            Phase::Running(state) => (self.step)(state),
            // A setup that unwound cannot be retried
            Phase::Setup(_) | Phase::Poisoned => Step::Complete,
        }
    }
}

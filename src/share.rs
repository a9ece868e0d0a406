//! Share — single-slot value exchanged between tasks
//!
//! Tasks never run concurrently, so a `get` always observes the most recent
//! completed `set`. The slot is a plain `Cell`: no lock, no critical section.
//! `Cell` makes a `Share` `!Sync`, so the compiler refuses to hand one to
//! another thread; porting to a preemptive kernel means replacing the cell.
//!
//! Author: Moroya Sakamoto

use core::cell::Cell;
use core::fmt;

use crate::diag::Resource;

/// Whether callers declare that access must be synchronized
///
/// Under the cooperative scheduler both variants behave identically. The flag
/// is kept so code written for a future preemptive kernel states its intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protection {
    /// Plain access
    #[default]
    Unprotected,
    /// Caller asks for access guarded against preemption (no-op here)
    Protected,
}

/// Named single-value slot
pub struct Share<T: Copy> {
    name: &'static str,
    value: Cell<T>,
    protection: Protection,
}

impl<T: Copy> Share<T> {
    /// Create a share holding `initial`
    pub const fn new(name: &'static str, initial: T) -> Self {
        Self::with_protection(name, initial, Protection::Unprotected)
    }

    /// Create a share with an explicit protection flag
    pub const fn with_protection(name: &'static str, initial: T, protection: Protection) -> Self {
        Self {
            name,
            value: Cell::new(initial),
            protection,
        }
    }

    /// Overwrite the slot
    pub fn set(&self, value: T) {
        self.value.set(value);
    }

    /// Current value
    pub fn get(&self) -> T {
        self.value.get()
    }

    /// Replace the value, returning the previous one
    pub fn replace(&self, value: T) -> T {
        self.value.replace(value)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn protection(&self) -> Protection {
        self.protection
    }
}

impl<T: Copy + Default> Share<T> {
    /// Create a share holding `T::default()`
    pub fn with_default(name: &'static str) -> Self {
        Self::new(name, T::default())
    }
}

impl<T: Copy + fmt::Debug> Resource for Share<T> {
    fn name(&self) -> &str {
        self.name
    }

    fn kind(&self) -> &'static str {
        "share"
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.value.get())
    }
}

impl<T: Copy + fmt::Debug> fmt::Debug for Share<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Share")
            .field("name", &self.name)
            .field("value", &self.value.get())
            .field("protection", &self.protection)
            .finish()
    }
}

//! Time sources — hardware-abstract tick clocks
//!
//! The scheduler itself never reads a clock to decide readiness: the driver
//! passes `now` into every dispatch. A [`Clock`] is only consulted to measure
//! how long a task body ran when profiling is enabled.
//!
//! Author: Moroya Sakamoto

use core::cell::Cell;

/// Scheduler time unit. Periods, activation times and trace stamps all use it.
pub type Ticks = u64;

/// Monotonic tick source
pub trait Clock {
    /// Current time in ticks
    fn now(&self) -> Ticks;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Ticks {
        (**self).now()
    }
}

/// Software timer advanced explicitly by its owner
///
/// Uses interior mutability so task bodies holding a shared reference can
/// simulate time spent working. Like `Share` and `Queue` it is `!Sync`.
pub struct SysTimer {
    /// Current tick count
    ticks: Cell<Ticks>,
    /// Wraparound count
    overflows: Cell<u32>,
}

impl SysTimer {
    /// Software timer starting at tick 0
    pub const fn software() -> Self {
        Self::starting_at(0)
    }

    /// Software timer starting at an arbitrary tick
    pub const fn starting_at(ticks: Ticks) -> Self {
        Self {
            ticks: Cell::new(ticks),
            overflows: Cell::new(0),
        }
    }

    /// Advance time by `ticks`
    pub fn advance(&self, ticks: Ticks) {
        let old = self.ticks.get();
        let new = old.wrapping_add(ticks);
        if new < old {
            self.overflows.set(self.overflows.get() + 1);
        }
        self.ticks.set(new);
    }

    /// Return the current tick and advance by one (driver-loop helper)
    pub fn tick(&self) -> Ticks {
        let now = self.ticks.get();
        self.advance(1);
        now
    }

    /// Reset to zero
    pub fn reset(&self) {
        self.ticks.set(0);
        self.overflows.set(0);
    }

    /// Number of wraparounds
    pub fn overflows(&self) -> u32 {
        self.overflows.get()
    }

    /// Elapsed ticks since a reference point
    pub fn elapsed_since(&self, reference: Ticks) -> Ticks {
        self.ticks.get().wrapping_sub(reference)
    }
}

impl Default for SysTimer {
    fn default() -> Self {
        Self::software()
    }
}

impl Clock for SysTimer {
    fn now(&self) -> Ticks {
        self.ticks.get()
    }
}

/// Host clock: elapsed time since construction, in units of `resolution`
#[cfg(feature = "std")]
pub struct StdClock {
    origin: std::time::Instant,
    resolution: std::time::Duration,
}

#[cfg(feature = "std")]
impl StdClock {
    /// Millisecond ticks
    pub fn millis() -> Self {
        Self::with_resolution(std::time::Duration::from_millis(1))
    }

    /// Microsecond ticks
    pub fn micros() -> Self {
        Self::with_resolution(std::time::Duration::from_micros(1))
    }

    /// Ticks of an arbitrary non-zero resolution
    pub fn with_resolution(resolution: std::time::Duration) -> Self {
        Self {
            origin: std::time::Instant::now(),
            resolution: resolution.max(std::time::Duration::from_nanos(1)),
        }
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now(&self) -> Ticks {
        let elapsed = self.origin.elapsed().as_nanos() / self.resolution.as_nanos();
        Ticks::try_from(elapsed).unwrap_or(Ticks::MAX)
    }
}

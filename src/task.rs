//! Task definition — a named, prioritized, resumable unit of work
//!
//! Each task wraps a [`Routine`] and decides when it is due. Periodic tasks
//! run at a fixed rate anchored to their own previous activation; triggered
//! tasks run whenever their [`Trigger`] has been fired.
//!
//! Author: Moroya Sakamoto

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::diag::{Profile, Resource, TraceLog};
use crate::error::{Error, Result};
use crate::routine::{Routine, Step};
use crate::timer::{Clock, Ticks};

/// Maximum shares and queues a single task can declare
pub const MAX_RESOURCES: usize = 8;

/// Task priority (higher number = higher priority)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Priority(pub u8);

impl Priority {
    /// Background work
    pub const IDLE: Priority = Priority(0);
    /// Logging, telemetry
    pub const LOW: Priority = Priority(1);
    /// Sensor processing
    pub const NORMAL: Priority = Priority(2);
    /// Control loops
    pub const HIGH: Priority = Priority(3);
    /// Nothing outranks this
    pub const CRITICAL: Priority = Priority(u8::MAX);
}

/// Task execution state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting for the next activation
    Waiting,
    /// Due and waiting to be dispatched
    Ready,
    /// Body is executing
    Running,
    /// Body completed; never dispatched again
    Terminated,
}

/// One-shot activation flag for non-periodic tasks
///
/// Atomic so it can be fired from interrupt context. Only load and store are
/// used, which every target with atomics supports.
pub struct Trigger {
    fired: AtomicBool,
}

impl Trigger {
    pub const fn new() -> Self {
        Self {
            fired: AtomicBool::new(false),
        }
    }

    /// Make the associated task ready
    pub fn fire(&self) {
        self.fired.store(true, Ordering::Release);
    }

    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    fn clear(&self) {
        self.fired.store(false, Ordering::Release);
    }
}

impl Default for Trigger {
    fn default() -> Self {
        Self::new()
    }
}

enum Activation<'a> {
    Periodic { period: Ticks, next: Ticks },
    Triggered(&'a Trigger),
}

/// A schedulable task
///
/// The routine and every declared resource are borrowed for `'a`, so they are
/// guaranteed to outlive the task and the scheduler that owns it.
pub struct Task<'a> {
    name: &'static str,
    priority: Priority,
    activation: Activation<'a>,
    state: TaskState,
    body: &'a mut dyn Routine,
    /// Completed dispatches
    runs: u32,
    /// Periodic activations passed over because the task ran late
    skipped: u32,
    profile: Option<Profile>,
    trace: Option<TraceLog>,
    resources: heapless::Vec<&'a dyn Resource, MAX_RESOURCES>,
}

impl<'a> Task<'a> {
    /// Create a fixed-rate task, first due at tick 0
    ///
    /// A zero period is rejected rather than coerced.
    pub fn periodic(
        name: &'static str,
        body: &'a mut dyn Routine,
        priority: Priority,
        period: Ticks,
    ) -> Result<Self> {
        if period == 0 {
            return Err(Error::InvalidPeriod);
        }
        Ok(Self::with_activation(
            name,
            body,
            priority,
            Activation::Periodic { period, next: 0 },
        ))
    }

    /// Create a task that runs each time `trigger` is fired
    pub fn triggered(
        name: &'static str,
        body: &'a mut dyn Routine,
        priority: Priority,
        trigger: &'a Trigger,
    ) -> Self {
        Self::with_activation(name, body, priority, Activation::Triggered(trigger))
    }

    fn with_activation(
        name: &'static str,
        body: &'a mut dyn Routine,
        priority: Priority,
        activation: Activation<'a>,
    ) -> Self {
        Self {
            name,
            priority,
            activation,
            state: TaskState::Waiting,
            body,
            runs: 0,
            skipped: 0,
            profile: None,
            trace: None,
            resources: heapless::Vec::new(),
        }
    }

    /// Move the first activation of a periodic task to `at`
    pub fn starting_at(mut self, at: Ticks) -> Self {
        if let Activation::Periodic { next, .. } = &mut self.activation {
            *next = at;
        }
        self
    }

    /// Record execution time and lateness of every run
    pub fn profiled(mut self) -> Self {
        self.profile = Some(Profile::default());
        self
    }

    /// Keep a bounded log of state transitions
    pub fn traced(mut self) -> Self {
        self.trace = Some(TraceLog::new());
        self
    }

    /// Declare a share or queue this task uses
    pub fn uses(mut self, resource: &'a dyn Resource) -> Result<Self> {
        self.resources
            .push(resource)
            .map_err(|_| Error::TooManyResources)?;
        Ok(self)
    }

    /// Is the task due at `now`?
    pub fn is_ready(&self, now: Ticks) -> bool {
        if self.state == TaskState::Terminated {
            return false;
        }
        match &self.activation {
            Activation::Periodic { next, .. } => now >= *next,
            Activation::Triggered(trigger) => trigger.is_fired(),
        }
    }

    /// Refresh the waiting/ready state for `now` and report readiness
    pub(crate) fn poll(&mut self, now: Ticks) -> bool {
        let ready = self.is_ready(now);
        if ready && self.state == TaskState::Waiting {
            self.transition(now, TaskState::Ready);
        }
        ready
    }

    /// Resume the body once, then schedule the next activation
    ///
    /// `clock` is only read when profiling. Missed periodic activations are
    /// skipped, keeping the task on its initial phase.
    pub fn run_once<C: Clock + ?Sized>(&mut self, now: Ticks, clock: &C) -> Result<()> {
        if self.state == TaskState::Terminated {
            return Err(Error::TaskTerminated { name: self.name });
        }

        let activation = match &self.activation {
            Activation::Periodic { next, .. } => *next,
            Activation::Triggered(trigger) => {
                trigger.clear();
                now
            }
        };

        self.transition(now, TaskState::Running);
        let started = self.profile.as_ref().map(|_| clock.now());
        let step = self.body.resume();
        if let (Some(profile), Some(started)) = (self.profile.as_mut(), started) {
            profile.record(clock.now().saturating_sub(started), now.saturating_sub(activation));
        }
        self.runs = self.runs.wrapping_add(1);

        if step == Step::Complete {
            self.transition(now, TaskState::Terminated);
            log::error!("task {} terminated after {} runs", self.name, self.runs);
            return Err(Error::TaskTerminated { name: self.name });
        }

        let next_state = match &mut self.activation {
            Activation::Periodic { period, next } => {
                *next = next.saturating_add(*period);
                if *next < now {
                    let missed = (now - *next).div_ceil(*period);
                    *next = next.saturating_add(missed.saturating_mul(*period));
                    self.skipped = self.skipped.saturating_add(missed as u32);
                    log::warn!("task {} late at {}, skipped {} activations", self.name, now, missed);
                }
                if *next <= now {
                    TaskState::Ready
                } else {
                    TaskState::Waiting
                }
            }
            Activation::Triggered(trigger) => {
                if trigger.is_fired() {
                    TaskState::Ready
                } else {
                    TaskState::Waiting
                }
            }
        };
        self.transition(now, next_state);
        Ok(())
    }

    fn transition(&mut self, at: Ticks, state: TaskState) {
        log::trace!("{}: {:?} -> {:?} at {}", self.name, self.state, state, at);
        self.state = state;
        if let Some(trace) = self.trace.as_mut() {
            trace.record(at, state);
        }
    }

    /// Clear run counters and timing statistics
    pub fn reset_profile(&mut self) {
        self.runs = 0;
        self.skipped = 0;
        if let Some(profile) = self.profile.as_mut() {
            profile.reset();
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Period in ticks (`None` for triggered tasks)
    pub fn period(&self) -> Option<Ticks> {
        match &self.activation {
            Activation::Periodic { period, .. } => Some(*period),
            Activation::Triggered(_) => None,
        }
    }

    /// Next activation time (`None` for triggered tasks)
    pub fn next_activation(&self) -> Option<Ticks> {
        match &self.activation {
            Activation::Periodic { next, .. } => Some(*next),
            Activation::Triggered(_) => None,
        }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state == TaskState::Terminated
    }

    pub fn run_count(&self) -> u32 {
        self.runs
    }

    pub fn skipped(&self) -> u32 {
        self.skipped
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn trace(&self) -> Option<&TraceLog> {
        self.trace.as_ref()
    }

    /// Shares and queues declared with [`Task::uses`]
    pub fn resources(&self) -> impl Iterator<Item = &'a dyn Resource> + '_ {
        self.resources.iter().copied()
    }
}

impl fmt::Display for Task<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<16} {:>4} ", self.name, self.priority.0)?;
        match self.period() {
            Some(period) => write!(f, "{:>8} ", period)?,
            None => write!(f, "{:>8} ", "trig")?,
        }
        write!(f, "{:>8} ", self.runs)?;
        match &self.profile {
            Some(p) => write!(
                f,
                "{:>8} {:>8} {:>8} ",
                p.avg_duration(),
                p.max_duration,
                p.avg_lateness()
            )?,
            None => write!(f, "{:>8} {:>8} {:>8} ", "-", "-", "-")?,
        }
        write!(f, "{:>7} {:?}", self.skipped, self.state)
    }
}

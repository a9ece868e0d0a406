//! Cooperative priority scheduler
//!
//! Each dispatch scans the whole task table fresh, so the choice always
//! reflects current readiness. O(n) per dispatch is fine for the handful of
//! tasks a control loop runs.
//!
//! Author: Moroya Sakamoto

use core::fmt;

use crate::error::{Error, Result};
use crate::task::{Priority, Task, TaskState};
use crate::timer::{Clock, Ticks};

/// Default task table size
pub const MAX_TASKS: usize = 16;

/// Registration index of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(usize);

impl TaskId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// How a ready task is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Policy {
    /// Highest priority wins, earliest registration breaks ties
    #[default]
    Priority,
    /// First ready task after the one that ran last, priority ignored
    RoundRobin,
}

/// A task that was resumed by [`Scheduler::dispatch_once`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    pub id: TaskId,
    pub name: &'static str,
}

/// Cooperative scheduler
///
/// Owns a fixed-size task table, no dynamic allocation. `C` is only read to
/// time profiled task bodies.
pub struct Scheduler<'a, C: Clock, const N: usize = MAX_TASKS> {
    /// Task table, in registration order
    tasks: heapless::Vec<Task<'a>, N>,
    clock: C,
    policy: Policy,
    /// Set by the first dispatch; closes registration
    started: bool,
    /// Task that ran last
    current: Option<usize>,
    /// Dispatches that ran a different task than the previous one
    context_switches: u32,
    /// Dispatch calls
    dispatches: u64,
    /// Dispatch calls with nothing ready
    idle: u64,
}

impl<'a, C: Clock, const N: usize> Scheduler<'a, C, N> {
    /// Priority scheduler
    pub fn new(clock: C) -> Self {
        Self::with_policy(clock, Policy::Priority)
    }

    pub fn with_policy(clock: C, policy: Policy) -> Self {
        Self {
            tasks: heapless::Vec::new(),
            clock,
            policy,
            started: false,
            current: None,
            context_switches: 0,
            dispatches: 0,
            idle: 0,
        }
    }

    /// Append a task; only allowed before the first dispatch
    pub fn register(&mut self, task: Task<'a>) -> Result<TaskId> {
        if self.started {
            return Err(Error::RegistrationClosed);
        }
        if self.tasks.iter().any(|t| t.name() == task.name()) {
            return Err(Error::DuplicateName(task.name()));
        }
        let idx = self.tasks.len();
        let name = task.name();
        let priority = task.priority();
        self.tasks.push(task).map_err(|_| Error::TooManyTasks)?;
        log::info!("registered task {} (priority {}) as #{}", name, priority.0, idx);
        Ok(TaskId(idx))
    }

    /// Run at most one ready task
    ///
    /// Returns the task that ran, or `None` when nothing was ready. A task whose
    /// routine completed is reported as [`Error::TaskTerminated`] and is never
    /// selected again; the remaining tasks keep running.
    pub fn dispatch_once(&mut self, now: Ticks) -> Result<Option<Dispatch>> {
        if !self.started {
            self.started = true;
            log::info!("scheduler started with {} tasks, {:?} policy", self.tasks.len(), self.policy);
        }
        debug_assert!(
            self.tasks.iter().all(|t| t.state() != TaskState::Running),
            "a task is still running at dispatch"
        );
        self.dispatches += 1;

        let Some(idx) = self.select(now) else {
            self.idle += 1;
            return Ok(None);
        };
        if self.current != Some(idx) {
            self.context_switches = self.context_switches.wrapping_add(1);
            self.current = Some(idx);
        }

        let task = &mut self.tasks[idx];
        let name = task.name();
        log::debug!("dispatch {} at {}", name, now);
        task.run_once(now, &self.clock)?;
        Ok(Some(Dispatch {
            id: TaskId(idx),
            name,
        }))
    }

    /// Refresh every task's state and pick the one to run
    fn select(&mut self, now: Ticks) -> Option<usize> {
        for task in self.tasks.iter_mut() {
            task.poll(now);
        }

        match self.policy {
            Policy::Priority => {
                let mut best: Option<(usize, Priority)> = None;
                for (i, task) in self.tasks.iter().enumerate() {
                    if !task.is_ready(now) {
                        continue;
                    }
                    // strict comparison keeps the earliest registration on ties
                    if best.map_or(true, |(_, p)| task.priority() > p) {
                        best = Some((i, task.priority()));
                    }
                }
                best.map(|(i, _)| i)
            }
            Policy::RoundRobin => {
                let len = self.tasks.len();
                let start = self.current.map_or(0, |c| c + 1);
                (0..len)
                    .map(|offset| (start + offset) % len)
                    .find(|&i| self.tasks[i].is_ready(now))
            }
        }
    }

    /// Clear run counters and timing statistics of every task
    pub fn reset_profiles(&mut self) {
        for task in self.tasks.iter_mut() {
            task.reset_profile();
        }
        self.context_switches = 0;
        self.dispatches = 0;
        self.idle = 0;
    }

    pub fn task(&self, id: TaskId) -> Option<&Task<'a>> {
        self.tasks.get(id.0)
    }

    pub fn find(&self, name: &str) -> Option<TaskId> {
        self.tasks.iter().position(|t| t.name() == name).map(TaskId)
    }

    /// Tasks in registration order
    pub fn tasks(&self) -> impl Iterator<Item = &Task<'a>> + '_ {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks still eligible for dispatch
    pub fn live_tasks(&self) -> usize {
        self.tasks.iter().filter(|t| !t.is_terminated()).count()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn context_switches(&self) -> u32 {
        self.context_switches
    }

    pub fn dispatches(&self) -> u64 {
        self.dispatches
    }

    /// Dispatch calls that found nothing ready
    pub fn idle_dispatches(&self) -> u64 {
        self.idle
    }

    /// Per-task trace logs of every traced task
    pub fn traces(&self) -> Traces<'_, 'a, C, N> {
        Traces { scheduler: self }
    }
}

impl<C: Clock, const N: usize> fmt::Display for Scheduler<'_, C, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<16} {:>4} {:>8} {:>8} {:>8} {:>8} {:>8} {:>7} STATE",
            "TASK", "PRI", "PERIOD", "RUNS", "AVG_DUR", "MAX_DUR", "AVG_LATE", "SKIPPED"
        )?;
        for task in self.tasks.iter() {
            writeln!(f, "{}", task)?;
        }
        Ok(())
    }
}

/// Trace dump returned by [`Scheduler::traces`]
pub struct Traces<'s, 'a, C: Clock, const N: usize> {
    scheduler: &'s Scheduler<'a, C, N>,
}

impl<C: Clock, const N: usize> fmt::Display for Traces<'_, '_, C, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for task in self.scheduler.tasks() {
            if let Some(trace) = task.trace() {
                writeln!(f, "{}:", task.name())?;
                write!(f, "{}", trace)?;
            }
        }
        Ok(())
    }
}

//! cotask — cooperative priority scheduler for periodic control loops
//!
//! Several logical tasks share one execution context. Each dispatch resumes
//! exactly one task body, chosen by priority, and the body runs until it
//! voluntarily yields:
//! - Fixed task table (no heap, no allocation)
//! - Fixed-rate periods anchored to each task's own previous activation
//! - Shares and queues for inter-task data, unsynchronized by construction
//! - Optional per-task profiling and bounded state traces
//!
//! # Concurrency model
//!
//! Strictly single-threaded and non-preemptive. [`Share`] and [`Queue`] use
//! `Cell` internally and are therefore `!Sync`; they are only sound because no
//! two task bodies ever run at the same time. A preemptive port must guard
//! every access.
//!
//! ```
//! use cotask::{Priority, Scheduler, Share, Step, SysTimer, Task};
//!
//! let timer = SysTimer::software();
//! let position = Share::new("position", 0i32);
//! let mut control = || {
//!     position.set(position.get() + 1);
//!     Step::Yield
//! };
//!
//! let mut sched: Scheduler<_> = Scheduler::new(&timer);
//! sched
//!     .register(Task::periodic("control", &mut control, Priority::HIGH, 10)?.uses(&position)?)?;
//! for now in 0..100 {
//!     sched.dispatch_once(now)?;
//! }
//! assert_eq!(position.get(), 10);
//! # Ok::<(), cotask::Error>(())
//! ```
//!
//! Author: Moroya Sakamoto

#![cfg_attr(not(test), no_std)]

#[cfg(all(feature = "std", not(test)))]
extern crate std;

pub mod diag;
pub mod error;
pub mod kernel;
pub mod queue;
pub mod routine;
pub mod scheduler;
pub mod share;
pub mod task;
pub mod timer;

pub use diag::{show_all, Profile, Resource, TraceEvent, TraceLog, TRACE_DEPTH};
pub use error::{Error, Result};
pub use kernel::{Kernel, KernelStats, StopSignal};
pub use queue::{OverflowPolicy, Queue};
pub use routine::{staged, Routine, Staged, Step};
pub use scheduler::{Dispatch, Policy, Scheduler, TaskId, MAX_TASKS};
pub use share::{Protection, Share};
pub use task::{Priority, Task, TaskState, Trigger, MAX_RESOURCES};
#[cfg(feature = "std")]
pub use timer::StdClock;
pub use timer::{Clock, SysTimer, Ticks};

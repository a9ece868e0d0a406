//! Diagnostics — profiling counters, bounded traces, resource dumps
//!
//! Everything here is fixed-size. Traces keep the newest `TRACE_DEPTH`
//! transitions and count what they dropped, so a task can trace for the
//! life of the process without exhausting RAM.
//!
//! Author: Moroya Sakamoto

use core::fmt;

use heapless::HistoryBuf;

use crate::task::TaskState;
use crate::timer::Ticks;

/// State transitions retained per traced task
pub const TRACE_DEPTH: usize = 32;

/// Anything that can appear in the share/queue table
pub trait Resource {
    /// Display name
    fn name(&self) -> &str;
    /// Short type label ("share", "queue")
    fn kind(&self) -> &'static str;
    /// Current value or occupancy
    fn describe(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

/// Timing statistics of a profiled task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Profile {
    /// Runs recorded since the last reset
    pub runs: u32,
    /// Sum of body execution times
    pub total_duration: Ticks,
    /// Longest single body execution
    pub max_duration: Ticks,
    /// Sum of dispatch delays past the activation time
    pub total_lateness: Ticks,
    /// Largest dispatch delay
    pub max_lateness: Ticks,
}

impl Profile {
    /// Account for one run
    pub fn record(&mut self, duration: Ticks, lateness: Ticks) {
        self.runs = self.runs.saturating_add(1);
        self.total_duration = self.total_duration.saturating_add(duration);
        self.max_duration = self.max_duration.max(duration);
        self.total_lateness = self.total_lateness.saturating_add(lateness);
        self.max_lateness = self.max_lateness.max(lateness);
    }

    /// Mean execution time (0 before the first run)
    pub fn avg_duration(&self) -> Ticks {
        if self.runs == 0 {
            0
        } else {
            self.total_duration / self.runs as Ticks
        }
    }

    /// Mean lateness (0 before the first run)
    pub fn avg_lateness(&self) -> Ticks {
        if self.runs == 0 {
            0
        } else {
            self.total_lateness / self.runs as Ticks
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// One recorded state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceEvent {
    /// Dispatch time the transition happened at
    pub at: Ticks,
    /// State entered
    pub state: TaskState,
}

/// Bounded transition log; the oldest entries are overwritten
pub struct TraceLog {
    events: HistoryBuf<TraceEvent, TRACE_DEPTH>,
    dropped: u32,
}

impl TraceLog {
    pub const fn new() -> Self {
        Self {
            events: HistoryBuf::new(),
            dropped: 0,
        }
    }

    /// Append a transition, evicting the oldest when full
    pub fn record(&mut self, at: Ticks, state: TaskState) {
        if self.events.len() == TRACE_DEPTH {
            self.dropped = self.dropped.saturating_add(1);
        }
        self.events.write(TraceEvent { at, state });
    }

    /// Retained events, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &TraceEvent> + '_ {
        self.events.oldest_ordered()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.len() == 0
    }

    /// Events evicted so far
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.dropped = 0;
    }
}

impl Default for TraceLog {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TraceLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dropped > 0 {
            writeln!(f, "  ({} earlier events dropped)", self.dropped)?;
        }
        for event in self.iter() {
            writeln!(f, "  {:>10}: {:?}", event.at, event.state)?;
        }
        Ok(())
    }
}

/// Table of shares and queues with their current contents
pub struct ResourceTable<'r> {
    items: &'r [&'r dyn Resource],
}

/// Dump an explicit list of shares and queues
///
/// ```
/// use cotask::{show_all, OverflowPolicy, Queue, Resource, Share};
///
/// let share = Share::new("Share 0", 0i16);
/// let queue = Queue::<u32, 16>::new("Queue 0", OverflowPolicy::Reject);
/// let items: [&dyn Resource; 2] = [&share, &queue];
/// let table = show_all(&items).to_string();
/// assert!(table.contains("Queue 0"));
/// ```
pub fn show_all<'r>(items: &'r [&'r dyn Resource]) -> ResourceTable<'r> {
    ResourceTable { items }
}

struct Contents<'a>(&'a dyn Resource);

impl fmt::Display for Contents<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.describe(f)
    }
}

impl fmt::Display for ResourceTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<16} {:<6} CONTENTS", "NAME", "KIND")?;
        for item in self.items {
            writeln!(f, "{:<16} {:<6} {}", item.name(), item.kind(), Contents(*item))?;
        }
        Ok(())
    }
}

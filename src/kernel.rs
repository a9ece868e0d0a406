//! Kernel — driver loop around the scheduler
//!
//! Repeatedly dispatches until an iteration budget is spent or a stop signal
//! is raised, then hands back statistics. The scheduler stays reachable for
//! the diagnostic dump afterwards.
//!
//! Author: Moroya Sakamoto

use core::sync::atomic::{AtomicBool, Ordering};

use crate::error::Error;
use crate::scheduler::{Scheduler, MAX_TASKS};
use crate::timer::{Clock, Ticks};

/// External request to leave the driver loop
///
/// Atomic so an interrupt handler or a task body can raise it.
pub struct StopSignal {
    requested: AtomicBool,
}

impl StopSignal {
    pub const fn new() -> Self {
        Self {
            requested: AtomicBool::new(false),
        }
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Re-arm after a stop
    pub fn clear(&self) {
        self.requested.store(false, Ordering::Release);
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Scheduler plus stop signal
pub struct Kernel<'a, C: Clock, const N: usize = MAX_TASKS> {
    /// Task scheduler
    pub scheduler: Scheduler<'a, C, N>,
    stop: &'a StopSignal,
    /// Dispatch calls across every run
    pub total_iterations: u64,
}

impl<'a, C: Clock, const N: usize> Kernel<'a, C, N> {
    pub fn new(scheduler: Scheduler<'a, C, N>, stop: &'a StopSignal) -> Self {
        Self {
            scheduler,
            stop,
            total_iterations: 0,
        }
    }

    /// Dispatch up to `budget` times, reading the time from `now` before each
    ///
    /// Task terminations are logged and collected; the loop keeps going with
    /// the remaining tasks.
    pub fn run<F>(&mut self, budget: u64, mut now: F) -> KernelStats<N>
    where
        F: FnMut() -> Ticks,
    {
        let mut stats = KernelStats::default();
        let switches_before = self.scheduler.context_switches();

        while stats.iterations < budget {
            if self.stop.is_requested() {
                stats.stopped_early = true;
                log::info!("stop requested after {} iterations", stats.iterations);
                break;
            }

            stats.iterations += 1;
            match self.scheduler.dispatch_once(now()) {
                Ok(Some(_)) => stats.tasks_executed += 1,
                Ok(None) => stats.idle += 1,
                Err(Error::TaskTerminated { name }) => {
                    stats.tasks_executed += 1;
                    // at most one termination per task
                    let _ = stats.terminated.push(name);
                }
                Err(e) => log::error!("dispatch failed: {}", e),
            }
        }

        self.total_iterations += stats.iterations;
        stats.context_switches = self
            .scheduler
            .context_switches()
            .wrapping_sub(switches_before);
        stats
    }

    /// Run against the scheduler's own clock
    pub fn run_on_clock(&mut self, budget: u64) -> KernelStats<N> {
        let mut stats = KernelStats::default();
        let mut remaining = budget;
        while remaining > 0 {
            let now = self.scheduler.clock().now();
            let step = self.run(1, || now);
            remaining -= 1;
            stats.absorb(&step);
            if step.stopped_early {
                break;
            }
        }
        stats
    }

    pub fn stop(&self) {
        self.stop.request();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.is_requested()
    }
}

/// Kernel execution statistics
#[derive(Debug, Clone, Default)]
pub struct KernelStats<const N: usize = MAX_TASKS> {
    /// Dispatch calls made
    pub iterations: u64,
    /// Dispatches that resumed a task
    pub tasks_executed: u64,
    /// Dispatches with nothing ready
    pub idle: u64,
    /// Dispatches that ran a different task than the one before
    pub context_switches: u32,
    /// The stop signal ended the run before the budget
    pub stopped_early: bool,
    /// Tasks whose routine completed during this run
    pub terminated: heapless::Vec<&'static str, N>,
}

impl<const N: usize> KernelStats<N> {
    fn absorb(&mut self, other: &Self) {
        self.iterations += other.iterations;
        self.tasks_executed += other.tasks_executed;
        self.idle += other.idle;
        self.context_switches = self.context_switches.wrapping_add(other.context_switches);
        self.stopped_early |= other.stopped_early;
        for name in other.terminated.iter() {
            let _ = self.terminated.push(*name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::{show_all, Resource};
    use crate::queue::{OverflowPolicy, Queue};
    use crate::routine::{staged, Step};
    use crate::share::Share;
    use crate::task::{Priority, Task};
    use crate::timer::SysTimer;

    fn noop() -> Step {
        Step::Yield
    }

    #[test]
    fn test_kernel_run_for_budget() {
        let stop = StopSignal::new();
        let timer = SysTimer::software();
        let (mut fast, mut slow) = (noop, noop);
        let mut sched: Scheduler<_> = Scheduler::new(&timer);
        sched.register(Task::periodic("fast", &mut fast, Priority::HIGH, 10).unwrap()).unwrap();
        sched.register(Task::periodic("slow", &mut slow, Priority::LOW, 100).unwrap()).unwrap();
        let mut kernel = Kernel::new(sched, &stop);

        let stats = kernel.run(1000, || timer.tick());
        assert_eq!(stats.iterations, 1000);
        assert!(!stats.stopped_early);
        assert_eq!(stats.tasks_executed, 110);
        assert_eq!(stats.idle, 890);
        assert_eq!(kernel.total_iterations, 1000);
    }

    #[test]
    fn test_stop_signal_ends_run() {
        let stop = StopSignal::new();
        let timer = SysTimer::software();
        let mut runs = 0;
        let mut body = || {
            runs += 1;
            if runs == 5 {
                stop.request();
            }
            Step::Yield
        };
        let mut sched: Scheduler<_> = Scheduler::new(&timer);
        sched.register(Task::periodic("t", &mut body, Priority::NORMAL, 1).unwrap()).unwrap();
        let mut kernel = Kernel::new(sched, &stop);

        let stats = kernel.run(10_000, || timer.tick());
        assert!(stats.stopped_early);
        assert_eq!(stats.iterations, 5);
        assert!(kernel.is_stop_requested());
        // diagnostics stay available after the stop
        assert_eq!(kernel.scheduler.tasks().next().unwrap().run_count(), 5);
    }

    #[test]
    fn test_terminations_collected() {
        let stop = StopSignal::new();
        let timer = SysTimer::software();
        let mut once = || Step::Complete;
        let mut steady = noop;
        let mut sched: Scheduler<_> = Scheduler::new(&timer);
        sched.register(Task::periodic("once", &mut once, Priority::HIGH, 5).unwrap()).unwrap();
        sched.register(Task::periodic("steady", &mut steady, Priority::LOW, 5).unwrap()).unwrap();
        let mut kernel = Kernel::new(sched, &stop);

        let stats = kernel.run(20, || timer.tick());
        assert_eq!(stats.terminated.as_slice(), ["once"]);
        assert_eq!(kernel.scheduler.live_tasks(), 1);
        assert_eq!(stats.tasks_executed, 5);
    }

    #[test]
    fn test_run_on_clock() {
        let stop = StopSignal::new();
        let timer = SysTimer::software();
        let mut body = || {
            timer.advance(10);
            Step::Yield
        };
        let mut sched: Scheduler<_> = Scheduler::new(&timer);
        sched.register(Task::periodic("t", &mut body, Priority::NORMAL, 10).unwrap()).unwrap();
        let mut kernel = Kernel::new(sched, &stop);

        // the body itself moves the clock one period per run
        let stats = kernel.run_on_clock(4);
        assert_eq!(stats.iterations, 4);
        assert_eq!(stats.tasks_executed, 4);
        assert_eq!(timer.now(), 40);
    }

    #[test]
    fn test_producer_consumer_through_queue() {
        let stop = StopSignal::new();
        let timer = SysTimer::software();
        let share = Share::new("Share 0", 0i16);
        let queue = Queue::<u32, 16>::new("Queue 0", OverflowPolicy::Reject);
        let mut received = 0u32;
        let mut full = 0u32;

        let mut producer = staged(
            || 0u32,
            |n: &mut u32| {
                if queue.put(*n).is_err() {
                    full += 1;
                }
                share.set(*n as i16);
                *n += 1;
                Step::Yield
            },
        );
        let mut consumer = || {
            while let Ok(v) = queue.get() {
                assert_eq!(v, received);
                received += 1;
            }
            Step::Yield
        };

        {
            let mut sched: Scheduler<_> = Scheduler::new(&timer);
            sched
                .register(
                    Task::periodic("producer", &mut producer, Priority(2), 2)
                        .unwrap()
                        .profiled()
                        .uses(&share)
                        .unwrap()
                        .uses(&queue)
                        .unwrap(),
                )
                .unwrap();
            sched
                .register(
                    Task::periodic("consumer", &mut consumer, Priority(1), 10)
                        .unwrap()
                        .uses(&queue)
                        .unwrap(),
                )
                .unwrap();
            let mut kernel = Kernel::new(sched, &stop);
            kernel.run(200, || timer.tick());

            let items: [&dyn Resource; 2] = [&share, &queue];
            let dump = show_all(&items).to_string();
            assert!(dump.contains("Share 0"));
            assert!(kernel.scheduler.to_string().contains("producer"));
        }

        // consumer drains at 1, 11, ..., 191: everything produced up to tick 190
        assert_eq!(full, 0);
        assert_eq!(received, 96);
    }
}

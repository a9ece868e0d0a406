//! Error types
//!
//! Queue failures are local and recoverable: the task body that hit them
//! decides whether to retry, drop data, or escalate. Construction and
//! registration failures, and tasks whose routine terminated, are returned
//! to the assembling code.
//!
//! Author: Moroya Sakamoto

/// Result type for scheduler, task and queue operations
pub type Result<T> = core::result::Result<T, Error>;

/// Scheduler-level and inter-task communication errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// `put` on a full queue whose overflow policy rejects new items
    #[error("queue is full")]
    QueueFull,
    /// `get` on an empty queue
    #[error("queue is empty")]
    QueueEmpty,
    /// A periodic task was given a zero period
    #[error("task period must be greater than zero")]
    InvalidPeriod,
    /// The task table has no free slot
    #[error("task table is full")]
    TooManyTasks,
    /// A task already uses the maximum number of shares and queues
    #[error("task resource list is full")]
    TooManyResources,
    /// Another registered task already uses this name
    #[error("duplicate task name: {0}")]
    DuplicateName(&'static str),
    /// Registration attempted after dispatching started
    #[error("registration is closed once dispatching has started")]
    RegistrationClosed,
    /// The task's routine completed instead of suspending; it is no longer scheduled
    #[error("task {name} terminated")]
    TaskTerminated {
        /// Name of the terminated task
        name: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Error::QueueFull.to_string(), "queue is full");
        assert_eq!(
            Error::TaskTerminated { name: "motor" }.to_string(),
            "task motor terminated"
        );
        assert_eq!(Error::DuplicateName("a").to_string(), "duplicate task name: a");
    }
}

//! Repair budget arithmetic.
//!
//! A node's budget is spent by failures, not by repairs: every `fail()`
//! counts against it, and once the count reaches the cap the node is
//! out of automatic repair for the rest of the run.

/// Default repair-attempt cap.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Check if a node's budget is spent.
///
/// # Examples
///
/// ```
/// use bastion_heal::is_exhausted;
///
/// assert!(!is_exhausted(2, 3));
/// assert!(is_exhausted(3, 3));  // at the cap
/// assert!(is_exhausted(7, 3));
/// ```
pub const fn is_exhausted(failure_count: u32, max_attempts: u32) -> bool {
    failure_count >= max_attempts
}

/// Failures a node can still absorb before it becomes unrecoverable.
pub const fn attempts_remaining(failure_count: u32, max_attempts: u32) -> u32 {
    max_attempts.saturating_sub(failure_count)
}

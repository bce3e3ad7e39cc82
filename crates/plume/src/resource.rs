use std::{
    fmt,
    time::{Duration, Instant},
};

use crate::error::{ErrKind, Raise};

/// Default ceiling for nested evaluations and procedure frames.
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 1000;

/// Error returned when a resource limit is exceeded during evaluation.
///
/// This lets a sandboxing host enforce strict limits on allocation count,
/// execution time, and evaluation depth.
#[derive(Debug, Clone)]
pub enum ResourceError {
    /// Maximum number of arena allocations exceeded.
    Allocation { limit: usize, count: usize },
    /// Maximum execution time exceeded.
    Time { limit: Duration, elapsed: Duration },
    /// Maximum recursion depth exceeded.
    Recursion { limit: usize, depth: usize },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allocation { limit, count } => {
                write!(f, "allocation limit exceeded: {count} > {limit}")
            }
            Self::Time { limit, elapsed } => {
                write!(f, "time limit exceeded: {elapsed:?} > {limit:?}")
            }
            Self::Recursion { .. } => {
                write!(f, "too many nested evaluations (infinite loop?)")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

impl From<ResourceError> for Raise {
    fn from(err: ResourceError) -> Self {
        let kind = match err {
            ResourceError::Recursion { .. } => ErrKind::RecursionLimit,
            ResourceError::Allocation { .. } | ResourceError::Time { .. } => ErrKind::Internal,
        };
        Self::new(kind, err.to_string())
    }
}

/// Trait for tracking resource usage during evaluation.
///
/// Implementations can enforce limits on allocations, wall-clock time, and
/// recursion depth. With [`NoLimitTracker`] every check compiles away to a
/// no-op, so unrestricted interpreters pay nothing for the seam.
pub trait ResourceTracker: fmt::Debug {
    /// Called before each arena allocation.
    ///
    /// Returns `Ok(())` if the allocation should proceed, or
    /// `Err(ResourceError::Allocation)` if the budget is exhausted.
    fn on_allocate(&mut self) -> Result<(), ResourceError>;

    /// Called at command boundaries to check wall-clock limits.
    fn check_time(&mut self) -> Result<(), ResourceError>;

    /// Called before pushing a call frame or re-entering the evaluator.
    ///
    /// `depth` is the combined frame and nested-evaluation depth before the
    /// new level is entered.
    fn check_recursion_depth(&self, depth: usize) -> Result<(), ResourceError>;

    /// The recursion ceiling this tracker enforces.
    fn recursion_limit(&self) -> usize;

    /// Total allocations tracked, if this tracker records them.
    fn allocation_count(&self) -> Option<usize> {
        None
    }
}

/// Resource tracker that enforces only the recursion ceiling.
///
/// Allocation and time checks are no-ops that the optimizer removes. The
/// recursion ceiling is kept even in "no limit" mode: without it, a
/// self-recursive procedure would exhaust the host stack rather than fail
/// with a catchable error.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct NoLimitTracker;

/// Shared value form of [`NoLimitTracker`] for call sites that pass a tracker
/// by value.
pub const NO_LIMIT_TRACKER: NoLimitTracker = NoLimitTracker;

impl ResourceTracker for NoLimitTracker {
    #[inline]
    fn on_allocate(&mut self) -> Result<(), ResourceError> {
        Ok(())
    }

    #[inline]
    fn check_time(&mut self) -> Result<(), ResourceError> {
        Ok(())
    }

    #[inline]
    fn check_recursion_depth(&self, depth: usize) -> Result<(), ResourceError> {
        if depth >= DEFAULT_MAX_RECURSION_DEPTH {
            return Err(ResourceError::Recursion {
                limit: DEFAULT_MAX_RECURSION_DEPTH,
                depth,
            });
        }
        Ok(())
    }

    #[inline]
    fn recursion_limit(&self) -> usize {
        DEFAULT_MAX_RECURSION_DEPTH
    }
}

/// Limits enforced by [`LimitedTracker`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ResourceLimits {
    /// Maximum number of arena allocations, `None` for unlimited.
    pub max_allocations: Option<usize>,
    /// Maximum wall-clock evaluation time, `None` for unlimited.
    pub max_time: Option<Duration>,
    /// Maximum combined frame and nested-evaluation depth.
    pub max_recursion_depth: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_allocations: None,
            max_time: None,
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
        }
    }
}

impl ResourceLimits {
    /// Limits with a custom recursion ceiling and nothing else restricted.
    #[must_use]
    pub fn with_recursion_depth(depth: usize) -> Self {
        Self {
            max_recursion_depth: depth,
            ..Self::default()
        }
    }
}

/// Resource tracker that enforces [`ResourceLimits`].
///
/// Time is measured from construction; allocation counts are cumulative over
/// the tracker's lifetime, not per evaluation.
#[derive(Debug)]
pub struct LimitedTracker {
    limits: ResourceLimits,
    allocations: usize,
    started: Instant,
}

impl LimitedTracker {
    #[must_use]
    pub fn new(limits: ResourceLimits) -> Self {
        Self {
            limits,
            allocations: 0,
            started: Instant::now(),
        }
    }
}

impl ResourceTracker for LimitedTracker {
    fn on_allocate(&mut self) -> Result<(), ResourceError> {
        self.allocations += 1;
        if let Some(limit) = self.limits.max_allocations
            && self.allocations > limit
        {
            return Err(ResourceError::Allocation {
                limit,
                count: self.allocations,
            });
        }
        Ok(())
    }

    fn check_time(&mut self) -> Result<(), ResourceError> {
        if let Some(limit) = self.limits.max_time {
            let elapsed = self.started.elapsed();
            if elapsed > limit {
                return Err(ResourceError::Time { limit, elapsed });
            }
        }
        Ok(())
    }

    fn check_recursion_depth(&self, depth: usize) -> Result<(), ResourceError> {
        if depth >= self.limits.max_recursion_depth {
            return Err(ResourceError::Recursion {
                limit: self.limits.max_recursion_depth,
                depth,
            });
        }
        Ok(())
    }

    fn recursion_limit(&self) -> usize {
        self.limits.max_recursion_depth
    }

    fn allocation_count(&self) -> Option<usize> {
        Some(self.allocations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limited_tracker_counts_allocations() {
        let mut tracker = LimitedTracker::new(ResourceLimits {
            max_allocations: Some(2),
            ..ResourceLimits::default()
        });
        assert!(tracker.on_allocate().is_ok());
        assert!(tracker.on_allocate().is_ok());
        assert!(matches!(
            tracker.on_allocate(),
            Err(ResourceError::Allocation { limit: 2, count: 3 })
        ));
    }

    #[test]
    fn recursion_check_uses_configured_ceiling() {
        let tracker = LimitedTracker::new(ResourceLimits::with_recursion_depth(10));
        assert!(tracker.check_recursion_depth(9).is_ok());
        assert!(tracker.check_recursion_depth(10).is_err());
    }
}

//! Single-flight latches, one per operation kind.
//!
//! Each kind owns an `Idle`/`Running` state machine driven by
//! compare-and-swap. Acquisition never blocks or queues: a second acquire of
//! the same kind is rejected immediately. There is no cross-kind exclusion,
//! so a compression and an extraction may run side by side.
//!
//! Acquiring returns a [`GuardToken`] that releases its latch exactly once,
//! either explicitly or on drop, which covers every exit path including
//! unwinding.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;

use crate::PipelineError;
use crate::Result;

/// Kind of pipeline operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Selection to archive.
    Compress,
    /// Archive to destination tree.
    Extract,
}

impl OperationKind {
    /// Verb used when labelling progress.
    #[must_use]
    pub const fn progress_verb(self) -> &'static str {
        match self {
            Self::Compress => "Compressing",
            Self::Extract => "Extracting",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compress => f.write_str("compress"),
            Self::Extract => f.write_str("extract"),
        }
    }
}

/// State of one latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    /// No operation of this kind is in flight.
    Idle,
    /// An operation of this kind holds the latch.
    Running,
}

impl OperationState {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Running => 1,
        }
    }

    const fn from_u8(value: u8) -> Self {
        if value == 0 { Self::Idle } else { Self::Running }
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Running => f.write_str("running"),
        }
    }
}

#[derive(Debug, Default)]
struct Latches {
    compress: AtomicU8,
    extract: AtomicU8,
}

impl Latches {
    const fn latch(&self, kind: OperationKind) -> &AtomicU8 {
        match kind {
            OperationKind::Compress => &self.compress,
            OperationKind::Extract => &self.extract,
        }
    }
}

/// Shared pair of single-flight latches.
///
/// Cloning is cheap and every clone addresses the same latches.
///
/// # Examples
///
/// ```
/// use kitty_core::guard::OperationGuard;
/// use kitty_core::guard::OperationKind;
///
/// let guard = OperationGuard::new();
/// let token = guard.try_acquire(OperationKind::Compress).unwrap();
/// assert!(guard.try_acquire(OperationKind::Compress).is_err());
///
/// // Extraction is independent of compression.
/// assert!(guard.try_acquire(OperationKind::Extract).is_ok());
///
/// drop(token);
/// assert!(guard.try_acquire(OperationKind::Compress).is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct OperationGuard {
    latches: Arc<Latches>,
}

impl OperationGuard {
    /// Creates a guard with both latches idle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state of the latch for `kind`.
    #[must_use]
    pub fn state(&self, kind: OperationKind) -> OperationState {
        OperationState::from_u8(self.latches.latch(kind).load(Ordering::Acquire))
    }

    /// Returns `true` if an operation of `kind` is in flight.
    #[must_use]
    pub fn is_running(&self, kind: OperationKind) -> bool {
        self.state(kind) == OperationState::Running
    }

    /// Moves the latch for `kind` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::IllegalTransition` if the latch is not in
    /// `from` or if `from == to`.
    pub fn transition(
        &self,
        kind: OperationKind,
        from: OperationState,
        to: OperationState,
    ) -> Result<()> {
        if from == to {
            return Err(PipelineError::IllegalTransition { kind, from, to });
        }
        self.latches
            .latch(kind)
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| PipelineError::IllegalTransition { kind, from, to })
    }

    /// Attempts to take the latch for `kind`.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::AlreadyRunning` without side effects if the
    /// latch is already held.
    pub fn try_acquire(&self, kind: OperationKind) -> Result<GuardToken> {
        match self.transition(kind, OperationState::Idle, OperationState::Running) {
            Ok(()) => {
                tracing::debug!(%kind, "guard acquired");
                Ok(GuardToken {
                    guard: self.clone(),
                    kind,
                    released: false,
                })
            }
            Err(_) => Err(PipelineError::AlreadyRunning { kind }),
        }
    }

    /// Labels a progress percentage using the state at the moment of
    /// display.
    ///
    /// Compression wins when both kinds are running, matching the order in
    /// which the status line is checked.
    ///
    /// # Examples
    ///
    /// ```
    /// use kitty_core::guard::OperationGuard;
    /// use kitty_core::guard::OperationKind;
    ///
    /// let guard = OperationGuard::new();
    /// assert_eq!(guard.label(42), "42%");
    ///
    /// let _token = guard.try_acquire(OperationKind::Extract).unwrap();
    /// assert_eq!(guard.label(42), "Extracting: 42%");
    /// ```
    #[must_use]
    pub fn label(&self, percent: u8) -> String {
        [OperationKind::Compress, OperationKind::Extract]
            .into_iter()
            .find(|kind| self.is_running(*kind))
            .map_or_else(
                || format!("{percent}%"),
                |kind| format!("{}: {percent}%", kind.progress_verb()),
            )
    }
}

/// Proof of holding one latch.
///
/// Releases the latch when dropped unless already released explicitly.
#[derive(Debug)]
#[must_use = "dropping the token releases the latch immediately"]
pub struct GuardToken {
    guard: OperationGuard,
    kind: OperationKind,
    released: bool,
}

impl GuardToken {
    /// Kind of the held latch.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Releases the latch.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::IllegalTransition` if the latch was not
    /// running, which means something else released it.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.release_inner()
    }

    fn release_inner(&self) -> Result<()> {
        let result =
            self.guard
                .transition(self.kind, OperationState::Running, OperationState::Idle);
        tracing::debug!(kind = %self.kind, "guard released");
        result
    }
}

impl Drop for GuardToken {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = self.release_inner()
        {
            tracing::warn!(error = %e, "guard release on drop failed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_back_to_back_acquire() {
        let guard = OperationGuard::new();
        let first = guard.try_acquire(OperationKind::Compress);
        let second = guard.try_acquire(OperationKind::Compress);

        assert!(first.is_ok());
        assert!(matches!(
            second,
            Err(PipelineError::AlreadyRunning {
                kind: OperationKind::Compress
            })
        ));
    }

    #[test]
    fn test_rejection_has_no_side_effects() {
        let guard = OperationGuard::new();
        let token = guard.try_acquire(OperationKind::Extract).unwrap();
        let _ = guard.try_acquire(OperationKind::Extract);
        assert!(guard.is_running(OperationKind::Extract));

        token.release().unwrap();
        assert_eq!(guard.state(OperationKind::Extract), OperationState::Idle);
    }

    #[test]
    fn test_kinds_are_independent() {
        let guard = OperationGuard::new();
        let _compress = guard.try_acquire(OperationKind::Compress).unwrap();
        let extract = guard.try_acquire(OperationKind::Extract);
        assert!(extract.is_ok());
    }

    #[test]
    fn test_drop_releases() {
        let guard = OperationGuard::new();
        {
            let _token = guard.try_acquire(OperationKind::Compress).unwrap();
            assert!(guard.is_running(OperationKind::Compress));
        }
        assert!(!guard.is_running(OperationKind::Compress));
    }

    #[test]
    fn test_release_on_panic() {
        let guard = OperationGuard::new();
        let cloned = guard.clone();
        let result = thread::spawn(move || {
            let _token = cloned.try_acquire(OperationKind::Compress).unwrap();
            panic!("worker failed");
        })
        .join();

        assert!(result.is_err());
        assert!(!guard.is_running(OperationKind::Compress));
    }

    #[test]
    fn test_illegal_transitions() {
        let guard = OperationGuard::new();
        let err = guard
            .transition(
                OperationKind::Compress,
                OperationState::Running,
                OperationState::Idle,
            )
            .unwrap_err();
        assert!(matches!(err, PipelineError::IllegalTransition { .. }));

        let err = guard
            .transition(
                OperationKind::Compress,
                OperationState::Idle,
                OperationState::Idle,
            )
            .unwrap_err();
        assert!(matches!(err, PipelineError::IllegalTransition { .. }));
    }

    #[test]
    fn test_concurrent_acquire_single_winner() {
        let guard = OperationGuard::new();
        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = guard.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    // Leak winners so no release happens during the race.
                    guard
                        .try_acquire(OperationKind::Extract)
                        .map(std::mem::forget)
                        .is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_label_reads_current_state() {
        let guard = OperationGuard::new();
        assert_eq!(guard.label(10), "10%");

        let token = guard.try_acquire(OperationKind::Compress).unwrap();
        assert_eq!(guard.label(10), "Compressing: 10%");
        drop(token);

        let _token = guard.try_acquire(OperationKind::Extract).unwrap();
        assert_eq!(guard.label(99), "Extracting: 99%");
    }
}

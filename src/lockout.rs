//! Failed-attempt lockout state machine.
//!
//! A vault is **Active** while `now >= locked_until` and **Locked**
//! otherwise.  The policy (`max_attempts`, `wait_seconds`) is fixed when
//! the vault is created; the mutable counters live in `LockState`, which
//! is persisted inside each `VaultRecord`.
//!
//! Everything here is pure: the caller supplies `now` in epoch seconds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::{FolderVaultError, Result};

/// Source of "now" in epoch seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
    }
}

/// A clock that only moves when told to.  Cloning shares the same time.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start)),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Immutable lockout parameters of a vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutPolicy {
    max_attempts: u32,
    wait_seconds: u64,
}

/// Mutable attempt counters of a vault.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockState {
    /// Consecutive failures in the current window (`< max_attempts`).
    pub attempts: u32,
    /// Epoch seconds until which checks are refused; 0 = not locked.
    pub locked_until: u64,
}

/// Whether a credential check may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Active,
    Locked { remaining_secs: u64 },
}

/// What a failed check did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    Retry { tries_left: u32 },
    Locked { wait_secs: u64 },
}

impl FailureOutcome {
    /// The error a caller reports for this outcome.
    pub fn into_error(self) -> FolderVaultError {
        match self {
            Self::Retry { tries_left } => FolderVaultError::InvalidCredentials { tries_left },
            Self::Locked { wait_secs } => FolderVaultError::LockedOut {
                remaining_secs: wait_secs,
            },
        }
    }
}

impl LockoutPolicy {
    /// Build a policy, rejecting zero values.
    pub fn new(max_attempts: u32, wait_seconds: u64) -> Result<Self> {
        if max_attempts < 1 {
            return Err(FolderVaultError::InvalidPolicy(
                "max attempts must be at least 1".into(),
            ));
        }
        if wait_seconds < 1 {
            return Err(FolderVaultError::InvalidPolicy(
                "wait time must be at least 1 second".into(),
            ));
        }
        Ok(Self {
            max_attempts,
            wait_seconds,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn wait_seconds(&self) -> u64 {
        self.wait_seconds
    }

    /// Read the gate.  Never mutates `state`.
    pub fn gate(&self, state: &LockState, now: u64) -> Gate {
        if now < state.locked_until {
            Gate::Locked {
                remaining_secs: state.locked_until - now,
            }
        } else {
            Gate::Active
        }
    }

    /// Seconds left in the lockout window, 0 when Active.
    pub fn remaining(&self, state: &LockState, now: u64) -> u64 {
        match self.gate(state, now) {
            Gate::Active => 0,
            Gate::Locked { remaining_secs } => remaining_secs,
        }
    }

    /// Check the gate and turn a Locked state into an error.
    pub fn ensure_active(&self, state: &LockState, now: u64) -> Result<()> {
        match self.gate(state, now) {
            Gate::Active => Ok(()),
            Gate::Locked { remaining_secs } => {
                Err(FolderVaultError::LockedOut { remaining_secs })
            }
        }
    }

    /// Apply a failed check made while Active.
    pub fn register_failure(&self, state: &mut LockState, now: u64) -> FailureOutcome {
        state.attempts = state.attempts.saturating_add(1);
        if state.attempts >= self.max_attempts {
            state.locked_until = now.saturating_add(self.wait_seconds);
            state.attempts = 0;
            FailureOutcome::Locked {
                wait_secs: self.wait_seconds,
            }
        } else {
            FailureOutcome::Retry {
                tries_left: self.max_attempts - state.attempts,
            }
        }
    }

    /// Apply a successful check.
    pub fn register_success(&self, state: &mut LockState) {
        *state = LockState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> LockoutPolicy {
        LockoutPolicy::new(3, 5).unwrap()
    }

    #[test]
    fn rejects_zero_values() {
        assert!(LockoutPolicy::new(0, 5).is_err());
        assert!(LockoutPolicy::new(3, 0).is_err());
        assert!(LockoutPolicy::new(1, 1).is_ok());
    }

    #[test]
    fn tries_left_counts_down_then_locks() {
        let policy = policy();
        let mut state = LockState::default();

        assert_eq!(
            policy.register_failure(&mut state, 100),
            FailureOutcome::Retry { tries_left: 2 }
        );
        assert_eq!(
            policy.register_failure(&mut state, 100),
            FailureOutcome::Retry { tries_left: 1 }
        );
        assert_eq!(
            policy.register_failure(&mut state, 100),
            FailureOutcome::Locked { wait_secs: 5 }
        );
        assert_eq!(state.attempts, 0);
        assert_eq!(state.locked_until, 105);
    }

    #[test]
    fn gate_reports_remaining_and_reopens() {
        let policy = policy();
        let state = LockState {
            attempts: 0,
            locked_until: 105,
        };

        assert_eq!(policy.gate(&state, 101), Gate::Locked { remaining_secs: 4 });
        assert_eq!(policy.gate(&state, 105), Gate::Active);
        assert_eq!(policy.remaining(&state, 200), 0);
    }

    #[test]
    fn locked_gate_does_not_touch_attempts() {
        let policy = policy();
        let state = LockState {
            attempts: 1,
            locked_until: 50,
        };
        let err = policy.ensure_active(&state, 40).unwrap_err();
        assert!(matches!(
            err,
            FolderVaultError::LockedOut { remaining_secs: 10 }
        ));
        assert_eq!(state.attempts, 1);
    }

    #[test]
    fn success_clears_everything() {
        let policy = policy();
        let mut state = LockState {
            attempts: 2,
            locked_until: 99,
        };
        policy.register_success(&mut state);
        assert_eq!(state, LockState::default());
    }

    #[test]
    fn single_attempt_policy_locks_immediately() {
        let policy = LockoutPolicy::new(1, 30).unwrap();
        let mut state = LockState::default();
        assert_eq!(
            policy.register_failure(&mut state, 0),
            FailureOutcome::Locked { wait_secs: 30 }
        );
    }

    #[test]
    fn manual_clock_shares_time_between_clones() {
        let clock = ManualClock::new(10);
        let other = clock.clone();
        clock.advance(5);
        assert_eq!(other.now(), 15);
    }
}

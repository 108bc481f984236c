use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

/// Failed-login lockout policy.
///
/// Counts consecutive failed attempts and locks the account once the
/// threshold is reached. All decisions are pure functions of the stored
/// counters and an explicit `now`, so expiry is evaluated lazily at the
/// next attempt and nothing needs a background sweeper.
#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    pub max_attempts: u32,
    pub lockout_duration: Duration,
}

impl LockoutPolicy {
    pub fn new(max_attempts: u32, lockout_duration: Duration) -> Self {
        Self {
            max_attempts,
            lockout_duration,
        }
    }

    /// Whether an account is currently locked.
    ///
    /// A `lock_until` at or before `now` counts as expired, the account is
    /// treated as unlocked without any stored state changing.
    pub fn check(&self, lock_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> LockState {
        match lock_until {
            Some(until) if until > now => LockState::Locked {
                remaining: until - now,
            },
            _ => LockState::Unlocked,
        }
    }

    /// Counter transition for one failed attempt.
    ///
    /// An expired lock restarts the window: the failure that discovers it
    /// counts as attempt one of a fresh sequence, not attempt six of the
    /// old one. Otherwise the counter increments and a lock is set when it
    /// reaches `max_attempts`.
    pub fn on_failure(
        &self,
        login_attempts: u32,
        lock_until: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> AttemptOutcome {
        if matches!(lock_until, Some(until) if until <= now) {
            return AttemptOutcome {
                login_attempts: 1,
                lock_until: None,
            };
        }

        let login_attempts = login_attempts.saturating_add(1);
        if login_attempts >= self.max_attempts {
            AttemptOutcome {
                login_attempts,
                lock_until: Some(now + self.lockout_duration),
            }
        } else {
            AttemptOutcome {
                login_attempts,
                lock_until: None,
            }
        }
    }

    /// Counter transition for a successful login: everything clears.
    pub fn on_success(&self) -> AttemptOutcome {
        AttemptOutcome {
            login_attempts: 0,
            lock_until: None,
        }
    }
}

impl Default for LockoutPolicy {
    /// Five failed attempts lock the account for fifteen minutes.
    fn default() -> Self {
        Self::new(5, Duration::minutes(15))
    }
}

/// Lock status of an account at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    Locked { remaining: Duration },
}

/// Counter state to persist after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptOutcome {
    pub login_attempts: u32,
    pub lock_until: Option<DateTime<Utc>>,
}

impl AttemptOutcome {
    /// Whether this outcome placed a lock on the account.
    pub fn locked(&self) -> bool {
        self.lock_until.is_some()
    }
}

/// Remaining lock time rounded up to whole minutes, never less than one.
///
/// Feeds user-facing messages, so a lock with forty seconds left still
/// reads as one minute rather than zero.
pub fn minutes_remaining(remaining: Duration) -> i64 {
    let seconds = remaining.num_seconds().max(0);
    ((seconds + 59) / 60).max(1)
}

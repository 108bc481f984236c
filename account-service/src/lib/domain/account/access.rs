//! Trial and subscription access rules.
//!
//! Pure functions over an [`Account`](crate::account::models::Account) and
//! an explicit `now`, shared by the HTTP gate and the subscription status
//! endpoint so both always agree.

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::account::models::Account;

/// Every new account gets a free trial of this many days.
pub const TRIAL_LENGTH_DAYS: i64 = 7;

const SECONDS_PER_DAY: i64 = 86_400;

/// Instant at which the account's trial ends.
pub fn trial_end(account: &Account) -> DateTime<Utc> {
    account.trial_start_date + Duration::days(TRIAL_LENGTH_DAYS)
}

/// Whether the trial window is still open at `now`.
pub fn has_active_trial(account: &Account, now: DateTime<Utc>) -> bool {
    now < trial_end(account)
}

/// Whole days of trial left, rounded up, never negative.
///
/// A trial with one hour remaining still reports a full day, once the
/// window has closed this stays at zero forever.
pub fn trial_days_left(account: &Account, now: DateTime<Utc>) -> i64 {
    let seconds = (trial_end(account) - now).num_seconds();
    if seconds <= 0 {
        0
    } else {
        (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
    }
}

/// Whether the account may reach paid content.
///
/// Requires an active account, and then either a subscription or a live
/// trial. Deactivation wins over everything else.
pub fn has_access(account: &Account, now: DateTime<Utc>) -> bool {
    account.is_active && (account.is_subscribed || has_active_trial(account, now))
}

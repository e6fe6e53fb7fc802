//! Throttling of credential checks.
//!
//! Every credential an account can present (password, activation code, reset
//! token) carries a [`LockoutState`]. A failed check bumps the counter and, when
//! the new count hits a step of the flow's [`Schedule`], arms a timeout during
//! which further checks are refused without looking at the candidate.
//!
//! Everything here is pure: the caller passes `now` and persists the mutated
//! state afterwards.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Failed attempts and the instant until which checks are refused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutState {
    pub tries: u32,
    pub timeout: Option<DateTime<Utc>>,
}

/// Result of checking one presented credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Verified,
    InvalidCredential,
    Expired,
    TooManyRequests { remaining_secs: u64 },
}

/// Arms a timeout of `base * multiplier` once the failure count reaches
/// `threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub threshold: u32,
    pub multiplier: u32,
}

/// Arms a timeout of `base * multiplier` on every multiple of `every` above
/// `after` that no [`Step`] covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repeat {
    pub every: u32,
    pub after: u32,
    pub multiplier: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub base: Duration,
    pub steps: Vec<Step>,
    pub repeat: Option<Repeat>,
}

impl Schedule {
    /// 3 failures: 1 × base, 5: 5 × base, 8: 10 × base, then every 5th
    /// failure past 10: 30 × base.
    pub fn login(base: Duration) -> Self {
        Self {
            base,
            steps: vec![Step { threshold: 3, multiplier: 1 }, Step { threshold: 5, multiplier: 5 }, Step { threshold: 8, multiplier: 10 }],
            repeat: Some(Repeat { every: 5, after: 10, multiplier: 30 }),
        }
    }

    /// 5 failures: 1 × base, 7: 5 × base, 10: 10 × base, then every other
    /// multiple of 5: 30 × base.
    pub fn one_time_secret(base: Duration) -> Self {
        Self {
            base,
            steps: vec![Step { threshold: 5, multiplier: 1 }, Step { threshold: 7, multiplier: 5 }, Step { threshold: 10, multiplier: 10 }],
            repeat: Some(Repeat { every: 5, after: 0, multiplier: 30 }),
        }
    }

    /// The multiplier armed when the failure count becomes `tries`.
    pub fn multiplier_for(&self, tries: u32) -> Option<u32> {
        if let Some(step) = self.steps.iter().find(|step| step.threshold == tries) {
            return Some(step.multiplier);
        }

        self.repeat
            .filter(|repeat| repeat.every > 0 && tries > repeat.after && tries % repeat.every == 0)
            .map(|repeat| repeat.multiplier)
    }

    fn timeout_for(&self, tries: u32) -> Option<TimeDelta> {
        let multiplier = self.multiplier_for(tries)?;
        let window = self.base.checked_mul(multiplier).unwrap_or(Duration::MAX);
        Some(TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX))
    }
}

impl LockoutState {
    /// Seconds left before checks are accepted again, rounded up.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> Option<u64> {
        let timeout = self.timeout.filter(|timeout| *timeout > now)?;
        let millis = (timeout - now).num_milliseconds().max(1);
        Some(millis.unsigned_abs().div_ceil(1000))
    }

    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.remaining_secs(now).is_some()
    }

    /// Counts one failure and arms the timeout the schedule assigns to the new
    /// count, if any.
    pub fn record_failure(&mut self, schedule: &Schedule, now: DateTime<Utc>) {
        self.tries = self.tries.saturating_add(1);
        if let Some(window) = schedule.timeout_for(self.tries) {
            self.timeout = Some(now.checked_add_signed(window).unwrap_or(DateTime::<Utc>::MAX_UTC));
        }
    }

    pub fn clear(&mut self) {
        self.tries = 0;
        self.timeout = None;
    }

    /// Runs one check whose outcome is already known, as for a password whose
    /// hash comparison happened elsewhere.
    pub fn check(&mut self, schedule: &Schedule, now: DateTime<Utc>, matches: bool) -> Verdict {
        if let Some(remaining_secs) = self.remaining_secs(now) {
            return Verdict::TooManyRequests { remaining_secs };
        }

        if matches {
            self.clear();
            Verdict::Verified
        } else {
            self.record_failure(schedule, now);
            Verdict::InvalidCredential
        }
    }
}

/// A secret sent out of band (activation code, reset token) that can be
/// redeemed once before it expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneTimeSecret<T> {
    pub value: Option<T>,
    pub expires: Option<DateTime<Utc>>,
    pub lockout: LockoutState,
}

impl<T> Default for OneTimeSecret<T> {
    fn default() -> Self {
        Self { value: None, expires: None, lockout: LockoutState::default() }
    }
}

impl<T: PartialEq> OneTimeSecret<T> {
    /// Replaces the secret, leaving the failure count alone.
    pub fn issue(&mut self, value: T, expires: DateTime<Utc>) {
        self.value = Some(value);
        self.expires = Some(expires);
    }

    /// Checks `candidate`; on success the secret is consumed.
    pub fn verify(&mut self, candidate: &T, schedule: &Schedule, now: DateTime<Utc>) -> Verdict {
        if let Some(remaining_secs) = self.lockout.remaining_secs(now) {
            return Verdict::TooManyRequests { remaining_secs };
        }

        if self.expires.is_some_and(|expires| expires < now) {
            return Verdict::Expired;
        }

        if self.value.as_ref() == Some(candidate) {
            self.value = None;
            self.expires = None;
            self.lockout.clear();
            Verdict::Verified
        } else {
            self.lockout.record_failure(schedule, now);
            Verdict::InvalidCredential
        }
    }
}

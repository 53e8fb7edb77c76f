use chrono::{DateTime, Duration, Utc};

/// Persisted brute-force counters of one account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockoutState {
    pub failed_attempts: i32,
    pub lockout_until: Option<DateTime<Utc>>,
}

/// What a failed password check did to the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureEffect {
    Counted { failed_attempts: i32 },
    LockedUntil(DateTime<Utc>),
    /// The account was already locked; nothing was counted.
    StillLocked(DateTime<Utc>),
}

#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    max_failed_attempts: i32,
    lockout_duration: Duration,
}

impl LockoutPolicy {
    pub fn new(max_failed_attempts: u32, lockout_duration: Duration) -> Self {
        Self {
            max_failed_attempts: i32::try_from(max_failed_attempts.max(1)).unwrap_or(i32::MAX),
            lockout_duration,
        }
    }

    /// `Some(until)` while the lockout window is still open.
    pub fn locked_until(&self, state: &LockoutState, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        state.lockout_until.filter(|until| *until > now)
    }

    pub fn is_locked(&self, state: &LockoutState, now: DateTime<Utc>) -> bool {
        self.locked_until(state, now).is_some()
    }

    pub fn reset(&self, state: &mut LockoutState) {
        *state = LockoutState::default();
    }

    /// Efface un verrou échu. Retourne `true` si l'état a changé.
    pub fn clear_if_expired(&self, state: &mut LockoutState, now: DateTime<Utc>) -> bool {
        match state.lockout_until {
            Some(until) if until <= now => {
                self.reset(state);
                true
            }
            _ => false,
        }
    }

    /// Compte un échec; au seuil, l'account est verrouillé pour `lockout_duration`.
    /// Un account déjà verrouillé reste tel quel: le verrou n'est pas prolongé.
    pub fn register_failure(&self, state: &mut LockoutState, now: DateTime<Utc>) -> FailureEffect {
        if let Some(until) = self.locked_until(state, now) {
            return FailureEffect::StillLocked(until);
        }
        // an expired lock restarts the count from zero
        self.clear_if_expired(state, now);

        state.failed_attempts = state.failed_attempts.saturating_add(1);
        if state.failed_attempts >= self.max_failed_attempts {
            let until = now + self.lockout_duration;
            state.lockout_until = Some(until);
            FailureEffect::LockedUntil(until)
        } else {
            FailureEffect::Counted {
                failed_attempts: state.failed_attempts,
            }
        }
    }

    /// A correct password resets the counters, unless the lock is still open,
    /// in which case the state is left untouched and `Err(until)` is returned.
    pub fn register_success(
        &self,
        state: &mut LockoutState,
        now: DateTime<Utc>,
    ) -> Result<(), DateTime<Utc>> {
        match self.locked_until(state, now) {
            Some(until) => Err(until),
            None => {
                self.reset(state);
                Ok(())
            }
        }
    }
}

/// Whole seconds left before `until`, rounded up, never below one.
pub fn retry_after_secs(until: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (until - now).num_milliseconds().max(1);
    u64::try_from(millis).map_or(1, |ms| ms.div_ceil(1000))
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self::new(5, Duration::minutes(15))
    }
}

//! Attempt generations per translation slot.
//! Each gate request gets a fresh generation; a settlement is applied only if
//! its generation is still the live one for the key, so a cancelled or
//! superseded request can never rewrite the slot's state.
//!
//! The ledger has no lock of its own: the manager keeps it under the same
//! lock as the key sets so "is this attempt current" and "move the key" are
//! one step.

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;

use crate::models::TranslationKey;

struct LiveAttempt {
    generation: u64,
    token: CancellationToken,
}

/// Handle carried by the task awaiting the gate.
#[derive(Debug, Clone)]
pub struct AttemptGuard {
    key: TranslationKey,
    generation: u64,
    token: CancellationToken,
}

impl AttemptGuard {
    pub fn key(&self) -> &TranslationKey {
        &self.key
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Fired only when the ledger was told to abort the attempt.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

#[derive(Default)]
pub struct AttemptLedger {
    live: HashMap<TranslationKey, LiveAttempt>,
    generation: u64,
}

impl AttemptLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new attempt for `key`, superseding any live one.
    pub fn begin(&mut self, key: &TranslationKey) -> AttemptGuard {
        self.generation += 1;
        let token = CancellationToken::new();
        self.live.insert(
            key.clone(),
            LiveAttempt {
                generation: self.generation,
                token: token.clone(),
            },
        );
        AttemptGuard {
            key: key.clone(),
            generation: self.generation,
            token,
        }
    }

    #[inline]
    pub fn is_current(&self, guard: &AttemptGuard) -> bool {
        self.live
            .get(&guard.key)
            .is_some_and(|a| a.generation == guard.generation)
    }

    /// Retire the attempt. Returns false when it was already stale, in which
    /// case the caller must leave the slot alone.
    pub fn finish(&mut self, guard: &AttemptGuard) -> bool {
        if !self.is_current(guard) {
            return false;
        }
        self.live.remove(&guard.key);
        true
    }

    /// Drop the live attempt for `key` so its settlement is ignored.
    /// With `abort`, also fire its token. Returns the invalidated generation.
    pub fn invalidate(&mut self, key: &TranslationKey, abort: bool) -> Option<u64> {
        let attempt = self.live.remove(key)?;
        if abort {
            attempt.token.cancel();
        }
        Some(attempt.generation)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(lang: &str) -> TranslationKey {
        TranslationKey::new("p1", lang)
    }

    #[test]
    fn finish_retires_current_attempt_once() {
        let mut ledger = AttemptLedger::new();
        let guard = ledger.begin(&key("da"));
        assert!(ledger.is_current(&guard));
        assert!(ledger.finish(&guard));
        assert!(!ledger.finish(&guard));
        assert_eq!(ledger.live_count(), 0);
    }

    #[test]
    fn invalidated_attempt_is_stale_and_new_one_is_not() {
        let mut ledger = AttemptLedger::new();
        let old = ledger.begin(&key("da"));
        assert_eq!(ledger.invalidate(&key("da"), false), Some(old.generation()));
        assert!(!old.token().is_cancelled());

        let new = ledger.begin(&key("da"));
        assert!(new.generation() > old.generation());
        assert!(!ledger.finish(&old));
        assert!(ledger.is_current(&new));
    }

    #[test]
    fn abort_fires_token() {
        let mut ledger = AttemptLedger::new();
        let guard = ledger.begin(&key("sv"));
        ledger.invalidate(&key("sv"), true);
        assert!(guard.token().is_cancelled());
        assert_eq!(ledger.invalidate(&key("sv"), true), None);
    }

    #[test]
    fn keys_are_independent() {
        let mut ledger = AttemptLedger::new();
        let da = ledger.begin(&key("da"));
        let sv = ledger.begin(&key("sv"));
        ledger.invalidate(&key("da"), false);
        assert!(!ledger.is_current(&da));
        assert!(ledger.is_current(&sv));
    }
}

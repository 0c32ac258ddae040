//! Quota ledger
//!
//! The admission decision point. Each key owns one counter cell guarded by its
//! own mutex; the map only hands out cells, so keys never contend with each
//! other and the critical section is a constant number of integer operations.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Duration;
use dashmap::DashMap;
use metrics::counter;
use tracing::{debug, info};

use crate::domain::quota::{AdmissionDecision, QuotaSnapshot, QuotaState, MAX_PERIOD_SECONDS};
use crate::domain::{Clock, DomainError};

#[derive(Debug)]
struct QuotaCell {
    state: Mutex<QuotaState>,
}

impl QuotaCell {
    fn new(state: QuotaState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, QuotaState>, DomainError> {
        self.state
            .lock()
            .map_err(|e| DomainError::internal(format!("Quota state lock poisoned: {}", e)))
    }

    /// Lock a cell that has not been retired
    fn lock_live(&self, key_id: &str) -> Result<MutexGuard<'_, QuotaState>, DomainError> {
        let state = self.lock()?;
        if state.retired {
            return Err(DomainError::key_not_found(key_id));
        }
        Ok(state)
    }
}

/// Per-key daily quota ledger
#[derive(Debug)]
pub struct QuotaLedger {
    cells: DashMap<String, Arc<QuotaCell>>,
    clock: Arc<dyn Clock>,
    period: Duration,
}

impl QuotaLedger {
    pub fn new(clock: Arc<dyn Clock>, period: Duration) -> Result<Self, DomainError> {
        if period <= Duration::zero() {
            return Err(DomainError::invalid_config(format!(
                "quota period must be positive, got {}s",
                period.num_seconds()
            )));
        }

        if period > Duration::seconds(MAX_PERIOD_SECONDS as i64) {
            return Err(DomainError::invalid_config(format!(
                "quota period must not exceed {}s, got {}s",
                MAX_PERIOD_SECONDS,
                period.num_seconds()
            )));
        }

        Ok(Self {
            cells: DashMap::new(),
            clock,
            period,
        })
    }

    /// Ledger with the standard 24 hour period
    pub fn daily(clock: Arc<dyn Clock>) -> Self {
        Self {
            cells: DashMap::new(),
            clock,
            period: Duration::hours(24),
        }
    }

    /// Start tracking a key with a fresh period beginning now.
    ///
    /// Replaces any existing cell for the id; the replaced cell is retired so
    /// callers still holding it observe the key as gone.
    pub fn register(&self, key_id: &str, limit: u64) {
        let state = QuotaState::new(key_id, limit, self.clock.now());
        let previous = self
            .cells
            .insert(key_id.to_string(), Arc::new(QuotaCell::new(state)));

        if let Some(previous) = previous {
            retire_cell(&previous);
        }

        info!(key_id = %key_id, limit, "Quota registered");
    }

    pub fn contains(&self, key_id: &str) -> bool {
        self.cells.contains_key(key_id)
    }

    fn cell(&self, key_id: &str) -> Result<Arc<QuotaCell>, DomainError> {
        // Clone the Arc so the map shard is released before the cell is locked
        self.cells
            .get(key_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| DomainError::key_not_found(key_id))
    }

    /// Atomically roll the period over if due, then admit or deny one request.
    ///
    /// Denial is a normal outcome and is returned as a value. `NotFound` is
    /// returned only for unknown or deleted keys.
    pub fn check_and_consume(&self, key_id: &str) -> Result<AdmissionDecision, DomainError> {
        let cell = self.cell(key_id)?;

        let decision = {
            let mut state = cell.lock_live(key_id)?;
            let now = self.clock.now();

            if state.roll_over(now, self.period) {
                info!(key_id = %key_id, period_start = %state.period_start, "Quota period rolled over");
            }

            state.try_consume(self.period)
        };

        counter!("quota_admissions_total", "decision" => decision.label()).increment(1);
        debug!(key_id = %key_id, decision = decision.label(), "Admission decided");

        Ok(decision)
    }

    /// Apply a new daily quota to the current period.
    ///
    /// `used` is kept; remaining capacity becomes `max(0, new_limit - used)`.
    pub fn reconfigure(&self, key_id: &str, new_limit: u64) -> Result<QuotaSnapshot, DomainError> {
        let cell = self.cell(key_id)?;
        let mut state = cell.lock_live(key_id)?;

        state.roll_over(self.clock.now(), self.period);
        let previous = state.limit;
        state.reconfigure(new_limit);

        info!(
            key_id = %key_id,
            previous_limit = previous,
            new_limit,
            used = state.used,
            remaining = state.remaining(),
            "Quota reconfigured"
        );

        Ok(state.snapshot(self.period))
    }

    /// Current quota view. A due rollover is reflected but not persisted.
    pub fn snapshot(&self, key_id: &str) -> Result<QuotaSnapshot, DomainError> {
        let cell = self.cell(key_id)?;
        let mut view = cell.lock_live(key_id)?.clone();

        view.roll_over(self.clock.now(), self.period);
        Ok(view.snapshot(self.period))
    }

    /// Stop tracking a key. In-flight consumers holding the cell see it as
    /// deleted. Returns false when the key was not tracked.
    pub fn retire(&self, key_id: &str) -> bool {
        match self.cells.remove(key_id) {
            Some((_, cell)) => {
                retire_cell(&cell);
                info!(key_id = %key_id, "Quota retired");
                true
            }
            None => false,
        }
    }
}

fn retire_cell(cell: &QuotaCell) {
    let mut state = cell.state.lock().unwrap_or_else(|e| e.into_inner());
    state.retired = true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::quota::DenyReason;
    use crate::domain::ManualClock;

    fn ledger() -> (Arc<ManualClock>, QuotaLedger) {
        let clock = Arc::new(ManualClock::at_epoch());
        let ledger = QuotaLedger::daily(clock.clone());
        (clock, ledger)
    }

    fn allowed(results: &[AdmissionDecision]) -> usize {
        results.iter().filter(|d| d.is_allow()).count()
    }

    #[test]
    fn test_rejects_non_positive_period() {
        let clock = Arc::new(ManualClock::at_epoch());
        assert!(QuotaLedger::new(clock.clone(), Duration::zero()).is_err());
        assert!(QuotaLedger::new(clock, Duration::seconds(60)).is_ok());
    }

    #[test]
    fn test_rejects_oversized_period() {
        let clock = Arc::new(ManualClock::at_epoch());

        let result = QuotaLedger::new(clock.clone(), Duration::seconds(10_000_000_000_000));
        assert!(matches!(result, Err(DomainError::InvalidConfig { .. })));

        let longest = Duration::seconds(MAX_PERIOD_SECONDS as i64);
        let ledger = QuotaLedger::new(clock, longest).unwrap();
        ledger.register("abc", 1);
        assert!(ledger.check_and_consume("abc").unwrap().is_allow());
        assert!(ledger.check_and_consume("abc").unwrap().is_deny());
    }

    #[test]
    fn test_unknown_key_is_not_found() {
        let (_, ledger) = ledger();
        let result = ledger.check_and_consume("nope");
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[test]
    fn test_zero_quota_denies_every_attempt() {
        let (_, ledger) = ledger();
        ledger.register("k", 0);

        for _ in 0..5 {
            let decision = ledger.check_and_consume("k").unwrap();
            assert!(matches!(
                decision,
                AdmissionDecision::Deny {
                    reason: DenyReason::QuotaExceeded,
                    ..
                }
            ));
        }
        assert_eq!(ledger.snapshot("k").unwrap().used, 0);
    }

    #[test]
    fn test_admits_up_to_limit() {
        let (_, ledger) = ledger();
        ledger.register("k", 3);

        let results: Vec<_> = (0..5).map(|_| ledger.check_and_consume("k").unwrap()).collect();

        assert_eq!(allowed(&results), 3);
        assert_eq!(results[2], AdmissionDecision::Allow { remaining: 0 });
    }

    #[test]
    fn test_period_rollover_is_lazy() {
        let (clock, ledger) = ledger();
        ledger.register("k", 1);

        assert!(ledger.check_and_consume("k").unwrap().is_allow());
        assert!(ledger.check_and_consume("k").unwrap().is_deny());

        clock.advance(Duration::hours(23));
        assert!(ledger.check_and_consume("k").unwrap().is_deny());

        clock.advance(Duration::hours(1));
        assert!(ledger.check_and_consume("k").unwrap().is_allow());

        let snapshot = ledger.snapshot("k").unwrap();
        assert_eq!(snapshot.used, 1);
        assert_eq!(snapshot.period_start, clock.now());
    }

    #[test]
    fn test_snapshot_reflects_due_rollover_without_persisting() {
        let (clock, ledger) = ledger();
        ledger.register("k", 2);
        ledger.check_and_consume("k").unwrap();

        clock.advance(Duration::hours(25));
        let view = ledger.snapshot("k").unwrap();
        assert_eq!(view.used, 0);
        assert_eq!(view.remaining, 2);
        assert_eq!(view.period_end, clock.now() + Duration::hours(24));
    }

    #[test]
    fn test_reconfigure_below_used_denies_until_next_period() {
        let (clock, ledger) = ledger();
        ledger.register("k", 10);
        for _ in 0..7 {
            assert!(ledger.check_and_consume("k").unwrap().is_allow());
        }

        let snapshot = ledger.reconfigure("k", 5).unwrap();

        assert_eq!(snapshot.used, 7);
        assert_eq!(snapshot.limit, 5);
        assert_eq!(snapshot.remaining, 0);
        for _ in 0..3 {
            assert!(ledger.check_and_consume("k").unwrap().is_deny());
        }

        clock.advance(Duration::hours(24));
        let results: Vec<_> = (0..6).map(|_| ledger.check_and_consume("k").unwrap()).collect();
        assert_eq!(allowed(&results), 5);
    }

    #[test]
    fn test_reconfigure_above_used_grants_difference() {
        let (_, ledger) = ledger();
        ledger.register("k", 10);
        for _ in 0..7 {
            ledger.check_and_consume("k").unwrap();
        }

        let snapshot = ledger.reconfigure("k", 9).unwrap();
        assert_eq!(snapshot.remaining, 2);

        let results: Vec<_> = (0..4).map(|_| ledger.check_and_consume("k").unwrap()).collect();
        assert_eq!(allowed(&results), 2);
    }

    #[test]
    fn test_retire_makes_key_not_found() {
        let (_, ledger) = ledger();
        ledger.register("k", 5);

        assert!(ledger.retire("k"));
        assert!(!ledger.retire("k"));
        assert!(ledger.check_and_consume("k").unwrap_err().is_not_found());
        assert!(ledger.snapshot("k").unwrap_err().is_not_found());
    }

    #[test]
    fn test_in_flight_holder_sees_retirement() {
        let (_, ledger) = ledger();
        ledger.register("k", 5);

        let held = ledger.cell("k").unwrap();
        ledger.retire("k");

        assert!(held.lock_live("k").unwrap_err().is_not_found());
    }

    #[test]
    fn test_reregister_starts_fresh_and_retires_old_cell() {
        let (_, ledger) = ledger();
        ledger.register("k", 1);
        ledger.check_and_consume("k").unwrap();
        let old = ledger.cell("k").unwrap();

        ledger.register("k", 1);

        assert!(old.lock_live("k").is_err());
        assert!(ledger.check_and_consume("k").unwrap().is_allow());
    }

    #[test]
    fn test_concurrent_threads_admit_exactly_limit() {
        let (_, ledger) = ledger();
        let ledger = Arc::new(ledger);
        ledger.register("hot", 100);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    (0..50)
                        .filter(|_| ledger.check_and_consume("hot").unwrap().is_allow())
                        .count()
                })
            })
            .collect();

        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(total, 100);
        assert_eq!(ledger.snapshot("hot").unwrap().used, 100);
    }

    #[test]
    fn test_concurrent_first_access_resets_once() {
        let (clock, ledger) = ledger();
        let ledger = Arc::new(ledger);
        ledger.register("k", 20);
        for _ in 0..20 {
            ledger.check_and_consume("k").unwrap();
        }

        clock.advance(Duration::hours(24));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    (0..5)
                        .filter(|_| ledger.check_and_consume("k").unwrap().is_allow())
                        .count()
                })
            })
            .collect();

        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        // A second reset would have admitted more than one period's worth
        assert_eq!(total, 20);
        assert_eq!(ledger.snapshot("k").unwrap().period_start, clock.now());
    }

    #[test]
    fn test_keys_are_independent() {
        let (_, ledger) = ledger();
        ledger.register("a", 1);
        ledger.register("b", 1);

        assert!(ledger.check_and_consume("a").unwrap().is_allow());
        assert!(ledger.check_and_consume("a").unwrap().is_deny());
        assert!(ledger.check_and_consume("b").unwrap().is_allow());
    }
}

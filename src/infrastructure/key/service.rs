//! Key service
//!
//! Owns the key lifecycle and keeps the quota ledger and bindings in step
//! with the key store.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::domain::key::{validate_quota, validate_secret, Key, KeyFields, KeyId, KeyPatch, KeyRepository};
use crate::domain::quota::QuotaSnapshot;
use crate::domain::{ApiBindingRepository, Clock, DomainError};
use crate::infrastructure::quota::QuotaLedger;

use super::generator::SecretGenerator;

/// A key together with its live quota state
#[derive(Debug, Clone, Serialize)]
pub struct KeyView {
    #[serde(flatten)]
    pub key: Key,
    pub quota: QuotaSnapshot,
}

/// Key service for managing keys
#[derive(Debug)]
pub struct KeyService {
    repository: Arc<dyn KeyRepository>,
    bindings: Arc<dyn ApiBindingRepository>,
    ledger: Arc<QuotaLedger>,
    clock: Arc<dyn Clock>,
    generator: SecretGenerator,
    // Serializes create/update/delete so the store and the ledger never
    // disagree about which keys exist. Admission never takes it.
    lifecycle: Mutex<()>,
}

impl KeyService {
    pub fn new(
        repository: Arc<dyn KeyRepository>,
        bindings: Arc<dyn ApiBindingRepository>,
        ledger: Arc<QuotaLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            bindings,
            ledger,
            clock,
            generator: SecretGenerator::default(),
            lifecycle: Mutex::new(()),
        }
    }

    /// Create a new key and start tracking its quota
    pub async fn create(&self, id: &str, fields: KeyFields) -> Result<Key, DomainError> {
        let id = KeyId::new(id)?;
        let quota = validate_quota(fields.quota_per_day)?;
        let secret = match fields.secret {
            Some(secret) => {
                validate_secret(&secret)?;
                secret
            }
            None => self.generator.generate(),
        };

        let _guard = self.lifecycle.lock().await;

        let key = Key::new(id.clone(), secret, quota, self.clock.now());
        let created = self.repository.create(key).await?;
        self.ledger.register(id.as_str(), quota);

        info!(key_id = %id, quota_per_day = quota, "Key created");
        Ok(created)
    }

    /// Get a key by ID
    pub async fn get(&self, id: &str) -> Result<Key, DomainError> {
        self.repository
            .get(id)
            .await?
            .ok_or_else(|| DomainError::key_not_found(id))
    }

    /// Get a key with its current quota usage
    pub async fn view(&self, id: &str) -> Result<KeyView, DomainError> {
        let key = self.get(id).await?;
        let quota = self.ledger.snapshot(id)?;

        Ok(KeyView { key, quota })
    }

    /// Merge a patch onto an existing key.
    ///
    /// A quota change is applied to the running period immediately.
    pub async fn update(&self, id: &str, patch: KeyPatch) -> Result<Key, DomainError> {
        let _guard = self.lifecycle.lock().await;

        let mut key = self.get(id).await?;
        let new_quota = key.apply(&patch, self.clock.now())?;

        let updated = self.repository.update(&key).await?;

        if let Some(quota) = new_quota {
            self.ledger.reconfigure(id, quota)?;
        }

        info!(key_id = %id, quota_changed = new_quota.is_some(), "Key updated");
        Ok(updated)
    }

    /// Delete a key along with its quota state and bindings.
    ///
    /// Usage history is left in place.
    pub async fn delete(&self, id: &str) -> Result<Key, DomainError> {
        let key_id = KeyId::new(id).map_err(|_| DomainError::key_not_found(id))?;

        let _guard = self.lifecycle.lock().await;

        if !self.repository.exists(id).await? {
            return Err(DomainError::key_not_found(id));
        }

        // Stop admissions first so nothing is admitted for a half-deleted key
        self.ledger.retire(id);

        let deleted = self
            .repository
            .delete(&key_id)
            .await?
            .ok_or_else(|| DomainError::key_not_found(id))?;
        let unbound = self.bindings.remove_all(id).await?;

        info!(key_id = %id, bindings_removed = unbound, "Key deleted");
        Ok(deleted)
    }

    /// All key ids in ascending order
    pub async fn list_ids(&self) -> Result<Vec<String>, DomainError> {
        let ids = self.repository.list_ids().await?;
        debug!(count = ids.len(), "Keys listed");
        Ok(ids)
    }

    pub fn repository(&self) -> Arc<dyn KeyRepository> {
        Arc::clone(&self.repository)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::quota::AdmissionDecision;
    use crate::domain::ManualClock;
    use crate::infrastructure::binding::InMemoryApiBindingRepository;
    use crate::infrastructure::key::InMemoryKeyRepository;

    struct Fixture {
        service: KeyService,
        ledger: Arc<QuotaLedger>,
        bindings: Arc<InMemoryApiBindingRepository>,
    }

    fn fixture() -> Fixture {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::at_epoch());
        let ledger = Arc::new(QuotaLedger::daily(clock.clone()));
        let bindings = Arc::new(InMemoryApiBindingRepository::new());
        let service = KeyService::new(
            Arc::new(InMemoryKeyRepository::new()),
            bindings.clone(),
            ledger.clone(),
            clock,
        );

        Fixture {
            service,
            ledger,
            bindings,
        }
    }

    #[tokio::test]
    async fn test_create_generates_secret_and_registers_quota() {
        let f = fixture();

        let key = f.service.create("abc", KeyFields::with_quota(3)).await.unwrap();

        assert!(key.secret().starts_with("gk_"));
        assert_eq!(key.quota_per_day(), 3);
        assert!(f.ledger.contains("abc"));
        assert_eq!(f.ledger.snapshot("abc").unwrap().remaining, 3);
    }

    #[tokio::test]
    async fn test_create_keeps_supplied_secret() {
        let f = fixture();

        let key = f
            .service
            .create("abc", KeyFields::with_quota(1).with_secret("mine"))
            .await
            .unwrap();

        assert_eq!(key.secret(), "mine");
    }

    #[tokio::test]
    async fn test_create_collision_is_already_exists() {
        let f = fixture();
        f.service.create("abc", KeyFields::with_quota(5)).await.unwrap();

        // The running period must not be reset by the failed create
        f.ledger.check_and_consume("abc").unwrap();

        let result = f.service.create("abc", KeyFields::with_quota(50)).await;
        assert!(matches!(result, Err(DomainError::AlreadyExists { .. })));
        assert_eq!(f.ledger.snapshot("abc").unwrap().used, 1);
    }

    #[tokio::test]
    async fn test_create_rejects_negative_quota_and_bad_id() {
        let f = fixture();

        let negative = f.service.create("abc", KeyFields::with_quota(-1)).await;
        assert!(matches!(negative, Err(DomainError::InvalidConfig { .. })));

        let bad_id = f.service.create("a b", KeyFields::with_quota(1)).await;
        assert!(matches!(bad_id, Err(DomainError::Validation { .. })));

        assert!(f.service.list_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let f = fixture();
        assert!(f.service.get("ghost").await.unwrap_err().is_not_found());
        assert!(f.service.view("ghost").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_update_lowering_quota_below_usage() {
        let f = fixture();
        f.service.create("abc", KeyFields::with_quota(10)).await.unwrap();
        for _ in 0..7 {
            f.ledger.check_and_consume("abc").unwrap();
        }

        let updated = f.service.update("abc", KeyPatch::quota(5)).await.unwrap();
        assert_eq!(updated.quota_per_day(), 5);

        let view = f.service.view("abc").await.unwrap();
        assert_eq!(view.quota.used, 7);
        assert_eq!(view.quota.remaining, 0);
        assert!(f.ledger.check_and_consume("abc").unwrap().is_deny());
    }

    #[tokio::test]
    async fn test_update_raising_quota_frees_capacity() {
        let f = fixture();
        f.service.create("abc", KeyFields::with_quota(2)).await.unwrap();
        f.ledger.check_and_consume("abc").unwrap();
        f.ledger.check_and_consume("abc").unwrap();

        f.service.update("abc", KeyPatch::quota(4)).await.unwrap();

        assert_eq!(
            f.ledger.check_and_consume("abc").unwrap(),
            AdmissionDecision::Allow { remaining: 1 }
        );
    }

    #[tokio::test]
    async fn test_update_secret_leaves_quota_alone() {
        let f = fixture();
        f.service.create("abc", KeyFields::with_quota(2)).await.unwrap();
        f.ledger.check_and_consume("abc").unwrap();

        let patch = KeyPatch {
            secret: Some("rotated".to_string()),
            quota_per_day: None,
        };
        let updated = f.service.update("abc", patch).await.unwrap();

        assert_eq!(updated.secret(), "rotated");
        assert_eq!(f.ledger.snapshot("abc").unwrap().used, 1);
    }

    #[tokio::test]
    async fn test_update_missing_or_invalid() {
        let f = fixture();

        let missing = f.service.update("ghost", KeyPatch::quota(1)).await;
        assert!(missing.unwrap_err().is_not_found());

        f.service.create("abc", KeyFields::with_quota(2)).await.unwrap();
        let negative = f.service.update("abc", KeyPatch::quota(-3)).await;
        assert!(matches!(negative, Err(DomainError::InvalidConfig { .. })));
        assert_eq!(f.service.get("abc").await.unwrap().quota_per_day(), 2);
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let f = fixture();
        f.service.create("abc", KeyFields::with_quota(2)).await.unwrap();
        f.bindings.bind("abc", "weather").await.unwrap();

        f.service.delete("abc").await.unwrap();

        assert!(f.service.get("abc").await.unwrap_err().is_not_found());
        assert!(!f.ledger.contains("abc"));
        assert!(f.ledger.check_and_consume("abc").unwrap_err().is_not_found());
        assert!(f.bindings.apis_for("abc").await.unwrap().is_empty());

        let again = f.service.delete("abc").await;
        assert!(again.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_recreate_after_delete_starts_fresh() {
        let f = fixture();
        f.service.create("abc", KeyFields::with_quota(1)).await.unwrap();
        f.ledger.check_and_consume("abc").unwrap();
        f.service.delete("abc").await.unwrap();

        f.service.create("abc", KeyFields::with_quota(1)).await.unwrap();

        assert!(f.ledger.check_and_consume("abc").unwrap().is_allow());
    }

    #[tokio::test]
    async fn test_list_ids_sorted() {
        let f = fixture();
        for id in ["zeta", "alpha", "mid"] {
            f.service.create(id, KeyFields::with_quota(1)).await.unwrap();
        }

        assert_eq!(
            f.service.list_ids().await.unwrap(),
            vec!["alpha", "mid", "zeta"]
        );
    }
}

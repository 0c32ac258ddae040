//! Key validation utilities

use thiserror::Error;

use crate::domain::DomainError;

/// Errors that can occur while validating key input
#[derive(Debug, Error, Clone, PartialEq)]
pub enum KeyValidationError {
    #[error("Key ID cannot be empty")]
    EmptyId,

    #[error("Key ID exceeds maximum length of {0} characters")]
    TooLong(usize),

    #[error("Key ID contains invalid character: '{0}'. Only alphanumeric characters, hyphens and underscores are allowed")]
    InvalidCharacter(char),

    #[error("Key secret cannot be empty")]
    EmptySecret,

    #[error("quota_per_day must be >= 0, got {0}")]
    NegativeQuota(i64),
}

impl From<KeyValidationError> for DomainError {
    fn from(err: KeyValidationError) -> Self {
        match err {
            KeyValidationError::NegativeQuota(_) => DomainError::invalid_config(err.to_string()),
            _ => DomainError::validation(err.to_string()),
        }
    }
}

const MAX_KEY_ID_LENGTH: usize = 64;

/// Validate a key ID
///
/// Rules:
/// - Cannot be empty
/// - Maximum 64 characters
/// - Only ASCII alphanumeric characters, hyphens and underscores
pub fn validate_key_id(id: &str) -> Result<(), KeyValidationError> {
    if id.is_empty() {
        return Err(KeyValidationError::EmptyId);
    }

    if id.len() > MAX_KEY_ID_LENGTH {
        return Err(KeyValidationError::TooLong(MAX_KEY_ID_LENGTH));
    }

    if let Some(c) = id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(KeyValidationError::InvalidCharacter(c));
    }

    Ok(())
}

/// Validate a requested quota and convert it to the stored representation
pub fn validate_quota(quota_per_day: i64) -> Result<u64, KeyValidationError> {
    u64::try_from(quota_per_day).map_err(|_| KeyValidationError::NegativeQuota(quota_per_day))
}

pub fn validate_secret(secret: &str) -> Result<(), KeyValidationError> {
    if secret.trim().is_empty() {
        return Err(KeyValidationError::EmptySecret);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ids() {
        assert!(validate_key_id("abc").is_ok());
        assert!(validate_key_id("key-1_prod").is_ok());
        assert!(validate_key_id(&"a".repeat(64)).is_ok());
    }

    #[test]
    fn test_invalid_ids() {
        assert_eq!(validate_key_id(""), Err(KeyValidationError::EmptyId));
        assert_eq!(
            validate_key_id(&"a".repeat(65)),
            Err(KeyValidationError::TooLong(64))
        );
        assert_eq!(
            validate_key_id("key/1"),
            Err(KeyValidationError::InvalidCharacter('/'))
        );
    }

    #[test]
    fn test_quota_must_not_be_negative() {
        assert_eq!(validate_quota(0), Ok(0));
        assert_eq!(validate_quota(100), Ok(100));
        assert_eq!(
            validate_quota(-1),
            Err(KeyValidationError::NegativeQuota(-1))
        );
    }

    #[test]
    fn test_negative_quota_maps_to_invalid_config() {
        let err: DomainError = KeyValidationError::NegativeQuota(-5).into();
        assert!(matches!(err, DomainError::InvalidConfig { .. }));

        let err: DomainError = KeyValidationError::EmptyId.into();
        assert!(matches!(err, DomainError::Validation { .. }));
    }
}

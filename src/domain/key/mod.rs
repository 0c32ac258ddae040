//! Key domain
//!
//! Keys are the unit of admission: each carries a secret and a daily quota.

mod entity;
mod repository;
mod validation;

pub use entity::{Key, KeyFields, KeyId, KeyPatch};
pub use repository::KeyRepository;
pub use validation::{validate_key_id, validate_quota, validate_secret, KeyValidationError};

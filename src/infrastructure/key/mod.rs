//! Key infrastructure

mod generator;
mod repository;
mod service;

pub use generator::SecretGenerator;
pub use repository::InMemoryKeyRepository;
pub use service::{KeyService, KeyView};

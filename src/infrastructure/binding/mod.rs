//! API binding infrastructure

mod repository;
mod service;

pub use repository::{InMemoryApiBindingRepository, InMemoryApiCatalog};
pub use service::{ApiBindingService, BoundApi};

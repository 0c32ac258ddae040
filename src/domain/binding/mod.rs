//! API binding domain
//!
//! Which upstream APIs each key is authorized to call.

mod entity;
mod repository;

pub use entity::{callable_url, validate_api_name, ApiDefinition};
pub use repository::{ApiBindingRepository, ApiCatalog};

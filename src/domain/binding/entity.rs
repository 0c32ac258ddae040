//! API definitions a key can be bound to

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// An upstream API published through the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDefinition {
    pub name: String,
    pub upstream_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ApiDefinition {
    pub fn new(name: impl Into<String>, upstream_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            upstream_url: upstream_url.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        validate_api_name(&self.name)?;

        if !(self.upstream_url.starts_with("http://") || self.upstream_url.starts_with("https://"))
        {
            return Err(DomainError::validation(format!(
                "API '{}' upstream_url must be an http(s) URL",
                self.name
            )));
        }

        Ok(())
    }
}

/// API names appear in URL paths, so they share the key id alphabet
pub fn validate_api_name(name: &str) -> Result<(), DomainError> {
    if name.is_empty() {
        return Err(DomainError::validation("API name cannot be empty"));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(DomainError::validation(format!(
            "API name '{}' contains invalid characters",
            name
        )));
    }

    Ok(())
}

/// Public URL through which a key calls a bound API
pub fn callable_url(base_url: &str, api_name: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), api_name)
}

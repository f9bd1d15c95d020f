use serde::Serialize;
use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound {
        entity: String,
        field: String,
        message: String,
    },

    #[error("Permission denied on {entity}: {message}")]
    PermissionDenied {
        entity: String,
        field: String,
        message: String,
    },

    #[error("Validation error on '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Cache store unavailable ({driver}): {message}")]
    StoreUnavailable { driver: String, message: String },

    #[error("Operation '{operation}' is not supported by the {driver} cache store")]
    UnsupportedOperation { driver: String, operation: String },

    #[error("Cache error: {message}")]
    Cache { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Field-level failure as surfaced at the API boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub messages: Vec<String>,
}

impl DomainError {
    pub fn not_found(entity: impl Into<String>, message: impl Into<String>) -> Self {
        let entity = entity.into();
        Self::NotFound {
            field: entity.clone(),
            entity,
            message: message.into(),
        }
    }

    /// Not-found error reported against a specific input field (e.g. `task_id`)
    pub fn not_found_on(
        entity: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            entity: entity.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn permission_denied(entity: impl Into<String>, message: impl Into<String>) -> Self {
        let entity = entity.into();
        Self::PermissionDenied {
            field: entity.clone(),
            entity,
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn store_unavailable(driver: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            driver: driver.into(),
            message: message.into(),
        }
    }

    pub fn unsupported(driver: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            driver: driver.into(),
            operation: operation.into(),
        }
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true when the backing cache store could not be reached
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. })
    }

    /// Converts the error into the structured field-level form used by the API boundary
    pub fn field_error(&self) -> FieldError {
        let (field, message) = match self {
            Self::NotFound { field, message, .. }
            | Self::PermissionDenied { field, message, .. }
            | Self::Validation { field, message } => (field.clone(), message.clone()),
            Self::StoreUnavailable { .. } | Self::UnsupportedOperation { .. } => {
                ("cache".to_string(), self.to_string())
            }
            Self::Cache { message } => ("cache".to_string(), message.clone()),
            Self::Configuration { message } => ("configuration".to_string(), message.clone()),
            Self::Internal { message } => ("internal".to_string(), message.clone()),
        };

        FieldError {
            field,
            messages: vec![message],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let error = DomainError::not_found("task", "Task not found.");
        assert_eq!(error.to_string(), "Not found: Task not found.");
    }

    #[test]
    fn test_validation_error() {
        let error = DomainError::validation("title", "The title field is required.");
        assert_eq!(
            error.to_string(),
            "Validation error on 'title': The title field is required."
        );
    }

    #[test]
    fn test_permission_denied_field_error() {
        let error = DomainError::permission_denied(
            "task",
            "You do not have permission to update this task.",
        );

        let field_error = error.field_error();
        assert_eq!(field_error.field, "task");
        assert_eq!(
            field_error.messages,
            vec!["You do not have permission to update this task.".to_string()]
        );
    }

    #[test]
    fn test_not_found_on_field() {
        let error = DomainError::not_found_on("task", "task_id", "Task not found.");
        assert_eq!(error.field_error().field, "task_id");
    }

    #[test]
    fn test_store_unavailable() {
        let error = DomainError::store_unavailable("redis", "connection refused");
        assert!(error.is_store_unavailable());
        assert_eq!(error.field_error().field, "cache");
        assert!(!DomainError::cache("bad json").is_store_unavailable());
    }
}

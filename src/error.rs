// ⚠️ Error Taxonomy
// Structural problems abort a request; input gaps never reach this module
// (they degrade to inline markers in the rendered document).

use std::path::PathBuf;
use thiserror::Error;

/// Problems with a set of placeholder mappings for one template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("duplicate placeholder {placeholder} in template {template_id}")]
    DuplicatePlaceholder {
        template_id: String,
        placeholder: String,
    },

    #[error("empty placeholder token in template {template_id}")]
    EmptyPlaceholder { template_id: String },

    #[error("invalid source descriptor '{descriptor}' for placeholder {placeholder}")]
    InvalidSource {
        placeholder: String,
        descriptor: String,
    },

    #[error("mapping for {placeholder} belongs to template {found}, not {expected}")]
    ForeignMapping {
        expected: String,
        found: String,
        placeholder: String,
    },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),
}

/// Everything that can abort a document generation request.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("client not found: {name}")]
    ClientNotFound { name: String },

    #[error("unknown client field '{field}' referenced by {placeholder} in template {template_id}")]
    UnknownField {
        template_id: String,
        placeholder: String,
        field: String,
    },

    #[error("template not found: {template_id} (looked in {})", .path.display())]
    TemplateNotFound { template_id: String, path: PathBuf },

    #[error("template {template_id} could not be read from {}: {source}", .path.display())]
    TemplateUnreadable {
        template_id: String,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to persist document to {}: {source}", .path.display())]
    PersistFailure {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("runtime input {key} given under several spellings: {}", .spellings.join(", "))]
    ConflictingInput { key: String, spellings: Vec<String> },

    #[error("record store lookup timed out after {seconds}s")]
    LookupTimeout { seconds: u64 },

    #[error("invalid placeholder catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("record store error: {0}")]
    Store(#[from] StoreError),
}

impl GenerationError {
    /// Short machine-readable tag, used in audit data and API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::ClientNotFound { .. } => "client_not_found",
            GenerationError::UnknownField { .. } => "unknown_field",
            GenerationError::TemplateNotFound { .. } => "template_not_found",
            GenerationError::TemplateUnreadable { .. } => "template_unreadable",
            GenerationError::PersistFailure { .. } => "persist_failure",
            GenerationError::ConflictingInput { .. } => "conflicting_input",
            GenerationError::LookupTimeout { .. } => "lookup_timeout",
            GenerationError::Catalog(_) => "invalid_catalog",
            GenerationError::Store(_) => "store_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = GenerationError::UnknownField {
            template_id: "change_registration.txt".to_string(),
            placeholder: "<<CAPITAL>>".to_string(),
            field: "capital".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("capital"));
        assert!(msg.contains("<<CAPITAL>>"));
        assert!(msg.contains("change_registration.txt"));
        assert_eq!(err.kind(), "unknown_field");
    }

    #[test]
    fn test_persist_failure_keeps_source() {
        use std::error::Error as _;

        let err = GenerationError::PersistFailure {
            path: PathBuf::from("/nope/out.txt"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("/nope/out.txt"));
    }
}

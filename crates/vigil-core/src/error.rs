use thiserror::Error;

/// Top-level error type for the Vigil framework.
///
/// Builder-time errors (`UnknownType`, `DuplicateType`, `SchemaConflict`,
/// `InvalidPredicate`, `SchemaLocked`) are programmer errors: fail fast, no
/// retry. `Executor` is the only category a caller might legitimately retry;
/// Vigil itself never retries.
#[derive(Error, Debug)]
pub enum VigilError {
    #[error("Unknown node type: {0}")]
    UnknownType(String),

    #[error("Node type already registered: {0}")]
    DuplicateType(String),

    #[error("Schema conflict on {type_name}: {name} is already declared")]
    SchemaConflict { type_name: String, name: String },

    #[error("Invalid predicate on {type_name}.{property}: {reason}")]
    InvalidPredicate {
        type_name: String,
        property: String,
        reason: String,
    },

    #[error("Schema registry is locked, provisioning has ended: {0}")]
    SchemaLocked(String),

    #[error("Executor error: {source}")]
    Executor {
        #[source]
        source: anyhow::Error,
    },

    #[error("Materialization error for {type_name}.{field}: {reason}")]
    Materialize {
        type_name: String,
        field: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl VigilError {
    /// Wrap a backend/transport failure. The source error is surfaced to the
    /// caller verbatim.
    pub fn executor(source: impl Into<anyhow::Error>) -> Self {
        Self::Executor {
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, VigilError>;

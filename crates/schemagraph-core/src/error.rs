use thiserror::Error;

/// The user-visible failure kinds of every model operation.
///
/// The set is closed: callers match on it to tell bad input apart from
/// schema mistakes and store failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A value or key in a where/data/properties bag failed sanitization.
    Inputs,
    /// A relation id was not declared on the model.
    Relation,
    /// The graph provider failed while executing the statement.
    Server,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Self::Inputs => "Illegal Inputs",
            Self::Relation => "No such Relation",
            Self::Server => "Server Error",
        };
        f.write_str(msg)
    }
}

/// Errors raised by the transport-free building blocks.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Illegal property key: {key}")]
    IllegalKey { key: String },

    #[error("Illegal value for property: {key}")]
    IllegalValue { key: String },

    #[error("Illegal identifier: {name}")]
    IllegalIdentifier { name: String },

    #[error("Expected a map of properties, got {found}")]
    NotAMap { found: &'static str },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// The property key that caused a sanitization failure, if any.
    pub fn offending_key(&self) -> Option<&str> {
        match self {
            Self::IllegalKey { key } | Self::IllegalValue { key } => Some(key),
            _ => None,
        }
    }
}

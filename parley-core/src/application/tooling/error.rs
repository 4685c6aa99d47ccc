use thiserror::Error;

/// A raised tool failure. Unlike an explicit `success: false` output these are
/// considered transient and are retried up to the tool's budget.
#[derive(Debug, Error)]
pub enum ToolFailure {
    #[error("{message}")]
    Execution { message: String },
    #[error("failed to spawn command '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("missing template argument '{key}' for command '{program}'")]
    MissingArgument { program: String, key: String },
}

impl ToolFailure {
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }
}

impl From<String> for ToolFailure {
    fn from(message: String) -> Self {
        Self::execution(message)
    }
}

impl From<&str> for ToolFailure {
    fn from(message: &str) -> Self {
        Self::execution(message)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool '{0}' is already registered")]
    Duplicate(String),
    #[error("tool name must not be empty")]
    EmptyName,
}

use crate::model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Backend(#[from] ModelError),
}

impl AgentError {
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Backend(err) => err.user_message(),
        }
    }
}

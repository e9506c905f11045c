use thiserror::Error;

use crate::core::types::AgentId;
use crate::roster::LifecycleState;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Agent not found: {0}")]
    AgentNotFound(AgentId),

    #[error("Illegal lifecycle transition for {agent}: {from:?} -> {to:?}")]
    IllegalTransition {
        agent: AgentId,
        from: LifecycleState,
        to: LifecycleState,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FleetError {
    #[error("config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("invalid topic segment '{0}': must be non-empty and contain no '/', '+' or '#'")]
    InvalidTopicSegment(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Rejections raised before a reconfiguration touches the working copy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid remote url '{0}': expected an absolute url with scheme and host")]
    InvalidRemote(String),

    #[error("invalid branch name '{branch}': {reason}")]
    InvalidBranch { branch: String, reason: &'static str },
}

pub type Result<T> = std::result::Result<T, FleetError>;

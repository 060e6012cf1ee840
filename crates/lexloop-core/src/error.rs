//! Error types for Lexloop

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("startup error: {0}")]
    Startup(String),

    #[error("pipeline error: {pipeline} - {message}")]
    Pipeline { pipeline: String, message: String },

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("control conflict: {message}")]
    ControlConflict { code: u16, message: String },

    #[error("run cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn startup(message: impl Into<String>) -> Self {
        Self::Startup(message.into())
    }

    pub fn pipeline(pipeline: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Pipeline {
            pipeline: pipeline.into(),
            message: message.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    pub fn conflict(code: u16, message: impl Into<String>) -> Self {
        Self::ControlConflict {
            code,
            message: message.into(),
        }
    }
}

//! Error types for the H5 transformer.

use std::path::PathBuf;
use thiserror::Error;

/// Stable codes attached to every transform failure.
pub mod codes {
    pub const PARSE: &str = "H5-ERR-PARSE";
    pub const SYNTHESIS: &str = "H5-ERR-SYNTH";
    pub const TYPE_STRIP: &str = "H5-ERR-TYPES";
    pub const IO: &str = "H5-ERR-IO";
    pub const CONFIG: &str = "H5-ERR-CONFIG";
}

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("failed to parse `{file}`: {}", .messages.join("; "))]
    Parse { file: String, messages: Vec<String> },

    /// A generated code template did not parse. Indicates a bug in the
    /// transformer rather than in user input.
    #[error("generated code did not parse: {}\n{template}", .messages.join("; "))]
    Synthesis {
        template: String,
        messages: Vec<String>,
    },

    #[error("failed to lower typed source `{file}`: {}", .messages.join("; "))]
    TypeStrip { file: String, messages: Vec<String> },

    #[error("IO error on `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl TransformError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Parse { .. } => codes::PARSE,
            Self::Synthesis { .. } => codes::SYNTHESIS,
            Self::TypeStrip { .. } => codes::TYPE_STRIP,
            Self::Io(..) => codes::IO,
            Self::Config(_) => codes::CONFIG,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransformError>;

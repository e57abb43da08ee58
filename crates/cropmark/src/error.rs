//! Error types for cropmark.
//!
//! System errors bubble up unchanged (`CropmarkError::Io` from
//! `std::io::Error`); application errors carry a message plus an optional
//! source. Only two kinds are fatal for a run: `Input` (unreadable,
//! encrypted, or empty PDF) and `IndexWrite` (the index could not be
//! committed). Everything else is recorded in the run log and the run
//! continues.

use thiserror::Error;

/// Result type alias using `CropmarkError`.
pub type Result<T> = std::result::Result<T, CropmarkError>;

/// Main error type for all cropmark operations.
#[derive(Debug, Error)]
pub enum CropmarkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unreadable, encrypted, zero-page, or truncated input. Fatal.
    #[error("Input error: {message}")]
    Input {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The atomic index commit failed. Fatal for pruning; the previous
    /// index, if any, is left intact.
    #[error("Index write error: {message}")]
    IndexWrite {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A pixmap request failed for a given clip. Local to one attachment.
    #[error("Render error: {message}")]
    Render {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Config error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl CropmarkError {
    pub fn input<S: Into<String>>(message: S) -> Self {
        Self::Input {
            message: message.into(),
            source: None,
        }
    }

    pub fn input_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Input {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn index_write<S: Into<String>>(message: S) -> Self {
        Self::IndexWrite {
            message: message.into(),
            source: None,
        }
    }

    pub fn index_write_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::IndexWrite {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn render<S: Into<String>>(message: S) -> Self {
        Self::Render {
            message: message.into(),
            source: None,
        }
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Short machine-readable kind name, used by the CLI for exit reporting.
    pub fn kind_name(&self) -> &'static str {
        match self {
            CropmarkError::Io(_) => "IoError",
            CropmarkError::Input { .. } => "InputError",
            CropmarkError::IndexWrite { .. } => "IndexWriteError",
            CropmarkError::Render { .. } => "RenderError",
            CropmarkError::Config { .. } => "ConfigError",
            CropmarkError::Serialization { .. } => "SerializationError",
        }
    }
}

impl From<serde_json::Error> for CropmarkError {
    fn from(err: serde_json::Error) -> Self {
        CropmarkError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<crate::pdf::error::PdfError> for CropmarkError {
    fn from(err: crate::pdf::error::PdfError) -> Self {
        use crate::pdf::error::PdfError;
        match err {
            PdfError::RenderingFailed(_) => CropmarkError::Render {
                message: err.to_string(),
                source: Some(Box::new(err)),
            },
            _ => CropmarkError::Input {
                message: err.to_string(),
                source: Some(Box::new(err)),
            },
        }
    }
}

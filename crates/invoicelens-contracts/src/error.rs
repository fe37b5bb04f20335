use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Startup failures. Any of these stops the process before input is read.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("API key not found. Please check your .env file.")]
    MissingApiKey,
    #[error("MongoDB URI not found. Please check your .env file.")]
    MissingMongoUri,
    #[error("Configuration Error: {0}")]
    Database(String),
    #[error("Configuration Error: {0}")]
    ModelClient(String),
}

/// Refusals raised by the upload control itself.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{file_name}: file type not allowed (accepted: jpg, jpeg, png)")]
    UnsupportedType { file_name: String },
    #[error("failed reading {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please upload an image.")]
    ImageRequired,
}

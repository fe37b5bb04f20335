use std::error::Error as StdError;

use invoicelens_contracts::error::ValidationError;
use thiserror::Error;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("No file uploaded")]
    NoFileUploaded,
    #[error("{file_name}: uploaded bytes are not a jpeg or png image")]
    UnsupportedContent { file_name: String },
    #[error("{file_name}: image decode failed")]
    Image {
        file_name: String,
        #[source]
        source: image::ImageError,
    },
}

/// Failures from either external collaborator. Never retried.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{model} call failed")]
    Model {
        model: String,
        #[source]
        source: BoxError,
    },
    #[error("{store} insert failed")]
    Store {
        store: String,
        #[source]
        source: BoxError,
    },
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

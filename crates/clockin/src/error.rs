//! Error types for clockin.
//!
//! This module defines all error types used throughout the clockin crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for clockin operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Store Errors ===
    /// Failed to create the image directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to enumerate the image directory.
    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        /// Directory that couldn't be read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Writing an image or its capture record failed.
    #[error("failed to write {path}: {source}")]
    StorageWriteFailed {
        /// File that couldn't be written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Removing a stored file failed.
    #[error("failed to delete {path}: {source}")]
    StorageDeleteFailed {
        /// File that couldn't be removed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A positional index fell outside the current listing.
    #[error("invalid index {index}: gallery holds {count} images")]
    InvalidIndex {
        /// The requested index.
        index: usize,
        /// Number of images in the listing at the time of the call.
        count: usize,
    },

    /// No stored image carries the given identifier.
    #[error("image not found: {id}")]
    ImageNotFound {
        /// The identifier that was looked up.
        id: String,
    },

    // === Image Errors ===
    /// Encoding a bitmap failed.
    #[error("failed to encode image: {0}")]
    ImageEncode(#[from] image::ImageError),

    /// Decoding an image file failed.
    #[error("failed to decode image {path}: {source}")]
    ImageDecode {
        /// File that couldn't be decoded.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: image::ImageError,
    },

    // === Collaborator Errors ===
    /// The camera could not produce a photo.
    #[error("capture failed: {message}")]
    Capture {
        /// Description of what went wrong.
        message: String,
    },

    /// The photo library rejected an export.
    #[error("export failed: {message}")]
    Export {
        /// Description of what went wrong.
        message: String,
    },

    /// The gallery passcode did not match.
    #[error("incorrect passcode")]
    PasscodeRejected,

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for clockin operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a capture error.
    #[must_use]
    pub fn capture(message: impl Into<String>) -> Self {
        Self::Capture {
            message: message.into(),
        }
    }

    /// Create an export error.
    #[must_use]
    pub fn export(message: impl Into<String>) -> Self {
        Self::Export {
            message: message.into(),
        }
    }
}

//! Error types for Vantage
//!
//! Errors are structured with fields to aid debugging. Rendering itself is
//! total; errors only surface from snapshot validation, image resolution,
//! certificate material and configuration loading.

use thiserror::Error;

/// Main error type for Vantage operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The configuration snapshot violates its contract
    #[error("validation error for {component}: {message}")]
    Validation {
        /// Component whose snapshot is invalid
        component: String,
        /// Description of what's invalid
        message: String,
        /// The invalid field (e.g., "bindingNamespaces")
        field: Option<String>,
    },

    /// An image reference could not be resolved
    #[error("image resolution error for {image}: {message}")]
    ImageResolution {
        /// Image name the reference was resolved for
        image: String,
        /// Description of what failed
        message: String,
    },

    /// Certificate material is missing or malformed
    #[error("certificate error for {secret}: {message}")]
    Certificate {
        /// Secret the key pair or bundle belongs to
        secret: String,
        /// Description of what failed
        message: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },

    /// Configuration file error
    #[error("config error [{path}]: {message}")]
    Config {
        /// Path of the configuration source
        path: String,
        /// Description of what failed
        message: String,
    },
}

impl Error {
    /// Create a validation error with component context and field name
    pub fn validation_for_field(
        component: impl Into<String>,
        field: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Validation {
            component: component.into(),
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create an image resolution error
    pub fn image_resolution(image: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ImageResolution {
            image: image.into(),
            message: msg.into(),
        }
    }

    /// Create a certificate error
    pub fn certificate(secret: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Certificate {
            secret: secret.into(),
            message: msg.into(),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a serialization error for a specific resource kind
    pub fn serialization_for(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Create a configuration error
    pub fn config(path: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Whether retrying with a corrected input can succeed.
    ///
    /// Image resolution failures are caller-correctable (fix the override
    /// and re-invoke); everything else needs a changed snapshot.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ImageResolution { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::serialization(e.to_string())
    }
}

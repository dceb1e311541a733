//! Lyra Core Library
//!
//! This crate provides the domain models, error types and configuration
//! shared by the Lyra client crates (auth, API client, upload flow, CLI).

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::ClientConfig;
pub use error::{ErrorMetadata, LogLevel, UploadError};
pub use models::{
    content_type_for_extension, parse_tags, Department, DocumentUploadRequest, SelectedFile,
    UploadDescriptor, UploadIntentBody, UploadProgress, Visibility,
};

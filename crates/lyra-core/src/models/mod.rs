//! Data models for the upload client
//!
//! Each sub-module represents one part of the document upload flow.

mod document;
pub mod presigned_upload;
pub mod progress;

// Re-export all models for convenient imports
pub use document::*;
pub use presigned_upload::*;
pub use progress::UploadProgress;

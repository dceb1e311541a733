//! Lyra Upload Library
//!
//! Drives one document upload from user intent to a terminal outcome:
//! validate the form, fetch a bearer credential, request a presigned upload
//! descriptor, then post the file straight to object storage.
//!
//! All user-facing state (form fields, progress, dialog visibility) is owned by
//! the `UploadController`; every failure is turned into a single notification.

pub mod controller;
pub mod form;
pub mod notify;

pub use controller::{FlowPhase, FlowStatus, UploadController};
pub use form::{FormField, UploadForm};
pub use notify::{Notification, NotificationVariant, Notifier, RecordingNotifier, TracingNotifier};

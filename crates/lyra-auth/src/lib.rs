//! Lyra Auth Library
//!
//! This crate abstracts the hosted identity provider behind the `SessionProvider`
//! capability so the upload flow never talks to the provider directly. It ships
//! a Cognito-compatible implementation and a static-token implementation.
//!
//! Sessions live in memory only; nothing is written to disk.

pub mod cognito;
pub mod error;
pub mod session;
pub mod static_token;

use async_trait::async_trait;

pub use cognito::CognitoSessionProvider;
pub use error::{AuthError, AuthResult};
pub use session::{Session, SignUpOutcome};
pub use static_token::StaticSessionProvider;

/// Identity capability used by the dashboard and the upload flow.
///
/// Implementations must be safe to share between tasks; the upload controller
/// holds one behind an `Arc`.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Bearer credential (identity token) for the current user.
    ///
    /// Returns `AuthError::NoSession` when nobody is signed in.
    async fn get_credential(&self) -> AuthResult<String>;

    /// Sign in with username (email) and password, establishing a session.
    async fn sign_in(&self, username: &str, password: &str) -> AuthResult<()>;

    /// Register a new account with email as username.
    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<SignUpOutcome>;

    /// Confirm a registration with the emailed verification code.
    async fn confirm_sign_up(&self, username: &str, code: &str) -> AuthResult<()>;

    /// Send the verification code again.
    async fn resend_sign_up_code(&self, username: &str) -> AuthResult<()>;

    /// End the current session.
    async fn sign_out(&self) -> AuthResult<()>;
}

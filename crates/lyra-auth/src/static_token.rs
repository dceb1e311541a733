use async_trait::async_trait;

use crate::{AuthError, AuthResult, SessionProvider, SignUpOutcome};

/// Session provider backed by a pre-issued identity token (e.g. `LYRA_ID_TOKEN`).
///
/// Account operations are not available; `sign_out` forgets the token.
pub struct StaticSessionProvider {
    token: tokio::sync::RwLock<Option<String>>,
}

impl StaticSessionProvider {
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        let token = (!token.trim().is_empty()).then_some(token);
        Self {
            token: tokio::sync::RwLock::new(token),
        }
    }
}

#[async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn get_credential(&self) -> AuthResult<String> {
        self.token.read().await.clone().ok_or(AuthError::NoSession)
    }

    async fn sign_in(&self, _username: &str, _password: &str) -> AuthResult<()> {
        Err(AuthError::unsupported("sign_in"))
    }

    async fn sign_up(&self, _email: &str, _password: &str) -> AuthResult<SignUpOutcome> {
        Err(AuthError::unsupported("sign_up"))
    }

    async fn confirm_sign_up(&self, _username: &str, _code: &str) -> AuthResult<()> {
        Err(AuthError::unsupported("confirm_sign_up"))
    }

    async fn resend_sign_up_code(&self, _username: &str) -> AuthResult<()> {
        Err(AuthError::unsupported("resend_sign_up_code"))
    }

    async fn sign_out(&self) -> AuthResult<()> {
        self.token.write().await.take();
        Ok(())
    }
}

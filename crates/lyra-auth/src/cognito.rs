//! Hosted identity provider client (Amazon Cognito user pools).
//!
//! Password sign-in uses the `USER_PASSWORD_AUTH` flow, which must be enabled
//! on the app client. The user pool calls used here need no AWS credentials,
//! so the SDK is configured without any.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_cognitoidentityprovider::types::{AttributeType, AuthFlowType, AuthenticationResultType};
use aws_sdk_cognitoidentityprovider::Client;
use chrono::Utc;
use lyra_core::ClientConfig;
use tokio::sync::RwLock;

use crate::{AuthError, AuthResult, Session, SessionProvider, SignUpOutcome};

pub struct CognitoSessionProvider {
    client: Client,
    client_id: String,
    session: RwLock<Option<Session>>,
}

impl CognitoSessionProvider {
    pub fn new(client: Client, client_id: impl Into<String>) -> Self {
        Self {
            client,
            client_id: client_id.into(),
            session: RwLock::new(None),
        }
    }

    /// Build the SDK client for the configured region, honouring `COGNITO_ENDPOINT`.
    pub async fn from_config(config: &ClientConfig) -> AuthResult<Self> {
        let client_id = config
            .cognito_client_id
            .clone()
            .ok_or_else(|| AuthError::Configuration("COGNITO_CLIENT_ID must be set".to_string()))?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.cognito_region.clone()))
            .no_credentials();
        if let Some(endpoint) = &config.cognito_endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        if let Some(timeout) = config.http_timeout() {
            loader = loader.timeout_config(
                aws_config::timeout::TimeoutConfig::builder()
                    .operation_timeout(timeout)
                    .build(),
            );
        }
        let sdk_config = loader.load().await;

        Ok(Self::new(Client::new(&sdk_config), client_id))
    }

    /// Replace the in-memory session (e.g. tokens obtained elsewhere).
    pub async fn set_session(&self, session: Option<Session>) {
        *self.session.write().await = session;
    }

    pub async fn is_signed_in(&self) -> bool {
        self.session.read().await.is_some()
    }

    async fn initiate_auth(
        &self,
        flow: AuthFlowType,
        parameters: &[(&str, &str)],
    ) -> AuthResult<AuthenticationResultType> {
        let mut request = self
            .client
            .initiate_auth()
            .auth_flow(flow)
            .client_id(&self.client_id);
        for (name, value) in parameters {
            request = request.auth_parameters(*name, *value);
        }

        let output = request
            .send()
            .await
            .map_err(|e| AuthError::from_sdk("InitiateAuth", e))?;

        if let Some(result) = output.authentication_result {
            return Ok(result);
        }
        match output.challenge_name {
            Some(challenge) => Err(AuthError::ChallengeRequired(challenge.as_str().to_string())),
            None => Err(AuthError::MalformedResponse(
                "InitiateAuth returned neither tokens nor a challenge".to_string(),
            )),
        }
    }

    async fn refresh(&self, refresh_token: &str) -> AuthResult<Session> {
        let result = self
            .initiate_auth(
                AuthFlowType::RefreshTokenAuth,
                &[("REFRESH_TOKEN", refresh_token)],
            )
            .await?;

        // Refresh responses do not rotate the refresh token.
        session_from(result, Some(refresh_token))
    }
}

fn session_from(
    result: AuthenticationResultType,
    previous_refresh_token: Option<&str>,
) -> AuthResult<Session> {
    let id_token = result
        .id_token
        .ok_or_else(|| AuthError::MalformedResponse("missing IdToken".to_string()))?;
    let access_token = result
        .access_token
        .ok_or_else(|| AuthError::MalformedResponse("missing AccessToken".to_string()))?;
    let refresh_token = result
        .refresh_token
        .or_else(|| previous_refresh_token.map(str::to_string));

    Ok(Session::new(
        id_token,
        access_token,
        refresh_token,
        i64::from(result.expires_in),
        Utc::now(),
    ))
}

#[async_trait]
impl SessionProvider for CognitoSessionProvider {
    async fn get_credential(&self) -> AuthResult<String> {
        let current = self.session.read().await.clone();
        let session = current.ok_or(AuthError::NoSession)?;

        if !session.is_expired(Utc::now()) {
            return Ok(session.id_token);
        }

        let refresh_token = session.refresh_token.ok_or(AuthError::NoSession)?;
        tracing::debug!("Identity token expired, refreshing session");
        let refreshed = self.refresh(&refresh_token).await?;
        let token = refreshed.id_token.clone();
        *self.session.write().await = Some(refreshed);
        Ok(token)
    }

    async fn sign_in(&self, username: &str, password: &str) -> AuthResult<()> {
        let result = self
            .initiate_auth(
                AuthFlowType::UserPasswordAuth,
                &[("USERNAME", username), ("PASSWORD", password)],
            )
            .await?;

        let session = session_from(result, None)?;
        *self.session.write().await = Some(session);
        tracing::info!(username = %username, "Signed in");
        Ok(())
    }

    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<SignUpOutcome> {
        let email_attribute = AttributeType::builder()
            .name("email")
            .value(email)
            .build()
            .map_err(|e| AuthError::InvalidRequest(e.to_string()))?;

        let output = self
            .client
            .sign_up()
            .client_id(&self.client_id)
            .username(email)
            .password(password)
            .user_attributes(email_attribute)
            .send()
            .await
            .map_err(|e| AuthError::from_sdk("SignUp", e))?;
        tracing::info!(email = %email, confirmed = output.user_confirmed, "Signed up");

        if output.user_confirmed {
            Ok(SignUpOutcome::Complete)
        } else {
            Ok(SignUpOutcome::ConfirmationRequired {
                destination: output.code_delivery_details.and_then(|d| d.destination),
            })
        }
    }

    async fn confirm_sign_up(&self, username: &str, code: &str) -> AuthResult<()> {
        self.client
            .confirm_sign_up()
            .client_id(&self.client_id)
            .username(username)
            .confirmation_code(code.trim())
            .send()
            .await
            .map_err(|e| AuthError::from_sdk("ConfirmSignUp", e))?;
        tracing::info!(username = %username, "Account confirmed");
        Ok(())
    }

    async fn resend_sign_up_code(&self, username: &str) -> AuthResult<()> {
        self.client
            .resend_confirmation_code()
            .client_id(&self.client_id)
            .username(username)
            .send()
            .await
            .map_err(|e| AuthError::from_sdk("ResendConfirmationCode", e))?;
        Ok(())
    }

    async fn sign_out(&self) -> AuthResult<()> {
        // The local session is dropped even if the global sign-out call fails.
        let session = self.session.write().await.take();
        let Some(session) = session else {
            return Ok(());
        };

        self.client
            .global_sign_out()
            .access_token(session.access_token)
            .send()
            .await
            .map_err(|e| AuthError::from_sdk("GlobalSignOut", e))?;
        tracing::info!("Signed out");
        Ok(())
    }
}

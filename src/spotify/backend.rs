use std::future::Future;

use reqwest::{Client, StatusCode};

use super::AuthError;
use crate::{
    config,
    types::{
        AuthorizationRequest, CallbackRequest, CallbackResponse, ErrorBody, LinkedTokenRecord,
        TokenFetch, TokenResponse,
    },
};

/// Error code the token endpoint returns with `409 Conflict` when the user's
/// umbrella identity is a Spotify identity that has not been linked yet.
pub const SPOTIFY_PRIMARY_AUTH_DETECTED: &str = "SPOTIFY_PRIMARY_AUTH_DETECTED";

/// The backend endpoints the auth flows depend on.
pub trait AuthApi: Send + Sync + 'static {
    /// `GET <auth-base>/auth/login`
    fn authorization_request(
        &self,
    ) -> impl Future<Output = Result<AuthorizationRequest, AuthError>> + Send;

    /// `POST <auth-base>/auth/callback`. Only the popup's callback page calls this.
    fn exchange_code(
        &self,
        code: &str,
        state: &str,
    ) -> impl Future<Output = Result<CallbackResponse, AuthError>> + Send;

    /// `GET <api-base>/tokens` authorized by the umbrella session bearer.
    fn spotify_token(&self, bearer: &str)
    -> impl Future<Output = Result<TokenFetch, AuthError>> + Send;

    /// `POST <api-base>/tokens` storing a freshly linked Spotify account.
    fn store_linked_token(
        &self,
        bearer: &str,
        record: &LinkedTokenRecord,
    ) -> impl Future<Output = Result<(), AuthError>> + Send;

    /// `POST <auth-base>/auth/logout`
    fn logout(&self, spotify_user_id: &str) -> impl Future<Output = Result<(), AuthError>> + Send;
}

/// [`AuthApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    auth_base: String,
    api_base: String,
}

impl HttpBackend {
    pub fn new(auth_base: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            auth_base: auth_base.into().trim_end_matches('/').to_string(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(config::auth_base_url(), config::api_base_url())
    }
}

impl AuthApi for HttpBackend {
    async fn authorization_request(&self) -> Result<AuthorizationRequest, AuthError> {
        let res = self
            .client
            .get(format!("{}/auth/login", self.auth_base))
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(AuthError::Network(format!(
                "auth login endpoint returned {}",
                res.status()
            )));
        }

        Ok(res.json().await?)
    }

    async fn exchange_code(&self, code: &str, state: &str) -> Result<CallbackResponse, AuthError> {
        let res = self
            .client
            .post(format!("{}/auth/callback", self.auth_base))
            .json(&CallbackRequest {
                code: code.to_string(),
                state: state.to_string(),
            })
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body: ErrorBody = res.json().await.unwrap_or_default();
            return Ok(CallbackResponse {
                success: false,
                error: Some(
                    body.error
                        .unwrap_or_else(|| format!("auth callback endpoint returned {}", status)),
                ),
                ..Default::default()
            });
        }

        Ok(res.json().await?)
    }

    async fn spotify_token(&self, bearer: &str) -> Result<TokenFetch, AuthError> {
        let res = self
            .client
            .get(format!("{}/tokens", self.api_base))
            .bearer_auth(bearer)
            .send()
            .await?;

        match res.status() {
            status if status.is_success() => {
                let body: TokenResponse = res.json().await?;
                Ok(TokenFetch::Token {
                    access_token: body.access_token,
                    user_data: body.user_data,
                })
            }
            StatusCode::CONFLICT => {
                let body: ErrorBody = res.json().await.unwrap_or_default();
                if body.error.as_deref() == Some(SPOTIFY_PRIMARY_AUTH_DETECTED) {
                    Ok(TokenFetch::NeedsLinking)
                } else {
                    Ok(TokenFetch::Failed {
                        status: StatusCode::CONFLICT.as_u16(),
                    })
                }
            }
            status => Ok(TokenFetch::Failed {
                status: status.as_u16(),
            }),
        }
    }

    async fn store_linked_token(
        &self,
        bearer: &str,
        record: &LinkedTokenRecord,
    ) -> Result<(), AuthError> {
        self.client
            .post(format!("{}/tokens", self.api_base))
            .bearer_auth(bearer)
            .json(record)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn logout(&self, spotify_user_id: &str) -> Result<(), AuthError> {
        self.client
            .post(format!("{}/auth/logout", self.auth_base))
            .json(&serde_json::json!({ "userId": spotify_user_id }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::config::ProviderConfig;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider response missing {0}")]
    MalformedResponse(&'static str),

    #[error("Provider is not fully configured")]
    NotConfigured,
}

/// Boundary to the third-party identity provider. The handshake beyond
/// these two calls (consent screens, token formats) is the provider's
/// business; all this system trusts is the stable subject id.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Where to send the browser to start the handshake.
    fn authorize_url(&self, state: &str) -> String;

    /// Exchange the callback code for the provider's subject id.
    async fn fetch_subject(&self, code: &str) -> Result<String, ProviderError>;
}

pub type DynIdentityProvider = Arc<dyn IdentityProvider>;

/// Derive the stored identity hash from a provider subject id, so raw
/// provider ids never land in the database.
pub fn identity_hash(subject: &str) -> String {
    let digest = Sha256::digest(subject.as_bytes());
    hex::encode(digest)
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// HTTP implementation driven entirely by [`ProviderConfig`].
#[derive(Debug)]
pub struct HttpIdentityProvider {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    auth_url: String,
    token_url: String,
    userinfo_url: String,
    redirect_url: String,
}

impl HttpIdentityProvider {
    pub fn from_config(
        http: reqwest::Client,
        config: &ProviderConfig,
    ) -> Result<Self, ProviderError> {
        if !config.is_configured() {
            return Err(ProviderError::NotConfigured);
        }

        Ok(Self {
            http,
            client_id: config.client_id.clone().unwrap(),
            client_secret: config.client_secret.clone().unwrap(),
            auth_url: config.auth_url.clone().unwrap(),
            token_url: config.token_url.clone().unwrap(),
            userinfo_url: config.userinfo_url.clone().unwrap(),
            redirect_url: config.redirect_url.clone().unwrap(),
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&state={}",
            self.auth_url, self.client_id, self.redirect_url, state
        )
    }

    async fn fetch_subject(&self, code: &str) -> Result<String, ProviderError> {
        let token: TokenResponse = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
                ("redirect_uri", &self.redirect_url),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let userinfo: serde_json::Value = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // Providers differ on the field name; accept the common ones.
        let subject = userinfo
            .get("sub")
            .or_else(|| userinfo.get("id"))
            .ok_or(ProviderError::MalformedResponse("subject id"))?;

        match subject {
            serde_json::Value::String(s) => Ok(s.clone()),
            serde_json::Value::Number(n) => Ok(n.to_string()),
            _ => Err(ProviderError::MalformedResponse("subject id")),
        }
    }
}

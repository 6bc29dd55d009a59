use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::AppConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the external email/password identity provider. The provider is
/// authoritative for credentials; the local users table only mirrors the
/// account by email.
#[derive(Clone)]
pub struct IdentityClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteAccount {
    pub email: String,
    #[serde(rename = "localId")]
    pub local_id: String,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

impl IdentityClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: config.identity_url.trim_end_matches('/').to_string(),
            api_key: config.identity_api_key.clone(),
        })
    }

    /// Validate credentials against the provider. `Ok(None)` means the
    /// provider rejected the sign-in; transport failures propagate.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Option<RemoteAccount>> {
        self.post("accounts:signInWithPassword", email, password)
            .await
    }

    /// Create an email/password account with the provider. Rejections (for
    /// example an already-registered email) surface as errors carrying the
    /// provider's message.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<RemoteAccount> {
        match self.post("accounts:signUp", email, password).await? {
            Some(account) => Ok(account),
            None => Err(anyhow!("identity provider rejected the registration")),
        }
    }

    async fn post(
        &self,
        endpoint: &str,
        email: &str,
        password: &str,
    ) -> Result<Option<RemoteAccount>> {
        let url = format!("{}/{}?key={}", self.base_url, endpoint, self.api_key);
        let response = self
            .http
            .post(&url)
            .json(&json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await?;

        if response.status().is_success() {
            let account = response.json::<RemoteAccount>().await?;
            return Ok(Some(account));
        }

        let status = response.status();
        match response.json::<ProviderError>().await {
            Ok(body) => {
                debug!(message = %body.error.message, "identity provider rejected request");
                Ok(None)
            }
            Err(_) => Err(anyhow!("identity provider returned {}", status)),
        }
    }
}

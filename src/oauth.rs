/// Per-request OAuth 2.0 authorization flow
use crate::config::AppConfig;
use crate::error::{OAuthError, Result};
use crate::identity;
use crate::pkce::PkceParameters;
use crate::provider::{OAuth2Provider, ProviderOptions};
use crate::session::{unix_now, Session, SessionStorage};
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Authorization flow result
#[derive(Debug, Clone)]
pub struct AuthFlowResult {
    pub url: String,
    pub state: String,
}

/// Token issued by the provider's token endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_in: Option<u64>,
    pub expires_at: Option<u64>,
    pub scope: Option<String>,
}

impl Token {
    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => unix_now() >= expires_at,
            None => false,
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// OAuth 2.0 client
///
/// Generates fresh PKCE parameters for every authorization attempt and keeps
/// the verifier in `storage` under the state nonce until the callback arrives.
/// Each `start_auth_flow` first purges sessions older than the configured TTL,
/// so abandoned flows do not accumulate.
pub struct OAuthClient<S: SessionStorage> {
    provider_key: String,
    options: ProviderOptions,
    client_secret: Option<String>,
    session_ttl: Duration,
    storage: Arc<S>,
    http: Client,
}

impl<S: SessionStorage> OAuthClient<S> {
    /// Create a new OAuth client
    pub fn new(provider: OAuth2Provider, config: &AppConfig, storage: Arc<S>) -> Self {
        Self {
            provider_key: provider.provider_key,
            options: provider.options,
            client_secret: config.client_secret.clone(),
            session_ttl: config.session_ttl,
            storage,
            http: Client::new(),
        }
    }

    pub fn options(&self) -> &ProviderOptions {
        &self.options
    }

    /// Start the OAuth authorization flow
    ///
    /// Generates a verifier, challenge and state for this attempt only, saves
    /// the session, and returns the authorization URL to send the user to.
    pub fn start_auth_flow(&self) -> Result<AuthFlowResult> {
        self.purge_expired_sessions()?;

        let params = PkceParameters::generate()?;

        let session = Session::for_provider(
            params.state.clone(),
            params.pkce.code_verifier().to_string(),
            self.provider_key.clone(),
        );
        self.storage.save_session(&params.state, session)?;

        let url = self.options.authorization_request_url(&params)?;

        tracing::info!(provider = %self.provider_key, "started authorization flow");
        Ok(AuthFlowResult {
            url,
            state: params.state,
        })
    }

    /// Finish a flow from the provider's callback parameters
    ///
    /// A state is accepted once; an unknown, reused or foreign state is
    /// rejected before any request is made.
    pub fn complete_auth_flow(&self, state: &str, code: &str) -> Result<Token> {
        let session = self
            .storage
            .take_session(state)?
            .ok_or(OAuthError::InvalidState)?;

        if session.is_expired(self.session_ttl) {
            tracing::warn!(provider = %self.provider_key, "authorization session expired");
            return Err(OAuthError::SessionExpired);
        }

        if let Some(key) = &session.provider_key {
            if key != &self.provider_key {
                return Err(OAuthError::InvalidState);
            }
        }

        let token = self.exchange_code(code, &session.code_verifier)?;
        tracing::info!(provider = %self.provider_key, "completed authorization flow");
        Ok(token)
    }

    /// Exchange an authorization code at the token endpoint
    pub fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<Token> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.options.redirect_uri()),
            ("code_verifier", code_verifier),
        ];

        let client_id = self.options.client_id.as_deref().unwrap_or_default();
        let mut request = self.http.post(&self.options.token_url);
        if self.options.token_url_config.use_basic_auth_scheme {
            request = request.basic_auth(client_id, self.client_secret.as_deref());
        } else {
            form.push(("client_id", client_id));
        }

        let response = request
            .header("Accept", "application/json")
            .form(&form)
            .send()?;
        let body: TokenResponse = parse_json(response)?;

        let expires_at = match body.expires_in {
            Some(secs) => Some(unix_now().checked_add(secs).ok_or_else(|| {
                OAuthError::InvalidResponse(format!("expires_in out of range: {secs}"))
            })?),
            None => None,
        };
        Ok(Token {
            access_token: body.access_token,
            refresh_token: body.refresh_token,
            token_type: body.token_type,
            expires_in: body.expires_in,
            expires_at,
            scope: body.scope,
        })
    }

    /// Look up the account identifier through the provider's identity endpoint
    pub fn fetch_account_identifier(&self, token: &Token) -> Result<String> {
        let identity = &self.options.identity_config;
        let response = self
            .http
            .get(&identity.url)
            .bearer_auth(&token.access_token)
            .header("Accept", "application/json")
            .send()?;
        let body: serde_json::Value = parse_json(response)?;
        identity::resolve(&body, &identity.account_identifier)
    }

    /// Remove sessions whose flow window has closed
    pub fn purge_expired_sessions(&self) -> Result<usize> {
        let removed = self.storage.purge_expired(self.session_ttl)?;
        if removed > 0 {
            tracing::debug!(removed, "purged expired authorization sessions");
        }
        Ok(removed)
    }
}

fn parse_json<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T> {
    let status = response.status();
    let text = response.text()?;

    if !status.is_success() {
        if let Ok(err) = serde_json::from_str::<ErrorResponse>(&text) {
            return Err(OAuthError::OAuthErrorResponse {
                error: err.error,
                description: err.error_description,
            });
        }
        return Err(OAuthError::InvalidResponse(format!(
            "HTTP {}: {}",
            status, text
        )));
    }

    Ok(serde_json::from_str(&text)?)
}

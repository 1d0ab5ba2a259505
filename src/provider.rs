/// External OAuth2 provider registration
use crate::error::Result;
use crate::pkce::{Pkce, PkceParameters};
use serde::{Deserialize, Serialize};
use url::Url;

/// Where the hosting platform receives authorization redirects
pub const PLATFORM_REDIRECT_URI: &str = "https://oauth2.slack.com/external/auth/callback";

pub const AIRTABLE_AUTHORIZATION_URL: &str = "https://airtable.com/oauth2/v1/authorize";
pub const AIRTABLE_TOKEN_URL: &str = "https://airtable.com/oauth2/v1/token";
pub const AIRTABLE_IDENTITY_URL: &str = "https://api.airtable.com/v0/meta/whoami";

pub const AIRTABLE_SCOPES: [&str; 8] = [
    "data.records:read",
    "data.records:write",
    "data.recordComments:read",
    "data.recordComments:write",
    "schema.bases:read",
    "schema.bases:write",
    "user.email:read",
    "webhook:manage",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderType {
    Custom,
}

/// A provider entry in the manifest's external auth providers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2Provider {
    pub provider_key: String,
    pub provider_type: ProviderType,
    pub options: ProviderOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderOptions {
    pub provider_name: String,
    pub authorization_url: String,
    pub token_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    pub scope: Vec<String>,
    pub authorization_url_extras: AuthorizationUrlExtras,
    pub use_pkce: bool,
    pub token_url_config: TokenUrlConfig,
    pub identity_config: IdentityConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationUrlExtras {
    pub redirect_uri: String,
    pub response_type: String,
    pub state: String,
    pub code_challenge: String,
    pub code_challenge_method: String,
    pub code_verifier: String,
}

impl AuthorizationUrlExtras {
    pub fn new(redirect_uri: impl Into<String>, params: &PkceParameters) -> Self {
        Self {
            redirect_uri: redirect_uri.into(),
            response_type: "code".to_string(),
            state: params.state.clone(),
            code_challenge: params.pkce.code_challenge().to_string(),
            code_challenge_method: Pkce::code_challenge_method().to_string(),
            code_verifier: params.pkce.code_verifier().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUrlConfig {
    pub use_basic_auth_scheme: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub url: String,
    /// JSON path selecting the account identifier, e.g. `$.id`
    pub account_identifier: String,
}

impl OAuth2Provider {
    /// Airtable registration with the given client and PKCE parameters
    ///
    /// # Examples
    ///
    /// ```
    /// use farbe::pkce::PkceParameters;
    /// use farbe::provider::OAuth2Provider;
    ///
    /// let params = PkceParameters::generate().unwrap();
    /// let provider = OAuth2Provider::airtable(Some("client".to_string()), &params);
    /// assert_eq!(provider.provider_key, "airtable");
    /// assert!(provider.options.use_pkce);
    /// ```
    pub fn airtable(client_id: Option<String>, params: &PkceParameters) -> Self {
        Self {
            provider_key: "airtable".to_string(),
            provider_type: ProviderType::Custom,
            options: ProviderOptions {
                provider_name: "Airtable".to_string(),
                authorization_url: AIRTABLE_AUTHORIZATION_URL.to_string(),
                token_url: AIRTABLE_TOKEN_URL.to_string(),
                client_id,
                scope: AIRTABLE_SCOPES.iter().map(|s| s.to_string()).collect(),
                authorization_url_extras: AuthorizationUrlExtras::new(PLATFORM_REDIRECT_URI, params),
                use_pkce: true,
                token_url_config: TokenUrlConfig {
                    use_basic_auth_scheme: true,
                },
                identity_config: IdentityConfig {
                    url: AIRTABLE_IDENTITY_URL.to_string(),
                    account_identifier: "$.id".to_string(),
                },
            },
        }
    }
}

impl ProviderOptions {
    pub fn redirect_uri(&self) -> &str {
        &self.authorization_url_extras.redirect_uri
    }

    /// Build the authorization redirect for one flow
    ///
    /// The verifier stays out of the URL; only its challenge is sent.
    pub fn authorization_request_url(&self, params: &PkceParameters) -> Result<String> {
        let mut url = Url::parse(&self.authorization_url)?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(client_id) = &self.client_id {
                query.append_pair("client_id", client_id);
            }
            query
                .append_pair("redirect_uri", self.redirect_uri())
                .append_pair(
                    "response_type",
                    &self.authorization_url_extras.response_type,
                );
            if !self.scope.is_empty() {
                query.append_pair("scope", &self.scope.join(" "));
            }
            query
                .append_pair("state", &params.state)
                .append_pair("code_challenge", params.pkce.code_challenge())
                .append_pair("code_challenge_method", Pkce::code_challenge_method());
        }
        Ok(url.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params() -> PkceParameters {
        PkceParameters {
            pkce: Pkce::from_verifier("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            state: "fixed-state".to_string(),
        }
    }

    #[test]
    fn test_airtable_serializes_platform_shape() {
        let provider = OAuth2Provider::airtable(Some("client-123".to_string()), &params());
        let value = serde_json::to_value(&provider).unwrap();

        assert_eq!(value["provider_key"], "airtable");
        assert_eq!(value["provider_type"], "CUSTOM");

        let options = &value["options"];
        assert_eq!(options["provider_name"], "Airtable");
        assert_eq!(options["authorization_url"], AIRTABLE_AUTHORIZATION_URL);
        assert_eq!(options["token_url"], AIRTABLE_TOKEN_URL);
        assert_eq!(options["client_id"], "client-123");
        assert_eq!(options["scope"], json!(AIRTABLE_SCOPES));
        assert_eq!(options["use_pkce"], true);
        assert_eq!(options["token_url_config"]["use_basic_auth_scheme"], true);
        assert_eq!(
            options["identity_config"],
            json!({ "url": AIRTABLE_IDENTITY_URL, "account_identifier": "$.id" })
        );
        assert_eq!(
            options["authorization_url_extras"],
            json!({
                "redirect_uri": PLATFORM_REDIRECT_URI,
                "response_type": "code",
                "state": "fixed-state",
                "code_challenge": "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM",
                "code_challenge_method": "S256",
                "code_verifier": "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk",
            })
        );
    }

    #[test]
    fn test_absent_client_id_is_omitted() {
        let provider = OAuth2Provider::airtable(None, &params());
        let value = serde_json::to_value(&provider).unwrap();
        assert!(value["options"].get("client_id").is_none());

        let back: OAuth2Provider = serde_json::from_value(value).unwrap();
        assert_eq!(back, provider);
    }

    #[test]
    fn test_scope_order_is_preserved() {
        let provider = OAuth2Provider::airtable(None, &params());
        assert_eq!(provider.options.scope.first().unwrap(), "data.records:read");
        assert_eq!(provider.options.scope.last().unwrap(), "webhook:manage");
        assert_eq!(provider.options.scope.len(), 8);
    }

    #[test]
    fn test_authorization_request_url() {
        let provider = OAuth2Provider::airtable(Some("client 1".to_string()), &params());
        let url = provider
            .options
            .authorization_request_url(&params())
            .unwrap();
        let parsed = Url::parse(&url).unwrap();

        assert_eq!(parsed.host_str(), Some("airtable.com"));
        assert_eq!(parsed.path(), "/oauth2/v1/authorize");

        let pairs: std::collections::HashMap<_, _> = parsed.query_pairs().into_owned().collect();
        assert_eq!(pairs["client_id"], "client 1");
        assert_eq!(pairs["redirect_uri"], PLATFORM_REDIRECT_URI);
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["state"], "fixed-state");
        assert_eq!(
            pairs["code_challenge"],
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
        assert_eq!(pairs["code_challenge_method"], "S256");
        assert!(pairs["scope"].starts_with("data.records:read data.records:write"));
        assert!(!pairs.contains_key("code_verifier"));
    }

    #[test]
    fn test_authorization_request_url_rejects_bad_endpoint() {
        let mut provider = OAuth2Provider::airtable(None, &params());
        provider.options.authorization_url = "not a url".to_string();
        assert!(provider
            .options
            .authorization_request_url(&params())
            .is_err());
    }
}

/// App manifest handed to the hosting platform
use crate::config::AppConfig;
use crate::error::Result;
use crate::pkce::PkceParameters;
use crate::provider::OAuth2Provider;
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "Meaning of Color App";
pub const APP_DESCRIPTION: &str = "The meaning of colors";
pub const APP_ICON: &str = "assets/default_new_app_icon.png";
pub const OUTGOING_DOMAINS: [&str; 1] = ["airtable.com"];
pub const BOT_SCOPES: [&str; 3] = ["commands", "chat:write", "chat:write.public"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub name: String,
    pub description: String,
    pub icon: String,
    pub functions: Vec<FunctionDefinition>,
    pub workflows: Vec<WorkflowDefinition>,
    pub outgoing_domains: Vec<String>,
    pub external_auth_providers: Vec<OAuth2Provider>,
    pub bot_scopes: Vec<String>,
}

/// Declaration of a function the platform runs; this crate never executes it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub callback_id: String,
    pub title: String,
    pub description: String,
    pub source_file: String,
    pub input_parameters: Vec<ParameterDefinition>,
    pub output_parameters: Vec<ParameterDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub callback_id: String,
    pub title: String,
}

impl FunctionDefinition {
    /// Declaration of the color-interpretation function
    ///
    /// Only the callback id and source path come from the app; the title,
    /// descriptions and parameter list are placeholders. Parameters are a
    /// flat list here, not the platform's `{ properties, required }` object,
    /// since this crate never registers or runs the function itself.
    pub fn interpret_color() -> Self {
        Self {
            callback_id: "interpret_color".to_string(),
            title: "Interpret color".to_string(),
            description: "Tells you what a color means".to_string(),
            source_file: "functions/interpret_color.ts".to_string(),
            input_parameters: vec![ParameterDefinition {
                name: "color".to_string(),
                kind: "string".to_string(),
                description: "Color to interpret".to_string(),
                required: true,
            }],
            output_parameters: vec![ParameterDefinition {
                name: "meaning".to_string(),
                kind: "string".to_string(),
                description: "What the color means".to_string(),
                required: true,
            }],
        }
    }
}

impl Manifest {
    /// Assemble the manifest once, the way the platform evaluates it at deploy time
    ///
    /// The PKCE values are generated here and baked into the provider
    /// registration. Use [`crate::oauth::OAuthClient`] for per-flow values.
    pub fn load(config: &AppConfig) -> Result<Self> {
        let params = PkceParameters::generate()?;
        let manifest = Self::with_parameters(config, &params);
        tracing::info!(
            name = %manifest.name,
            providers = manifest.external_auth_providers.len(),
            "loaded manifest with static PKCE parameters"
        );
        Ok(manifest)
    }

    /// Assemble the manifest around caller-supplied PKCE parameters
    pub fn with_parameters(config: &AppConfig, params: &PkceParameters) -> Self {
        Self {
            name: APP_NAME.to_string(),
            description: APP_DESCRIPTION.to_string(),
            icon: APP_ICON.to_string(),
            functions: vec![FunctionDefinition::interpret_color()],
            workflows: Vec::new(),
            outgoing_domains: OUTGOING_DOMAINS.iter().map(|s| s.to_string()).collect(),
            external_auth_providers: vec![OAuth2Provider::airtable(
                config.client_id.clone(),
                params,
            )],
            bot_scopes: BOT_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Look up a registered provider by key
    pub fn provider(&self, provider_key: &str) -> Option<&OAuth2Provider> {
        self.external_auth_providers
            .iter()
            .find(|p| p.provider_key == provider_key)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkce::{derive_code_challenge, Pkce};
    use serde_json::{json, Value};

    fn config() -> AppConfig {
        AppConfig {
            client_id: Some("client-123".to_string()),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_load_builds_full_manifest() {
        let manifest = Manifest::load(&config()).unwrap();

        assert_eq!(manifest.name, "Meaning of Color App");
        assert_eq!(manifest.description, "The meaning of colors");
        assert_eq!(manifest.functions.len(), 1);
        assert_eq!(manifest.functions[0].callback_id, "interpret_color");
        assert!(manifest.workflows.is_empty());
        assert_eq!(manifest.outgoing_domains, vec!["airtable.com"]);
        assert_eq!(
            manifest.bot_scopes,
            vec!["commands", "chat:write", "chat:write.public"]
        );

        let provider = manifest.provider("airtable").unwrap();
        let extras = &provider.options.authorization_url_extras;
        assert_eq!(extras.code_verifier.len(), 128);
        assert_eq!(extras.state.len(), 134);
        assert_eq!(
            extras.code_challenge,
            derive_code_challenge(&extras.code_verifier)
        );
        assert!(manifest.provider("github").is_none());
    }

    #[test]
    fn test_each_load_bakes_new_values() {
        let first = Manifest::load(&config()).unwrap();
        let second = Manifest::load(&config()).unwrap();

        let a = &first.external_auth_providers[0].options.authorization_url_extras;
        let b = &second.external_auth_providers[0].options.authorization_url_extras;
        assert_ne!(a.code_verifier, b.code_verifier);
        assert_ne!(a.state, b.state);
    }

    #[test]
    fn test_interpret_color_declaration() {
        let function = FunctionDefinition::interpret_color();
        assert_eq!(function.callback_id, "interpret_color");
        assert_eq!(function.source_file, "functions/interpret_color.ts");
        assert!(function.input_parameters.iter().all(|p| p.required));
    }

    #[test]
    fn test_json_document_shape() {
        let params = PkceParameters {
            pkce: Pkce::from_verifier("test"),
            state: "state-1".to_string(),
        };
        let manifest = Manifest::with_parameters(&AppConfig::default(), &params);
        let value: Value = serde_json::from_str(&manifest.to_json_pretty().unwrap()).unwrap();

        assert_eq!(value["outgoingDomains"], json!(["airtable.com"]));
        assert_eq!(
            value["botScopes"],
            json!(["commands", "chat:write", "chat:write.public"])
        );
        assert_eq!(value["workflows"], json!([]));
        assert_eq!(value["functions"][0]["input_parameters"][0]["type"], "string");

        let options = &value["externalAuthProviders"][0]["options"];
        assert!(options.get("client_id").is_none());
        assert_eq!(
            options["authorization_url_extras"]["code_challenge"],
            "n4bQgYhMfWWaL-qgxVrQFaO_TxsrC4Is0V1sFbDwCgg"
        );
        assert_eq!(options["authorization_url_extras"]["state"], "state-1");

        let back: Manifest = serde_json::from_value(value).unwrap();
        assert_eq!(back, manifest);
    }
}

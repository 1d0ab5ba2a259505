//! Farbe - manifest and Airtable OAuth2 registration for the Meaning of Color app
//!
//! The crate assembles the app manifest the hosting platform consumes and
//! derives the PKCE parameters its external auth provider needs.
//!
//! # Features
//!
//! - PKCE parameter generation (RFC 7636, S256) from the OS secure random source
//! - Provider registration record with the Airtable preset
//! - Load-time manifest assembly from `CLIENT_ID`
//! - Per-flow authorization with sessions keyed by state nonce
//!
//! # Example
//!
//! ```
//! use farbe::prelude::*;
//! use std::sync::Arc;
//!
//! let config = AppConfig::from_lookup(|key| match key {
//!     "CLIENT_ID" => Some("your-client-id".to_string()),
//!     _ => None,
//! });
//!
//! let manifest = Manifest::load(&config).unwrap();
//! let provider = manifest.provider("airtable").unwrap().clone();
//!
//! let client = OAuthClient::new(provider, &config, Arc::new(MemoryStorage::new()));
//! let flow = client.start_auth_flow().unwrap();
//! println!("Authorization URL: {}", flow.url);
//! ```

pub mod config;
pub mod error;
pub mod identity;
pub mod manifest;
pub mod oauth;
pub mod pkce;
pub mod provider;
pub mod session;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::AppConfig;
    pub use crate::error::{OAuthError, Result};
    pub use crate::manifest::Manifest;
    pub use crate::oauth::{AuthFlowResult, OAuthClient, Token};
    pub use crate::pkce::{
        derive_code_challenge, generate_code_verifier, generate_state_nonce, Pkce, PkceParameters,
    };
    pub use crate::provider::OAuth2Provider;
    pub use crate::session::{FileStorage, MemoryStorage, Session, SessionStorage};
}

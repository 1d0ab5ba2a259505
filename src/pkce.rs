/// PKCE (Proof Key for Code Exchange) parameter generation
/// RFC 7636: https://tools.ietf.org/html/rfc7636
use crate::error::{OAuthError, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::{rngs::OsRng, CryptoRng, RngCore};
use sha2::{Digest, Sha256};

/// Random bytes behind a code verifier (encodes to 128 characters).
pub const CODE_VERIFIER_BYTES: usize = 96;

/// Random bytes behind a state nonce (encodes to 134 characters).
pub const STATE_NONCE_BYTES: usize = 100;

/// Generate a code verifier from the operating system's secure random source.
pub fn generate_code_verifier() -> Result<String> {
    generate_code_verifier_with_rng(&mut OsRng)
}

/// Generate a code verifier from a caller-supplied cryptographic RNG.
pub fn generate_code_verifier_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> Result<String> {
    random_urlsafe::<_, CODE_VERIFIER_BYTES>(rng)
}

/// Derive the S256 code challenge for a verifier.
///
/// The digest is taken over the verifier string as transmitted, not over
/// the random bytes it was encoded from.
///
/// # Examples
///
/// ```
/// use farbe::pkce::derive_code_challenge;
///
/// assert_eq!(
///     derive_code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
///     "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
/// );
/// ```
pub fn derive_code_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Check that `challenge` is the S256 challenge of `verifier`.
pub fn verify_code_challenge(verifier: &str, challenge: &str) -> bool {
    derive_code_challenge(verifier) == challenge
}

/// Generate an anti-CSRF state nonce from the operating system's secure random source.
pub fn generate_state_nonce() -> Result<String> {
    generate_state_nonce_with_rng(&mut OsRng)
}

/// Generate a state nonce from a caller-supplied cryptographic RNG.
pub fn generate_state_nonce_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> Result<String> {
    random_urlsafe::<_, STATE_NONCE_BYTES>(rng)
}

fn random_urlsafe<R: RngCore + CryptoRng, const N: usize>(rng: &mut R) -> Result<String> {
    let mut bytes = [0u8; N];
    rng.try_fill_bytes(&mut bytes)
        .map_err(|e| OAuthError::EntropySourceUnavailable(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// PKCE verifier and its derived challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pkce {
    code_verifier: String,
    code_challenge: String,
}

impl Pkce {
    /// Generate a new verifier and derive its challenge
    ///
    /// # Examples
    ///
    /// ```
    /// use farbe::pkce::Pkce;
    ///
    /// let pkce = Pkce::generate().unwrap();
    /// assert_eq!(pkce.code_verifier().len(), 128);
    /// assert_eq!(Pkce::code_challenge_method(), "S256");
    /// ```
    pub fn generate() -> Result<Self> {
        Self::generate_with_rng(&mut OsRng)
    }

    pub fn generate_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self> {
        let code_verifier = generate_code_verifier_with_rng(rng)?;
        Ok(Self::from_verifier(code_verifier))
    }

    /// Rebuild the pair from a previously issued verifier
    pub fn from_verifier(code_verifier: impl Into<String>) -> Self {
        let code_verifier = code_verifier.into();
        let code_challenge = derive_code_challenge(&code_verifier);
        Self {
            code_verifier,
            code_challenge,
        }
    }

    /// Get the code verifier
    pub fn code_verifier(&self) -> &str {
        &self.code_verifier
    }

    /// Get the code challenge
    pub fn code_challenge(&self) -> &str {
        &self.code_challenge
    }

    /// Get the code challenge method (always S256)
    pub fn code_challenge_method() -> &'static str {
        "S256"
    }
}

/// The three values an authorization request is built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceParameters {
    pub pkce: Pkce,
    pub state: String,
}

impl PkceParameters {
    pub fn generate() -> Result<Self> {
        Self::generate_with_rng(&mut OsRng)
    }

    pub fn generate_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self> {
        let pkce = Pkce::generate_with_rng(rng)?;
        let state = generate_state_nonce_with_rng(rng)?;
        tracing::debug!(state_len = state.len(), "generated PKCE parameters");
        Ok(Self { pkce, state })
    }
}

// Hogwarts Auth - JWT issuance and verification
//
// Tokens are EdDSA-signed JWTs. The signing key lives only in process memory,
// so every restart invalidates all outstanding tokens.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use ed25519_dalek::pkcs8::EncodePrivateKey;
use ed25519_dalek::SigningKey;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Issuer written into, and required on, every token.
pub const ISSUER: &str = "self";

/// Prefix applied to each role inside the `authorities` claim.
pub const ROLE_PREFIX: &str = "ROLE_";

/// Claim set carried by every token.
///
/// `authorities` is not a registered JWT claim. It holds the roles as a
/// space-delimited list, each entry prefixed with [`ROLE_PREFIX`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub authorities: String,
}

impl Claims {
    /// Returns the roles with the authority prefix stripped.
    pub fn roles(&self) -> Vec<String> {
        self.authorities
            .split_whitespace()
            .map(|authority| {
                authority
                    .strip_prefix(ROLE_PREFIX)
                    .unwrap_or(authority)
                    .to_string()
            })
            .collect()
    }
}

/// Identity recovered from a successfully verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub subject: String,
    pub roles: Vec<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl VerifiedToken {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Issues and verifies signed, time-bounded credentials.
///
/// Holds an Ed25519 key pair: the private half signs, the public half
/// verifies. The authority is read-only after construction and can be shared
/// across request handlers behind an `Arc`.
#[derive(Clone)]
pub struct TokenAuthority {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthority").finish_non_exhaustive()
    }
}

impl TokenAuthority {
    /// Creates an authority backed by a freshly generated key pair.
    ///
    /// Nothing persists the key, so a restart invalidates every token signed
    /// by the previous authority.
    pub fn generate() -> Result<Self, AuthError> {
        Self::from_signing_key(&SigningKey::generate(&mut OsRng))
    }

    /// Creates an authority from existing key material.
    pub fn from_signing_key(signing_key: &SigningKey) -> Result<Self, AuthError> {
        // jsonwebtoken wants PKCS8 DER for EdDSA signing keys.
        let der = signing_key
            .to_pkcs8_der()
            .map_err(|e| AuthError::Key(format!("encode Ed25519 key: {}", e)))?;
        let encoding_key = EncodingKey::from_ed_der(der.as_bytes());

        // ...and the JWK `x` component (base64url public key) for verification.
        let x = URL_SAFE_NO_PAD.encode(signing_key.verifying_key().to_bytes());
        let decoding_key = DecodingKey::from_ed_components(&x)
            .map_err(|e| AuthError::Key(format!("decode Ed25519 public key: {}", e)))?;

        Ok(Self {
            encoding_key,
            decoding_key,
        })
    }

    /// Signs a token for `subject` carrying `roles`, valid from `issued_at`
    /// for `ttl`.
    ///
    /// Roles must not contain whitespace; they are joined into a single
    /// space-delimited claim.
    pub fn issue(
        &self,
        subject: &str,
        roles: &[String],
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let expires_at = issued_at.checked_add_signed(ttl).ok_or_else(|| {
            AuthError::TtlOutOfRange(format!("{} plus {} seconds", issued_at, ttl.num_seconds()))
        })?;
        let claims = Claims {
            iss: ISSUER.to_string(),
            sub: subject.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            authorities: roles
                .iter()
                .map(|role| format!("{}{}", ROLE_PREFIX, role))
                .collect::<Vec<_>>()
                .join(" "),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::EdDSA), &claims, &self.encoding_key)
            .map_err(AuthError::Encode)
    }

    /// Verifies signature, algorithm, issuer and expiry.
    ///
    /// Every failure, including an expired token or one signed by a different
    /// key, is reported as [`AuthError::InvalidToken`].
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.set_issuer(&[ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.leeway = 0;

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)?;
        let claims = data.claims;

        Ok(VerifiedToken {
            roles: claims.roles(),
            issued_at: timestamp_to_datetime(claims.iat)?,
            expires_at: timestamp_to_datetime(claims.exp)?,
            subject: claims.sub,
        })
    }
}

fn timestamp_to_datetime(seconds: i64) -> Result<DateTime<Utc>, AuthError> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| AuthError::InvalidToken(format!("timestamp out of range: {}", seconds)))
}

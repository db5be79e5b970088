//! Building and serializing delegation tokens
//!
//! # Wire Format
//!
//! The token travels as unpadded URL-safe base64 of:
//!
//! ```text
//! [ version: 1 ][ issuer pubkey: 32 ][ signature: 64 ][ payload: DAG-CBOR claims ]
//! ```
//!
//! The signature covers `version || issuer || payload`, so every byte after
//! the version is bound to the issuer key.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use cid::Cid;

use super::claims::{Audience, Capability, Claims, Expiration};
use super::error::TokenError;
use super::facts::{Facts, FactsWire};
use crate::crypto::{Did, SecretKey, PUBLIC_KEY_SIZE, SIGNATURE_SIZE};

/// Current envelope version
pub const TOKEN_VERSION: u8 = 1;
/// Bytes before the payload: version, issuer, signature
pub const ENVELOPE_HEADER_SIZE: usize = 1 + PUBLIC_KEY_SIZE + SIGNATURE_SIZE;

/// A token in its text-safe transport form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncodedToken(String);

impl EncodedToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw envelope bytes behind the text encoding
    pub fn to_bytes(&self) -> Result<Vec<u8>, TokenError> {
        URL_SAFE_NO_PAD
            .decode(self.0.as_bytes())
            .map_err(|_| TokenError::malformed("not base64url"))
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        EncodedToken(URL_SAFE_NO_PAD.encode(bytes))
    }
}

impl FromStr for EncodedToken {
    type Err = TokenError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(TokenError::malformed("empty token"));
        }
        Ok(EncodedToken(trimmed.to_string()))
    }
}

impl fmt::Display for EncodedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The binary envelope, split but not yet trusted
#[derive(Debug, Clone)]
pub(crate) struct Envelope {
    pub version: u8,
    pub issuer: [u8; PUBLIC_KEY_SIZE],
    pub signature: [u8; SIGNATURE_SIZE],
    pub payload: Vec<u8>,
}

impl Envelope {
    pub(crate) fn signed_message(
        version: u8,
        issuer: &[u8; PUBLIC_KEY_SIZE],
        payload: &[u8],
    ) -> Vec<u8> {
        let mut message = Vec::with_capacity(1 + PUBLIC_KEY_SIZE + payload.len());
        message.push(version);
        message.extend_from_slice(issuer);
        message.extend_from_slice(payload);
        message
    }

    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ENVELOPE_HEADER_SIZE + self.payload.len());
        out.push(self.version);
        out.extend_from_slice(&self.issuer);
        out.extend_from_slice(&self.signature);
        out.extend_from_slice(&self.payload);
        out
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<Self, TokenError> {
        if bytes.len() <= ENVELOPE_HEADER_SIZE {
            return Err(TokenError::malformed("envelope too short"));
        }
        let version = bytes[0];
        if version != TOKEN_VERSION {
            return Err(TokenError::malformed("unsupported envelope version"));
        }
        let mut issuer = [0u8; PUBLIC_KEY_SIZE];
        issuer.copy_from_slice(&bytes[1..1 + PUBLIC_KEY_SIZE]);
        let mut signature = [0u8; SIGNATURE_SIZE];
        signature.copy_from_slice(&bytes[1 + PUBLIC_KEY_SIZE..ENVELOPE_HEADER_SIZE]);
        Ok(Self {
            version,
            issuer,
            signature,
            payload: bytes[ENVELOPE_HEADER_SIZE..].to_vec(),
        })
    }
}

/// Assembles and signs a token.
///
/// `restricted` is never set by hand: it follows from the audience.
///
/// # Examples
///
/// ```ignore
/// let token = TokenBuilder::new(facts)
///     .audience(Some("did:key:z6Mk...".parse()?))
///     .scope(&cid)
///     .sign(&issuer, now)?;
/// ```
#[derive(Debug, Clone)]
pub struct TokenBuilder {
    facts: Facts,
    audience: Audience,
    expiration: Option<Expiration>,
    scope: Option<Cid>,
}

impl TokenBuilder {
    pub fn new(facts: Facts) -> Self {
        Self {
            facts,
            audience: Audience::Anyone,
            expiration: None,
            scope: None,
        }
    }

    /// Restrict the token to one identity; `None` leaves it open to anyone.
    pub fn audience(mut self, audience: Option<Did>) -> Self {
        self.audience = audience.into();
        self
    }

    /// Explicit expiry; defaults to one year after signing.
    pub fn expiration(mut self, expiration: Expiration) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Bind the capability to the ciphertext locator.
    pub fn scope(mut self, locator: &Cid) -> Self {
        self.scope = Some(*locator);
        self
    }

    /// Sign with `issuer` at time `now` (unix seconds).
    pub fn sign(self, issuer: &SecretKey, now: i64) -> Result<EncodedToken, TokenError> {
        let restricted = self.audience.is_restricted();
        let expiration = self
            .expiration
            .unwrap_or_else(|| Expiration::default_from(now));
        let claims = Claims {
            aud: self.audience,
            cap: Capability::share(self.scope.as_ref()),
            exp: expiration.to_wire(),
            iat: now,
            fct: FactsWire::new(&self.facts, restricted),
        };
        let payload = serde_ipld_dagcbor::to_vec(&claims).map_err(|e| {
            tracing::warn!("failed to encode token claims: {}", e);
            TokenError::Encode
        })?;

        let issuer_bytes = issuer.public().to_bytes();
        let message = Envelope::signed_message(TOKEN_VERSION, &issuer_bytes, &payload);
        let signature = issuer.sign(&message).to_bytes();

        let envelope = Envelope {
            version: TOKEN_VERSION,
            issuer: issuer_bytes,
            signature,
            payload,
        };

        tracing::info!(
            issuer = %Did::from_public_key(&issuer.public()),
            audience = %claims.aud,
            expiration = %expiration,
            password_protected = self.facts.password_protected(),
            "issued share token"
        );

        Ok(EncodedToken::from_bytes(&envelope.to_bytes()))
    }
}

/// Sign `facts` into a token with the system clock.
///
/// `audience: None` addresses anyone; `expiration: None` means one year.
pub fn create_token(
    issuer: &SecretKey,
    facts: Facts,
    audience: Option<Did>,
    expiration: Option<Expiration>,
) -> Result<EncodedToken, TokenError> {
    let mut builder = TokenBuilder::new(facts).audience(audience);
    if let Some(expiration) = expiration {
        builder = builder.expiration(expiration);
    }
    builder.sign(issuer, chrono::Utc::now().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Iv, Secret};

    fn facts() -> Facts {
        Facts::open(Iv::generate().unwrap(), Secret::generate().unwrap())
    }

    #[test]
    fn test_envelope_layout() {
        let issuer = SecretKey::generate().unwrap();
        let token = TokenBuilder::new(facts()).sign(&issuer, 0).unwrap();
        let bytes = token.to_bytes().unwrap();

        assert_eq!(bytes[0], TOKEN_VERSION);
        assert_eq!(&bytes[1..33], &issuer.public().to_bytes());
        assert!(bytes.len() > ENVELOPE_HEADER_SIZE);

        let envelope = Envelope::from_bytes(&bytes).unwrap();
        assert_eq!(envelope.to_bytes(), bytes);
    }

    #[test]
    fn test_token_is_text_safe() {
        let issuer = SecretKey::generate().unwrap();
        let token = TokenBuilder::new(facts()).sign(&issuer, 0).unwrap();
        assert!(token
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_restricted_follows_audience() {
        let issuer = SecretKey::generate().unwrap();
        let audience: Did = "did:key:z123".parse().unwrap();
        let token = TokenBuilder::new(facts())
            .audience(Some(audience.clone()))
            .sign(&issuer, 0)
            .unwrap();

        let envelope = Envelope::from_bytes(&token.to_bytes().unwrap()).unwrap();
        let claims: Claims = serde_ipld_dagcbor::from_slice(&envelope.payload).unwrap();
        assert_eq!(claims.aud, Audience::Only(audience));
        assert!(claims.fct.restricted());
        assert_eq!(claims.exp, Some(365 * 24 * 60 * 60));
    }

    #[test]
    fn test_short_envelope_rejected() {
        assert!(Envelope::from_bytes(&[TOKEN_VERSION; ENVELOPE_HEADER_SIZE]).is_err());
    }

    #[test]
    fn test_empty_token_string_rejected() {
        assert!("   ".parse::<EncodedToken>().is_err());
    }
}

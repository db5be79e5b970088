//! The verification pipeline
//!
//! Each stage is its own type and can only be built by the stage before it:
//!
//! ```text
//! EncodedToken --decode--> UnverifiedToken --verify_signature--> SignedToken
//!   --check_expiration--> CurrentToken --check_audience--> AuthorizedToken
//! ```
//!
//! Nothing inside the payload is parsed until the signature over it holds,
//! and facts only come out of an [`AuthorizedToken`].

use cid::Cid;

use super::claims::{Audience, Capability, Claims, Expiration};
use super::codec::{EncodedToken, Envelope};
use super::error::TokenError;
use super::facts::{Facts, Grant};
use crate::crypto::{Did, PublicKey, Signature};

/// Structurally decoded, nothing verified yet
#[derive(Debug, Clone)]
pub struct UnverifiedToken {
    envelope: Envelope,
}

impl EncodedToken {
    /// Step 1: split the transport encoding into an envelope.
    pub fn decode(&self) -> Result<UnverifiedToken, TokenError> {
        let bytes = self.to_bytes()?;
        Ok(UnverifiedToken {
            envelope: Envelope::from_bytes(&bytes)?,
        })
    }
}

impl UnverifiedToken {
    /// Step 2: check the signature against the embedded issuer, then parse the claims.
    pub fn verify_signature(self) -> Result<SignedToken, TokenError> {
        let envelope = self.envelope;
        let issuer = PublicKey::try_from(envelope.issuer).map_err(|_| {
            tracing::warn!("token rejected: issuer key invalid");
            TokenError::Tampered
        })?;
        let signature = Signature::from_bytes(&envelope.signature);
        let message = Envelope::signed_message(envelope.version, &envelope.issuer, &envelope.payload);
        issuer.verify(&message, &signature).map_err(|_| {
            tracing::warn!("token rejected: signature invalid");
            TokenError::Tampered
        })?;

        let claims: Claims = serde_ipld_dagcbor::from_slice(&envelope.payload)
            .map_err(|_| TokenError::malformed("claims do not decode"))?;
        if !claims.cap.is_share_read() {
            return Err(TokenError::malformed("unexpected capability"));
        }
        if claims.fct.restricted() != claims.aud.is_restricted() {
            return Err(TokenError::malformed("restricted flag disagrees with audience"));
        }
        let facts = claims.fct.into_facts()?;

        Ok(SignedToken {
            issuer,
            audience: claims.aud,
            capability: claims.cap,
            expiration: Expiration::from_wire(claims.exp),
            issued_at: claims.iat,
            facts,
        })
    }
}

/// Signature checked; claims are authentic but not yet in force
#[derive(Debug, Clone)]
pub struct SignedToken {
    issuer: PublicKey,
    audience: Audience,
    capability: Capability,
    expiration: Expiration,
    issued_at: i64,
    facts: Facts,
}

/// A key-free description of a signed token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSummary {
    pub issuer: Did,
    pub audience: Audience,
    pub capability: Capability,
    pub expiration: Expiration,
    pub issued_at: i64,
    pub password_protected: bool,
}

impl SignedToken {
    pub fn issuer(&self) -> Did {
        Did::from_public_key(&self.issuer)
    }

    pub fn audience(&self) -> &Audience {
        &self.audience
    }

    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    pub fn expiration(&self) -> Expiration {
        self.expiration
    }

    pub fn summary(&self) -> TokenSummary {
        TokenSummary {
            issuer: self.issuer(),
            audience: self.audience.clone(),
            capability: self.capability.clone(),
            expiration: self.expiration,
            issued_at: self.issued_at,
            password_protected: self.facts.password_protected(),
        }
    }

    /// Whether the capability covers the ciphertext at `locator`
    pub fn permits(&self, locator: &Cid) -> bool {
        self.capability.permits(locator)
    }

    /// Step 3: reject tokens whose expiry lies before `now` (unix seconds).
    pub fn check_expiration(self, now: i64) -> Result<CurrentToken, TokenError> {
        if self.expiration.is_expired_at(now) {
            tracing::info!(expiration = %self.expiration, "token rejected: expired");
            return Err(TokenError::Expired);
        }
        Ok(CurrentToken(self))
    }
}

/// Signed and unexpired; the audience is still to be checked
#[derive(Debug, Clone)]
pub struct CurrentToken(SignedToken);

impl CurrentToken {
    pub fn restricted(&self) -> bool {
        self.0.audience.is_restricted()
    }

    pub fn password_protected(&self) -> bool {
        self.0.facts.password_protected()
    }

    pub fn audience(&self) -> &Audience {
        &self.0.audience
    }

    /// Step 4: a restricted token needs a viewer identity equal to its audience.
    ///
    /// Open tokens pass whatever `viewer` is.
    pub fn check_audience(self, viewer: Option<&Did>) -> Result<AuthorizedToken, TokenError> {
        if let Audience::Only(audience) = &self.0.audience {
            if viewer != Some(audience) {
                tracing::info!("token rejected: viewer is not the audience");
                return Err(TokenError::Unauthorized);
            }
        }
        Ok(AuthorizedToken(self.0))
    }
}

/// Fully verified; the facts may be used
#[derive(Debug, Clone)]
pub struct AuthorizedToken(SignedToken);

impl AuthorizedToken {
    pub fn summary(&self) -> TokenSummary {
        self.0.summary()
    }

    pub fn permits(&self, locator: &Cid) -> bool {
        self.0.permits(locator)
    }

    /// Step 5: hand out the facts.
    pub fn into_grant(self) -> Grant {
        match self.0.audience {
            Audience::Anyone => Grant::Open(self.0.facts),
            Audience::Only(audience) => Grant::Restricted {
                audience,
                facts: self.0.facts,
            },
        }
    }
}

/// Run the whole pipeline against the system clock.
pub fn extract_token(encoded: &EncodedToken, viewer: Option<&Did>) -> Result<Grant, TokenError> {
    extract_token_at(encoded, viewer, chrono::Utc::now().timestamp())
}

/// Run the whole pipeline at time `now` (unix seconds).
pub fn extract_token_at(
    encoded: &EncodedToken,
    viewer: Option<&Did>,
    now: i64,
) -> Result<Grant, TokenError> {
    Ok(encoded
        .decode()?
        .verify_signature()?
        .check_expiration(now)?
        .check_audience(viewer)?
        .into_grant())
}

/// Verify only the signature and describe the token, without releasing facts.
pub fn inspect_token(encoded: &EncodedToken) -> Result<TokenSummary, TokenError> {
    Ok(encoded.decode()?.verify_signature()?.summary())
}

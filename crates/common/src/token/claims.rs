use std::fmt;
use std::time::Duration;

use cid::Cid;
use serde::{Deserialize, Serialize};

use super::facts::FactsWire;
use crate::crypto::Did;

/// Ability granted by every share token
pub const SHARE_READ: &str = "share/read";
const SCOPE_PREFIX: &str = "share:";
const ANY_SCOPE: &str = "share:*";
const WILDCARD: &str = "*";

/// How long a token lives when the sharer does not say
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// Who may use a token
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Audience {
    /// Anyone holding the link (`"*"` on the wire)
    Anyone,
    /// Exactly one identity
    Only(Did),
}

impl Audience {
    pub fn is_restricted(&self) -> bool {
        matches!(self, Audience::Only(_))
    }

    pub fn did(&self) -> Option<&Did> {
        match self {
            Audience::Anyone => None,
            Audience::Only(did) => Some(did),
        }
    }
}

impl From<Option<Did>> for Audience {
    fn from(did: Option<Did>) -> Self {
        did.map_or(Audience::Anyone, Audience::Only)
    }
}

impl TryFrom<String> for Audience {
    type Error = crate::crypto::DidError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == WILDCARD {
            return Ok(Audience::Anyone);
        }
        Ok(Audience::Only(value.parse()?))
    }
}

impl From<Audience> for String {
    fn from(audience: Audience) -> Self {
        match audience {
            Audience::Anyone => WILDCARD.to_string(),
            Audience::Only(did) => did.into(),
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Audience::Anyone => f.write_str("anyone"),
            Audience::Only(did) => write!(f, "{}", did),
        }
    }
}

/// The single capability a share grants: read the shared content
///
/// `with` names the resource (`share:<cid>` once the ciphertext locator is
/// known, `share:*` otherwise), `can` is always [`SHARE_READ`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    pub with: String,
    pub can: String,
}

impl Capability {
    pub fn share(scope: Option<&Cid>) -> Self {
        let with = match scope {
            Some(cid) => format!("{}{}", SCOPE_PREFIX, cid),
            None => ANY_SCOPE.to_string(),
        };
        Self {
            with,
            can: SHARE_READ.to_string(),
        }
    }

    /// The locator this capability is scoped to, if any
    pub fn scope(&self) -> Option<Cid> {
        let scope = self.with.strip_prefix(SCOPE_PREFIX)?;
        Cid::try_from(scope).ok()
    }

    pub fn is_share_read(&self) -> bool {
        self.can == SHARE_READ && self.with.starts_with(SCOPE_PREFIX)
    }

    /// Whether the capability covers the ciphertext at `locator`
    pub fn permits(&self, locator: &Cid) -> bool {
        self.with == ANY_SCOPE || self.scope().as_ref() == Some(locator)
    }
}

/// Absolute expiry of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    Never,
    /// Unix seconds
    At(i64),
}

impl Expiration {
    /// Expiry `ttl` after `now` (unix seconds)
    pub fn after(now: i64, ttl: Duration) -> Self {
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        Expiration::At(now.saturating_add(ttl))
    }

    /// One year from `now`
    pub fn default_from(now: i64) -> Self {
        Self::after(now, DEFAULT_TTL)
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        match self {
            Expiration::Never => false,
            Expiration::At(exp) => now > *exp,
        }
    }

    pub(crate) fn to_wire(self) -> Option<i64> {
        match self {
            Expiration::Never => None,
            Expiration::At(exp) => Some(exp),
        }
    }

    pub(crate) fn from_wire(exp: Option<i64>) -> Self {
        exp.map_or(Expiration::Never, Expiration::At)
    }
}

impl fmt::Display for Expiration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expiration::Never => f.write_str("never"),
            Expiration::At(exp) => match chrono::DateTime::from_timestamp(*exp, 0) {
                Some(at) => write!(f, "{}", at.to_rfc3339()),
                None => write!(f, "{}", exp),
            },
        }
    }
}

/// The signed payload of a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Claims {
    pub aud: Audience,
    pub cap: Capability,
    pub exp: Option<i64>,
    pub iat: i64,
    pub fct: FactsWire,
}

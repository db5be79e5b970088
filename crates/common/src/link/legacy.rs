use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use cid::Cid;
use serde_json::Value;
use url::Url;

use super::share_link::{param, CID_PARAM, FILENAME_PARAM, TYPE_PARAM};
use super::LinkError;
use crate::crypto::{Iv, Secret};
use crate::token::{Expiration, Facts, TokenError};

const KEY_PARAM: &str = "key";
const IV_PARAM: &str = "iv";
const PROOF_PARAM: &str = "proof";
const EXP_PARAM: &str = "exp";

/// A link from before signed tokens: the key rides in the URL itself
///
/// Nothing here is authenticated. The expiry from `exp` and from the
/// proof record are honoured so old links still lapse on schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyLink {
    pub locator: Cid,
    pub key: Secret,
    pub iv: Iv,
    /// Base64 of the JSON delegation record, kept verbatim
    pub proof: Option<String>,
    /// Explicit expiry, unix seconds
    pub exp: Option<i64>,
    pub filename: String,
    pub mime: String,
}

impl LegacyLink {
    pub(crate) fn from_params(
        locator: Cid,
        params: &HashMap<String, String>,
    ) -> Result<Self, LinkError> {
        let key = param(params, KEY_PARAM).ok_or_else(|| LinkError::missing(KEY_PARAM))?;
        let iv = param(params, IV_PARAM).ok_or_else(|| LinkError::missing(IV_PARAM))?;

        let key = Secret::from_base64(&restore_plus(key))
            .map_err(|_| LinkError::missing(KEY_PARAM))?;
        let iv = Iv::from_base64(&restore_plus(iv)).map_err(|_| LinkError::missing(IV_PARAM))?;
        let exp = param(params, EXP_PARAM)
            .map(|exp| exp.trim().parse::<i64>())
            .transpose()
            .map_err(|_| LinkError::missing(EXP_PARAM))?;

        Ok(Self {
            locator,
            key,
            iv,
            proof: param(params, PROOF_PARAM).map(restore_plus),
            exp,
            filename: super::DEFAULT_FILENAME.to_string(),
            mime: super::DEFAULT_MIME.to_string(),
        })
    }

    /// Re-emit the link in its original shape.
    pub fn compose(&self, base: &Url) -> Url {
        let mut url = base.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .clear()
                .append_pair(CID_PARAM, &self.locator.to_string())
                .append_pair(KEY_PARAM, &self.key.to_base64())
                .append_pair(IV_PARAM, &self.iv.to_base64());
            if let Some(proof) = &self.proof {
                query.append_pair(PROOF_PARAM, proof);
            }
            if let Some(exp) = self.exp {
                query.append_pair(EXP_PARAM, &exp.to_string());
            }
            query
                .append_pair(FILENAME_PARAM, &self.filename)
                .append_pair(TYPE_PARAM, &self.mime);
        }
        url
    }

    /// The earlier of the explicit expiry and the proof's own
    pub fn expiration(&self) -> Expiration {
        match (self.exp, self.proof_expiration()) {
            (Some(a), Some(b)) => Expiration::At(a.min(b)),
            (Some(exp), None) | (None, Some(exp)) => Expiration::At(exp),
            (None, None) => Expiration::Never,
        }
    }

    pub fn check_expiration(&self, now: i64) -> Result<(), TokenError> {
        let expiration = self.expiration();
        if expiration.is_expired_at(now) {
            tracing::info!(%expiration, "legacy link rejected: expired");
            return Err(TokenError::Expired);
        }
        Ok(())
    }

    /// The key and iv as ordinary open facts
    pub fn facts(&self) -> Facts {
        Facts::open(self.iv, self.key.clone())
    }

    /// Expiry recorded in the proof, if the proof can be read at all.
    ///
    /// An unreadable proof is ignored rather than failing the link.
    fn proof_expiration(&self) -> Option<i64> {
        let proof = self.proof.as_deref()?;
        let record = match decode_proof(proof) {
            Some(record) => record,
            None => {
                tracing::warn!("could not read legacy proof; ignoring it");
                return None;
            }
        };
        ["expiration", "exp"]
            .iter()
            .find_map(|field| record.get(field).and_then(as_seconds))
    }
}

/// Form decoding turns `+` into a space; standard base64 needs it back.
fn restore_plus(value: &str) -> String {
    value.replace(' ', "+")
}

/// The proof is base64 JSON, sometimes a JSON string holding the JSON again.
fn decode_proof(proof: &str) -> Option<Value> {
    let bytes = STANDARD.decode(proof.trim()).ok()?;
    let value: Value = serde_json::from_slice(&bytes).ok()?;
    match value {
        Value::String(inner) => serde_json::from_str(&inner).ok(),
        Value::Object(_) => Some(value),
        _ => None,
    }
}

fn as_seconds(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|secs| secs as i64))
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::ParsedLink;
    use crate::storage::locator_for;

    const NOW: i64 = 1_700_000_000;

    fn link(proof: Option<String>, exp: Option<i64>) -> LegacyLink {
        LegacyLink {
            locator: locator_for(b"ciphertext"),
            key: Secret::generate().unwrap(),
            iv: Iv::generate().unwrap(),
            proof,
            exp,
            filename: "notes.txt".to_string(),
            mime: "text/plain".to_string(),
        }
    }

    fn proof(json: &Value) -> String {
        STANDARD.encode(json.to_string())
    }

    fn base() -> Url {
        Url::parse("https://share.example/view").unwrap()
    }

    #[test]
    fn test_parse_legacy_shape() {
        let original = link(None, Some(NOW + 60));
        let parsed = ParsedLink::parse(&original.compose(&base())).unwrap();
        assert_eq!(parsed, ParsedLink::Legacy(original));
    }

    #[test]
    fn test_plus_turned_space_is_restored() {
        let original = link(None, None);
        let mut url = base();
        url.set_query(Some(&format!(
            "cid={}&key={}&iv={}",
            original.locator,
            original.key.to_base64(),
            original.iv.to_base64()
        )));

        match ParsedLink::parse(&url).unwrap() {
            ParsedLink::Legacy(parsed) => assert_eq!(parsed.key, original.key),
            other => panic!("expected legacy link, got {:?}", other),
        }
    }

    #[test]
    fn test_key_without_iv_is_missing_parameters() {
        let mut url = base();
        url.query_pairs_mut()
            .append_pair("cid", &locator_for(b"x").to_string())
            .append_pair("key", &Secret::generate().unwrap().to_base64());
        assert_eq!(ParsedLink::parse(&url), Err(LinkError::MissingParameters));
    }

    #[test]
    fn test_bad_exp_is_missing_parameters() {
        let original = link(None, None);
        let mut url = original.compose(&base());
        url.query_pairs_mut().append_pair("exp", "soon");
        assert_eq!(ParsedLink::parse(&url), Err(LinkError::MissingParameters));
    }

    #[test]
    fn test_explicit_exp_honoured() {
        assert!(link(None, Some(NOW - 1)).check_expiration(NOW).is_err());
        assert!(link(None, Some(NOW + 1)).check_expiration(NOW).is_ok());
        assert!(link(None, None).check_expiration(i64::MAX).is_ok());
    }

    #[test]
    fn test_proof_expiration_honoured() {
        let expired = proof(&serde_json::json!({ "iss": "did:key:z123", "exp": NOW - 1 }));
        assert_eq!(
            link(Some(expired), None).check_expiration(NOW),
            Err(TokenError::Expired)
        );

        let current = proof(&serde_json::json!({ "expiration": NOW + 1 }));
        assert!(link(Some(current), None).check_expiration(NOW).is_ok());
    }

    #[test]
    fn test_double_encoded_proof() {
        let inner = serde_json::json!({ "expiration": NOW - 1 }).to_string();
        let proof = proof(&Value::String(inner));
        assert_eq!(link(Some(proof), None).expiration(), Expiration::At(NOW - 1));
    }

    #[test]
    fn test_earlier_expiry_wins() {
        let proof = proof(&serde_json::json!({ "exp": NOW + 100 }));
        assert_eq!(
            link(Some(proof), Some(NOW + 10)).expiration(),
            Expiration::At(NOW + 10)
        );
    }

    #[test]
    fn test_unreadable_proof_ignored() {
        let garbage = link(Some("%%%".to_string()), None);
        assert_eq!(garbage.expiration(), Expiration::Never);
    }
}

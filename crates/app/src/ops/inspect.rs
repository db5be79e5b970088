use clap::Args;
use common::error::FailureKind;
use common::link::ParsedLink;
use common::token::{inspect_token, TokenSummary};

/// Describe a share link without decrypting anything
#[derive(Args, Debug, Clone)]
pub struct Inspect {
    /// The share link
    pub link: String,
}

#[derive(Debug, thiserror::Error)]
pub enum InspectError {
    #[error("{0}")]
    Failed(#[from] FailureKind),
}

fn describe(summary: &TokenSummary) -> String {
    format!(
        "- Issuer: {}\n\
         - Audience: {}\n\
         - Resource: {}\n\
         - Ability: {}\n\
         - Issued: {}\n\
         - Expires: {}\n\
         - Password protected: {}",
        summary.issuer,
        summary.audience,
        summary.capability.with,
        summary.capability.can,
        chrono::DateTime::from_timestamp(summary.issued_at, 0)
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| summary.issued_at.to_string()),
        summary.expiration,
        if summary.password_protected { "yes" } else { "no" },
    )
}

#[async_trait::async_trait]
impl crate::op::Op for Inspect {
    type Error = InspectError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let parsed: ParsedLink = self.link.parse().map_err(FailureKind::from)?;
        match parsed {
            ParsedLink::Delegated(link) => {
                let summary = inspect_token(&link.token).map_err(FailureKind::from)?;
                Ok(format!(
                    "Signed share of {} ({}) at {}\n{}",
                    link.filename,
                    link.mime,
                    link.locator,
                    describe(&summary)
                ))
            }
            ParsedLink::Legacy(link) => Ok(format!(
                "Legacy share of {} ({}) at {}\n\
                 - Unsigned: the key travels in the link itself\n\
                 - Expires: {}",
                link.filename,
                link.mime,
                link.locator,
                link.expiration()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::{Op, OpContext};
    use common::crypto::SecretKey;
    use common::link::ShareLink;
    use common::storage::locator_for;
    use common::token::{Expiration, Facts, TokenBuilder};
    use url::Url;

    #[tokio::test]
    async fn test_inspect_signed_link() {
        let issuer = SecretKey::generate().unwrap();
        let locator = locator_for(b"ciphertext");
        let facts = Facts::open(
            common::crypto::Iv::generate().unwrap(),
            common::crypto::Secret::generate().unwrap(),
        );
        let token = TokenBuilder::new(facts)
            .scope(&locator)
            .expiration(Expiration::Never)
            .sign(&issuer, 0)
            .unwrap();
        let url = ShareLink::new(locator, token)
            .compose(&Url::parse("https://share.example/view").unwrap());

        let op = Inspect {
            link: url.to_string(),
        };
        let output = op.execute(&OpContext::new(None).unwrap()).await.unwrap();
        assert!(output.contains(&common::crypto::Did::from_public_key(&issuer.public()).to_string()));
        assert!(output.contains("Expires: never"));
        assert!(output.contains("Password protected: no"));
    }

    #[tokio::test]
    async fn test_inspect_rejects_garbage() {
        let op = Inspect {
            link: "https://share.example/view?filename=x".to_string(),
        };
        assert!(matches!(
            op.execute(&OpContext::new(None).unwrap()).await,
            Err(InspectError::Failed(FailureKind::MissingParameters))
        ));
    }
}

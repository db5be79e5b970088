//! The viewer side of a share link
//!
//! ```text
//! Fetching -> TokenVerifying -> NeedsIdentityChallenge -> NeedsPassword -> Shown
//!                      |                  |                     ^  |
//!                      |                  +--------> Ready      +--+ wrong password
//!                      +--> NeedsPassword / Ready   -> Decrypting -> Shown
//!
//! any failed check -> Failed(kind)
//! ```
//!
//! A session is driven one step at a time so a UI can prompt between
//! steps. Calling a step from the wrong state leaves the session untouched.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;

use super::share_link::{ParsedLink, ShareLink};
use crate::error::FailureKind;
use crate::identity::{IdentityError, IdentityVerifier};
use crate::storage::Storage;
use crate::token::{CurrentToken, Facts, TokenError};

/// Delay before the first retry after a wrong password
pub const PASSWORD_BACKOFF_BASE: Duration = Duration::from_millis(250);
/// Upper bound on the delay between password attempts
pub const PASSWORD_BACKOFF_CAP: Duration = Duration::from_secs(8);

/// How long to wait before the next attempt after `failures` wrong passwords
pub fn password_delay(failures: u32) -> Duration {
    if failures == 0 {
        return Duration::ZERO;
    }
    let factor = 1u32 << (failures - 1).min(16);
    PASSWORD_BACKOFF_BASE
        .saturating_mul(factor)
        .min(PASSWORD_BACKOFF_CAP)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    Fetching,
    TokenVerifying,
    NeedsIdentityChallenge,
    NeedsPassword { failures: u32 },
    Ready,
    Decrypting,
    Shown(Shown),
    Failed(FailureKind),
}

impl ViewState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ViewState::Shown(_) | ViewState::Failed(_))
    }
}

/// Recovered plaintext with its display metadata
#[derive(Clone, PartialEq, Eq)]
pub struct Shown {
    pub filename: String,
    pub mime: String,
    pub plaintext: Bytes,
}

impl fmt::Debug for Shown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shown")
            .field("filename", &self.filename)
            .field("mime", &self.mime)
            .field("len", &self.plaintext.len())
            .finish()
    }
}

#[derive(Debug)]
enum Verification {
    Pending,
    AwaitingAudience(Box<CurrentToken>),
    Granted(Facts),
}

/// One attempt at viewing one link
#[derive(Debug)]
pub struct ViewSession {
    link: ParsedLink,
    state: ViewState,
    ciphertext: Option<Bytes>,
    verification: Verification,
}

impl ViewSession {
    pub fn new(link: ParsedLink) -> Self {
        Self {
            link,
            state: ViewState::Fetching,
            ciphertext: None,
            verification: Verification::Pending,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn link(&self) -> &ParsedLink {
        &self.link
    }

    pub fn plaintext(&self) -> Option<&Bytes> {
        match &self.state {
            ViewState::Shown(shown) => Some(&shown.plaintext),
            _ => None,
        }
    }

    /// Fetch, verify, and for links with no challenge, decrypt.
    ///
    /// Stops at the first state that needs the viewer.
    pub async fn run(&mut self, storage: &dyn Storage, now: i64) -> &ViewState {
        self.fetch(storage).await;
        self.verify(now);
        if self.state == ViewState::Ready {
            self.open();
        }
        &self.state
    }

    /// `Fetching` → `TokenVerifying`: download the ciphertext.
    pub async fn fetch(&mut self, storage: &dyn Storage) -> &ViewState {
        if self.state != ViewState::Fetching {
            return self.out_of_order("fetch");
        }
        match storage.download(self.link.locator()).await {
            Ok(ciphertext) => {
                tracing::debug!(locator = %self.link.locator(), len = ciphertext.len(), "fetched ciphertext");
                self.ciphertext = Some(ciphertext);
                self.state = ViewState::TokenVerifying;
                &self.state
            }
            Err(e) => self.fail(e.into()),
        }
    }

    /// `TokenVerifying` → challenge, password prompt or `Ready`.
    ///
    /// Runs signature, scope and expiration checks at `now` (unix seconds).
    /// The audience is settled later, by the identity challenge.
    pub fn verify(&mut self, now: i64) -> &ViewState {
        if self.state != ViewState::TokenVerifying {
            return self.out_of_order("verify");
        }
        let verified = match &self.link {
            ParsedLink::Delegated(link) => verify_token(link, now).and_then(|current| {
                if current.restricted() {
                    Ok(Verification::AwaitingAudience(Box::new(current)))
                } else {
                    let facts = current.check_audience(None)?.into_grant().into_facts();
                    Ok(Verification::Granted(facts))
                }
            }),
            ParsedLink::Legacy(link) => link
                .check_expiration(now)
                .map(|_| Verification::Granted(link.facts())),
        };

        match verified {
            Ok(Verification::Granted(facts)) => self.grant(facts),
            Ok(awaiting) => {
                self.verification = awaiting;
                self.state = ViewState::NeedsIdentityChallenge;
                &self.state
            }
            Err(e) => self.fail(e.into()),
        }
    }

    /// `NeedsIdentityChallenge` → `NeedsPassword` / `Ready`.
    ///
    /// The verifier gets at most `timeout`; running out counts as
    /// unauthorized, as does any identity other than the audience.
    pub async fn answer_identity_challenge(
        &mut self,
        verifier: &dyn IdentityVerifier,
        challenge: &str,
        timeout: Duration,
    ) -> &ViewState {
        if self.state != ViewState::NeedsIdentityChallenge {
            return self.out_of_order("answer_identity_challenge");
        }
        let current = match std::mem::replace(&mut self.verification, Verification::Pending) {
            Verification::AwaitingAudience(current) => current,
            _ => return self.fail(FailureKind::Unauthorized),
        };

        let verified =
            match tokio::time::timeout(timeout, verifier.verify_viewer_identity(challenge)).await {
                Ok(verified) => verified,
                Err(_) => {
                    tracing::info!(timeout = ?timeout, "identity challenge timed out");
                    Err(IdentityError::TimedOut)
                }
            };
        let viewer = match verified {
            Ok(did) => did,
            Err(e) => return self.fail(e.into()),
        };

        match current.check_audience(Some(&viewer)) {
            Ok(authorized) => self.grant(authorized.into_grant().into_facts()),
            Err(e) => self.fail(e.into()),
        }
    }

    /// `NeedsPassword` → `Shown`, or back to `NeedsPassword` on a wrong guess.
    ///
    /// After a wrong guess the next attempt is delayed (see [`password_delay`]).
    pub async fn submit_password(&mut self, password: &str) -> &ViewState {
        let failures = match self.state {
            ViewState::NeedsPassword { failures } => failures,
            _ => return self.out_of_order("submit_password"),
        };
        let delay = password_delay(failures);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let (facts, ciphertext) = match (&self.verification, &self.ciphertext) {
            (Verification::Granted(facts), Some(ciphertext)) => (facts.clone(), ciphertext.clone()),
            _ => return self.fail(FailureKind::Decryption),
        };
        let password = password.to_string();
        let attempt = tokio::task::spawn_blocking(move || {
            facts.decrypt_with_password(&ciphertext, &password)
        })
        .await;

        match attempt {
            Ok(Ok(plaintext)) => self.show(plaintext),
            Ok(Err(_)) => {
                let failures = failures.saturating_add(1);
                tracing::info!(failures, "wrong password");
                self.state = ViewState::NeedsPassword { failures };
                &self.state
            }
            Err(e) => {
                tracing::error!("password attempt aborted: {}", e);
                self.fail(FailureKind::Decryption)
            }
        }
    }

    /// `Ready` → `Decrypting` → `Shown`.
    pub fn open(&mut self) -> &ViewState {
        if self.state != ViewState::Ready {
            return self.out_of_order("open");
        }
        self.state = ViewState::Decrypting;
        let result = match (&self.verification, &self.ciphertext) {
            (Verification::Granted(facts), Some(ciphertext)) => facts.decrypt(ciphertext),
            _ => return self.fail(FailureKind::Decryption),
        };
        match result {
            Ok(plaintext) => self.show(plaintext),
            Err(e) => self.fail(e.into()),
        }
    }

    fn grant(&mut self, facts: Facts) -> &ViewState {
        self.state = if facts.password_protected() {
            ViewState::NeedsPassword { failures: 0 }
        } else {
            ViewState::Ready
        };
        self.verification = Verification::Granted(facts);
        &self.state
    }

    fn show(&mut self, plaintext: Vec<u8>) -> &ViewState {
        tracing::info!(locator = %self.link.locator(), len = plaintext.len(), "share decrypted");
        self.state = ViewState::Shown(Shown {
            filename: self.link.filename().to_string(),
            mime: self.link.mime().to_string(),
            plaintext: Bytes::from(plaintext),
        });
        &self.state
    }

    fn fail(&mut self, kind: FailureKind) -> &ViewState {
        tracing::info!(%kind, "view failed");
        self.state = ViewState::Failed(kind);
        &self.state
    }

    fn out_of_order(&self, step: &str) -> &ViewState {
        tracing::warn!(step, state = ?self.state, "view step called out of order");
        &self.state
    }
}

/// Signature, then scope, then expiration
fn verify_token(link: &ShareLink, now: i64) -> Result<CurrentToken, TokenError> {
    let signed = link.token.decode()?.verify_signature()?;
    if !signed.permits(&link.locator) {
        tracing::warn!("token rejected: capability does not cover this content");
        return Err(TokenError::Tampered);
    }
    signed.check_expiration(now)
}

//! Any change to a signed token must be caught before its facts are used

mod common;

use self::common::{fast_kdf, NOW};

use ::common::crypto::{Iv, Secret, SecretKey};
use ::common::share::ShareOptions;
use ::common::token::{
    extract_token_at, inspect_token, EncodedToken, Expiration, Facts, TokenBuilder, TokenError,
};

fn signed_bytes() -> Vec<u8> {
    let facts = Facts::open(Iv::generate().unwrap(), Secret::generate().unwrap());
    let token = TokenBuilder::new(facts)
        .audience(Some("did:key:z123".parse().unwrap()))
        .expiration(Expiration::At(NOW + 60))
        .sign(&SecretKey::generate().unwrap(), NOW)
        .unwrap();
    token.to_bytes().unwrap()
}

#[test]
fn test_every_bit_flip_is_tampered() {
    let bytes = signed_bytes();
    let audience = "did:key:z123".parse().unwrap();

    for index in 1..bytes.len() {
        for bit in 0..8 {
            let mut flipped = bytes.clone();
            flipped[index] ^= 1 << bit;
            let token = EncodedToken::from_bytes(&flipped);
            assert_eq!(
                extract_token_at(&token, Some(&audience), NOW).unwrap_err(),
                TokenError::Tampered,
                "byte {} bit {}",
                index,
                bit
            );
        }
    }
}

#[test]
fn test_version_byte_change_is_malformed() {
    let mut bytes = signed_bytes();
    bytes[0] ^= 0x80;
    let token = EncodedToken::from_bytes(&bytes);
    assert_eq!(
        extract_token_at(&token, None, NOW).unwrap_err(),
        TokenError::Malformed
    );
}

#[test]
fn test_truncation_is_rejected() {
    let bytes = signed_bytes();
    let token = EncodedToken::from_bytes(&bytes[..bytes.len() - 1]);
    assert_eq!(
        extract_token_at(&token, None, NOW).unwrap_err(),
        TokenError::Tampered
    );

    let token = EncodedToken::from_bytes(&bytes[..40]);
    assert_eq!(
        extract_token_at(&token, None, NOW).unwrap_err(),
        TokenError::Malformed
    );
}

#[test]
fn test_resigned_by_stranger_is_a_different_issuer() {
    let mut bytes = signed_bytes();
    let stranger = SecretKey::generate().unwrap();
    bytes[1..33].copy_from_slice(&stranger.public().to_bytes());
    let token = EncodedToken::from_bytes(&bytes);
    assert_eq!(inspect_token(&token).unwrap_err(), TokenError::Tampered);
}

#[tokio::test]
async fn test_swapped_locator_is_tampered() {
    use ::common::error::FailureKind;
    use ::common::link::{ParsedLink, ViewSession, ViewState};
    use ::common::storage::Storage;

    let options = ShareOptions::new("a.txt").kdf(fast_kdf());
    let (mut link, storage, _ctx) = common::setup_share(b"original", options).await;
    link.locator = storage
        .upload(bytes::Bytes::from_static(b"substitute"), "b")
        .await
        .unwrap();

    let mut session = ViewSession::new(ParsedLink::Delegated(link));
    assert_eq!(
        session.run(&storage, NOW).await,
        &ViewState::Failed(FailureKind::Tampered)
    );
}

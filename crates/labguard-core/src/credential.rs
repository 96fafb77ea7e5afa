//! Bearer credentials and the unauthenticated claim peek.
//!
//! [`peek`] decodes the claims segment of a JWT-shaped token without checking
//! any signature. The result is only a lookup key: the caller must still have
//! the identity service resolve the account before trusting anything.

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Why a credential was turned away before reaching the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
  #[error("Missing bearer token.")]
  MissingBearer,
  #[error("Token claims could not be decoded.")]
  Malformed,
  #[error("Token has no subject.")]
  MissingSubject,
  #[error("Token subject is not a valid user id.")]
  InvalidSubject,
  #[error("Token issuer does not match.")]
  IssuerMismatch,
}

/// The subset of token claims this system looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sub:   Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub iss:   Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub role:  Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub exp:   Option<i64>,
}

/// A token whose claims passed the structural checks. Nothing here is
/// verified yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeekedCredential {
  /// The raw token, forwarded to the identity service.
  pub token:   String,
  pub subject: Uuid,
  pub claims:  Claims,
}

/// Strip the `Bearer ` prefix from an `Authorization` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, CredentialError> {
  header
    .and_then(|h| h.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .ok_or(CredentialError::MissingBearer)
}

/// Decode the middle segment of `token` as base64 JSON claims.
///
/// Both the standard and URL-safe alphabets are accepted, with or without
/// padding.
pub fn decode_claims(token: &str) -> Result<Claims, CredentialError> {
  let segment = token.split('.').nth(1).ok_or(CredentialError::Malformed)?;
  let normalised: String = segment
    .trim_end_matches('=')
    .chars()
    .map(|c| match c {
      '-' => '+',
      '_' => '/',
      other => other,
    })
    .collect();

  let bytes = STANDARD_NO_PAD
    .decode(normalised)
    .map_err(|_| CredentialError::Malformed)?;
  serde_json::from_slice(&bytes).map_err(|_| CredentialError::Malformed)
}

/// Full structural check of an `Authorization` header against the issuer
/// this deployment trusts.
pub fn peek(
  header: Option<&str>,
  expected_issuer: &str,
) -> Result<PeekedCredential, CredentialError> {
  let token  = bearer_token(header)?;
  let claims = decode_claims(token)?;

  let subject = claims
    .sub
    .as_deref()
    .filter(|s| !s.is_empty())
    .ok_or(CredentialError::MissingSubject)?;

  if claims.iss.as_deref() != Some(expected_issuer) {
    return Err(CredentialError::IssuerMismatch);
  }

  // Identity service ids are UUIDs; anything else cannot resolve.
  let subject = Uuid::parse_str(subject).map_err(|_| CredentialError::InvalidSubject)?;

  Ok(PeekedCredential { token: token.to_owned(), subject, claims })
}

/// Assemble a JWT-shaped token from `claims` and an opaque final segment.
pub fn compose_token(claims: &Claims, secret_segment: &[u8]) -> serde_json::Result<String> {
  let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
  let body   = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
  let tail   = URL_SAFE_NO_PAD.encode(secret_segment);
  Ok(format!("{header}.{body}.{tail}"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use base64::engine::general_purpose::STANDARD;

  const ISSUER: &str = "https://lab.example.supabase.co/auth/v1";

  fn token_for(claims: serde_json::Value) -> String {
    let body = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("eyJhbGciOiJIUzI1NiJ9.{body}.signature")
  }

  #[test]
  fn accepts_matching_issuer() {
    let sub   = Uuid::new_v4();
    let token = token_for(serde_json::json!({ "sub": sub, "iss": ISSUER, "role": "authenticated" }));
    let header = format!("Bearer {token}");

    let peeked = peek(Some(&header), ISSUER).unwrap();
    assert_eq!(peeked.subject, sub);
    assert_eq!(peeked.token, token);
    assert_eq!(peeked.claims.role.as_deref(), Some("authenticated"));
  }

  #[test]
  fn rejects_other_issuers() {
    let token = token_for(serde_json::json!({
      "sub": Uuid::new_v4(),
      "iss": "https://elsewhere.example/auth/v1",
    }));
    let header = format!("Bearer {token}");
    assert_eq!(peek(Some(&header), ISSUER), Err(CredentialError::IssuerMismatch));

    let token  = token_for(serde_json::json!({ "sub": Uuid::new_v4() }));
    let header = format!("Bearer {token}");
    assert_eq!(peek(Some(&header), ISSUER), Err(CredentialError::IssuerMismatch));
  }

  #[test]
  fn requires_bearer_prefix() {
    let token = token_for(serde_json::json!({ "sub": Uuid::new_v4(), "iss": ISSUER }));
    assert_eq!(peek(Some(&token), ISSUER), Err(CredentialError::MissingBearer));
    assert_eq!(peek(Some(&format!("Basic {token}")), ISSUER), Err(CredentialError::MissingBearer));
    assert_eq!(peek(None, ISSUER), Err(CredentialError::MissingBearer));
    assert_eq!(peek(Some("Bearer "), ISSUER), Err(CredentialError::MissingBearer));
  }

  #[test]
  fn rejects_undecodable_tokens() {
    assert_eq!(peek(Some("Bearer opaque"), ISSUER), Err(CredentialError::Malformed));
    assert_eq!(peek(Some("Bearer a.!!!.c"), ISSUER), Err(CredentialError::Malformed));
    let not_json = format!("Bearer a.{}.c", URL_SAFE_NO_PAD.encode("plain text"));
    assert_eq!(peek(Some(&not_json), ISSUER), Err(CredentialError::Malformed));
  }

  #[test]
  fn requires_subject() {
    let token  = token_for(serde_json::json!({ "iss": ISSUER }));
    let header = format!("Bearer {token}");
    assert_eq!(peek(Some(&header), ISSUER), Err(CredentialError::MissingSubject));

    let token  = token_for(serde_json::json!({ "sub": "", "iss": ISSUER }));
    let header = format!("Bearer {token}");
    assert_eq!(peek(Some(&header), ISSUER), Err(CredentialError::MissingSubject));
  }

  #[test]
  fn non_uuid_subject_is_invalid_not_missing() {
    let token  = token_for(serde_json::json!({ "sub": "service-account", "iss": ISSUER }));
    let header = format!("Bearer {token}");
    assert_eq!(peek(Some(&header), ISSUER), Err(CredentialError::InvalidSubject));
  }

  #[test]
  fn standard_alphabet_with_padding_decodes() {
    let sub    = Uuid::new_v4();
    let claims = serde_json::json!({ "sub": sub, "iss": ISSUER, "email": "a?b@example.com" });
    let body   = STANDARD.encode(claims.to_string());
    let header = format!("Bearer h.{body}.s");
    assert_eq!(peek(Some(&header), ISSUER).unwrap().subject, sub);
  }

  #[test]
  fn composed_tokens_peek_back() {
    let sub    = Uuid::new_v4();
    let claims = Claims {
      sub: Some(sub.to_string()),
      iss: Some(ISSUER.into()),
      exp: Some(1_900_000_000),
      ..Claims::default()
    };
    let token  = compose_token(&claims, b"0123456789").unwrap();
    assert_eq!(token.split('.').count(), 3);
    let peeked = peek(Some(&format!("Bearer {token}")), ISSUER).unwrap();
    assert_eq!(peeked.claims, claims);
  }
}

//! [`IdentityProvider`] over GoTrue.
//!
//! Account resolution sends the caller's own token to `/auth/v1/user`, so
//! the hosted service verifies its signature and expiry; the claim peek done
//! by the HTTP layer only decides whether to ask.

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use labguard_core::{
  account::{Account, NewAccount, Session},
  credential::PeekedCredential,
  store::IdentityProvider,
};

use crate::{
  Error, Result, SupabaseBackend,
  client::{check, send_json},
};

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
  full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserRow {
  id:            Uuid,
  email:         Option<String>,
  #[serde(default)]
  user_metadata: UserMetadata,
}

impl From<UserRow> for Account {
  fn from(user: UserRow) -> Self {
    Account { id: user.id, email: user.email, full_name: user.user_metadata.full_name }
  }
}

/// Either a bare user object or one wrapped as `{ "user": .. }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UserEnvelope {
  Wrapped { user: UserRow },
  Bare(UserRow),
}

impl UserEnvelope {
  fn into_user(self) -> UserRow {
    match self {
      Self::Wrapped { user } | Self::Bare(user) => user,
    }
  }
}

#[derive(Debug, Deserialize)]
struct TokenGrant {
  access_token: String,
  #[serde(default = "bearer")]
  token_type:   String,
  expires_in:   i64,
  user:         UserRow,
}

fn bearer() -> String { "bearer".into() }

impl IdentityProvider for SupabaseBackend {
  type Error = Error;

  async fn resolve_account(&self, credential: &PeekedCredential) -> Result<Option<Account>> {
    let resp = self
      .anon
      .request_as(Method::GET, "/auth/v1/user", &credential.token)
      .send()
      .await?;

    if matches!(resp.status(), StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
      return Ok(None);
    }
    let user: UserEnvelope = check(resp).await?.json().await?;
    let user = user.into_user();

    if user.id != credential.subject {
      tracing::warn!(subject = %credential.subject, account = %user.id, "token subject mismatch");
      return Ok(None);
    }
    Ok(Some(user.into()))
  }

  async fn create_account(&self, input: NewAccount) -> Result<Account> {
    let user: UserEnvelope = send_json(
      self
        .service
        .request(Method::POST, "/auth/v1/admin/users")
        .json(&json!({
          "email":         input.email,
          "password":      input.password,
          "email_confirm": true,
          "user_metadata": { "full_name": input.full_name },
        })),
    )
    .await?;
    Ok(user.into_user().into())
  }

  async fn sign_in(&self, email: &str, password: &str) -> Result<Option<Session>> {
    let resp = self
      .anon
      .request(Method::POST, "/auth/v1/token")
      .query(&[("grant_type", "password")])
      .json(&json!({ "email": email, "password": password }))
      .send()
      .await?;

    // Rejected credentials come back as 400 invalid_grant.
    if matches!(resp.status(), StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED) {
      return Ok(None);
    }
    let grant: TokenGrant = check(resp).await?.json().await?;
    Ok(Some(Session {
      access_token: grant.access_token,
      token_type:   grant.token_type,
      expires_in:   grant.expires_in,
      user_id:      grant.user.id,
    }))
  }
}

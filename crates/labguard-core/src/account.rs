//! Accounts owned by the identity service.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An identity-service account, as resolved from a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
  pub id:        Uuid,
  pub email:     Option<String>,
  pub full_name: Option<String>,
}

/// Input to [`crate::store::IdentityProvider::create_account`]. New accounts
/// are created with their email already confirmed.
#[derive(Debug, Clone)]
pub struct NewAccount {
  pub email:     String,
  pub password:  String,
  pub full_name: String,
}

/// A freshly issued access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub access_token: String,
  pub token_type:   String,
  /// Lifetime of `access_token` in seconds.
  pub expires_in:   i64,
  pub user_id:      Uuid,
}

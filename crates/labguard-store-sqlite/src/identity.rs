//! The [`IdentityProvider`] half of [`SqliteStore`]: password accounts and
//! opaque session tokens.
//!
//! Tokens are JWT-shaped (`header.claims.secret`) so the claim peek works the
//! same as against a hosted identity service, but nothing is signed. A token
//! is only valid while the SHA-256 of the whole string is present in
//! `sessions` and unexpired. Each sign-in clears out expired rows.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use chrono::{Duration, Utc};
use rand_core::{OsRng, RngCore as _};
use rusqlite::OptionalExtension as _;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use labguard_core::{
  account::{Account, NewAccount, Session},
  credential::{Claims, PeekedCredential, compose_token},
  store::IdentityProvider,
};

use crate::{
  Error, Result, SqliteStore,
  encode::{decode_uuid, encode_dt, encode_uuid},
};

fn token_hash(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

fn hash_password(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| Error::PasswordHash(e.to_string()))
}

fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
    .is_ok()
}

impl IdentityProvider for SqliteStore {
  type Error = Error;

  async fn resolve_account(&self, credential: &PeekedCredential) -> Result<Option<Account>> {
    let hash    = token_hash(&credential.token);
    let now_str = encode_dt(Utc::now());

    let row: Option<(String, String, Option<String>)> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT a.id, a.email, a.full_name
             FROM sessions s
             JOIN accounts a ON a.id = s.account_id
             WHERE s.token_hash = ?1 AND s.expires_at > ?2",
            rusqlite::params![hash, now_str],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
          )
          .optional()?)
      })
      .await?;

    let Some((id, email, full_name)) = row else {
      return Ok(None);
    };
    let id = decode_uuid(&id)?;

    // The session row is authoritative; a token whose claims name a different
    // account was not minted here.
    if id != credential.subject {
      tracing::warn!(subject = %credential.subject, account = %id, "token subject mismatch");
      return Ok(None);
    }

    Ok(Some(Account { id, email: Some(email), full_name }))
  }

  async fn create_account(&self, input: NewAccount) -> Result<Account> {
    let id       = Uuid::new_v4();
    let phc      = hash_password(&input.password)?;
    let now_str  = encode_dt(Utc::now());
    let id_str   = encode_uuid(id);
    let email    = input.email.trim().to_owned();
    let inserted = email.clone();
    let name     = input.full_name.clone();

    let created = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let exists: bool = tx.query_row(
          "SELECT EXISTS (SELECT 1 FROM accounts WHERE email = ?1)",
          rusqlite::params![inserted],
          |r| r.get(0),
        )?;
        if exists {
          return Ok(false);
        }
        tx.execute(
          "INSERT INTO accounts (id, email, password_hash, full_name, email_confirmed_at, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
          rusqlite::params![id_str, inserted, phc, name, now_str],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !created {
      return Err(Error::AccountExists(email));
    }

    tracing::info!(account = %id, "created account");
    Ok(Account { id, email: Some(email), full_name: Some(input.full_name) })
  }

  async fn sign_in(&self, email: &str, password: &str) -> Result<Option<Session>> {
    let lookup = email.trim().to_owned();

    let row: Option<(String, String, String)> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT id, email, password_hash FROM accounts WHERE email = ?1",
            rusqlite::params![lookup],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
          )
          .optional()?)
      })
      .await?;

    let Some((id, email, phc)) = row else {
      return Ok(None);
    };
    if !verify_password(password, &phc) {
      return Ok(None);
    }

    let user_id    = decode_uuid(&id)?;
    let now        = Utc::now();
    let ttl        = Duration::from_std(self.session_ttl)
      .map_err(|e| Error::Decode(format!("session ttl out of range: {e}")))?;
    let expires_at = now + ttl;

    let mut secret = [0u8; 32];
    OsRng.fill_bytes(&mut secret);

    let claims = Claims {
      sub:   Some(id.clone()),
      iss:   Some(self.issuer.clone()),
      role:  Some("authenticated".into()),
      email: Some(email),
      exp:   Some(expires_at.timestamp()),
    };
    let token = compose_token(&claims, &secret)?;

    let hash        = token_hash(&token);
    let expires_str = encode_dt(expires_at);
    let created_str = encode_dt(now);

    let purged = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        // Expired rows can never resolve again.
        let purged = tx.execute(
          "DELETE FROM sessions WHERE expires_at <= ?1",
          rusqlite::params![created_str],
        )?;
        tx.execute(
          "INSERT INTO sessions (token_hash, account_id, expires_at, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![hash, id, expires_str, created_str],
        )?;
        tx.commit()?;
        Ok(purged)
      })
      .await?;

    tracing::debug!(account = %user_id, purged, "issued session");

    Ok(Some(Session {
      access_token: token,
      token_type:   "bearer".into(),
      expires_in:   ttl.num_seconds(),
      user_id,
    }))
  }
}

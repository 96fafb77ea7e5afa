//! Bearer-token authentication and role-based guards.
//!
//! Every guard runs the same pipeline: peek at the token's claims, have the
//! identity service resolve the account, then (for role policies) look up
//! the caller's role. Guards are extractors, so a handler that names one
//! never runs for a refused request.

use std::{marker::PhantomData, ops::Deref};

use axum::{
  extract::FromRequestParts,
  http::{header, request::Parts},
};
use labguard_core::{
  account::Account,
  credential::{self, CredentialError},
  role::{ANALYST_OR_ADMIN, EVALUATOR_OR_ADMIN, Policy, RoleKind},
  store::{IdentityProvider, Registry},
};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

// ─── Token validation ─────────────────────────────────────────────────────────

/// Validate an `Authorization` header value and resolve its account.
pub async fn authenticate<I>(
  header: Option<&str>,
  issuer: &str,
  identity: &I,
) -> Result<Account, ApiError>
where
  I: IdentityProvider,
{
  let credential = credential::peek(header, issuer).map_err(|e| match e {
    CredentialError::MissingBearer => {
      ApiError::Unauthenticated { message: "Missing bearer token.", detail: None }
    }
    other => {
      tracing::debug!(reason = %other, "credential refused before lookup");
      ApiError::invalid_session(other.to_string())
    }
  })?;

  match identity.resolve_account(&credential).await {
    Ok(Some(account)) if account.id == credential.subject => Ok(account),
    Ok(_) => Err(ApiError::invalid_session("User not found.")),
    Err(e) => {
      tracing::warn!(subject = %credential.subject, error = %e, "account resolution failed");
      Err(ApiError::invalid_session(e.to_string()))
    }
  }
}

// ─── Role resolution ──────────────────────────────────────────────────────────

/// The caller's canonical role, or `None` when the profile or its role link
/// is missing. Lookup errors are logged and treated as "no role".
pub async fn resolve_role<R>(registry: &R, account_id: Uuid) -> Option<RoleKind>
where
  R: Registry,
{
  match registry.get_profile(account_id).await {
    Ok(profile) => profile.and_then(|p| p.role_kind()),
    Err(e) => {
      tracing::warn!(account = %account_id, error = %e, "role lookup failed");
      None
    }
  }
}

// ─── Guards ───────────────────────────────────────────────────────────────────

/// An authenticated caller that satisfied a guard.
#[derive(Debug, Clone)]
pub struct Caller {
  pub account: Account,
  /// Only resolved for policies that need it.
  pub role:    Option<RoleKind>,
}

impl Caller {
  pub fn id(&self) -> Uuid { self.account.id }
}

/// The access policy a guard enforces.
pub trait Requirement {
  const POLICY: Policy;
}

pub struct AnyRole;
pub struct AdminRole;
pub struct EvaluatorRole;
pub struct AnalystRole;

impl Requirement for AnyRole {
  const POLICY: Policy = Policy::AnyAuthenticated;
}
impl Requirement for AdminRole {
  const POLICY: Policy = Policy::AdminOnly;
}
impl Requirement for EvaluatorRole {
  const POLICY: Policy = Policy::RoleIn(EVALUATOR_OR_ADMIN);
}
impl Requirement for AnalystRole {
  const POLICY: Policy = Policy::RoleIn(ANALYST_OR_ADMIN);
}

/// Extractor admitting only callers that satisfy `P`.
pub struct Guarded<P> {
  caller:  Caller,
  _policy: PhantomData<fn() -> P>,
}

impl<P> Deref for Guarded<P> {
  type Target = Caller;

  fn deref(&self) -> &Caller { &self.caller }
}

pub type Authenticated = Guarded<AnyRole>;
pub type AdminOnly = Guarded<AdminRole>;
pub type EvaluatorOrAdmin = Guarded<EvaluatorRole>;
pub type AnalystOrAdmin = Guarded<AnalystRole>;

impl<R, I, P> FromRequestParts<AppState<R, I>> for Guarded<P>
where
  R: Registry + Clone + 'static,
  I: IdentityProvider + Clone + 'static,
  P: Requirement,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<R, I>,
  ) -> Result<Self, Self::Rejection> {
    let authorization = parts
      .headers
      .get(header::AUTHORIZATION)
      .and_then(|v| v.to_str().ok());
    let account = authenticate(authorization, &state.issuer, state.identity.as_ref()).await?;

    let role = if P::POLICY.needs_role() {
      resolve_role(state.registry.as_ref(), account.id).await
    } else {
      None
    };

    if !P::POLICY.admits(role.as_ref()) {
      tracing::info!(account = %account.id, role = ?role, path = %parts.uri.path(), "forbidden");
      return Err(ApiError::Forbidden);
    }

    Ok(Self { caller: Caller { account, role }, _policy: PhantomData })
  }
}

//! The collaborator traits: [`Registry`] (sample, profile and role records)
//! and [`IdentityProvider`] (accounts and credentials).
//!
//! Both are implemented by backends (`labguard-store-sqlite`,
//! `labguard-supabase`). The HTTP layer depends on these abstractions, not on
//! any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  account::{Account, NewAccount, Session},
  credential::PeekedCredential,
  enrich::ProfileName,
  lifecycle::SampleUpdate,
  role::{NewProfile, NewRole, Profile, Role, RolePatch},
  sample::{NewSample, RegisteredSample, Sample, SampleStatus},
};

/// Hard cap on rows returned by a sample listing.
pub const MAX_SAMPLE_LIST: usize = 200;

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`Registry::list_samples`]. Results are ordered by
/// `received_at` descending (unreceived first), then `created_at` descending.
#[derive(Debug, Clone)]
pub struct SampleQuery {
  pub status: Option<SampleStatus>,
  pub limit:  usize,
}

impl Default for SampleQuery {
  fn default() -> Self { Self { status: None, limit: MAX_SAMPLE_LIST } }
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Persistent store of samples, profiles and roles.
///
/// Each method is atomic for the single row it touches; nothing here spans
/// rows transactionally.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait Registry: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Samples ───────────────────────────────────────────────────────────

  /// Run the registration procedure for a new sample.
  fn register_sample(
    &self,
    input: NewSample,
    created_by: Uuid,
  ) -> impl Future<Output = Result<RegisteredSample, Self::Error>> + Send + '_;

  /// Retrieve a sample by id. Returns `None` if not found.
  fn get_sample(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Sample>, Self::Error>> + Send + '_;

  fn list_samples<'a>(
    &'a self,
    query: &'a SampleQuery,
  ) -> impl Future<Output = Result<Vec<Sample>, Self::Error>> + Send + 'a;

  /// Apply `update` as one conditional write and return the updated row.
  ///
  /// Returns `None` when no row has the id, or when `expected_status` is set
  /// and the row's current status differs.
  fn apply_update(
    &self,
    update: SampleUpdate,
  ) -> impl Future<Output = Result<Option<Sample>, Self::Error>> + Send + '_;

  // ── Profiles ──────────────────────────────────────────────────────────

  /// A profile joined with its role. Returns `None` if not found.
  fn get_profile(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + '_;

  /// All profiles, newest first.
  fn list_profiles(
    &self,
  ) -> impl Future<Output = Result<Vec<Profile>, Self::Error>> + Send + '_;

  fn profile_names<'a>(
    &'a self,
    ids: &'a [Uuid],
  ) -> impl Future<Output = Result<Vec<ProfileName>, Self::Error>> + Send + 'a;

  /// Active profiles whose role slug is one of `slugs`, ordered by name.
  fn active_profiles_with_role<'a>(
    &'a self,
    slugs: &'a [&'a str],
  ) -> impl Future<Output = Result<Vec<Profile>, Self::Error>> + Send + 'a;

  fn upsert_profile(
    &self,
    profile: NewProfile,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Point a profile at `role`. Returns `false` if the profile is missing.
  fn set_profile_role<'a>(
    &'a self,
    profile_id: Uuid,
    role: &'a Role,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  // ── Roles ─────────────────────────────────────────────────────────────

  /// All roles ordered by name.
  fn list_roles(&self) -> impl Future<Output = Result<Vec<Role>, Self::Error>> + Send + '_;

  fn get_role(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Role>, Self::Error>> + Send + '_;

  fn get_role_by_slug<'a>(
    &'a self,
    slug: &'a str,
  ) -> impl Future<Output = Result<Option<Role>, Self::Error>> + Send + 'a;

  fn create_role(
    &self,
    role: NewRole,
  ) -> impl Future<Output = Result<Role, Self::Error>> + Send + '_;

  /// Returns `None` if the role does not exist.
  fn update_role(
    &self,
    id: Uuid,
    patch: RolePatch,
  ) -> impl Future<Output = Result<Option<Role>, Self::Error>> + Send + '_;

  /// Whether any profile still references the role.
  fn role_in_use(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn delete_role(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── Identity ────────────────────────────────────────────────────────────────

/// The identity service: the trust boundary for credentials.
pub trait IdentityProvider: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Resolve the account behind a peeked credential. Implementations verify
  /// the credential itself; `None` means it is not (or no longer) valid, or
  /// the account does not exist.
  fn resolve_account<'a>(
    &'a self,
    credential: &'a PeekedCredential,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + 'a;

  /// Create an account with a confirmed email.
  fn create_account(
    &self,
    input: NewAccount,
  ) -> impl Future<Output = Result<Account, Self::Error>> + Send + '_;

  /// Password sign-in. `None` means the credentials were rejected.
  fn sign_in<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
  ) -> impl Future<Output = Result<Option<Session>, Self::Error>> + Send + 'a;
}

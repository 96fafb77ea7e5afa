//! Roles, profiles, and the rules that turn a role slug into an access
//! decision.
//!
//! Historical data carries both Spanish and English slugs for the built-in
//! roles. [`RoleKind::from_slug`] is the one place those synonyms are folded
//! together; guards only ever compare canonical kinds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Slugs ───────────────────────────────────────────────────────────────────

/// Derive a machine slug: lowercase, trim, collapse every run of characters
/// outside `[a-z0-9]` into one `-`, and strip leading/trailing hyphens.
pub fn slugify(value: &str) -> String {
  let lowered = value.trim().to_lowercase();
  let mut slug = String::with_capacity(lowered.len());
  let mut pending_hyphen = false;

  for ch in lowered.chars() {
    if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
      if pending_hyphen && !slug.is_empty() {
        slug.push('-');
      }
      pending_hyphen = false;
      slug.push(ch);
    } else {
      pending_hyphen = true;
    }
  }

  slug
}

// ─── Canonical role kinds ────────────────────────────────────────────────────

/// A role after synonym normalisation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoleKind {
  Admin,
  Reception,
  Analyst,
  Evaluator,
  /// An admin-created role with no built-in meaning.
  Custom(String),
}

/// Slug synonyms for the built-in roles.
const SYNONYMS: &[(&str, RoleKind)] = &[
  ("admin", RoleKind::Admin),
  ("recepcion", RoleKind::Reception),
  ("recepcionista", RoleKind::Reception),
  ("reception", RoleKind::Reception),
  ("receptionist", RoleKind::Reception),
  ("analista", RoleKind::Analyst),
  ("analyst", RoleKind::Analyst),
  ("evaluador", RoleKind::Evaluator),
  ("evaluator", RoleKind::Evaluator),
];

impl RoleKind {
  pub fn from_slug(slug: &str) -> Self {
    let slug = slug.trim();
    SYNONYMS
      .iter()
      .find(|(s, _)| s.eq_ignore_ascii_case(slug))
      .map(|(_, kind)| kind.clone())
      .unwrap_or_else(|| Self::Custom(slug.to_owned()))
  }

  /// Every stored slug that normalises to this kind.
  pub fn slugs(&self) -> Vec<&str> {
    match self {
      Self::Custom(slug) => vec![slug.as_str()],
      kind => SYNONYMS
        .iter()
        .filter(|(_, k)| k == kind)
        .map(|(s, _)| *s)
        .collect(),
    }
  }

  /// Canonical name reported to clients.
  pub fn as_str(&self) -> &str {
    match self {
      Self::Admin => "admin",
      Self::Reception => "reception",
      Self::Analyst => "analyst",
      Self::Evaluator => "evaluator",
      Self::Custom(slug) => slug,
    }
  }
}

// ─── Access policies ─────────────────────────────────────────────────────────

pub const EVALUATOR_OR_ADMIN: &[RoleKind] = &[RoleKind::Evaluator, RoleKind::Admin];
pub const ANALYST_OR_ADMIN: &[RoleKind] = &[RoleKind::Analyst, RoleKind::Admin];

/// Who may call an endpoint, once the caller's credential has been accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
  AdminOnly,
  AnyAuthenticated,
  RoleIn(&'static [RoleKind]),
}

impl Policy {
  /// Whether the policy needs the caller's role at all.
  pub fn needs_role(self) -> bool { !matches!(self, Self::AnyAuthenticated) }

  /// Decide for an authenticated caller whose role resolved to `role`.
  pub fn admits(self, role: Option<&RoleKind>) -> bool {
    match self {
      Self::AnyAuthenticated => true,
      Self::AdminOnly => role == Some(&RoleKind::Admin),
      Self::RoleIn(allowed) => role.is_some_and(|r| allowed.contains(r)),
    }
  }
}

// ─── Role records ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
  pub id:          Uuid,
  pub name:        String,
  pub slug:        String,
  pub description: Option<String>,
}

impl Role {
  pub fn kind(&self) -> RoleKind { RoleKind::from_slug(&self.slug) }
}

/// Input to [`crate::store::Registry::create_role`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRole {
  pub name:        String,
  pub slug:        String,
  pub description: String,
}

impl NewRole {
  /// Trim the inputs and derive the slug from `slug` when given, otherwise
  /// from `name`. All three must end up non-empty.
  pub fn from_input(
    name: Option<&str>,
    description: Option<&str>,
    slug: Option<&str>,
  ) -> Result<Self> {
    let name = name.map(str::trim).filter(|s| !s.is_empty());
    let description = description.map(str::trim).filter(|s| !s.is_empty());
    let slug = match slug.filter(|s| !s.trim().is_empty()) {
      Some(explicit) => slugify(explicit),
      None => name.map(slugify).unwrap_or_default(),
    };

    match (name, description) {
      (Some(name), Some(description)) if !slug.is_empty() => Ok(Self {
        name: name.to_owned(),
        slug,
        description: description.to_owned(),
      }),
      _ => Err(Error::MissingField("role fields")),
    }
  }
}

/// Partial update for a role; the slug is immutable once created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RolePatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name:        Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

impl RolePatch {
  pub fn from_input(name: Option<&str>, description: Option<&str>) -> Result<Self> {
    let clean = |v: Option<&str>| {
      v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned)
    };
    let patch = Self { name: clean(name), description: clean(description) };
    if patch.name.is_none() && patch.description.is_none() {
      return Err(Error::MissingField("updates"));
    }
    Ok(patch)
  }
}

// ─── Profiles ────────────────────────────────────────────────────────────────

/// One-to-one companion of an account, carrying its role assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
  pub id:         Uuid,
  pub full_name:  Option<String>,
  pub email:      Option<String>,
  pub role_id:    Option<Uuid>,
  /// Slug of the joined role row, when the link resolves.
  pub role_slug:  Option<String>,
  pub role_name:  Option<String>,
  pub active:     bool,
  pub created_at: Option<DateTime<Utc>>,
}

impl Profile {
  pub fn role_kind(&self) -> Option<RoleKind> {
    self.role_slug.as_deref().map(RoleKind::from_slug)
  }
}

/// Input to [`crate::store::Registry::upsert_profile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
  pub id:        Uuid,
  pub full_name: String,
  pub email:     Option<String>,
  pub role:      Role,
  pub active:    bool,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn slugify_collapses_punctuation_and_spaces() {
    assert_eq!(slugify("Quality Supervisor!!"), "quality-supervisor");
    assert_eq!(slugify("  multiple   spaces  "), "multiple-spaces");
    assert_eq!(slugify("--Jefe de Área--"), "jefe-de-rea");
    assert_eq!(slugify("!!!"), "");
  }

  #[test]
  fn synonyms_fold_to_one_kind() {
    assert_eq!(RoleKind::from_slug("evaluador"), RoleKind::Evaluator);
    assert_eq!(RoleKind::from_slug("evaluator"), RoleKind::Evaluator);
    assert_eq!(RoleKind::from_slug("analista"), RoleKind::Analyst);
    assert_eq!(RoleKind::from_slug("recepcionista"), RoleKind::Reception);
    assert_eq!(RoleKind::from_slug("Admin"), RoleKind::Admin);
    assert_eq!(
      RoleKind::from_slug("quality-supervisor"),
      RoleKind::Custom("quality-supervisor".into())
    );
  }

  #[test]
  fn slugs_lists_every_synonym() {
    let slugs = RoleKind::Analyst.slugs();
    assert!(slugs.contains(&"analista"));
    assert!(slugs.contains(&"analyst"));
    assert_eq!(slugs.len(), 2);
  }

  #[test]
  fn role_in_accepts_legacy_and_current_slugs() {
    let policy = Policy::RoleIn(EVALUATOR_OR_ADMIN);
    for slug in ["evaluador", "evaluator", "admin"] {
      assert!(policy.admits(Some(&RoleKind::from_slug(slug))), "{slug}");
    }
    assert!(!policy.admits(Some(&RoleKind::Analyst)));
    assert!(!policy.admits(None));
  }

  #[test]
  fn admin_only_and_any_authenticated() {
    assert!(Policy::AdminOnly.admits(Some(&RoleKind::Admin)));
    assert!(!Policy::AdminOnly.admits(Some(&RoleKind::Evaluator)));
    assert!(!Policy::AdminOnly.admits(None));
    assert!(Policy::AnyAuthenticated.admits(None));
    assert!(!Policy::AnyAuthenticated.needs_role());
  }

  #[test]
  fn new_role_derives_slug_from_name_or_explicit_slug() {
    let role = NewRole::from_input(Some(" Quality Supervisor "), Some(" QA "), None).unwrap();
    assert_eq!(role.name, "Quality Supervisor");
    assert_eq!(role.slug, "quality-supervisor");
    assert_eq!(role.description, "QA");

    let role = NewRole::from_input(Some("Supervisor"), Some("QA"), Some("QA Lead")).unwrap();
    assert_eq!(role.slug, "qa-lead");

    assert!(NewRole::from_input(Some("Supervisor"), None, None).is_err());
    assert!(NewRole::from_input(Some("!!"), Some("desc"), None).is_err());
  }

  #[test]
  fn role_patch_requires_something_to_change() {
    assert!(RolePatch::from_input(Some("  "), None).is_err());
    let patch = RolePatch::from_input(None, Some(" new text ")).unwrap();
    assert_eq!(patch.description.as_deref(), Some("new text"));
    assert!(patch.name.is_none());
  }
}

//! [`SqliteStore`]: the SQLite implementation of [`Registry`].

use std::{path::Path, time::Duration};

use chrono::Utc;
use rusqlite::{OptionalExtension as _, types::Value as SqlValue};
use uuid::Uuid;

use labguard_core::{
  enrich::ProfileName,
  lifecycle::{SampleChange, SampleUpdate},
  role::{NewProfile, NewRole, Profile, Role, RolePatch},
  sample::{NewSample, RegisteredSample, Sample, sample_code},
  store::{Registry, SampleQuery},
};

use crate::{
  Result,
  encode::{
    PROFILE_COLUMNS, ROLE_COLUMNS, RawProfile, RawRole, RawSample, SAMPLE_COLUMNS, decode_dt,
    encode_date, encode_dt, encode_json, encode_uuid,
  },
  schema::{DEFAULT_ROLES, SCHEMA},
};

/// Issuer stamped into tokens when none is configured.
pub const DEFAULT_ISSUER: &str = "labguard";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A LabGuard registry and identity service backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn:        tokio_rusqlite::Connection,
  pub(crate) issuer:      String,
  pub(crate) session_ttl: Duration,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  /// Issuer claim written into, and required of, session tokens.
  pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
    self.issuer = issuer.into();
    self
  }

  pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
    self.session_ttl = ttl;
    self
  }

  pub fn issuer(&self) -> &str { &self.issuer }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let store = Self {
      conn,
      issuer: DEFAULT_ISSUER.to_owned(),
      session_ttl: Duration::from_secs(3600),
    };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        let tx = conn.transaction()?;
        for (slug, name, description) in DEFAULT_ROLES {
          tx.execute(
            "INSERT OR IGNORE INTO roles (id, name, slug, description) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![encode_uuid(Uuid::new_v4()), name, slug, description],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_profiles(
    &self,
    where_clause: String,
    params: Vec<SqlValue>,
  ) -> Result<Vec<RawProfile>> {
    let raws = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {PROFILE_COLUMNS}
           FROM profiles p
           LEFT JOIN roles r ON r.id = p.role_id
           {where_clause}"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawProfile::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(raws)
  }
}

/// `?, ?, ?` for an `IN (...)` list of `n` values.
fn placeholders(n: usize) -> String { vec!["?"; n].join(", ") }

fn text(s: String) -> SqlValue { SqlValue::Text(s) }

fn opt_text(s: Option<String>) -> SqlValue { s.map_or(SqlValue::Null, SqlValue::Text) }

/// Column assignments for one planned change.
fn assignments(change: SampleChange) -> Vec<(&'static str, SqlValue)> {
  match change {
    SampleChange::Assigned { analyst_id, due_date } => vec![
      ("assigned_analyst_id", text(encode_uuid(analyst_id))),
      ("due_date", text(encode_date(due_date))),
    ],
    SampleChange::AnalysisSubmitted { payload, submitted_at } => vec![
      ("analysis_payload", text(encode_json(&payload))),
      ("analysis_submitted_at", text(encode_dt(submitted_at))),
    ],
    SampleChange::Validated { payload, certification, evaluated_by, submitted_at } => vec![
      ("validation_payload", text(encode_json(&payload))),
      ("validation_submitted_at", text(encode_dt(submitted_at))),
      ("evaluated_by", text(encode_uuid(evaluated_by))),
      ("certification_status", opt_text(certification.map(|c| c.as_str().to_owned()))),
    ],
    SampleChange::Normalized { received_at, .. } => received_at
      .map(|at| ("received_at", text(encode_dt(at))))
      .into_iter()
      .collect(),
  }
}

// ─── Registry impl ───────────────────────────────────────────────────────────

impl Registry for SqliteStore {
  type Error = crate::Error;

  // ── Samples ───────────────────────────────────────────────────────────────

  async fn register_sample(
    &self,
    input: NewSample,
    created_by: Uuid,
  ) -> Result<RegisteredSample> {
    let id  = Uuid::new_v4();
    let now = Utc::now();

    let id_str      = encode_uuid(id);
    let prefix      = format!("{}-{}", input.sample_type.code_prefix(), now.format("%Y%m%d"));
    let kind        = input.sample_type;
    let today       = now.date_naive();
    let type_str    = input.sample_type.to_string();
    let created_str = encode_dt(now);
    let creator_str = encode_uuid(created_by);

    let (status, received_at): (String, Option<String>) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let sequence: u32 = tx.query_row(
          "INSERT INTO sample_sequences (code_prefix, last_value) VALUES (?1, 1)
           ON CONFLICT (code_prefix) DO UPDATE SET last_value = last_value + 1
           RETURNING last_value",
          rusqlite::params![prefix],
          |r| r.get(0),
        )?;
        let code = sample_code(kind, today, sequence);

        // status and received_at are left to the column defaults.
        let row = tx.query_row(
          "INSERT INTO samples (
             id, code, type, origin, transport_condition, storage_condition,
             business_name, phone, address, created_at, created_by
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
           RETURNING status, received_at",
          rusqlite::params![
            id_str,
            code,
            type_str,
            input.origin,
            input.transport_condition,
            input.storage_condition,
            input.business_name,
            input.phone,
            input.address,
            created_str,
            creator_str,
          ],
          |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        tx.commit()?;
        Ok(row)
      })
      .await?;

    tracing::debug!(sample_id = %id, "registered sample");

    Ok(RegisteredSample {
      id,
      status: Some(status),
      received_at: received_at.as_deref().map(decode_dt).transpose()?,
    })
  }

  async fn get_sample(&self, id: Uuid) -> Result<Option<Sample>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSample> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {SAMPLE_COLUMNS} FROM samples WHERE id = ?1"),
            rusqlite::params![id_str],
            RawSample::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSample::into_sample).transpose()
  }

  async fn list_samples(&self, query: &SampleQuery) -> Result<Vec<Sample>> {
    let status = query.status.map(|s| s.as_str().to_owned());
    let limit  = query.limit as i64;

    let raws: Vec<RawSample> = self
      .conn
      .call(move |conn| {
        let where_clause = if status.is_some() { "WHERE status = ?2" } else { "" };
        // Unreceived rows sort first, mirroring NULLS FIRST on a DESC key.
        let sql = format!(
          "SELECT {SAMPLE_COLUMNS} FROM samples
           {where_clause}
           ORDER BY received_at IS NOT NULL, received_at DESC, created_at DESC
           LIMIT ?1"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = match status {
          Some(s) => stmt
            .query_map(rusqlite::params![limit, s], RawSample::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
          None => stmt
            .query_map(rusqlite::params![limit], RawSample::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSample::into_sample).collect()
  }

  async fn apply_update(&self, update: SampleUpdate) -> Result<Option<Sample>> {
    let mut sets = Vec::new();
    if let Some(status) = update.change.new_status() {
      sets.push(("status", text(status.as_str().to_owned())));
    }
    if let Some(actor) = update.updated_by {
      sets.push(("updated_by", text(encode_uuid(actor))));
    }
    sets.extend(assignments(update.change));

    if sets.is_empty() {
      return self.get_sample(update.sample_id).await;
    }

    let mut sql = format!(
      "UPDATE samples SET {} WHERE id = ?",
      sets
        .iter()
        .map(|(col, _)| format!("{col} = ?"))
        .collect::<Vec<_>>()
        .join(", ")
    );
    let mut params: Vec<SqlValue> = sets.into_iter().map(|(_, v)| v).collect();
    params.push(text(encode_uuid(update.sample_id)));
    if let Some(expected) = update.expected_status {
      sql.push_str(" AND status = ?");
      params.push(text(expected.as_str().to_owned()));
    }
    sql.push_str(&format!(" RETURNING {SAMPLE_COLUMNS}"));

    let raw: Option<RawSample> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(&sql, rusqlite::params_from_iter(params), RawSample::from_row)
          .optional()?)
      })
      .await?;

    raw.map(RawSample::into_sample).transpose()
  }

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
    let raws = self
      .query_profiles("WHERE p.id = ?".into(), vec![text(encode_uuid(id))])
      .await?;
    raws.into_iter().next().map(RawProfile::into_profile).transpose()
  }

  async fn list_profiles(&self) -> Result<Vec<Profile>> {
    let raws = self
      .query_profiles("ORDER BY p.created_at DESC".into(), vec![])
      .await?;
    raws.into_iter().map(RawProfile::into_profile).collect()
  }

  async fn profile_names(&self, ids: &[Uuid]) -> Result<Vec<ProfileName>> {
    if ids.is_empty() {
      return Ok(vec![]);
    }
    let params = ids.iter().map(|id| text(encode_uuid(*id))).collect();
    let raws = self
      .query_profiles(format!("WHERE p.id IN ({})", placeholders(ids.len())), params)
      .await?;
    raws.into_iter().map(RawProfile::into_name).collect()
  }

  async fn active_profiles_with_role(&self, slugs: &[&str]) -> Result<Vec<Profile>> {
    if slugs.is_empty() {
      return Ok(vec![]);
    }
    let params = slugs.iter().map(|s| text((*s).to_owned())).collect();
    let raws = self
      .query_profiles(
        format!(
          "WHERE p.active = 1 AND r.slug IN ({})
           ORDER BY p.full_name",
          placeholders(slugs.len())
        ),
        params,
      )
      .await?;
    raws.into_iter().map(RawProfile::into_profile).collect()
  }

  async fn upsert_profile(&self, profile: NewProfile) -> Result<()> {
    let id_str      = encode_uuid(profile.id);
    let role_id_str = encode_uuid(profile.role.id);
    let created_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO profiles (id, full_name, email, role_id, role, active, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
           ON CONFLICT (id) DO UPDATE SET
             full_name = excluded.full_name,
             email     = excluded.email,
             role_id   = excluded.role_id,
             role      = excluded.role,
             active    = excluded.active",
          rusqlite::params![
            id_str,
            profile.full_name,
            profile.email,
            role_id_str,
            profile.role.slug,
            profile.active,
            created_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn set_profile_role(&self, profile_id: Uuid, role: &Role) -> Result<bool> {
    let id_str      = encode_uuid(profile_id);
    let role_id_str = encode_uuid(role.id);
    let slug        = role.slug.clone();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE profiles SET role_id = ?1, role = ?2 WHERE id = ?3",
          rusqlite::params![role_id_str, slug, id_str],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  // ── Roles ─────────────────────────────────────────────────────────────────

  async fn list_roles(&self) -> Result<Vec<Role>> {
    let raws: Vec<RawRole> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!("SELECT {ROLE_COLUMNS} FROM roles ORDER BY name"))?;
        let rows = stmt
          .query_map([], RawRole::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawRole::into_role).collect()
  }

  async fn get_role(&self, id: Uuid) -> Result<Option<Role>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawRole> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = ?1"),
            rusqlite::params![id_str],
            RawRole::from_row,
          )
          .optional()?)
      })
      .await?;
    raw.map(RawRole::into_role).transpose()
  }

  async fn get_role_by_slug(&self, slug: &str) -> Result<Option<Role>> {
    let slug = slug.to_owned();
    let raw: Option<RawRole> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {ROLE_COLUMNS} FROM roles WHERE slug = ?1"),
            rusqlite::params![slug],
            RawRole::from_row,
          )
          .optional()?)
      })
      .await?;
    raw.map(RawRole::into_role).transpose()
  }

  async fn create_role(&self, role: NewRole) -> Result<Role> {
    let created = Role {
      id:          Uuid::new_v4(),
      name:        role.name,
      slug:        role.slug,
      description: Some(role.description),
    };

    let id_str      = encode_uuid(created.id);
    let name        = created.name.clone();
    let slug        = created.slug.clone();
    let description = created.description.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO roles (id, name, slug, description) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, name, slug, description],
        )?;
        Ok(())
      })
      .await?;

    Ok(created)
  }

  async fn update_role(&self, id: Uuid, patch: RolePatch) -> Result<Option<Role>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawRole> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "UPDATE roles SET
                 name        = COALESCE(?1, name),
                 description = COALESCE(?2, description)
               WHERE id = ?3
               RETURNING {ROLE_COLUMNS}"
            ),
            rusqlite::params![patch.name, patch.description, id_str],
            RawRole::from_row,
          )
          .optional()?)
      })
      .await?;
    raw.map(RawRole::into_role).transpose()
  }

  async fn role_in_use(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let used = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT EXISTS (SELECT 1 FROM profiles WHERE role_id = ?1)",
          rusqlite::params![id_str],
          |r| r.get::<_, bool>(0),
        )?)
      })
      .await?;
    Ok(used)
  }

  async fn delete_role(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM roles WHERE id = ?1", rusqlite::params![id_str])?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

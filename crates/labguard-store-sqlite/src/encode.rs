//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings so that text
//! ordering matches time ordering. JSON payloads are stored as compact JSON.
//! UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use labguard_core::{
  enrich::ProfileName,
  role::{Profile, Role},
  sample::{CertificationStatus, Sample, SampleStatus, SampleType},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── NaiveDate ────────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

fn decode_opt_date(s: Option<String>) -> Result<Option<NaiveDate>> {
  s.as_deref()
    .map(|s| {
      NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
    })
    .transpose()
}

// ─── JSON payloads ────────────────────────────────────────────────────────────

pub fn encode_json(v: &serde_json::Value) -> String { v.to_string() }

fn decode_opt_json(s: Option<String>) -> Result<Option<serde_json::Value>> {
  Ok(s.as_deref().map(serde_json::from_str).transpose()?)
}

// ─── Enumerations ─────────────────────────────────────────────────────────────

fn decode_status(s: &str) -> Result<SampleStatus> { Ok(SampleStatus::parse(s)?) }

fn decode_sample_type(s: &str) -> Result<SampleType> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown sample type: {s:?}")))
}

fn decode_certification(s: Option<String>) -> Result<Option<CertificationStatus>> {
  s.map(|s| {
    s.parse()
      .map_err(|_| Error::Decode(format!("unknown certification status: {s:?}")))
  })
  .transpose()
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawSample::from_row`].
pub const SAMPLE_COLUMNS: &str = "
  id, code, type, origin, transport_condition, storage_condition,
  business_name, phone, address, status, received_at, created_at,
  assigned_analyst_id, due_date,
  analysis_payload, analysis_submitted_at,
  validation_payload, validation_submitted_at,
  evaluated_by, created_by, updated_by, certification_status";

/// Raw strings read directly from a `samples` row.
pub struct RawSample {
  pub id:                      String,
  pub code:                    Option<String>,
  pub sample_type:             String,
  pub origin:                  String,
  pub transport_condition:     String,
  pub storage_condition:       String,
  pub business_name:           String,
  pub phone:                   String,
  pub address:                 String,
  pub status:                  String,
  pub received_at:             Option<String>,
  pub created_at:              String,
  pub assigned_analyst_id:     Option<String>,
  pub due_date:                Option<String>,
  pub analysis_payload:        Option<String>,
  pub analysis_submitted_at:   Option<String>,
  pub validation_payload:      Option<String>,
  pub validation_submitted_at: Option<String>,
  pub evaluated_by:            Option<String>,
  pub created_by:              Option<String>,
  pub updated_by:              Option<String>,
  pub certification_status:    Option<String>,
}

impl RawSample {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                      row.get(0)?,
      code:                    row.get(1)?,
      sample_type:             row.get(2)?,
      origin:                  row.get(3)?,
      transport_condition:     row.get(4)?,
      storage_condition:       row.get(5)?,
      business_name:           row.get(6)?,
      phone:                   row.get(7)?,
      address:                 row.get(8)?,
      status:                  row.get(9)?,
      received_at:             row.get(10)?,
      created_at:              row.get(11)?,
      assigned_analyst_id:     row.get(12)?,
      due_date:                row.get(13)?,
      analysis_payload:        row.get(14)?,
      analysis_submitted_at:   row.get(15)?,
      validation_payload:      row.get(16)?,
      validation_submitted_at: row.get(17)?,
      evaluated_by:            row.get(18)?,
      created_by:              row.get(19)?,
      updated_by:              row.get(20)?,
      certification_status:    row.get(21)?,
    })
  }

  pub fn into_sample(self) -> Result<Sample> {
    Ok(Sample {
      id:                      decode_uuid(&self.id)?,
      code:                    self.code,
      sample_type:             decode_sample_type(&self.sample_type)?,
      origin:                  self.origin,
      transport_condition:     self.transport_condition,
      storage_condition:       self.storage_condition,
      business_name:           self.business_name,
      phone:                   self.phone,
      address:                 self.address,
      status:                  decode_status(&self.status)?,
      received_at:             decode_opt_dt(self.received_at)?,
      created_at:              decode_dt(&self.created_at)?,
      assigned_analyst_id:     decode_opt_uuid(self.assigned_analyst_id)?,
      due_date:                decode_opt_date(self.due_date)?,
      analysis_payload:        decode_opt_json(self.analysis_payload)?,
      analysis_submitted_at:   decode_opt_dt(self.analysis_submitted_at)?,
      validation_payload:      decode_opt_json(self.validation_payload)?,
      validation_submitted_at: decode_opt_dt(self.validation_submitted_at)?,
      evaluated_by:            decode_opt_uuid(self.evaluated_by)?,
      created_by:              decode_opt_uuid(self.created_by)?,
      updated_by:              decode_opt_uuid(self.updated_by)?,
      certification_status:    decode_certification(self.certification_status)?,
    })
  }
}

/// Column list matching [`RawProfile::from_row`]; expects `profiles p LEFT
/// JOIN roles r`.
pub const PROFILE_COLUMNS: &str =
  "p.id, p.full_name, p.email, p.role_id, r.slug, r.name, p.active, p.created_at";

/// Raw values read from a `profiles` row joined with its role.
pub struct RawProfile {
  pub id:         String,
  pub full_name:  Option<String>,
  pub email:      Option<String>,
  pub role_id:    Option<String>,
  pub role_slug:  Option<String>,
  pub role_name:  Option<String>,
  pub active:     bool,
  pub created_at: Option<String>,
}

impl RawProfile {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      full_name:  row.get(1)?,
      email:      row.get(2)?,
      role_id:    row.get(3)?,
      role_slug:  row.get(4)?,
      role_name:  row.get(5)?,
      active:     row.get(6)?,
      created_at: row.get(7)?,
    })
  }

  pub fn into_profile(self) -> Result<Profile> {
    Ok(Profile {
      id:         decode_uuid(&self.id)?,
      full_name:  self.full_name,
      email:      self.email,
      role_id:    decode_opt_uuid(self.role_id)?,
      role_slug:  self.role_slug,
      role_name:  self.role_name,
      active:     self.active,
      created_at: decode_opt_dt(self.created_at)?,
    })
  }

  pub fn into_name(self) -> Result<ProfileName> {
    Ok(ProfileName {
      id:        decode_uuid(&self.id)?,
      full_name: self.full_name,
      email:     self.email,
    })
  }
}

pub const ROLE_COLUMNS: &str = "id, name, slug, description";

/// Raw strings read from a `roles` row.
pub struct RawRole {
  pub id:          String,
  pub name:        String,
  pub slug:        String,
  pub description: Option<String>,
}

impl RawRole {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      name:        row.get(1)?,
      slug:        row.get(2)?,
      description: row.get(3)?,
    })
  }

  pub fn into_role(self) -> Result<Role> {
    Ok(Role {
      id:          decode_uuid(&self.id)?,
      name:        self.name,
      slug:        self.slug,
      description: self.description,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamps_sort_as_text() {
    let early = DateTime::parse_from_rfc3339("2026-10-18T09:00:00Z").unwrap().with_timezone(&Utc);
    let late  = DateTime::parse_from_rfc3339("2026-10-18T09:00:00.5Z").unwrap().with_timezone(&Utc);
    assert!(encode_dt(early) < encode_dt(late));
    assert_eq!(decode_dt(&encode_dt(late)).unwrap(), late);
  }
}

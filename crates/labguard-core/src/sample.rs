//! Sample: the specimen tracked from reception to certification.
//!
//! Descriptive fields are written once at registration. Workflow fields are
//! only ever changed through [`crate::lifecycle`] transitions.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Sample type ─────────────────────────────────────────────────────────────

/// The closed set of sample types accepted at reception.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
pub enum SampleType {
  #[serde(rename = "Agua")]
  #[strum(serialize = "Agua")]
  Water,
  #[serde(rename = "Alimento")]
  #[strum(serialize = "Alimento")]
  Food,
  #[serde(rename = "Bebida alcoholica")]
  #[strum(serialize = "Bebida alcoholica")]
  AlcoholicBeverage,
}

impl SampleType {
  /// Three-letter prefix used when generating sample codes.
  pub fn code_prefix(self) -> &'static str {
    match self {
      Self::Water => "AGU",
      Self::Food => "ALI",
      Self::AlcoholicBeverage => "BEB",
    }
  }
}

/// Human-readable sample code: `<prefix>-<YYYYMMDD>-<sequence>`.
pub fn sample_code(kind: SampleType, date: NaiveDate, sequence: u32) -> String {
  format!("{}-{}-{sequence:04}", kind.code_prefix(), date.format("%Y%m%d"))
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Where a sample sits in the reception → certification workflow.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SampleStatus {
  /// Registered by reception, waiting for an evaluator to assign it.
  PorAsignar,
  /// Assigned to an analyst with a due date.
  EsperandoAnalisis,
  /// Analysis submitted, waiting for evaluator validation.
  PendienteValidacion,
  /// Validated; terminal.
  Evaluada,
}

impl SampleStatus {
  pub fn as_str(self) -> &'static str { self.into() }

  pub fn parse(s: &str) -> Result<Self> {
    s.parse().map_err(|_| Error::UnknownStatus(s.to_owned()))
  }

  pub fn is_terminal(self) -> bool { matches!(self, Self::Evaluada) }
}

// ─── Certification ───────────────────────────────────────────────────────────

/// Outcome recorded by the evaluator at validation time.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum CertificationStatus {
  /// Accepted.
  Recibida,
  /// Rejected.
  Rechazada,
}

impl CertificationStatus {
  pub fn as_str(self) -> &'static str { self.into() }

  /// Parse an optional request value; blank input means "no outcome".
  pub fn parse_optional(value: Option<&str>) -> Result<Option<Self>> {
    match value.map(str::trim) {
      None | Some("") => Ok(None),
      Some(s) => s
        .parse()
        .map(Some)
        .map_err(|_| Error::UnknownCertification(s.to_owned())),
    }
  }
}

// ─── Sample ──────────────────────────────────────────────────────────────────

/// A sample row as stored by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
  pub id:                      Uuid,
  pub code:                    Option<String>,
  #[serde(rename = "type")]
  pub sample_type:             SampleType,
  pub origin:                  String,
  pub transport_condition:     String,
  pub storage_condition:       String,
  pub business_name:           String,
  pub phone:                   String,
  pub address:                 String,
  pub status:                  SampleStatus,
  pub received_at:             Option<DateTime<Utc>>,
  pub created_at:              DateTime<Utc>,
  pub assigned_analyst_id:     Option<Uuid>,
  #[serde(default, deserialize_with = "deserialize_due_date")]
  pub due_date:                Option<NaiveDate>,
  pub analysis_payload:        Option<serde_json::Value>,
  pub analysis_submitted_at:   Option<DateTime<Utc>>,
  pub validation_payload:      Option<serde_json::Value>,
  pub validation_submitted_at: Option<DateTime<Utc>>,
  pub evaluated_by:            Option<Uuid>,
  pub created_by:              Option<Uuid>,
  /// Last account to move the sample through a transition.
  #[serde(default)]
  pub updated_by:              Option<Uuid>,
  pub certification_status:    Option<CertificationStatus>,
}

// ─── Registration input ──────────────────────────────────────────────────────

/// The seven descriptive fields captured at reception.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewSample {
  #[serde(rename = "type")]
  pub sample_type:         SampleType,
  pub origin:              String,
  pub transport_condition: String,
  pub storage_condition:   String,
  pub business_name:       String,
  pub phone:               String,
  pub address:             String,
}

/// Raw reception form; every field is optional until validated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SampleForm {
  #[serde(rename = "type")]
  pub sample_type:         Option<String>,
  pub origin:              Option<String>,
  pub transport_condition: Option<String>,
  pub storage_condition:   Option<String>,
  pub business_name:       Option<String>,
  pub phone:               Option<String>,
  pub address:             Option<String>,
}

impl TryFrom<SampleForm> for NewSample {
  type Error = Error;

  fn try_from(form: SampleForm) -> Result<Self> {
    fn required(value: Option<String>) -> Result<String> {
      value
        .filter(|v| !v.trim().is_empty())
        .ok_or(Error::MissingField("required fields"))
    }

    let sample_type         = required(form.sample_type)?;
    let origin              = required(form.origin)?;
    let transport_condition = required(form.transport_condition)?;
    let storage_condition   = required(form.storage_condition)?;
    let business_name       = required(form.business_name)?;
    let phone               = required(form.phone)?;
    let address             = required(form.address)?;

    let sample_type = sample_type
      .trim()
      .parse::<SampleType>()
      .map_err(|_| Error::UnknownSampleType(sample_type.clone()))?;

    Ok(NewSample {
      sample_type,
      origin,
      transport_condition,
      storage_condition,
      business_name,
      phone,
      address,
    })
  }
}

/// What the registry's registration procedure hands back. The procedure's
/// defaults are not trusted; see [`crate::lifecycle::registration_fix`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredSample {
  pub id:          Uuid,
  /// Status string exactly as the procedure returned it.
  pub status:      Option<String>,
  pub received_at: Option<DateTime<Utc>>,
}

// ─── Due dates ───────────────────────────────────────────────────────────────

/// Parse a due date given either as `YYYY-MM-DD` or as an RFC 3339 timestamp.
pub fn parse_due_date(s: &str) -> Option<NaiveDate> {
  let s = s.trim();
  NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().or_else(|| {
    DateTime::parse_from_rfc3339(s)
      .ok()
      .map(|dt| dt.with_timezone(&Utc).date_naive())
  })
}

fn deserialize_due_date<'de, D>(
  deserializer: D,
) -> std::result::Result<Option<NaiveDate>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw = Option::<String>::deserialize(deserializer)?;
  match raw {
    None => Ok(None),
    Some(s) => parse_due_date(&s)
      .map(Some)
      .ok_or_else(|| serde::de::Error::custom(format!("invalid due date: {s:?}"))),
  }
}

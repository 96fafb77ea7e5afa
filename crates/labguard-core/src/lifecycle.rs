//! The sample status state machine.
//!
//! ```text
//! por_asignar ──assign──▶ esperando_analisis ──analysis──▶ pendiente_validacion ──validate──▶ evaluada
//! ```
//!
//! Every transition is planned here into a [`SampleUpdate`]: one write keyed
//! by sample id *and* the status the transition starts from. A registry must
//! apply it as a single conditional update, so two racing transitions cannot
//! both succeed.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::{
  Error, Result,
  sample::{CertificationStatus, SampleStatus, parse_due_date},
};

// ─── Transitions ─────────────────────────────────────────────────────────────

/// A role action that advances a sample one step.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
  Assign {
    analyst_id: Uuid,
    due_date:   NaiveDate,
  },
  SubmitAnalysis {
    payload: Value,
  },
  Validate {
    payload:       Value,
    certification: Option<CertificationStatus>,
  },
}

/// JSON payloads count as absent when null or an empty string.
fn present(payload: Option<Value>) -> Option<Value> {
  payload.filter(|v| match v {
    Value::Null => false,
    Value::String(s) => !s.is_empty(),
    _ => true,
  })
}

impl Transition {
  /// Build an assignment; both inputs are required. The due date may be a
  /// plain date or a timestamp.
  pub fn assign(analyst_id: Option<Uuid>, due_date: Option<&str>) -> Result<Self> {
    let missing = || Error::MissingField("analyst_id or due_date");
    let analyst_id = analyst_id.ok_or_else(missing)?;
    let due_date = due_date
      .filter(|d| !d.trim().is_empty())
      .ok_or_else(missing)?;
    let due_date = parse_due_date(due_date).ok_or(Error::MissingField("valid due_date"))?;
    Ok(Self::Assign { analyst_id, due_date })
  }

  pub fn submit_analysis(payload: Option<Value>) -> Result<Self> {
    let payload = present(payload).ok_or(Error::MissingField("analysis_payload"))?;
    Ok(Self::SubmitAnalysis { payload })
  }

  pub fn validate(
    payload: Option<Value>,
    certification: Option<&str>,
  ) -> Result<Self> {
    let payload = present(payload).ok_or(Error::MissingField("validation_payload"))?;
    let certification = CertificationStatus::parse_optional(certification)?;
    Ok(Self::Validate { payload, certification })
  }

  /// Verb used in error messages and logs.
  pub fn action(&self) -> &'static str {
    match self {
      Self::Assign { .. } => "assign",
      Self::SubmitAnalysis { .. } => "submit analysis for",
      Self::Validate { .. } => "validate",
    }
  }

  /// The only status this transition may start from.
  pub fn from_status(&self) -> SampleStatus {
    match self {
      Self::Assign { .. } => SampleStatus::PorAsignar,
      Self::SubmitAnalysis { .. } => SampleStatus::EsperandoAnalisis,
      Self::Validate { .. } => SampleStatus::PendienteValidacion,
    }
  }

  pub fn to_status(&self) -> SampleStatus {
    match self {
      Self::Assign { .. } => SampleStatus::EsperandoAnalisis,
      Self::SubmitAnalysis { .. } => SampleStatus::PendienteValidacion,
      Self::Validate { .. } => SampleStatus::Evaluada,
    }
  }

  /// Check legality against `current` and produce the guarded write.
  pub fn plan(
    self,
    sample_id: Uuid,
    current: SampleStatus,
    actor: Uuid,
    now: DateTime<Utc>,
  ) -> Result<SampleUpdate> {
    let from = self.from_status();
    if current != from {
      return Err(Error::IllegalTransition { action: self.action(), status: current });
    }

    let change = match self {
      Self::Assign { analyst_id, due_date } => SampleChange::Assigned { analyst_id, due_date },
      Self::SubmitAnalysis { payload } => SampleChange::AnalysisSubmitted {
        payload,
        submitted_at: now,
      },
      Self::Validate { payload, certification } => SampleChange::Validated {
        payload,
        certification,
        evaluated_by: actor,
        submitted_at: now,
      },
    };

    Ok(SampleUpdate {
      sample_id,
      expected_status: Some(from),
      change,
      updated_by: Some(actor),
    })
  }
}

// ─── Planned writes ──────────────────────────────────────────────────────────

/// The columns a single update touches.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleChange {
  Assigned {
    analyst_id: Uuid,
    due_date:   NaiveDate,
  },
  AnalysisSubmitted {
    payload:      Value,
    submitted_at: DateTime<Utc>,
  },
  Validated {
    payload:       Value,
    /// Written even when `None`, clearing any earlier value.
    certification: Option<CertificationStatus>,
    evaluated_by:  Uuid,
    submitted_at:  DateTime<Utc>,
  },
  /// Post-registration correction of the procedure's defaults.
  Normalized {
    status:      Option<SampleStatus>,
    received_at: Option<DateTime<Utc>>,
  },
}

impl SampleChange {
  /// Status written by this change, if any.
  pub fn new_status(&self) -> Option<SampleStatus> {
    match self {
      Self::Assigned { .. } => Some(SampleStatus::EsperandoAnalisis),
      Self::AnalysisSubmitted { .. } => Some(SampleStatus::PendienteValidacion),
      Self::Validated { .. } => Some(SampleStatus::Evaluada),
      Self::Normalized { status, .. } => *status,
    }
  }
}

/// A single-row write. When `expected_status` is set the registry must only
/// apply it if the row's status still equals that value.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleUpdate {
  pub sample_id:       Uuid,
  pub expected_status: Option<SampleStatus>,
  pub change:          SampleChange,
  pub updated_by:      Option<Uuid>,
}

// ─── Registration ────────────────────────────────────────────────────────────

/// The correction needed after the registration procedure returned
/// `status`/`received_at`, or `None` if the row already satisfies the
/// initial-state invariant.
pub fn registration_fix(
  sample_id: Uuid,
  status: Option<&str>,
  received_at: Option<DateTime<Utc>>,
  now: DateTime<Utc>,
) -> Option<SampleUpdate> {
  let initial = SampleStatus::PorAsignar;
  let status = (status != Some(initial.as_str())).then_some(initial);
  let received_at = received_at.is_none().then_some(now);

  if status.is_none() && received_at.is_none() {
    return None;
  }

  Some(SampleUpdate {
    sample_id,
    expected_status: None,
    change: SampleChange::Normalized { status, received_at },
    updated_by: None,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn ids() -> (Uuid, Uuid) { (Uuid::new_v4(), Uuid::new_v4()) }

  #[test]
  fn assign_requires_both_fields() {
    assert!(matches!(
      Transition::assign(None, Some("2026-11-01")),
      Err(Error::MissingField(_))
    ));
    assert!(Transition::assign(Some(Uuid::new_v4()), None).is_err());
    assert!(Transition::assign(Some(Uuid::new_v4()), Some("")).is_err());
    assert!(Transition::assign(Some(Uuid::new_v4()), Some("soon")).is_err());
  }

  #[test]
  fn assign_plans_guarded_update() {
    let (sample, actor) = ids();
    let analyst = Uuid::new_v4();
    let now = Utc::now();
    let update = Transition::assign(Some(analyst), Some("2026-11-01"))
      .unwrap()
      .plan(sample, SampleStatus::PorAsignar, actor, now)
      .unwrap();

    assert_eq!(update.sample_id, sample);
    assert_eq!(update.expected_status, Some(SampleStatus::PorAsignar));
    assert_eq!(update.updated_by, Some(actor));
    assert_eq!(update.change.new_status(), Some(SampleStatus::EsperandoAnalisis));
    assert_eq!(
      update.change,
      SampleChange::Assigned {
        analyst_id: analyst,
        due_date:   NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
      }
    );
  }

  #[test]
  fn transitions_cannot_run_out_of_order() {
    let (sample, actor) = ids();
    let now = Utc::now();

    let analysis = Transition::submit_analysis(Some(json!({ "color": "clear" }))).unwrap();
    let err = analysis
      .plan(sample, SampleStatus::PorAsignar, actor, now)
      .unwrap_err();
    assert!(matches!(
      err,
      Error::IllegalTransition { status: SampleStatus::PorAsignar, .. }
    ));

    let assign = Transition::assign(Some(Uuid::new_v4()), Some("2026-11-01")).unwrap();
    assert!(assign.plan(sample, SampleStatus::Evaluada, actor, now).is_err());

    let validate = Transition::validate(Some(json!({ "results": [] })), None).unwrap();
    assert!(validate.plan(sample, SampleStatus::EsperandoAnalisis, actor, now).is_err());
  }

  #[test]
  fn analysis_stamps_submission_time() {
    let (sample, actor) = ids();
    let now = Utc::now();
    let update = Transition::submit_analysis(Some(json!({ "ph": 7 })))
      .unwrap()
      .plan(sample, SampleStatus::EsperandoAnalisis, actor, now)
      .unwrap();
    match update.change {
      SampleChange::AnalysisSubmitted { submitted_at, payload } => {
        assert_eq!(submitted_at, now);
        assert_eq!(payload, json!({ "ph": 7 }));
      }
      other => panic!("unexpected change {other:?}"),
    }
  }

  #[test]
  fn missing_payloads_are_rejected() {
    assert!(Transition::submit_analysis(None).is_err());
    assert!(Transition::submit_analysis(Some(Value::Null)).is_err());
    assert!(Transition::submit_analysis(Some(json!(""))).is_err());
    assert!(Transition::validate(None, Some("recibida")).is_err());
  }

  #[test]
  fn validate_records_evaluator_and_optional_certification() {
    let (sample, actor) = ids();
    let now = Utc::now();

    let update = Transition::validate(Some(json!({ "results": [] })), Some("rechazada"))
      .unwrap()
      .plan(sample, SampleStatus::PendienteValidacion, actor, now)
      .unwrap();
    assert_eq!(update.change.new_status(), Some(SampleStatus::Evaluada));
    match update.change {
      SampleChange::Validated { evaluated_by, certification, .. } => {
        assert_eq!(evaluated_by, actor);
        assert_eq!(certification, Some(CertificationStatus::Rechazada));
      }
      other => panic!("unexpected change {other:?}"),
    }

    let without = Transition::validate(Some(json!({ "results": [] })), None).unwrap();
    assert!(matches!(without, Transition::Validate { certification: None, .. }));
    assert!(Transition::validate(Some(json!({})), Some("maybe")).is_err());
  }

  #[test]
  fn registration_fix_forces_initial_state() {
    let id  = Uuid::new_v4();
    let now = Utc::now();

    assert_eq!(registration_fix(id, Some("por_asignar"), Some(now), now), None);

    let fix = registration_fix(id, Some("recibida"), Some(now), now).unwrap();
    assert_eq!(fix.expected_status, None);
    assert_eq!(
      fix.change,
      SampleChange::Normalized { status: Some(SampleStatus::PorAsignar), received_at: None }
    );

    let fix = registration_fix(id, Some("por_asignar"), None, now).unwrap();
    assert_eq!(
      fix.change,
      SampleChange::Normalized { status: None, received_at: Some(now) }
    );

    let fix = registration_fix(id, None, None, now).unwrap();
    assert_eq!(
      fix.change,
      SampleChange::Normalized {
        status:      Some(SampleStatus::PorAsignar),
        received_at: Some(now),
      }
    );
  }
}

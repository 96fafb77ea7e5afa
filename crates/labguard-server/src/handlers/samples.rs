//! Handlers for sample endpoints.
//!
//! | Method | Path | Guard |
//! |--------|------|-------|
//! | `GET`  | `/api/samples?status=` | any authenticated |
//! | `POST` | `/api/samples` | any authenticated |
//! | `GET`  | `/api/analysts` | any authenticated |
//! | `POST` | `/api/samples/:id/assign` | evaluator or admin |
//! | `POST` | `/api/samples/:id/analysis` | analyst or admin |
//! | `POST` | `/api/samples/:id/validate` | evaluator or admin |
//! | `GET`  | `/api/samples/:id/pdf` | none |

use axum::{
  extract::{Query, State},
  http::{HeaderValue, header},
  response::{IntoResponse, Response},
};
use chrono::Utc;
use labguard_core::{
  enrich::{EnrichedSample, actor_ids, apply_names, name_map},
  lifecycle::{Transition, registration_fix},
  role::RoleKind,
  sample::{NewSample, Sample, SampleForm, SampleStatus},
  store::{IdentityProvider, Registry, SampleQuery},
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
  AppState,
  auth::{AnalystOrAdmin, Authenticated, Caller, EvaluatorOrAdmin},
  certificate,
  error::ApiError,
  extract::{Json, Path},
};

fn sample_not_found() -> ApiError { ApiError::NotFound("Sample not found.".into()) }

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub status: Option<String>,
}

/// Attach display names for every actor the rows reference. A failed lookup
/// leaves the rows as they are.
pub async fn enrich<R>(registry: &R, rows: &mut [EnrichedSample])
where
  R: Registry,
{
  let ids = actor_ids(rows);
  if ids.is_empty() {
    return;
  }
  match registry.profile_names(&ids).await {
    Ok(profiles) => apply_names(rows, &name_map(&profiles)),
    Err(e) => tracing::warn!(error = %e, ids = ids.len(), "profile lookup for sample names failed"),
  }
}

/// `GET /api/samples[?status=<status>]`
pub async fn list<R, I>(
  State(state): State<AppState<R, I>>,
  _caller: Authenticated,
  Query(params): Query<ListParams>,
) -> Result<Json<Value>, ApiError>
where
  R: Registry + Clone + 'static,
  I: IdentityProvider + Clone + 'static,
{
  let status = match params.status.as_deref().map(str::trim) {
    None | Some("") => None,
    Some(s) => Some(SampleStatus::parse(s)?),
  };
  let query = SampleQuery { status, ..SampleQuery::default() };

  let samples = state
    .registry
    .list_samples(&query)
    .await
    .map_err(ApiError::upstream)?;

  let mut rows: Vec<EnrichedSample> = samples.into_iter().map(EnrichedSample::from).collect();
  enrich(state.registry.as_ref(), &mut rows).await;

  Ok(Json(json!({ "data": rows })))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /api/samples` with the seven reception fields.
pub async fn create<R, I>(
  State(state): State<AppState<R, I>>,
  caller: Authenticated,
  Json(form): Json<SampleForm>,
) -> Result<Json<Value>, ApiError>
where
  R: Registry + Clone + 'static,
  I: IdentityProvider + Clone + 'static,
{
  let input = NewSample::try_from(form)?;
  let registry = state.registry.as_ref();

  let registered = registry
    .register_sample(input, caller.id())
    .await
    .map_err(|e| {
      tracing::error!(user = %caller.id(), error = %e, "register_sample failed");
      ApiError::upstream(e)
    })?;

  let fix = registration_fix(
    registered.id,
    registered.status.as_deref(),
    registered.received_at,
    Utc::now(),
  );

  if let Some(fix) = fix {
    match registry.apply_update(fix).await {
      Ok(Some(sample)) => return Ok(Json(json!({ "data": sample }))),
      Ok(None) => tracing::warn!(sample_id = %registered.id, "registered sample vanished before normalisation"),
      Err(e) => tracing::warn!(sample_id = %registered.id, error = %e, "sample normalisation failed"),
    }
  }

  let sample = registry
    .get_sample(registered.id)
    .await
    .map_err(ApiError::upstream)?
    .ok_or_else(sample_not_found)?;
  Ok(Json(json!({ "data": sample })))
}

// ─── Analysts ─────────────────────────────────────────────────────────────────

/// `GET /api/analysts`: active profiles with an analyst role, by name.
pub async fn analysts<R, I>(
  State(state): State<AppState<R, I>>,
  _caller: Authenticated,
) -> Result<Json<Value>, ApiError>
where
  R: Registry + Clone + 'static,
  I: IdentityProvider + Clone + 'static,
{
  let kind = RoleKind::Analyst;
  let profiles = state
    .registry
    .active_profiles_with_role(&kind.slugs())
    .await
    .map_err(|e| {
      tracing::error!(error = %e, "list analysts failed");
      ApiError::upstream(e)
    })?;
  Ok(Json(json!({ "data": profiles })))
}

// ─── Transitions ──────────────────────────────────────────────────────────────

/// Load, check and apply one lifecycle transition.
async fn advance<R>(
  registry: &R,
  caller: &Caller,
  id: Uuid,
  transition: Transition,
) -> Result<Json<Value>, ApiError>
where
  R: Registry,
{
  let action = transition.action();
  let sample = registry
    .get_sample(id)
    .await
    .map_err(ApiError::upstream)?
    .ok_or_else(sample_not_found)?;

  let update = transition.plan(id, sample.status, caller.id(), Utc::now())?;
  let from = update.expected_status;

  match registry.apply_update(update).await {
    Ok(Some(updated)) => {
      tracing::info!(sample_id = %id, actor = %caller.id(), status = %updated.status, "sample advanced");
      Ok(Json(json!({ "data": updated })))
    }
    Ok(None) => {
      tracing::info!(sample_id = %id, action, expected = ?from, "transition lost a race");
      Err(ApiError::Conflict("Sample status changed; reload and try again.".into()))
    }
    Err(e) => {
      tracing::error!(sample_id = %id, action, error = %e, "sample transition failed");
      Err(ApiError::upstream(e))
    }
  }
}

#[derive(Debug, Default, Deserialize)]
pub struct AssignBody {
  pub analyst_id: Option<String>,
  pub due_date:   Option<String>,
}

/// `POST /api/samples/:id/assign`
pub async fn assign<R, I>(
  State(state): State<AppState<R, I>>,
  caller: EvaluatorOrAdmin,
  Path(id): Path<Uuid>,
  Json(body): Json<AssignBody>,
) -> Result<Json<Value>, ApiError>
where
  R: Registry + Clone + 'static,
  I: IdentityProvider + Clone + 'static,
{
  let analyst_id = match body.analyst_id.as_deref().map(str::trim) {
    None | Some("") => None,
    Some(raw) => Some(
      Uuid::parse_str(raw).map_err(|_| ApiError::InvalidInput("Invalid analyst_id.".into()))?,
    ),
  };
  let transition = Transition::assign(analyst_id, body.due_date.as_deref())?;
  advance(state.registry.as_ref(), &caller, id, transition).await
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalysisBody {
  pub analysis_payload: Option<Value>,
}

/// `POST /api/samples/:id/analysis`
pub async fn analysis<R, I>(
  State(state): State<AppState<R, I>>,
  caller: AnalystOrAdmin,
  Path(id): Path<Uuid>,
  Json(body): Json<AnalysisBody>,
) -> Result<Json<Value>, ApiError>
where
  R: Registry + Clone + 'static,
  I: IdentityProvider + Clone + 'static,
{
  let transition = Transition::submit_analysis(body.analysis_payload)?;
  advance(state.registry.as_ref(), &caller, id, transition).await
}

#[derive(Debug, Default, Deserialize)]
pub struct ValidateBody {
  pub validation_payload:   Option<Value>,
  pub certification_status: Option<String>,
}

/// `POST /api/samples/:id/validate`
pub async fn validate<R, I>(
  State(state): State<AppState<R, I>>,
  caller: EvaluatorOrAdmin,
  Path(id): Path<Uuid>,
  Json(body): Json<ValidateBody>,
) -> Result<Json<Value>, ApiError>
where
  R: Registry + Clone + 'static,
  I: IdentityProvider + Clone + 'static,
{
  let transition =
    Transition::validate(body.validation_payload, body.certification_status.as_deref())?;
  advance(state.registry.as_ref(), &caller, id, transition).await
}

// ─── Certificate ──────────────────────────────────────────────────────────────

/// `GET /api/samples/:id/pdf`. Public, and rendered whatever the outcome.
pub async fn certificate<R, I>(
  State(state): State<AppState<R, I>>,
  Path(id): Path<Uuid>,
) -> Result<Response, ApiError>
where
  R: Registry + Clone + 'static,
  I: IdentityProvider + Clone + 'static,
{
  let sample: Sample = state
    .registry
    .get_sample(id)
    .await
    .map_err(|e| {
      tracing::warn!(sample_id = %id, error = %e, "certificate lookup failed");
      sample_not_found()
    })?
    .ok_or_else(sample_not_found)?;

  let pdf = certificate::render(&sample);
  let filename = format!("{}.pdf", sample.code.as_deref().unwrap_or("certificado"));
  let disposition = HeaderValue::from_str(&format!("inline; filename=\"{filename}\""))
    .unwrap_or_else(|_| HeaderValue::from_static("inline; filename=\"certificado.pdf\""));

  Ok(
    (
      [
        (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
        (header::CONTENT_DISPOSITION, disposition),
      ],
      pdf,
    )
      .into_response(),
  )
}

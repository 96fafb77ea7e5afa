//! [`Registry`] over PostgREST, using the service tier.

use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use uuid::Uuid;

use labguard_core::{
  enrich::ProfileName,
  lifecycle::{SampleChange, SampleUpdate},
  role::{NewProfile, NewRole, Profile, Role, RolePatch},
  sample::{NewSample, RegisteredSample, Sample},
  store::{Registry, SampleQuery},
};

use crate::{
  Error, Result, SupabaseBackend,
  client::{send_empty, send_json},
};

/// Columns read for every sample.
const SAMPLE_SELECT: &str = "id,code,type,origin,transport_condition,\
  storage_condition,business_name,phone,address,status,received_at,created_at,\
  assigned_analyst_id,due_date,analysis_payload,analysis_submitted_at,\
  validation_payload,validation_submitted_at,evaluated_by,created_by,updated_by,\
  certification_status";

const PROFILE_SELECT: &str = "id,full_name,email,role_id,active,created_at,roles(slug,name)";

const ROLE_SELECT: &str = "id,name,slug,description";

// ─── Filters ─────────────────────────────────────────────────────────────────

fn eq(value: impl std::fmt::Display) -> String { format!("eq.{value}") }

/// `in.(a,b,c)`; values are double-quoted so commas inside them survive.
fn in_list<I, T>(values: I) -> String
where
  I: IntoIterator<Item = T>,
  T: std::fmt::Display,
{
  let quoted: Vec<String> = values
    .into_iter()
    .map(|v| format!("\"{}\"", v.to_string().replace('"', "\\\"")))
    .collect();
  format!("in.({})", quoted.join(","))
}

// ─── Row shapes ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RoleRef {
  slug: Option<String>,
  name: Option<String>,
}

/// A profile row with its embedded role.
#[derive(Debug, Deserialize)]
struct ProfileRow {
  id:         Uuid,
  full_name:  Option<String>,
  email:      Option<String>,
  role_id:    Option<Uuid>,
  #[serde(default = "active_default")]
  active:     bool,
  created_at: Option<DateTime<Utc>>,
  roles:      Option<RoleRef>,
}

fn active_default() -> bool { true }

impl From<ProfileRow> for Profile {
  fn from(row: ProfileRow) -> Self {
    let (role_slug, role_name) = row
      .roles
      .map(|r| (r.slug, r.name))
      .unwrap_or_default();
    Profile {
      id: row.id,
      full_name: row.full_name,
      email: row.email,
      role_id: row.role_id,
      role_slug,
      role_name,
      active: row.active,
      created_at: row.created_at,
    }
  }
}

#[derive(Debug, Deserialize)]
struct RegisteredRow {
  id:          Uuid,
  status:      Option<String>,
  received_at: Option<DateTime<Utc>>,
}

/// The registration procedure may return a single row or a one-row set.
fn registered_row(data: Value) -> Result<RegisteredSample> {
  let row = match data {
    Value::Array(mut rows) if !rows.is_empty() => rows.swap_remove(0),
    Value::Array(_) | Value::Null => {
      return Err(Error::Decode("register_sample returned no row".into()));
    }
    other => other,
  };
  let row: RegisteredRow = serde_json::from_value(row)?;
  Ok(RegisteredSample { id: row.id, status: row.status, received_at: row.received_at })
}

/// The procedure takes its arguments flat and `p_`-prefixed.
fn register_args(input: NewSample, created_by: Uuid) -> Value {
  json!({
    "p_type":                input.sample_type,
    "p_origin":              input.origin,
    "p_transport_condition": input.transport_condition,
    "p_storage_condition":   input.storage_condition,
    "p_business_name":       input.business_name,
    "p_phone":               input.phone,
    "p_address":             input.address,
    "p_user_id":             created_by,
  })
}

/// JSON object of the columns an update writes.
fn update_body(update: &SampleUpdate) -> Map<String, Value> {
  let mut body = Map::new();
  if let Some(status) = update.change.new_status() {
    body.insert("status".into(), json!(status));
  }
  if let Some(actor) = update.updated_by {
    body.insert("updated_by".into(), json!(actor));
  }
  match &update.change {
    SampleChange::Assigned { analyst_id, due_date } => {
      body.insert("assigned_analyst_id".into(), json!(analyst_id));
      body.insert("due_date".into(), json!(due_date.format("%Y-%m-%d").to_string()));
    }
    SampleChange::AnalysisSubmitted { payload, submitted_at } => {
      body.insert("analysis_payload".into(), payload.clone());
      body.insert("analysis_submitted_at".into(), json!(submitted_at));
    }
    SampleChange::Validated { payload, certification, evaluated_by, submitted_at } => {
      body.insert("validation_payload".into(), payload.clone());
      body.insert("validation_submitted_at".into(), json!(submitted_at));
      body.insert("evaluated_by".into(), json!(evaluated_by));
      body.insert("certification_status".into(), json!(certification));
    }
    SampleChange::Normalized { received_at, .. } => {
      if let Some(at) = received_at {
        body.insert("received_at".into(), json!(at));
      }
    }
  }
  body
}

// ─── Requests ────────────────────────────────────────────────────────────────

impl SupabaseBackend {
  fn table(&self, method: Method, table: &str) -> RequestBuilder {
    self.service.request(method, &format!("/rest/v1/{table}"))
  }

  fn sample_update_request(&self, update: &SampleUpdate) -> RequestBuilder {
    let mut filters = vec![("id", eq(update.sample_id))];
    if let Some(expected) = update.expected_status {
      filters.push(("status", eq(expected.as_str())));
    }
    self
      .table(Method::PATCH, "samples")
      .query(&filters)
      .query(&[("select", SAMPLE_SELECT)])
      .header("Prefer", "return=representation")
      .json(&update_body(update))
  }

  fn sample_list_request(&self, query: &SampleQuery) -> RequestBuilder {
    let mut req = self.table(Method::GET, "samples").query(&[
      ("select", SAMPLE_SELECT.to_owned()),
      ("order", "received_at.desc.nullsfirst,created_at.desc".to_owned()),
      ("limit", query.limit.to_string()),
    ]);
    if let Some(status) = query.status {
      req = req.query(&[("status", eq(status.as_str()))]);
    }
    req
  }

  async fn profiles(&self, filters: &[(&str, String)]) -> Result<Vec<Profile>> {
    let rows: Vec<ProfileRow> = send_json(
      self
        .table(Method::GET, "profiles")
        .query(&[("select", PROFILE_SELECT)])
        .query(filters),
    )
    .await?;
    Ok(rows.into_iter().map(Profile::from).collect())
  }

  async fn one_role(&self, column: &str, value: String) -> Result<Option<Role>> {
    let rows: Vec<Role> = send_json(
      self
        .table(Method::GET, "roles")
        .query(&[("select", ROLE_SELECT.to_owned()), (column, eq(value))]),
    )
    .await?;
    Ok(rows.into_iter().next())
  }
}

// ─── Registry impl ───────────────────────────────────────────────────────────

impl Registry for SupabaseBackend {
  type Error = Error;

  // ── Samples ───────────────────────────────────────────────────────────────

  async fn register_sample(
    &self,
    input: NewSample,
    created_by: Uuid,
  ) -> Result<RegisteredSample> {
    let data: Value = send_json(
      self
        .service
        .request(Method::POST, "/rest/v1/rpc/register_sample")
        .json(&register_args(input, created_by)),
    )
    .await?;
    registered_row(data)
  }

  async fn get_sample(&self, id: Uuid) -> Result<Option<Sample>> {
    let rows: Vec<Sample> = send_json(
      self
        .table(Method::GET, "samples")
        .query(&[("select", SAMPLE_SELECT.to_owned()), ("id", eq(id))]),
    )
    .await?;
    Ok(rows.into_iter().next())
  }

  async fn list_samples(&self, query: &SampleQuery) -> Result<Vec<Sample>> {
    send_json(self.sample_list_request(query)).await
  }

  async fn apply_update(&self, update: SampleUpdate) -> Result<Option<Sample>> {
    let rows: Vec<Sample> = send_json(self.sample_update_request(&update)).await?;
    Ok(rows.into_iter().next())
  }

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
    Ok(self.profiles(&[("id", eq(id))]).await?.into_iter().next())
  }

  async fn list_profiles(&self) -> Result<Vec<Profile>> {
    self
      .profiles(&[("order", "created_at.desc".to_owned())])
      .await
  }

  async fn profile_names(&self, ids: &[Uuid]) -> Result<Vec<ProfileName>> {
    if ids.is_empty() {
      return Ok(vec![]);
    }
    send_json(
      self
        .table(Method::GET, "profiles")
        .query(&[("select", "id,full_name,email".to_owned()), ("id", in_list(ids))]),
    )
    .await
  }

  async fn active_profiles_with_role(&self, slugs: &[&str]) -> Result<Vec<Profile>> {
    if slugs.is_empty() {
      return Ok(vec![]);
    }
    let rows: Vec<ProfileRow> = send_json(
      self.table(Method::GET, "profiles").query(&[
        ("select", "id,full_name,email,role_id,active,created_at,roles!inner(slug,name)".to_owned()),
        ("roles.slug", in_list(slugs)),
        ("active", "is.true".to_owned()),
        ("order", "full_name.asc".to_owned()),
      ]),
    )
    .await?;
    Ok(rows.into_iter().map(Profile::from).collect())
  }

  async fn upsert_profile(&self, profile: NewProfile) -> Result<()> {
    send_empty(
      self
        .table(Method::POST, "profiles")
        .header("Prefer", "resolution=merge-duplicates,return=minimal")
        .json(&json!({
          "id":        profile.id,
          "full_name": profile.full_name,
          "email":     profile.email,
          "role_id":   profile.role.id,
          "role":      profile.role.slug,
          "active":    profile.active,
        })),
    )
    .await
  }

  async fn set_profile_role(&self, profile_id: Uuid, role: &Role) -> Result<bool> {
    let rows: Vec<Value> = send_json(
      self
        .table(Method::PATCH, "profiles")
        .query(&[("id", eq(profile_id)), ("select", "id".to_owned())])
        .header("Prefer", "return=representation")
        .json(&json!({ "role_id": role.id, "role": role.slug })),
    )
    .await?;
    Ok(!rows.is_empty())
  }

  // ── Roles ─────────────────────────────────────────────────────────────────

  async fn list_roles(&self) -> Result<Vec<Role>> {
    send_json(
      self
        .table(Method::GET, "roles")
        .query(&[("select", ROLE_SELECT), ("order", "name.asc")]),
    )
    .await
  }

  async fn get_role(&self, id: Uuid) -> Result<Option<Role>> {
    self.one_role("id", id.to_string()).await
  }

  async fn get_role_by_slug(&self, slug: &str) -> Result<Option<Role>> {
    self.one_role("slug", slug.to_owned()).await
  }

  async fn create_role(&self, role: NewRole) -> Result<Role> {
    let rows: Vec<Role> = send_json(
      self
        .table(Method::POST, "roles")
        .query(&[("select", ROLE_SELECT)])
        .header("Prefer", "return=representation")
        .json(&role),
    )
    .await?;
    rows
      .into_iter()
      .next()
      .ok_or_else(|| Error::Decode("role insert returned no row".into()))
  }

  async fn update_role(&self, id: Uuid, patch: RolePatch) -> Result<Option<Role>> {
    let rows: Vec<Role> = send_json(
      self
        .table(Method::PATCH, "roles")
        .query(&[("id", eq(id)), ("select", ROLE_SELECT.to_owned())])
        .header("Prefer", "return=representation")
        .json(&patch),
    )
    .await?;
    Ok(rows.into_iter().next())
  }

  async fn role_in_use(&self, id: Uuid) -> Result<bool> {
    let rows: Vec<Value> = send_json(self.table(Method::GET, "profiles").query(&[
      ("select", "id".to_owned()),
      ("role_id", eq(id)),
      ("limit", "1".to_owned()),
    ]))
    .await?;
    Ok(!rows.is_empty())
  }

  async fn delete_role(&self, id: Uuid) -> Result<()> {
    send_empty(self.table(Method::DELETE, "roles").query(&[("id", eq(id))])).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::NaiveDate;
  use labguard_core::sample::{CertificationStatus, SampleStatus, SampleType};

  use crate::SupabaseConfig;

  fn backend() -> SupabaseBackend {
    SupabaseBackend::new(&SupabaseConfig {
      url:              "https://lab.supabase.co".into(),
      anon_key:         "anon".into(),
      service_role_key: "service".into(),
    })
    .unwrap()
  }

  fn query_pairs(req: &reqwest::Request) -> Vec<(String, String)> {
    req.url().query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect()
  }

  #[test]
  fn in_list_quotes_values() {
    assert_eq!(in_list(["analista", "analyst"]), r#"in.("analista","analyst")"#);
  }

  #[test]
  fn guarded_update_filters_on_id_and_status() {
    let id = Uuid::new_v4();
    let actor = Uuid::new_v4();
    let update = SampleUpdate {
      sample_id:       id,
      expected_status: Some(SampleStatus::PorAsignar),
      change:          SampleChange::Assigned {
        analyst_id: actor,
        due_date:   NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
      },
      updated_by:      Some(actor),
    };
    let req = backend().sample_update_request(&update).build().unwrap();

    assert_eq!(req.method(), Method::PATCH);
    assert_eq!(req.url().path(), "/rest/v1/samples");
    let pairs = query_pairs(&req);
    assert!(pairs.contains(&("id".into(), format!("eq.{id}"))));
    assert!(pairs.contains(&("status".into(), "eq.por_asignar".into())));
    assert_eq!(req.headers()["prefer"], "return=representation");

    let body: Value = serde_json::from_slice(req.body().unwrap().as_bytes().unwrap()).unwrap();
    assert_eq!(body["status"], "esperando_analisis");
    assert_eq!(body["due_date"], "2026-11-01");
    assert_eq!(body["updated_by"], json!(actor));
  }

  #[test]
  fn normalisation_is_unguarded() {
    let update = SampleUpdate {
      sample_id:       Uuid::new_v4(),
      expected_status: None,
      change:          SampleChange::Normalized {
        status:      Some(SampleStatus::PorAsignar),
        received_at: None,
      },
      updated_by:      None,
    };
    let req = backend().sample_update_request(&update).build().unwrap();
    assert!(!query_pairs(&req).iter().any(|(k, _)| k == "status"));
    let body = update_body(&update);
    assert_eq!(body.len(), 1);
    assert_eq!(body["status"], "por_asignar");
  }

  #[test]
  fn validation_writes_null_certification() {
    let update = SampleUpdate {
      sample_id:       Uuid::new_v4(),
      expected_status: Some(SampleStatus::PendienteValidacion),
      change:          SampleChange::Validated {
        payload:       json!({ "results": [] }),
        certification: None,
        evaluated_by:  Uuid::new_v4(),
        submitted_at:  Utc::now(),
      },
      updated_by:      None,
    };
    let body = update_body(&update);
    assert_eq!(body["certification_status"], Value::Null);
    assert_eq!(body["status"], "evaluada");

    let with = SampleChange::Validated {
      payload:       json!({}),
      certification: Some(CertificationStatus::Recibida),
      evaluated_by:  Uuid::new_v4(),
      submitted_at:  Utc::now(),
    };
    let body = update_body(&SampleUpdate { change: with, ..update });
    assert_eq!(body["certification_status"], "recibida");
  }

  #[test]
  fn listing_orders_unreceived_first() {
    let query = SampleQuery { status: Some(SampleStatus::Evaluada), limit: 200 };
    let req = backend().sample_list_request(&query).build().unwrap();
    let pairs = query_pairs(&req);
    assert!(pairs.contains(&(
      "order".into(),
      "received_at.desc.nullsfirst,created_at.desc".into()
    )));
    assert!(pairs.contains(&("limit".into(), "200".into())));
    assert!(pairs.contains(&("status".into(), "eq.evaluada".into())));
  }

  #[test]
  fn registration_args_are_prefixed() {
    let input = NewSample {
      sample_type:         SampleType::AlcoholicBeverage,
      origin:              "Bodega".into(),
      transport_condition: "Ambiente".into(),
      storage_condition:   "Seco".into(),
      business_name:       "Vinos SA".into(),
      phone:               "1".into(),
      address:             "Ruta 5".into(),
    };
    let user = Uuid::new_v4();
    let args = register_args(input, user);
    assert_eq!(args["p_type"], "Bebida alcoholica");
    assert_eq!(args["p_user_id"], json!(user));
    assert_eq!(args["p_business_name"], "Vinos SA");
  }

  #[test]
  fn registration_row_may_be_wrapped() {
    let id = Uuid::new_v4();
    let row = registered_row(json!([{ "id": id, "status": "recibida", "received_at": null }]))
      .unwrap();
    assert_eq!(row.id, id);
    assert_eq!(row.status.as_deref(), Some("recibida"));
    assert!(row.received_at.is_none());

    let row = registered_row(json!({ "id": id, "status": "por_asignar" })).unwrap();
    assert_eq!(row.status.as_deref(), Some("por_asignar"));

    assert!(registered_row(json!([])).is_err());
  }

  #[test]
  fn profile_rows_flatten_embedded_role() {
    let id = Uuid::new_v4();
    let row: ProfileRow = serde_json::from_value(json!({
      "id": id,
      "full_name": "Ana",
      "email": null,
      "role_id": Uuid::new_v4(),
      "active": true,
      "created_at": "2026-10-18T09:00:00.123456+00:00",
      "roles": { "slug": "evaluador", "name": "Evaluador" }
    }))
    .unwrap();
    let profile = Profile::from(row);
    assert_eq!(profile.role_slug.as_deref(), Some("evaluador"));
    assert!(profile.created_at.is_some());

    let orphan: ProfileRow = serde_json::from_value(json!({ "id": id, "roles": null })).unwrap();
    let profile = Profile::from(orphan);
    assert_eq!(profile.role_slug, None);
    assert!(profile.active);
  }

  #[test]
  fn hosted_sample_rows_decode() {
    let sample: Sample = serde_json::from_value(json!({
      "id": Uuid::new_v4(),
      "code": "AGU-20261018-0001",
      "type": "Agua",
      "origin": "Pozo",
      "transport_condition": "Frio",
      "storage_condition": "4 C",
      "business_name": "Aguas",
      "phone": "1",
      "address": "Calle",
      "status": "pendiente_validacion",
      "received_at": "2026-10-18T09:00:00+00:00",
      "created_at": "2026-10-18T08:59:00.5+00:00",
      "assigned_analyst_id": null,
      "due_date": "2026-11-01",
      "analysis_payload": { "ph": 7 },
      "analysis_submitted_at": null,
      "validation_payload": null,
      "validation_submitted_at": null,
      "evaluated_by": null,
      "created_by": null,
      "certification_status": null
    }))
    .unwrap();
    assert_eq!(sample.status, SampleStatus::PendienteValidacion);
    assert_eq!(sample.due_date, NaiveDate::from_ymd_opt(2026, 11, 1));
    assert_eq!(sample.updated_by, None);
  }
}

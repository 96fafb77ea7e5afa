//! Display-name enrichment for sample listings.
//!
//! Names are resolved in one batch per listing and attached as `*_name`
//! fields. They are never written back to the registry.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sample::Sample;

/// Minimal profile projection used for name lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileName {
  pub id:        Uuid,
  pub full_name: Option<String>,
  pub email:     Option<String>,
}

impl ProfileName {
  /// Full name, falling back to email, then to the id itself.
  pub fn display_name(&self) -> String {
    self
      .full_name
      .as_deref()
      .filter(|n| !n.is_empty())
      .or(self.email.as_deref().filter(|e| !e.is_empty()))
      .map(str::to_owned)
      .unwrap_or_else(|| self.id.to_string())
  }
}

/// A sample as returned by list endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedSample {
  #[serde(flatten)]
  pub sample:                Sample,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_by_name:       Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_by_name:       Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub evaluated_by_name:     Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub assigned_analyst_name: Option<String>,
}

impl From<Sample> for EnrichedSample {
  fn from(sample: Sample) -> Self {
    Self {
      sample,
      created_by_name: None,
      updated_by_name: None,
      evaluated_by_name: None,
      assigned_analyst_name: None,
    }
  }
}

/// Distinct actor ids referenced by `rows`, in a stable order.
pub fn actor_ids(rows: &[EnrichedSample]) -> Vec<Uuid> {
  rows
    .iter()
    .flat_map(|r| {
      [
        r.sample.updated_by,
        r.sample.evaluated_by,
        r.sample.assigned_analyst_id,
        r.sample.created_by,
      ]
    })
    .flatten()
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect()
}

pub fn name_map(profiles: &[ProfileName]) -> HashMap<Uuid, String> {
  profiles.iter().map(|p| (p.id, p.display_name())).collect()
}

/// Fill in every `*_name` field that is still empty and whose id resolves.
pub fn apply_names(rows: &mut [EnrichedSample], names: &HashMap<Uuid, String>) {
  fn fill(slot: &mut Option<String>, id: Option<Uuid>, names: &HashMap<Uuid, String>) {
    if slot.is_none()
      && let Some(name) = id.and_then(|id| names.get(&id))
    {
      *slot = Some(name.clone());
    }
  }

  for row in rows {
    fill(&mut row.updated_by_name, row.sample.updated_by, names);
    fill(&mut row.evaluated_by_name, row.sample.evaluated_by, names);
    fill(&mut row.assigned_analyst_name, row.sample.assigned_analyst_id, names);
    fill(&mut row.created_by_name, row.sample.created_by, names);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;

  use crate::sample::{SampleStatus, SampleType};

  fn sample(created_by: Uuid, analyst: Option<Uuid>) -> Sample {
    Sample {
      id:                      Uuid::new_v4(),
      code:                    Some("AGU-20261018-0001".into()),
      sample_type:             SampleType::Water,
      origin:                  "Pozo".into(),
      transport_condition:     "Frio".into(),
      storage_condition:       "4 C".into(),
      business_name:           "Aguas".into(),
      phone:                   "1".into(),
      address:                 "Calle".into(),
      status:                  SampleStatus::PorAsignar,
      received_at:             Some(Utc::now()),
      created_at:              Utc::now(),
      assigned_analyst_id:     analyst,
      due_date:                None,
      analysis_payload:        None,
      analysis_submitted_at:   None,
      validation_payload:      None,
      validation_submitted_at: None,
      evaluated_by:            None,
      created_by:              Some(created_by),
      updated_by:              None,
      certification_status:    None,
    }
  }

  #[test]
  fn actor_ids_are_distinct() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let rows = vec![
      EnrichedSample::from(sample(a, Some(b))),
      EnrichedSample::from(sample(a, None)),
    ];
    let ids = actor_ids(&rows);
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&a) && ids.contains(&b));
  }

  #[test]
  fn display_name_falls_back_to_email_then_id() {
    let id = Uuid::new_v4();
    let named = ProfileName { id, full_name: Some("Ana".into()), email: Some("a@x".into()) };
    assert_eq!(named.display_name(), "Ana");
    let mailed = ProfileName { id, full_name: None, email: Some("a@x".into()) };
    assert_eq!(mailed.display_name(), "a@x");
    let bare = ProfileName { id, full_name: Some(String::new()), email: None };
    assert_eq!(bare.display_name(), id.to_string());
  }

  #[test]
  fn names_attach_without_overwriting() {
    let creator = Uuid::new_v4();
    let analyst = Uuid::new_v4();
    let mut rows = vec![EnrichedSample::from(sample(creator, Some(analyst)))];
    rows[0].created_by_name = Some("Recepción".into());

    let names = name_map(&[
      ProfileName { id: creator, full_name: Some("Rosa".into()), email: None },
      ProfileName { id: analyst, full_name: Some("Alan".into()), email: None },
    ]);

    apply_names(&mut rows, &names);
    assert_eq!(rows[0].created_by_name.as_deref(), Some("Recepción"));
    assert_eq!(rows[0].assigned_analyst_name.as_deref(), Some("Alan"));
    assert_eq!(rows[0].evaluated_by_name, None);

    let before = rows.clone();
    apply_names(&mut rows, &names);
    assert_eq!(rows, before);
  }

  #[test]
  fn enriched_rows_serialize_flat() {
    let creator = Uuid::new_v4();
    let mut row = EnrichedSample::from(sample(creator, None));
    row.created_by_name = Some("Rosa".into());
    let json = serde_json::to_value(&row).unwrap();
    assert_eq!(json["created_by_name"], "Rosa");
    assert_eq!(json["type"], "Agua");
    assert!(json.get("assigned_analyst_name").is_none());
  }
}

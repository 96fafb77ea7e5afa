//! Certificate of analysis layout.
//!
//! Everything is read from the sample row: descriptive fields, the analyst's
//! `analysis_payload` and the evaluator's `validation_payload`. Missing
//! values print as `—`.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use labguard_core::sample::{Sample, parse_due_date};
use serde_json::Value;

mod canvas;
mod metrics;

use canvas::{Align, Canvas, Color, LETTER, Style};
use metrics::Font;

const MARGIN: f32 = 50.0;
const DASH: &str = "—";

const PRIMARY: Color = Color::hex(0x1f4ab8);
const TEXT: Color = Color::hex(0x111827);
const MUTED: Color = Color::hex(0x6b7280);
const BORDER: Color = Color::hex(0xd6d9e0);
const SOFT: Color = Color::hex(0xf3f6fb);

const LABEL: Style = Style::new(Font::Regular, 9.0, MUTED);
const VALUE: Style = Style::new(Font::Regular, 11.0, TEXT);
const HEADING: Style = Style::new(Font::Bold, 11.0, TEXT);

const TABLE_COLUMNS: [f32; 5] = [150.0, 100.0, 90.0, 140.0, 80.0];
const TABLE_HEADERS: [&str; 5] = ["Parámetro", "Resultado", "Unidad", "Rango normal", "Estado"];

// ─── Payload access ───────────────────────────────────────────────────────────

/// A printable payload value; null, `false` and empty strings count as absent.
fn printable(value: &Value) -> Option<String> {
  match value {
    Value::String(s) if !s.is_empty() => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(true) => Some("true".into()),
    _ => None,
  }
}

fn field(payload: Option<&Value>, key: &str) -> Option<String> {
  payload.and_then(|p| p.get(key)).and_then(printable)
}

/// The fields both payloads may carry, analysis first.
struct Payloads<'a> {
  analysis:   Option<&'a Value>,
  validation: Option<&'a Value>,
}

impl<'a> Payloads<'a> {
  fn of(sample: &'a Sample) -> Self {
    Self {
      analysis:   sample.analysis_payload.as_ref(),
      validation: sample.validation_payload.as_ref(),
    }
  }

  fn meta(&self, key: &str) -> Option<String> {
    field(self.analysis, key).or_else(|| field(self.validation, key))
  }

  /// Validation results win over analysis results, even when empty.
  fn results(&self) -> &'a [Value] {
    [self.validation, self.analysis]
      .into_iter()
      .flatten()
      .find_map(|p| p.get("results").and_then(Value::as_array))
      .map(Vec::as_slice)
      .unwrap_or_default()
  }
}

fn format_date_time(value: Option<DateTime<Utc>>) -> String {
  value.map_or_else(|| DASH.into(), |dt| dt.format("%d/%m/%Y %H:%M").to_string())
}

/// `dd/mm/yyyy` when the value parses as a date, otherwise as given.
fn format_date(value: Option<String>) -> String {
  match value {
    Some(raw) => parse_due_date(&raw).map_or(raw, |d| d.format("%d/%m/%Y").to_string()),
    None => DASH.into(),
  }
}

// ─── Drawing helpers ──────────────────────────────────────────────────────────

/// Truncate `text` with an ellipsis so it fits in `width`.
fn fit(text: &str, style: Style, width: f32) -> String {
  if style.width(text) <= width {
    return text.to_owned();
  }
  let mut out: String = text.to_owned();
  while !out.is_empty() && style.width(&format!("{out}…")) > width {
    out.pop();
  }
  format!("{}…", out.trim_end())
}

/// Draw text whose top edge sits at `top`.
fn put(page: &mut Canvas, x: f32, top: f32, text: &str, style: Style, width: f32) {
  let text = fit(text, style, width);
  page.text(x, top + style.size * 0.8, &text, style, Align::Left);
}

fn labelled(page: &mut Canvas, x: f32, top: f32, label: &str, value: Option<&str>, width: f32) {
  put(page, x, top, label, LABEL, width);
  put(page, x, top + 12.0, value.filter(|v| !v.is_empty()).unwrap_or(DASH), VALUE, width);
}

fn boxed(page: &mut Canvas, x: f32, y: f32, w: f32, h: f32, fill: Color) {
  page.fill_rect(x, y, w, h, fill);
  page.stroke_rect(x, y, w, h, 0.5, BORDER);
}

// ─── Layout ───────────────────────────────────────────────────────────────────

/// Render the certificate for `sample`, whatever its certification outcome.
pub fn render(sample: &Sample) -> Bytes {
  let payloads = Payloads::of(sample);
  let mut canvas = Canvas::new(LETTER);
  let width = canvas.width();
  let panel_width = width - 2.0 * MARGIN;
  let page = &mut canvas;

  // Title
  let mut y = MARGIN;
  page.text(width / 2.0, y + 15.0, "CERTIFICADO DE ANÁLISIS", Style::new(Font::Bold, 18.0, TEXT), Align::Center);
  y += 24.0;
  let report = field(payloads.validation, "report_number").unwrap_or_else(|| "N/A".into());
  page.text(
    width / 2.0,
    y + 10.0,
    &format!("Número de informe: {report}"),
    Style::new(Font::Regular, 11.0, MUTED),
    Align::Center,
  );
  y += 20.0;
  page.fill_rect(MARGIN, y, panel_width, 2.0, PRIMARY);
  y += 16.0;

  // Sample and client panel
  let panel_top = y;
  let col_width = panel_width / 2.0 - 8.0;
  let left_x = MARGIN + 10.0;
  let right_x = MARGIN + col_width + 16.0;
  boxed(page, MARGIN, panel_top, panel_width, 170.0, SOFT);
  put(page, left_x, panel_top + 10.0, "Información de la muestra", HEADING, col_width);
  put(page, right_x, panel_top + 10.0, "Detalles del cliente", HEADING, col_width);
  let rule = panel_top + 26.0;
  page.line((left_x, rule), (left_x + col_width - 8.0, rule), 0.5, BORDER);
  page.line((right_x, rule), (right_x + col_width - 8.0, rule), 0.5, BORDER);

  let sample_type = sample.sample_type.to_string();
  let left = [
    ("Código", sample.code.as_deref()),
    ("Tipo", Some(sample_type.as_str())),
    ("Origen", Some(sample.origin.as_str())),
    ("Transporte", Some(sample.transport_condition.as_str())),
    ("Almacenado", Some(sample.storage_condition.as_str())),
  ];
  for (i, (label, value)) in left.into_iter().enumerate() {
    labelled(page, left_x, rule + 8.0 + i as f32 * 28.0, label, value, col_width);
  }

  let client_email = field(payloads.validation, "client_email");
  let right = [
    ("Nombre", Some(sample.business_name.as_str())),
    ("Correo", client_email.as_deref()),
    ("Teléfono", Some(sample.phone.as_str())),
    ("Dirección", Some(sample.address.as_str())),
  ];
  for (i, (label, value)) in right.into_iter().enumerate() {
    labelled(page, right_x, rule + 8.0 + i as f32 * 28.0, label, value, col_width);
  }

  // Dates
  let dates_top = panel_top + 178.0;
  let date_width = panel_width / 2.0 - 10.0;
  let issued = field(payloads.validation, "report_date")
    .or_else(|| sample.due_date.map(|d| d.format("%Y-%m-%d").to_string()));
  let date_value = Style::new(Font::Regular, 12.0, TEXT);
  put(page, MARGIN + 10.0, dates_top, "Fecha de recepción", LABEL, date_width);
  put(page, MARGIN + 10.0, dates_top + 12.0, &format_date_time(sample.received_at), date_value, date_width);
  put(page, MARGIN + date_width + 20.0, dates_top, "Fecha de emisión", LABEL, date_width);
  put(page, MARGIN + date_width + 20.0, dates_top + 12.0, &format_date(issued), date_value, date_width);

  // Meta grid
  y = dates_top + 64.0;
  put(page, MARGIN, y, "Resultados de análisis", Style::new(Font::Bold, 12.0, TEXT), panel_width);
  let meta_top = y + 24.0;
  let expiration = payloads.meta("expiration").map(|e| format_date(Some(e)));
  let meta = [
    ("Color", payloads.meta("color")),
    ("Textura", payloads.meta("texture")),
    ("Apariencia", payloads.meta("appearance")),
    ("Fecha de expiración", expiration),
    ("Peso Neto (g)", payloads.meta("net_weight")),
    ("Sabor", payloads.meta("flavor")),
  ];
  let meta_width = (panel_width - 16.0) / 3.0;
  for (i, (label, value)) in meta.iter().enumerate() {
    let x = MARGIN + (i % 3) as f32 * (meta_width + 8.0);
    let top = meta_top + (i / 3) as f32 * 36.0;
    boxed(page, x, top - 4.0, meta_width, 34.0, SOFT);
    labelled(page, x + 8.0, top + 2.0, label, value.as_deref(), meta_width - 16.0);
  }
  y = meta_top + meta.len().div_ceil(3) as f32 * 36.0 + 24.0;

  // Results table
  put(page, MARGIN, y, "Resultados del análisis", Style::new(Font::Bold, 13.0, TEXT), panel_width);
  let table_top = y + 26.0;
  let total: f32 = TABLE_COLUMNS.iter().sum();
  let offsets: Vec<f32> = TABLE_COLUMNS
    .iter()
    .scan(0.0, |acc, w| {
      let x = *acc;
      *acc += w;
      Some(x)
    })
    .collect();

  page.fill_rect(MARGIN, table_top, total, 24.0, PRIMARY);
  let header = Style::new(Font::Bold, 10.0, Color::WHITE);
  for (i, title) in TABLE_HEADERS.iter().enumerate() {
    put(page, MARGIN + offsets[i] + 8.0, table_top + 7.0, title, header, TABLE_COLUMNS[i] - 16.0);
  }

  let cell = Style::new(Font::Regular, 10.0, TEXT);
  let mut row_y = table_top + 24.0;
  let results = payloads.results();
  for (idx, row) in results.iter().enumerate() {
    if idx % 2 == 0 {
      boxed(page, MARGIN, row_y, total, 22.0, SOFT);
    } else {
      page.stroke_rect(MARGIN, row_y, total, 22.0, 0.5, BORDER);
    }
    for (i, key) in ["param", "value", "unit", "range", "status"].iter().enumerate() {
      let text = row.get(*key).and_then(printable).unwrap_or_default();
      put(page, MARGIN + offsets[i] + 8.0, row_y + 6.0, &text, cell, TABLE_COLUMNS[i] - 16.0);
    }
    row_y += 22.0;
  }

  if results.is_empty() {
    page.stroke_rect(MARGIN, row_y, total, 24.0, 0.5, BORDER);
    put(page, MARGIN + 8.0, row_y + 7.0, "Sin resultados reportados", Style { color: MUTED, ..cell }, total - 16.0);
  }

  canvas.finish()
}

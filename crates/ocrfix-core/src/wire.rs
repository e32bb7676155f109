//! Read/write contract payloads.
//!
//! - **Read**: `{ "annotations": [...], "updated_at": "..." }`. Entries
//!   are decoded leniently into `RawAnnotation` (every field optional,
//!   numbers may arrive as strings) and normalized by the store.
//!   Raw OCR output (`{ "shapes": [{ "text", "points", "confidence" }] }`)
//!   is accepted as well.
//! - **Write**: `{ "annotations": [...] }` with only the persisted
//!   annotation fields.
//! - **Receipt**: `{ "updated_at": "..." }`; failures carry
//!   `{ "error": "..." }` or nothing but a status line.

use crate::model::Annotation;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected payload: {0}")]
    UnexpectedShape(&'static str),
}

// ─── Read contract ───────────────────────────────────────────────────────

/// One annotation as it arrives over the wire, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawAnnotation {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub x: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub y: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub width: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub height: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub rotation: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub order: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub group_id: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub text_direction: Option<String>,
    /// Polygon from the recognizer, used when explicit geometry is absent.
    #[serde(default, deserialize_with = "lenient_points")]
    pub points: Option<Vec<(f64, f64)>>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub confidence: Option<f64>,
}

impl RawAnnotation {
    /// A raw entry carrying explicit geometry and nothing else.
    pub fn with_geometry(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    pub fn has_geometry(&self) -> bool {
        self.x.is_some() && self.y.is_some() && self.width.is_some() && self.height.is_some()
    }
}

impl From<&Annotation> for RawAnnotation {
    fn from(a: &Annotation) -> Self {
        Self {
            id: Some(a.id.as_str().to_string()),
            text: Some(a.text.clone()),
            label: Some(a.label.clone()),
            x: Some(a.x),
            y: Some(a.y),
            width: Some(a.width),
            height: Some(a.height),
            rotation: Some(a.rotation),
            order: Some(a.order as f64),
            group_id: Some(a.group_id as f64),
            text_direction: Some(a.text_direction.to_string()),
            points: None,
            confidence: a.confidence,
        }
    }
}

/// A page as returned by the read contract.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PageDocument {
    #[serde(alias = "shapes")]
    pub annotations: Vec<RawAnnotation>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub updated_at: Option<String>,
}

/// Decode a read-contract body. A bare JSON array is taken as the
/// annotation list itself.
pub fn decode_page(json: &str) -> Result<PageDocument, WireError> {
    let value: Value = serde_json::from_str(json)?;
    match value {
        Value::Array(_) => Ok(PageDocument {
            annotations: serde_json::from_value(value)?,
            updated_at: None,
        }),
        Value::Object(_) => Ok(serde_json::from_value(value)?),
        _ => Err(WireError::UnexpectedShape(
            "expected an object with an `annotations` array",
        )),
    }
}

// ─── Write contract ──────────────────────────────────────────────────────

/// Body of a save request: the full annotation list, nothing derived.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveBody {
    pub annotations: Vec<Annotation>,
}

impl SaveBody {
    pub fn to_json(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Successful save response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveReceipt {
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Human-readable message for a failed request: the JSON `error` field
/// when present, otherwise the status text.
pub fn error_message(status_text: &str, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(b) if !b.error.trim().is_empty() => b.error,
        _ if !status_text.trim().is_empty() => status_text.trim().to_string(),
        _ => "request failed".to_string(),
    }
}

// ─── Lenient field decoders ──────────────────────────────────────────────

fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(value_as_f64))
}

fn value_as_f64(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_points<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<(f64, f64)>>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    let Some(Value::Array(items)) = value else {
        return Ok(None);
    };
    let points: Vec<(f64, f64)> = items
        .iter()
        .filter_map(|p| match p {
            Value::Array(xy) if xy.len() >= 2 => Some((value_as_f64(&xy[0])?, value_as_f64(&xy[1])?)),
            _ => None,
        })
        .collect();
    Ok((!points.is_empty()).then_some(points))
}

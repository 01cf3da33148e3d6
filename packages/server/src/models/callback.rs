use common::TaskStatus;
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;

use crate::utils::geo::Coordinates;

/// Task identifier as sent by the recognition service: a JSON string or number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackTaskId(pub i32);

impl<'de> Deserialize<'de> for CallbackTaskId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }

        let id = match Raw::deserialize(deserializer)? {
            Raw::Number(n) => n,
            Raw::Text(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| de::Error::custom(format!("TaskId '{s}' is not an integer")))?,
        };
        i32::try_from(id)
            .map(CallbackTaskId)
            .map_err(|_| de::Error::custom(format!("TaskId {id} is out of range")))
    }
}

/// Outcome reported by the recognition service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ExternalStatus {
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct LocationResult {
    pub latitude: f64,
    pub longitude: f64,
}

/// Body of `POST /api/update-image-result`.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct LocationCallback {
    #[schema(value_type = String, example = "42")]
    pub task_id: CallbackTaskId,
    /// `Succeeded` or `Failed`.
    #[schema(value_type = String, example = "Succeeded")]
    pub status: ExternalStatus,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub error_code: Option<Value>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub result: Option<LocationResult>,
}

/// One element of a detection callback, kept loose so a bad element does
/// not reject the whole batch.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct RawDetection {
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub image_path: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub latitude: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub longitude: Option<Value>,
}

/// A detection element that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionReport {
    pub image_path: String,
    pub point: Coordinates,
}

impl RawDetection {
    /// Returns `None` when the path or a coordinate is missing or unusable.
    pub fn validate(&self) -> Option<DetectionReport> {
        let image_path = self
            .image_path
            .as_ref()?
            .as_str()?
            .trim()
            .to_string();
        if image_path.is_empty() {
            return None;
        }
        let lat = loose_f64(self.latitude.as_ref()?)?;
        let lon = loose_f64(self.longitude.as_ref()?)?;
        Some(DetectionReport {
            image_path,
            point: Coordinates::new(lat, lon)?,
        })
    }
}

fn loose_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Body of `POST /api/update-image-trash-result`.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct DetectionCallback {
    #[schema(value_type = String, example = "42")]
    pub task_id: CallbackTaskId,
    /// `Succeeded` or `Failed`.
    #[schema(value_type = String, example = "Succeeded")]
    pub status: ExternalStatus,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub error_code: Option<Value>,
    #[serde(default)]
    pub error_message: Option<String>,
    /// Absent or `null` is treated as an empty list.
    #[serde(default)]
    pub result: Option<Vec<RawDetection>>,
}

/// Failure text stored on the task.
pub fn failure_reason(message: Option<&str>, code: Option<&Value>) -> String {
    if let Some(message) = message.map(str::trim).filter(|m| !m.is_empty()) {
        return message.to_string();
    }
    match code {
        Some(Value::String(code)) => format!("Recognition failed with code {code}"),
        Some(Value::Null) | None => "Recognition failed".to_string(),
        Some(code) => format!("Recognition failed with code {code}"),
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LocationCallbackResponse {
    #[schema(example = 42)]
    pub task_id: i32,
    pub status: TaskStatus,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DetectionCallbackResponse {
    pub status: TaskStatus,
    /// Number of detections stored by this delivery.
    #[schema(example = 3)]
    pub processed: usize,
}

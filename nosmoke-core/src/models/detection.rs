use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{timestamp, RecordKey};

pub const UNKNOWN_PERSON: &str = "Unknown Person";

/// One entry of the detection log. Append-only: the dashboard never edits
/// these, it only lists and exports them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRecord {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordKey>,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub smoking_detected: bool,
    #[serde(default)]
    pub face_detected: bool,
    /// Percentage in 0..=100.
    #[serde(default)]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_taken: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<String>,
}

impl DetectionRecord {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().filter(|n| !n.is_empty()).unwrap_or(UNKNOWN_PERSON)
    }

    pub fn display_roll_no(&self) -> &str {
        self.roll_no.as_deref().filter(|r| !r.is_empty()).unwrap_or("N/A")
    }

    /// Confidence as a whole percentage. Older records stored a 0..1
    /// probability; those are scaled up.
    pub fn confidence_pct(&self) -> u8 {
        percent(self.confidence)
    }

    /// Evidence image: the saved screenshot when there is one, else the
    /// face image attached to the record.
    pub fn evidence(&self) -> Option<&str> {
        self.screenshot_path.as_deref().or(self.image.as_deref())
    }
}

/// Body of `POST /database`. The backend assigns `id` and `timestamp`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewDetection {
    pub name: String,
    pub roll_no: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub smoking_detected: bool,
    pub face_detected: bool,
    pub confidence: f64,
    pub action_taken: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<String>,
}

impl NewDetection {
    /// A violation nobody could be matched to.
    pub fn unknown(face_detected: bool, confidence: f64, action_taken: &str) -> Self {
        Self {
            name: UNKNOWN_PERSON.to_string(),
            roll_no: "UNKNOWN".to_string(),
            department: Some("Unknown".to_string()),
            image: None,
            smoking_detected: true,
            face_detected,
            confidence,
            action_taken: action_taken.to_string(),
            screenshot_path: None,
        }
    }
}

/// Normalise a confidence that may be a 0..1 probability or a 0..100
/// percentage into a whole percentage.
pub(crate) fn percent(value: f64) -> u8 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    let pct = if value <= 1.0 { value * 100.0 } else { value };
    pct.round().min(100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_backend_record_deserializes() {
        let rec: DetectionRecord = serde_json::from_str(
            r#"{"id":"d1","timestamp":"2024-01-01T00:00:00Z","smokingDetected":true,"confidence":91}"#,
        )
        .unwrap();
        assert_eq!(rec.id, Some(RecordKey::Text("d1".into())));
        assert!(rec.smoking_detected);
        assert!(!rec.face_detected);
        assert_eq!(rec.confidence_pct(), 91);
        assert_eq!(rec.display_name(), UNKNOWN_PERSON);
        assert_eq!(rec.display_roll_no(), "N/A");
    }

    #[test]
    fn legacy_fractional_confidence_is_scaled() {
        assert_eq!(percent(0.87), 87);
        assert_eq!(percent(87.4), 87);
        assert_eq!(percent(140.0), 100);
        assert_eq!(percent(f64::NAN), 0);
    }

    #[test]
    fn new_detection_uses_backend_field_names() {
        let body = serde_json::to_value(NewDetection::unknown(false, 83.0, "Security alerted")).unwrap();
        assert_eq!(body["rollNo"], "UNKNOWN");
        assert_eq!(body["smokingDetected"], true);
        assert_eq!(body["actionTaken"], "Security alerted");
        assert!(body.get("image").is_none());
    }
}

//! Messages exchanged with the `/ws/detect` socket.

use serde::{Deserialize, Serialize};

use crate::models::{percent, NewDetection};

pub const ACTION_ALERT_SENT: &str = "Alert sent";
pub const ACTION_NONE: &str = "No action";

const UNKNOWN_NAME: &str = "Unknown";

/// One inbound reply to a frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionMessage {
    pub detections: Vec<DetectedObject>,
    pub recognized_students: Vec<RecognizedStudent>,
    pub screenshot_saved: bool,
    pub screenshot_path: Option<String>,
    pub detection_type: Option<String>,
    pub face_recognition_enabled: Option<bool>,
    /// Set by the backend when it could not process the frame.
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    pub class: String,
    /// `[x1, y1, x2, y2]` in frame pixels.
    pub bbox: [f64; 4],
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedStudent {
    pub name: String,
    #[serde(default, alias = "rollNo")]
    pub roll_no: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Cigarette,
    Person,
    Other,
}

impl ObjectKind {
    pub fn classify(class: &str) -> Self {
        let class = class.to_ascii_lowercase();
        if ["cigarette", "smoking", "cigar", "vape"]
            .iter()
            .any(|k| class.contains(k))
        {
            ObjectKind::Cigarette
        } else if class.contains("person") || class.contains("face") {
            ObjectKind::Person
        } else {
            ObjectKind::Other
        }
    }

    pub fn colour(self) -> &'static str {
        match self {
            ObjectKind::Cigarette => "#ef4444",
            ObjectKind::Person => "#22c55e",
            ObjectKind::Other => "#f59e0b",
        }
    }
}

impl DetectedObject {
    pub fn kind(&self) -> ObjectKind {
        ObjectKind::classify(&self.class)
    }
}

/// A labelled rectangle to draw over the frame.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub label: String,
    pub colour: &'static str,
    pub kind: ObjectKind,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    pub boxes: Vec<OverlayBox>,
}

impl Overlay {
    pub fn from_detections(detections: &[DetectedObject]) -> Self {
        let boxes = detections
            .iter()
            .map(|d| {
                let [x1, y1, x2, y2] = d.bbox;
                let kind = d.kind();
                OverlayBox {
                    x: x1.min(x2),
                    y: y1.min(y2),
                    width: (x2 - x1).abs(),
                    height: (y2 - y1).abs(),
                    label: format!("{} {}%", d.class, percent(d.confidence)),
                    colour: kind.colour(),
                    kind,
                }
            })
            .collect();
        Self { boxes }
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

impl DetectionMessage {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn has_violation(&self) -> bool {
        self.detections
            .iter()
            .any(|d| d.kind() == ObjectKind::Cigarette)
    }

    pub fn face_detected(&self) -> bool {
        self.detections.iter().any(|d| d.kind() == ObjectKind::Person)
            || !self.recognized_students.is_empty()
    }

    /// Highest cigarette confidence as a percentage, or the highest of any
    /// detection when there is no cigarette.
    pub fn confidence_pct(&self) -> u8 {
        let cigarette = self
            .detections
            .iter()
            .filter(|d| d.kind() == ObjectKind::Cigarette)
            .map(|d| percent(d.confidence))
            .max();
        cigarette
            .or_else(|| self.detections.iter().map(|d| percent(d.confidence)).max())
            .unwrap_or(0)
    }

    /// Students the backend matched, minus its "Unknown" placeholder.
    pub fn identified_students(&self) -> Vec<&RecognizedStudent> {
        self.recognized_students
            .iter()
            .filter(|s| !s.name.trim().is_empty() && !s.name.eq_ignore_ascii_case(UNKNOWN_NAME))
            .collect()
    }

    pub fn evidence(&self) -> Option<&str> {
        if self.screenshot_saved {
            self.screenshot_path.as_deref()
        } else {
            None
        }
    }

    /// Detection records to log for this message: one per identified
    /// student, or a single unknown-person record. Empty without a cigarette.
    pub fn violation_records(&self, alerts_enabled: bool) -> Vec<NewDetection> {
        if !self.has_violation() {
            return Vec::new();
        }
        let action = if alerts_enabled {
            ACTION_ALERT_SENT
        } else {
            ACTION_NONE
        };
        let confidence = f64::from(self.confidence_pct());
        let evidence = self.evidence().map(str::to_string);

        let identified = self.identified_students();
        if identified.is_empty() {
            let mut record = NewDetection::unknown(self.face_detected(), confidence, action);
            record.image = evidence.clone();
            record.screenshot_path = evidence;
            return vec![record];
        }

        identified
            .into_iter()
            .map(|student| NewDetection {
                name: student.name.clone(),
                roll_no: student.roll_no.clone().unwrap_or_else(|| "UNKNOWN".to_string()),
                department: student.department.clone(),
                image: evidence.clone(),
                smoking_detected: true,
                face_detected: true,
                confidence,
                action_taken: action.to_string(),
                screenshot_path: evidence.clone(),
            })
            .collect()
    }
}

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{DetectionRecord, Student};
use crate::config::DashboardConfig;

/// Home/admin counters. Always derived from the current collections,
/// never stored on their own.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_detections: usize,
    pub smoking_detections: usize,
    pub faces_identified: usize,
    pub total_students: usize,
    pub uptime: String,
    pub active_cameras: u32,
    pub last_updated: DateTime<Utc>,
}

impl DashboardStats {
    pub fn compute(
        students: &[Student],
        detections: &[DetectionRecord],
        dashboard: &DashboardConfig,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            total_detections: detections.len(),
            smoking_detections: detections.iter().filter(|d| d.smoking_detected).count(),
            faces_identified: detections.iter().filter(|d| d.face_detected).count(),
            total_students: students.len(),
            uptime: dashboard.uptime.clone(),
            active_cameras: dashboard.active_cameras,
            last_updated: now,
        }
    }
}

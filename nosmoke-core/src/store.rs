use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError};
use crate::config::DashboardConfig;
use crate::models::{
    DashboardStats, DetectionRecord, NewDetection, NewStudent, Student, StudentPatch, DEFAULT_STATUS,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),

    #[error("a student with roll number {0} already exists")]
    DuplicateRollNo(String),

    #[error("no student with roll number {0}")]
    UnknownStudent(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Roster, detection log and the stats derived from them.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainState {
    pub students: Vec<Student>,
    /// Most recent first.
    pub detections: Vec<DetectionRecord>,
    pub stats: DashboardStats,
    /// Set once the first successful `load()` finished.
    pub loaded: bool,
}

/// Owns students, detections and stats. Every successful mutation
/// recomputes the stats in the same update, so subscribers never see
/// counters that disagree with the collections. Clone is cheap.
#[derive(Clone)]
pub struct DomainStore {
    api: ApiClient,
    dashboard: DashboardConfig,
    state: Arc<watch::Sender<DomainState>>,
}

impl DomainStore {
    pub fn new(api: ApiClient, dashboard: DashboardConfig) -> Self {
        let stats = DashboardStats::compute(&[], &[], &dashboard, Utc::now());
        let (tx, _rx) = watch::channel(DomainState {
            students: Vec::new(),
            detections: Vec::new(),
            stats,
            loaded: false,
        });
        Self {
            api,
            dashboard,
            state: Arc::new(tx),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn subscribe(&self) -> watch::Receiver<DomainState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> DomainState {
        self.state.borrow().clone()
    }

    pub fn students(&self) -> Vec<Student> {
        self.state.borrow().students.clone()
    }

    pub fn detections(&self) -> Vec<DetectionRecord> {
        self.state.borrow().detections.clone()
    }

    pub fn stats(&self) -> DashboardStats {
        self.state.borrow().stats.clone()
    }

    pub fn student(&self, roll_no: &str) -> Option<Student> {
        self.state
            .borrow()
            .students
            .iter()
            .find(|s| s.roll_no == roll_no)
            .cloned()
    }

    /// Apply a mutation and recompute stats in one notification.
    fn mutate(&self, f: impl FnOnce(&mut DomainState)) {
        let dashboard = &self.dashboard;
        self.state.send_modify(|state| {
            f(state);
            state.stats = DashboardStats::compute(&state.students, &state.detections, dashboard, Utc::now());
        });
    }

    /// Fetch both collections from the backend, replacing what is held.
    pub async fn load(&self) -> Result<(), StoreError> {
        let (students, detections) =
            tokio::try_join!(self.api.list_students(), self.api.list_detections())?;
        let mut detections = detections;
        detections.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        info!(students = students.len(), detections = detections.len(), "loaded dashboard data");
        self.mutate(move |s| {
            s.students = students;
            s.detections = detections;
            s.loaded = true;
        });
        Ok(())
    }

    pub async fn add_student(&self, student: NewStudent) -> Result<Student, StoreError> {
        let student = student.normalized();
        let missing = student.missing_fields();
        if !missing.is_empty() {
            return Err(StoreError::Validation(format!(
                "Please fill in all required fields ({})",
                missing.join(", ")
            )));
        }
        if self.student(&student.roll_no).is_some() {
            return Err(StoreError::DuplicateRollNo(student.roll_no));
        }

        let mut created = self.api.create_student(&student).await.map_err(|e| {
            warn!(roll_no = %student.roll_no, error = %e, "create student failed");
            StoreError::from(e)
        })?;
        if created.enrollment_date.is_none() {
            created.enrollment_date = Some(Utc::now().date_naive().to_string());
        }
        if created.status.is_empty() {
            created.status = DEFAULT_STATUS.to_string();
        }

        info!(roll_no = %created.roll_no, "student added");
        let stored = created.clone();
        self.mutate(move |s| s.students.push(stored));
        Ok(created)
    }

    pub async fn update_student(&self, roll_no: &str, patch: StudentPatch) -> Result<Student, StoreError> {
        let current = self
            .student(roll_no)
            .ok_or_else(|| StoreError::UnknownStudent(roll_no.to_string()))?;
        if let Some(new_roll) = &patch.roll_no {
            if new_roll.trim().is_empty() {
                return Err(StoreError::Validation("Roll number cannot be empty".into()));
            }
            if new_roll != roll_no && self.student(new_roll).is_some() {
                return Err(StoreError::DuplicateRollNo(new_roll.clone()));
            }
        }
        for (field, value) in [("name", &patch.name), ("department", &patch.department)] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(StoreError::Validation(format!("Student {field} cannot be empty")));
            }
        }

        let mut updated = current.clone();
        patch.apply(&mut updated);
        if patch.is_empty() {
            return Ok(updated);
        }

        self.api
            .update_student(&current.backend_key(), &patch)
            .await
            .map_err(|e| {
                warn!(roll_no, error = %e, "update student failed");
                StoreError::from(e)
            })?;

        info!(roll_no, "student updated");
        let stored = updated.clone();
        let key = roll_no.to_string();
        self.mutate(move |s| {
            if let Some(slot) = s.students.iter_mut().find(|st| st.roll_no == key) {
                *slot = stored;
            }
        });
        Ok(updated)
    }

    pub async fn delete_student(&self, roll_no: &str) -> Result<(), StoreError> {
        let current = self
            .student(roll_no)
            .ok_or_else(|| StoreError::UnknownStudent(roll_no.to_string()))?;

        self.api
            .delete_student(&current.backend_key())
            .await
            .map_err(|e| {
                warn!(roll_no, error = %e, "delete student failed");
                StoreError::from(e)
            })?;

        info!(roll_no, "student removed");
        let key = roll_no.to_string();
        self.mutate(move |s| s.students.retain(|st| st.roll_no != key));
        Ok(())
    }

    /// Log a detection. The backend assigns id and timestamp; the created
    /// record goes to the front of the log.
    pub async fn add_detection(&self, detection: NewDetection) -> Result<DetectionRecord, StoreError> {
        let created = self.api.create_detection(&detection).await.map_err(|e| {
            warn!(name = %detection.name, error = %e, "logging detection failed");
            StoreError::from(e)
        })?;
        info!(
            name = %detection.name,
            smoking = created.smoking_detected,
            confidence = created.confidence,
            "detection logged"
        );
        let stored = created.clone();
        self.mutate(move |s| s.detections.insert(0, stored));
        Ok(created)
    }

    /// Recompute stats from the collections held in memory. No network.
    pub fn refresh_stats(&self) -> DashboardStats {
        self.mutate(|_| {});
        self.stats()
    }
}

use serde::{Deserialize, Serialize};

use super::RecordKey;

pub const DEFAULT_STATUS: &str = "Active";

/// A student in the face-recognition roster.
/// `roll_no` is the user-facing key; `id` is whatever the backend assigned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordKey>,
    pub name: String,
    pub roll_no: String,
    pub department: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrollment_date: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    DEFAULT_STATUS.to_string()
}

impl Student {
    /// Path key for `/students/{id}`. Falls back to the roll number when
    /// the backend never told us its id.
    pub fn backend_key(&self) -> String {
        match &self.id {
            Some(id) => id.to_string(),
            None => self.roll_no.clone(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case(DEFAULT_STATUS)
    }
}

/// Add-student form payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewStudent {
    pub name: String,
    pub roll_no: String,
    pub department: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl NewStudent {
    /// Trim every field and drop optional ones left blank.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            roll_no: self.roll_no.trim().to_string(),
            department: self.department.trim().to_string(),
            email: non_blank(self.email),
            phone: non_blank(self.phone),
            image: non_blank(self.image),
        }
    }

    /// Name, roll number and department are required to persist.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.roll_no.trim().is_empty() {
            missing.push("roll number");
        }
        if self.department.trim().is_empty() {
            missing.push("department");
        }
        missing
    }
}

impl From<&Student> for NewStudent {
    fn from(s: &Student) -> Self {
        Self {
            name: s.name.clone(),
            roll_no: s.roll_no.clone(),
            department: s.department.clone(),
            email: s.email.clone(),
            phone: s.phone.clone(),
            image: s.image.clone(),
        }
    }
}

/// Partial update sent with `PUT /students/{id}`. Only set fields are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudentPatch {
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
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl StudentPatch {
    pub fn is_empty(&self) -> bool {
        *self == StudentPatch::default()
    }

    /// Fields that differ between the stored record and an edited form.
    pub fn diff(current: &Student, edited: &NewStudent) -> Self {
        let edited = edited.clone().normalized();
        let changed = |old: &str, new: &str| (old != new).then(|| new.to_string());
        let changed_opt = |old: &Option<String>, new: &Option<String>| -> Option<String> {
            (old != new).then(|| new.clone().unwrap_or_default())
        };
        Self {
            name: changed(current.name.as_str(), edited.name.as_str()),
            roll_no: changed(current.roll_no.as_str(), edited.roll_no.as_str()),
            department: changed(current.department.as_str(), edited.department.as_str()),
            email: changed_opt(&current.email, &edited.email),
            phone: changed_opt(&current.phone, &edited.phone),
            image: changed_opt(&current.image, &edited.image),
            status: None,
        }
    }

    pub fn apply(&self, student: &mut Student) {
        if let Some(v) = &self.name {
            student.name = v.clone();
        }
        if let Some(v) = &self.roll_no {
            student.roll_no = v.clone();
        }
        if let Some(v) = &self.department {
            student.department = v.clone();
        }
        if let Some(v) = &self.email {
            student.email = non_blank(Some(v.clone()));
        }
        if let Some(v) = &self.phone {
            student.phone = non_blank(Some(v.clone()));
        }
        if let Some(v) = &self.image {
            student.image = non_blank(Some(v.clone()));
        }
        if let Some(v) = &self.status {
            student.status = v.clone();
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

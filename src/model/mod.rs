//! Persisted data model for academy administration.
//!
//! Every entity lives in a named collection of the document store; the field
//! names mirror the wire shape of the stored documents (`camelCase`). The
//! `id` field is carried on the struct for convenience but is stored as the
//! document id, not as a field — [`from_document`] and [`to_fields`] handle
//! the split.
//!
//! Ownership note: the store is externally durable; this crate is a thin
//! client and never assumes it is the only writer.

use crate::storage::{Document, StorageError};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Collection names used by every query in the crate.
pub mod collections {
    pub const ACADEMIES: &str = "academies";
    pub const CLASSES: &str = "classes";
    pub const STUDENTS: &str = "students";
    pub const ASSIGNMENTS: &str = "academyAssignments";
    pub const SUBMISSIONS: &str = "submissions";
    pub const QUESTION_BANK: &str = "questionBank";
}

/// Field names that appear in filters.
pub mod fields {
    /// The tenant key present on every tenant-owned document.
    pub const ACADEMY_ID: &str = "academyId";
    pub const ADMIN_EMAIL: &str = "adminEmail";
    pub const IS_DELETED: &str = "isDeleted";
    pub const CLASS_ID: &str = "classId";
    pub const STATUS: &str = "status";
    pub const CREATED_AT: &str = "createdAt";
}

/// An academy: the unit of data isolation (one tenant).
///
/// At most one non-deleted academy may carry a given `admin_email`; the
/// role resolver depends on that invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Academy {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub admin_email: String,
    pub created_at: DateTime<Utc>,
    pub is_deleted: bool,
}

/// A class within one academy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    #[serde(default)]
    pub id: String,
    pub academy_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub is_deleted: bool,
}

/// Student lifecycle status.
///
/// Students self-register as `Pending`; an admin either approves them into
/// `Active` (which requires a class assignment) or marks them `Rejected`.
/// Soft removal is the separate `is_deleted` flag, not a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    Pending,
    Active,
    Rejected,
}

impl StudentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudentStatus::Pending => "pending",
            StudentStatus::Active => "active",
            StudentStatus::Rejected => "rejected",
        }
    }
}

/// A student within one academy, optionally assigned to a class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(default)]
    pub id: String,
    pub academy_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<String>,
    pub student_name: String,
    pub status: StudentStatus,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

/// An assignment given to one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    #[serde(default)]
    pub id: String,
    pub academy_id: String,
    pub class_id: String,
    pub title: String,
    pub day_title: String,
    pub assigned_unit_ids: Vec<String>,
    pub due_date: DateTime<Utc>,
    pub week: u32,
    pub created_at: DateTime<Utc>,
}

/// A student's submitted answer sheet.
///
/// `assignment_id` absent means free study rather than assignment work.
/// The score is computed upstream and only displayed here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    #[serde(default)]
    pub id: String,
    pub student_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_id: Option<String>,
    pub academy_id: String,
    pub main_chapter: String,
    pub question_ids: Vec<String>,
    /// Entry per question; `None` marks an unanswered question.
    pub answers: Vec<Option<u32>>,
    pub score: f64,
    pub created_at: DateTime<Utc>,
    pub is_deleted: bool,
}

/// A question from the read-only question bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(default)]
    pub id: String,
    pub question_text: String,
    pub choices: Vec<String>,
    pub answer_index: u32,
    pub unit_id: String,
}

/// Decode a stored document into a typed model, injecting the document id.
pub fn from_document<T: DeserializeOwned>(doc: &Document) -> Result<T, StorageError> {
    let mut data = doc.data.clone();
    if let Value::Object(map) = &mut data {
        map.insert("id".to_string(), Value::String(doc.id.clone()));
    }
    serde_json::from_value(data).map_err(StorageError::from)
}

/// Encode a typed model into document fields, stripping the id (it lives in
/// the document name, not the field map).
pub fn to_fields<T: Serialize>(value: &T) -> Result<Value, StorageError> {
    let mut data = serde_json::to_value(value)?;
    if let Value::Object(map) = &mut data {
        map.remove("id");
    }
    Ok(data)
}

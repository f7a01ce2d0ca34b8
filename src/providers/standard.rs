//! The standard admin provider: tenant-scoped CRUD over academy data.
//!
//! Each operation here corresponds to an action an admin screen performs —
//! managing academies, classes, and students, handing out assignments, and
//! reviewing submissions. Operations take the resolved [`Viewer`] plus, for
//! platform operators, an optional tenant selection; both pass through
//! [`TenantScope`] so a tenant admin can never read or write outside their
//! own academy. Cross-tenant lookups answer exactly like missing documents.
//!
//! Scores are displayed as stored; nothing here computes them.

use crate::model::{
    self, Academy, Assignment, Class, Question, Student, StudentStatus, Submission, collections,
    fields,
};
use crate::providers::{ProviderError, ProviderResult};
use crate::scope::TenantScope;
use crate::storage::{Document, DocumentStore, Filter, SortOrder, Subscription};
use crate::viewer::Viewer;
use chrono::{DateTime, Utc};
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::json;

/// Input for [`StandardAdminProvider::create_assignment`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewAssignment {
    pub class_id: String,
    pub title: String,
    pub day_title: String,
    pub assigned_unit_ids: Vec<String>,
    pub due_date: DateTime<Utc>,
    pub week: u32,
}

/// Per-student, per-assignment standing for the assignment-status view.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentStatusRow {
    pub student_id: String,
    pub student_name: String,
    pub assignment_id: String,
    pub title: String,
    pub due_date: DateTime<Utc>,
    pub outcome: AssignmentOutcome,
}

/// What a student has done about one assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentOutcome {
    /// A submission exists; `late` when it arrived after the due date.
    Submitted { score: f64, late: bool },
    /// Past due with nothing submitted.
    Missing,
    /// Not yet due, nothing submitted.
    Pending,
}

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardCounts {
    pub pending_students: usize,
    pub active_students: usize,
    pub classes: usize,
    /// Populated only for an unscoped platform view.
    pub academies: Option<usize>,
    pub submissions: usize,
}

/// Admin operations over a document store.
#[derive(Clone)]
pub struct StandardAdminProvider<S> {
    store: S,
}

impl<S: DocumentStore> StandardAdminProvider<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    // ---- scoping helpers ----

    fn scope(viewer: &Viewer, selected_tenant: Option<&str>) -> ProviderResult<TenantScope> {
        Ok(TenantScope::for_viewer(Some(viewer), selected_tenant)?)
    }

    fn require_platform(viewer: &Viewer) -> ProviderResult<()> {
        if viewer.is_platform() {
            Ok(())
        } else {
            Err(ProviderError::PlatformRequired)
        }
    }

    fn require_tenant(scope: &TenantScope) -> ProviderResult<String> {
        scope
            .tenant_id()
            .map(str::to_string)
            .ok_or(ProviderError::TenantRequired)
    }

    fn require_non_empty(value: &str, what: &str) -> ProviderResult<()> {
        if value.trim().is_empty() {
            Err(ProviderError::InvalidInput(format!(
                "{what} must not be empty"
            )))
        } else {
            Ok(())
        }
    }

    fn decode_all<T: DeserializeOwned>(docs: &[Document]) -> ProviderResult<Vec<T>> {
        docs.iter()
            .map(|doc| model::from_document(doc).map_err(ProviderError::storage))
            .collect()
    }

    async fn find_decoded<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> ProviderResult<Vec<T>> {
        let docs = self
            .store
            .find(collection, filter)
            .await
            .map_err(ProviderError::storage)?;
        Self::decode_all(&docs)
    }

    /// Load a tenant-owned document, enforcing scope visibility. A document
    /// outside the scope is reported as not found, never as forbidden.
    async fn load_scoped<T: DeserializeOwned>(
        &self,
        collection: &str,
        resource: &'static str,
        id: &str,
        scope: &TenantScope,
    ) -> ProviderResult<T> {
        let doc = self
            .store
            .get(collection, id)
            .await
            .map_err(ProviderError::storage)?
            .ok_or_else(|| ProviderError::not_found(resource, id))?;
        let academy_id = doc.str_field(fields::ACADEMY_ID).unwrap_or_default();
        if !scope.permits(academy_id) {
            debug!("scope refused {collection}/{id} for tenant {academy_id}");
            return Err(ProviderError::not_found(resource, id));
        }
        model::from_document(&doc).map_err(ProviderError::storage)
    }

    // ---- academies (platform only) ----

    /// Register a new academy and its admin email.
    ///
    /// Rejected when another active academy already uses the email: two
    /// active academies sharing an `adminEmail` would make role resolution
    /// ambiguous.
    pub async fn create_academy(
        &self,
        viewer: &Viewer,
        name: &str,
        admin_email: &str,
    ) -> ProviderResult<Academy> {
        Self::require_platform(viewer)?;
        Self::require_non_empty(name, "academy name")?;
        Self::require_non_empty(admin_email, "admin email")?;

        let duplicates = self
            .store
            .count(
                collections::ACADEMIES,
                &Filter::new()
                    .with_eq(fields::ADMIN_EMAIL, admin_email)
                    .with_eq(fields::IS_DELETED, false),
            )
            .await
            .map_err(ProviderError::storage)?;
        if duplicates > 0 {
            return Err(ProviderError::DuplicateAdminEmail {
                email: admin_email.to_string(),
            });
        }

        let academy = Academy {
            id: String::new(),
            name: name.to_string(),
            admin_email: admin_email.to_string(),
            created_at: Utc::now(),
            is_deleted: false,
        };
        let doc = self
            .store
            .insert(
                collections::ACADEMIES,
                model::to_fields(&academy).map_err(ProviderError::storage)?,
            )
            .await
            .map_err(ProviderError::storage)?;
        Ok(Academy {
            id: doc.id,
            ..academy
        })
    }

    /// All active academies.
    pub async fn list_academies(&self, viewer: &Viewer) -> ProviderResult<Vec<Academy>> {
        Self::require_platform(viewer)?;
        self.find_decoded(
            collections::ACADEMIES,
            &Filter::new().with_eq(fields::IS_DELETED, false),
        )
        .await
    }

    /// Soft-delete an academy. Its admin email stops resolving immediately;
    /// child documents stay in place for operator cleanup.
    pub async fn soft_delete_academy(&self, viewer: &Viewer, id: &str) -> ProviderResult<()> {
        Self::require_platform(viewer)?;
        if self
            .store
            .get(collections::ACADEMIES, id)
            .await
            .map_err(ProviderError::storage)?
            .is_none()
        {
            return Err(ProviderError::not_found("academy", id));
        }
        self.store
            .soft_delete(collections::ACADEMIES, id)
            .await
            .map_err(ProviderError::storage)
    }

    // ---- classes ----

    /// Create a class. Tenant admins create in their own academy; platform
    /// operators must select one.
    pub async fn create_class(
        &self,
        viewer: &Viewer,
        selected_tenant: Option<&str>,
        name: &str,
    ) -> ProviderResult<Class> {
        Self::require_non_empty(name, "class name")?;
        let scope = Self::scope(viewer, selected_tenant)?;
        let academy_id = Self::require_tenant(&scope)?;

        let class = Class {
            id: String::new(),
            academy_id,
            name: name.to_string(),
            created_at: Utc::now(),
            is_deleted: false,
        };
        let doc = self
            .store
            .insert(
                collections::CLASSES,
                model::to_fields(&class).map_err(ProviderError::storage)?,
            )
            .await
            .map_err(ProviderError::storage)?;
        Ok(Class { id: doc.id, ..class })
    }

    /// Active classes visible in the viewer's scope.
    pub async fn list_classes(
        &self,
        viewer: &Viewer,
        selected_tenant: Option<&str>,
    ) -> ProviderResult<Vec<Class>> {
        let scope = Self::scope(viewer, selected_tenant)?;
        let filter = scope.apply(Filter::new().with_eq(fields::IS_DELETED, false));
        self.find_decoded(collections::CLASSES, &filter).await
    }

    pub async fn soft_delete_class(&self, viewer: &Viewer, id: &str) -> ProviderResult<()> {
        let scope = Self::scope(viewer, None)?;
        let _: Class = self
            .load_scoped(collections::CLASSES, "class", id, &scope)
            .await?;
        self.store
            .soft_delete(collections::CLASSES, id)
            .await
            .map_err(ProviderError::storage)
    }

    // ---- students ----

    /// Students in scope, optionally narrowed by lifecycle status.
    /// Soft-deleted students are excluded.
    pub async fn list_students(
        &self,
        viewer: &Viewer,
        selected_tenant: Option<&str>,
        status: Option<StudentStatus>,
    ) -> ProviderResult<Vec<Student>> {
        let scope = Self::scope(viewer, selected_tenant)?;
        let mut filter = Filter::new().with_eq(fields::IS_DELETED, false);
        if let Some(status) = status {
            filter = filter.with_eq(fields::STATUS, status.as_str());
        }
        self.find_decoded(collections::STUDENTS, &scope.apply(filter))
            .await
    }

    /// Approve a pending student into a class: status becomes `active`.
    /// The class must belong to the student's academy.
    pub async fn approve_student(
        &self,
        viewer: &Viewer,
        student_id: &str,
        class_id: &str,
    ) -> ProviderResult<Student> {
        let scope = Self::scope(viewer, None)?;
        let student: Student = self
            .load_scoped(collections::STUDENTS, "student", student_id, &scope)
            .await?;
        self.check_class_assignment(&student, class_id, &scope)
            .await?;

        let doc = self
            .store
            .update_fields(
                collections::STUDENTS,
                student_id,
                json!({
                    fields::STATUS: StudentStatus::Active.as_str(),
                    fields::CLASS_ID: class_id,
                }),
            )
            .await
            .map_err(ProviderError::storage)?;
        model::from_document(&doc).map_err(ProviderError::storage)
    }

    /// Reject a student. A soft status transition only: academy and class
    /// assignment are left untouched, and the document is not deleted.
    pub async fn reject_student(
        &self,
        viewer: &Viewer,
        student_id: &str,
    ) -> ProviderResult<Student> {
        let scope = Self::scope(viewer, None)?;
        let _: Student = self
            .load_scoped(collections::STUDENTS, "student", student_id, &scope)
            .await?;
        let doc = self
            .store
            .update_fields(
                collections::STUDENTS,
                student_id,
                json!({fields::STATUS: StudentStatus::Rejected.as_str()}),
            )
            .await
            .map_err(ProviderError::storage)?;
        model::from_document(&doc).map_err(ProviderError::storage)
    }

    /// Move a student to another class within the same academy.
    pub async fn assign_class(
        &self,
        viewer: &Viewer,
        student_id: &str,
        class_id: &str,
    ) -> ProviderResult<Student> {
        let scope = Self::scope(viewer, None)?;
        let student: Student = self
            .load_scoped(collections::STUDENTS, "student", student_id, &scope)
            .await?;
        self.check_class_assignment(&student, class_id, &scope)
            .await?;

        let doc = self
            .store
            .update_fields(
                collections::STUDENTS,
                student_id,
                json!({fields::CLASS_ID: class_id}),
            )
            .await
            .map_err(ProviderError::storage)?;
        model::from_document(&doc).map_err(ProviderError::storage)
    }

    pub async fn soft_delete_student(&self, viewer: &Viewer, id: &str) -> ProviderResult<()> {
        let scope = Self::scope(viewer, None)?;
        let _: Student = self
            .load_scoped(collections::STUDENTS, "student", id, &scope)
            .await?;
        self.store
            .soft_delete(collections::STUDENTS, id)
            .await
            .map_err(ProviderError::storage)
    }

    async fn check_class_assignment(
        &self,
        student: &Student,
        class_id: &str,
        scope: &TenantScope,
    ) -> ProviderResult<()> {
        let class: Class = self
            .load_scoped(collections::CLASSES, "class", class_id, scope)
            .await?;
        if class.is_deleted {
            return Err(ProviderError::not_found("class", class_id));
        }
        if class.academy_id != student.academy_id {
            return Err(ProviderError::cross_tenant("class", class_id));
        }
        Ok(())
    }

    // ---- assignments ----

    pub async fn create_assignment(
        &self,
        viewer: &Viewer,
        selected_tenant: Option<&str>,
        new: NewAssignment,
    ) -> ProviderResult<Assignment> {
        Self::require_non_empty(&new.title, "assignment title")?;
        Self::require_non_empty(&new.day_title, "day title")?;
        if new.assigned_unit_ids.is_empty() {
            return Err(ProviderError::InvalidInput(
                "an assignment needs at least one unit".to_string(),
            ));
        }

        let scope = Self::scope(viewer, selected_tenant)?;
        let academy_id = Self::require_tenant(&scope)?;
        let class: Class = self
            .load_scoped(collections::CLASSES, "class", &new.class_id, &scope)
            .await?;
        if class.academy_id != academy_id {
            return Err(ProviderError::cross_tenant("class", &new.class_id));
        }

        let assignment = Assignment {
            id: String::new(),
            academy_id,
            class_id: new.class_id,
            title: new.title,
            day_title: new.day_title,
            assigned_unit_ids: new.assigned_unit_ids,
            due_date: new.due_date,
            week: new.week,
            created_at: Utc::now(),
        };
        let doc = self
            .store
            .insert(
                collections::ASSIGNMENTS,
                model::to_fields(&assignment).map_err(ProviderError::storage)?,
            )
            .await
            .map_err(ProviderError::storage)?;
        Ok(Assignment {
            id: doc.id,
            ..assignment
        })
    }

    pub async fn list_assignments(
        &self,
        viewer: &Viewer,
        selected_tenant: Option<&str>,
        class_id: Option<&str>,
    ) -> ProviderResult<Vec<Assignment>> {
        let scope = Self::scope(viewer, selected_tenant)?;
        let mut filter = Filter::new();
        if let Some(class_id) = class_id {
            filter = filter.with_eq(fields::CLASS_ID, class_id);
        }
        self.find_decoded(collections::ASSIGNMENTS, &scope.apply(filter))
            .await
    }

    /// Remove an assignment outright — the one hard delete the admin
    /// screens perform.
    pub async fn delete_assignment(&self, viewer: &Viewer, id: &str) -> ProviderResult<()> {
        let scope = Self::scope(viewer, None)?;
        let _: Assignment = self
            .load_scoped(collections::ASSIGNMENTS, "assignment", id, &scope)
            .await?;
        self.store
            .hard_delete(collections::ASSIGNMENTS, id)
            .await
            .map_err(ProviderError::storage)?;
        Ok(())
    }

    // ---- submissions ----

    /// Submissions in scope, newest first. Hidden submissions are excluded
    /// unless asked for.
    pub async fn list_submissions(
        &self,
        viewer: &Viewer,
        selected_tenant: Option<&str>,
        include_hidden: bool,
    ) -> ProviderResult<Vec<Submission>> {
        let scope = Self::scope(viewer, selected_tenant)?;
        let mut filter = Filter::new().order_by(fields::CREATED_AT, SortOrder::Descending);
        if !include_hidden {
            filter = filter.with_eq(fields::IS_DELETED, false);
        }
        self.find_decoded(collections::SUBMISSIONS, &scope.apply(filter))
            .await
    }

    /// Toggle a submission's visibility on the review screens. Hiding uses
    /// the soft-delete flag; nothing is removed.
    pub async fn set_submission_hidden(
        &self,
        viewer: &Viewer,
        id: &str,
        hidden: bool,
    ) -> ProviderResult<Submission> {
        let scope = Self::scope(viewer, None)?;
        let _: Submission = self
            .load_scoped(collections::SUBMISSIONS, "submission", id, &scope)
            .await?;
        let doc = self
            .store
            .update_fields(
                collections::SUBMISSIONS,
                id,
                json!({fields::IS_DELETED: hidden}),
            )
            .await
            .map_err(ProviderError::storage)?;
        model::from_document(&doc).map_err(ProviderError::storage)
    }

    /// The assignment-status board for one class: every active student
    /// crossed with every assignment of the class.
    pub async fn assignment_status(
        &self,
        viewer: &Viewer,
        selected_tenant: Option<&str>,
        class_id: &str,
        as_of: DateTime<Utc>,
    ) -> ProviderResult<Vec<AssignmentStatusRow>> {
        let scope = Self::scope(viewer, selected_tenant)?;
        let class: Class = self
            .load_scoped(collections::CLASSES, "class", class_id, &scope)
            .await?;

        let students: Vec<Student> = self
            .find_decoded(
                collections::STUDENTS,
                &Filter::new()
                    .with_eq(fields::ACADEMY_ID, class.academy_id.as_str())
                    .with_eq(fields::CLASS_ID, class_id)
                    .with_eq(fields::STATUS, StudentStatus::Active.as_str())
                    .with_eq(fields::IS_DELETED, false),
            )
            .await?;
        let assignments: Vec<Assignment> = self
            .find_decoded(
                collections::ASSIGNMENTS,
                &Filter::new()
                    .with_eq(fields::ACADEMY_ID, class.academy_id.as_str())
                    .with_eq(fields::CLASS_ID, class_id),
            )
            .await?;
        let submissions: Vec<Submission> = self
            .find_decoded(
                collections::SUBMISSIONS,
                &Filter::new()
                    .with_eq(fields::ACADEMY_ID, class.academy_id.as_str())
                    .with_eq(fields::IS_DELETED, false),
            )
            .await?;

        let mut rows = Vec::with_capacity(students.len() * assignments.len());
        for student in &students {
            for assignment in &assignments {
                let submission = submissions.iter().find(|s| {
                    s.student_id == student.id && s.assignment_id.as_deref() == Some(&assignment.id)
                });
                rows.push(AssignmentStatusRow {
                    student_id: student.id.clone(),
                    student_name: student.student_name.clone(),
                    assignment_id: assignment.id.clone(),
                    title: assignment.title.clone(),
                    due_date: assignment.due_date,
                    outcome: outcome_for(assignment.due_date, submission, as_of),
                });
            }
        }
        Ok(rows)
    }

    // ---- question bank (read-only reference data) ----

    /// Fetch questions by id for submission detail rendering. Ids that no
    /// longer exist in the bank are skipped.
    pub async fn questions_by_ids(&self, ids: &[String]) -> ProviderResult<Vec<Question>> {
        let mut questions = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(doc) = self
                .store
                .get(collections::QUESTION_BANK, id)
                .await
                .map_err(ProviderError::storage)?
            {
                questions.push(model::from_document(&doc).map_err(ProviderError::storage)?);
            }
        }
        Ok(questions)
    }

    // ---- dashboard ----

    pub async fn dashboard_counts(
        &self,
        viewer: &Viewer,
        selected_tenant: Option<&str>,
    ) -> ProviderResult<DashboardCounts> {
        let scope = Self::scope(viewer, selected_tenant)?;

        let pending_students = self
            .scoped_count(
                collections::STUDENTS,
                &scope,
                Filter::new()
                    .with_eq(fields::IS_DELETED, false)
                    .with_eq(fields::STATUS, StudentStatus::Pending.as_str()),
            )
            .await?;
        let active_students = self
            .scoped_count(
                collections::STUDENTS,
                &scope,
                Filter::new()
                    .with_eq(fields::IS_DELETED, false)
                    .with_eq(fields::STATUS, StudentStatus::Active.as_str()),
            )
            .await?;
        let classes = self
            .scoped_count(
                collections::CLASSES,
                &scope,
                Filter::new().with_eq(fields::IS_DELETED, false),
            )
            .await?;
        let submissions = self
            .scoped_count(
                collections::SUBMISSIONS,
                &scope,
                Filter::new().with_eq(fields::IS_DELETED, false),
            )
            .await?;
        let academies = match &scope {
            TenantScope::Unscoped => Some(
                self.store
                    .count(
                        collections::ACADEMIES,
                        &Filter::new().with_eq(fields::IS_DELETED, false),
                    )
                    .await
                    .map_err(ProviderError::storage)?,
            ),
            TenantScope::Tenant(_) => None,
        };

        Ok(DashboardCounts {
            pending_students,
            active_students,
            classes,
            academies,
            submissions,
        })
    }

    async fn scoped_count(
        &self,
        collection: &str,
        scope: &TenantScope,
        filter: Filter,
    ) -> ProviderResult<usize> {
        self.store
            .count(collection, &scope.apply(filter))
            .await
            .map_err(ProviderError::storage)
    }

    // ---- live views ----

    /// Live view of active classes in scope.
    pub async fn watch_classes(
        &self,
        viewer: &Viewer,
        selected_tenant: Option<&str>,
    ) -> ProviderResult<Subscription> {
        let scope = Self::scope(viewer, selected_tenant)?;
        let filter = scope.apply(Filter::new().with_eq(fields::IS_DELETED, false));
        self.store
            .subscribe(collections::CLASSES, filter)
            .await
            .map_err(ProviderError::storage)
    }

    /// Live view of students in scope (all statuses, not deleted).
    pub async fn watch_students(
        &self,
        viewer: &Viewer,
        selected_tenant: Option<&str>,
    ) -> ProviderResult<Subscription> {
        let scope = Self::scope(viewer, selected_tenant)?;
        let filter = scope.apply(Filter::new().with_eq(fields::IS_DELETED, false));
        self.store
            .subscribe(collections::STUDENTS, filter)
            .await
            .map_err(ProviderError::storage)
    }

    /// Live view of visible submissions in scope, newest first.
    pub async fn watch_submissions(
        &self,
        viewer: &Viewer,
        selected_tenant: Option<&str>,
    ) -> ProviderResult<Subscription> {
        let scope = Self::scope(viewer, selected_tenant)?;
        let filter = scope.apply(
            Filter::new()
                .with_eq(fields::IS_DELETED, false)
                .order_by(fields::CREATED_AT, SortOrder::Descending),
        );
        self.store
            .subscribe(collections::SUBMISSIONS, filter)
            .await
            .map_err(ProviderError::storage)
    }
}

fn outcome_for(
    due_date: DateTime<Utc>,
    submission: Option<&Submission>,
    as_of: DateTime<Utc>,
) -> AssignmentOutcome {
    match submission {
        Some(s) => AssignmentOutcome::Submitted {
            score: s.score,
            late: s.created_at > due_date,
        },
        None if as_of > due_date => AssignmentOutcome::Missing,
        None => AssignmentOutcome::Pending,
    }
}

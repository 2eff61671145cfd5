//! Lookups into the student, course and admin records owned by the CRUD side
//! of the application.

use crate::error::{CertError, Result};
use crate::identifier::normalize_course_code;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[async_trait]
pub trait Directory: Send + Sync {
    /// Identity string bound into the verification digest. Must not change
    /// for the lifetime of the student's certificates.
    async fn student_identity(&self, student_ref: &str) -> Result<String>;

    /// Two-letter uppercase course code.
    async fn course_code(&self, course_ref: &str) -> Result<String>;

    /// Display name of the course, for reports.
    async fn course_name(&self, course_ref: &str) -> Result<String>;

    /// Reference recorded as the issuer or revoker of a certificate.
    async fn admin(&self, admin_ref: &str) -> Result<String>;
}

#[derive(Default)]
pub struct MemoryDirectory {
    students: Arc<RwLock<HashMap<String, String>>>,
    courses: Arc<RwLock<HashMap<String, String>>>,
    course_names: Arc<RwLock<HashMap<String, String>>>,
    admins: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_student(&self, student_ref: &str, identity: &str) {
        self.students
            .write()
            .await
            .insert(student_ref.to_string(), identity.to_string());
    }

    pub async fn add_course(&self, course_ref: &str, course_code: &str) -> Result<()> {
        let code = normalize_course_code(course_code)?;
        self.courses
            .write()
            .await
            .insert(course_ref.to_string(), code);
        Ok(())
    }

    /// Like `add_course`, with a display name. Courses added without one
    /// report their code as the name.
    pub async fn add_course_named(
        &self,
        course_ref: &str,
        course_code: &str,
        name: &str,
    ) -> Result<()> {
        self.add_course(course_ref, course_code).await?;
        self.course_names
            .write()
            .await
            .insert(course_ref.to_string(), name.to_string());
        Ok(())
    }

    pub async fn add_admin(&self, admin_ref: &str, issuer: &str) {
        self.admins
            .write()
            .await
            .insert(admin_ref.to_string(), issuer.to_string());
    }
}

fn unknown(kind: &'static str, id: &str) -> CertError {
    CertError::UnknownReference {
        kind,
        id: id.to_string(),
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn student_identity(&self, student_ref: &str) -> Result<String> {
        self.students
            .read()
            .await
            .get(student_ref)
            .cloned()
            .ok_or_else(|| unknown("student", student_ref))
    }

    async fn course_code(&self, course_ref: &str) -> Result<String> {
        self.courses
            .read()
            .await
            .get(course_ref)
            .cloned()
            .ok_or_else(|| unknown("course", course_ref))
    }

    async fn course_name(&self, course_ref: &str) -> Result<String> {
        if let Some(name) = self.course_names.read().await.get(course_ref) {
            return Ok(name.clone());
        }
        self.course_code(course_ref).await
    }

    async fn admin(&self, admin_ref: &str) -> Result<String> {
        self.admins
            .read()
            .await
            .get(admin_ref)
            .cloned()
            .ok_or_else(|| unknown("admin", admin_ref))
    }
}

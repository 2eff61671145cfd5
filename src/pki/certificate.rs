use crate::identifier::ParsedIdentifier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_REVOCATION_REASON: &str = "No reason provided";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub identifier: String,
    pub student_ref: String,
    pub course_ref: String,
    pub issuer_ref: String,
    pub issue_year: i32,
    pub course_code: String,
    pub sequence: u32,
    pub digest: String,
    pub status: CertificateStatus,
    pub issued_at: DateTime<Utc>,
    /// Present exactly when `status` is `Revoked`.
    pub revocation: Option<Revocation>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revocation {
    pub revoked_at: DateTime<Utc>,
    pub revoked_by: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateStatus {
    Active,
    Revoked,
    Suspended,
    Expired,
}

impl CertificateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateStatus::Active => "active",
            CertificateStatus::Revoked => "revoked",
            CertificateStatus::Suspended => "suspended",
            CertificateStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to mint a certificate except its sequence number,
/// which only the store may hand out.
#[derive(Debug, Clone)]
pub struct IssueRequest {
    pub student_ref: String,
    pub course_ref: String,
    pub issuer_ref: String,
    pub year: i32,
    pub course_code: String,
    pub issued_at: DateTime<Utc>,
}

impl Certificate {
    pub fn new_active(request: &IssueRequest, parsed: ParsedIdentifier) -> Self {
        Self {
            identifier: parsed.to_string(),
            student_ref: request.student_ref.clone(),
            course_ref: request.course_ref.clone(),
            issuer_ref: request.issuer_ref.clone(),
            issue_year: parsed.year,
            course_code: parsed.course_code,
            sequence: parsed.sequence,
            digest: parsed.digest,
            status: CertificateStatus::Active,
            issued_at: request.issued_at,
            revocation: None,
            notes: None,
        }
    }

    /// `YYYY-CC-NNNN`, the identifier without its digest.
    pub fn base(&self) -> String {
        format!("{:04}-{}-{:04}", self.issue_year, self.course_code, self.sequence)
    }

    pub fn is_active(&self) -> bool {
        self.status == CertificateStatus::Active
    }

    /// Revoked copy of an active certificate. Callers check the current
    /// status first.
    pub fn revoked(&self, revoked_by: &str, reason: Option<&str>, at: DateTime<Utc>) -> Self {
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REVOCATION_REASON);
        Self {
            status: CertificateStatus::Revoked,
            revocation: Some(Revocation {
                revoked_at: at,
                revoked_by: revoked_by.to_string(),
                reason: reason.to_string(),
            }),
            ..self.clone()
        }
    }

    pub fn suspended(&self, reason: &str) -> Self {
        Self {
            status: CertificateStatus::Suspended,
            notes: Some(reason.to_string()),
            ..self.clone()
        }
    }

    /// Status and revocation details agree.
    pub fn is_consistent(&self) -> bool {
        (self.status == CertificateStatus::Revoked) == self.revocation.is_some()
    }
}

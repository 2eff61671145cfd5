use crate::pki::CertificateStatus;
use thiserror::Error;

/// Errors surfaced by the identifier engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CertError {
    #[error("invalid certificate identifier format: {0:?}")]
    InvalidFormat(String),

    #[error("certificate not found: {0}")]
    NotFound(String),

    #[error("student {student_ref} already holds active certificate {existing} for course {course_ref}")]
    DuplicateCertificate {
        student_ref: String,
        course_ref: String,
        existing: String,
    },

    #[error("certificate {0} is already revoked")]
    AlreadyRevoked(String),

    #[error("certificate {0} failed authenticity check")]
    AuthenticityMismatch(String),

    #[error("certificate {identifier} is {status}")]
    NotActive {
        identifier: String,
        status: CertificateStatus,
    },

    #[error("cannot move certificate {identifier} from {from} to {to}")]
    InvalidTransition {
        identifier: String,
        from: CertificateStatus,
        to: CertificateStatus,
    },

    #[error("sequence space exhausted for {year}-{course_code}")]
    SequenceExhausted { year: i32, course_code: String },

    #[error("course code must be exactly two ASCII letters, got {0:?}")]
    InvalidCourseCode(String),

    #[error("year {0} does not fit in four digits")]
    InvalidYear(i32),

    #[error("unknown {kind} reference: {id}")]
    UnknownReference { kind: &'static str, id: String },

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl CertError {
    /// Only infrastructure failures are worth retrying; everything else is
    /// a property of the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CertError::StorageUnavailable(_))
    }
}

impl From<serde_json::Error> for CertError {
    fn from(e: serde_json::Error) -> Self {
        CertError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_storage_errors_are_retryable() {
        assert!(CertError::StorageUnavailable("down".into()).is_retryable());
        assert!(!CertError::NotFound("2025-CS-0001-ABCDEF".into()).is_retryable());
        assert!(!CertError::AuthenticityMismatch("2025-CS-0001-ABCDEF".into()).is_retryable());
    }

    #[test]
    fn not_active_message_uses_lowercase_status() {
        let err = CertError::NotActive {
            identifier: "2025-CS-0001-ABCDEF".into(),
            status: CertificateStatus::Suspended,
        };
        assert_eq!(err.to_string(), "certificate 2025-CS-0001-ABCDEF is suspended");
    }
}

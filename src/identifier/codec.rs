//! Certificate identifier codec: `YYYY-CC-NNNN-VVVVVV`.

use crate::error::{CertError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const IDENTIFIER_LEN: usize = 19;
pub const BASE_LEN: usize = 12;
pub const DIGEST_LEN: usize = 6;
pub const COURSE_CODE_LEN: usize = 2;
pub const MAX_SEQUENCE: u32 = 9999;
const MAX_YEAR: i32 = 9999;

/// Decoded components of a well-formed identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParsedIdentifier {
    pub year: i32,
    pub course_code: String,
    pub sequence: u32,
    pub digest: String,
}

impl ParsedIdentifier {
    /// The identifier without its digest suffix.
    pub fn base(&self) -> String {
        format!("{:04}-{}-{:04}", self.year, self.course_code, self.sequence)
    }
}

impl fmt::Display for ParsedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.base(), self.digest)
    }
}

/// Uppercases and checks a course code. Anything other than two ASCII
/// letters is rejected.
pub fn normalize_course_code(course_code: &str) -> Result<String> {
    let upper = course_code.to_ascii_uppercase();
    if upper.len() != COURSE_CODE_LEN || !upper.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(CertError::InvalidCourseCode(course_code.to_string()));
    }
    Ok(upper)
}

pub fn format_base(year: i32, course_code: &str, sequence: u32) -> Result<String> {
    if !(0..=MAX_YEAR).contains(&year) {
        return Err(CertError::InvalidYear(year));
    }
    let course_code = normalize_course_code(course_code)?;
    if sequence > MAX_SEQUENCE {
        return Err(CertError::SequenceExhausted { year, course_code });
    }
    if sequence == 0 {
        return Err(CertError::InvalidFormat(format!(
            "{year:04}-{course_code}-0000"
        )));
    }
    Ok(format!("{year:04}-{course_code}-{sequence:04}"))
}

pub fn format_full(base: &str, digest: &str) -> Result<String> {
    let full = format!("{base}-{digest}");
    if !validate_format(&full) {
        return Err(CertError::InvalidFormat(full));
    }
    Ok(full)
}

/// Exact match against `^\d{4}-[A-Z]{2}-\d{4}-[A-Z0-9]{6}$`.
pub fn validate_format(identifier: &str) -> bool {
    let b = identifier.as_bytes();
    if b.len() != IDENTIFIER_LEN {
        return false;
    }
    let digits = |r: std::ops::Range<usize>| b[r].iter().all(u8::is_ascii_digit);

    digits(0..4)
        && b[4] == b'-'
        && b[5..7].iter().all(u8::is_ascii_uppercase)
        && b[7] == b'-'
        && digits(8..12)
        && b[12] == b'-'
        && b[13..19]
            .iter()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

/// Returns `None` for anything `validate_format` rejects.
pub fn parse(identifier: &str) -> Option<ParsedIdentifier> {
    if !validate_format(identifier) {
        return None;
    }
    Some(ParsedIdentifier {
        year: identifier[0..4].parse().ok()?,
        course_code: identifier[5..7].to_string(),
        sequence: identifier[8..12].parse().ok()?,
        digest: identifier[13..].to_string(),
    })
}

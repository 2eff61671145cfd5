use crate::error::{CertError, Result};
use crate::identifier::{MAX_SEQUENCE, normalize_course_code};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SequenceKey {
    pub year: i32,
    pub course_code: String,
}

impl SequenceKey {
    pub fn new(year: i32, course_code: &str) -> Result<Self> {
        Ok(Self {
            year,
            course_code: normalize_course_code(course_code)?,
        })
    }
}

/// Per (year, course code) high-water marks.
///
/// `next_sequence` takes `&mut self`, so a store can only call it while it
/// holds exclusive access to its state. That exclusive section is the atomic
/// unit that also inserts the certificate.
#[derive(Debug, Default)]
pub struct SequenceAllocator {
    high_water: HashMap<SequenceKey, u32>,
}

impl SequenceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves and returns the next sequence for the pair. A reserved value
    /// is never handed out again, even if the caller fails to use it.
    pub fn next_sequence(&mut self, year: i32, course_code: &str) -> Result<u32> {
        let key = SequenceKey::new(year, course_code)?;
        let next = self.current(&key) + 1;
        if next > MAX_SEQUENCE {
            return Err(CertError::SequenceExhausted {
                year,
                course_code: key.course_code,
            });
        }
        self.high_water.insert(key, next);
        Ok(next)
    }

    /// Records a sequence already in use, e.g. when loading existing rows.
    pub fn observe(&mut self, key: SequenceKey, sequence: u32) {
        let mark = self.high_water.entry(key).or_insert(0);
        *mark = (*mark).max(sequence);
    }

    pub fn current(&self, key: &SequenceKey) -> u32 {
        self.high_water.get(key).copied().unwrap_or(0)
    }
}

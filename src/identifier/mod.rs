pub mod codec;

pub use codec::{
    MAX_SEQUENCE, ParsedIdentifier, format_base, format_full, normalize_course_code, parse,
    validate_format,
};

pub mod digest;
pub mod pepper;

pub use digest::compute as compute_digest;
pub use pepper::Pepper;

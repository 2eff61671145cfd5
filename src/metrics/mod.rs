pub mod stats;

pub use stats::CertificateStats;

use crate::directory::Directory;
use crate::error::{CertError, Result};
use crate::pki::Certificate;
use crate::store::CertificateStore;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Issuance counts for one calendar year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateStats {
    pub timestamp: String,
    pub year: i32,
    pub total_certificates: usize,
    pub by_course: BTreeMap<String, usize>,
    /// Course code to display name. Filled by `collect_with_names`; codes
    /// without an entry are shown bare.
    #[serde(default)]
    pub course_names: BTreeMap<String, String>,
    pub by_status: BTreeMap<String, usize>,
}

impl CertificateStats {
    pub fn from_certificates<'a>(
        year: i32,
        certs: impl IntoIterator<Item = &'a Certificate>,
    ) -> Self {
        let mut stats = Self {
            timestamp: Utc::now().to_rfc3339(),
            year,
            total_certificates: 0,
            by_course: BTreeMap::new(),
            course_names: BTreeMap::new(),
            by_status: BTreeMap::new(),
        };

        for cert in certs.into_iter().filter(|c| c.issue_year == year) {
            stats.total_certificates += 1;
            *stats.by_course.entry(cert.course_code.clone()).or_insert(0) += 1;
            *stats
                .by_status
                .entry(cert.status.as_str().to_string())
                .or_insert(0) += 1;
        }

        stats
    }

    pub async fn collect(store: &dyn CertificateStore, year: i32) -> Result<Self> {
        let certs = store.list_by_year(year).await?;
        Ok(Self::from_certificates(year, &certs))
    }

    /// Same as `collect`, plus course names resolved through the directory.
    /// A course the directory no longer knows keeps its bare code.
    pub async fn collect_with_names(
        store: &dyn CertificateStore,
        directory: &dyn Directory,
        year: i32,
    ) -> Result<Self> {
        let certs = store.list_by_year(year).await?;
        let mut stats = Self::from_certificates(year, &certs);

        let mut course_refs: BTreeMap<&str, &str> = BTreeMap::new();
        for cert in &certs {
            course_refs
                .entry(cert.course_code.as_str())
                .or_insert(cert.course_ref.as_str());
        }
        for (code, course_ref) in course_refs {
            match directory.course_name(course_ref).await {
                Ok(name) => {
                    stats.course_names.insert(code.to_string(), name);
                }
                Err(CertError::UnknownReference { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(stats)
    }

    fn course_label(&self, code: &str) -> &str {
        self.course_names.get(code).map(String::as_str).unwrap_or("")
    }

    pub fn print_report(&self) {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║          Certificate Issuance Report {:<16} ║", self.year);
        println!("╠═══════════════════════════════════════════════════════╣");
        println!("║ Generated: {:<42} ║", self.timestamp);
        println!("║ Total certificates: {:<33} ║", self.total_certificates);
        println!("║                                                       ║");
        println!("║ By course                                             ║");
        for (course, count) in &self.by_course {
            println!(
                "║    → {:<4} {:<28} {:<14} ║",
                course,
                self.course_label(course),
                count
            );
        }
        println!("║                                                       ║");
        println!("║ By status                                             ║");
        for (status, count) in &self.by_status {
            println!("║    → {:<10} {:<37} ║", status, count);
        }
        println!("╚═══════════════════════════════════════════════════════╝\n");
    }

    /// One row per bucket: `year,dimension,key,count,label`. `label` carries
    /// the course name on course rows and is empty elsewhere.
    pub fn save_to_csv(
        &self,
        path: impl AsRef<Path>,
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record(["year", "dimension", "key", "count", "label"])?;

        let year = self.year.to_string();
        let total = self.total_certificates.to_string();
        wtr.write_record([year.as_str(), "total", "all", total.as_str(), ""])?;
        for (course, count) in &self.by_course {
            let count = count.to_string();
            wtr.write_record([
                year.as_str(),
                "course",
                course.as_str(),
                count.as_str(),
                self.course_label(course),
            ])?;
        }
        for (status, count) in &self.by_status {
            let count = count.to_string();
            wtr.write_record([year.as_str(), "status", status.as_str(), count.as_str(), ""])?;
        }

        wtr.flush()?;
        Ok(())
    }
}

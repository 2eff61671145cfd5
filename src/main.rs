use csl_cert::{
    CachingStore, CertError, CertificateEngine, CertificateStats, CertificateStore, EngineConfig,
    LogAuditSink, MemoryDirectory, MemoryStore, Pepper,
};

use chrono::{Datelike, Utc};
use log::warn;
use std::sync::Arc;
use tokio::time::Instant;

const STUDENTS: usize = 200;

fn load_config() -> anyhow::Result<EngineConfig> {
    if let Some(path) = std::env::args().nth(1) {
        return Ok(EngineConfig::load(path)?);
    }
    match EngineConfig::from_env() {
        Ok(config) => Ok(config),
        Err(CertError::Config(reason)) => {
            warn!("{reason}; using a throwaway pepper, identifiers will not verify after restart");
            Ok(EngineConfig::new(Pepper::generate()))
        }
        Err(e) => Err(e.into()),
    }
}

async fn seed_directory(directory: &MemoryDirectory) -> anyhow::Result<()> {
    directory
        .add_course_named("course-cs", "CS", "Computer Science")
        .await?;
    directory
        .add_course_named("course-wd", "wd", "Web Development")
        .await?;
    directory.add_admin("admin-1", "registrar").await;
    for i in 0..STUDENTS {
        directory
            .add_student(&format!("STU-{i:04}"), &format!("CSL-STUDENT-{i:04}"))
            .await;
    }
    Ok(())
}

fn flip_last_char(identifier: &str) -> String {
    let mut chars: Vec<char> = identifier.chars().collect();
    if let Some(last) = chars.last_mut() {
        *last = if *last == 'A' { 'B' } else { 'A' };
    }
    chars.into_iter().collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("\n");
    println!("╔═══════════════════════════════════════════════════════╗");
    println!("║                                                       ║");
    println!("║     Certificate Identifier & Verification Engine      ║");
    println!("║                                                       ║");
    println!("╚═══════════════════════════════════════════════════════╝");
    println!("\n");

    let config = load_config()?;
    let directory = Arc::new(MemoryDirectory::new());
    seed_directory(&directory).await?;

    let store = Arc::new(CachingStore::new(MemoryStore::new(), config.cache_capacity));
    let engine = Arc::new(CertificateEngine::new(
        &config,
        store.clone(),
        directory.clone(),
        Arc::new(LogAuditSink),
    ));

    println!("[1/4] Issuing {} certificates concurrently...", STUDENTS);
    let start = Instant::now();
    let mut handles = Vec::with_capacity(STUDENTS);
    for i in 0..STUDENTS {
        let engine = engine.clone();
        let course = if i % 3 == 0 { "course-wd" } else { "course-cs" };
        handles.push(tokio::spawn(async move {
            engine
                .lifecycle
                .issue(&format!("STU-{i:04}"), course, "admin-1")
                .await
        }));
    }

    let mut issued = Vec::with_capacity(STUDENTS);
    for handle in handles {
        match handle.await? {
            Ok(cert) => issued.push(cert),
            Err(e) => println!("      ✗ issuance failed: {}", e),
        }
    }
    let elapsed = start.elapsed();
    println!(
        "      ✓ Issued {} in {:.2} ms ({:.0} certs/sec)\n",
        issued.len(),
        elapsed.as_secs_f64() * 1000.0,
        issued.len() as f64 / elapsed.as_secs_f64()
    );

    let Some(sample) = issued.first().cloned() else {
        anyhow::bail!("no certificate was issued");
    };

    println!("[2/4] Verifying {}...", sample.identifier);
    let outcome = engine.verifier.verify(&sample.identifier).await?;
    println!("      ✓ {} (valid: {})\n", outcome.reason, outcome.valid);

    let forged = flip_last_char(&sample.identifier);
    println!("[3/4] Verifying altered identifier {}...", forged);
    let outcome = engine.verifier.verify(&forged).await?;
    println!("      ✓ {} (valid: {})\n", outcome.reason, outcome.valid);

    println!("[4/4] Revoking {}...", sample.identifier);
    engine
        .lifecycle
        .revoke(&sample.identifier, "admin-1", Some("issued in error"))
        .await?;
    let outcome = engine.verifier.verify(&sample.identifier).await?;
    println!("      ✓ {} (valid: {})\n", outcome.reason, outcome.valid);

    let stats =
        CertificateStats::collect_with_names(store.as_ref(), directory.as_ref(), Utc::now().year())
            .await?;
    stats.print_report();
    println!("Lookup cache hit rate: {:.1}%", store.hit_rate());

    match stats.save_to_csv("certificate_stats.csv") {
        Ok(_) => println!("✓ Stats saved to certificate_stats.csv"),
        Err(e) => println!("✗ Error saving certificate_stats.csv: {}", e),
    }

    // Sanity check that every issued identifier is distinct.
    let mut seen = std::collections::HashSet::new();
    for cert in store.list_by_year(Utc::now().year()).await? {
        if !seen.insert(cert.identifier.clone()) {
            anyhow::bail!("duplicate identifier {}", cert.identifier);
        }
    }
    println!();
    Ok(())
}

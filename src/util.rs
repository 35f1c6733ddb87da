use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn utc_compact_string(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn sha256_text(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 8192];

    loop {
        let count = file.read(&mut buf)?;
        if count == 0 {
            break;
        }
        hasher.update(&buf[..count]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let data = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;

    let mut file = File::create(path)
        .with_context(|| format!("failed to create json file: {}", path.display()))?;
    file.write_all(&data)
        .with_context(|| format!("failed to write json file: {}", path.display()))?;
    file.write_all(b"\n")
        .with_context(|| format!("failed to finalize json file: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_text_is_stable_hex() {
        let digest = sha256_text("Section 1. Definitions");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, sha256_text("Section 1. Definitions"));
        assert_ne!(digest, sha256_text("Section 2. Definitions"));
    }

    #[test]
    fn sha256_file_matches_text_digest() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("bill.txt");
        fs::write(&path, "In this Act...").expect("fixture should be written");

        let digest = sha256_file(&path).expect("file should hash");
        assert_eq!(digest, sha256_text("In this Act..."));
    }

    #[test]
    fn write_json_pretty_creates_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("manifests").join("run.json");

        write_json_pretty(&path, &serde_json::json!({ "clauses": 2 }))
            .expect("manifest should be written");

        let raw = fs::read_to_string(&path).expect("manifest should be readable");
        assert!(raw.contains("\"clauses\": 2"));
        assert!(raw.ends_with('\n'));
    }
}

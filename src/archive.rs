use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::ZipArchive;

use crate::error::Result;

const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// Raw bytes of every `.class` entry in a jar, in archive order.
pub fn class_entries(path: &Path) -> Result<Vec<(String, Vec<u8>)>> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)?;
    let mut entries = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() || !entry.name().ends_with(".class") {
            continue;
        }
        let name = entry.name().to_string();
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data)?;
        entries.push((name, data));
    }
    debug!(
        jar = %path.display(),
        classes = entries.len(),
        "enumerated archive"
    );
    Ok(entries)
}

/// Names of every `.class` entry in a jar, without reading the payloads.
pub fn class_entry_names(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)?;
    let archive = ZipArchive::new(file)?;
    Ok(archive
        .file_names()
        .filter(|name| name.ends_with(".class"))
        .map(str::to_string)
        .collect())
}

/// `Class-Path:` entries from a jar's manifest, resolved against the jar's
/// directory. A jar without a manifest or without the header yields nothing.
pub fn manifest_class_path(path: &Path) -> Result<Vec<PathBuf>> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)?;
    let Ok(mut entry) = archive.by_name(MANIFEST_PATH) else {
        return Ok(Vec::new());
    };
    let mut content = String::new();
    entry.read_to_string(&mut content)?;
    Ok(parse_manifest_class_path(path, &content))
}

/// Fold RFC 822-style continuation lines and pull out `Class-Path:`.
fn parse_manifest_class_path(jar_path: &Path, content: &str) -> Vec<PathBuf> {
    let mut class_path = None;
    let mut current_key: Option<String> = None;
    let mut current_value = String::new();

    for raw_line in content.lines() {
        let line = raw_line.trim_end_matches('\r');
        if let Some(continuation) = line.strip_prefix(' ') {
            if current_key.is_some() {
                current_value.push_str(continuation);
            }
            continue;
        }

        if let Some(key) = current_key.take() {
            if key == "Class-Path" {
                class_path = Some(current_value.clone());
            }
            current_value.clear();
        }

        if let Some((key, value)) = line.split_once(':') {
            current_key = Some(key.trim().to_string());
            current_value.push_str(value.trim_start());
        }
    }
    if let Some(key) = current_key.take() {
        if key == "Class-Path" {
            class_path = Some(current_value);
        }
    }

    let Some(class_path) = class_path else {
        return Vec::new();
    };

    let base_dir = jar_path.parent().unwrap_or_else(|| Path::new(""));
    class_path
        .split_whitespace()
        .map(|entry| {
            let entry_path = PathBuf::from(entry);
            if entry_path.is_absolute() {
                entry_path
            } else {
                base_dir.join(entry_path)
            }
        })
        .collect()
}

pub fn is_jar_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("jar"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use zip::write::SimpleFileOptions;

    use crate::error::ClassError;

    fn write_jar(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).expect("create jar");
        let mut writer = zip::ZipWriter::new(file);
        for (name, data) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .expect("start entry");
            writer.write_all(data).expect("write entry");
        }
        writer.finish().expect("finish jar");
    }

    #[test]
    fn lists_class_entries_in_archive_order() {
        let dir = tempfile::tempdir().expect("temp dir");
        let jar = dir.path().join("sample.jar");
        write_jar(
            &jar,
            &[
                ("b/Second.class", b"second"),
                ("README.txt", b"not a class"),
                ("a/First.class", b"first"),
            ],
        );

        let entries = class_entries(&jar).expect("entries");

        assert_eq!(
            entries,
            vec![
                ("b/Second.class".to_string(), b"second".to_vec()),
                ("a/First.class".to_string(), b"first".to_vec()),
            ]
        );
    }

    #[test]
    fn rejects_non_zip_input() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("broken.jar");
        std::fs::write(&path, b"not a zip").expect("write file");

        let err = class_entries(&path).expect_err("bad archive");
        assert!(matches!(err, ClassError::BadArchive(_)));
    }

    #[test]
    fn parses_manifest_class_path_with_continuations() {
        let dir = tempfile::tempdir().expect("temp dir");
        let jar = dir.path().join("app.jar");
        let manifest = "Manifest-Version: 1.0\r\nClass-Path: lib/first.jar \r\n lib/second.jar\r\nMain-Class: App\r\n\r\n";
        write_jar(&jar, &[(MANIFEST_PATH, manifest.as_bytes())]);

        let class_path = manifest_class_path(&jar).expect("class path");

        assert_eq!(
            class_path,
            vec![
                dir.path().join("lib/first.jar"),
                dir.path().join("lib/second.jar"),
            ]
        );
    }

    #[test]
    fn missing_manifest_yields_empty_class_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let jar = dir.path().join("bare.jar");
        write_jar(&jar, &[("A.class", b"x")]);

        assert!(manifest_class_path(&jar).expect("class path").is_empty());
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::archive;
use crate::class_file::ClassFile;
use crate::error::{ClassError, Result};
use crate::pipeline::{Origin, SymbolRecord};
use crate::symbols;

/// Parsed classes from the command-line inputs. A failure inside one input
/// is reported to stderr and counted; the scan continues.
pub struct ScanOutput {
    pub classes: Vec<(Origin, ClassFile)>,
    pub error_count: usize,
}

/// Symbols extracted from the command-line inputs.
pub struct SymbolScan {
    pub records: Vec<SymbolRecord>,
    pub error_count: usize,
}

/// Parse every `.class` and `.jar` input, in command-line order.
pub fn scan_class_files(paths: &[PathBuf]) -> ScanOutput {
    let mut classes = Vec::new();
    let mut error_count = 0;
    for path in paths {
        if let Err(err) = scan_path(path, &mut classes, &mut error_count) {
            eprintln!("{}: {err}", path.display());
            error_count += 1;
        }
    }
    debug!(classes = classes.len(), errors = error_count, "scanned inputs");
    ScanOutput {
        classes,
        error_count,
    }
}

/// Parse inputs and extract their symbols, preserving discovery order.
pub fn scan_symbols(paths: &[PathBuf]) -> SymbolScan {
    let scan = scan_class_files(paths);
    let mut records = Vec::new();
    let mut error_count = scan.error_count;
    for (origin, class) in &scan.classes {
        match symbols::extract_symbols(class) {
            Ok(extracted) => {
                records.extend(extracted.into_iter().map(|symbol| SymbolRecord {
                    origin: origin.clone(),
                    symbol,
                }));
            }
            Err(err) => {
                eprintln!("{}: {err}", origin.label());
                error_count += 1;
            }
        }
    }
    SymbolScan {
        records,
        error_count,
    }
}

fn scan_path(
    path: &Path,
    classes: &mut Vec<(Origin, ClassFile)>,
    error_count: &mut usize,
) -> Result<()> {
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");
    match extension {
        "class" => {
            let data = fs::read(path)?;
            let class = ClassFile::parse(&data)?;
            classes.push((Origin::file(path.to_string_lossy()), class));
            Ok(())
        }
        "jar" => {
            for (name, data) in archive::class_entries(path)? {
                let origin = Origin::jar_entry(path.to_string_lossy(), name);
                match ClassFile::parse(&data) {
                    Ok(class) => classes.push((origin, class)),
                    Err(err) => {
                        eprintln!("{}: {err}", origin.label());
                        *error_count += 1;
                    }
                }
            }
            Ok(())
        }
        _ => Err(ClassError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "unsupported input file (expected .class or .jar)",
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use zip::write::SimpleFileOptions;

    use crate::symbols::SymbolKind;
    use crate::testutil::ClassFileBuilder;

    fn sample_class(name: &str) -> Vec<u8> {
        let mut builder = ClassFileBuilder::new(name, "java/lang/Object");
        builder.add_method(0x0001, "run", "()V", vec![0xB1], 0, 1);
        builder.finish()
    }

    #[test]
    fn scans_class_file_input() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("Foo.class");
        fs::write(&path, sample_class("Foo")).expect("write class");

        let scan = scan_symbols(&[path]);

        assert_eq!(scan.error_count, 0);
        assert_eq!(scan.records.len(), 2);
        assert_eq!(scan.records[0].symbol.kind, SymbolKind::Class);
        assert_eq!(scan.records[0].symbol.name, "Foo");
    }

    #[test]
    fn scans_jar_entries_and_keeps_going_past_bad_ones() {
        let dir = tempfile::tempdir().expect("temp dir");
        let jar = dir.path().join("mixed.jar");
        let file = fs::File::create(&jar).expect("create jar");
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file("Bad.class", SimpleFileOptions::default())
            .expect("start entry");
        writer.write_all(b"not a class").expect("write entry");
        writer
            .start_file("Good.class", SimpleFileOptions::default())
            .expect("start entry");
        writer
            .write_all(&sample_class("Good"))
            .expect("write entry");
        writer.finish().expect("finish jar");

        let scan = scan_class_files(&[jar.clone()]);

        assert_eq!(scan.error_count, 1);
        assert_eq!(scan.classes.len(), 1);
        assert_eq!(
            scan.classes[0].0.label(),
            format!("{}(Good.class)", jar.display())
        );
    }

    #[test]
    fn counts_missing_input_as_error() {
        let scan = scan_class_files(&[PathBuf::from("absent.class")]);
        assert_eq!(scan.error_count, 1);
        assert!(scan.classes.is_empty());
    }

    #[test]
    fn rejects_unsupported_extension() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"text").expect("write file");

        let scan = scan_class_files(&[path]);

        assert_eq!(scan.error_count, 1);
    }
}

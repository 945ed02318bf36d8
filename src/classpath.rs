use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::archive;

/// Mapping from fully-qualified dotted class name to the jar or directory
/// that supplies it. First writer wins, giving classpath precedence.
#[derive(Debug, Default)]
pub struct ClasspathIndex {
    classes: BTreeMap<String, PathBuf>,
    packages: BTreeMap<String, BTreeSet<PathBuf>>,
}

impl ClasspathIndex {
    /// Index every `.class` entry of the given jars and directories, in
    /// order. Unreadable sources are skipped with a warning.
    pub fn build(sources: &[PathBuf]) -> Self {
        let mut index = ClasspathIndex::default();
        for source in sources {
            let absolute = source.canonicalize().unwrap_or_else(|_| source.clone());
            let result = if source.is_dir() {
                index.index_directory(&absolute, &absolute)
            } else {
                index.index_jar(&absolute)
            };
            if let Err(err) = result {
                warn!(source = %source.display(), "skipping classpath entry: {err:#}");
            }
        }
        debug!(classes = index.classes.len(), "built classpath index");
        index
    }

    pub fn lookup(&self, class_name: &str) -> Option<&Path> {
        self.classes.get(class_name).map(PathBuf::as_path)
    }

    /// Sources supplying any class in the given package.
    pub fn package_sources(&self, package: &str) -> Option<&BTreeSet<PathBuf>> {
        self.packages.get(package)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    fn index_jar(&mut self, jar: &Path) -> Result<()> {
        for name in archive::class_entry_names(jar)
            .with_context(|| format!("failed to read {}", jar.display()))?
        {
            self.insert(entry_to_class_name(&name), jar);
        }
        Ok(())
    }

    fn index_directory(&mut self, root: &Path, dir: &Path) -> Result<()> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)
            .with_context(|| format!("failed to read directory {}", dir.display()))?
        {
            let entry =
                entry.with_context(|| format!("failed to read entry under {}", dir.display()))?;
            entries.push(entry.path());
        }
        entries.sort();

        for entry in entries {
            if entry.is_dir() {
                self.index_directory(root, &entry)?;
            } else if entry.extension().and_then(|ext| ext.to_str()) == Some("class") {
                let relative = entry.strip_prefix(root).unwrap_or(&entry);
                self.insert(entry_to_class_name(&relative.to_string_lossy()), root);
            }
        }
        Ok(())
    }

    fn insert(&mut self, class_name: String, source: &Path) {
        self.packages
            .entry(package_of(&class_name).to_string())
            .or_default()
            .insert(source.to_path_buf());
        self.classes
            .entry(class_name)
            .or_insert_with(|| source.to_path_buf());
    }
}

/// Package part of a dotted class name; classes in the default package map
/// to the empty string.
pub fn package_of(class_name: &str) -> &str {
    match class_name.rfind('.') {
        Some(index) => &class_name[..index],
        None => "",
    }
}

fn entry_to_class_name(entry: &str) -> String {
    entry
        .trim_end_matches(".class")
        .replace(['/', std::path::MAIN_SEPARATOR], ".")
}

/// Split a `:`-separated classpath list.
pub fn parse_classpath(list: &str) -> Vec<PathBuf> {
    list.split(':')
        .filter(|entry| !entry.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Classpath precedence: explicit flag, then `$CLASSPATH`, then `"."`.
pub fn default_classpath(flag: Option<&str>) -> String {
    if let Some(list) = flag {
        return list.to_string();
    }
    match std::env::var("CLASSPATH") {
        Ok(value) if !value.is_empty() => value,
        _ => ".".to_string(),
    }
}

/// Expand a classpath with jars named transitively by `Class-Path:` manifest
/// headers, breadth-first, keeping first-seen order.
pub fn expand_classpath(initial: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut queue: VecDeque<PathBuf> = initial.into();
    let mut seen = BTreeSet::new();
    let mut result = Vec::new();
    while let Some(entry) = queue.pop_front() {
        if !seen.insert(entry.clone()) {
            continue;
        }
        if archive::is_jar_path(&entry) && entry.exists() {
            match archive::manifest_class_path(&entry) {
                Ok(referenced) => queue.extend(referenced),
                Err(err) => {
                    warn!(jar = %entry.display(), "failed to read manifest: {err}");
                }
            }
        }
        result.push(entry);
    }
    result
}

/// Helper jar that prints the running JVM's boot classpath; embedded in the
/// binary and materialized to a temp file for each probe.
const BOOT_PROBE_JAR: &[u8] = include_bytes!("assets/bootprobe.jar");

/// Discover the JVM boot classpath.
///
/// An explicit list wins. Otherwise a bundled helper jar is run under
/// `java -jar` and its `Boot-Class-Path:` / `Class-Path-Separator:` output
/// is parsed; on Darwin a fixed fallback list covers probe failure.
pub fn boot_classpath(explicit: Option<&str>) -> Result<Vec<PathBuf>> {
    if let Some(list) = explicit {
        return Ok(parse_classpath(list));
    }
    match probe_boot_classpath() {
        Ok(paths) => Ok(paths),
        Err(err) => {
            warn!("boot classpath probe failed: {err:#}");
            if cfg!(target_os = "macos") {
                return Ok(darwin_boot_classpath());
            }
            Err(err.context("cannot determine boot classpath; pass --bootclasspath"))
        }
    }
}

fn probe_boot_classpath() -> Result<Vec<PathBuf>> {
    let mut probe = tempfile::Builder::new()
        .prefix("bootprobe")
        .suffix(".jar")
        .tempfile()
        .context("failed to create probe jar")?;
    probe
        .write_all(BOOT_PROBE_JAR)
        .context("failed to write probe jar")?;

    let output = Command::new(java_binary())
        .arg("-jar")
        .arg(probe.path())
        .output()
        .context("failed to run java")?;
    // The NamedTempFile guard removes the probe jar on every path from here.
    if !output.status.success() {
        anyhow::bail!("java exited with {}", output.status);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut separator = ':';
    let mut paths = None;
    for line in stdout.lines() {
        if let Some(value) = line.strip_prefix("Class-Path-Separator: ") {
            if let Some(first) = value.chars().next() {
                separator = first;
            }
        } else if let Some(value) = line.strip_prefix("Boot-Class-Path: ") {
            paths = Some(value.to_string());
        }
    }
    let paths = paths.context("probe output carried no Boot-Class-Path line")?;
    Ok(paths
        .split(separator)
        .filter(|entry| !entry.is_empty())
        .map(PathBuf::from)
        .collect())
}

fn java_binary() -> PathBuf {
    match std::env::var_os("JAVA_HOME") {
        Some(home) => Path::new(&home).join("bin").join("java"),
        None => PathBuf::from("java"),
    }
}

fn darwin_boot_classpath() -> Vec<PathBuf> {
    const BASE: &str = "/System/Library/Java/JavaVirtualMachines/1.6.0.jdk/Contents/Classes";
    [
        "jsfd",
        "classes",
        "ui",
        "laf",
        "sunrsasign",
        "jsse",
        "jce",
        "charsets",
    ]
    .iter()
    .map(|name| PathBuf::from(format!("{BASE}/{name}.jar")))
    .collect()
}

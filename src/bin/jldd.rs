use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use jtools::archive;
use jtools::classpath::{
    ClasspathIndex, boot_classpath, default_classpath, expand_classpath, package_of,
    parse_classpath,
};
use jtools::pipeline::{Display, Filter, Pipeline, Sort, SymbolRecord};
use jtools::scan::scan_symbols;
use jtools::symbols::SymbolKind;

/// CLI arguments for jldd. The common jnm filters, sorts, and displays are
/// inherited except where a short flag is taken by a jldd option: `-c` is
/// `--classpath` here (so no class-only) and `-r` is `--resolve-all` (so no
/// reverse-sort).
#[derive(Parser, Debug)]
#[command(
    name = "jldd",
    about = "Report which classpath sources satisfy a class file's references.",
    version
)]
struct Cli {
    /// `:`-separated user classpath. Defaults to $CLASSPATH, then ".".
    #[arg(short = 'c', long = "classpath", value_name = "LIST")]
    classpath: Option<String>,
    /// `:`-separated boot classpath. Defaults to probing the local JVM.
    #[arg(short = 'b', long = "bootclasspath", value_name = "LIST")]
    bootclasspath: Option<String>,
    /// Resolve field and method references too, not just classes.
    #[arg(short = 'r', long = "resolve-all")]
    resolve_all: bool,
    /// Keep symbols in discovery order (default).
    #[arg(short = 'p', long = "no-sort")]
    no_sort: bool,
    /// Sort symbols by value before resolution; null values sort last.
    #[arg(short = 'n', long = "numeric-sort")]
    numeric_sort: bool,
    /// Sort symbols by name before resolution.
    #[arg(short = 'a', long = "alpha-sort")]
    alpha_sort: bool,
    /// Show only undefined (referenced) symbols.
    #[arg(short = 'u', long = "undefined-only")]
    undefined_only: bool,
    /// Show only defined symbols.
    #[arg(short = 'U', long = "defined-only")]
    defined_only: bool,
    /// Drop private symbols.
    #[arg(short = 'g', long = "extern-only")]
    extern_only: bool,
    /// Resolve references against every listed input. Always on for jldd.
    #[arg(short = 'f', long = "flatten")]
    flatten: bool,
    /// Prefix unresolved symbols with the file they came from.
    #[arg(short = 'A', long = "print-file-name")]
    print_file_name: bool,
    /// Print unresolved symbol names only (default).
    #[arg(short = 'j', long = "symbols-only")]
    symbols_only: bool,
    /// Append demangled signatures to unresolved symbols.
    #[arg(short = 'C', long = "demangle")]
    demangle: bool,
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,
}

fn main() -> ExitCode {
    jtools::init_logging();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("jldd: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> Result<bool> {
    let boot_index = ClasspathIndex::build(&boot_classpath(cli.bootclasspath.as_deref())?);

    let mut user_sources = parse_classpath(&default_classpath(cli.classpath.as_deref()));
    // Input jars extend the user classpath through their manifests.
    // An unreadable input is reported by the scan below, not here.
    for file in &cli.files {
        if archive::is_jar_path(file) {
            if let Ok(referenced) = archive::manifest_class_path(file) {
                user_sources.extend(referenced);
            }
        }
    }
    let user_index = ClasspathIndex::build(&expand_classpath(user_sources));

    let pipeline = build_pipeline(cli);
    let mut clean = true;
    let multiple = cli.files.len() > 1;
    for file in &cli.files {
        let scan = scan_symbols(std::slice::from_ref(file));
        if scan.error_count > 0 {
            clean = false;
        }
        if scan.records.is_empty() {
            continue;
        }
        let report = resolve_file(cli, &pipeline, scan.records, &boot_index, &user_index);
        if multiple {
            println!("{}:", file.display());
        }
        print_report(&report);
        if !report.unresolved.is_empty() {
            clean = false;
        }
    }
    Ok(clean)
}

fn build_pipeline(cli: &Cli) -> Pipeline {
    let mut pipeline = Pipeline::new();
    // References satisfied inside the input itself are not dependencies,
    // so jldd always resolves against the whole input set; -f is accepted
    // for surface compatibility but adds nothing on top.
    pipeline.add_filter(Filter::ResolveAll);
    if cli.undefined_only {
        pipeline.add_filter(Filter::RemoveDefined);
    }
    if cli.defined_only {
        pipeline.add_filter(Filter::RemoveUndefined);
    }
    if cli.extern_only {
        pipeline.add_filter(Filter::RemovePrivate);
    }
    if cli.alpha_sort {
        pipeline.add_sort(Sort::Alphabetic);
    }
    if cli.numeric_sort {
        pipeline.add_sort(Sort::Numeric);
    }
    // Unresolved symbols list as bare names unless a display flag widens
    // the rendering.
    pipeline.add_display(Display::NameOnly);
    if cli.print_file_name {
        pipeline.add_display(Display::PrependFilename);
    }
    if cli.symbols_only {
        pipeline.add_display(Display::NameOnly);
    }
    if cli.demangle {
        pipeline.add_display(Display::Demangle);
    }
    pipeline
}

/// Per-input resolution outcome: package lines plus unresolved symbols.
struct ResolutionReport {
    packages: BTreeMap<String, BTreeSet<PathBuf>>,
    unresolved: Vec<String>,
}

fn resolve_file(
    cli: &Cli,
    pipeline: &Pipeline,
    records: Vec<SymbolRecord>,
    boot_index: &ClasspathIndex,
    user_index: &ClasspathIndex,
) -> ResolutionReport {
    let mut records = pipeline.filter(records);
    pipeline.sort(&mut records);

    let mut packages: BTreeMap<String, BTreeSet<PathBuf>> = BTreeMap::new();
    let mut unresolved = Vec::new();
    let mut seen_unresolved = BTreeSet::new();
    for record in &records {
        let symbol = &record.symbol;
        let target = match symbol.kind {
            SymbolKind::RefClass => Some(symbol.name.clone()),
            SymbolKind::RefStaticField
            | SymbolKind::RefInstanceField
            | SymbolKind::RefMethod
                if cli.resolve_all =>
            {
                Some(class_of_member(&symbol.name))
            }
            _ => None,
        };
        let Some(class_name) = target else {
            continue;
        };

        let package = package_of(&class_name).to_string();
        let sources = packages.entry(package.clone()).or_default();
        if let Some(boot_sources) = boot_index.package_sources(&package) {
            sources.extend(boot_sources.iter().cloned());
        }
        if let Some(user_sources) = user_index.package_sources(&package) {
            sources.extend(user_sources.iter().cloned());
        }

        let resolved =
            boot_index.lookup(&class_name).is_some() || user_index.lookup(&class_name).is_some();
        if !resolved && seen_unresolved.insert(symbol.name.clone()) {
            unresolved.push(pipeline.render(record));
        }
    }

    ResolutionReport {
        packages,
        unresolved,
    }
}

fn print_report(report: &ResolutionReport) {
    for (package, sources) in &report.packages {
        let label = if package.is_empty() {
            "<default>"
        } else {
            package.as_str()
        };
        if sources.is_empty() {
            println!("\t {label} => ???");
        } else {
            let rendered: Vec<String> = sources
                .iter()
                .map(|source| source.display().to_string())
                .collect();
            println!("\t {label} => {}", rendered.join(", "));
        }
    }
    if !report.unresolved.is_empty() {
        println!("Failed to resolve:");
        for line in &report.unresolved {
            println!("\t {line}");
        }
    }
}

/// Class part of a `pkg.Class.member` name.
fn class_of_member(name: &str) -> String {
    match name.rfind('.') {
        Some(index) => name[..index].to_string(),
        None => name.to_string(),
    }
}

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use jtools::descriptor::set_pointer_size;
use jtools::pipeline::{Display, Filter, Origin, Pipeline, Sort, SymbolRecord};
use jtools::scan::scan_symbols;

/// CLI arguments for jnm.
#[derive(Parser, Debug)]
#[command(
    name = "jnm",
    about = "List symbols defined in or referenced by Java class files and jars.",
    version
)]
struct Cli {
    /// Keep symbols in discovery order (default).
    #[arg(short = 'p', long = "no-sort")]
    no_sort: bool,
    /// Sort symbols by value; symbols without a value sort last.
    #[arg(short = 'n', long = "numeric-sort")]
    numeric_sort: bool,
    /// Reverse the final order.
    #[arg(short = 'r', long = "reverse-sort")]
    reverse_sort: bool,
    /// Sort symbols by name.
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
    /// Show only class symbols.
    #[arg(short = 'c', long = "class-only")]
    class_only: bool,
    /// Resolve references against every listed input, not just the
    /// defining class.
    #[arg(short = 'f', long = "flatten")]
    flatten: bool,
    /// Prefix every line with the file the symbol came from.
    #[arg(short = 'A', long = "print-file-name")]
    print_file_name: bool,
    /// Print symbol names only.
    #[arg(short = 'j', long = "symbols-only")]
    symbols_only: bool,
    /// Append demangled signatures.
    #[arg(short = 'C', long = "demangle")]
    demangle: bool,
    /// Size references and arrays as 32-bit pointers.
    #[arg(long = "m32")]
    m32: bool,
    /// Size references and arrays as 64-bit pointers (default).
    #[arg(long = "m64")]
    m64: bool,
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,
}

fn main() -> ExitCode {
    jtools::init_logging();
    let cli = Cli::parse();
    if cli.m32 {
        set_pointer_size(4);
    }

    let scan = scan_symbols(&cli.files);
    let pipeline = build_pipeline(&cli);
    print_records(&cli, &pipeline, pipeline.filter(scan.records));

    if scan.error_count > 0 {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

fn build_pipeline(cli: &Cli) -> Pipeline {
    let mut pipeline = Pipeline::new();
    if cli.flatten {
        pipeline.add_filter(Filter::ResolveAll);
    }
    if cli.undefined_only {
        pipeline.add_filter(Filter::RemoveDefined);
    }
    if cli.defined_only {
        pipeline.add_filter(Filter::RemoveUndefined);
    }
    if cli.extern_only {
        pipeline.add_filter(Filter::RemovePrivate);
    }
    if cli.class_only {
        pipeline.add_filter(Filter::RemoveNonClass);
    }
    if cli.alpha_sort {
        pipeline.add_sort(Sort::Alphabetic);
    }
    if cli.numeric_sort {
        pipeline.add_sort(Sort::Numeric);
    }
    if cli.reverse_sort {
        pipeline.add_sort(Sort::Reverse);
    }
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

fn print_records(cli: &Cli, pipeline: &Pipeline, records: Vec<SymbolRecord>) {
    // With -A every line already names its file, so sorting runs globally.
    if cli.print_file_name {
        let mut records = records;
        pipeline.sort(&mut records);
        for record in &records {
            println!("{}", pipeline.render(record));
        }
        return;
    }

    let blocks = group_by_origin(records);
    let with_headers = blocks.len() > 1;
    for (origin, mut block) in blocks {
        pipeline.sort(&mut block);
        if with_headers {
            println!("\n{}:", origin.label());
        }
        for record in &block {
            println!("{}", pipeline.render(record));
        }
    }
}

/// Group records by class block, keeping discovery order of the blocks.
fn group_by_origin(records: Vec<SymbolRecord>) -> Vec<(Origin, Vec<SymbolRecord>)> {
    let mut blocks: Vec<(Origin, Vec<SymbolRecord>)> = Vec::new();
    for record in records {
        let same_block = blocks
            .last()
            .map_or(false, |(origin, _)| *origin == record.origin);
        if !same_block {
            blocks.push((record.origin.clone(), Vec::new()));
        }
        if let Some((_, block)) = blocks.last_mut() {
            block.push(record);
        }
    }
    blocks
}

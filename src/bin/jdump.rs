use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use jtools::dump::render_class;
use jtools::scan::scan_class_files;

/// CLI arguments for jdump.
#[derive(Parser, Debug)]
#[command(
    name = "jdump",
    about = "Disassemble Java class files and jars.",
    version
)]
struct Cli {
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,
}

fn main() -> ExitCode {
    jtools::init_logging();
    let cli = Cli::parse();

    let scan = scan_class_files(&cli.files);
    let mut error_count = scan.error_count;
    let mut first = true;
    for (origin, class) in &scan.classes {
        if !first {
            println!();
        }
        first = false;
        match render_class(class) {
            Ok(text) => print!("{text}"),
            Err(err) => {
                eprintln!("{}: {err}", origin.label());
                error_count += 1;
            }
        }
    }

    if error_count > 0 {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

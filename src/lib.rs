//! Core library behind the `jdump`, `jnm`, and `jldd` class-file
//! inspection tools: class file parsing, bytecode walking, symbol
//! extraction, and classpath resolution.

pub mod archive;
pub mod attributes;
pub mod class_file;
pub mod classpath;
pub mod constant_pool;
pub mod descriptor;
pub mod dump;
pub mod error;
pub mod flags;
pub mod opcodes;
pub mod pipeline;
pub mod reader;
pub mod scan;
pub mod symbols;
#[cfg(test)]
pub(crate) mod testutil;

pub use class_file::ClassFile;
pub use error::{ClassError, Result};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the logging facade with stderr output.
pub fn init_logging() {
    let init_result = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jtools=warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
    let _ = init_result;
}

use thiserror::Error;

pub type Result<T, E = ClassError> = std::result::Result<T, E>;

/// Errors produced while decoding class files, archives, and bytecode.
#[derive(Error, Debug)]
pub enum ClassError {
    #[error("truncated input: needed {needed} bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },
    #[error("{0} trailing bytes after end of class structure")]
    ExtraData(usize),
    #[error("invalid magic identifier: 0x{0:08X}")]
    BadMagic(u32),
    #[error("unsupported class file version {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },
    #[error("invalid constant pool tag {0}")]
    BadConstantTag(u8),
    #[error("constant pool index {0} out of range or unusable")]
    BadPoolIndex(u16),
    #[error("expected {expected} at constant pool index {index}, found {found}")]
    BadConstantKind {
        index: u16,
        expected: &'static str,
        found: &'static str,
    },
    #[error("malformed descriptor {0:?}")]
    BadDescriptor(String),
    #[error("bad bytecode at pc {pc}: {detail}")]
    BadBytecode { pc: u32, detail: String },
    #[error("attribute {name:?} length mismatch: declared {declared}, consumed {consumed}")]
    BadAttribute {
        name: String,
        declared: usize,
        consumed: usize,
    },
    #[error("archive error: {0}")]
    BadArchive(#[from] zip::result::ZipError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

use crate::class_file::ClassFile;
use crate::constant_pool::{Constant, ConstantPool};
use crate::descriptor::{
    demangle_field_descriptor, demangle_method_descriptor, fqcn, size_field_descriptor,
};
use crate::error::Result;
use crate::flags::AccessFlags;
use crate::opcodes::{self, Operand};

/// Kind of a defined or referenced symbol.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SymbolKind {
    Class,
    StaticField,
    InstanceField,
    Method,
    RefClass,
    RefStaticField,
    RefInstanceField,
    RefMethod,
}

impl SymbolKind {
    pub fn is_reference(self) -> bool {
        matches!(
            self,
            SymbolKind::RefClass
                | SymbolKind::RefStaticField
                | SymbolKind::RefInstanceField
                | SymbolKind::RefMethod
        )
    }

    pub fn is_class(self) -> bool {
        matches!(self, SymbolKind::Class | SymbolKind::RefClass)
    }

    /// Display character before visibility lowercasing.
    pub fn letter(self) -> char {
        match self {
            SymbolKind::Class => 'C',
            SymbolKind::StaticField => 'D',
            SymbolKind::InstanceField => 'I',
            SymbolKind::Method => 'T',
            SymbolKind::RefClass => 'K',
            SymbolKind::RefStaticField => 'F',
            SymbolKind::RefInstanceField => 'R',
            SymbolKind::RefMethod => 'J',
        }
    }
}

/// Symbol visibility derived from access flags.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Visibility {
    External,
    Private,
}

impl Visibility {
    fn from_flags(flags: AccessFlags) -> Self {
        if flags.is_private() {
            Visibility::Private
        } else {
            Visibility::External
        }
    }
}

/// A defined or referenced entity. Defined symbols carry a size value;
/// references carry none.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub value: Option<u64>,
    pub kind: SymbolKind,
    pub visibility: Visibility,
    /// Fully-qualified dotted name: `pkg.Class` or `pkg.Class.member`.
    pub name: String,
    /// Demangled human-readable signature, when one exists.
    pub expanded_name: Option<String>,
}

impl Symbol {
    /// Display character: lowercase when the originating flags were private.
    pub fn kind_char(&self) -> char {
        match self.visibility {
            Visibility::External => self.kind.letter(),
            Visibility::Private => self.kind.letter().to_ascii_lowercase(),
        }
    }
}

// Equality ignores visibility (and with it the case of the kind character).
impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.kind == other.kind && self.name == other.name
    }
}

impl Eq for Symbol {}

/// Extract defined and referenced symbols from one parsed class file.
///
/// Order: the class symbol, then fields, then methods; each method's
/// references follow its definition in bytecode order.
pub fn extract_symbols(class: &ClassFile) -> Result<Vec<Symbol>> {
    let pool = &class.constant_pool;
    let class_name = fqcn(class.class_name()?);
    let mut symbols = Vec::new();

    symbols.push(Symbol {
        value: Some(class.size as u64),
        kind: SymbolKind::Class,
        visibility: Visibility::from_flags(class.access_flags),
        name: class_name.clone(),
        expanded_name: None,
    });

    for field in &class.fields {
        let descriptor = field.descriptor(pool)?;
        let name = format!("{}.{}", class_name, field.name(pool)?);
        let kind = if field.access_flags.is_static() {
            SymbolKind::StaticField
        } else {
            SymbolKind::InstanceField
        };
        symbols.push(Symbol {
            value: Some(size_field_descriptor(descriptor)?),
            kind,
            visibility: Visibility::from_flags(field.access_flags),
            name,
            expanded_name: expand_field(field.name(pool)?, descriptor),
        });
    }

    for method in &class.methods {
        let descriptor = method.descriptor(pool)?;
        let method_name = method.name(pool)?;
        let name = format!("{class_name}.{method_name}");
        let code = method.code();
        symbols.push(Symbol {
            value: code.map(|code| code.code.len() as u64),
            kind: SymbolKind::Method,
            visibility: Visibility::from_flags(method.access_flags),
            name,
            expanded_name: expand_method(method_name, descriptor),
        });
        if let Some(code) = code {
            extract_references(&code.code, pool, &mut symbols)?;
        }
    }

    Ok(symbols)
}

fn extract_references(code: &[u8], pool: &ConstantPool, symbols: &mut Vec<Symbol>) -> Result<()> {
    for instruction in opcodes::walk(code) {
        let instruction = instruction?;
        let Some(&Operand::CpIndex(index)) = instruction.operands.first() else {
            continue;
        };
        match instruction.opcode {
            // new, anewarray, checkcast, instanceof, multianewarray
            0xbb | 0xbd | 0xc0 | 0xc1 | 0xc5 => {
                let target = pool.class_name(index)?;
                // Array class constants name a descriptor, not a class.
                if !target.starts_with('[') {
                    symbols.push(class_reference(target));
                }
            }
            // ldc, ldc_w: only class constants name a symbol
            0x12 | 0x13 => {
                if let Constant::Class { name_index } = pool.get(index)? {
                    let target = pool.utf8(*name_index)?;
                    if !target.starts_with('[') {
                        symbols.push(class_reference(target));
                    }
                }
            }
            // getstatic, putstatic
            0xb2 | 0xb3 => symbols.push(member_reference(pool, index, SymbolKind::RefStaticField)?),
            // getfield, putfield
            0xb4 | 0xb5 => {
                symbols.push(member_reference(pool, index, SymbolKind::RefInstanceField)?)
            }
            // invokevirtual, invokespecial, invokestatic, invokeinterface
            0xb6..=0xb9 => symbols.push(member_reference(pool, index, SymbolKind::RefMethod)?),
            _ => {}
        }
    }
    Ok(())
}

fn class_reference(internal_name: &str) -> Symbol {
    Symbol {
        value: None,
        kind: SymbolKind::RefClass,
        visibility: Visibility::External,
        name: fqcn(internal_name),
        expanded_name: None,
    }
}

fn member_reference(pool: &ConstantPool, index: u16, kind: SymbolKind) -> Result<Symbol> {
    let member = pool.member_ref(index)?;
    let expanded = if kind == SymbolKind::RefMethod {
        expand_method(member.name, member.descriptor)
    } else {
        expand_field(member.name, member.descriptor)
    };
    Ok(Symbol {
        value: None,
        kind,
        visibility: Visibility::External,
        name: format!("{}.{}", fqcn(member.owner), member.name),
        expanded_name: expanded,
    })
}

fn expand_field(name: &str, descriptor: &str) -> Option<String> {
    demangle_field_descriptor(descriptor)
        .ok()
        .map(|(rendered, _)| format!("{rendered} {name}"))
}

fn expand_method(name: &str, descriptor: &str) -> Option<String> {
    demangle_method_descriptor(descriptor)
        .ok()
        .map(|(parameters, return_type)| {
            format!("{return_type} {name}({})", parameters.join(", "))
        })
}

use std::fmt::Write;

use crate::class_file::{ClassFile, Field, Method};
use crate::constant_pool::{Constant, ConstantPool};
use crate::descriptor::{
    demangle_field_descriptor, demangle_method_descriptor, fqcn, method_param_count,
};
use crate::error::Result;
use crate::opcodes::{self, Instruction, Operand};

/// Render the full textual transcription of one class file.
pub fn render_class(class: &ClassFile) -> Result<String> {
    let pool = &class.constant_pool;
    let mut out = String::new();

    writeln!(out, "{}", class_declaration(class)?).expect("write to string");
    if let Some(source) = class.source_file() {
        writeln!(out, "  SourceFile: \"{source}\"").expect("write to string");
    }
    writeln!(out, "  minor version: {}", class.minor_version).expect("write to string");
    writeln!(out, "  major version: {}", class.major_version).expect("write to string");

    writeln!(out, "  Constant pool:").expect("write to string");
    for (index, entry) in pool.iter() {
        writeln!(out, "{}", constant_line(pool, index, entry)).expect("write to string");
    }

    writeln!(out, "\n{{").expect("write to string");
    for field in &class.fields {
        out.push_str(&render_field(pool, field)?);
        out.push('\n');
    }
    for method in &class.methods {
        out.push_str(&render_method(class, method)?);
        out.push('\n');
    }
    out.push_str("}\n");
    Ok(out)
}

fn class_declaration(class: &ClassFile) -> Result<String> {
    let name = fqcn(class.class_name()?);
    let modifiers = class.access_flags.class_modifiers();
    let mut line = String::new();
    if !modifiers.is_empty() {
        line.push_str(&modifiers);
        line.push(' ');
    }
    let interfaces: Vec<String> = class
        .interface_names()?
        .into_iter()
        .map(fqcn)
        .collect();
    if class.access_flags.is_interface() {
        line.push_str("interface ");
        line.push_str(&name);
        if !interfaces.is_empty() {
            line.push_str(" extends ");
            line.push_str(&interfaces.join(", "));
        }
    } else {
        line.push_str("class ");
        line.push_str(&name);
        if let Some(super_name) = class.super_name()? {
            line.push_str(" extends ");
            line.push_str(&fqcn(super_name));
        }
        if !interfaces.is_empty() {
            line.push_str(" implements ");
            line.push_str(&interfaces.join(", "));
        }
    }
    Ok(line)
}

fn constant_line(pool: &ConstantPool, index: u16, entry: &Constant) -> String {
    match entry {
        Constant::Utf8(value) => format!("const #{index} = Asciz\t{value};"),
        Constant::Integer(value) => format!("const #{index} = int\t{value};"),
        Constant::Float(value) => format!("const #{index} = float\t{value}f;"),
        Constant::Long(value) => format!("const #{index} = long\t{value}l;"),
        Constant::Double(value) => format!("const #{index} = double\t{value}d;"),
        Constant::Class { name_index } => format!(
            "const #{index} = class\t#{name_index};\t//  {}",
            pool.utf8(*name_index).unwrap_or("?")
        ),
        Constant::String { string_index } => format!(
            "const #{index} = String\t#{string_index};\t//  {}",
            pool.utf8(*string_index).unwrap_or("?")
        ),
        Constant::FieldRef {
            class_index,
            name_and_type_index,
        } => format!(
            "const #{index} = Field\t#{class_index}.#{name_and_type_index};\t//  {}",
            member_comment(pool, *class_index, *name_and_type_index)
        ),
        Constant::MethodRef {
            class_index,
            name_and_type_index,
        } => format!(
            "const #{index} = Method\t#{class_index}.#{name_and_type_index};\t//  {}",
            member_comment(pool, *class_index, *name_and_type_index)
        ),
        Constant::InterfaceMethodRef {
            class_index,
            name_and_type_index,
        } => format!(
            "const #{index} = InterfaceMethod\t#{class_index}.#{name_and_type_index};\t//  {}",
            member_comment(pool, *class_index, *name_and_type_index)
        ),
        Constant::NameAndType {
            name_index,
            descriptor_index,
        } => format!(
            "const #{index} = NameAndType\t#{name_index}:#{descriptor_index};//  {}:{}",
            pool.utf8(*name_index).unwrap_or("?"),
            pool.utf8(*descriptor_index).unwrap_or("?")
        ),
        Constant::Unusable => format!("const #{index} = ?;"),
    }
}

fn member_comment(pool: &ConstantPool, class_index: u16, name_and_type_index: u16) -> String {
    let owner = pool.class_name(class_index).unwrap_or("?");
    let (name, descriptor) = pool.name_and_type(name_and_type_index).unwrap_or(("?", "?"));
    format!("{owner}.{}:{descriptor}", quote_special(name))
}

/// Compiler-generated member names are quoted, matching javap.
fn quote_special(name: &str) -> String {
    if name.starts_with('<') {
        format!("\"{name}\"")
    } else {
        name.to_string()
    }
}

fn render_field(pool: &ConstantPool, field: &Field) -> Result<String> {
    let descriptor = field.descriptor(pool)?;
    let (rendered_type, _) = demangle_field_descriptor(descriptor)?;
    let modifiers = field.access_flags.field_modifiers();
    let mut out = String::new();
    if modifiers.is_empty() {
        writeln!(out, "{rendered_type} {};", field.name(pool)?).expect("write to string");
    } else {
        writeln!(out, "{modifiers} {rendered_type} {};", field.name(pool)?)
            .expect("write to string");
    }
    writeln!(out, "  Signature: {descriptor}").expect("write to string");
    Ok(out)
}

fn render_method(class: &ClassFile, method: &Method) -> Result<String> {
    let pool = &class.constant_pool;
    let mut out = String::new();
    writeln!(out, "{}", method_declaration(class, method)?).expect("write to string");

    if let Some(code) = method.code() {
        let descriptor = method.descriptor(pool)?;
        let mut args_size = method_param_count(descriptor)?;
        if !method.access_flags.is_static() {
            args_size += 1;
        }
        writeln!(out, "  Code:").expect("write to string");
        writeln!(
            out,
            "   Stack={}, Locals={}, Args_size={}",
            code.max_stack, code.max_locals, args_size
        )
        .expect("write to string");
        for instruction in opcodes::walk(&code.code) {
            let instruction = instruction?;
            out.push_str(&render_instruction(pool, &instruction));
        }
        if !code.exception_table.is_empty() {
            writeln!(out, "  Exception table:").expect("write to string");
            writeln!(out, "   from   to  target type").expect("write to string");
            for entry in &code.exception_table {
                let catch_type = if entry.catch_type == 0 {
                    "any".to_string()
                } else {
                    format!("Class {}", pool.class_name(entry.catch_type).unwrap_or("?"))
                };
                writeln!(
                    out,
                    "{:>6}{:>6}{:>6}   {}",
                    entry.start_pc, entry.end_pc, entry.handler_pc, catch_type
                )
                .expect("write to string");
            }
        }
    }
    Ok(out)
}

fn method_declaration(class: &ClassFile, method: &Method) -> Result<String> {
    let pool = &class.constant_pool;
    let name = method.name(pool)?;
    if name == "<clinit>" {
        return Ok("static {};".to_string());
    }

    let descriptor = method.descriptor(pool)?;
    let (parameters, return_type) = demangle_method_descriptor(descriptor)?;
    let modifiers = method.access_flags.method_modifiers();
    let mut line = String::new();
    if !modifiers.is_empty() {
        line.push_str(&modifiers);
        line.push(' ');
    }
    if name == "<init>" {
        line.push_str(&fqcn(class.class_name()?));
    } else {
        line.push_str(&return_type);
        line.push(' ');
        line.push_str(name);
    }
    line.push('(');
    line.push_str(&parameters.join(", "));
    line.push(')');

    if let Some(exceptions) = method.exceptions() {
        let thrown: Vec<String> = exceptions
            .iter()
            .map(|&index| pool.class_name(index).map(fqcn))
            .collect::<Result<_>>()?;
        if !thrown.is_empty() {
            line.push_str(" throws ");
            line.push_str(&thrown.join(", "));
        }
    }
    line.push(';');
    Ok(line)
}

fn render_instruction(pool: &ConstantPool, instruction: &Instruction) -> String {
    let pc = instruction.pc;
    let mut line = format!("   {pc}:\t{}", instruction.mnemonic);
    let mut suffix = None;
    let mut extra_lines = String::new();

    for operand in &instruction.operands {
        match operand {
            Operand::CpIndex(index) => {
                line.push_str(&format!("\t#{index}"));
                suffix = constant_comment(pool, *index);
            }
            Operand::Local(local) => line.push_str(&format!("\t{local}")),
            Operand::Branch(target) => line.push_str(&format!("\t{target}")),
            Operand::Immediate(value) => line.push_str(&format!("\t{value}")),
            Operand::Count(count) => line.push_str(&format!(", {count}")),
            Operand::ArrayType(code) => {
                line.push_str(&format!("\t{}", array_type_name(*code)))
            }
            Operand::Table(table) => {
                line.push_str(&format!(
                    "\tdefault={}, low={}, high={}",
                    table.default, table.low, table.high
                ));
                for (slot, offset) in table.offsets.iter().enumerate() {
                    extra_lines.push_str(&format!(
                        "\t\t{}: {}\n",
                        table.low + slot as i32,
                        pc as i32 + offset
                    ));
                }
                extra_lines.push_str(&format!("\t\tdefault: {}\n", pc as i32 + table.default));
            }
            Operand::Lookup(lookup) => {
                line.push_str(&format!(
                    "\tdefault={}, npairs={}",
                    lookup.default,
                    lookup.pairs.len()
                ));
                for (matched, offset) in &lookup.pairs {
                    extra_lines
                        .push_str(&format!("\t\t{}: {}\n", matched, pc as i32 + offset));
                }
                extra_lines.push_str(&format!("\t\tdefault: {}\n", pc as i32 + lookup.default));
            }
        }
    }

    if let Some(comment) = suffix {
        line.push_str(&format!("; //{comment}"));
    }
    line.push('\n');
    line.push_str(&extra_lines);
    line
}

fn constant_comment(pool: &ConstantPool, index: u16) -> Option<String> {
    let comment = match pool.get(index).ok()? {
        Constant::Class { name_index } => {
            format!("class {}", pool.utf8(*name_index).unwrap_or("?"))
        }
        Constant::String { string_index } => {
            format!("String {}", pool.utf8(*string_index).unwrap_or("?"))
        }
        Constant::Integer(value) => format!("int {value}"),
        Constant::Float(value) => format!("float {value}f"),
        Constant::Long(value) => format!("long {value}l"),
        Constant::Double(value) => format!("double {value}d"),
        Constant::FieldRef {
            class_index,
            name_and_type_index,
        } => format!(
            "Field {}",
            member_comment(pool, *class_index, *name_and_type_index)
        ),
        Constant::MethodRef {
            class_index,
            name_and_type_index,
        } => format!(
            "Method {}",
            member_comment(pool, *class_index, *name_and_type_index)
        ),
        Constant::InterfaceMethodRef {
            class_index,
            name_and_type_index,
        } => format!(
            "InterfaceMethod {}",
            member_comment(pool, *class_index, *name_and_type_index)
        ),
        _ => return None,
    };
    Some(comment)
}

fn array_type_name(code: u8) -> &'static str {
    match code {
        4 => "boolean",
        5 => "char",
        6 => "float",
        7 => "double",
        8 => "byte",
        9 => "short",
        10 => "int",
        11 => "long",
        _ => "?",
    }
}

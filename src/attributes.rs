use crate::constant_pool::ConstantPool;
use crate::error::{ClassError, Result};
use crate::reader::ClassReader;

/// One entry of a Code attribute's exception table. `catch_type` 0 catches any.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: u16,
}

/// Decoded Code attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub attributes: Vec<Attribute>,
}

/// Attribute variants keyed on the attribute's Utf8 name. Names this tool
/// does not interpret are preserved as `Unknown`.
#[derive(Clone, Debug, PartialEq)]
pub enum Attribute {
    Code(CodeAttribute),
    Exceptions(Vec<u16>),
    SourceFile(u16),
    Unknown { name_index: u16, data: Vec<u8> },
}

impl Attribute {
    pub fn parse_list(reader: &mut ClassReader, pool: &ConstantPool) -> Result<Vec<Attribute>> {
        let count = reader.read_u16()?;
        (0..count).map(|_| Self::parse_one(reader, pool)).collect()
    }

    fn parse_one(reader: &mut ClassReader, pool: &ConstantPool) -> Result<Attribute> {
        let name_index = reader.read_u16()?;
        let length = reader.read_u32()? as usize;
        let data = reader.read_bytes(length)?;
        let name = pool.utf8(name_index)?;

        let attribute = match name {
            "Code" => parse_code(data, pool).map(Attribute::Code),
            "Exceptions" => parse_exceptions(data),
            "SourceFile" => parse_source_file(data),
            _ => Ok(Attribute::Unknown {
                name_index,
                data: data.to_vec(),
            }),
        };
        attribute.map_err(|err| match err {
            // A short read inside a sized attribute means the declared length
            // disagrees with the payload, not that the file ended early.
            ClassError::Truncated { offset, .. } => ClassError::BadAttribute {
                name: name.to_string(),
                declared: length,
                consumed: offset,
            },
            other => other,
        })
    }
}

fn parse_code(data: &[u8], pool: &ConstantPool) -> Result<CodeAttribute> {
    let mut reader = ClassReader::new(data);
    let max_stack = reader.read_u16()?;
    let max_locals = reader.read_u16()?;
    let code_length = reader.read_u32()? as usize;
    let code = reader.read_bytes(code_length)?.to_vec();
    let exception_table_length = reader.read_u16()?;
    let exception_table = (0..exception_table_length)
        .map(|_| {
            Ok(ExceptionTableEntry {
                start_pc: reader.read_u16()?,
                end_pc: reader.read_u16()?,
                handler_pc: reader.read_u16()?,
                catch_type: reader.read_u16()?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let attributes = Attribute::parse_list(&mut reader, pool)?;
    expect_consumed("Code", &reader, data.len())?;

    Ok(CodeAttribute {
        max_stack,
        max_locals,
        code,
        exception_table,
        attributes,
    })
}

fn parse_exceptions(data: &[u8]) -> Result<Attribute> {
    let mut reader = ClassReader::new(data);
    let count = reader.read_u16()?;
    let indices = (0..count)
        .map(|_| reader.read_u16())
        .collect::<Result<Vec<_>>>()?;
    expect_consumed("Exceptions", &reader, data.len())?;
    Ok(Attribute::Exceptions(indices))
}

fn parse_source_file(data: &[u8]) -> Result<Attribute> {
    let mut reader = ClassReader::new(data);
    let index = reader.read_u16()?;
    expect_consumed("SourceFile", &reader, data.len())?;
    Ok(Attribute::SourceFile(index))
}

fn expect_consumed(name: &str, reader: &ClassReader, declared: usize) -> Result<()> {
    if reader.remaining() != 0 {
        return Err(ClassError::BadAttribute {
            name: name.to_string(),
            declared,
            consumed: reader.position(),
        });
    }
    Ok(())
}

/// First Code attribute in a member's attribute list, if any.
pub fn find_code(attributes: &[Attribute]) -> Option<&CodeAttribute> {
    attributes.iter().find_map(|attribute| match attribute {
        Attribute::Code(code) => Some(code),
        _ => None,
    })
}

/// First Exceptions attribute in a member's attribute list, if any.
pub fn find_exceptions(attributes: &[Attribute]) -> Option<&[u16]> {
    attributes.iter().find_map(|attribute| match attribute {
        Attribute::Exceptions(indices) => Some(indices.as_slice()),
        _ => None,
    })
}

/// SourceFile attribute value resolved through the pool.
pub fn find_source_file<'a>(attributes: &[Attribute], pool: &'a ConstantPool) -> Option<&'a str> {
    attributes.iter().find_map(|attribute| match attribute {
        Attribute::SourceFile(index) => pool.utf8(*index).ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_with_names(names: &[&str]) -> ConstantPool {
        let mut bytes = vec![0, (names.len() + 1) as u8];
        for name in names {
            bytes.push(1);
            bytes.extend_from_slice(&(name.len() as u16).to_be_bytes());
            bytes.extend_from_slice(name.as_bytes());
        }
        let mut reader = ClassReader::new(&bytes);
        ConstantPool::parse(&mut reader).expect("build pool")
    }

    fn attribute_bytes(name_index: u16, payload: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0, 1];
        bytes.extend_from_slice(&name_index.to_be_bytes());
        bytes.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn decodes_source_file_attribute() {
        let pool = pool_with_names(&["SourceFile", "Foo.java"]);
        let bytes = attribute_bytes(1, &[0x00, 0x02]);
        let mut reader = ClassReader::new(&bytes);

        let attributes = Attribute::parse_list(&mut reader, &pool).expect("parse");

        assert_eq!(attributes, vec![Attribute::SourceFile(2)]);
        assert_eq!(find_source_file(&attributes, &pool), Some("Foo.java"));
    }

    #[test]
    fn decodes_code_attribute_with_exception_table() {
        let pool = pool_with_names(&["Code"]);
        let mut payload = Vec::new();
        payload.extend_from_slice(&2u16.to_be_bytes()); // max_stack
        payload.extend_from_slice(&3u16.to_be_bytes()); // max_locals
        payload.extend_from_slice(&1u32.to_be_bytes()); // code_length
        payload.push(0xb1); // return
        payload.extend_from_slice(&1u16.to_be_bytes()); // exception entries
        for value in [0u16, 1, 1, 0] {
            payload.extend_from_slice(&value.to_be_bytes());
        }
        payload.extend_from_slice(&0u16.to_be_bytes()); // nested attributes
        let bytes = attribute_bytes(1, &payload);
        let mut reader = ClassReader::new(&bytes);

        let attributes = Attribute::parse_list(&mut reader, &pool).expect("parse");
        let code = find_code(&attributes).expect("code attribute");

        assert_eq!(code.max_stack, 2);
        assert_eq!(code.max_locals, 3);
        assert_eq!(code.code, vec![0xb1]);
        assert_eq!(code.exception_table.len(), 1);
        assert_eq!(code.exception_table[0].catch_type, 0);
    }

    #[test]
    fn rejects_length_mismatch() {
        let pool = pool_with_names(&["SourceFile"]);
        // Declared length 4 but SourceFile consumes 2.
        let bytes = attribute_bytes(1, &[0x00, 0x01, 0x00, 0x00]);
        let mut reader = ClassReader::new(&bytes);

        let err = Attribute::parse_list(&mut reader, &pool).expect_err("mismatch");
        assert!(matches!(err, ClassError::BadAttribute { .. }));
    }

    #[test]
    fn preserves_unknown_attributes() {
        let pool = pool_with_names(&["LineNumberTable"]);
        let bytes = attribute_bytes(1, &[0xDE, 0xAD]);
        let mut reader = ClassReader::new(&bytes);

        let attributes = Attribute::parse_list(&mut reader, &pool).expect("parse");

        assert_eq!(
            attributes,
            vec![Attribute::Unknown {
                name_index: 1,
                data: vec![0xDE, 0xAD],
            }]
        );
    }
}

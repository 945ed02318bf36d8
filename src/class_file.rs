use crate::attributes::{self, Attribute, CodeAttribute};
use crate::constant_pool::ConstantPool;
use crate::error::{ClassError, Result};
use crate::flags::AccessFlags;
use crate::reader::ClassReader;

/// Highest class file major version these tools understand (Java 7).
pub const MAX_MAJOR_VERSION: u16 = 51;

/// One parsed class file. Indices point into `constant_pool`; resolution is
/// lazy and always goes through the pool accessors.
#[derive(Debug)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub access_flags: AccessFlags,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    pub attributes: Vec<Attribute>,
    /// Total byte size of the class structure.
    pub size: usize,
}

/// Field record. Name resolution takes the owning pool explicitly.
#[derive(Debug)]
pub struct Field {
    pub access_flags: AccessFlags,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<Attribute>,
}

/// Method record, same shape as `Field`.
#[derive(Debug)]
pub struct Method {
    pub access_flags: AccessFlags,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<Attribute>,
}

impl ClassFile {
    /// Parse a complete `.class` byte slice. Trailing bytes are an error.
    pub fn parse(data: &[u8]) -> Result<ClassFile> {
        let mut reader = ClassReader::new(data);

        let magic = reader.read_u32()?;
        if magic != 0xCAFEBABE {
            return Err(ClassError::BadMagic(magic));
        }
        let minor_version = reader.read_u16()?;
        let major_version = reader.read_u16()?;
        if major_version > MAX_MAJOR_VERSION {
            return Err(ClassError::UnsupportedVersion {
                major: major_version,
                minor: minor_version,
            });
        }

        let constant_pool = ConstantPool::parse(&mut reader)?;
        let access_flags = AccessFlags::from_bits_truncate(reader.read_u16()?);
        let this_class = reader.read_u16()?;
        let super_class = reader.read_u16()?;

        let interfaces_count = reader.read_u16()?;
        let interfaces = (0..interfaces_count)
            .map(|_| reader.read_u16())
            .collect::<Result<Vec<_>>>()?;

        let fields_count = reader.read_u16()?;
        let fields = (0..fields_count)
            .map(|_| {
                let (access_flags, name_index, descriptor_index, attributes) =
                    parse_member(&mut reader, &constant_pool)?;
                Ok(Field {
                    access_flags,
                    name_index,
                    descriptor_index,
                    attributes,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let methods_count = reader.read_u16()?;
        let methods = (0..methods_count)
            .map(|_| {
                let (access_flags, name_index, descriptor_index, attributes) =
                    parse_member(&mut reader, &constant_pool)?;
                Ok(Method {
                    access_flags,
                    name_index,
                    descriptor_index,
                    attributes,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let attributes = Attribute::parse_list(&mut reader, &constant_pool)?;

        let size = reader.position();
        if reader.remaining() != 0 {
            return Err(ClassError::ExtraData(reader.remaining()));
        }

        Ok(ClassFile {
            minor_version,
            major_version,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
            size,
        })
    }

    /// Internal (slash-form) name of this class.
    pub fn class_name(&self) -> Result<&str> {
        self.constant_pool.class_name(self.this_class)
    }

    /// Internal name of the super class; `None` at the root of the hierarchy.
    pub fn super_name(&self) -> Result<Option<&str>> {
        if self.super_class == 0 {
            return Ok(None);
        }
        self.constant_pool.class_name(self.super_class).map(Some)
    }

    pub fn interface_names(&self) -> Result<Vec<&str>> {
        self.interfaces
            .iter()
            .map(|&index| self.constant_pool.class_name(index))
            .collect()
    }

    pub fn source_file(&self) -> Option<&str> {
        attributes::find_source_file(&self.attributes, &self.constant_pool)
    }
}

impl Field {
    pub fn name<'a>(&self, pool: &'a ConstantPool) -> Result<&'a str> {
        pool.utf8(self.name_index)
    }

    pub fn descriptor<'a>(&self, pool: &'a ConstantPool) -> Result<&'a str> {
        pool.utf8(self.descriptor_index)
    }
}

impl Method {
    pub fn name<'a>(&self, pool: &'a ConstantPool) -> Result<&'a str> {
        pool.utf8(self.name_index)
    }

    pub fn descriptor<'a>(&self, pool: &'a ConstantPool) -> Result<&'a str> {
        pool.utf8(self.descriptor_index)
    }

    pub fn code(&self) -> Option<&CodeAttribute> {
        attributes::find_code(&self.attributes)
    }

    pub fn exceptions(&self) -> Option<&[u16]> {
        attributes::find_exceptions(&self.attributes)
    }
}

fn parse_member(
    reader: &mut ClassReader,
    pool: &ConstantPool,
) -> Result<(AccessFlags, u16, u16, Vec<Attribute>)> {
    let access_flags = AccessFlags::from_bits_truncate(reader.read_u16()?);
    let name_index = reader.read_u16()?;
    let descriptor_index = reader.read_u16()?;
    let attributes = Attribute::parse_list(reader, pool)?;
    Ok((access_flags, name_index, descriptor_index, attributes))
}

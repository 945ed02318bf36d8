//! In-crate builder producing small, well-formed class files for tests.

/// Constant pool entries the builder can emit.
enum CpEntry {
    Utf8(String),
    Class(u16),
    Str(u16),
    NameAndType(u16, u16),
    FieldRef(u16, u16),
    MethodRef(u16, u16),
}

impl CpEntry {
    fn write(&self, bytes: &mut Vec<u8>) {
        match self {
            CpEntry::Utf8(value) => {
                bytes.push(1);
                write_u16(bytes, value.len() as u16);
                bytes.extend_from_slice(value.as_bytes());
            }
            CpEntry::Class(name_index) => {
                bytes.push(7);
                write_u16(bytes, *name_index);
            }
            CpEntry::Str(string_index) => {
                bytes.push(8);
                write_u16(bytes, *string_index);
            }
            CpEntry::NameAndType(name_index, descriptor_index) => {
                bytes.push(12);
                write_u16(bytes, *name_index);
                write_u16(bytes, *descriptor_index);
            }
            CpEntry::FieldRef(class_index, name_and_type) => {
                bytes.push(9);
                write_u16(bytes, *class_index);
                write_u16(bytes, *name_and_type);
            }
            CpEntry::MethodRef(class_index, name_and_type) => {
                bytes.push(10);
                write_u16(bytes, *class_index);
                write_u16(bytes, *name_and_type);
            }
        }
    }
}

struct FieldSpec {
    access_flags: u16,
    name_index: u16,
    descriptor_index: u16,
}

struct MethodSpec {
    access_flags: u16,
    name_index: u16,
    descriptor_index: u16,
    code: Option<Vec<u8>>,
    max_stack: u16,
    max_locals: u16,
    handlers: Vec<(u16, u16, u16, u16)>,
    exceptions: Vec<u16>,
}

/// Builds class files at major version 50 with public+super access flags.
pub(crate) struct ClassFileBuilder {
    cp: Vec<CpEntry>,
    access_flags: u16,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<FieldSpec>,
    methods: Vec<MethodSpec>,
    code_index: u16,
    exceptions_index: Option<u16>,
    source_file: Option<(u16, u16)>,
}

impl ClassFileBuilder {
    pub(crate) fn new(class_name: &str, super_name: &str) -> Self {
        let mut builder = Self {
            cp: Vec::new(),
            access_flags: 0x0021,
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            code_index: 0,
            exceptions_index: None,
            source_file: None,
        };
        builder.code_index = builder.add_utf8("Code");
        builder.this_class = builder.add_class(class_name);
        builder.super_class = builder.add_class(super_name);
        builder
    }

    pub(crate) fn set_access_flags(&mut self, access_flags: u16) {
        self.access_flags = access_flags;
    }

    pub(crate) fn add_utf8(&mut self, value: &str) -> u16 {
        self.cp.push(CpEntry::Utf8(value.to_string()));
        self.cp.len() as u16
    }

    pub(crate) fn add_class(&mut self, name: &str) -> u16 {
        let name_index = self.add_utf8(name);
        self.cp.push(CpEntry::Class(name_index));
        self.cp.len() as u16
    }

    pub(crate) fn add_string(&mut self, value: &str) -> u16 {
        let string_index = self.add_utf8(value);
        self.cp.push(CpEntry::Str(string_index));
        self.cp.len() as u16
    }

    pub(crate) fn add_name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.add_utf8(name);
        let descriptor_index = self.add_utf8(descriptor);
        self.cp
            .push(CpEntry::NameAndType(name_index, descriptor_index));
        self.cp.len() as u16
    }

    pub(crate) fn add_field_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.add_class(class);
        let name_and_type = self.add_name_and_type(name, descriptor);
        self.cp.push(CpEntry::FieldRef(class_index, name_and_type));
        self.cp.len() as u16
    }

    pub(crate) fn add_method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.add_class(class);
        let name_and_type = self.add_name_and_type(name, descriptor);
        self.cp.push(CpEntry::MethodRef(class_index, name_and_type));
        self.cp.len() as u16
    }

    pub(crate) fn add_interface(&mut self, name: &str) {
        let index = self.add_class(name);
        self.interfaces.push(index);
    }

    pub(crate) fn add_field(&mut self, access_flags: u16, name: &str, descriptor: &str) {
        let name_index = self.add_utf8(name);
        let descriptor_index = self.add_utf8(descriptor);
        self.fields.push(FieldSpec {
            access_flags,
            name_index,
            descriptor_index,
        });
    }

    pub(crate) fn add_method(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        code: Vec<u8>,
        max_stack: u16,
        max_locals: u16,
    ) {
        self.add_method_with_handlers(
            access_flags,
            name,
            descriptor,
            code,
            max_stack,
            max_locals,
            Vec::new(),
            Vec::new(),
        );
    }

    /// Method without a Code attribute (abstract or native).
    pub(crate) fn add_abstract_method(&mut self, access_flags: u16, name: &str, descriptor: &str) {
        let name_index = self.add_utf8(name);
        let descriptor_index = self.add_utf8(descriptor);
        self.methods.push(MethodSpec {
            access_flags,
            name_index,
            descriptor_index,
            code: None,
            max_stack: 0,
            max_locals: 0,
            handlers: Vec::new(),
            exceptions: Vec::new(),
        });
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn add_method_with_handlers(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        code: Vec<u8>,
        max_stack: u16,
        max_locals: u16,
        handlers: Vec<(u16, u16, u16, u16)>,
        exceptions: Vec<u16>,
    ) {
        let name_index = self.add_utf8(name);
        let descriptor_index = self.add_utf8(descriptor);
        if !exceptions.is_empty() && self.exceptions_index.is_none() {
            self.exceptions_index = Some(self.add_utf8("Exceptions"));
        }
        self.methods.push(MethodSpec {
            access_flags,
            name_index,
            descriptor_index,
            code: Some(code),
            max_stack,
            max_locals,
            handlers,
            exceptions,
        });
    }

    pub(crate) fn set_source_file(&mut self, file_name: &str) {
        let attribute_name = self.add_utf8("SourceFile");
        let value = self.add_utf8(file_name);
        self.source_file = Some((attribute_name, value));
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        let mut bytes = Vec::new();
        write_u32(&mut bytes, 0xCAFEBABE);
        write_u16(&mut bytes, 0);
        write_u16(&mut bytes, 50);
        write_u16(&mut bytes, (self.cp.len() + 1) as u16);
        for entry in &self.cp {
            entry.write(&mut bytes);
        }
        write_u16(&mut bytes, self.access_flags);
        write_u16(&mut bytes, self.this_class);
        write_u16(&mut bytes, self.super_class);
        write_u16(&mut bytes, self.interfaces.len() as u16);
        for index in &self.interfaces {
            write_u16(&mut bytes, *index);
        }
        write_u16(&mut bytes, self.fields.len() as u16);
        for field in &self.fields {
            write_u16(&mut bytes, field.access_flags);
            write_u16(&mut bytes, field.name_index);
            write_u16(&mut bytes, field.descriptor_index);
            write_u16(&mut bytes, 0);
        }
        write_u16(&mut bytes, self.methods.len() as u16);
        for method in &self.methods {
            write_u16(&mut bytes, method.access_flags);
            write_u16(&mut bytes, method.name_index);
            write_u16(&mut bytes, method.descriptor_index);
            let mut attribute_count = 0u16;
            if method.code.is_some() {
                attribute_count += 1;
            }
            if !method.exceptions.is_empty() {
                attribute_count += 1;
            }
            write_u16(&mut bytes, attribute_count);
            if let Some(code) = &method.code {
                write_u16(&mut bytes, self.code_index);
                let attr_len = 12 + code.len() + 8 * method.handlers.len();
                write_u32(&mut bytes, attr_len as u32);
                write_u16(&mut bytes, method.max_stack);
                write_u16(&mut bytes, method.max_locals);
                write_u32(&mut bytes, code.len() as u32);
                bytes.extend_from_slice(code);
                write_u16(&mut bytes, method.handlers.len() as u16);
                for (start_pc, end_pc, handler_pc, catch_type) in &method.handlers {
                    write_u16(&mut bytes, *start_pc);
                    write_u16(&mut bytes, *end_pc);
                    write_u16(&mut bytes, *handler_pc);
                    write_u16(&mut bytes, *catch_type);
                }
                write_u16(&mut bytes, 0);
            }
            if !method.exceptions.is_empty() {
                let index = self.exceptions_index.expect("Exceptions name allocated");
                write_u16(&mut bytes, index);
                write_u32(&mut bytes, (2 + 2 * method.exceptions.len()) as u32);
                write_u16(&mut bytes, method.exceptions.len() as u16);
                for exception in &method.exceptions {
                    write_u16(&mut bytes, *exception);
                }
            }
        }
        let class_attribute_count = if self.source_file.is_some() { 1 } else { 0 };
        write_u16(&mut bytes, class_attribute_count);
        if let Some((attribute_name, value)) = self.source_file {
            write_u16(&mut bytes, attribute_name);
            write_u32(&mut bytes, 2);
            write_u16(&mut bytes, value);
        }
        bytes
    }
}

fn write_u16(bytes: &mut Vec<u8>, value: u16) {
    bytes.extend_from_slice(&value.to_be_bytes());
}

fn write_u32(bytes: &mut Vec<u8>, value: u32) {
    bytes.extend_from_slice(&value.to_be_bytes());
}

use bitflags::bitflags;

bitflags! {
    /// JVM access and property flags for classes, fields, and methods.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct AccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        // 0x0020 is ACC_SUPER on classes and ACC_SYNCHRONIZED on methods.
        const SUPER_OR_SYNCHRONIZED = 0x0020;
        const VOLATILE = 0x0040;
        const TRANSIENT = 0x0080;
        const NATIVE = 0x0100;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
    }
}

impl AccessFlags {
    pub fn is_public(self) -> bool {
        self.contains(AccessFlags::PUBLIC)
    }

    pub fn is_private(self) -> bool {
        self.contains(AccessFlags::PRIVATE)
    }

    pub fn is_static(self) -> bool {
        self.contains(AccessFlags::STATIC)
    }

    pub fn is_interface(self) -> bool {
        self.contains(AccessFlags::INTERFACE)
    }

    pub fn is_abstract(self) -> bool {
        self.contains(AccessFlags::ABSTRACT)
    }

    pub fn is_native(self) -> bool {
        self.contains(AccessFlags::NATIVE)
    }

    /// Modifier keywords for a class declaration.
    pub fn class_modifiers(self) -> String {
        let mut words = Vec::new();
        if self.contains(AccessFlags::PUBLIC) {
            words.push("public");
        }
        if self.contains(AccessFlags::FINAL) {
            words.push("final");
        }
        if self.contains(AccessFlags::ABSTRACT) && !self.contains(AccessFlags::INTERFACE) {
            words.push("abstract");
        }
        words.join(" ")
    }

    /// Modifier keywords for a field declaration.
    pub fn field_modifiers(self) -> String {
        let mut words = Vec::new();
        self.push_member_visibility(&mut words);
        if self.contains(AccessFlags::STATIC) {
            words.push("static");
        }
        if self.contains(AccessFlags::FINAL) {
            words.push("final");
        }
        if self.contains(AccessFlags::VOLATILE) {
            words.push("volatile");
        }
        if self.contains(AccessFlags::TRANSIENT) {
            words.push("transient");
        }
        words.join(" ")
    }

    /// Modifier keywords for a method declaration.
    pub fn method_modifiers(self) -> String {
        let mut words = Vec::new();
        self.push_member_visibility(&mut words);
        if self.contains(AccessFlags::STATIC) {
            words.push("static");
        }
        if self.contains(AccessFlags::FINAL) {
            words.push("final");
        }
        if self.contains(AccessFlags::SUPER_OR_SYNCHRONIZED) {
            words.push("synchronized");
        }
        if self.contains(AccessFlags::NATIVE) {
            words.push("native");
        }
        if self.contains(AccessFlags::ABSTRACT) {
            words.push("abstract");
        }
        if self.contains(AccessFlags::STRICT) {
            words.push("strictfp");
        }
        words.join(" ")
    }

    fn push_member_visibility(self, words: &mut Vec<&'static str>) {
        if self.contains(AccessFlags::PUBLIC) {
            words.push("public");
        } else if self.contains(AccessFlags::PRIVATE) {
            words.push("private");
        } else if self.contains(AccessFlags::PROTECTED) {
            words.push("protected");
        }
    }
}

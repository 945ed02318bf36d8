use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::{ClassError, Result};

// Byte size assumed for reference and array fields. Written once by the CLI
// front-ends (--m32/--m64) before any extraction runs.
static POINTER_SIZE: AtomicU32 = AtomicU32::new(8);

pub fn set_pointer_size(bytes: u32) {
    POINTER_SIZE.store(bytes, Ordering::Relaxed);
}

pub fn pointer_size() -> u32 {
    POINTER_SIZE.load(Ordering::Relaxed)
}

/// Convert an internal slash-form name, optionally wrapped in `L...;`, to
/// dotted form.
pub fn fqcn(name: &str) -> String {
    let inner = name
        .strip_prefix('L')
        .and_then(|rest| rest.strip_suffix(';'))
        .unwrap_or(name);
    inner.replace('/', ".")
}

/// Demangle one field descriptor at the head of `input`. Returns the
/// human-readable type and the number of bytes consumed.
pub fn demangle_field_descriptor(input: &str) -> Result<(String, usize)> {
    let bytes = input.as_bytes();
    let mut dimensions = 0usize;
    while bytes.get(dimensions) == Some(&b'[') {
        dimensions += 1;
    }

    let (base, consumed) = match bytes.get(dimensions) {
        Some(b'B') => ("byte".to_string(), 1),
        Some(b'C') => ("char".to_string(), 1),
        Some(b'D') => ("double".to_string(), 1),
        Some(b'F') => ("float".to_string(), 1),
        Some(b'I') => ("int".to_string(), 1),
        Some(b'J') => ("long".to_string(), 1),
        Some(b'S') => ("short".to_string(), 1),
        Some(b'Z') => ("boolean".to_string(), 1),
        Some(b'L') => {
            let rest = &input[dimensions + 1..];
            let end = rest
                .find(';')
                .ok_or_else(|| ClassError::BadDescriptor(input.to_string()))?;
            (fqcn(&rest[..end]), end + 2)
        }
        _ => return Err(ClassError::BadDescriptor(input.to_string())),
    };

    let mut rendered = base;
    for _ in 0..dimensions {
        rendered.push_str("[]");
    }
    Ok((rendered, dimensions + consumed))
}

/// Demangle a method descriptor into parameter type renderings and the
/// return type rendering.
pub fn demangle_method_descriptor(input: &str) -> Result<(Vec<String>, String)> {
    let rest = input
        .strip_prefix('(')
        .ok_or_else(|| ClassError::BadDescriptor(input.to_string()))?;
    let mut parameters = Vec::new();
    let mut offset = 0;
    loop {
        match rest[offset..].chars().next() {
            Some(')') => {
                offset += 1;
                break;
            }
            Some(_) => {
                let (rendered, consumed) = demangle_field_descriptor(&rest[offset..])
                    .map_err(|_| ClassError::BadDescriptor(input.to_string()))?;
                parameters.push(rendered);
                offset += consumed;
            }
            None => return Err(ClassError::BadDescriptor(input.to_string())),
        }
    }

    let return_desc = &rest[offset..];
    let return_type = if return_desc == "V" {
        "void".to_string()
    } else {
        let (rendered, consumed) = demangle_field_descriptor(return_desc)
            .map_err(|_| ClassError::BadDescriptor(input.to_string()))?;
        if consumed != return_desc.len() {
            return Err(ClassError::BadDescriptor(input.to_string()));
        }
        rendered
    };
    Ok((parameters, return_type))
}

/// Byte size of a field of the given descriptor. References and arrays use
/// the process-wide pointer size.
pub fn size_field_descriptor(descriptor: &str) -> Result<u64> {
    match descriptor.chars().next() {
        Some('J') | Some('D') => Ok(8),
        Some('B') | Some('Z') => Ok(1),
        Some('S') | Some('C') => Ok(2),
        Some('I') | Some('F') => Ok(4),
        Some('L') | Some('[') => Ok(pointer_size() as u64),
        _ => Err(ClassError::BadDescriptor(descriptor.to_string())),
    }
}

/// Number of declared parameters in a method descriptor.
pub fn method_param_count(descriptor: &str) -> Result<usize> {
    demangle_method_descriptor(descriptor).map(|(parameters, _)| parameters.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demangles_reference_and_array_types() {
        assert_eq!(
            demangle_field_descriptor("Ljava/lang/String;").expect("string"),
            ("java.lang.String".to_string(), 18)
        );
        assert_eq!(
            demangle_field_descriptor("[[I").expect("int[][]"),
            ("int[][]".to_string(), 3)
        );
        assert_eq!(
            demangle_field_descriptor("[Ljava/lang/Object;").expect("object[]"),
            ("java.lang.Object[]".to_string(), 19)
        );
    }

    #[test]
    fn demangles_method_descriptor() {
        let (parameters, return_type) =
            demangle_method_descriptor("(Ljava/lang/String;[I)V").expect("demangle");
        assert_eq!(parameters, vec!["java.lang.String", "int[]"]);
        assert_eq!(return_type, "void");
    }

    #[test]
    fn demangles_empty_parameter_list() {
        let (parameters, return_type) = demangle_method_descriptor("()J").expect("demangle");
        assert!(parameters.is_empty());
        assert_eq!(return_type, "long");
    }

    #[test]
    fn rejects_malformed_descriptors() {
        assert!(matches!(
            demangle_field_descriptor("Ljava/lang/String"),
            Err(ClassError::BadDescriptor(_))
        ));
        assert!(matches!(
            demangle_field_descriptor("Q"),
            Err(ClassError::BadDescriptor(_))
        ));
        assert!(matches!(
            demangle_method_descriptor("(I"),
            Err(ClassError::BadDescriptor(_))
        ));
        assert!(matches!(
            demangle_method_descriptor("(I)II"),
            Err(ClassError::BadDescriptor(_))
        ));
    }

    #[test]
    fn sizes_follow_base_type() {
        assert_eq!(size_field_descriptor("J").expect("long"), 8);
        assert_eq!(size_field_descriptor("D").expect("double"), 8);
        assert_eq!(size_field_descriptor("B").expect("byte"), 1);
        assert_eq!(size_field_descriptor("Z").expect("boolean"), 1);
        assert_eq!(size_field_descriptor("S").expect("short"), 2);
        assert_eq!(size_field_descriptor("C").expect("char"), 2);
        assert_eq!(size_field_descriptor("I").expect("int"), 4);
        assert_eq!(size_field_descriptor("F").expect("float"), 4);
    }

    #[test]
    fn references_and_arrays_use_pointer_size() {
        assert_eq!(
            size_field_descriptor("Ljava/lang/String;").expect("reference"),
            pointer_size() as u64
        );
        assert_eq!(
            size_field_descriptor("[J").expect("array"),
            pointer_size() as u64
        );
    }

    #[test]
    fn fqcn_handles_both_forms() {
        assert_eq!(fqcn("java/lang/String"), "java.lang.String");
        assert_eq!(fqcn("Ljava/util/Map;"), "java.util.Map");
    }
}

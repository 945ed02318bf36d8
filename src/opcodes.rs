use std::sync::OnceLock;

use crate::error::{ClassError, Result};

/// Operand layout element for a fixed-length instruction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OperandSpec {
    /// 1-byte constant pool index (`ldc`).
    CpIndex8,
    /// 2-byte constant pool index.
    CpIndex16,
    /// 1-byte local variable index.
    Local8,
    /// 2-byte signed branch offset relative to this opcode's pc.
    Branch16,
    /// 4-byte signed branch offset (`goto_w`, `jsr_w`).
    Branch32,
    /// Array type code for `newarray`.
    ArrayType,
    /// 1-byte signed literal.
    Imm8,
    /// 2-byte signed literal.
    Imm16,
    /// 1-byte unsigned count (`invokeinterface`, `multianewarray`).
    Count8,
    /// Required zero byte.
    Zero8,
}

/// Operand layout for one opcode.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Layout {
    Fixed(&'static [OperandSpec]),
    TableSwitch,
    LookupSwitch,
    Wide,
}

/// Dispatch table entry: mnemonic plus operand layout.
#[derive(Clone, Copy, Debug)]
pub struct OpInfo {
    pub mnemonic: &'static str,
    pub layout: Layout,
}

/// Decoded operand value.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    CpIndex(u16),
    Local(u16),
    /// Absolute target pc.
    Branch(i32),
    ArrayType(u8),
    Immediate(i32),
    Count(u8),
    Table(TableSwitch),
    Lookup(LookupSwitch),
}

/// Decoded `tableswitch` payload. Offsets are relative to the opcode's pc.
#[derive(Clone, Debug, PartialEq)]
pub struct TableSwitch {
    pub default: i32,
    pub low: i32,
    pub high: i32,
    pub offsets: Vec<i32>,
}

/// Decoded `lookupswitch` payload.
#[derive(Clone, Debug, PartialEq)]
pub struct LookupSwitch {
    pub default: i32,
    pub pairs: Vec<(i32, i32)>,
}

/// One walked instruction. For `wide`-modified instructions the mnemonic is
/// the inner instruction's and `pc` is the `wide` opcode's.
#[derive(Clone, Debug)]
pub struct Instruction {
    pub pc: u32,
    pub opcode: u8,
    pub mnemonic: &'static str,
    pub operands: Vec<Operand>,
}

const NO_OPERANDS: Layout = Layout::Fixed(&[]);
const CP16: Layout = Layout::Fixed(&[OperandSpec::CpIndex16]);
const LOCAL8: Layout = Layout::Fixed(&[OperandSpec::Local8]);
const BRANCH16: Layout = Layout::Fixed(&[OperandSpec::Branch16]);
const BRANCH32: Layout = Layout::Fixed(&[OperandSpec::Branch32]);

#[rustfmt::skip]
const DESCRIPTIONS: &[(u8, &str, Layout)] = &[
    (0x00, "nop", NO_OPERANDS),
    (0x01, "aconst_null", NO_OPERANDS),
    (0x02, "iconst_m1", NO_OPERANDS),
    (0x03, "iconst_0", NO_OPERANDS),
    (0x04, "iconst_1", NO_OPERANDS),
    (0x05, "iconst_2", NO_OPERANDS),
    (0x06, "iconst_3", NO_OPERANDS),
    (0x07, "iconst_4", NO_OPERANDS),
    (0x08, "iconst_5", NO_OPERANDS),
    (0x09, "lconst_0", NO_OPERANDS),
    (0x0a, "lconst_1", NO_OPERANDS),
    (0x0b, "fconst_0", NO_OPERANDS),
    (0x0c, "fconst_1", NO_OPERANDS),
    (0x0d, "fconst_2", NO_OPERANDS),
    (0x0e, "dconst_0", NO_OPERANDS),
    (0x0f, "dconst_1", NO_OPERANDS),
    (0x10, "bipush", Layout::Fixed(&[OperandSpec::Imm8])),
    (0x11, "sipush", Layout::Fixed(&[OperandSpec::Imm16])),
    (0x12, "ldc", Layout::Fixed(&[OperandSpec::CpIndex8])),
    (0x13, "ldc_w", CP16),
    (0x14, "ldc2_w", CP16),
    (0x15, "iload", LOCAL8),
    (0x16, "lload", LOCAL8),
    (0x17, "fload", LOCAL8),
    (0x18, "dload", LOCAL8),
    (0x19, "aload", LOCAL8),
    (0x1a, "iload_0", NO_OPERANDS),
    (0x1b, "iload_1", NO_OPERANDS),
    (0x1c, "iload_2", NO_OPERANDS),
    (0x1d, "iload_3", NO_OPERANDS),
    (0x1e, "lload_0", NO_OPERANDS),
    (0x1f, "lload_1", NO_OPERANDS),
    (0x20, "lload_2", NO_OPERANDS),
    (0x21, "lload_3", NO_OPERANDS),
    (0x22, "fload_0", NO_OPERANDS),
    (0x23, "fload_1", NO_OPERANDS),
    (0x24, "fload_2", NO_OPERANDS),
    (0x25, "fload_3", NO_OPERANDS),
    (0x26, "dload_0", NO_OPERANDS),
    (0x27, "dload_1", NO_OPERANDS),
    (0x28, "dload_2", NO_OPERANDS),
    (0x29, "dload_3", NO_OPERANDS),
    (0x2a, "aload_0", NO_OPERANDS),
    (0x2b, "aload_1", NO_OPERANDS),
    (0x2c, "aload_2", NO_OPERANDS),
    (0x2d, "aload_3", NO_OPERANDS),
    (0x2e, "iaload", NO_OPERANDS),
    (0x2f, "laload", NO_OPERANDS),
    (0x30, "faload", NO_OPERANDS),
    (0x31, "daload", NO_OPERANDS),
    (0x32, "aaload", NO_OPERANDS),
    (0x33, "baload", NO_OPERANDS),
    (0x34, "caload", NO_OPERANDS),
    (0x35, "saload", NO_OPERANDS),
    (0x36, "istore", LOCAL8),
    (0x37, "lstore", LOCAL8),
    (0x38, "fstore", LOCAL8),
    (0x39, "dstore", LOCAL8),
    (0x3a, "astore", LOCAL8),
    (0x3b, "istore_0", NO_OPERANDS),
    (0x3c, "istore_1", NO_OPERANDS),
    (0x3d, "istore_2", NO_OPERANDS),
    (0x3e, "istore_3", NO_OPERANDS),
    (0x3f, "lstore_0", NO_OPERANDS),
    (0x40, "lstore_1", NO_OPERANDS),
    (0x41, "lstore_2", NO_OPERANDS),
    (0x42, "lstore_3", NO_OPERANDS),
    (0x43, "fstore_0", NO_OPERANDS),
    (0x44, "fstore_1", NO_OPERANDS),
    (0x45, "fstore_2", NO_OPERANDS),
    (0x46, "fstore_3", NO_OPERANDS),
    (0x47, "dstore_0", NO_OPERANDS),
    (0x48, "dstore_1", NO_OPERANDS),
    (0x49, "dstore_2", NO_OPERANDS),
    (0x4a, "dstore_3", NO_OPERANDS),
    (0x4b, "astore_0", NO_OPERANDS),
    (0x4c, "astore_1", NO_OPERANDS),
    (0x4d, "astore_2", NO_OPERANDS),
    (0x4e, "astore_3", NO_OPERANDS),
    (0x4f, "iastore", NO_OPERANDS),
    (0x50, "lastore", NO_OPERANDS),
    (0x51, "fastore", NO_OPERANDS),
    (0x52, "dastore", NO_OPERANDS),
    (0x53, "aastore", NO_OPERANDS),
    (0x54, "bastore", NO_OPERANDS),
    (0x55, "castore", NO_OPERANDS),
    (0x56, "sastore", NO_OPERANDS),
    (0x57, "pop", NO_OPERANDS),
    (0x58, "pop2", NO_OPERANDS),
    (0x59, "dup", NO_OPERANDS),
    (0x5a, "dup_x1", NO_OPERANDS),
    (0x5b, "dup_x2", NO_OPERANDS),
    (0x5c, "dup2", NO_OPERANDS),
    (0x5d, "dup2_x1", NO_OPERANDS),
    (0x5e, "dup2_x2", NO_OPERANDS),
    (0x5f, "swap", NO_OPERANDS),
    (0x60, "iadd", NO_OPERANDS),
    (0x61, "ladd", NO_OPERANDS),
    (0x62, "fadd", NO_OPERANDS),
    (0x63, "dadd", NO_OPERANDS),
    (0x64, "isub", NO_OPERANDS),
    (0x65, "lsub", NO_OPERANDS),
    (0x66, "fsub", NO_OPERANDS),
    (0x67, "dsub", NO_OPERANDS),
    (0x68, "imul", NO_OPERANDS),
    (0x69, "lmul", NO_OPERANDS),
    (0x6a, "fmul", NO_OPERANDS),
    (0x6b, "dmul", NO_OPERANDS),
    (0x6c, "idiv", NO_OPERANDS),
    (0x6d, "ldiv", NO_OPERANDS),
    (0x6e, "fdiv", NO_OPERANDS),
    (0x6f, "ddiv", NO_OPERANDS),
    (0x70, "irem", NO_OPERANDS),
    (0x71, "lrem", NO_OPERANDS),
    (0x72, "frem", NO_OPERANDS),
    (0x73, "drem", NO_OPERANDS),
    (0x74, "ineg", NO_OPERANDS),
    (0x75, "lneg", NO_OPERANDS),
    (0x76, "fneg", NO_OPERANDS),
    (0x77, "dneg", NO_OPERANDS),
    (0x78, "ishl", NO_OPERANDS),
    (0x79, "lshl", NO_OPERANDS),
    (0x7a, "ishr", NO_OPERANDS),
    (0x7b, "lshr", NO_OPERANDS),
    (0x7c, "iushr", NO_OPERANDS),
    (0x7d, "lushr", NO_OPERANDS),
    (0x7e, "iand", NO_OPERANDS),
    (0x7f, "land", NO_OPERANDS),
    (0x80, "ior", NO_OPERANDS),
    (0x81, "lor", NO_OPERANDS),
    (0x82, "ixor", NO_OPERANDS),
    (0x83, "lxor", NO_OPERANDS),
    (0x84, "iinc", Layout::Fixed(&[OperandSpec::Local8, OperandSpec::Imm8])),
    (0x85, "i2l", NO_OPERANDS),
    (0x86, "i2f", NO_OPERANDS),
    (0x87, "i2d", NO_OPERANDS),
    (0x88, "l2i", NO_OPERANDS),
    (0x89, "l2f", NO_OPERANDS),
    (0x8a, "l2d", NO_OPERANDS),
    (0x8b, "f2i", NO_OPERANDS),
    (0x8c, "f2l", NO_OPERANDS),
    (0x8d, "f2d", NO_OPERANDS),
    (0x8e, "d2i", NO_OPERANDS),
    (0x8f, "d2l", NO_OPERANDS),
    (0x90, "d2f", NO_OPERANDS),
    (0x91, "i2b", NO_OPERANDS),
    (0x92, "i2c", NO_OPERANDS),
    (0x93, "i2s", NO_OPERANDS),
    (0x94, "lcmp", NO_OPERANDS),
    (0x95, "fcmpl", NO_OPERANDS),
    (0x96, "fcmpg", NO_OPERANDS),
    (0x97, "dcmpl", NO_OPERANDS),
    (0x98, "dcmpg", NO_OPERANDS),
    (0x99, "ifeq", BRANCH16),
    (0x9a, "ifne", BRANCH16),
    (0x9b, "iflt", BRANCH16),
    (0x9c, "ifge", BRANCH16),
    (0x9d, "ifgt", BRANCH16),
    (0x9e, "ifle", BRANCH16),
    (0x9f, "if_icmpeq", BRANCH16),
    (0xa0, "if_icmpne", BRANCH16),
    (0xa1, "if_icmplt", BRANCH16),
    (0xa2, "if_icmpge", BRANCH16),
    (0xa3, "if_icmpgt", BRANCH16),
    (0xa4, "if_icmple", BRANCH16),
    (0xa5, "if_acmpeq", BRANCH16),
    (0xa6, "if_acmpne", BRANCH16),
    (0xa7, "goto", BRANCH16),
    (0xa8, "jsr", BRANCH16),
    (0xa9, "ret", LOCAL8),
    (0xaa, "tableswitch", Layout::TableSwitch),
    (0xab, "lookupswitch", Layout::LookupSwitch),
    (0xac, "ireturn", NO_OPERANDS),
    (0xad, "lreturn", NO_OPERANDS),
    (0xae, "freturn", NO_OPERANDS),
    (0xaf, "dreturn", NO_OPERANDS),
    (0xb0, "areturn", NO_OPERANDS),
    (0xb1, "return", NO_OPERANDS),
    (0xb2, "getstatic", CP16),
    (0xb3, "putstatic", CP16),
    (0xb4, "getfield", CP16),
    (0xb5, "putfield", CP16),
    (0xb6, "invokevirtual", CP16),
    (0xb7, "invokespecial", CP16),
    (0xb8, "invokestatic", CP16),
    (0xb9, "invokeinterface", Layout::Fixed(&[OperandSpec::CpIndex16, OperandSpec::Count8, OperandSpec::Zero8])),
    (0xba, "invokedynamic", Layout::Fixed(&[OperandSpec::CpIndex16, OperandSpec::Zero8, OperandSpec::Zero8])),
    (0xbb, "new", CP16),
    (0xbc, "newarray", Layout::Fixed(&[OperandSpec::ArrayType])),
    (0xbd, "anewarray", CP16),
    (0xbe, "arraylength", NO_OPERANDS),
    (0xbf, "athrow", NO_OPERANDS),
    (0xc0, "checkcast", CP16),
    (0xc1, "instanceof", CP16),
    (0xc2, "monitorenter", NO_OPERANDS),
    (0xc3, "monitorexit", NO_OPERANDS),
    (0xc4, "wide", Layout::Wide),
    (0xc5, "multianewarray", Layout::Fixed(&[OperandSpec::CpIndex16, OperandSpec::Count8])),
    (0xc6, "ifnull", BRANCH16),
    (0xc7, "ifnonnull", BRANCH16),
    (0xc8, "goto_w", BRANCH32),
    (0xc9, "jsr_w", BRANCH32),
];

/// Dispatch table entry for `opcode`, or `None` for an undefined opcode.
pub fn op_info(opcode: u8) -> Option<&'static OpInfo> {
    static TABLE: OnceLock<[Option<OpInfo>; 256]> = OnceLock::new();
    let table = TABLE.get_or_init(|| {
        let mut table = [None; 256];
        for &(opcode, mnemonic, layout) in DESCRIPTIONS {
            table[opcode as usize] = Some(OpInfo { mnemonic, layout });
        }
        table
    });
    table[opcode as usize].as_ref()
}

/// Walk a method's code buffer, yielding instructions in pc order.
pub fn walk(code: &[u8]) -> BytecodeWalker<'_> {
    BytecodeWalker { code, pc: 0 }
}

pub struct BytecodeWalker<'a> {
    code: &'a [u8],
    pc: usize,
}

impl Iterator for BytecodeWalker<'_> {
    type Item = Result<Instruction>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pc >= self.code.len() {
            return None;
        }
        let result = self.decode_at(self.pc);
        match &result {
            Ok((_, next)) => self.pc = *next,
            // Decoding cannot resynchronize after an error.
            Err(_) => self.pc = self.code.len(),
        }
        Some(result.map(|(instruction, _)| instruction))
    }
}

impl BytecodeWalker<'_> {
    fn decode_at(&self, pc: usize) -> Result<(Instruction, usize)> {
        let opcode = self.code[pc];
        let info = op_info(opcode).ok_or_else(|| ClassError::BadBytecode {
            pc: pc as u32,
            detail: format!("unknown opcode 0x{opcode:02x}"),
        })?;

        match info.layout {
            Layout::Fixed(specs) => {
                let mut cursor = pc + 1;
                let mut operands = Vec::with_capacity(specs.len());
                for spec in specs {
                    let operand = self.decode_operand(pc, &mut cursor, *spec)?;
                    operands.extend(operand);
                }
                Ok((
                    Instruction {
                        pc: pc as u32,
                        opcode,
                        mnemonic: info.mnemonic,
                        operands,
                    },
                    cursor,
                ))
            }
            Layout::TableSwitch => self.decode_tableswitch(pc, opcode, info.mnemonic),
            Layout::LookupSwitch => self.decode_lookupswitch(pc, opcode, info.mnemonic),
            Layout::Wide => self.decode_wide(pc),
        }
    }

    fn decode_operand(
        &self,
        pc: usize,
        cursor: &mut usize,
        spec: OperandSpec,
    ) -> Result<Option<Operand>> {
        let operand = match spec {
            OperandSpec::CpIndex8 => Some(Operand::CpIndex(self.byte(pc, cursor)? as u16)),
            OperandSpec::CpIndex16 => Some(Operand::CpIndex(self.short(pc, cursor)?)),
            OperandSpec::Local8 => Some(Operand::Local(self.byte(pc, cursor)? as u16)),
            OperandSpec::Branch16 => {
                let offset = self.short(pc, cursor)? as i16 as i32;
                Some(Operand::Branch(pc as i32 + offset))
            }
            OperandSpec::Branch32 => {
                let offset = self.int(pc, cursor)?;
                Some(Operand::Branch(pc as i32 + offset))
            }
            OperandSpec::ArrayType => Some(Operand::ArrayType(self.byte(pc, cursor)?)),
            OperandSpec::Imm8 => Some(Operand::Immediate(self.byte(pc, cursor)? as i8 as i32)),
            OperandSpec::Imm16 => Some(Operand::Immediate(self.short(pc, cursor)? as i16 as i32)),
            OperandSpec::Count8 => Some(Operand::Count(self.byte(pc, cursor)?)),
            OperandSpec::Zero8 => {
                let value = self.byte(pc, cursor)?;
                if value != 0 {
                    return Err(ClassError::BadBytecode {
                        pc: pc as u32,
                        detail: format!("expected zero operand byte, found 0x{value:02x}"),
                    });
                }
                None
            }
        };
        Ok(operand)
    }

    fn decode_tableswitch(
        &self,
        pc: usize,
        opcode: u8,
        mnemonic: &'static str,
    ) -> Result<(Instruction, usize)> {
        let mut cursor = self.aligned_payload_start(pc)?;
        let default = self.int(pc, &mut cursor)?;
        let low = self.int(pc, &mut cursor)?;
        let high = self.int(pc, &mut cursor)?;
        if high < low {
            return Err(ClassError::BadBytecode {
                pc: pc as u32,
                detail: format!("tableswitch range {low}..{high} is empty"),
            });
        }
        let count = (high as i64 - low as i64 + 1) as usize;
        let mut offsets = Vec::with_capacity(count);
        for _ in 0..count {
            offsets.push(self.int(pc, &mut cursor)?);
        }
        Ok((
            Instruction {
                pc: pc as u32,
                opcode,
                mnemonic,
                operands: vec![Operand::Table(TableSwitch {
                    default,
                    low,
                    high,
                    offsets,
                })],
            },
            cursor,
        ))
    }

    fn decode_lookupswitch(
        &self,
        pc: usize,
        opcode: u8,
        mnemonic: &'static str,
    ) -> Result<(Instruction, usize)> {
        let mut cursor = self.aligned_payload_start(pc)?;
        let default = self.int(pc, &mut cursor)?;
        let npairs = self.int(pc, &mut cursor)?;
        if npairs < 0 {
            return Err(ClassError::BadBytecode {
                pc: pc as u32,
                detail: format!("lookupswitch npairs {npairs} is negative"),
            });
        }
        let mut pairs = Vec::with_capacity(npairs as usize);
        for _ in 0..npairs {
            let matched = self.int(pc, &mut cursor)?;
            let offset = self.int(pc, &mut cursor)?;
            pairs.push((matched, offset));
        }
        Ok((
            Instruction {
                pc: pc as u32,
                opcode,
                mnemonic,
                operands: vec![Operand::Lookup(LookupSwitch { default, pairs })],
            },
            cursor,
        ))
    }

    fn decode_wide(&self, pc: usize) -> Result<(Instruction, usize)> {
        let mut cursor = pc + 1;
        let inner = self.byte(pc, &mut cursor)?;
        let mnemonic = op_info(inner)
            .map(|info| info.mnemonic)
            .ok_or_else(|| ClassError::BadBytecode {
                pc: pc as u32,
                detail: format!("unknown opcode 0x{inner:02x} after wide"),
            })?;
        let mut operands = vec![Operand::Local(self.short(pc, &mut cursor)?)];
        match inner {
            0x84 => {
                operands.push(Operand::Immediate(self.short(pc, &mut cursor)? as i16 as i32));
            }
            0x15..=0x19 | 0x36..=0x3a | 0xa9 => {}
            _ => {
                return Err(ClassError::BadBytecode {
                    pc: pc as u32,
                    detail: format!("opcode 0x{inner:02x} cannot be widened"),
                });
            }
        }
        Ok((
            Instruction {
                pc: pc as u32,
                opcode: inner,
                mnemonic,
                operands,
            },
            cursor,
        ))
    }

    /// First payload byte of a switch at `pc`, after 0-3 alignment bytes.
    fn aligned_payload_start(&self, pc: usize) -> Result<usize> {
        let padding = (4 - ((pc + 1) % 4)) % 4;
        for i in 0..padding {
            let mut cursor = pc + 1 + i;
            let value = self.byte(pc, &mut cursor)?;
            if value != 0 {
                return Err(ClassError::BadBytecode {
                    pc: pc as u32,
                    detail: format!("non-zero switch padding byte 0x{value:02x}"),
                });
            }
        }
        Ok(pc + 1 + padding)
    }

    fn byte(&self, pc: usize, cursor: &mut usize) -> Result<u8> {
        let value = self.code.get(*cursor).copied().ok_or_else(|| {
            ClassError::BadBytecode {
                pc: pc as u32,
                detail: "operands run past end of code".to_string(),
            }
        })?;
        *cursor += 1;
        Ok(value)
    }

    fn short(&self, pc: usize, cursor: &mut usize) -> Result<u16> {
        let high = self.byte(pc, cursor)? as u16;
        let low = self.byte(pc, cursor)? as u16;
        Ok((high << 8) | low)
    }

    fn int(&self, pc: usize, cursor: &mut usize) -> Result<i32> {
        let high = self.short(pc, cursor)? as u32;
        let low = self.short(pc, cursor)? as u32;
        Ok(((high << 16) | low) as i32)
    }
}

//! MathVM instruction set.
//!
//! # Instruction Format
//!
//! Instructions are variable length: one opcode byte followed by a fixed,
//! per-opcode operand layout. All multi-byte operands are little-endian.
//!
//! ```text
//! ┌────────┬──────────────────────────────┐
//! │ opcode │ operand (0, 2, 4 or 8 bytes) │
//! └────────┴──────────────────────────────┘
//! ```
//!
//! # Stack Discipline
//!
//! Binary instructions pop the *upper* (top-of-stack) value first and then the
//! *lower* one. `ISUB` computes `lower - upper`, `ICMP` pushes
//! `cmp(lower, upper)` and `IFICMPxx` jumps when `lower xx upper`.
//!
//! # Branch Offsets
//!
//! Branch operands are signed 16-bit offsets relative to the address right
//! after the operand, i.e. the address execution resumes at when the branch
//! is not taken.

use core::fmt;

/// Layout of the operand that follows an opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    None,
    /// Inline `i64`.
    Int,
    /// Inline `f64`.
    Double,
    /// `u16` constant pool id.
    StringId,
    /// `u16` local slot of the current frame.
    Slot,
    /// `u16` function id followed by `u16` slot.
    Context,
    /// `i16` branch offset.
    Offset,
    /// `u16` callee function id.
    Function,
}

impl OperandKind {
    /// Encoded size of the operand in bytes.
    pub const fn size(self) -> usize {
        match self {
            OperandKind::None => 0,
            OperandKind::Int | OperandKind::Double => 8,
            OperandKind::StringId | OperandKind::Slot | OperandKind::Offset | OperandKind::Function => 2,
            OperandKind::Context => 4,
        }
    }
}

macro_rules! opcodes {
    ($($variant:ident = $byte:literal, $mnemonic:literal, $kind:ident, $doc:literal;)*) => {
        /// A single MathVM opcode.
        ///
        /// `Invalid` is `0x00` so zeroed or truncated memory never decodes into
        /// a meaningful instruction.
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Opcode {
            $(
                #[doc = $doc]
                $variant = $byte,
            )*
        }

        impl Opcode {
            /// Every opcode, in encoding order.
            pub const ALL: &'static [Opcode] = &[$(Opcode::$variant),*];

            /// Canonical upper-case mnemonic.
            pub const fn name(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $mnemonic,)*
                }
            }

            pub const fn operand_kind(self) -> OperandKind {
                match self {
                    $(Opcode::$variant => OperandKind::$kind,)*
                }
            }
        }

        impl TryFrom<u8> for Opcode {
            type Error = InvalidOpcode;

            fn try_from(byte: u8) -> Result<Self, Self::Error> {
                match byte {
                    $($byte => Ok(Opcode::$variant),)*
                    other => Err(InvalidOpcode(other)),
                }
            }
        }
    };
}

opcodes! {
    // ========================================================================
    // Special
    // ========================================================================
    Invalid = 0x00, "INVALID", None, "Invalid instruction.";

    // ========================================================================
    // Literals
    // ========================================================================
    DLoad = 0x01, "DLOAD", Double, "Push inline double.";
    ILoad = 0x02, "ILOAD", Int, "Push inline int.";
    SLoad = 0x03, "SLOAD", StringId, "Push string constant by id.";
    DLoad0 = 0x04, "DLOAD0", None, "Push double 0.";
    ILoad0 = 0x05, "ILOAD0", None, "Push int 0.";
    SLoad0 = 0x06, "SLOAD0", None, "Push the empty string.";
    DLoad1 = 0x07, "DLOAD1", None, "Push double 1.";
    ILoad1 = 0x08, "ILOAD1", None, "Push int 1.";
    DLoadM1 = 0x09, "DLOADM1", None, "Push double -1.";
    ILoadM1 = 0x0A, "ILOADM1", None, "Push int -1.";

    // ========================================================================
    // Arithmetic
    // ========================================================================
    DAdd = 0x0B, "DADD", None, "[.., a, b] -> [.., a + b] (double)";
    IAdd = 0x0C, "IADD", None, "[.., a, b] -> [.., a + b] (int)";
    DSub = 0x0D, "DSUB", None, "[.., a, b] -> [.., a - b] (double)";
    ISub = 0x0E, "ISUB", None, "[.., a, b] -> [.., a - b] (int)";
    DMul = 0x0F, "DMUL", None, "[.., a, b] -> [.., a * b] (double)";
    IMul = 0x10, "IMUL", None, "[.., a, b] -> [.., a * b] (int)";
    DDiv = 0x11, "DDIV", None, "[.., a, b] -> [.., a / b] (double)";
    IDiv = 0x12, "IDIV", None, "[.., a, b] -> [.., a / b] (int, truncating)";
    IMod = 0x13, "IMOD", None, "[.., a, b] -> [.., a % b] (int)";
    DNeg = 0x14, "DNEG", None, "[.., a] -> [.., -a] (double)";
    INeg = 0x15, "INEG", None, "[.., a] -> [.., -a] (int)";

    // ========================================================================
    // Bitwise
    // ========================================================================
    IAOr = 0x16, "IAOR", None, "[.., a, b] -> [.., a | b]";
    IAAnd = 0x17, "IAAND", None, "[.., a, b] -> [.., a & b]";
    IAXor = 0x18, "IAXOR", None, "[.., a, b] -> [.., a ^ b]";

    // ========================================================================
    // Output
    // ========================================================================
    IPrint = 0x19, "IPRINT", None, "Pop and print int.";
    DPrint = 0x1A, "DPRINT", None, "Pop and print double.";
    SPrint = 0x1B, "SPRINT", None, "Pop and print string.";

    // ========================================================================
    // Conversions
    // ========================================================================
    I2D = 0x1C, "I2D", None, "Convert int on TOS to double.";
    D2I = 0x1D, "D2I", None, "Convert double on TOS to int (truncating).";
    S2I = 0x1E, "S2I", None, "Parse the leading integer of the string on TOS.";

    // ========================================================================
    // Stack
    // ========================================================================
    Swap = 0x1F, "SWAP", None, "Swap the two topmost values.";
    Pop = 0x20, "POP", None, "Remove the topmost value.";

    // ========================================================================
    // Local variables (fast path, slots 0-3)
    // ========================================================================
    LoadDVar0 = 0x21, "LOADDVAR0", None, "Push double from slot 0.";
    LoadDVar1 = 0x22, "LOADDVAR1", None, "Push double from slot 1.";
    LoadDVar2 = 0x23, "LOADDVAR2", None, "Push double from slot 2.";
    LoadDVar3 = 0x24, "LOADDVAR3", None, "Push double from slot 3.";
    LoadIVar0 = 0x25, "LOADIVAR0", None, "Push int from slot 0.";
    LoadIVar1 = 0x26, "LOADIVAR1", None, "Push int from slot 1.";
    LoadIVar2 = 0x27, "LOADIVAR2", None, "Push int from slot 2.";
    LoadIVar3 = 0x28, "LOADIVAR3", None, "Push int from slot 3.";
    LoadSVar0 = 0x29, "LOADSVAR0", None, "Push string from slot 0.";
    LoadSVar1 = 0x2A, "LOADSVAR1", None, "Push string from slot 1.";
    LoadSVar2 = 0x2B, "LOADSVAR2", None, "Push string from slot 2.";
    LoadSVar3 = 0x2C, "LOADSVAR3", None, "Push string from slot 3.";
    StoreDVar0 = 0x2D, "STOREDVAR0", None, "Pop double into slot 0.";
    StoreDVar1 = 0x2E, "STOREDVAR1", None, "Pop double into slot 1.";
    StoreDVar2 = 0x2F, "STOREDVAR2", None, "Pop double into slot 2.";
    StoreDVar3 = 0x30, "STOREDVAR3", None, "Pop double into slot 3.";
    StoreIVar0 = 0x31, "STOREIVAR0", None, "Pop int into slot 0.";
    StoreIVar1 = 0x32, "STOREIVAR1", None, "Pop int into slot 1.";
    StoreIVar2 = 0x33, "STOREIVAR2", None, "Pop int into slot 2.";
    StoreIVar3 = 0x34, "STOREIVAR3", None, "Pop int into slot 3.";
    StoreSVar0 = 0x35, "STORESVAR0", None, "Pop string into slot 0.";
    StoreSVar1 = 0x36, "STORESVAR1", None, "Pop string into slot 1.";
    StoreSVar2 = 0x37, "STORESVAR2", None, "Pop string into slot 2.";
    StoreSVar3 = 0x38, "STORESVAR3", None, "Pop string into slot 3.";

    // ========================================================================
    // Local variables (general)
    // ========================================================================
    LoadDVar = 0x39, "LOADDVAR", Slot, "Push double from slot.";
    LoadIVar = 0x3A, "LOADIVAR", Slot, "Push int from slot.";
    LoadSVar = 0x3B, "LOADSVAR", Slot, "Push string from slot.";
    StoreDVar = 0x3C, "STOREDVAR", Slot, "Pop double into slot.";
    StoreIVar = 0x3D, "STOREIVAR", Slot, "Pop int into slot.";
    StoreSVar = 0x3E, "STORESVAR", Slot, "Pop string into slot.";

    // ========================================================================
    // Context variables (most recent active frame of another function)
    // ========================================================================
    LoadCtxDVar = 0x3F, "LOADCTXDVAR", Context, "Push double from (function, slot).";
    LoadCtxIVar = 0x40, "LOADCTXIVAR", Context, "Push int from (function, slot).";
    LoadCtxSVar = 0x41, "LOADCTXSVAR", Context, "Push string from (function, slot).";
    StoreCtxDVar = 0x42, "STORECTXDVAR", Context, "Pop double into (function, slot).";
    StoreCtxIVar = 0x43, "STORECTXIVAR", Context, "Pop int into (function, slot).";
    StoreCtxSVar = 0x44, "STORECTXSVAR", Context, "Pop string into (function, slot).";

    // ========================================================================
    // Comparison
    // ========================================================================
    DCmp = 0x45, "DCMP", None, "[.., a, b] -> [.., cmp(a, b)] as -1/0/1 int (double)";
    ICmp = 0x46, "ICMP", None, "[.., a, b] -> [.., cmp(a, b)] as -1/0/1 int (int)";

    // ========================================================================
    // Control flow
    // ========================================================================
    Ja = 0x47, "JA", Offset, "Jump always.";
    IfICmpNe = 0x48, "IFICMPNE", Offset, "Pop two ints, jump if lower != upper.";
    IfICmpE = 0x49, "IFICMPE", Offset, "Pop two ints, jump if lower == upper.";
    IfICmpG = 0x4A, "IFICMPG", Offset, "Pop two ints, jump if lower > upper.";
    IfICmpGe = 0x4B, "IFICMPGE", Offset, "Pop two ints, jump if lower >= upper.";
    IfICmpL = 0x4C, "IFICMPL", Offset, "Pop two ints, jump if lower < upper.";
    IfICmpLe = 0x4D, "IFICMPLE", Offset, "Pop two ints, jump if lower <= upper.";

    // ========================================================================
    // Debugging
    // ========================================================================
    Dump = 0x4E, "DUMP", None, "Log TOS without removing it.";

    // ========================================================================
    // Calls and termination
    // ========================================================================
    Stop = 0x4F, "STOP", None, "Stop execution (entry function only).";
    Call = 0x50, "CALL", Function, "Call function by id.";
    Return = 0x51, "RETURN", None, "Return to the caller.";
    Break = 0x52, "BREAK", None, "Debugger breakpoint.";
}

impl Opcode {
    /// Total encoded length, opcode byte included.
    pub const fn length(self) -> usize {
        1 + self.operand_kind().size()
    }

    pub const fn is_branch(self) -> bool {
        matches!(self.operand_kind(), OperandKind::Offset)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded operand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    None,
    Int(i64),
    Double(f64),
    StringId(u16),
    Slot(u16),
    Context { function: u16, slot: u16 },
    Offset(i16),
    Function(u16),
}

impl Operand {
    pub const fn kind(&self) -> OperandKind {
        match self {
            Operand::None => OperandKind::None,
            Operand::Int(_) => OperandKind::Int,
            Operand::Double(_) => OperandKind::Double,
            Operand::StringId(_) => OperandKind::StringId,
            Operand::Slot(_) => OperandKind::Slot,
            Operand::Context { .. } => OperandKind::Context,
            Operand::Offset(_) => OperandKind::Offset,
            Operand::Function(_) => OperandKind::Function,
        }
    }
}

/// One instruction: an opcode together with its operand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operand: Operand,
}

impl Instruction {
    pub const fn new(opcode: Opcode, operand: Operand) -> Self {
        Self { opcode, operand }
    }

    /// An instruction without operand.
    pub const fn simple(opcode: Opcode) -> Self {
        Self {
            opcode,
            operand: Operand::None,
        }
    }

    pub const fn length(&self) -> usize {
        self.opcode.length()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        match self.operand {
            Operand::None => Ok(()),
            Operand::Int(v) => write!(f, " {}", v),
            Operand::Double(v) => write!(f, " {}", v),
            Operand::StringId(id) => write!(f, " @{}", id),
            Operand::Slot(slot) => write!(f, " {}", slot),
            Operand::Context { function, slot } => write!(f, " {}:{}", function, slot),
            Operand::Offset(offset) => write!(f, " {:+}", offset),
            Operand::Function(id) => write!(f, " #{}", id),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidOpcode(pub u8);

impl fmt::Display for InvalidOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid opcode: 0x{:02X}", self.0)
    }
}

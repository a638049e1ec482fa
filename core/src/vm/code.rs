//! Encoded instruction stream with label relocation.

use smallvec::SmallVec;
use thiserror::Error;

use super::instruction_set::{Instruction, InvalidOpcode, Opcode, Operand, OperandKind};

/// Errors raised while encoding, patching or decoding bytecode.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BytecodeError {
    #[error("unknown opcode 0x{byte:02X} at offset {offset}")]
    UnknownOpcode { offset: usize, byte: u8 },

    #[error("truncated {opcode} instruction at offset {offset}")]
    Truncated { offset: usize, opcode: Opcode },

    #[error("operand {operand:?} does not fit {opcode}")]
    OperandMismatch { opcode: Opcode, operand: Operand },

    #[error("{0} is not a branch instruction")]
    NotABranch(Opcode),

    #[error("jump distance {0} does not fit in a 16-bit offset")]
    JumpTooFar(isize),

    #[error("label is already bound")]
    LabelAlreadyBound,

    #[error("operand offset {0} is out of bounds")]
    OutOfBounds(usize),
}

/// Fixed-width little-endian operand that can be stored in a [`Bytecode`].
pub trait LeOperand: Copy {
    const SIZE: usize;

    fn write_le(self, out: &mut [u8]);

    fn read_le(bytes: &[u8]) -> Option<Self>;
}

macro_rules! le_operand {
    ($($ty:ty),*) => {
        $(
            impl LeOperand for $ty {
                const SIZE: usize = core::mem::size_of::<$ty>();

                fn write_le(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }

                fn read_le(bytes: &[u8]) -> Option<Self> {
                    let raw = bytes.get(..Self::SIZE)?;
                    raw.try_into().ok().map(<$ty>::from_le_bytes)
                }
            }
        )*
    };
}

le_operand!(u16, i16, i64, f64);

/// A deferred jump target.
///
/// An unbound label remembers every operand address that branches to it;
/// [`Bytecode::bind`] fixes its address and patches those sites.
#[derive(Debug, Default)]
pub struct Label {
    address: Option<usize>,
    relocations: SmallVec<[usize; 4]>,
}

impl Label {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn address(&self) -> Option<usize> {
        self.address
    }

    pub fn is_bound(&self) -> bool {
        self.address.is_some()
    }

    /// Branch sites still waiting for this label to be bound.
    pub fn pending_relocations(&self) -> usize {
        self.relocations.len()
    }
}

/// Owned, append-only byte stream of one function.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bytecode {
    bytes: Vec<u8>,
}

impl Bytecode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Address the next appended byte will occupy.
    pub fn current_address(&self) -> usize {
        self.bytes.len()
    }

    pub fn add_opcode(&mut self, opcode: Opcode) {
        self.bytes.push(opcode as u8);
    }

    pub fn add_operand<T: LeOperand>(&mut self, value: T) {
        let start = self.bytes.len();
        self.bytes.resize(start + T::SIZE, 0);
        value.write_le(&mut self.bytes[start..]);
    }

    pub fn set_operand<T: LeOperand>(&mut self, offset: usize, value: T) -> Result<(), BytecodeError> {
        let slot = self
            .bytes
            .get_mut(offset..offset + T::SIZE)
            .ok_or(BytecodeError::OutOfBounds(offset))?;
        value.write_le(slot);
        Ok(())
    }

    pub fn get_operand<T: LeOperand>(&self, offset: usize) -> Option<T> {
        T::read_le(self.bytes.get(offset..)?)
    }

    /// Append a complete instruction.
    pub fn encode(&mut self, instruction: &Instruction) -> Result<(), BytecodeError> {
        let Instruction { opcode, operand } = *instruction;
        if operand.kind() != opcode.operand_kind() {
            return Err(BytecodeError::OperandMismatch { opcode, operand });
        }
        self.add_opcode(opcode);
        match operand {
            Operand::None => {}
            Operand::Int(v) => self.add_operand(v),
            Operand::Double(v) => self.add_operand(v),
            Operand::StringId(v) | Operand::Slot(v) | Operand::Function(v) => self.add_operand(v),
            Operand::Context { function, slot } => {
                self.add_operand(function);
                self.add_operand(slot);
            }
            Operand::Offset(v) => self.add_operand(v),
        }
        Ok(())
    }

    /// Decode the instruction starting at `offset`, returning it with its length.
    pub fn decode_at(&self, offset: usize) -> Result<(Instruction, usize), BytecodeError> {
        let byte = *self.bytes.get(offset).ok_or(BytecodeError::OutOfBounds(offset))?;
        let opcode = Opcode::try_from(byte)
            .map_err(|InvalidOpcode(byte)| BytecodeError::UnknownOpcode { offset, byte })?;
        let at = offset + 1;
        let truncated = || BytecodeError::Truncated { offset, opcode };
        let operand = match opcode.operand_kind() {
            OperandKind::None => Operand::None,
            OperandKind::Int => Operand::Int(self.get_operand(at).ok_or_else(truncated)?),
            OperandKind::Double => Operand::Double(self.get_operand(at).ok_or_else(truncated)?),
            OperandKind::StringId => Operand::StringId(self.get_operand(at).ok_or_else(truncated)?),
            OperandKind::Slot => Operand::Slot(self.get_operand(at).ok_or_else(truncated)?),
            OperandKind::Function => Operand::Function(self.get_operand(at).ok_or_else(truncated)?),
            OperandKind::Offset => Operand::Offset(self.get_operand(at).ok_or_else(truncated)?),
            OperandKind::Context => Operand::Context {
                function: self.get_operand(at).ok_or_else(truncated)?,
                slot: self.get_operand(at + 2).ok_or_else(truncated)?,
            },
        };
        Ok((Instruction::new(opcode, operand), opcode.length()))
    }

    /// Iterate over `(address, instruction)` pairs of the whole stream.
    pub fn instructions(&self) -> Instructions<'_> {
        Instructions {
            code: self,
            offset: 0,
            failed: false,
        }
    }

    // === Labels ===

    /// Append a branch to `label`.
    ///
    /// A bound label gets its offset written immediately. Otherwise a zero
    /// placeholder is written and the site is remembered until [`Bytecode::bind`].
    pub fn add_branch(&mut self, opcode: Opcode, label: &mut Label) -> Result<(), BytecodeError> {
        if !opcode.is_branch() {
            return Err(BytecodeError::NotABranch(opcode));
        }
        self.add_opcode(opcode);
        let site = self.current_address();
        match label.address {
            Some(target) => {
                let offset = branch_offset(site, target)?;
                self.add_operand(offset);
            }
            None => {
                self.add_operand(0i16);
                label.relocations.push(site);
            }
        }
        Ok(())
    }

    /// Bind `label` to the current address and patch every pending branch.
    pub fn bind(&mut self, label: &mut Label) -> Result<(), BytecodeError> {
        if label.is_bound() {
            return Err(BytecodeError::LabelAlreadyBound);
        }
        let target = self.current_address();
        label.address = Some(target);
        for site in label.relocations.drain(..) {
            let offset = branch_offset(site, target)?;
            self.set_operand(site, offset)?;
        }
        Ok(())
    }
}

/// Offset stored at `site` so that execution continues at `target`.
fn branch_offset(site: usize, target: usize) -> Result<i16, BytecodeError> {
    let distance = target as isize - (site + 2) as isize;
    i16::try_from(distance).map_err(|_| BytecodeError::JumpTooFar(distance))
}

/// Target address of a branch whose operand lives at `site`.
pub fn branch_target(site: usize, offset: i16) -> Option<usize> {
    (site + 2).checked_add_signed(offset as isize)
}

pub struct Instructions<'a> {
    code: &'a Bytecode,
    offset: usize,
    failed: bool,
}

impl Iterator for Instructions<'_> {
    type Item = Result<(usize, Instruction), BytecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.code.len() {
            return None;
        }
        let address = self.offset;
        match self.code.decode_at(address) {
            Ok((instruction, length)) => {
                self.offset += length;
                Some(Ok((address, instruction)))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

use pretty_assertions::assert_eq;

use super::code::{branch_target, Bytecode, BytecodeError, Label};
use super::instruction_set::{Instruction, Opcode, Operand, OperandKind};

fn decode_all(code: &Bytecode) -> Vec<Instruction> {
    code.instructions()
        .map(|item| item.map(|(_, instruction)| instruction))
        .collect::<Result<_, _>>()
        .unwrap()
}

/// Check that every branch in `code` lands on `expected` addresses, in order.
fn branch_targets(code: &Bytecode) -> Vec<usize> {
    code.instructions()
        .map(Result::unwrap)
        .filter_map(|(address, instruction)| match instruction.operand {
            Operand::Offset(offset) => branch_target(address + 1, offset),
            _ => None,
        })
        .collect()
}

#[test]
fn test_encode_decode_preserves_operands() {
    let program = vec![
        Instruction::new(Opcode::ILoad, Operand::Int(-9_000_000_000)),
        Instruction::new(Opcode::DLoad, Operand::Double(0.25)),
        Instruction::new(Opcode::SLoad, Operand::StringId(3)),
        Instruction::new(Opcode::StoreIVar, Operand::Slot(300)),
        Instruction::new(Opcode::LoadCtxDVar, Operand::Context { function: 2, slot: 7 }),
        Instruction::new(Opcode::Call, Operand::Function(1)),
        Instruction::new(Opcode::IfICmpGe, Operand::Offset(-3)),
        Instruction::simple(Opcode::IAdd),
        Instruction::simple(Opcode::Stop),
    ];
    let mut code = Bytecode::new();
    for instruction in &program {
        code.encode(instruction).unwrap();
    }
    assert_eq!(code.len(), 9 + 9 + 3 + 3 + 5 + 3 + 3 + 1 + 1);
    assert_eq!(decode_all(&code), program);
}

/// An operand of `kind` whose bytes differ, so a misread offset shows up.
fn sample_operand(kind: OperandKind) -> Operand {
    match kind {
        OperandKind::None => Operand::None,
        OperandKind::Int => Operand::Int(0x0102_0304_0506_0708),
        OperandKind::Double => Operand::Double(-1.5e300),
        OperandKind::StringId => Operand::StringId(0xBEEF),
        OperandKind::Slot => Operand::Slot(0x0A0B),
        OperandKind::Context => Operand::Context { function: 0x0102, slot: 0x0304 },
        OperandKind::Offset => Operand::Offset(-0x1234),
        OperandKind::Function => Operand::Function(0x7FFF),
    }
}

#[test]
fn test_every_opcode_survives_encoding() {
    let mut stream = Bytecode::new();
    let mut expected = Vec::new();
    for &opcode in Opcode::ALL {
        let instruction = Instruction::new(opcode, sample_operand(opcode.operand_kind()));

        let mut code = Bytecode::new();
        code.encode(&instruction).unwrap();
        assert_eq!(code.len(), opcode.length(), "{}", opcode);
        assert_eq!(code.decode_at(0), Ok((instruction, opcode.length())), "{}", opcode);

        expected.push((stream.len(), instruction));
        stream.encode(&instruction).unwrap();
    }
    let decoded = stream.instructions().collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(decoded, expected);
}

#[test]
fn test_operands_are_little_endian() {
    let mut code = Bytecode::new();
    code.encode(&Instruction::new(Opcode::LoadIVar, Operand::Slot(0x1234))).unwrap();
    assert_eq!(code.as_bytes(), &[Opcode::LoadIVar as u8, 0x34, 0x12]);
    assert_eq!(code.get_operand::<u16>(1), Some(0x1234));
    code.set_operand(1, 0x0102u16).unwrap();
    assert_eq!(code.as_bytes(), &[Opcode::LoadIVar as u8, 0x02, 0x01]);
    assert_eq!(code.set_operand(2, 0u16), Err(BytecodeError::OutOfBounds(2)));
}

#[test]
fn test_encode_rejects_mismatched_operand() {
    let mut code = Bytecode::new();
    let err = code
        .encode(&Instruction::new(Opcode::IAdd, Operand::Int(1)))
        .unwrap_err();
    assert!(matches!(err, BytecodeError::OperandMismatch { opcode: Opcode::IAdd, .. }));
    assert!(code.is_empty());
}

#[test]
fn test_decode_errors() {
    let mut code = Bytecode::new();
    code.add_opcode(Opcode::ILoad);
    code.add_operand(7u16);
    assert_eq!(
        code.decode_at(0),
        Err(BytecodeError::Truncated { offset: 0, opcode: Opcode::ILoad })
    );

    let mut code = Bytecode::new();
    code.add_opcode(Opcode::Pop);
    code.add_operand(0xEEu8 as i16);
    assert_eq!(
        code.decode_at(1),
        Err(BytecodeError::UnknownOpcode { offset: 1, byte: 0xEE })
    );
    let items: Vec<_> = code.instructions().collect();
    assert_eq!(items.len(), 2);
    assert!(items[1].is_err());
}

#[test]
fn test_forward_label() {
    let mut code = Bytecode::new();
    let mut end = Label::new();
    code.add_branch(Opcode::Ja, &mut end).unwrap();
    assert_eq!(end.pending_relocations(), 1);
    code.add_opcode(Opcode::ILoad0);
    code.add_opcode(Opcode::Pop);
    code.bind(&mut end).unwrap();
    code.add_opcode(Opcode::Stop);

    assert_eq!(end.address(), Some(5));
    assert_eq!(end.pending_relocations(), 0);
    // Operand at 1, resumes at 3, target 5.
    assert_eq!(code.get_operand::<i16>(1), Some(2));
    assert_eq!(branch_targets(&code), vec![5]);
}

#[test]
fn test_backward_label() {
    let mut code = Bytecode::new();
    code.add_opcode(Opcode::ILoad0);
    let mut top = Label::new();
    code.bind(&mut top).unwrap();
    code.add_opcode(Opcode::Pop);
    code.add_branch(Opcode::Ja, &mut top).unwrap();

    assert_eq!(top.pending_relocations(), 0);
    // Operand at 3, resumes at 5, target 1.
    assert_eq!(code.get_operand::<i16>(3), Some(-4));
    assert_eq!(branch_targets(&code), vec![1]);
}

#[test]
fn test_interleaved_labels_patch_every_site() {
    let mut code = Bytecode::new();
    let mut a = Label::new();
    let mut b = Label::new();
    let mut top = Label::new();

    code.bind(&mut top).unwrap();
    code.add_branch(Opcode::IfICmpE, &mut a).unwrap();
    code.add_branch(Opcode::IfICmpNe, &mut b).unwrap();
    code.add_opcode(Opcode::ILoad1);
    code.add_branch(Opcode::Ja, &mut a).unwrap();
    code.bind(&mut b).unwrap();
    let b_address = code.current_address();
    code.add_branch(Opcode::Ja, &mut top).unwrap();
    code.add_opcode(Opcode::DLoad0);
    code.bind(&mut a).unwrap();
    let a_address = code.current_address();
    code.add_opcode(Opcode::Stop);

    assert_eq!(a.pending_relocations(), 0);
    assert_eq!(b.pending_relocations(), 0);
    assert_eq!(b.address(), Some(b_address));
    assert_eq!(branch_targets(&code), vec![a_address, b_address, a_address, 0]);
}

#[test]
fn test_binding_twice_is_an_error() {
    let mut code = Bytecode::new();
    let mut label = Label::new();
    code.bind(&mut label).unwrap();
    assert_eq!(code.bind(&mut label), Err(BytecodeError::LabelAlreadyBound));
}

#[test]
fn test_non_branch_opcode_is_rejected() {
    let mut code = Bytecode::new();
    let mut label = Label::new();
    assert_eq!(
        code.add_branch(Opcode::Call, &mut label),
        Err(BytecodeError::NotABranch(Opcode::Call))
    );
}

#[test]
fn test_jump_too_far() {
    let mut code = Bytecode::new();
    let mut end = Label::new();
    code.add_branch(Opcode::Ja, &mut end).unwrap();
    for _ in 0..(i16::MAX as usize + 1) {
        code.add_opcode(Opcode::Pop);
    }
    assert!(matches!(code.bind(&mut end), Err(BytecodeError::JumpTooFar(_))));
}

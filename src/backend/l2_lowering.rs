//! Lowering of L2 instructions onto X2. The mapping is total and stateless:
//! every L2 instruction becomes a fixed X2 sequence that depends only on the
//! instruction itself.

use crate::{
    backend::{
        assemblers::x86_64::Assembler,
        x2::{
            Register, Symbol,
            instruction::{cmp, je, jmp, mov, push, ret},
            operand::constant,
        },
    },
    middle::l2,
};

pub fn lower_instruction(assembler: &mut Assembler, instruction: &l2::Instruction) {
    match instruction {
        l2::Instruction::SetResult(value) => {
            assembler.emit(mov(constant(*value), Register::Result));
        }
        l2::Instruction::PushResult => assembler.emit(push(Register::Result)),
        l2::Instruction::Closure(name) => assembler.allocate_closure(name),
        l2::Instruction::Call => assembler.invoke(),
        l2::Instruction::Variable(depth) => assembler.read_variable(*depth),
        l2::Instruction::Set(depth) => assembler.write_variable(*depth),
        l2::Instruction::Label(name) => assembler.label(name),
        l2::Instruction::Jump(name) => assembler.emit(jmp(name)),
        l2::Instruction::JumpFalse(name) => {
            assembler.emit(cmp(constant(0), Register::Result));
            assembler.emit(je(name));
        }
    }
}

pub fn lower_sequence(assembler: &mut Assembler, instructions: &[l2::Instruction]) {
    for instruction in instructions {
        if assembler.emit_debug_info() {
            assembler.comment(strip_ansi_escapes::strip_str(instruction.to_string()));
        }

        lower_instruction(assembler, instruction);
    }
}

/// A closure body is entered by `call` and leaves with `ret`
pub fn lower_closure_body(assembler: &mut Assembler, name: &l2::Label, body: &[l2::Instruction]) {
    assembler.label(Symbol::from(name));
    lower_sequence(assembler, body);
    assembler.emit(ret());
}

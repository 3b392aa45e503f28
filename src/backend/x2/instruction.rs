//! X2 instructions and the emitters that build them. Every emitter is a pure
//! function; ordering and side effects are up to the caller.

use crate::backend::{
    targets::Target,
    x2::operand::{
        ByteRegister, Dereference, Immediate, Operands, Register, Symbol, label_reference,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Move(Operands),
    Add(Operands),
    /// Signed multiply, the destination must be a register
    Multiply {
        source: Register,
        destination: Register,
    },
    /// Sets flags from `destination - source`
    Compare(Operands),
    LoadAddress {
        symbol: Symbol,
        destination: Register,
    },
    /// Signed `destination < source` of the preceding compare
    SetLess(ByteRegister),
    ZeroExtend {
        source: ByteRegister,
        destination: Register,
    },
    Jump(Symbol),
    /// Taken when the preceding compare found its operands equal
    JumpIfEqual(Symbol),
    Push(Register),
    Pop(Register),
    /// Calls the code address held in the register
    CallIndirect(Register),
    Return,
}

pub fn mov<S, D>(source: S, destination: D) -> Instruction
where
    (S, D): Into<Operands>,
{
    Instruction::Move((source, destination).into())
}

pub fn add<S, D>(source: S, destination: D) -> Instruction
where
    (S, D): Into<Operands>,
{
    Instruction::Add((source, destination).into())
}

pub fn imul(source: Register, destination: Register) -> Instruction {
    Instruction::Multiply {
        source,
        destination,
    }
}

/// Compare `destination` against `source`. Against a constant the constant
/// is always the source, `cmp(constant(0), Register::Result)`.
pub fn cmp<S, D>(source: S, destination: D) -> Instruction
where
    (S, D): Into<Operands>,
{
    Instruction::Compare((source, destination).into())
}

pub fn lea(symbol: impl Into<Symbol>, destination: Register) -> Instruction {
    Instruction::LoadAddress {
        symbol: symbol.into(),
        destination,
    }
}

pub fn setl(destination: ByteRegister) -> Instruction {
    Instruction::SetLess(destination)
}

pub fn movzx(source: ByteRegister, destination: Register) -> Instruction {
    Instruction::ZeroExtend {
        source,
        destination,
    }
}

pub fn jmp(symbol: impl Into<Symbol>) -> Instruction {
    Instruction::Jump(symbol.into())
}

pub fn je(symbol: impl Into<Symbol>) -> Instruction {
    Instruction::JumpIfEqual(symbol.into())
}

pub fn push(register: Register) -> Instruction {
    Instruction::Push(register)
}

pub fn pop(register: Register) -> Instruction {
    Instruction::Pop(register)
}

pub fn call(register: Register) -> Instruction {
    Instruction::CallIndirect(register)
}

pub fn ret() -> Instruction {
    Instruction::Return
}

impl Instruction {
    /// AT&T syntax text of this instruction for `target`
    pub fn render(&self, target: Target) -> String {
        match self {
            Instruction::Move(operands) => format!("movq {}", render_operands(*operands)),
            Instruction::Add(operands) => format!("addq {}", render_operands(*operands)),
            Instruction::Multiply {
                source,
                destination,
            } => format!("imulq {source}, {destination}"),
            Instruction::Compare(operands) => format!("cmpq {}", render_operands(*operands)),
            Instruction::LoadAddress {
                symbol,
                destination,
            } => format!("leaq {}, {destination}", label_reference(symbol, target)),
            Instruction::SetLess(register) => format!("setl {register}"),
            Instruction::ZeroExtend {
                source,
                destination,
            } => format!("movzbq {source}, {destination}"),
            Instruction::Jump(symbol) => format!("jmp {}", symbol.mangled(target)),
            Instruction::JumpIfEqual(symbol) => format!("je {}", symbol.mangled(target)),
            Instruction::Push(register) => format!("pushq {register}"),
            Instruction::Pop(register) => format!("popq {register}"),
            Instruction::CallIndirect(register) => format!("call *{register}"),
            Instruction::Return => "ret".to_owned(),
        }
    }
}

fn render_operands(operands: Operands) -> String {
    match operands {
        Operands::RegisterToRegister {
            source,
            destination,
        } => format!("{source}, {destination}"),
        Operands::ImmediateToRegister {
            source,
            destination,
        } => format!("{source}, {destination}"),
        Operands::MemoryToRegister {
            source,
            destination,
        } => format!("{source}, {destination}"),
        Operands::RegisterToMemory {
            source,
            destination,
        } => format!("{source}, {destination}"),
        Operands::ImmediateToMemory {
            source,
            destination,
        } => format!("{source}, {destination}"),
    }
}

impl core::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.machine_register())
    }
}

impl core::fmt::Display for ByteRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.machine_register())
    }
}

impl core::fmt::Display for Immediate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${}", self.0)
    }
}

impl core::fmt::Display for Dereference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.displacement() {
            0 => write!(f, "({})", self.base),
            displacement => write!(f, "{displacement}({})", self.base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::x2::operand::{constant, dereference};

    const LINUX: Target = Target::x86_64LinuxGnu;

    #[test]
    fn moves_render_source_first() {
        assert_eq!(mov(constant(488), Register::Result).render(LINUX), "movq $488, %rdi");
        assert_eq!(
            mov(dereference(Register::Temp, 1), Register::Result).render(LINUX),
            "movq 8(%rax), %rdi"
        );
        assert_eq!(
            mov(Register::Env, dereference(Register::Next, 0)).render(LINUX),
            "movq %rdx, (%rsi)"
        );
        assert_eq!(
            mov(constant(-1), dereference(Register::Next, 1)).render(LINUX),
            "movq $-1, 8(%rsi)"
        );
    }

    #[test]
    fn compare_against_zero_puts_the_constant_first() {
        assert_eq!(cmp(constant(0), Register::Result).render(LINUX), "cmpq $0, %rdi");
        assert_eq!(
            cmp(Register::Result, Register::Temp).render(LINUX),
            "cmpq %rdi, %rax"
        );
    }

    #[test]
    fn arithmetic_and_stack_operations() {
        assert_eq!(add(constant(16), Register::Next).render(LINUX), "addq $16, %rsi");
        assert_eq!(imul(Register::Temp, Register::Result).render(LINUX), "imulq %rax, %rdi");
        assert_eq!(push(Register::Env).render(LINUX), "pushq %rdx");
        assert_eq!(pop(Register::Temp).render(LINUX), "popq %rax");
        assert_eq!(call(Register::Temp).render(LINUX), "call *%rax");
        assert_eq!(ret().render(LINUX), "ret");
        assert_eq!(
            mov(Register::StackPointer, Register::Result).render(LINUX),
            "movq %rsp, %rdi"
        );
    }

    #[test]
    fn comparison_byte_is_set_and_widened() {
        assert_eq!(setl(ByteRegister::ComparisonResult).render(LINUX), "setl %al");
        assert_eq!(
            movzx(ByteRegister::ComparisonResult, Register::Result).render(LINUX),
            "movzbq %al, %rdi"
        );
    }

    #[test]
    fn symbols_are_mangled_for_every_use() {
        let darwin = Target::x86_64AppleDarwin;

        assert_eq!(jmp("loop").render(darwin), "jmp _loop");
        assert_eq!(je("done").render(darwin), "je _done");
        assert_eq!(
            lea("lambda_0", Register::Temp).render(darwin),
            "leaq _lambda_0(%rip), %rax"
        );
        assert_eq!(lea("lambda_0", Register::Temp).render(LINUX), "leaq lambda_0(%rip), %rax");
    }
}

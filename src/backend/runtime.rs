//! Builtin closures written directly in X2.
//!
//! Two argument builtins are curried the same way the front end curries user
//! lambdas: the maker is called with the first argument and returns a closure
//! over the worker, and the worker combines its captured argument (depth 1)
//! with its own argument (depth 0).
//!
//! `call_ec` calls its argument with an escape continuation. The continuation
//! is nothing but the stack pointer at the time `call_ec` was entered;
//! invoking it resets the stack pointer and returns, which lands on the
//! return address of `call_ec`'s own call into `f`. Any heap writes made in
//! between stay where they are.

use once_cell::sync::Lazy;

use crate::backend::{
    assemblers::x86_64::Assembler,
    x2::{
        ByteRegister, Line, Register,
        instruction::{add, cmp, imul, mov, movzx, pop, push, ret, setl},
    },
};

pub const ADD: &str = "add";
pub const MULTIPLY: &str = "multiply";
pub const LESS_THAN: &str = "less_than";
pub const CALL_EC: &str = "call_ec";
const MAKE_EC: &str = "make_ec";
const EC: &str = "ec";

const ADD_WORKER: &str = "add_curried";
const MULTIPLY_WORKER: &str = "multiply_curried";
const LESS_THAN_WORKER: &str = "less_than_curried";

/// Every symbol the runtime library defines
pub const RUNTIME_SYMBOLS: &[&str] = &[
    ADD,
    ADD_WORKER,
    MULTIPLY,
    MULTIPLY_WORKER,
    LESS_THAN,
    LESS_THAN_WORKER,
    CALL_EC,
    MAKE_EC,
    EC,
];

/// The library is the same for every program and target; symbols are only
/// mangled when the listing is rendered
pub static RUNTIME_LIBRARY: Lazy<Vec<Line>> = Lazy::new(|| {
    let mut assembler = Assembler::new(false);

    emit_binary_builtin(&mut assembler, ADD, ADD_WORKER, |a| {
        a.emit(add(Register::Temp, Register::Result));
    });

    emit_binary_builtin(&mut assembler, MULTIPLY, MULTIPLY_WORKER, |a| {
        a.emit(imul(Register::Temp, Register::Result));
    });

    emit_binary_builtin(&mut assembler, LESS_THAN, LESS_THAN_WORKER, |a| {
        // Temp holds the captured operand, Result the argument
        a.emit(cmp(Register::Result, Register::Temp));
        a.emit(setl(ByteRegister::ComparisonResult));
        a.emit(movzx(ByteRegister::ComparisonResult, Register::Result));
    });

    emit_escape_continuation(&mut assembler);

    assembler.into_listing().lines
});

fn emit_binary_builtin(
    assembler: &mut Assembler,
    maker: &str,
    worker: &str,
    combine: impl FnOnce(&mut Assembler),
) {
    assembler.comment(format!("{maker}: curried, first operand captured by {worker}"));
    assembler.label(maker);
    assembler.allocate_closure(worker);
    assembler.emit(ret());

    assembler.label(worker);
    assembler.read_variable(1);
    assembler.emit(push(Register::Result));
    assembler.read_variable(0);
    assembler.emit(pop(Register::Temp));
    combine(assembler);
    assembler.emit(ret());
}

fn emit_escape_continuation(assembler: &mut Assembler) {
    assembler.comment(format!("{CALL_EC}: call f with an escape continuation"));
    assembler.label(CALL_EC);
    assembler.read_variable(0);
    assembler.emit(push(Register::Result));
    assembler.allocate_closure(MAKE_EC);
    assembler.emit(push(Register::Result));
    assembler.emit(mov(Register::StackPointer, Register::Result));
    // make_ec(saved stack pointer) gives the continuation, then f(continuation)
    assembler.invoke();
    assembler.invoke();
    assembler.emit(ret());

    assembler.label(MAKE_EC);
    assembler.allocate_closure(EC);
    assembler.emit(ret());

    assembler.label(EC);
    assembler.read_variable(1);
    assembler.emit(mov(Register::Result, Register::StackPointer));
    assembler.read_variable(0);
    assembler.emit(ret());
}

//! Heap representation of closures and environments.
//!
//! A closure is two consecutive heap cells, the entry point of its code and
//! the environment it captured:
//!
//! ```text
//! closure:  [ code address | captured env ]
//! frame:    [ parent frame | bound value  ]
//! ```
//!
//! Calling a closure pushes a fresh frame whose parent is the captured
//! environment and whose value is the call argument, so a variable `n`
//! scopes out is found by following `n` parent links from `Env`. Nothing is
//! ever freed; `Next` only grows.

use crate::backend::{
    assemblers::x86_64::Assembler,
    x2::{
        Register, Symbol,
        instruction::{add, call, lea, mov, pop, push},
        operand::{CELL_SIZE, constant, dereference},
    },
};

/// Cells taken by one closure or one environment frame
pub const PAIR_CELLS: i64 = 2;

impl Assembler {
    /// Allocates a closure over `code` capturing the current environment and
    /// leaves its address in `Result`. `Env` is untouched.
    pub fn allocate_closure(&mut self, code: impl Into<Symbol>) {
        self.emit(lea(code, Register::Temp));
        self.emit(mov(Register::Temp, dereference(Register::Next, 0)));
        self.emit(mov(Register::Env, dereference(Register::Next, 1)));
        self.emit(mov(Register::Next, Register::Result));
        self.bump_heap_pointer();
    }

    /// Calls the closure on top of the stack with the argument in `Result`.
    /// On return `Env` is restored, `Result` holds the callee's value and the
    /// heap has grown by the callee's frame.
    pub fn invoke(&mut self) {
        self.emit(pop(Register::Temp));
        self.emit(push(Register::Env));

        // Env is saved, reuse it to carry the captured environment over
        self.emit(mov(dereference(Register::Temp, 1), Register::Env));
        self.emit(mov(Register::Env, dereference(Register::Next, 0)));
        self.emit(mov(Register::Result, dereference(Register::Next, 1)));
        self.emit(mov(Register::Next, Register::Env));
        self.bump_heap_pointer();

        self.emit(mov(dereference(Register::Temp, 0), Register::Temp));
        self.emit(call(Register::Temp));
        self.emit(pop(Register::Env));
    }

    /// Loads the variable bound `depth` scopes out into `Result`
    pub fn read_variable(&mut self, depth: usize) {
        self.walk_environment(depth);
        self.emit(mov(dereference(Register::Temp, 1), Register::Result));
    }

    /// Stores `Result` into the variable bound `depth` scopes out
    pub fn write_variable(&mut self, depth: usize) {
        self.walk_environment(depth);
        self.emit(mov(Register::Result, dereference(Register::Temp, 1)));
    }

    /// Leaves the frame `depth` links up the chain in `Temp`
    fn walk_environment(&mut self, depth: usize) {
        self.emit(mov(Register::Env, Register::Temp));

        for _ in 0..depth {
            self.emit(mov(dereference(Register::Temp, 0), Register::Temp));
        }
    }

    fn bump_heap_pointer(&mut self) {
        self.emit(add(constant(PAIR_CELLS * CELL_SIZE), Register::Next));
    }
}

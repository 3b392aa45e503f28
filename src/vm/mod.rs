//! An interpreter for X2 listings. It executes the typed instructions of a
//! [`Listing`] exactly as the target machine would: a flat address space with
//! the reserved heap, a downward growing stack and code addresses that can
//! be stored in memory and called through.
//!
//! Raw epilogue lines are opaque and skipped; the value a run produces is the
//! `Result` register when the entry point returns.

use hashbrown::HashMap;

use crate::backend::{
    targets::x86_64::ENTRY_POINT,
    x2::{
        ByteRegister, CELL_SIZE, Directive, Instruction, Line, Listing, Register,
        instruction::Instruction as I,
        operand::{Dereference, Operands},
    },
};

pub mod error;

pub use error::MachineError;

const CODE_BASE: u64 = 0x0040_0000;
const DATA_BASE: u64 = 0x1000_0000;
const STACK_TOP: u64 = 0x7fff_0000_0000;
/// Returning to this address ends the run
const HALT_ADDRESS: u64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineConfig {
    pub max_steps: u64,
    pub stack_size: u64,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            max_steps: 50_000_000,
            stack_size: 8 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub result: i64,
    pub steps: u64,
    /// Bytes between the start of the heap and `Next`
    pub heap_used: u64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Flags {
    zero: bool,
    less: bool,
}

#[derive(Debug, Clone, Copy)]
struct Region {
    start: u64,
    end: u64,
}

impl Region {
    fn contains(self, address: u64) -> bool {
        (self.start..self.end).contains(&address)
    }
}

#[derive(Debug)]
pub struct Machine {
    code: Vec<Instruction>,
    code_labels: HashMap<String, usize>,
    data_labels: HashMap<String, u64>,
    registers: [i64; 5],
    flags: Flags,
    memory: HashMap<u64, i64>,
    heap: Region,
    stack: Region,
    pc: usize,
    steps: u64,
    config: MachineConfig,
}

impl Machine {
    pub fn load(listing: &Listing, config: MachineConfig) -> Result<Self, MachineError> {
        let mut code = Vec::new();
        let mut code_labels = HashMap::new();
        let mut data_labels = HashMap::new();
        let mut data_end = DATA_BASE;
        let mut heap = None;
        let mut raw_lines = 0;

        let stack = Region {
            start: STACK_TOP.saturating_sub(config.stack_size),
            end: STACK_TOP,
        };

        for line in &listing.lines {
            match line {
                Line::Instruction(instruction) => code.push(instruction.clone()),
                Line::Label(symbol) => {
                    if code_labels.insert(symbol.name().to_owned(), code.len()).is_some() {
                        return Err(MachineError::DuplicateSymbol(symbol.name().to_owned()));
                    }
                }
                Line::Directive(Directive::ReserveZeroed { symbol, size }) => {
                    let start = data_end;
                    let end = start
                        .checked_add(*size as u64)
                        .filter(|end| *end <= stack.start)
                        .ok_or(MachineError::HeapTooLarge { size: *size as u64 })?;
                    data_end = align_up(end, 32);

                    if data_labels.insert(symbol.name().to_owned(), start).is_some() {
                        return Err(MachineError::DuplicateSymbol(symbol.name().to_owned()));
                    }

                    heap.get_or_insert(Region { start, end });
                }
                Line::Directive(Directive::Global(_) | Directive::Text) | Line::Comment(_) => {}
                Line::Raw(_) => raw_lines += 1,
            }
        }

        if raw_lines > 0 {
            tracing::warn!(raw_lines, "raw lines are not executed by the simulator");
        }

        let heap = heap.unwrap_or(Region {
            start: DATA_BASE,
            end: DATA_BASE,
        });

        tracing::debug!(
            instructions = code.len(),
            heap_bytes = heap.end - heap.start,
            "loaded listing into simulator"
        );

        Ok(Self {
            code,
            code_labels,
            data_labels,
            registers: [0; 5],
            flags: Flags::default(),
            memory: HashMap::new(),
            heap,
            stack,
            pc: 0,
            steps: 0,
            config,
        })
    }

    /// Calls the entry point and runs until it returns
    pub fn run(&mut self) -> Result<Outcome, MachineError> {
        let _span = tracing::info_span!("simulate").entered();

        self.pc = self.code_index(ENTRY_POINT)?;
        self.set_register(Register::StackPointer, STACK_TOP as i64);
        self.push(HALT_ADDRESS as i64)?;

        loop {
            if self.steps >= self.config.max_steps {
                return Err(MachineError::StepLimitExceeded(self.config.max_steps));
            }
            self.steps += 1;

            let instruction = self.code.get(self.pc).cloned().ok_or(MachineError::FellOffEnd)?;
            self.pc += 1;

            if !self.execute(&instruction)? {
                break;
            }
        }

        let outcome = Outcome {
            result: self.register(Register::Result),
            steps: self.steps,
            heap_used: (self.register(Register::Next) as u64).saturating_sub(self.heap.start),
        };

        tracing::debug!(?outcome, "simulation finished");

        Ok(outcome)
    }

    pub fn register(&self, register: Register) -> i64 {
        self.registers[register_index(register)]
    }

    pub fn heap_start(&self) -> u64 {
        self.heap.start
    }

    /// The `index`th heap cell, zero if never written
    pub fn heap_cell(&self, index: u64) -> Result<i64, MachineError> {
        self.read(
            self.heap
                .start
                .wrapping_add(index.wrapping_mul(CELL_SIZE as u64)),
        )
    }

    /// Returns false once the entry point has returned
    fn execute(&mut self, instruction: &Instruction) -> Result<bool, MachineError> {
        match instruction {
            I::Move(operands) => {
                let (source, destination) = self.operands(*operands)?;
                self.write_location(destination, source)?;
            }
            I::Add(operands) => {
                let (source, destination) = self.operands(*operands)?;
                let (value, overflow) = self.read_location(destination)?.overflowing_add(source);
                self.flags = Flags {
                    zero: value == 0,
                    less: (value < 0) != overflow,
                };
                self.write_location(destination, value)?;
            }
            I::Multiply {
                source,
                destination,
            } => {
                let value = self.register(*destination).wrapping_mul(self.register(*source));
                self.set_register(*destination, value);
            }
            I::Compare(operands) => {
                let (source, destination) = self.operands(*operands)?;
                let destination = self.read_location(destination)?;
                self.flags = Flags {
                    zero: destination == source,
                    less: destination < source,
                };
            }
            I::LoadAddress {
                symbol,
                destination,
            } => {
                let address = self.address_of(symbol.name())?;
                self.set_register(*destination, address as i64);
            }
            I::SetLess(ByteRegister::ComparisonResult) => {
                let low = i64::from(self.flags.less);
                let temp = self.register(Register::Temp);
                self.set_register(Register::Temp, (temp & !0xff) | low);
            }
            I::ZeroExtend {
                source: ByteRegister::ComparisonResult,
                destination,
            } => {
                let low = self.register(Register::Temp) & 0xff;
                self.set_register(*destination, low);
            }
            I::Jump(symbol) => self.pc = self.code_index(symbol.name())?,
            I::JumpIfEqual(symbol) => {
                if self.flags.zero {
                    self.pc = self.code_index(symbol.name())?;
                }
            }
            I::Push(register) => self.push(self.register(*register))?,
            I::Pop(register) => {
                let value = self.pop()?;
                self.set_register(*register, value);
            }
            I::CallIndirect(register) => {
                let target = self.decode_code_address(self.register(*register) as u64)?;
                self.push(self.encode_code_address(self.pc) as i64)?;
                self.pc = target;
            }
            I::Return => {
                let address = self.pop()? as u64;

                if address == HALT_ADDRESS {
                    return Ok(false);
                }

                self.pc = self.decode_code_address(address)?;
            }
        }

        Ok(true)
    }

    fn set_register(&mut self, register: Register, value: i64) {
        self.registers[register_index(register)] = value;
    }

    /// Source value and destination location of a two operand instruction
    fn operands(&self, operands: Operands) -> Result<(i64, Location), MachineError> {
        Ok(match operands {
            Operands::RegisterToRegister {
                source,
                destination,
            } => (self.register(source), Location::Register(destination)),
            Operands::ImmediateToRegister {
                source,
                destination,
            } => (source.0, Location::Register(destination)),
            Operands::MemoryToRegister {
                source,
                destination,
            } => (
                self.read(self.effective_address(source))?,
                Location::Register(destination),
            ),
            Operands::RegisterToMemory {
                source,
                destination,
            } => (
                self.register(source),
                Location::Memory(self.effective_address(destination)),
            ),
            Operands::ImmediateToMemory {
                source,
                destination,
            } => (source.0, Location::Memory(self.effective_address(destination))),
        })
    }

    fn effective_address(&self, dereference: Dereference) -> u64 {
        (self.register(dereference.base) as u64).wrapping_add(dereference.displacement() as u64)
    }

    fn read_location(&self, location: Location) -> Result<i64, MachineError> {
        match location {
            Location::Register(register) => Ok(self.register(register)),
            Location::Memory(address) => self.read(address),
        }
    }

    fn write_location(&mut self, location: Location, value: i64) -> Result<(), MachineError> {
        match location {
            Location::Register(register) => {
                self.set_register(register, value);
                Ok(())
            }
            Location::Memory(address) => self.write(address, value),
        }
    }

    fn check_address(&self, address: u64) -> Result<(), MachineError> {
        if address % CELL_SIZE as u64 != 0 {
            return Err(MachineError::Misaligned { address });
        }

        if !self.heap.contains(address) && !self.stack.contains(address) {
            return Err(MachineError::OutOfBounds { address });
        }

        Ok(())
    }

    fn read(&self, address: u64) -> Result<i64, MachineError> {
        self.check_address(address)?;
        Ok(self.memory.get(&address).copied().unwrap_or(0))
    }

    fn write(&mut self, address: u64, value: i64) -> Result<(), MachineError> {
        self.check_address(address)?;
        self.memory.insert(address, value);
        Ok(())
    }

    fn push(&mut self, value: i64) -> Result<(), MachineError> {
        let stack_pointer =
            (self.register(Register::StackPointer) as u64).wrapping_sub(CELL_SIZE as u64);
        self.write(stack_pointer, value)?;
        self.set_register(Register::StackPointer, stack_pointer as i64);
        Ok(())
    }

    fn pop(&mut self) -> Result<i64, MachineError> {
        let stack_pointer = self.register(Register::StackPointer) as u64;
        let value = self.read(stack_pointer)?;
        self.set_register(
            Register::StackPointer,
            stack_pointer.wrapping_add(CELL_SIZE as u64) as i64,
        );
        Ok(value)
    }

    fn code_index(&self, name: &str) -> Result<usize, MachineError> {
        match self.code_labels.get(name) {
            Some(index) => Ok(*index),
            None if self.data_labels.contains_key(name) => {
                Err(MachineError::NotCode(name.to_owned()))
            }
            None => Err(MachineError::UndefinedSymbol(name.to_owned())),
        }
    }

    fn address_of(&self, name: &str) -> Result<u64, MachineError> {
        if let Some(index) = self.code_labels.get(name) {
            return Ok(self.encode_code_address(*index));
        }

        self.data_labels
            .get(name)
            .copied()
            .ok_or_else(|| MachineError::UndefinedSymbol(name.to_owned()))
    }

    fn encode_code_address(&self, index: usize) -> u64 {
        CODE_BASE + index as u64
    }

    fn decode_code_address(&self, address: u64) -> Result<usize, MachineError> {
        address
            .checked_sub(CODE_BASE)
            .map(|index| index as usize)
            .filter(|index| *index < self.code.len())
            .ok_or(MachineError::InvalidCodeAddress { address })
    }
}

#[derive(Debug, Clone, Copy)]
enum Location {
    Register(Register),
    Memory(u64),
}

fn register_index(register: Register) -> usize {
    match register {
        Register::Temp => 0,
        Register::Result => 1,
        Register::Next => 2,
        Register::Env => 3,
        Register::StackPointer => 4,
    }
}

fn align_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{
        assemblers::x86_64::Assembler,
        x2::{
            Symbol,
            instruction::{add, call, cmp, je, jmp, lea, mov, pop, push, ret},
            operand::{constant, dereference},
        },
    };

    fn run(build: impl FnOnce(&mut Assembler)) -> Result<Outcome, MachineError> {
        let mut assembler = Assembler::new(false);
        assembler.label(ENTRY_POINT);
        assembler.emit(lea("heap", Register::Next));
        build(&mut assembler);
        assembler.emit(ret());
        assembler.directive(Directive::ReserveZeroed {
            symbol: Symbol::from("heap"),
            size: 4096,
        });

        Machine::load(&assembler.into_listing(), MachineConfig::default())?.run()
    }

    #[test]
    fn moves_and_adds_through_memory() {
        let outcome = run(|a| {
            a.emit(mov(constant(40), dereference(Register::Next, 3)));
            a.emit(add(constant(2), dereference(Register::Next, 3)));
            a.emit(mov(dereference(Register::Next, 3), Register::Result));
        })
        .unwrap();

        assert_eq!(outcome.result, 42);
        assert_eq!(outcome.heap_used, 0);
    }

    #[test]
    fn stack_is_last_in_first_out() {
        let outcome = run(|a| {
            a.emit(mov(constant(1), Register::Result));
            a.emit(push(Register::Result));
            a.emit(mov(constant(2), Register::Result));
            a.emit(push(Register::Result));
            a.emit(pop(Register::Result));
            a.emit(pop(Register::Temp));
        })
        .unwrap();

        assert_eq!(outcome.result, 2);
    }

    #[test]
    fn conditional_jump_follows_the_last_compare() {
        let outcome = run(|a| {
            a.emit(mov(constant(0), Register::Result));
            a.emit(cmp(constant(0), Register::Result));
            a.emit(je("taken"));
            a.emit(mov(constant(7), Register::Result));
            a.label("taken");
            a.emit(add(constant(1), Register::Result));
        })
        .unwrap();

        assert_eq!(outcome.result, 1);
    }

    #[test]
    fn indirect_call_returns_to_the_caller() {
        let outcome = run(|a| {
            a.emit(lea("callee", Register::Temp));
            a.emit(call(Register::Temp));
            a.emit(add(constant(1), Register::Result));
            a.emit(jmp("done"));
            a.label("callee");
            a.emit(mov(constant(10), Register::Result));
            a.emit(ret());
            a.label("done");
        })
        .unwrap();

        assert_eq!(outcome.result, 11);
    }

    #[test]
    fn faults_are_reported_not_panicked() {
        assert_eq!(
            run(|a| a.emit(jmp("missing"))),
            Err(MachineError::UndefinedSymbol("missing".to_owned()))
        );
        assert_eq!(
            run(|a| a.emit(jmp("heap"))),
            Err(MachineError::NotCode("heap".to_owned()))
        );
        assert!(matches!(
            run(|a| a.emit(mov(dereference(Register::Result, 0), Register::Temp))),
            Err(MachineError::OutOfBounds { address: 0 })
        ));
        assert!(matches!(
            run(|a| a.emit(call(Register::Result))),
            Err(MachineError::InvalidCodeAddress { address: 0 })
        ));
    }

    #[test]
    fn heap_that_does_not_fit_below_the_stack_is_rejected() {
        let load = |size: usize| {
            let mut assembler = Assembler::new(false);
            assembler.label(ENTRY_POINT);
            assembler.emit(ret());
            assembler.directive(Directive::ReserveZeroed {
                symbol: Symbol::from("heap"),
                size,
            });

            Machine::load(&assembler.into_listing(), MachineConfig::default()).map(|_| ())
        };

        assert_eq!(
            load(usize::MAX),
            Err(MachineError::HeapTooLarge {
                size: usize::MAX as u64
            })
        );
        assert_eq!(
            load((STACK_TOP - DATA_BASE) as usize),
            Err(MachineError::HeapTooLarge {
                size: STACK_TOP - DATA_BASE
            })
        );
        assert_eq!(load(4096), Ok(()));
    }

    #[test]
    fn infinite_loops_hit_the_step_limit() {
        let mut assembler = Assembler::new(false);
        assembler.label(ENTRY_POINT);
        assembler.emit(jmp(ENTRY_POINT));

        let config = MachineConfig {
            max_steps: 1000,
            ..MachineConfig::default()
        };

        assert_eq!(
            Machine::load(&assembler.into_listing(), config).unwrap().run(),
            Err(MachineError::StepLimitExceeded(1000))
        );
    }
}

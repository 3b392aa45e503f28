use itertools::Itertools;

use crate::backend::{
    targets::Target,
    x2::{
        instruction::Instruction,
        operand::{Symbol, label_definition},
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Instruction(Instruction),
    Label(Symbol),
    Directive(Directive),
    Comment(String),
    /// Caller supplied text, emitted verbatim and opaque to the simulator
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Global(Symbol),
    Text,
    /// A zero filled block of `size` bytes in bss
    ReserveZeroed { symbol: Symbol, size: usize },
}

/// A complete translation unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub lines: Vec<Line>,
}

impl Listing {
    pub fn render(&self, target: Target) -> String {
        let mut output = self.lines.iter().map(|line| line.render(target)).join("\n");
        output.push('\n');
        output
    }

    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.lines.iter().filter_map(|line| match line {
            Line::Instruction(instruction) => Some(instruction),
            _ => None,
        })
    }
}

impl Line {
    pub fn render(&self, target: Target) -> String {
        match self {
            Line::Instruction(instruction) => format!("    {}", instruction.render(target)),
            Line::Label(symbol) => label_definition(symbol, target),
            Line::Directive(directive) => format!("    {}", directive.render(target)),
            Line::Comment(text) => format!("    # {text}"),
            Line::Raw(text) => format!("    {text}"),
        }
    }
}

impl Directive {
    pub fn render(&self, target: Target) -> String {
        match self {
            Directive::Global(symbol) => format!(".globl {}", symbol.mangled(target)),
            Directive::Text => ".text".to_owned(),
            Directive::ReserveZeroed { symbol, size } => format!(
                ".lcomm {}, {size}, {}",
                symbol.mangled(target),
                target.heap_alignment()
            ),
        }
    }
}

use crate::backend::x2::{ByteRegister, Directive, Instruction, Line, Listing, Register, Symbol};

/// Collects the lines of a listing in emission order
#[derive(Debug, Default)]
pub struct Assembler {
    lines: Vec<Line>,
    emit_debug_info: bool,
}

impl Assembler {
    pub fn new(emit_debug_info: bool) -> Self {
        Self {
            lines: Vec::new(),
            emit_debug_info,
        }
    }

    pub fn emit_debug_info(&self) -> bool {
        self.emit_debug_info
    }

    pub fn into_listing(self) -> Listing {
        Listing { lines: self.lines }
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    fn push_line(&mut self, line: Line) {
        self.lines.push(line);
    }

    pub fn emit(&mut self, instruction: Instruction) {
        self.push_line(Line::Instruction(instruction));
    }

    pub fn extend(&mut self, lines: impl IntoIterator<Item = Line>) {
        self.lines.extend(lines);
    }

    pub fn directive(&mut self, directive: Directive) {
        self.push_line(Line::Directive(directive));
    }

    pub fn global_label(&mut self, symbol: impl Into<Symbol>) {
        let symbol = symbol.into();
        self.directive(Directive::Global(symbol.clone()));
        self.label(symbol);
    }

    pub fn label(&mut self, symbol: impl Into<Symbol>) {
        self.push_line(Line::Label(symbol.into()));
    }

    pub fn comment(&mut self, comment: impl AsRef<str>) {
        self.push_line(Line::Comment(comment.as_ref().to_owned()));
    }

    pub fn raw(&mut self, text: impl AsRef<str>) {
        self.push_line(Line::Raw(text.as_ref().to_owned()));
    }
}

impl Register {
    /// All roles live in caller saved registers so the entry point can be
    /// called from C without a save/restore prologue
    pub fn machine_register(self) -> X86FullRegister {
        match self {
            Register::Temp => X86FullRegister::Rax,
            Register::Result => X86FullRegister::Rdi,
            Register::Next => X86FullRegister::Rsi,
            Register::Env => X86FullRegister::Rdx,
            Register::StackPointer => X86FullRegister::Rsp,
        }
    }
}

impl ByteRegister {
    pub fn machine_register(self) -> X86ByteRegister {
        match self {
            ByteRegister::ComparisonResult => X86FullRegister::Rax.as_8_bit(),
        }
    }
}

/// The general purpose registers the roles are assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum X86FullRegister {
    Rax,
    Rdx,
    Rsi,
    Rdi,
    Rsp,
}

impl X86FullRegister {
    pub fn as_8_bit(self) -> X86ByteRegister {
        match self {
            Self::Rax => X86ByteRegister::Al,
            Self::Rdx => X86ByteRegister::Dl,
            Self::Rsi => X86ByteRegister::Sil,
            Self::Rdi => X86ByteRegister::Dil,
            Self::Rsp => X86ByteRegister::Spl,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum X86ByteRegister {
    Al,
    Dl,
    Sil,
    Dil,
    Spl,
}

use crate::{
    backend::{CodegenOptions, x2::Listing},
    middle::l2,
};

pub mod x86_64;

pub trait CodeGenerator {
    fn assemble(&self, program: &l2::Program, options: &CodegenOptions) -> Listing;

    fn translate_to_asm(&self, program: &l2::Program, options: &CodegenOptions) -> String {
        self.assemble(program, options).render(options.target)
    }
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Target {
    #[default]
    #[value(name = "x86_64-linux-gnu")]
    x86_64LinuxGnu,
    #[value(name = "x86_64-apple-darwin")]
    x86_64AppleDarwin,
}

impl Target {
    pub fn get_code_generator(self) -> impl CodeGenerator {
        match self {
            Target::x86_64LinuxGnu | Target::x86_64AppleDarwin => x86_64::CodeGeneratorX86_64,
        }
    }

    /// Mach-O symbols carry a leading underscore
    pub fn mangles_symbols(self) -> bool {
        matches!(self, Target::x86_64AppleDarwin)
    }

    /// Alignment operand of `.lcomm`. Mach-O takes it as a power of two, ELF
    /// in bytes.
    pub fn heap_alignment(self) -> usize {
        match self {
            Target::x86_64LinuxGnu => 32,
            Target::x86_64AppleDarwin => 4,
        }
    }
}

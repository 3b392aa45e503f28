use crate::{
    backend::{
        CodegenOptions, Epilogue,
        assemblers::x86_64::Assembler,
        l2_lowering::{lower_closure_body, lower_sequence},
        runtime::RUNTIME_LIBRARY,
        targets::CodeGenerator,
        x2::{
            Directive, Listing, Register, Symbol,
            instruction::{lea, mov, ret},
        },
    },
    middle::l2,
};

pub const ENTRY_POINT: &str = "main";
pub const HEAP: &str = "heap";

pub struct CodeGeneratorX86_64;

impl CodeGenerator for CodeGeneratorX86_64 {
    fn assemble(&self, program: &l2::Program, options: &CodegenOptions) -> Listing {
        let _span = tracing::info_span!("assemble", target = ?options.target).entered();

        let mut assembler = Assembler::new(options.emit_debug_info);

        assembler.directive(Directive::Global(Symbol::from(ENTRY_POINT)));
        assembler.directive(Directive::Text);

        assembler.comment("runtime library");
        assembler.extend(RUNTIME_LIBRARY.iter().cloned());

        for (name, body) in &program.closures {
            tracing::trace!(closure = %name, instructions = body.len(), "lowering closure body");
            lower_closure_body(&mut assembler, name, body);
        }

        assembler.comment("program entrypoint");
        assembler.label(ENTRY_POINT);
        assembler.emit(lea(HEAP, Register::Next));
        lower_sequence(&mut assembler, &program.main);

        match &options.epilogue {
            // Temp doubles as the platform return value register
            Epilogue::ReturnResult => assembler.emit(mov(Register::Result, Register::Temp)),
            Epilogue::Custom(lines) => lines.iter().for_each(|line| assembler.raw(line)),
        }
        assembler.emit(ret());

        assembler.directive(Directive::ReserveZeroed {
            symbol: Symbol::from(HEAP),
            size: options.heap_size,
        });

        let listing = assembler.into_listing();

        tracing::debug!(
            lines = listing.lines.len(),
            instructions = listing.instructions().count(),
            "assembled program"
        );

        listing
    }
}

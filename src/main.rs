use std::{path::PathBuf, process::exit};

use clap::{CommandFactory, Parser as ClapParser, Subcommand, error::ErrorKind};
use colored::Colorize;
use l2c::{
    Error,
    backend::{CodegenOptions, DEFAULT_HEAP_SIZE, Epilogue, Target},
    middle::l2::pretty_print::pretty_print_program,
    vm::MachineConfig,
};
use tracing_subscriber::{
    EnvFilter, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

#[derive(Debug, ClapParser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Log debug events to stderr; `RUST_LOG` takes precedence
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Lower an L2 program to assembly
    Compile {
        source_file: PathBuf,

        /// Write the listing here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t)]
        target: Target,

        /// Bytes reserved for the heap
        #[arg(long, default_value_t = DEFAULT_HEAP_SIZE)]
        heap_size: usize,

        /// Replace the default epilogue with these lines, in order
        #[arg(long = "epilogue", value_name = "LINE")]
        epilogue: Vec<String>,

        /// Annotate the listing with the L2 instruction each block came from
        #[arg(long)]
        debug_info: bool,

        /// Skip checking labels before lowering
        #[arg(long)]
        no_validate: bool,
    },
    /// Lower an L2 program and execute it in the simulator
    Run {
        source_file: PathBuf,

        #[arg(long, default_value_t = DEFAULT_HEAP_SIZE)]
        heap_size: usize,

        #[arg(long, default_value_t = MachineConfig::default().max_steps)]
        max_steps: u64,
    },
    /// Print an L2 program
    Print { source_file: PathBuf },
}

impl Command {
    fn source_file(&self) -> &PathBuf {
        match self {
            Command::Compile { source_file, .. }
            | Command::Run { source_file, .. }
            | Command::Print { source_file } => source_file,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let args = Args::parse();

    init_tracing(args.verbose);

    let source_file = args.command.source_file();

    if !source_file.exists() {
        Args::command()
            .error(
                ErrorKind::InvalidValue,
                format!("Source file '{}' does not exist!", source_file.display()),
            )
            .exit()
    }

    if !source_file.is_file() {
        Args::command()
            .error(
                ErrorKind::InvalidValue,
                format!("Input path '{}' is not a file!", source_file.display()),
            )
            .exit()
    }

    if let Command::Compile { heap_size: 0, .. } | Command::Run { heap_size: 0, .. } =
        args.command
    {
        Args::command()
            .error(ErrorKind::InvalidValue, "Heap size must be at least one byte!")
            .exit()
    }

    if let Err(error) = execute(args.command) {
        eprintln!("{} {error}", "error:".red().bold());
        exit(1);
    }
}

fn execute(command: Command) -> Result<(), Error> {
    match command {
        Command::Compile {
            source_file,
            output,
            target,
            heap_size,
            epilogue,
            debug_info,
            no_validate,
        } => {
            let program = l2c::read_program(&source_file)?;

            let options = CodegenOptions {
                target,
                heap_size,
                epilogue: if epilogue.is_empty() {
                    Epilogue::ReturnResult
                } else {
                    Epilogue::Custom(epilogue)
                },
                emit_debug_info: debug_info,
            };

            let listing = l2c::compile(&program, &options, !no_validate)?;

            match output {
                Some(path) => {
                    std::fs::write(&path, listing).map_err(|source| Error::Write { path, source })?
                }
                None => print!("{listing}"),
            }
        }
        Command::Run {
            source_file,
            heap_size,
            max_steps,
        } => {
            let program = l2c::read_program(&source_file)?;

            let options = CodegenOptions {
                heap_size,
                ..CodegenOptions::default()
            };
            let config = MachineConfig {
                max_steps,
                ..MachineConfig::default()
            };

            let outcome = l2c::run(&program, &options, config)?;

            tracing::info!(
                steps = outcome.steps,
                heap_used = outcome.heap_used,
                "program finished"
            );

            println!("{}", outcome.result);
        }
        Command::Print { source_file } => {
            pretty_print_program(&l2c::read_program(&source_file)?);
        }
    }

    Ok(())
}

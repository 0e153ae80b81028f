use std::path::PathBuf;

use clap::{CommandFactory, Parser as ClapParser, error::ErrorKind};
use colored::Colorize;
use l3c::{
    driver,
    error::{CompileError, CompileResult},
    frontend::SourceFile,
};

#[derive(Debug, ClapParser)]
#[command(version, about = "Compiles L3 to L2", long_about = None)]
pub struct Args {
    /// L3 source file to compile
    source_file: PathBuf,

    /// Where to write the L2 program
    #[arg(short, long, default_value = driver::DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Print the program with hygienic labels as L3 instead of compiling it
    #[arg(long)]
    emit_l3: bool,
}

fn main() {
    env_logger::init();

    let args = Args::parse();

    if !args.source_file.exists() {
        Args::command()
            .error(
                ErrorKind::InvalidValue,
                format!("Source file '{}' does not exist!", args.source_file.display()),
            )
            .exit()
    }

    if !args.source_file.is_file() {
        Args::command()
            .error(
                ErrorKind::InvalidValue,
                format!("Input path '{}' is not a file!", args.source_file.display()),
            )
            .exit()
    }

    let source = match driver::read_source(&args.source_file) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("{}: {error}", "error".red().bold());
            std::process::exit(1);
        }
    };

    if let Err(error) = run(&args, &source) {
        report(&error, &source);
        std::process::exit(1);
    }
}

fn run(args: &Args, source: &SourceFile) -> CompileResult<()> {
    if args.emit_l3 {
        print!("{}", driver::hygienic_source(source)?);
        return Ok(());
    }

    let output = driver::compile_source(source)?;

    driver::write_output(&args.output, &output)
}

fn report(error: &CompileError, source: &SourceFile) {
    match error {
        CompileError::Parse(error) => {
            eprintln!("{}: {error}", "error".red().bold());
            eprintln!(
                "{} {}",
                "-->".blue().bold(),
                source.format_span_position(error.span)
            );
            eprintln!("{}", source.highlight_span(error.span));
        }
        CompileError::Internal(error) => {
            eprintln!("{}: {error}", "internal compiler error".red().bold());

            #[cfg(feature = "error-backtrace")]
            eprintln!(
                "{}:\n{}",
                "backtrace".blue(),
                std::backtrace::Backtrace::force_capture()
            );
        }
        CompileError::Io(error) => {
            eprintln!("{}: {error}", "error".red().bold());
        }
    }
}

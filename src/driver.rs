//! Runs the passes in order: parse, label hygiene, instruction selection and
//! emission.

use std::path::Path;

use crate::{
    backend::{emit, names::ReturnLabelGenerator},
    error::CompileResult,
    frontend::{SourceFile, SourceFileOrigin, ast::Program, parser::Parser},
    middle::hygiene,
};

/// Where the compiled program goes unless told otherwise
pub const DEFAULT_OUTPUT: &str = "prog.L2";

/// Compiles a parsed program to L2 text.
///
/// Labels are renamed in place first, so on success `program` is left in its
/// hygienic form.
pub fn compile_program(program: &mut Program) -> CompileResult<String> {
    let root = hygiene::make_labels_hygienic(program);

    let mut names = ReturnLabelGenerator::new(root);
    let output = emit::emit_program(program, &mut names)?;

    log::debug!(
        "compiled {} function(s) with {} call site(s)",
        program.functions.len(),
        names.issued()
    );

    Ok(output)
}

pub fn compile_source(source: &SourceFile) -> CompileResult<String> {
    let mut program = Parser::parse_program(source)?;

    compile_program(&mut program)
}

/// Parses and renames labels, then prints the program back as L3
pub fn hygienic_source(source: &SourceFile) -> CompileResult<String> {
    let mut program = Parser::parse_program(source)?;
    hygiene::make_labels_hygienic(&mut program);

    Ok(program.to_string())
}

pub fn read_source(path: &Path) -> CompileResult<SourceFile> {
    let contents = std::fs::read_to_string(path)?;

    Ok(SourceFile {
        contents,
        origin: SourceFileOrigin::File(path.to_owned()),
    })
}

pub fn write_output(path: &Path, output: &str) -> CompileResult<()> {
    std::fs::write(path, output)?;

    log::debug!("wrote {} byte(s) to {}", output.len(), path.display());

    Ok(())
}

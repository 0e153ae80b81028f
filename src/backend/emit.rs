//! Assembles tiles into L2 functions and programs.

use itertools::Itertools;

use super::{
    names::NameGenerator,
    registers::{ARG_REGS, Register, incoming_stack_argument_offset},
    selection::InstructionSelector,
    tiles::Tile,
};
use crate::{
    error::InternalError,
    frontend::ast::{Function, Program},
};

/// Label of the L2 entry point
pub const ENTRY_POINT: &str = ":main";

/// A tiled function, ready to print as L2
pub struct L2Function<'ast> {
    function: &'ast Function,
    tiles: Vec<Tile<'ast>>,
}

impl<'ast> L2Function<'ast> {
    pub fn new(function: &'ast Function, tiles: Vec<Tile<'ast>>) -> Self {
        Self { function, tiles }
    }

    /// Parameters passed on the stack
    pub fn spill_count(&self) -> usize {
        self.function.parameters.len().saturating_sub(ARG_REGS.len())
    }
}

impl core::fmt::Display for L2Function<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parameters = &self.function.parameters;

        writeln!(f, "({}", self.function.name)?;
        writeln!(f, "{} {}", parameters.len(), self.spill_count())?;

        for (i, parameter) in parameters.iter().enumerate() {
            match ARG_REGS.get(i) {
                Some(register) => writeln!(f, "({parameter} <- {register})")?,
                None => writeln!(
                    f,
                    "({parameter} <- (mem {} {}))",
                    Register::Rsp,
                    incoming_stack_argument_offset(i, parameters.len())
                )?,
            }
        }

        write!(f, "{})", self.tiles.iter().join("\n"))
    }
}

/// Tiles one function and renders it as L2
pub fn emit_function(
    function: &Function,
    names: &mut impl NameGenerator,
) -> Result<String, InternalError> {
    log::debug!("tiling {}", function.name);

    let tiles = InstructionSelector::new(names).tile_function(function)?;

    Ok(L2Function::new(function, tiles).to_string())
}

/// Tiles every function and wraps them in an L2 program entered at `:main`.
///
/// One generator serves the whole program so that no two call sites share a
/// return label.
pub fn emit_program(
    program: &Program,
    names: &mut impl NameGenerator,
) -> Result<String, InternalError> {
    let mut output = format!("({ENTRY_POINT}\n\n");

    for function in &program.functions {
        output.push_str(&emit_function(function, &mut *names)?);
        output.push('\n');
    }

    output.push_str(")\n");

    Ok(output)
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;
    use crate::{
        backend::names::ReturnLabelGenerator,
        frontend::ast::{AstBuilder, BinaryOperatorKind},
    };

    #[test]
    fn function_header_and_register_parameters() {
        let mut ast = AstBuilder::new();
        let (a, b, c) = (ast.var("a"), ast.var("b"), ast.var("c"));
        let sum = ast.binop(BinaryOperatorKind::Plus, a.clone(), b.clone());
        let body = vec![ast.assign(c.clone(), sum), ast.ret(Some(c.into()))];
        let name = ast.label(":add");
        let function = ast.function(name, vec![a, b], body);

        let mut names = ReturnLabelGenerator::new("z");

        assert_eq!(
            emit_function(&function, &mut names).unwrap(),
            indoc! {"
                (:add
                2 0
                (a <- rdi)
                (b <- rsi)
                (c <- a)
                (c += b)

                (rax <- c)
                (return)
                )"}
        );
    }

    #[test]
    fn parameters_past_the_sixth_come_from_the_stack() {
        let mut ast = AstBuilder::new();
        let parameters = ["p0", "p1", "p2", "p3", "p4", "p5", "p6", "p7"].map(|name| ast.var(name));
        let body = vec![ast.ret(None)];
        let name = ast.label(":wide");
        let function = ast.function(name, parameters.to_vec(), body);

        let tiled = L2Function::new(&function, vec![]);
        assert_eq!(tiled.spill_count(), 2);

        let mut names = ReturnLabelGenerator::new("z");

        assert_eq!(
            emit_function(&function, &mut names).unwrap(),
            indoc! {"
                (:wide
                8 2
                (p0 <- rdi)
                (p1 <- rsi)
                (p2 <- rdx)
                (p3 <- rcx)
                (p4 <- r8)
                (p5 <- r9)
                (p6 <- (mem rsp 16))
                (p7 <- (mem rsp 8))
                (return)
                )"}
        );
    }

    #[test]
    fn program_wrapper() {
        let mut ast = AstBuilder::new();
        let body = vec![ast.ret(None)];
        let name = ast.label(":main");
        let main = ast.function(name, vec![], body);
        let empty_name = ast.label(":empty");
        let empty = ast.function(empty_name, vec![], vec![]);

        let program = Program {
            functions: vec![main, empty],
        };
        let mut names = ReturnLabelGenerator::new("z");

        assert_eq!(
            emit_program(&program, &mut names).unwrap(),
            "(:main\n\n(:main\n0 0\n(return)\n)\n(:empty\n0 0\n)\n)\n"
        );
    }
}

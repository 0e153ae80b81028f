//! Maximal munch instruction selection.
//!
//! L3 is already close to three address form, so each instruction is covered
//! by exactly one tile. Patterns are tried in a fixed order and the first
//! whose shape matches wins; there is no backtracking.
//!
//! | # | Instruction shape                   | Tile               |
//! |---|-------------------------------------|--------------------|
//! | 1 | `var <- var / label / number`       | [`AtomAssignment`] |
//! | 2 | `var <- load var`                   | [`LoadAssignment`] |
//! | 3 | `var <- t op t`                     | [`BinopAssignment`]|
//! | 4 | `var <- call ...`                   | [`CallAssignment`] |
//! | 5 | `store var <- var / label / number` | [`StoreAssignment`]|
//! | 6 | `br :l`                             | [`Goto`]           |
//! | 7 | `br var :t :f`                      | [`Cjump`]          |
//! | 8 | `call ...`                          | [`CallTile`]       |
//! | 9 | `return t`                          | [`ValReturn`]      |
//! | 10| `return`                            | [`VoidReturn`]     |
//! | 11| `:label`                            | [`LabelTile`]      |
//!
//! Anything else is an [`InternalError::UnmatchedInstruction`].

use hashbrown::HashSet;

use super::{
    names::NameGenerator,
    tiles::{
        AtomAssignment, BinopAssignment, CallAssignment, CallTile, Cjump, Goto, LabelTile,
        LoadAssignment, StoreAssignment, Tile, ValReturn, VoidReturn,
    },
};
use crate::{
    error::InternalError,
    frontend::ast::{
        Assignment, AssignmentTarget, Atom, Binop, Call, Expression, Function, Instruction, Label,
        Load, NodeId, RuntimeFunction, Store, Var,
        visit::{self, Visitor},
    },
};

/// Tiles instructions one at a time.
///
/// Nodes covered by a tile are recorded in a side table owned by the
/// selector, and an instruction whose node is already in it is skipped. Keep
/// one selector per function; return labels come from the generator, which
/// should be shared by every selector of a program.
pub struct InstructionSelector<'g, G: NameGenerator> {
    names: &'g mut G,
    consumed: HashSet<NodeId>,
}

impl<'g, G: NameGenerator> InstructionSelector<'g, G> {
    pub fn new(names: &'g mut G) -> Self {
        Self {
            names,
            consumed: HashSet::new(),
        }
    }

    /// Whether a node has already been covered by some tile
    pub fn is_consumed(&self, id: NodeId) -> bool {
        self.consumed.contains(&id)
    }

    /// Picks the tile for one instruction.
    ///
    /// Returns `None` if the instruction was already covered.
    pub fn select<'ast>(
        &mut self,
        instruction: &'ast Instruction,
    ) -> Result<Option<Tile<'ast>>, InternalError> {
        if self.is_consumed(instruction.id()) {
            log::trace!("skipping already tiled `{instruction}`");
            return Ok(None);
        }

        let tile = match instruction {
            Instruction::Assignment(Assignment {
                lhs: AssignmentTarget::Var(lhs),
                rhs,
                ..
            }) => match rhs {
                Expression::Atom(Atom::Var(_) | Atom::Label(_) | Atom::IntLiteral(_)) => {
                    Tile::AtomAssignment(AtomAssignment::new(lhs, rhs)?)
                }
                Expression::Load(_) => Tile::LoadAssignment(LoadAssignment::new(lhs, rhs)?),
                Expression::Binop(_) => Tile::BinopAssignment(BinopAssignment::new(lhs, rhs)?),
                Expression::Call(_) => Tile::CallAssignment(CallAssignment::new(
                    lhs,
                    rhs,
                    self.names.fresh_label(),
                )?),
                Expression::Atom(Atom::RuntimeFunction(_)) => return Err(unmatched(instruction)),
            },
            Instruction::Assignment(Assignment {
                lhs: lhs @ AssignmentTarget::Store(_),
                rhs: rhs @ Expression::Atom(Atom::Var(_) | Atom::Label(_) | Atom::IntLiteral(_)),
                ..
            }) => Tile::StoreAssignment(StoreAssignment::new(lhs, rhs)?),
            Instruction::Goto(goto) => Tile::Goto(Goto::new(goto)),
            Instruction::Cjump(cjump) => Tile::Cjump(Cjump::new(cjump)),
            Instruction::Call(call) => Tile::Call(CallTile::new(call, self.names.fresh_label())?),
            Instruction::ValReturn(ret) => Tile::ValReturn(ValReturn::new(ret)?),
            Instruction::VoidReturn(_) => Tile::VoidReturn(VoidReturn),
            Instruction::Label(label) => Tile::Label(LabelTile::new(label)),
            Instruction::Assignment(_) => return Err(unmatched(instruction)),
        };

        log::trace!("{} tile for `{instruction}`", tile.name());

        self.consume(instruction);

        Ok(Some(tile))
    }

    /// Tiles a function body in source order
    pub fn tile_function<'ast>(
        &mut self,
        function: &'ast Function,
    ) -> Result<Vec<Tile<'ast>>, InternalError> {
        let mut tiles = Vec::with_capacity(function.instructions.len());

        for instruction in &function.instructions {
            if let Some(tile) = self.select(instruction)? {
                tiles.push(tile);
            }
        }

        Ok(tiles)
    }

    /// Records the instruction and every node below it
    fn consume(&mut self, instruction: &Instruction) {
        struct Collector<'s>(&'s mut HashSet<NodeId>);

        impl<'ast> Visitor<'ast> for Collector<'_> {
            fn visit_instruction(&mut self, instruction: &'ast Instruction) {
                self.0.insert(instruction.id());
                visit::walk_instruction(self, instruction);
            }

            fn visit_expression(&mut self, expression: &'ast Expression) {
                self.0.insert(expression.id());
                visit::walk_expression(self, expression);
            }

            fn visit_binop(&mut self, binop: &'ast Binop) {
                self.0.insert(binop.id);
                visit::walk_binop(self, binop);
            }

            fn visit_load(&mut self, load: &'ast Load) {
                self.0.insert(load.id);
                self.visit_var(&load.address);
            }

            fn visit_store(&mut self, store: &'ast Store) {
                self.0.insert(store.id);
                self.visit_var(&store.address);
            }

            fn visit_call(&mut self, call: &'ast Call) {
                self.0.insert(call.id);
                visit::walk_call(self, call);
            }

            fn visit_atom(&mut self, atom: &'ast Atom) {
                self.0.insert(atom.id());
                visit::walk_atom(self, atom);
            }

            fn visit_var(&mut self, var: &'ast Var) {
                self.0.insert(var.id);
            }

            fn visit_label(&mut self, label: &'ast Label) {
                self.0.insert(label.id);
            }

            fn visit_runtime_function(&mut self, function: &'ast RuntimeFunction) {
                self.0.insert(function.id);
            }
        }

        Collector(&mut self.consumed).visit_instruction(instruction);
    }
}

fn unmatched(instruction: &Instruction) -> InternalError {
    InternalError::UnmatchedInstruction {
        instruction: instruction.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::names::ReturnLabelGenerator,
        frontend::ast::{AstBuilder, BinaryOperatorKind, RuntimeFunctionKind},
    };

    /// Always hands out the same label
    struct Stub;

    impl NameGenerator for Stub {
        fn fresh_label(&mut self) -> String {
            ":rett".into()
        }
    }

    fn tile_text(instruction: &Instruction) -> Result<String, InternalError> {
        let mut names = Stub;
        let mut selector = InstructionSelector::new(&mut names);

        Ok(selector
            .select(instruction)?
            .map(|tile| tile.to_string())
            .unwrap_or_default())
    }

    #[test]
    fn atom_assignment() {
        let mut ast = AstBuilder::new();
        let (hi_mom, mork) = (ast.var("hi_mom"), ast.var("mork"));
        let instruction = ast.assign(hi_mom, mork);

        assert_eq!(tile_text(&instruction).unwrap(), "(hi_mom <- mork)");
    }

    #[test]
    fn binop_assignments() {
        let mut ast = AstBuilder::new();

        let (lhs, six, no) = (ast.var("sad_face"), ast.int(6), ast.var("no"));
        let plus = ast.binop(BinaryOperatorKind::Plus, six, no);
        let instruction = ast.assign(lhs, plus);
        assert_eq!(
            tile_text(&instruction).unwrap(),
            "(sad_face <- 6)\n(sad_face += no)\n"
        );

        let (lhs, six, no) = (ast.var("sad_face"), ast.int(6), ast.var("no"));
        let less = ast.binop(BinaryOperatorKind::Le, six, no);
        let instruction = ast.assign(lhs, less);
        assert_eq!(tile_text(&instruction).unwrap(), "(sad_face <- 6 < no)\n");

        for operator in [BinaryOperatorKind::Ge, BinaryOperatorKind::Geq] {
            let (lhs, six, no) = (ast.var("sad_face"), ast.int(6), ast.var("no"));
            let binop = ast.binop(operator, six, no);
            let instruction = ast.assign(lhs, binop);

            assert!(matches!(
                tile_text(&instruction),
                Err(InternalError::DisallowedComparison { .. })
            ));
        }
    }

    #[test]
    fn every_instruction_shape_has_a_tile() {
        let mut ast = AstBuilder::new();
        let (x, p) = (ast.var("x"), ast.var("p"));
        let load = ast.load(p.clone());
        let store = ast.store(p);
        let label = ast.label(":here");
        let callee = ast.label(":f");
        let call = ast.call(callee, vec![x.clone().into()]);
        let print = ast.runtime(RuntimeFunctionKind::Print);
        let print_call = ast.call(print, vec![x.clone().into()]);
        let one = ast.int(1);
        let (t, f) = (ast.label(":t"), ast.label(":f"));

        let cases = [
            (ast.assign(x.clone(), load), "(x <- (mem p 0))"),
            (ast.assign(store, x.clone()), "((mem p 0) <- x)"),
            (
                ast.assign(x.clone(), call),
                "(rdi <- x)\n((mem rsp -8) <- :rett)\n(call :f 1)\n:rett\n(x <- rax)\n",
            ),
            (
                Instruction::Call(print_call),
                "(rdi <- x)\n((mem rsp -8) <- :rett)\n(call print 1)\n:rett\n",
            ),
            (ast.goto(label.clone()), "(goto :here)"),
            (ast.cjump(x.clone(), t, f), "(cjump x = 1 :t :f)\n"),
            (ast.ret(Some(one.into())), "(rax <- 1)\n(return)\n"),
            (ast.ret(None), "(return)\n"),
            (Instruction::Label(label), ":here"),
        ];

        for (instruction, expected) in cases {
            assert_eq!(tile_text(&instruction).unwrap(), expected, "{instruction}");
        }
    }

    #[test]
    fn shapes_without_a_tile_are_internal_errors() {
        let mut ast = AstBuilder::new();

        let x = ast.var("x");
        let print = ast.runtime(RuntimeFunctionKind::Print);
        let runtime_value = ast.assign(x, print);

        let (p, a, b) = (ast.var("p"), ast.var("a"), ast.var("b"));
        let store = ast.store(p);
        let sum = ast.binop(BinaryOperatorKind::Plus, a, b);
        let store_binop = ast.assign(store, sum);

        let (p, q) = (ast.var("p"), ast.var("q"));
        let store = ast.store(p);
        let load = ast.load(q);
        let store_load = ast.assign(store, load);

        for (instruction, rendered) in [
            (runtime_value, "x <- print"),
            (store_binop, "store p <- a + b"),
            (store_load, "store p <- load q"),
        ] {
            assert_eq!(
                tile_text(&instruction),
                Err(InternalError::UnmatchedInstruction {
                    instruction: rendered.into()
                })
            );
        }
    }

    #[test]
    fn covered_nodes_are_consumed_and_never_tiled_again() {
        let mut ast = AstBuilder::new();
        let (x, a, b) = (ast.var("x"), ast.var("a"), ast.var("b"));
        let binop = ast.binop(BinaryOperatorKind::Minus, a.clone(), b.clone());
        let binop_id = binop.id;
        let instruction = ast.assign(x.clone(), binop);

        let mut names = Stub;
        let mut selector = InstructionSelector::new(&mut names);

        assert!(!selector.is_consumed(instruction.id()));
        assert!(selector.select(&instruction).unwrap().is_some());

        for id in [instruction.id(), x.id, binop_id, a.id, b.id] {
            assert!(selector.is_consumed(id));
        }

        assert_eq!(selector.select(&instruction), Ok(None));
    }

    #[test]
    fn return_labels_are_unique_across_functions() {
        let mut ast = AstBuilder::new();
        let callee = ast.label(":f");
        let first = ast.call(callee.clone(), vec![]);
        let second = ast.call(callee.clone(), vec![]);
        let third = ast.call(callee, vec![]);
        let main_name = ast.label(":main");
        let other_name = ast.label(":other");
        let main = ast.function(
            main_name,
            vec![],
            vec![Instruction::Call(first), Instruction::Call(second)],
        );
        let other = ast.function(other_name, vec![], vec![Instruction::Call(third)]);

        let mut names = ReturnLabelGenerator::new("z");

        let mut labels = Vec::new();
        for function in [&main, &other] {
            let mut selector = InstructionSelector::new(&mut names);

            for tile in selector.tile_function(function).unwrap() {
                let Tile::Call(call) = &tile else {
                    panic!("expected a call tile, found {tile}");
                };
                labels.push(call.return_label().to_owned());
            }
        }

        assert_eq!(labels, [":z_ret0", ":z_ret1", ":z_ret2"]);
        assert_eq!(names.issued(), 3);
    }
}

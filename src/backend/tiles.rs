//! The L2 tile catalogue.
//!
//! One struct per tile. Constructors check the operand shapes a tile can
//! cover and refuse anything else with an [`InternalError`], so an ill-formed
//! tile never exists. Emitting a tile is its [`Display`](core::fmt::Display)
//! impl; operands are rendered with the L3 printer.

use crate::{
    backend::registers::{
        ARG_REGS, RETURN_ADDRESS_OFFSET, RETURN_REG, Register, outgoing_stack_argument_offset,
    },
    error::InternalError,
    frontend::ast::{
        self, AssignmentTarget, Atom, BinaryOperatorKind, Binop, Call, Expression, Label, Var,
    },
};

type TileResult<T> = Result<T, InternalError>;

fn malformed(tile: &'static str, construct: impl ToString, reason: &'static str) -> InternalError {
    InternalError::MalformedTile {
        tile,
        construct: construct.to_string(),
        reason,
    }
}

/// Rejects runtime function references in value positions
fn value_atom(tile: &'static str, atom: &Atom) -> TileResult<()> {
    match atom {
        Atom::RuntimeFunction(_) => Err(malformed(
            tile,
            atom,
            "runtime functions can only be called",
        )),
        _ => Ok(()),
    }
}

/// Any tile the selector can produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tile<'ast> {
    AtomAssignment(AtomAssignment<'ast>),
    LoadAssignment(LoadAssignment<'ast>),
    BinopAssignment(BinopAssignment<'ast>),
    CallAssignment(CallAssignment<'ast>),
    StoreAssignment(StoreAssignment<'ast>),
    Goto(Goto<'ast>),
    Cjump(Cjump<'ast>),
    Call(CallTile<'ast>),
    ValReturn(ValReturn<'ast>),
    VoidReturn(VoidReturn),
    Label(LabelTile<'ast>),
}

impl Tile<'_> {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Tile::AtomAssignment(_) => AtomAssignment::NAME,
            Tile::LoadAssignment(_) => LoadAssignment::NAME,
            Tile::BinopAssignment(_) => BinopAssignment::NAME,
            Tile::CallAssignment(_) => CallAssignment::NAME,
            Tile::StoreAssignment(_) => StoreAssignment::NAME,
            Tile::Goto(_) => "goto",
            Tile::Cjump(_) => "cjump",
            Tile::Call(_) => CallTile::NAME,
            Tile::ValReturn(_) => ValReturn::NAME,
            Tile::VoidReturn(_) => "void-return",
            Tile::Label(_) => "label",
        }
    }
}

impl core::fmt::Display for Tile<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tile::AtomAssignment(tile) => write!(f, "{tile}"),
            Tile::LoadAssignment(tile) => write!(f, "{tile}"),
            Tile::BinopAssignment(tile) => write!(f, "{tile}"),
            Tile::CallAssignment(tile) => write!(f, "{tile}"),
            Tile::StoreAssignment(tile) => write!(f, "{tile}"),
            Tile::Goto(tile) => write!(f, "{tile}"),
            Tile::Cjump(tile) => write!(f, "{tile}"),
            Tile::Call(tile) => write!(f, "{tile}"),
            Tile::ValReturn(tile) => write!(f, "{tile}"),
            Tile::VoidReturn(tile) => write!(f, "{tile}"),
            Tile::Label(tile) => write!(f, "{tile}"),
        }
    }
}

/// `x <- atom`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomAssignment<'ast> {
    lhs: &'ast Var,
    rhs: &'ast Atom,
}

impl<'ast> AtomAssignment<'ast> {
    const NAME: &'static str = "atom-assignment";

    pub fn new(lhs: &'ast Var, rhs: &'ast Expression) -> TileResult<Self> {
        let Expression::Atom(rhs) = rhs else {
            return Err(malformed(Self::NAME, rhs, "right hand side is not an atom"));
        };
        value_atom(Self::NAME, rhs)?;

        Ok(Self { lhs, rhs })
    }
}

impl core::fmt::Display for AtomAssignment<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} <- {})", self.lhs, self.rhs)
    }
}

/// `x <- load y`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadAssignment<'ast> {
    lhs: &'ast Var,
    address: &'ast Var,
}

impl<'ast> LoadAssignment<'ast> {
    const NAME: &'static str = "load-assignment";

    pub fn new(lhs: &'ast Var, rhs: &'ast Expression) -> TileResult<Self> {
        let Expression::Load(load) = rhs else {
            return Err(malformed(Self::NAME, rhs, "right hand side is not a load"));
        };

        Ok(Self {
            lhs,
            address: &load.address,
        })
    }
}

impl core::fmt::Display for LoadAssignment<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} <- (mem {} 0))", self.lhs, self.address)
    }
}

/// `x <- a op b`
///
/// L2 has no three operand arithmetic, so arithmetic copies the left operand
/// into `x` and accumulates into it. Comparisons do exist in three operand
/// form, but only `<`, `<=` and `=`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinopAssignment<'ast> {
    lhs: &'ast Var,
    binop: &'ast Binop,
}

impl<'ast> BinopAssignment<'ast> {
    const NAME: &'static str = "binop-assignment";

    pub fn new(lhs: &'ast Var, rhs: &'ast Expression) -> TileResult<Self> {
        let Expression::Binop(binop) = rhs else {
            return Err(malformed(Self::NAME, rhs, "right hand side is not a binop"));
        };

        if matches!(
            binop.operator,
            BinaryOperatorKind::Ge | BinaryOperatorKind::Geq
        ) {
            return Err(InternalError::DisallowedComparison {
                operator: binop.operator.symbol(),
                construct: binop.to_string(),
            });
        }

        for operand in [&binop.lhs, &binop.rhs] {
            value_atom(Self::NAME, operand)?;

            if let Atom::Label(_) = operand {
                return Err(malformed(
                    Self::NAME,
                    binop,
                    "labels cannot be binop operands",
                ));
            }
        }

        Ok(Self { lhs, binop })
    }
}

impl core::fmt::Display for BinopAssignment<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Binop {
            operator, lhs, rhs, ..
        } = self.binop;

        if operator.is_comparison() {
            writeln!(f, "({} <- {lhs} {operator} {rhs})", self.lhs)
        } else {
            writeln!(f, "({} <- {lhs})", self.lhs)?;
            writeln!(f, "({} {operator}= {rhs})", self.lhs)
        }
    }
}

/// A call sequence: argument moves, the return label store, the call and the
/// return point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallTile<'ast> {
    call: &'ast Call,
    return_label: String,
}

impl<'ast> CallTile<'ast> {
    const NAME: &'static str = "call";

    /// `return_label` must not be used by any other call site
    pub fn new(call: &'ast Call, return_label: String) -> TileResult<Self> {
        for argument in &call.arguments {
            value_atom(Self::NAME, argument)?;
        }

        if !return_label.starts_with(Label::SENTINEL) {
            return Err(malformed(
                Self::NAME,
                call,
                "return label is missing its leading `:`",
            ));
        }

        Ok(Self { call, return_label })
    }

    pub fn return_label(&self) -> &str {
        &self.return_label
    }
}

impl core::fmt::Display for CallTile<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, argument) in self.call.arguments.iter().enumerate() {
            match ARG_REGS.get(i) {
                Some(register) => writeln!(f, "({register} <- {argument})")?,
                None => writeln!(
                    f,
                    "((mem {} {}) <- {argument})",
                    Register::Rsp,
                    outgoing_stack_argument_offset(i)
                )?,
            }
        }

        writeln!(
            f,
            "((mem {} {RETURN_ADDRESS_OFFSET}) <- {})",
            Register::Rsp,
            self.return_label
        )?;
        writeln!(
            f,
            "(call {} {})",
            self.call.callee,
            self.call.arguments.len()
        )?;
        writeln!(f, "{}", self.return_label)
    }
}

/// `x <- call f(...)`: the call sequence, then a copy out of `rax`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallAssignment<'ast> {
    lhs: &'ast Var,
    call: CallTile<'ast>,
}

impl<'ast> CallAssignment<'ast> {
    const NAME: &'static str = "call-assignment";

    pub fn new(lhs: &'ast Var, rhs: &'ast Expression, return_label: String) -> TileResult<Self> {
        let Expression::Call(call) = rhs else {
            return Err(malformed(Self::NAME, rhs, "right hand side is not a call"));
        };

        Ok(Self {
            lhs,
            call: CallTile::new(call, return_label)?,
        })
    }
}

impl core::fmt::Display for CallAssignment<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.call)?;
        writeln!(f, "({} <- {RETURN_REG})", self.lhs)
    }
}

/// `store x <- atom`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreAssignment<'ast> {
    address: &'ast Var,
    rhs: &'ast Atom,
}

impl<'ast> StoreAssignment<'ast> {
    const NAME: &'static str = "store-assignment";

    pub fn new(lhs: &'ast AssignmentTarget, rhs: &'ast Expression) -> TileResult<Self> {
        let AssignmentTarget::Store(store) = lhs else {
            return Err(malformed(Self::NAME, lhs, "left hand side is not a store"));
        };
        let Expression::Atom(rhs) = rhs else {
            return Err(malformed(Self::NAME, rhs, "right hand side is not an atom"));
        };
        value_atom(Self::NAME, rhs)?;

        Ok(Self {
            address: &store.address,
            rhs,
        })
    }
}

impl core::fmt::Display for StoreAssignment<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "((mem {} 0) <- {})", self.address, self.rhs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Goto<'ast> {
    target: &'ast Label,
}

impl<'ast> Goto<'ast> {
    pub fn new(goto: &'ast ast::Goto) -> Self {
        Self {
            target: &goto.target,
        }
    }
}

impl core::fmt::Display for Goto<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(goto {})", self.target)
    }
}

/// Conditional branch on a boolean (0 or 1) variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cjump<'ast> {
    cjump: &'ast ast::Cjump,
}

impl<'ast> Cjump<'ast> {
    pub fn new(cjump: &'ast ast::Cjump) -> Self {
        Self { cjump }
    }
}

impl core::fmt::Display for Cjump<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ast::Cjump {
            condition,
            true_target,
            false_target,
            ..
        } = self.cjump;

        writeln!(f, "(cjump {condition} = 1 {true_target} {false_target})")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValReturn<'ast> {
    value: &'ast Atom,
}

impl<'ast> ValReturn<'ast> {
    const NAME: &'static str = "value-return";

    pub fn new(ret: &'ast ast::ValReturn) -> TileResult<Self> {
        value_atom(Self::NAME, &ret.value)?;

        Ok(Self { value: &ret.value })
    }
}

impl core::fmt::Display for ValReturn<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "({RETURN_REG} <- {})", self.value)?;
        writeln!(f, "(return)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoidReturn;

impl core::fmt::Display for VoidReturn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "(return)")
    }
}

/// A jump target standing on its own line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTile<'ast> {
    label: &'ast Label,
}

impl<'ast> LabelTile<'ast> {
    pub fn new(label: &'ast Label) -> Self {
        Self { label }
    }
}

impl core::fmt::Display for LabelTile<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::{AstBuilder, Instruction, RuntimeFunctionKind};

    /// Splits an assignment built by [`AstBuilder::assign`] into its sides
    fn sides(instruction: &Instruction) -> (&AssignmentTarget, &Expression) {
        match instruction {
            Instruction::Assignment(assignment) => (&assignment.lhs, &assignment.rhs),
            other => panic!("not an assignment: {other}"),
        }
    }

    #[test]
    fn atom_assignment() {
        let mut ast = AstBuilder::new();
        let lhs = ast.var("hi_mom");
        let mork = ast.var("mork");
        let rhs = Expression::from(mork);

        let tile = AtomAssignment::new(&lhs, &rhs).unwrap();
        assert_eq!(tile.to_string(), "(hi_mom <- mork)");

        let label = Expression::from(ast.label(":there"));
        let tile = AtomAssignment::new(&lhs, &label).unwrap();
        assert_eq!(tile.to_string(), "(hi_mom <- :there)");
    }

    #[test]
    fn atom_assignment_rejects_other_shapes() {
        let mut ast = AstBuilder::new();
        let lhs = ast.var("x");
        let address = ast.var("p");
        let load = Expression::from(ast.load(address));
        let print = Expression::from(ast.runtime(RuntimeFunctionKind::Print));

        assert_eq!(
            AtomAssignment::new(&lhs, &load),
            Err(InternalError::MalformedTile {
                tile: "atom-assignment",
                construct: "load p".into(),
                reason: "right hand side is not an atom",
            })
        );
        assert!(matches!(
            AtomAssignment::new(&lhs, &print),
            Err(InternalError::MalformedTile { .. })
        ));
    }

    #[test]
    fn load_assignment() {
        let mut ast = AstBuilder::new();
        let lhs = ast.var("v");
        let address = ast.var("arr");
        let rhs = Expression::from(ast.load(address));

        let tile = LoadAssignment::new(&lhs, &rhs).unwrap();
        assert_eq!(tile.to_string(), "(v <- (mem arr 0))");
    }

    #[test]
    fn arithmetic_binop_accumulates_in_place() {
        let mut ast = AstBuilder::new();
        let lhs = ast.var("sad_face");
        let six = ast.int(6);
        let no = ast.var("no");
        let rhs = Expression::from(ast.binop(BinaryOperatorKind::Plus, six, no));

        let tile = BinopAssignment::new(&lhs, &rhs).unwrap();
        assert_eq!(tile.to_string(), "(sad_face <- 6)\n(sad_face += no)\n");
    }

    #[test]
    fn every_arithmetic_operator() {
        let mut ast = AstBuilder::new();
        let x = ast.var("x");

        for (operator, expected) in [
            (BinaryOperatorKind::Plus, "(x += b)"),
            (BinaryOperatorKind::Minus, "(x -= b)"),
            (BinaryOperatorKind::Mult, "(x *= b)"),
            (BinaryOperatorKind::And, "(x &= b)"),
            (BinaryOperatorKind::LeftShift, "(x <<= b)"),
            (BinaryOperatorKind::RightShift, "(x >>= b)"),
        ] {
            let (a, b) = (ast.var("a"), ast.var("b"));
            let rhs = Expression::from(ast.binop(operator, a, b));
            let tile = BinopAssignment::new(&x, &rhs).unwrap();

            assert_eq!(tile.to_string(), format!("(x <- a)\n{expected}\n"));
        }
    }

    #[test]
    fn comparison_binop_is_a_single_line() {
        let mut ast = AstBuilder::new();
        let lhs = ast.var("sad_face");

        for (operator, expected) in [
            (BinaryOperatorKind::Le, "(sad_face <- 6 < no)\n"),
            (BinaryOperatorKind::Leq, "(sad_face <- 6 <= no)\n"),
            (BinaryOperatorKind::Eq, "(sad_face <- 6 = no)\n"),
        ] {
            let six = ast.int(6);
            let no = ast.var("no");
            let rhs = Expression::from(ast.binop(operator, six, no));

            assert_eq!(
                BinopAssignment::new(&lhs, &rhs).unwrap().to_string(),
                expected
            );
        }
    }

    #[test]
    fn greater_than_comparisons_are_internal_errors() {
        let mut ast = AstBuilder::new();
        let lhs = ast.var("sad_face");

        for (operator, symbol) in [(BinaryOperatorKind::Ge, ">"), (BinaryOperatorKind::Geq, ">=")] {
            let six = ast.int(6);
            let no = ast.var("no");
            let rhs = Expression::from(ast.binop(operator, six, no));

            assert_eq!(
                BinopAssignment::new(&lhs, &rhs),
                Err(InternalError::DisallowedComparison {
                    operator: symbol,
                    construct: format!("6 {symbol} no"),
                })
            );
        }
    }

    #[test]
    fn binop_rejects_label_operands() {
        let mut ast = AstBuilder::new();
        let lhs = ast.var("x");
        let label = ast.label(":l");
        let one = ast.int(1);
        let rhs = Expression::from(ast.binop(BinaryOperatorKind::Plus, label, one));

        assert!(matches!(
            BinopAssignment::new(&lhs, &rhs),
            Err(InternalError::MalformedTile {
                tile: "binop-assignment",
                ..
            })
        ));
    }

    #[test]
    fn call_with_register_arguments() {
        let mut ast = AstBuilder::new();
        let callee = ast.label(":call_me_please_im_so_alone");
        let (hi, ho) = (ast.var("Hi"), ast.var("ho"));
        let call = ast.call(callee, vec![hi.into(), ho.into()]);

        let tile = CallTile::new(&call, ":rett".into()).unwrap();

        assert_eq!(
            tile.to_string(),
            "(rdi <- Hi)\n\
             (rsi <- ho)\n\
             ((mem rsp -8) <- :rett)\n\
             (call :call_me_please_im_so_alone 2)\n\
             :rett\n"
        );
        assert_eq!(tile.return_label(), ":rett");
    }

    #[test]
    fn call_spills_arguments_past_the_sixth() {
        let mut ast = AstBuilder::new();
        let callee = ast.label(":call_me_please_im_so_alone");
        let mut arguments = ["Hi", "ho", "hope", "is", "useless"]
            .map(|name| Atom::from(ast.var(name)))
            .to_vec();
        arguments.extend([5, 12, 12].map(|value| Atom::from(ast.int(value))));
        let call = ast.call(callee, arguments);

        let tile = CallTile::new(&call, ":rett".into()).unwrap();

        assert_eq!(
            tile.to_string(),
            "(rdi <- Hi)\n\
             (rsi <- ho)\n\
             (rdx <- hope)\n\
             (rcx <- is)\n\
             (r8 <- useless)\n\
             (r9 <- 5)\n\
             ((mem rsp -16) <- 12)\n\
             ((mem rsp -24) <- 12)\n\
             ((mem rsp -8) <- :rett)\n\
             (call :call_me_please_im_so_alone 8)\n\
             :rett\n"
        );
    }

    #[test]
    fn call_to_runtime_function_without_arguments() {
        let mut ast = AstBuilder::new();
        let callee = ast.runtime(RuntimeFunctionKind::ArrayError);
        let call = ast.call(callee, vec![]);

        let tile = CallTile::new(&call, ":z_ret4".into()).unwrap();

        assert_eq!(
            tile.to_string(),
            "((mem rsp -8) <- :z_ret4)\n(call array_error 0)\n:z_ret4\n"
        );
    }

    #[test]
    fn call_rejects_runtime_function_arguments() {
        let mut ast = AstBuilder::new();
        let callee = ast.var("f");
        let print = ast.runtime(RuntimeFunctionKind::Print);
        let call = ast.call(callee, vec![print.into()]);

        assert!(matches!(
            CallTile::new(&call, ":r".into()),
            Err(InternalError::MalformedTile { tile: "call", .. })
        ));
    }

    #[test]
    fn call_assignment_copies_out_of_rax() {
        let mut ast = AstBuilder::new();
        let lhs = ast.var("result");
        let callee = ast.var("fp");
        let one = ast.int(1);
        let rhs = Expression::from(ast.call(callee, vec![one.into()]));

        let tile = CallAssignment::new(&lhs, &rhs, ":back".into()).unwrap();

        assert_eq!(
            tile.to_string(),
            "(rdi <- 1)\n\
             ((mem rsp -8) <- :back)\n\
             (call fp 1)\n\
             :back\n\
             (result <- rax)\n"
        );
    }

    #[test]
    fn store_assignment() {
        let mut ast = AstBuilder::new();
        let address = ast.var("p");
        let store = ast.store(address);
        let value = ast.int(7);
        let instruction = ast.assign(store, value);
        let (lhs, rhs) = sides(&instruction);

        let tile = StoreAssignment::new(lhs, rhs).unwrap();
        assert_eq!(tile.to_string(), "((mem p 0) <- 7)");
    }

    #[test]
    fn store_assignment_needs_a_store_target() {
        let mut ast = AstBuilder::new();
        let x = ast.var("x");
        let value = ast.int(7);
        let instruction = ast.assign(x, value);
        let (lhs, rhs) = sides(&instruction);

        assert!(matches!(
            StoreAssignment::new(lhs, rhs),
            Err(InternalError::MalformedTile {
                reason: "left hand side is not a store",
                ..
            })
        ));
    }

    #[test]
    fn control_flow_tiles() {
        let mut ast = AstBuilder::new();
        let target = ast.label(":top");
        let goto = ast::Goto {
            id: ast.create_node_id(),
            target: target.clone(),
        };
        let condition = ast.var("c");
        let cjump = ast::Cjump {
            id: ast.create_node_id(),
            condition,
            true_target: target.clone(),
            false_target: ast.label(":out"),
        };
        let value = ast.var("x");
        let ret = ast::ValReturn {
            id: ast.create_node_id(),
            value: value.into(),
        };

        assert_eq!(Goto::new(&goto).to_string(), "(goto :top)");
        assert_eq!(Cjump::new(&cjump).to_string(), "(cjump c = 1 :top :out)\n");
        assert_eq!(ValReturn::new(&ret).unwrap().to_string(), "(rax <- x)\n(return)\n");
        assert_eq!(VoidReturn.to_string(), "(return)\n");
        assert_eq!(LabelTile::new(&target).to_string(), ":top");
    }
}

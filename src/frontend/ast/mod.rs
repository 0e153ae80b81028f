//! The L3 abstract syntax tree.
//!
//! The node set is closed. Every node inside a function body
//! carries a [`NodeId`] so later passes can keep side tables about it (the
//! instruction selector's "already lowered" set, for example) without the AST
//! itself holding any pass state.
//!
//! After the parser builds a [`Program`], its shape never changes. The only
//! mutation allowed is label hygiene renaming [`Label`] names in place.

use strum::{Display, EnumString, IntoStaticStr};

use crate::index::{Index, simple_index};

pub mod visit;

simple_index! {
    /// Identifies a node within one [`AstBuilder`]'s output
    pub struct NodeId;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub functions: Vec<Function>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: Label,
    pub parameters: Vec<Var>,
    pub instructions: Vec<Instruction>,
}

/// A top level statement of a function body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Assignment(Assignment),
    Goto(Goto),
    Cjump(Cjump),
    Call(Call),
    ValReturn(ValReturn),
    VoidReturn(VoidReturn),
    /// A label standing on its own is a jump target (fall-through marker)
    Label(Label),
}

impl Instruction {
    pub fn id(&self) -> NodeId {
        match self {
            Instruction::Assignment(assignment) => assignment.id,
            Instruction::Goto(goto) => goto.id,
            Instruction::Cjump(cjump) => cjump.id,
            Instruction::Call(call) => call.id,
            Instruction::ValReturn(ret) => ret.id,
            Instruction::VoidReturn(ret) => ret.id,
            Instruction::Label(label) => label.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub id: NodeId,
    pub lhs: AssignmentTarget,
    pub rhs: Expression,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentTarget {
    Var(Var),
    Store(Store),
}

/// Anything that can appear on the right of `<-`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Atom(Atom),
    Binop(Binop),
    Load(Load),
    Call(Call),
}

impl Expression {
    pub fn id(&self) -> NodeId {
        match self {
            Expression::Atom(atom) => atom.id(),
            Expression::Binop(binop) => binop.id,
            Expression::Load(load) => load.id,
            Expression::Call(call) => call.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binop {
    pub id: NodeId,
    pub operator: BinaryOperatorKind,
    pub lhs: Atom,
    pub rhs: Atom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum BinaryOperatorKind {
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "*")]
    Mult,
    #[strum(serialize = "-")]
    Minus,
    #[strum(serialize = "&")]
    And,
    #[strum(serialize = "<<")]
    LeftShift,
    #[strum(serialize = ">>")]
    RightShift,
    #[strum(serialize = "<")]
    Le,
    #[strum(serialize = "<=")]
    Leq,
    #[strum(serialize = "=")]
    Eq,
    #[strum(serialize = ">")]
    Ge,
    #[strum(serialize = ">=")]
    Geq,
}

impl BinaryOperatorKind {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Le | Self::Leq | Self::Eq | Self::Ge | Self::Geq
        )
    }

    /// The operator's symbol as written in source
    pub fn symbol(self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Load {
    pub id: NodeId,
    pub address: Var,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    pub id: NodeId,
    pub address: Var,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Goto {
    pub id: NodeId,
    pub target: Label,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cjump {
    pub id: NodeId,
    pub condition: Var,
    pub true_target: Label,
    pub false_target: Label,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub id: NodeId,
    pub callee: Callee,
    pub arguments: Vec<Atom>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callee {
    Var(Var),
    Label(Label),
    Runtime(RuntimeFunction),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValReturn {
    pub id: NodeId,
    pub value: Atom,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoidReturn {
    pub id: NodeId,
}

/// A leaf value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Atom {
    Var(Var),
    Label(Label),
    IntLiteral(IntLiteral),
    RuntimeFunction(RuntimeFunction),
}

impl Atom {
    pub fn id(&self) -> NodeId {
        match self {
            Atom::Var(var) => var.id,
            Atom::Label(label) => label.id,
            Atom::IntLiteral(literal) => literal.id,
            Atom::RuntimeFunction(function) => function.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Var {
    pub id: NodeId,
    pub name: String,
}

/// A label. Its name keeps the leading `:` it is written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub id: NodeId,
    pub name: String,
}

impl Label {
    pub const SENTINEL: char = ':';

    /// The name without its leading `:`
    pub fn bare_name(&self) -> &str {
        self.name
            .strip_prefix(Self::SENTINEL)
            .unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntLiteral {
    pub id: NodeId,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeFunction {
    pub id: NodeId,
    pub kind: RuntimeFunctionKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum RuntimeFunctionKind {
    Print,
    Allocate,
    ArrayError,
}

macro_rules! impl_into_atom {
    ($($node:ident),*) => {
        $(
            impl From<$node> for Atom {
                fn from(node: $node) -> Self {
                    Atom::$node(node)
                }
            }
        )*
    };
}

impl_into_atom!(Var, Label, IntLiteral, RuntimeFunction);

macro_rules! impl_into_expression {
    ($($node:ident),*) => {
        $(
            impl From<$node> for Expression {
                fn from(node: $node) -> Self {
                    Expression::Atom(node.into())
                }
            }
        )*
    };
}

impl_into_expression!(Var, Label, IntLiteral, RuntimeFunction);

impl From<Atom> for Expression {
    fn from(atom: Atom) -> Self {
        Expression::Atom(atom)
    }
}

impl From<Binop> for Expression {
    fn from(binop: Binop) -> Self {
        Expression::Binop(binop)
    }
}

impl From<Load> for Expression {
    fn from(load: Load) -> Self {
        Expression::Load(load)
    }
}

impl From<Call> for Expression {
    fn from(call: Call) -> Self {
        Expression::Call(call)
    }
}

impl From<Var> for AssignmentTarget {
    fn from(var: Var) -> Self {
        AssignmentTarget::Var(var)
    }
}

impl From<Store> for AssignmentTarget {
    fn from(store: Store) -> Self {
        AssignmentTarget::Store(store)
    }
}

impl From<Var> for Callee {
    fn from(var: Var) -> Self {
        Callee::Var(var)
    }
}

impl From<Label> for Callee {
    fn from(label: Label) -> Self {
        Callee::Label(label)
    }
}

impl From<RuntimeFunction> for Callee {
    fn from(function: RuntimeFunction) -> Self {
        Callee::Runtime(function)
    }
}

/// Hands out node ids and builds nodes with them.
///
/// The parser owns one of these per program. Tests use it to build trees by
/// hand.
#[derive(Debug)]
pub struct AstBuilder {
    next_node_id: NodeId,
}

impl Default for AstBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AstBuilder {
    pub fn new() -> Self {
        Self {
            next_node_id: NodeId::new(0),
        }
    }

    pub fn create_node_id(&mut self) -> NodeId {
        let id = self.next_node_id;
        self.next_node_id.increment_by(1);
        id
    }

    pub fn var(&mut self, name: impl Into<String>) -> Var {
        Var {
            id: self.create_node_id(),
            name: name.into(),
        }
    }

    /// Builds a label, adding the leading `:` if `name` lacks it
    pub fn label(&mut self, name: impl Into<String>) -> Label {
        let mut name = name.into();
        if !name.starts_with(Label::SENTINEL) {
            name.insert(0, Label::SENTINEL);
        }

        Label {
            id: self.create_node_id(),
            name,
        }
    }

    pub fn int(&mut self, value: i64) -> IntLiteral {
        IntLiteral {
            id: self.create_node_id(),
            value,
        }
    }

    pub fn runtime(&mut self, kind: RuntimeFunctionKind) -> RuntimeFunction {
        RuntimeFunction {
            id: self.create_node_id(),
            kind,
        }
    }

    pub fn binop(
        &mut self,
        operator: BinaryOperatorKind,
        lhs: impl Into<Atom>,
        rhs: impl Into<Atom>,
    ) -> Binop {
        Binop {
            id: self.create_node_id(),
            operator,
            lhs: lhs.into(),
            rhs: rhs.into(),
        }
    }

    pub fn load(&mut self, address: Var) -> Load {
        Load {
            id: self.create_node_id(),
            address,
        }
    }

    pub fn store(&mut self, address: Var) -> Store {
        Store {
            id: self.create_node_id(),
            address,
        }
    }

    pub fn call(&mut self, callee: impl Into<Callee>, arguments: Vec<Atom>) -> Call {
        Call {
            id: self.create_node_id(),
            callee: callee.into(),
            arguments,
        }
    }

    pub fn assign(
        &mut self,
        lhs: impl Into<AssignmentTarget>,
        rhs: impl Into<Expression>,
    ) -> Instruction {
        Instruction::Assignment(Assignment {
            id: self.create_node_id(),
            lhs: lhs.into(),
            rhs: rhs.into(),
        })
    }

    pub fn goto(&mut self, target: Label) -> Instruction {
        Instruction::Goto(Goto {
            id: self.create_node_id(),
            target,
        })
    }

    pub fn cjump(&mut self, condition: Var, true_target: Label, false_target: Label) -> Instruction {
        Instruction::Cjump(Cjump {
            id: self.create_node_id(),
            condition,
            true_target,
            false_target,
        })
    }

    pub fn ret(&mut self, value: Option<Atom>) -> Instruction {
        let id = self.create_node_id();

        match value {
            Some(value) => Instruction::ValReturn(ValReturn { id, value }),
            None => Instruction::VoidReturn(VoidReturn { id }),
        }
    }

    pub fn function(
        &mut self,
        name: Label,
        parameters: Vec<Var>,
        instructions: Vec<Instruction>,
    ) -> Function {
        Function {
            name,
            parameters,
            instructions,
        }
    }
}

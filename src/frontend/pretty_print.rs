//! Renders AST nodes back to L3 source.
//!
//! Every node implements [`Display`](core::fmt::Display). The instruction
//! selector formats atoms through these same impls, so the L2 it emits spells
//! operands exactly the way the L3 printer does.

use itertools::Itertools;

use super::ast;

impl core::fmt::Display for ast::Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.functions.iter().join("\n"))
    }
}

impl core::fmt::Display for ast::Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "define {}({}) {{",
            self.name,
            self.parameters.iter().join(", ")
        )?;

        for instruction in &self.instructions {
            writeln!(f, "\t{instruction}")?;
        }

        writeln!(f, "}}")
    }
}

impl core::fmt::Display for ast::Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ast::Instruction::Assignment(assignment) => write!(f, "{assignment}"),
            ast::Instruction::Goto(goto) => write!(f, "br {}", goto.target),
            ast::Instruction::Cjump(cjump) => write!(
                f,
                "br {} {} {}",
                cjump.condition, cjump.true_target, cjump.false_target
            ),
            ast::Instruction::Call(call) => write!(f, "{call}"),
            ast::Instruction::ValReturn(ret) => write!(f, "return {}", ret.value),
            ast::Instruction::VoidReturn(_) => write!(f, "return"),
            ast::Instruction::Label(label) => write!(f, "{label}"),
        }
    }
}

impl core::fmt::Display for ast::Assignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <- {}", self.lhs, self.rhs)
    }
}

impl core::fmt::Display for ast::AssignmentTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ast::AssignmentTarget::Var(var) => write!(f, "{var}"),
            ast::AssignmentTarget::Store(store) => write!(f, "{store}"),
        }
    }
}

impl core::fmt::Display for ast::Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ast::Expression::Atom(atom) => write!(f, "{atom}"),
            ast::Expression::Binop(binop) => write!(f, "{binop}"),
            ast::Expression::Load(load) => write!(f, "{load}"),
            ast::Expression::Call(call) => write!(f, "{call}"),
        }
    }
}

impl core::fmt::Display for ast::Binop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.operator, self.rhs)
    }
}

impl core::fmt::Display for ast::Load {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "load {}", self.address)
    }
}

impl core::fmt::Display for ast::Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "store {}", self.address)
    }
}

impl core::fmt::Display for ast::Call {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "call {}({})",
            self.callee,
            self.arguments.iter().join(", ")
        )
    }
}

impl core::fmt::Display for ast::Callee {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ast::Callee::Var(var) => write!(f, "{var}"),
            ast::Callee::Label(label) => write!(f, "{label}"),
            ast::Callee::Runtime(function) => write!(f, "{function}"),
        }
    }
}

impl core::fmt::Display for ast::Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ast::Atom::Var(var) => write!(f, "{var}"),
            ast::Atom::Label(label) => write!(f, "{label}"),
            ast::Atom::IntLiteral(literal) => write!(f, "{literal}"),
            ast::Atom::RuntimeFunction(function) => write!(f, "{function}"),
        }
    }
}

impl core::fmt::Display for ast::Var {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl core::fmt::Display for ast::Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl core::fmt::Display for ast::IntLiteral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl core::fmt::Display for ast::RuntimeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

//! Traits for AST visitors which walk the tree in DFS order.
//!
//! [`Visitor`] borrows the tree; [`VisitorMut`] may rewrite nodes in place
//! (label hygiene is its only user). Override a `visit_*` method to act on a
//! node and call the matching `walk_*` function to keep descending.

use super::{
    Assignment, AssignmentTarget, Atom, Binop, Call, Callee, Cjump, Expression, Function, Goto,
    Instruction, Label, Load, RuntimeFunction, Store, Var,
};

pub trait Visitor<'ast>: Sized {
    fn visit_function(&mut self, function: &'ast Function) {
        walk_function(self, function)
    }

    fn visit_instruction(&mut self, instruction: &'ast Instruction) {
        walk_instruction(self, instruction)
    }

    fn visit_assignment(&mut self, assignment: &'ast Assignment) {
        walk_assignment(self, assignment)
    }

    fn visit_expression(&mut self, expression: &'ast Expression) {
        walk_expression(self, expression)
    }

    fn visit_binop(&mut self, binop: &'ast Binop) {
        walk_binop(self, binop)
    }

    fn visit_load(&mut self, load: &'ast Load) {
        self.visit_var(&load.address)
    }

    fn visit_store(&mut self, store: &'ast Store) {
        self.visit_var(&store.address)
    }

    fn visit_goto(&mut self, goto: &'ast Goto) {
        self.visit_label(&goto.target)
    }

    fn visit_cjump(&mut self, cjump: &'ast Cjump) {
        walk_cjump(self, cjump)
    }

    fn visit_call(&mut self, call: &'ast Call) {
        walk_call(self, call)
    }

    fn visit_atom(&mut self, atom: &'ast Atom) {
        walk_atom(self, atom)
    }

    fn visit_var(&mut self, _var: &'ast Var) {}

    fn visit_label(&mut self, _label: &'ast Label) {}

    fn visit_runtime_function(&mut self, _function: &'ast RuntimeFunction) {}
}

/// Visits the function's name and parameters before its body
pub fn walk_function<'a>(visitor: &mut impl Visitor<'a>, function: &'a Function) {
    visitor.visit_label(&function.name);

    for parameter in &function.parameters {
        visitor.visit_var(parameter);
    }

    walk_function_body(visitor, function);
}

pub fn walk_function_body<'a>(visitor: &mut impl Visitor<'a>, function: &'a Function) {
    for instruction in &function.instructions {
        visitor.visit_instruction(instruction);
    }
}

pub fn walk_instruction<'a>(visitor: &mut impl Visitor<'a>, instruction: &'a Instruction) {
    match instruction {
        Instruction::Assignment(assignment) => visitor.visit_assignment(assignment),
        Instruction::Goto(goto) => visitor.visit_goto(goto),
        Instruction::Cjump(cjump) => visitor.visit_cjump(cjump),
        Instruction::Call(call) => visitor.visit_call(call),
        Instruction::ValReturn(ret) => visitor.visit_atom(&ret.value),
        Instruction::VoidReturn(_) => {}
        Instruction::Label(label) => visitor.visit_label(label),
    }
}

pub fn walk_assignment<'a>(visitor: &mut impl Visitor<'a>, assignment: &'a Assignment) {
    match &assignment.lhs {
        AssignmentTarget::Var(var) => visitor.visit_var(var),
        AssignmentTarget::Store(store) => visitor.visit_store(store),
    }

    visitor.visit_expression(&assignment.rhs);
}

pub fn walk_expression<'a>(visitor: &mut impl Visitor<'a>, expression: &'a Expression) {
    match expression {
        Expression::Atom(atom) => visitor.visit_atom(atom),
        Expression::Binop(binop) => visitor.visit_binop(binop),
        Expression::Load(load) => visitor.visit_load(load),
        Expression::Call(call) => visitor.visit_call(call),
    }
}

pub fn walk_binop<'a>(visitor: &mut impl Visitor<'a>, binop: &'a Binop) {
    visitor.visit_atom(&binop.lhs);
    visitor.visit_atom(&binop.rhs);
}

pub fn walk_cjump<'a>(visitor: &mut impl Visitor<'a>, cjump: &'a Cjump) {
    visitor.visit_var(&cjump.condition);
    visitor.visit_label(&cjump.true_target);
    visitor.visit_label(&cjump.false_target);
}

pub fn walk_call<'a>(visitor: &mut impl Visitor<'a>, call: &'a Call) {
    match &call.callee {
        Callee::Var(var) => visitor.visit_var(var),
        Callee::Label(label) => visitor.visit_label(label),
        Callee::Runtime(function) => visitor.visit_runtime_function(function),
    }

    for argument in &call.arguments {
        visitor.visit_atom(argument);
    }
}

pub fn walk_atom<'a>(visitor: &mut impl Visitor<'a>, atom: &'a Atom) {
    match atom {
        Atom::Var(var) => visitor.visit_var(var),
        Atom::Label(label) => visitor.visit_label(label),
        Atom::IntLiteral(_) => {}
        Atom::RuntimeFunction(function) => visitor.visit_runtime_function(function),
    }
}

/// Like [`Visitor`] but hands out mutable references.
///
/// Only the hooks that a rewriting pass needs are provided; everything else
/// is walked through.
pub trait VisitorMut: Sized {
    fn visit_instruction_mut(&mut self, instruction: &mut Instruction) {
        walk_instruction_mut(self, instruction)
    }

    fn visit_call_mut(&mut self, call: &mut Call) {
        walk_call_mut(self, call)
    }

    fn visit_label_mut(&mut self, _label: &mut Label) {}
}

pub fn walk_function_body_mut(visitor: &mut impl VisitorMut, function: &mut Function) {
    for instruction in &mut function.instructions {
        visitor.visit_instruction_mut(instruction);
    }
}

pub fn walk_instruction_mut(visitor: &mut impl VisitorMut, instruction: &mut Instruction) {
    match instruction {
        Instruction::Assignment(assignment) => match &mut assignment.rhs {
            Expression::Atom(atom) => walk_atom_mut(visitor, atom),
            Expression::Binop(binop) => {
                walk_atom_mut(visitor, &mut binop.lhs);
                walk_atom_mut(visitor, &mut binop.rhs);
            }
            Expression::Load(_) => {}
            Expression::Call(call) => visitor.visit_call_mut(call),
        },
        Instruction::Goto(goto) => visitor.visit_label_mut(&mut goto.target),
        Instruction::Cjump(cjump) => {
            visitor.visit_label_mut(&mut cjump.true_target);
            visitor.visit_label_mut(&mut cjump.false_target);
        }
        Instruction::Call(call) => visitor.visit_call_mut(call),
        Instruction::ValReturn(ret) => walk_atom_mut(visitor, &mut ret.value),
        Instruction::VoidReturn(_) => {}
        Instruction::Label(label) => visitor.visit_label_mut(label),
    }
}

pub fn walk_call_mut(visitor: &mut impl VisitorMut, call: &mut Call) {
    if let Callee::Label(label) = &mut call.callee {
        visitor.visit_label_mut(label);
    }

    for argument in &mut call.arguments {
        walk_atom_mut(visitor, argument);
    }
}

pub fn walk_atom_mut(visitor: &mut impl VisitorMut, atom: &mut Atom) {
    if let Atom::Label(label) = atom {
        visitor.visit_label_mut(label);
    }
}

//! Recursive descent parser for L3.
//!
//! Besides building the AST, the parser is where comparisons get normalized:
//! `a > b` is built as `b < a` and `a >= b` as `b <= a`, so nothing after the
//! front end ever sees a greater-than comparison.
//!
//! It also checks that every label written inside a call names a function.
//! Label hygiene leaves calls untouched, so a jump label used there would
//! point nowhere once the function's own labels are renamed.

use super::{
    SourceFile,
    ast::{
        AssignmentTarget, AstBuilder, Atom, BinaryOperatorKind, Call, Callee, Expression,
        Function, Instruction, Label, Program, RuntimeFunctionKind, Var,
    },
    lexer::{Keyword, Lexer, Token, TokenKind},
};
use hashbrown::HashSet;

use crate::error::ParseError;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Debug)]
pub struct Parser<'source> {
    lexer: Lexer<'source>,
    ast: AstBuilder,
    /// Labels seen as callees or call arguments
    call_labels: Vec<Token>,
}

impl<'source> Parser<'source> {
    pub fn parse_program(source_file: &'source SourceFile) -> ParseResult<Program> {
        let mut parser = Self {
            lexer: Lexer::new(source_file),
            ast: AstBuilder::new(),
            call_labels: Vec::new(),
        };

        let mut functions = vec![parser.parse_function()?];

        while parser.lexer.peek().is_some() {
            functions.push(parser.parse_function()?);
        }

        parser.check_call_labels(&functions)?;

        log::debug!(
            "parsed {} function(s) from {}",
            functions.len(),
            source_file.origin
        );

        Ok(Program { functions })
    }

    /// Labels in calls must name a function of the program
    fn check_call_labels(&self, functions: &[Function]) -> ParseResult<()> {
        let function_names = functions
            .iter()
            .map(|function| function.name.name.as_str())
            .collect::<HashSet<_>>();

        for token in &self.call_labels {
            let name = self.source().value_of_span(token.span);

            if !function_names.contains(name) {
                return Err(ParseError::new(
                    token.span,
                    format!("Label `{name}` is used in a call but no function is named `{name}`"),
                ));
            }
        }

        Ok(())
    }

    fn source(&self) -> &'source SourceFile {
        self.lexer.source()
    }

    fn expect_peek(&mut self, expecting: &str) -> ParseResult<Token> {
        match self.lexer.peek() {
            Some(token) => Ok(token),
            None => Err(ParseError::new(
                self.lexer.eof_span(),
                format!("Expected {expecting} but reached end of file"),
            )),
        }
    }

    fn expect_next(&mut self, expecting: &str) -> ParseResult<Token> {
        let token = self.expect_peek(expecting)?;
        self.lexer.next();
        Ok(token)
    }

    fn unexpected(&self, token: Token, expecting: &str) -> ParseError {
        let message = match token.kind {
            TokenKind::Unknown => format!(
                "Unexpected character `{}`",
                self.source().value_of_span(token.span)
            ),
            _ => format!(
                "Expected {expecting} but found `{}`",
                self.source().value_of_span(token.span)
            ),
        };

        ParseError::new(token.span, message)
    }

    fn expect_next_to_be(&mut self, kind: TokenKind, expecting: &str) -> ParseResult<Token> {
        let token = self.expect_next(expecting)?;

        if token.kind != kind {
            return Err(self.unexpected(token, expecting));
        }

        Ok(token)
    }

    fn expect_keyword(&mut self, keyword: Keyword, expecting: &str) -> ParseResult<Token> {
        self.expect_next_to_be(TokenKind::Keyword(keyword), expecting)
    }

    fn peek_is(&mut self, kind: TokenKind) -> bool {
        self.lexer.peek().is_some_and(|t| t.kind == kind)
    }

    /// define :name(a, b) { instruction* }
    fn parse_function(&mut self) -> ParseResult<Function> {
        self.expect_keyword(Keyword::Define, "`define`")?;

        let name = self.parse_label()?;
        let parameters = self.parse_parameter_list()?;

        self.expect_next_to_be(TokenKind::OpenBrace, "`{`")?;

        let mut instructions = Vec::new();
        while self.expect_peek("instruction or `}`")?.kind != TokenKind::CloseBrace {
            instructions.push(self.parse_instruction()?);
        }

        self.expect_next_to_be(TokenKind::CloseBrace, "`}`")?;

        Ok(self.ast.function(name, parameters, instructions))
    }

    // (a, b, c)
    fn parse_parameter_list(&mut self) -> ParseResult<Vec<Var>> {
        let mut parameters = Vec::new();

        self.expect_next_to_be(TokenKind::OpenParen, "`(`")?;

        if self.expect_peek("parameter or `)`")?.kind != TokenKind::CloseParen {
            parameters.push(self.parse_var()?);

            while self.peek_is(TokenKind::Comma) {
                self.lexer.next();
                parameters.push(self.parse_var()?);
            }
        }

        self.expect_next_to_be(TokenKind::CloseParen, "`,` or `)`")?;

        Ok(parameters)
    }

    fn parse_instruction(&mut self) -> ParseResult<Instruction> {
        let token = self.expect_peek("instruction")?;

        match token.kind {
            TokenKind::Label => Ok(Instruction::Label(self.parse_label()?)),
            TokenKind::Identifier => self.parse_assignment_to_var(),
            TokenKind::Keyword(Keyword::Store) => self.parse_assignment_to_store(),
            TokenKind::Keyword(Keyword::Br) => self.parse_branch(),
            TokenKind::Keyword(Keyword::Return) => self.parse_return(),
            TokenKind::Keyword(Keyword::Call) => Ok(Instruction::Call(self.parse_call()?)),
            _ => Err(self.unexpected(token, "instruction")),
        }
    }

    // x <- s | x <- t op t | x <- load y | x <- call callee(args)
    fn parse_assignment_to_var(&mut self) -> ParseResult<Instruction> {
        let lhs = self.parse_var()?;
        self.expect_next_to_be(TokenKind::LeftArrow, "`<-`")?;

        let token = self.expect_peek("right hand side of assignment")?;

        let rhs: Expression = match token.kind {
            TokenKind::Keyword(Keyword::Load) => {
                self.lexer.next();
                let address = self.parse_var()?;
                self.ast.load(address).into()
            }
            TokenKind::Keyword(Keyword::Call) => self.parse_call()?.into(),
            TokenKind::Label => self.parse_label()?.into(),
            TokenKind::Identifier | TokenKind::IntegerLiteral => {
                let first = self.parse_t()?;

                match self.lexer.peek() {
                    Some(operator) if operator.kind.is_binary_operator() => {
                        self.lexer.next();
                        let second = self.parse_t()?;
                        self.build_binop(operator, first, second).into()
                    }
                    _ => first.into(),
                }
            }
            _ => return Err(self.unexpected(token, "right hand side of assignment")),
        };

        Ok(self.ast.assign(lhs, rhs))
    }

    /// Builds a binop, rewriting greater-than comparisons with swapped operands
    fn build_binop(&mut self, operator: Token, lhs: Atom, rhs: Atom) -> Expression {
        let binop = match operator.kind {
            TokenKind::Plus => self.ast.binop(BinaryOperatorKind::Plus, lhs, rhs),
            TokenKind::Minus => self.ast.binop(BinaryOperatorKind::Minus, lhs, rhs),
            TokenKind::Asterisk => self.ast.binop(BinaryOperatorKind::Mult, lhs, rhs),
            TokenKind::Ampersand => self.ast.binop(BinaryOperatorKind::And, lhs, rhs),
            TokenKind::ShiftLeft => self.ast.binop(BinaryOperatorKind::LeftShift, lhs, rhs),
            TokenKind::ShiftRight => self.ast.binop(BinaryOperatorKind::RightShift, lhs, rhs),
            TokenKind::LessThan => self.ast.binop(BinaryOperatorKind::Le, lhs, rhs),
            TokenKind::LessThanOrEqualTo => self.ast.binop(BinaryOperatorKind::Leq, lhs, rhs),
            TokenKind::Equals => self.ast.binop(BinaryOperatorKind::Eq, lhs, rhs),
            TokenKind::GreaterThan => self.ast.binop(BinaryOperatorKind::Le, rhs, lhs),
            TokenKind::GreaterThanOrEqualTo => self.ast.binop(BinaryOperatorKind::Leq, rhs, lhs),
            kind => unreachable!("{kind:?} is not a binary operator"),
        };

        binop.into()
    }

    // store x <- s
    fn parse_assignment_to_store(&mut self) -> ParseResult<Instruction> {
        self.expect_keyword(Keyword::Store, "`store`")?;

        let address = self.parse_var()?;
        let lhs: AssignmentTarget = self.ast.store(address).into();

        self.expect_next_to_be(TokenKind::LeftArrow, "`<-`")?;

        let rhs = self.parse_s()?;

        Ok(self.ast.assign(lhs, rhs))
    }

    // br :label | br var :true :false
    fn parse_branch(&mut self) -> ParseResult<Instruction> {
        self.expect_keyword(Keyword::Br, "`br`")?;

        let token = self.expect_peek("label or condition variable")?;

        match token.kind {
            TokenKind::Label => {
                let target = self.parse_label()?;
                Ok(self.ast.goto(target))
            }
            TokenKind::Identifier => {
                let condition = self.parse_var()?;
                let true_target = self.parse_label()?;
                let false_target = self.parse_label()?;
                Ok(self.ast.cjump(condition, true_target, false_target))
            }
            _ => Err(self.unexpected(token, "label or condition variable")),
        }
    }

    // return | return t
    fn parse_return(&mut self) -> ParseResult<Instruction> {
        self.expect_keyword(Keyword::Return, "`return`")?;

        // A variable directly followed by `<-` starts the next instruction
        let has_value = match self.lexer.peek().map(|t| t.kind) {
            Some(TokenKind::IntegerLiteral) => true,
            Some(TokenKind::Identifier) => self
                .lexer
                .peek_nth(1)
                .is_none_or(|t| t.kind != TokenKind::LeftArrow),
            _ => false,
        };

        let value = if has_value {
            Some(self.parse_t()?)
        } else {
            None
        };

        Ok(self.ast.ret(value))
    }

    // call callee(s, s)
    fn parse_call(&mut self) -> ParseResult<Call> {
        self.expect_keyword(Keyword::Call, "`call`")?;

        let token = self.expect_next("callee")?;

        let callee: Callee = match token.kind {
            TokenKind::Identifier => self.var_from_token(token).into(),
            TokenKind::Label => {
                self.call_labels.push(token);
                self.label_from_token(token).into()
            }
            TokenKind::Keyword(Keyword::Print) => {
                self.ast.runtime(RuntimeFunctionKind::Print).into()
            }
            TokenKind::Keyword(Keyword::Allocate) => {
                self.ast.runtime(RuntimeFunctionKind::Allocate).into()
            }
            TokenKind::Keyword(Keyword::ArrayError) => {
                self.ast.runtime(RuntimeFunctionKind::ArrayError).into()
            }
            _ => return Err(self.unexpected(token, "callee")),
        };

        let mut arguments = Vec::new();

        self.expect_next_to_be(TokenKind::OpenParen, "`(`")?;

        if self.expect_peek("argument or `)`")?.kind != TokenKind::CloseParen {
            arguments.push(self.parse_argument()?);

            while self.peek_is(TokenKind::Comma) {
                self.lexer.next();
                arguments.push(self.parse_argument()?);
            }
        }

        self.expect_next_to_be(TokenKind::CloseParen, "`,` or `)`")?;

        Ok(self.ast.call(callee, arguments))
    }

    fn parse_argument(&mut self) -> ParseResult<Atom> {
        if let Some(token) = self.lexer.peek().filter(|t| t.kind == TokenKind::Label) {
            self.call_labels.push(token);
        }

        self.parse_s()
    }

    // var | number | label
    fn parse_s(&mut self) -> ParseResult<Atom> {
        if self.peek_is(TokenKind::Label) {
            return Ok(self.parse_label()?.into());
        }

        self.parse_t()
    }

    // var | number
    fn parse_t(&mut self) -> ParseResult<Atom> {
        let token = self.expect_next("variable or number")?;

        match token.kind {
            TokenKind::Identifier => Ok(self.var_from_token(token).into()),
            TokenKind::IntegerLiteral => {
                let text = self.source().value_of_span(token.span);
                let value = text.parse::<i64>().map_err(|_| {
                    ParseError::new(
                        token.span,
                        format!("Integer literal `{text}` does not fit in 64 bits"),
                    )
                })?;

                Ok(self.ast.int(value).into())
            }
            _ => Err(self.unexpected(token, "variable or number")),
        }
    }

    fn parse_var(&mut self) -> ParseResult<Var> {
        let token = self.expect_next_to_be(TokenKind::Identifier, "variable")?;
        Ok(self.var_from_token(token))
    }

    fn parse_label(&mut self) -> ParseResult<Label> {
        let token = self.expect_next_to_be(TokenKind::Label, "label")?;
        Ok(self.label_from_token(token))
    }

    fn var_from_token(&mut self, token: Token) -> Var {
        let name = self.source().value_of_span(token.span);
        self.ast.var(name)
    }

    fn label_from_token(&mut self, token: Token) -> Label {
        let name = self.source().value_of_span(token.span);
        self.ast.label(name)
    }
}

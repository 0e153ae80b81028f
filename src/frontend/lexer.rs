use std::{collections::BTreeMap, collections::VecDeque, str::Chars};

use itertools::{PeekNth, peek_nth};
use once_cell::sync::Lazy;
use strum::EnumString;

use super::SourceFile;

#[derive(Debug)]
pub struct Lexer<'source> {
    source: &'source SourceFile,
    position: usize,
    chars: PeekNth<Chars<'source>>,
    peek_buffer: VecDeque<Token>,
    previous: Option<TokenKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /* Words */
    Keyword(Keyword), // define
    Identifier,       // my_var
    Label,            // :my_label

    /* Literals */
    IntegerLiteral, // -12

    /* Delimiters */
    OpenParen,  // (
    CloseParen, // )
    OpenBrace,  // {
    CloseBrace, // }
    Comma,      // ,

    /* Other */
    LeftArrow, // <-

    /* Arithmetic */
    Plus,       // +
    Minus,      // -
    Asterisk,   // *
    Ampersand,  // &
    ShiftLeft,  // <<
    ShiftRight, // >>

    /* Comparisons */
    LessThan,             // <
    LessThanOrEqualTo,    // <=
    Equals,               // =
    GreaterThan,          // >
    GreaterThanOrEqualTo, // >=

    /// A character that cannot start any token. The parser reports it.
    Unknown,
}

impl TokenKind {
    pub fn is_binary_operator(&self) -> bool {
        matches!(
            self,
            Self::Plus
                | Self::Minus
                | Self::Asterisk
                | Self::Ampersand
                | Self::ShiftLeft
                | Self::ShiftRight
                | Self::LessThan
                | Self::LessThanOrEqualTo
                | Self::Equals
                | Self::GreaterThan
                | Self::GreaterThanOrEqualTo
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Keyword {
    Define,
    Load,
    Store,
    Br,
    Return,
    Call,
    Print,
    Allocate,
    ArrayError,
}

/// Table of single char tokens (matched after longer sequences are checked for)
static SINGLE_TOKENS: Lazy<BTreeMap<char, TokenKind>> = Lazy::new(|| {
    BTreeMap::from([
        ('(', TokenKind::OpenParen),
        (')', TokenKind::CloseParen),
        ('{', TokenKind::OpenBrace),
        ('}', TokenKind::CloseBrace),
        (',', TokenKind::Comma),
        ('+', TokenKind::Plus),
        ('-', TokenKind::Minus),
        ('*', TokenKind::Asterisk),
        ('&', TokenKind::Ampersand),
        ('<', TokenKind::LessThan),
        ('=', TokenKind::Equals),
        ('>', TokenKind::GreaterThan),
    ])
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source SourceFile) -> Self {
        Self {
            source,
            chars: peek_nth(source.contents.chars()),
            position: 0,
            peek_buffer: VecDeque::new(),
            previous: None,
        }
    }

    pub fn source(&self) -> &'source SourceFile {
        self.source
    }

    /// Span of the (empty) end of the input, used when reporting EOF
    pub fn eof_span(&self) -> Span {
        let end = self.source.contents.len();
        Span::new(end, end)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.position += c.len_utf8();
        Some(c)
    }

    fn ignore_line(&mut self) {
        while let Some(c) = self.chars.peek().copied() {
            if c == '\n' {
                break;
            }

            self.bump();
        }
    }

    fn read_name_tail(&mut self) {
        while let Some(c) = self.chars.peek().copied() {
            if !is_name_continue(c) {
                break;
            }

            self.bump();
        }
    }

    // Keyword or identifier
    fn read_word(&mut self) -> Token {
        let start_position = self.position;

        self.read_name_tail();

        let span = self.new_span(start_position);
        let value = self.source.value_of_span(span);

        let kind = match value.parse() {
            Ok(keyword) => TokenKind::Keyword(keyword),
            Err(_) => TokenKind::Identifier,
        };

        Token { kind, span }
    }

    // :name
    fn read_label(&mut self) -> Token {
        let start_position = self.position;

        self.bump();
        self.read_name_tail();

        Token {
            kind: TokenKind::Label,
            span: self.new_span(start_position),
        }
    }

    // An optional sign directly followed by digits
    fn read_number(&mut self) -> Token {
        let start_position = self.position;

        if self.chars.peek().is_some_and(|c| *c == '-' || *c == '+') {
            self.bump();
        }

        while self.chars.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }

        Token {
            kind: TokenKind::IntegerLiteral,
            span: self.new_span(start_position),
        }
    }

    fn read_fixed(&mut self, length: usize, kind: TokenKind) -> Token {
        let start_position = self.position;

        for _ in 0..length {
            self.bump();
        }

        Token {
            kind,
            span: self.new_span(start_position),
        }
    }

    fn new_span(&self, start: usize) -> Span {
        Span {
            start,
            end: self.position,
        }
    }

    /// Whether the last token lexed can be the left operand of a binop
    fn follows_operand(&self) -> bool {
        matches!(
            self.previous,
            Some(TokenKind::Identifier | TokenKind::IntegerLiteral | TokenKind::CloseParen)
        )
    }

    fn next_is(&mut self, n: usize, expected: char) -> bool {
        self.chars.peek_nth(n).is_some_and(|c| *c == expected)
    }

    pub fn peek(&mut self) -> Option<Token> {
        self.peek_nth(0)
    }

    /// Looks `n` tokens ahead without consuming anything
    pub fn peek_nth(&mut self, n: usize) -> Option<Token> {
        while self.peek_buffer.len() <= n {
            let token = self.lex_token()?;
            self.peek_buffer.push_back(token);
        }

        self.peek_buffer.get(n).copied()
    }

    pub fn next(&mut self) -> Option<Token> {
        if let Some(token) = self.peek_buffer.pop_front() {
            return Some(token);
        }

        self.lex_token()
    }

    fn lex_token(&mut self) -> Option<Token> {
        while let Some(c) = self.chars.peek().copied() {
            let token = match c {
                // Ignore whitespace
                c if c.is_whitespace() => {
                    self.bump();
                    continue;
                }
                // Ignore comments
                '/' if self.next_is(1, '/') => {
                    self.ignore_line();
                    continue;
                }

                // Identifiers and keywords
                a if is_name_start(a) => self.read_word(),

                // Labels
                ':' if self.chars.peek_nth(1).is_some_and(|c| is_name_start(*c)) => {
                    self.read_label()
                }

                // Integer literals. A sign belongs to the literal only when it
                // touches a digit and no operand comes before it (`n -1` is `n - 1`)
                n if n.is_ascii_digit() => self.read_number(),
                '-' | '+'
                    if !self.follows_operand()
                        && self.chars.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) =>
                {
                    self.read_number()
                }

                // Left arrow (<-)
                '<' if self.next_is(1, '-') => self.read_fixed(2, TokenKind::LeftArrow),
                // Shift left (<<)
                '<' if self.next_is(1, '<') => self.read_fixed(2, TokenKind::ShiftLeft),
                // Shift right (>>)
                '>' if self.next_is(1, '>') => self.read_fixed(2, TokenKind::ShiftRight),
                // Less than or equal (<=)
                '<' if self.next_is(1, '=') => self.read_fixed(2, TokenKind::LessThanOrEqualTo),
                // Greater than or equal (>=)
                '>' if self.next_is(1, '=') => {
                    self.read_fixed(2, TokenKind::GreaterThanOrEqualTo)
                }

                s => match SINGLE_TOKENS.get(&s) {
                    Some(kind) => self.read_fixed(1, *kind),
                    None => self.read_fixed(1, TokenKind::Unknown),
                },
            };

            self.previous = Some(token.kind);

            return Some(token);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let source = SourceFile::from_memory(source);
        let mut lexer = Lexer::new(&source);

        std::iter::from_fn(|| lexer.next()).map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_a_function_header() {
        assert_eq!(
            kinds("define :main(a, b) {"),
            vec![
                TokenKind::Keyword(Keyword::Define),
                TokenKind::Label,
                TokenKind::OpenParen,
                TokenKind::Identifier,
                TokenKind::Comma,
                TokenKind::Identifier,
                TokenKind::CloseParen,
                TokenKind::OpenBrace,
            ]
        );
    }

    #[test]
    fn left_arrow_wins_over_less_than() {
        assert_eq!(
            kinds("x <- a < b"),
            vec![
                TokenKind::Identifier,
                TokenKind::LeftArrow,
                TokenKind::Identifier,
                TokenKind::LessThan,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn signs_only_bind_when_touching_digits() {
        assert_eq!(
            kinds("a - -5 +3"),
            vec![
                TokenKind::Identifier,
                TokenKind::Minus,
                TokenKind::IntegerLiteral,
                TokenKind::Plus,
                TokenKind::IntegerLiteral,
            ]
        );
        assert_eq!(
            kinds("x <- -1 (+2"),
            vec![
                TokenKind::Identifier,
                TokenKind::LeftArrow,
                TokenKind::IntegerLiteral,
                TokenKind::OpenParen,
                TokenKind::IntegerLiteral,
            ]
        );
    }

    #[test]
    fn a_sign_after_an_operand_is_an_operator() {
        let binop = vec![
            TokenKind::Identifier,
            TokenKind::LeftArrow,
            TokenKind::Identifier,
            TokenKind::Minus,
            TokenKind::IntegerLiteral,
        ];

        assert_eq!(kinds("x <- n -1"), binop);
        assert_eq!(kinds("x <- n-1"), binop);
        assert_eq!(
            kinds("x <- 4+1"),
            vec![
                TokenKind::Identifier,
                TokenKind::LeftArrow,
                TokenKind::IntegerLiteral,
                TokenKind::Plus,
                TokenKind::IntegerLiteral,
            ]
        );
    }

    #[test]
    fn two_character_operators() {
        assert_eq!(
            kinds("<< >> <= >= < > ="),
            vec![
                TokenKind::ShiftLeft,
                TokenKind::ShiftRight,
                TokenKind::LessThanOrEqualTo,
                TokenKind::GreaterThanOrEqualTo,
                TokenKind::LessThan,
                TokenKind::GreaterThan,
                TokenKind::Equals,
            ]
        );
    }

    #[test]
    fn runtime_functions_are_keywords() {
        assert_eq!(
            kinds("print allocate array_error printer"),
            vec![
                TokenKind::Keyword(Keyword::Print),
                TokenKind::Keyword(Keyword::Allocate),
                TokenKind::Keyword(Keyword::ArrayError),
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn comments_are_skipped_and_junk_is_reported() {
        assert_eq!(
            kinds("// nothing here\nreturn ?"),
            vec![TokenKind::Keyword(Keyword::Return), TokenKind::Unknown]
        );
    }

    #[test]
    fn peeking_does_not_consume() {
        let source = SourceFile::from_memory("x <- 1");
        let mut lexer = Lexer::new(&source);

        assert_eq!(lexer.peek_nth(1).map(|t| t.kind), Some(TokenKind::LeftArrow));
        assert_eq!(lexer.peek().map(|t| t.kind), Some(TokenKind::Identifier));
        assert_eq!(lexer.next().map(|t| t.kind), Some(TokenKind::Identifier));
        assert_eq!(lexer.next().map(|t| t.kind), Some(TokenKind::LeftArrow));

        let literal = lexer.next().unwrap();
        assert_eq!(source.value_of_span(literal.span), "1");
        assert_eq!(lexer.next(), None);
    }
}

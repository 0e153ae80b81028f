//! Error types for the compiler.
//!
//! There are two very different kinds of failure. A [`ParseError`] means the
//! user handed us something that is not L3. An [`InternalError`] means the
//! compiler itself is broken: by the time instruction selection runs, every
//! instruction has already passed the front end, so a shape we cannot tile is
//! a bug and never something the user can fix.

use thiserror::Error;

use crate::frontend::lexer::Span;

/// Fatal invariant violations raised after parsing.
///
/// Every variant carries the printer rendering of the construct that broke
/// the invariant so the report can be read without a debugger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InternalError {
    #[error("no tile matches instruction `{instruction}`")]
    UnmatchedInstruction { instruction: String },

    #[error(
        "comparison `{operator}` reached instruction selection in `{construct}` \
         (the front end must rewrite it to `<` or `<=`)"
    )]
    DisallowedComparison {
        operator: &'static str,
        construct: String,
    },

    #[error("cannot build a {tile} tile from `{construct}`: {reason}")]
    MalformedTile {
        tile: &'static str,
        construct: String,
        reason: &'static str,
    },
}

/// A syntax error in L3 source text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

#[derive(Error, Debug)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Internal(#[from] InternalError),

    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

pub type CompileResult<T> = Result<T, CompileError>;

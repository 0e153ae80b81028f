//! The frontend turns L3 source text into the AST that the later passes work
//! on. It also owns the printer, which renders the AST back to L3.

use std::path::PathBuf;

use colored::Colorize;

use self::lexer::Span;

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod pretty_print;

#[derive(Debug)]
pub struct SourceFile {
    pub contents: String,
    pub origin: SourceFileOrigin,
}

impl SourceFile {
    pub fn from_memory(contents: impl Into<String>) -> Self {
        Self {
            contents: contents.into(),
            origin: SourceFileOrigin::Memory,
        }
    }

    pub fn value_of_span(&self, span: Span) -> &str {
        &self.contents[span.start..span.end]
    }

    /// 1-based line number of a byte offset
    pub fn row_for_position(&self, position: usize) -> usize {
        self.contents[..position.min(self.contents.len())]
            .matches('\n')
            .count()
            + 1
    }

    /// 1-based column of a byte offset
    pub fn column_for_position(&self, position: usize) -> usize {
        let position = position.min(self.contents.len());
        let line_start = self.contents[..position]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0);

        position - line_start + 1
    }

    pub fn format_span_position(&self, span: Span) -> String {
        format!(
            "{}:{}:{}",
            self.origin,
            self.row_for_position(span.start),
            self.column_for_position(span.start)
        )
    }

    /// Renders the line containing the start of `span` with the spanned
    /// characters underlined.
    pub fn highlight_span(&self, span: Span) -> String {
        let start = span.start.min(self.contents.len());
        let line_start = self.contents[..start]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        let line_end = self.contents[start..]
            .find('\n')
            .map(|i| start + i)
            .unwrap_or(self.contents.len());

        let row = self.row_for_position(start).to_string();
        let gutter = " ".repeat(row.len());
        let padding = self.contents[line_start..start].chars().count();
        let underline_len = self.contents[start..span.end.clamp(start, line_end)]
            .chars()
            .count()
            .max(1);

        format!(
            "{gutter} {}\n{} {} {}\n{gutter} {} {}{}",
            "|".blue(),
            row.blue(),
            "|".blue(),
            &self.contents[line_start..line_end],
            "|".blue(),
            " ".repeat(padding),
            "^".repeat(underline_len).red()
        )
    }
}

#[derive(Debug)]
pub enum SourceFileOrigin {
    Memory,
    File(PathBuf),
}

impl core::fmt::Display for SourceFileOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceFileOrigin::Memory => f.write_str("<memory>"),
            SourceFileOrigin::File(path) => f.write_fmt(format_args!("{}", path.display())),
        }
    }
}

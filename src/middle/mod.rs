//! Passes that rewrite the AST between parsing and instruction selection.

pub mod hygiene;

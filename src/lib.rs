//! An L3 to L2 compiler.
//!
//! [`frontend`] parses L3 into an AST, [`middle::hygiene`] makes every jump
//! label unique to its function and [`backend`] tiles each instruction into
//! L2. [`driver`] strings the passes together.

pub mod backend;
pub mod driver;
pub mod error;
pub mod frontend;
mod index;
pub mod middle;

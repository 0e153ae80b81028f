//! The backend lowers hygienic L3 to L2.
//!
//! Each L3 instruction is covered by one tile ([`selection`]), each tile
//! prints as a few L2 instructions ([`tiles`]) and the tiled functions are
//! wrapped up into an L2 program ([`emit`]). Calls follow a fixed convention:
//! six argument registers, further arguments on the stack and a fresh return
//! label per call site ([`names`]).

pub mod emit;
pub mod names;
pub mod registers;
pub mod selection;
pub mod tiles;

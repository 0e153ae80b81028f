//! Fresh label generation for call sites.
//!
//! Every call needs a return label that no other call site in the whole
//! program uses. The selector does not own a counter for this; it is handed a
//! [`NameGenerator`] so the uniqueness guarantee is part of its signature.

use crate::frontend::ast::Label;

pub trait NameGenerator {
    /// Returns a label name, leading `:` included, never returned before
    fn fresh_label(&mut self) -> String;
}

/// Hands out `:<prefix>_ret0`, `:<prefix>_ret1`, ... from one counter.
///
/// Use a single generator for a whole program. With the prefix returned by
/// label hygiene the results cannot collide with any user label: those never
/// start with the prefix, and scoped ones continue it with a digit, not `_`.
#[derive(Debug, Clone)]
pub struct ReturnLabelGenerator {
    prefix: String,
    next: u64,
}

impl ReturnLabelGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 0,
        }
    }

    /// How many labels have been handed out so far
    pub fn issued(&self) -> u64 {
        self.next
    }
}

impl NameGenerator for ReturnLabelGenerator {
    fn fresh_label(&mut self) -> String {
        let label = format!("{}{}_ret{}", Label::SENTINEL, self.prefix, self.next);
        self.next += 1;
        label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_sequential_and_unique() {
        let mut names = ReturnLabelGenerator::new("z");

        assert_eq!(names.fresh_label(), ":z_ret0");
        assert_eq!(names.fresh_label(), ":z_ret1");
        assert_eq!(names.fresh_label(), ":z_ret2");
        assert_eq!(names.issued(), 3);
    }
}

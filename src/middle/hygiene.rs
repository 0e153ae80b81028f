//! Label hygiene.
//!
//! Once tiled, every function's instructions end up in one flat L2 file, so a
//! jump label like `:loop` may only mean one thing across the whole program.
//! This pass gives each function's local labels a prefix of their own while
//! leaving function names (call targets) exactly as written.
//!
//! The prefix is derived from the set of every label name in the program with
//! [`find_prefix`], then each function gets that prefix followed by its index.
//! Label names always start with a letter or `_`, so `z1` + `0loop` can never
//! be produced and the per-function prefixes cannot run into each other.

use hashbrown::HashSet;
use itertools::Itertools;

use crate::frontend::ast::{
    Call, Function, Label, Program, Var,
    visit::{self, Visitor, VisitorMut},
};

/// Names of all variables used in the function's instructions.
///
/// Runtime functions (`print`, `allocate`, `array_error`) are never variables.
pub fn free_vars(function: &Function) -> HashSet<String> {
    struct VarCollector<'ast>(HashSet<&'ast str>);

    impl<'ast> Visitor<'ast> for VarCollector<'ast> {
        fn visit_var(&mut self, var: &'ast Var) {
            self.0.insert(&var.name);
        }
    }

    let mut collector = VarCollector(HashSet::new());
    visit::walk_function_body(&mut collector, function);

    collector.0.into_iter().map(str::to_owned).collect()
}

/// Bare names (no leading `:`) of all labels in the function, its own name
/// included.
pub fn free_labels(function: &Function) -> HashSet<String> {
    struct LabelCollector<'ast>(HashSet<&'ast str>);

    impl<'ast> Visitor<'ast> for LabelCollector<'ast> {
        fn visit_label(&mut self, label: &'ast Label) {
            self.0.insert(label.bare_name());
        }
    }

    let mut collector = LabelCollector(HashSet::new());
    collector.visit_function(function);

    collector.0.into_iter().map(str::to_owned).collect()
}

const PREFIX_ROOT: char = 'z';
const PREFIX_DIGITS: std::ops::RangeInclusive<char> = '0'..='9';

/// Finds the shortest, smallest string that no name in `names` starts with.
///
/// If no name starts with `z` the answer is `z`. Otherwise candidates `z0`,
/// `z1`, ... are tried against the names in sorted order; once `z9` is used
/// up a new digit is appended (`z90`). Because the names are sorted, a
/// candidate that sorts before a name it does not prefix cannot prefix any
/// later name either, so the scan stops there.
pub fn find_prefix<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    let sorted = names.into_iter().sorted().collect::<Vec<_>>();

    let Some(first) = sorted.iter().position(|name| name.starts_with(PREFIX_ROOT)) else {
        return PREFIX_ROOT.to_string();
    };

    let mut candidate = format!("{PREFIX_ROOT}{}", PREFIX_DIGITS.start());

    for name in &sorted[first..] {
        while name.starts_with(candidate.as_str()) {
            bump(&mut candidate);
        }

        if candidate.as_str() < *name {
            break;
        }
    }

    candidate
}

/// Advances the last digit, or appends a fresh one when it is exhausted
fn bump(candidate: &mut String) {
    match candidate.pop() {
        Some(last) if PREFIX_DIGITS.contains(&last) && last != *PREFIX_DIGITS.end() => {
            candidate.push((last as u8 + 1) as char);
        }
        Some(last) => {
            candidate.push(last);
            candidate.push(*PREFIX_DIGITS.start());
        }
        None => candidate.push(*PREFIX_DIGITS.start()),
    }
}

/// Prepends `prefix` to every label in the function body whose bare name is
/// not in `globally_scoped_names`.
///
/// Calls are left alone entirely, callee and arguments alike, since call
/// targets must resolve exactly as written.
pub fn scopify_labels(
    function: &mut Function,
    prefix: &str,
    globally_scoped_names: &HashSet<String>,
) {
    struct Scopifier<'a> {
        prefix: &'a str,
        globally_scoped_names: &'a HashSet<String>,
    }

    impl VisitorMut for Scopifier<'_> {
        fn visit_call_mut(&mut self, _call: &mut Call) {}

        fn visit_label_mut(&mut self, label: &mut Label) {
            if self.globally_scoped_names.contains(label.bare_name()) {
                return;
            }

            label.name = format!("{}{}{}", Label::SENTINEL, self.prefix, label.bare_name());
        }
    }

    visit::walk_function_body_mut(
        &mut Scopifier {
            prefix,
            globally_scoped_names,
        },
        function,
    );
}

/// Runs the whole pass over a program and returns the shared root prefix.
///
/// Function `i` gets the sub-prefix `root + i`. The root is also free for any
/// later pass that needs to mint labels of its own.
pub fn make_labels_hygienic(program: &mut Program) -> String {
    let all_labels = program
        .functions
        .iter()
        .flat_map(free_labels)
        .collect::<HashSet<_>>();

    let root = find_prefix(all_labels.iter().map(String::as_str));

    log::debug!(
        "label prefix `{root}` chosen from {} distinct label(s)",
        all_labels.len()
    );

    let globally_scoped_names = program
        .functions
        .iter()
        .map(|function| function.name.bare_name().to_owned())
        .collect::<HashSet<_>>();

    for (i, function) in program.functions.iter_mut().enumerate() {
        let prefix = format!("{root}{i}");

        log::debug!("scoping labels of {} with `{prefix}`", function.name);

        scopify_labels(function, &prefix, &globally_scoped_names);
    }

    root
}

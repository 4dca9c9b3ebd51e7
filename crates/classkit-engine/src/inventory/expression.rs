//! Wildcard name expressions

use super::Inventory;
use regex::Regex;
use rustc_hash::FxHashSet;

/// Compile a `*` expression into an anchored, non-greedy regex
pub(crate) fn compile(expression: &str) -> Result<Regex, regex::Error> {
    let pieces: Vec<String> = expression.split('*').map(regex::escape).collect();
    Regex::new(&format!("^{}$", pieces.join(".*?")))
}

/// True if the expression contains a wildcard
pub(crate) fn is_wildcard(expression: &str) -> bool {
    expression.contains('*')
}

/// Chained selection: `inventory.exclude(..).exclude(..).select(..)`
///
/// Each `exclude` grows the excluded set; `select` returns the matches of
/// its expressions that were not excluded.
#[derive(Debug)]
pub struct Exclusion<'a> {
    inventory: &'a Inventory,
    excluded: FxHashSet<String>,
}

impl<'a> Exclusion<'a> {
    pub(crate) fn new(inventory: &'a Inventory) -> Self {
        Self {
            inventory,
            excluded: FxHashSet::default(),
        }
    }

    /// Exclude everything the expressions match
    pub fn exclude<S: AsRef<str>>(mut self, expressions: &[S]) -> Self {
        for name in self.inventory.get_names_by_expression(expressions, None, false) {
            self.excluded.insert(name);
        }
        self
    }

    /// Names matching the expressions, minus the excluded ones
    pub fn select<S: AsRef<str>>(mut self, expressions: &[S]) -> Vec<String> {
        self.inventory
            .get_names_by_expression(expressions, Some(&mut self.excluded), false)
    }

    /// Names excluded so far
    pub fn excluded(&self) -> &FxHashSet<String> {
        &self.excluded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_is_anchored() {
        let re = compile("Foo.*").unwrap();
        assert!(re.is_match("Foo.Bar"));
        assert!(re.is_match("Foo.Bar.baz"));
        assert!(!re.is_match("Foo2.Bar"));
        assert!(!re.is_match("My.Foo.Bar"));
    }

    #[test]
    fn test_compile_escapes_regex_syntax() {
        let re = compile("a+b.*").unwrap();
        assert!(re.is_match("a+b.c"));
        assert!(!re.is_match("aab.c"));
    }

    #[test]
    fn test_multiple_wildcards() {
        let re = compile("*.view.*").unwrap();
        assert!(re.is_match("App.view.Main"));
        assert!(!re.is_match("App.model.Main"));
    }
}

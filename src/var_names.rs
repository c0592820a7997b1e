//! Variable name allocation for box model trees.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

/// Prefix of every generated variable name.
pub const VARIABLE_PREFIX: &str = "$var";

/// The generator shared by every box and item of one tree.
pub type SharedNames = Rc<RefCell<VariableNameGenerator>>;

/// Hands out `$varN` names that are unique within one box model tree.
///
/// Names found in an imported AST are reserved up front so generated names
/// never shadow them; items then claim the names they actually hold.
#[derive(Debug, Default)]
pub struct VariableNameGenerator {
    reserved: HashSet<String>,
    claimed: HashSet<String>,
    counter: usize,
}

impl VariableNameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedNames {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Returns an unused name and marks it as claimed.
    pub fn generate_name(&mut self) -> String {
        loop {
            let name = format!("{}{}", VARIABLE_PREFIX, self.counter);
            self.counter += 1;
            if !self.is_used(&name) {
                log::trace!("allocated variable name {}", name);
                self.claimed.insert(name.clone());
                return name;
            }
        }
    }

    /// Marks names as already in use so they are never generated.
    pub fn register_existing<I>(&mut self, names: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.reserved.extend(names);
    }

    /// Claims a carried name for one item. Returns false when another item of
    /// the tree already holds it.
    pub fn claim(&mut self, name: &str) -> bool {
        if self.claimed.contains(name) {
            return false;
        }
        self.claimed.insert(name.to_string());
        true
    }

    pub fn is_used(&self, name: &str) -> bool {
        self.reserved.contains(name) || self.claimed.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_names_are_sequential_and_unique() {
        let mut names = VariableNameGenerator::new();
        assert_eq!(names.generate_name(), "$var0");
        assert_eq!(names.generate_name(), "$var1");
        assert_eq!(names.generate_name(), "$var2");
    }

    #[test]
    fn test_registered_names_are_skipped() {
        let mut names = VariableNameGenerator::new();
        names.register_existing(vec!["$var0".to_string(), "$var2".to_string()]);
        assert_eq!(names.generate_name(), "$var1");
        assert_eq!(names.generate_name(), "$var3");
    }

    #[test]
    fn test_claim_rejects_second_holder() {
        let mut names = VariableNameGenerator::new();
        names.register_existing(vec!["$custom".to_string()]);
        assert!(names.claim("$custom"));
        assert!(!names.claim("$custom"));
    }

    #[test]
    fn test_claimed_names_are_not_generated() {
        let mut names = VariableNameGenerator::new();
        assert!(names.claim("$var0"));
        assert_eq!(names.generate_name(), "$var1");
        assert!(!names.claim("$var1"));
    }
}

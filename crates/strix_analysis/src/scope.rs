//! Local variable scope.
//!
//! A `Scope` maps variable names to their current union types. The driver
//! copies it when entering a branch and merges copies afterwards; the
//! evaluator only reads it, apart from materializing an implicit variable
//! in permissive global scope.

use strix_core::OrderedMap;
use strix_types::{KeyKind, TypeId, TypeRegistry, UnionType};

/// Superglobals, defined in every scope as `array<string,mixed>`.
const SUPERGLOBALS: &[&str] = &[
    "_GET", "_POST", "_COOKIE", "_REQUEST", "_SERVER", "_ENV", "_FILES", "_SESSION", "GLOBALS",
];

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub union_type: UnionType,
}

impl Variable {
    pub fn new(name: &str, union_type: UnionType) -> Self {
        Self {
            name: name.to_string(),
            union_type,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scope {
    variables: OrderedMap<String, Variable>,
    is_global: bool,
}

impl Scope {
    /// The file-level scope.
    pub fn global() -> Self {
        Self {
            variables: OrderedMap::new(),
            is_global: true,
        }
    }

    /// A function, method or closure body.
    pub fn function() -> Self {
        Self::default()
    }

    pub fn is_global(&self) -> bool {
        self.is_global
    }

    pub fn has_variable_with_name(&self, name: &str) -> bool {
        self.variables.contains_key(&name.to_string())
    }

    pub fn get_variable_with_name(&self, name: &str) -> Option<&Variable> {
        self.variables.get(&name.to_string())
    }

    /// Add or replace a variable.
    pub fn add_variable(&mut self, variable: Variable) {
        self.variables.insert(variable.name.clone(), variable);
    }

    pub fn remove_variable(&mut self, name: &str) -> Option<Variable> {
        self.variables.remove(&name.to_string())
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Whether `name` is always defined here, whatever the scope contains.
    pub fn is_hardcoded_variable(&self, name: &str) -> bool {
        SUPERGLOBALS.contains(&name)
            || (self.is_global && matches!(name, "argc" | "argv" | "http_response_header"))
    }

    /// Type of an always-defined variable, `None` if `name` is not one here.
    pub fn hardcoded_variable_type(&self, registry: &TypeRegistry, name: &str) -> Option<UnionType> {
        if SUPERGLOBALS.contains(&name) {
            return Some(UnionType::of(registry.generic_array(TypeId::MIXED, KeyKind::String, false)));
        }
        if !self.is_global {
            return None;
        }
        let id = match name {
            "argc" => TypeId::INT,
            "argv" => registry.generic_array(TypeId::STRING, KeyKind::Mixed, false),
            "http_response_header" => registry.generic_array(TypeId::STRING, KeyKind::Mixed, true),
            _ => return None,
        };
        Some(UnionType::of(id))
    }

    /// A declared variable whose name differs only in case, for suggestions.
    pub fn similar_variable_name(&self, name: &str) -> Option<&str> {
        self.variable_names()
            .find(|candidate| *candidate != name && candidate.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hardcoded_variables() {
        let registry = TypeRegistry::new();
        let global = Scope::global();
        let function = Scope::function();

        let server = function.hardcoded_variable_type(&registry, "_SERVER").unwrap();
        assert_eq!(server.display(&registry).to_string(), "array<string,mixed>");
        assert!(function.is_hardcoded_variable("GLOBALS"));

        assert_eq!(
            global.hardcoded_variable_type(&registry, "argv").unwrap().display(&registry).to_string(),
            "string[]"
        );
        assert!(function.hardcoded_variable_type(&registry, "argc").is_none());
        assert!(!function.is_hardcoded_variable("argc"));
        assert!(global.hardcoded_variable_type(&registry, "x").is_none());
    }

    #[test]
    fn test_variables_and_suggestions() {
        let mut scope = Scope::function();
        scope.add_variable(Variable::new("userName", UnionType::of(TypeId::STRING)));
        scope.add_variable(Variable::new("count", UnionType::of(TypeId::INT)));
        assert!(scope.has_variable_with_name("count"));
        assert!(!scope.has_variable_with_name("Count"));
        assert_eq!(scope.similar_variable_name("username"), Some("userName"));
        assert_eq!(scope.variable_names().collect::<Vec<_>>(), vec!["userName", "count"]);
        assert!(scope.remove_variable("count").is_some());
        assert_eq!(scope.len(), 1);
    }
}

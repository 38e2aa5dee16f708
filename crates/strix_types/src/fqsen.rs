//! Fully-qualified structural element names.
//!
//! Class, method and function names compare case-insensitively; property
//! and constant names compare case-sensitively. Namespaces always compare
//! case-insensitively and are stored `\`-rooted (`\` alone is the root).

use std::fmt;
use std::hash::{Hash, Hasher};

fn hash_ignore_case<H: Hasher>(s: &str, state: &mut H) {
    for b in s.bytes() {
        state.write_u8(b.to_ascii_lowercase());
    }
    state.write_u8(0xff);
}

/// Normalize a namespace to `\A\B` form, or `\` for the root.
pub fn normalize_namespace(namespace: &str) -> String {
    let trimmed = namespace.trim_matches('\\');
    if trimmed.is_empty() {
        "\\".to_string()
    } else {
        format!("\\{}", trimmed)
    }
}

/// Split `\A\B\C` (leading `\` optional) into (`\A\B`, `C`).
pub fn split_full_name(full_name: &str) -> (String, String) {
    let trimmed = full_name.trim_start_matches('\\');
    match trimmed.rfind('\\') {
        Some(idx) => (normalize_namespace(&trimmed[..idx]), trimmed[idx + 1..].to_string()),
        None => ("\\".to_string(), trimmed.to_string()),
    }
}

fn join(namespace: &str, name: &str) -> String {
    if namespace == "\\" {
        format!("\\{}", name)
    } else {
        format!("{}\\{}", namespace, name)
    }
}

// ============================================================================
// Classes
// ============================================================================

#[derive(Debug, Clone)]
pub struct FullyQualifiedClassName {
    namespace: String,
    name: String,
}

impl FullyQualifiedClassName {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: normalize_namespace(namespace),
            name: name.to_string(),
        }
    }

    /// Parse `\A\B\C`, with or without the leading separator.
    pub fn from_full_name(full_name: &str) -> Self {
        let (namespace, name) = split_full_name(full_name);
        Self { namespace, name }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lowercased canonical form, used as a map key.
    pub fn key(&self) -> String {
        self.to_string().to_ascii_lowercase()
    }

    /// The name as PHP's `::class` would spell it: no leading separator.
    pub fn class_string(&self) -> String {
        self.to_string().trim_start_matches('\\').to_string()
    }

    pub fn is(&self, full_name: &str) -> bool {
        self.to_string().eq_ignore_ascii_case(&join_or_self(full_name))
    }
}

fn join_or_self(full_name: &str) -> String {
    if full_name.starts_with('\\') {
        full_name.to_string()
    } else {
        format!("\\{}", full_name)
    }
}

impl PartialEq for FullyQualifiedClassName {
    fn eq(&self, other: &Self) -> bool {
        self.namespace.eq_ignore_ascii_case(&other.namespace) && self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Eq for FullyQualifiedClassName {}

impl Hash for FullyQualifiedClassName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_ignore_case(&self.namespace, state);
        hash_ignore_case(&self.name, state);
    }
}

impl fmt::Display for FullyQualifiedClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join(&self.namespace, &self.name))
    }
}

// ============================================================================
// Class members
// ============================================================================

#[derive(Debug, Clone)]
pub struct FullyQualifiedMethodName {
    pub class: FullyQualifiedClassName,
    pub name: String,
}

impl FullyQualifiedMethodName {
    pub fn new(class: FullyQualifiedClassName, name: &str) -> Self {
        Self { class, name: name.to_string() }
    }

    pub fn with_class(&self, class: &FullyQualifiedClassName) -> Self {
        Self::new(class.clone(), &self.name)
    }
}

impl PartialEq for FullyQualifiedMethodName {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class && self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Eq for FullyQualifiedMethodName {}

impl Hash for FullyQualifiedMethodName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.class.hash(state);
        hash_ignore_case(&self.name, state);
    }
}

impl fmt::Display for FullyQualifiedMethodName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.class, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FullyQualifiedPropertyName {
    pub class: FullyQualifiedClassName,
    pub name: String,
}

impl FullyQualifiedPropertyName {
    pub fn new(class: FullyQualifiedClassName, name: &str) -> Self {
        Self { class, name: name.to_string() }
    }

    pub fn with_class(&self, class: &FullyQualifiedClassName) -> Self {
        Self::new(class.clone(), &self.name)
    }
}

impl fmt::Display for FullyQualifiedPropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::${}", self.class, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FullyQualifiedClassConstantName {
    pub class: FullyQualifiedClassName,
    pub name: String,
}

impl FullyQualifiedClassConstantName {
    pub fn new(class: FullyQualifiedClassName, name: &str) -> Self {
        Self { class, name: name.to_string() }
    }

    pub fn with_class(&self, class: &FullyQualifiedClassName) -> Self {
        Self::new(class.clone(), &self.name)
    }
}

impl fmt::Display for FullyQualifiedClassConstantName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.class, self.name)
    }
}

// ============================================================================
// Global elements
// ============================================================================

#[derive(Debug, Clone)]
pub struct FullyQualifiedFunctionName {
    namespace: String,
    name: String,
}

impl FullyQualifiedFunctionName {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: normalize_namespace(namespace),
            name: name.to_string(),
        }
    }

    pub fn from_full_name(full_name: &str) -> Self {
        let (namespace, name) = split_full_name(full_name);
        Self { namespace, name }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The same function name in the root namespace.
    pub fn in_root_namespace(&self) -> Self {
        Self::new("\\", &self.name)
    }
}

impl PartialEq for FullyQualifiedFunctionName {
    fn eq(&self, other: &Self) -> bool {
        self.namespace.eq_ignore_ascii_case(&other.namespace) && self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Eq for FullyQualifiedFunctionName {}

impl Hash for FullyQualifiedFunctionName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_ignore_case(&self.namespace, state);
        hash_ignore_case(&self.name, state);
    }
}

impl fmt::Display for FullyQualifiedFunctionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join(&self.namespace, &self.name))
    }
}

#[derive(Debug, Clone)]
pub struct FullyQualifiedGlobalConstantName {
    namespace: String,
    name: String,
}

impl FullyQualifiedGlobalConstantName {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: normalize_namespace(namespace),
            name: name.to_string(),
        }
    }

    pub fn from_full_name(full_name: &str) -> Self {
        let (namespace, name) = split_full_name(full_name);
        Self { namespace, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn in_root_namespace(&self) -> Self {
        Self::new("\\", &self.name)
    }
}

impl PartialEq for FullyQualifiedGlobalConstantName {
    fn eq(&self, other: &Self) -> bool {
        self.namespace.eq_ignore_ascii_case(&other.namespace) && self.name == other.name
    }
}

impl Eq for FullyQualifiedGlobalConstantName {}

impl Hash for FullyQualifiedGlobalConstantName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_ignore_case(&self.namespace, state);
        self.name.hash(state);
    }
}

impl fmt::Display for FullyQualifiedGlobalConstantName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join(&self.namespace, &self.name))
    }
}

//! strix_diagnostics: Issue types and issue reporting infrastructure.
//!
//! Every diagnostic the analyzer can produce is an `IssueType` constant in
//! the [`issues`] table: a stable name, a category, a severity, a numeric
//! code and a message template with `{0}`, `{1}` placeholders. A realized
//! `Issue` adds the file, line and arguments.

use std::fmt;

/// Broad grouping of issue types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueCategory {
    Undefined,
    TypeError,
    AccessError,
    CompatError,
    CommentError,
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueCategory::Undefined => write!(f, "UndefError"),
            IssueCategory::TypeError => write!(f, "TypeError"),
            IssueCategory::AccessError => write!(f, "AccessError"),
            IssueCategory::CompatError => write!(f, "CompatError"),
            IssueCategory::CommentError => write!(f, "CommentError"),
        }
    }
}

/// How serious an issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Low = 0,
    Normal = 5,
    Critical = 10,
}

/// A message template with its stable name and classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueType {
    /// Stable identifier, e.g. `UndeclaredVariable`.
    pub name: &'static str,
    pub category: IssueCategory,
    pub severity: Severity,
    /// Numeric code, unique across the table.
    pub code: u32,
    /// The message template. May contain `{0}`, `{1}`, etc. placeholders.
    pub template: &'static str,
}

/// A realized issue with location and arguments.
#[derive(Debug, Clone)]
pub struct Issue {
    pub file: String,
    pub line: u32,
    pub issue_type: &'static IssueType,
    pub args: Vec<String>,
    /// Optional fix hint, such as a similarly named variable.
    pub suggestion: Option<String>,
}

impl Issue {
    pub fn new(
        issue_type: &'static IssueType,
        file: impl Into<String>,
        line: u32,
        args: Vec<String>,
    ) -> Self {
        Self {
            file: file.into(),
            line,
            issue_type,
            args,
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn name(&self) -> &'static str {
        self.issue_type.name
    }

    /// The template with arguments substituted, plus the suggestion if any.
    pub fn message(&self) -> String {
        let args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        let mut text = format_message(self.issue_type.template, &args);
        if let Some(ref suggestion) = self.suggestion {
            text.push_str(" (");
            text.push_str(suggestion);
            text.push(')');
        }
        text
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} {} {} {}",
            self.file,
            self.line,
            self.issue_type.category,
            self.issue_type.name,
            self.message()
        )
    }
}

/// Replace `{0}`, `{1}`, etc. in a template with arguments.
pub fn format_message(template: &str, args: &[&str]) -> String {
    let mut result = template.to_string();
    for (i, arg) in args.iter().enumerate() {
        result = result.replace(&format!("{{{}}}", i), arg);
    }
    result
}

/// Where "emit now" issues go.
pub trait IssueSink {
    fn emit(&mut self, issue: Issue);
}

/// A collection of issues accumulated during analysis.
#[derive(Debug, Clone, Default)]
pub struct IssueCollection {
    issues: Vec<Issue>,
}

impl IssueCollection {
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    pub fn add(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<Issue> {
        self.issues
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Number of issues of the given type.
    pub fn count_of(&self, issue_type: &IssueType) -> usize {
        self.issues
            .iter()
            .filter(|i| i.issue_type.code == issue_type.code)
            .count()
    }

    pub fn has(&self, issue_type: &IssueType) -> bool {
        self.count_of(issue_type) > 0
    }

    /// Issue names in emission order.
    pub fn names(&self) -> Vec<&'static str> {
        self.issues.iter().map(Issue::name).collect()
    }

    pub fn extend(&mut self, other: IssueCollection) {
        self.issues.extend(other.issues);
    }

    pub fn clear(&mut self) {
        self.issues.clear();
    }

    /// Sort issues by file, then line, then issue code.
    pub fn sort(&mut self) {
        self.issues.sort_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then(a.line.cmp(&b.line))
                .then(a.issue_type.code.cmp(&b.issue_type.code))
        });
    }
}

impl IssueSink for IssueCollection {
    fn emit(&mut self, issue: Issue) {
        self.add(issue);
    }
}

// ============================================================================
// Issue types
// ============================================================================

#[allow(non_upper_case_globals)]
pub mod issues {
    use super::*;

    macro_rules! issue {
        ($name:ident, $category:ident, $severity:ident, $code:expr, $template:expr) => {
            pub static $name: IssueType = IssueType {
                name: stringify!($name),
                category: IssueCategory::$category,
                severity: Severity::$severity,
                code: $code,
                template: $template,
            };
        };
    }

    // ========================================================================
    // Undefined (11000-11099)
    // ========================================================================
    issue!(UndeclaredVariable, Undefined, Normal, 11000, "Variable ${0} is undeclared");
    issue!(UndeclaredClassMethod, Undefined, Critical, 11001, "Call to method {0} from undeclared class {1}");
    issue!(UndeclaredStaticMethod, Undefined, Critical, 11002, "Static call to undeclared method {0}");
    issue!(UndeclaredMethod, Undefined, Critical, 11003, "Call to undeclared method {0}");
    issue!(UndeclaredFunction, Undefined, Critical, 11004, "Call to undeclared function {0}");
    issue!(UndeclaredProperty, Undefined, Normal, 11005, "Reference to undeclared property {0}");
    issue!(UndeclaredStaticProperty, Undefined, Critical, 11006, "Static property '{0}' on {1} is undeclared");
    issue!(UndeclaredConstant, Undefined, Critical, 11007, "Reference to undeclared constant {0}");
    issue!(UndeclaredClassConstant, Undefined, Critical, 11008, "Reference to undeclared class constant {0}");
    issue!(UndeclaredClassReference, Undefined, Critical, 11009, "Reference to undeclared class {0}");
    issue!(UndeclaredClassInstanceof, Undefined, Critical, 11010, "Checking instanceof against undeclared class {0}");
    issue!(UndeclaredTypeClassConstant, Undefined, Normal, 11011, "Class constant {0} has undeclared class type {1}");
    issue!(UndeclaredTypeProperty, Undefined, Normal, 11012, "Property {0} has undeclared type {1}");
    issue!(UndeclaredTypeThrowsType, Undefined, Normal, 11013, "@throws type of {0} has undeclared type {1}");
    issue!(NonClassMethodCall, Undefined, Critical, 11014, "Call to method {0} on non-class type {1}");
    issue!(ParentlessClass, Undefined, Critical, 11015, "Reference to parent of class {0} that does not extend anything");
    issue!(TraitParentReference, Undefined, Low, 11016, "Reference to parent from trait {0}");
    issue!(ContextNotObject, Undefined, Critical, 11017, "Cannot access {0} when not in object context");

    // ========================================================================
    // Types (10000-10099)
    // ========================================================================
    issue!(TypeMismatchDimFetch, TypeError, Normal, 10000, "When fetching an array index from a value of type {0}, found an array index of type {1}, but expected the index to be of type {2}");
    issue!(TypeMismatchDimFetchNullable, TypeError, Low, 10001, "When fetching an array index from a value of type {0}, found an array index of type {1}, but expected the index to be of the non-nullable type {2}");
    issue!(TypeArraySuspicious, TypeError, Normal, 10002, "Suspicious array access to {0}");
    issue!(TypeArraySuspiciousNullable, TypeError, Normal, 10003, "Suspicious array access to nullable {0}");
    issue!(TypeInvalidDimOffset, TypeError, Normal, 10004, "Invalid offset {0} of array type {1}");
    issue!(TypeMismatchUnpackValue, TypeError, Normal, 10005, "Attempting to unpack a value of type {0} which does not contain any subtypes of iterable (such as array or Traversable)");
    issue!(TypeMismatchUnpackKey, TypeError, Normal, 10006, "When unpacking a value of type {0}, the value's keys were of type {1}, but the keys should be consecutive integers");
    issue!(TypeInvalidInstanceof, TypeError, Normal, 10007, "Found an instanceof class name of type {0}, but class name must be a valid object or a string");
    issue!(TypeInvalidThrowsNonObject, TypeError, Normal, 10008, "@throws annotation of {0} has invalid non-object type {1}, expected a class");
    issue!(TypeInvalidThrowsNonThrowable, TypeError, Normal, 10009, "@throws annotation of {0} has suspicious class type {1}, which does not extend Error/Exception");
    issue!(TypeInvalidThrowsIsTrait, TypeError, Normal, 10010, "@throws annotation of {0} has invalid trait type {1}, expected a class");
    issue!(TypeInvalidThrowsIsInterface, TypeError, Low, 10011, "@throws annotation of {0} has suspicious interface type {1} for an @throws annotation, expected class (PHP allows interfaces to be caught, so this might be intentional)");
    issue!(TypeArrayOperator, TypeError, Normal, 10012, "Invalid array operand provided to operator '{0}' between types {1} and {2}");
    issue!(TypeComparisonFromArray, TypeError, Low, 10013, "array to {0} comparison");
    issue!(TypeComparisonToArray, TypeError, Low, 10014, "{0} to array comparison");
    issue!(TypeExpectedObjectPropAccess, TypeError, Critical, 10015, "Expected an object instance when accessing an instance property, but saw an expression with type {0}");
    issue!(TypeInvalidCloneNotObject, TypeError, Critical, 10016, "Expected an object to be passed to clone() but got {0}");
    issue!(TypeInstantiateAbstract, TypeError, Normal, 10017, "Instantiation of abstract class {0}");
    issue!(TypeInstantiateInterface, TypeError, Critical, 10018, "Instantiation of interface {0}");
    issue!(TypeInstantiateTrait, TypeError, Critical, 10019, "Instantiation of trait {0}");

    // ========================================================================
    // Access (1000-1099)
    // ========================================================================
    issue!(AccessPropertyPrivate, AccessError, Critical, 1000, "Cannot access private property {0} defined at {1}:{2}");
    issue!(AccessPropertyProtected, AccessError, Critical, 1001, "Cannot access protected property {0} defined at {1}:{2}");
    issue!(AccessMethodPrivate, AccessError, Critical, 1002, "Cannot access private method {0} defined at {1}:{2}");
    issue!(AccessMethodProtected, AccessError, Critical, 1003, "Cannot access protected method {0} defined at {1}:{2}");
    issue!(AccessSignatureMismatch, AccessError, Normal, 1004, "Access level to {0} must be compatible with {1} defined in {2}:{3}");
    issue!(AccessSignatureMismatchInternal, AccessError, Normal, 1005, "Access level to {0} must be compatible with internal {1}");
    issue!(StaticCallToNonStatic, AccessError, Critical, 1006, "Static call to non-static method {0} defined at {1}:{2}");

    // ========================================================================
    // Compatibility (3000-3099)
    // ========================================================================
    issue!(ParamSignatureMismatch, CompatError, Normal, 3000, "Declaration of {0} should be compatible with {1}{2}");
    issue!(ParamSignatureMismatchInternal, CompatError, Normal, 3001, "Declaration of {0} should be compatible with internal {1}{2}");

    // ========================================================================
    // Comments (16000-16099)
    // ========================================================================
    issue!(TemplateTypeConstant, CommentError, Normal, 16000, "constant {0} may not have a template type");
    issue!(CommentObjectInClassConstantType, CommentError, Normal, 16001, "Impossible phpdoc declaration that a class constant {0} has a type {1} containing objects. This type is ignored during analysis.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_message() {
        assert_eq!(
            format_message("Call to method {0} on non-class type {1}", &["foo", "int"]),
            "Call to method foo on non-class type int"
        );
    }

    #[test]
    fn test_issue_message_with_suggestion() {
        let issue = Issue::new(&issues::UndeclaredVariable, "a.php", 3, vec!["fo".to_string()])
            .with_suggestion("Did you mean $foo");
        assert_eq!(issue.message(), "Variable $fo is undeclared (Did you mean $foo)");
        assert_eq!(issue.to_string(), "a.php:3 UndefError UndeclaredVariable Variable $fo is undeclared (Did you mean $foo)");
    }

    #[test]
    fn test_collection_sort_and_counts() {
        let mut collection = IssueCollection::new();
        collection.emit(Issue::new(&issues::TypeArraySuspicious, "b.php", 1, vec!["int".into()]));
        collection.emit(Issue::new(&issues::UndeclaredMethod, "a.php", 9, vec!["\\A::f".into()]));
        collection.emit(Issue::new(&issues::UndeclaredMethod, "a.php", 2, vec!["\\A::g".into()]));
        collection.sort();
        assert_eq!(collection.issues()[0].line, 2);
        assert_eq!(collection.issues()[2].file, "b.php");
        assert_eq!(collection.count_of(&issues::UndeclaredMethod), 2);
        assert!(!collection.has(&issues::UndeclaredFunction));
    }

    #[test]
    fn test_codes_are_unique() {
        let all: &[&IssueType] = &[
            &issues::UndeclaredVariable, &issues::UndeclaredClassMethod, &issues::UndeclaredStaticMethod,
            &issues::UndeclaredMethod, &issues::UndeclaredFunction, &issues::UndeclaredProperty,
            &issues::UndeclaredStaticProperty, &issues::UndeclaredConstant, &issues::UndeclaredClassConstant,
            &issues::UndeclaredClassReference, &issues::UndeclaredClassInstanceof,
            &issues::UndeclaredTypeClassConstant, &issues::UndeclaredTypeProperty,
            &issues::UndeclaredTypeThrowsType, &issues::NonClassMethodCall, &issues::ParentlessClass,
            &issues::TraitParentReference, &issues::ContextNotObject, &issues::TypeMismatchDimFetch,
            &issues::TypeMismatchDimFetchNullable, &issues::TypeArraySuspicious,
            &issues::TypeArraySuspiciousNullable, &issues::TypeInvalidDimOffset,
            &issues::TypeMismatchUnpackValue, &issues::TypeMismatchUnpackKey, &issues::TypeInvalidInstanceof,
            &issues::TypeInvalidThrowsNonObject, &issues::TypeInvalidThrowsNonThrowable,
            &issues::TypeInvalidThrowsIsTrait, &issues::TypeInvalidThrowsIsInterface,
            &issues::TypeArrayOperator, &issues::TypeComparisonFromArray, &issues::TypeComparisonToArray,
            &issues::TypeExpectedObjectPropAccess, &issues::TypeInvalidCloneNotObject,
            &issues::TypeInstantiateAbstract, &issues::TypeInstantiateInterface,
            &issues::TypeInstantiateTrait, &issues::AccessPropertyPrivate, &issues::AccessPropertyProtected,
            &issues::AccessMethodPrivate, &issues::AccessMethodProtected, &issues::AccessSignatureMismatch,
            &issues::AccessSignatureMismatchInternal, &issues::StaticCallToNonStatic,
            &issues::ParamSignatureMismatch, &issues::ParamSignatureMismatchInternal,
            &issues::TemplateTypeConstant, &issues::CommentObjectInClassConstantType,
        ];
        let mut codes: Vec<u32> = all.iter().map(|t| t.code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }
}

//! Centralized limits shared by the type model and the evaluator.
//!
//! Every limit here converts a runaway recursion into either a loud
//! failure (type expansion) or a graceful give-up (expression evaluation).

// =============================================================================
// Type model
// =============================================================================

/// Maximum depth for expanding a class type through its ancestors.
///
/// Exceeding this is a defect: it means the inheritance graph is cyclic
/// or pathologically deep, so expansion panics instead of truncating.
pub const MAX_TYPE_EXPANSION_DEPTH: u32 = 20;

/// Maximum nesting of brackets while parsing a type string such as
/// `array<int,array{a:(?int)[]}>`.
pub const MAX_TYPE_PARSE_DEPTH: u32 = 64;

// =============================================================================
// Evaluator
// =============================================================================

/// Maximum depth for recursive expression evaluation.
///
/// Deeper expressions are reported as unanalyzable and evaluate to the
/// empty union type rather than overflowing the stack.
pub const MAX_EXPRESSION_DEPTH: u32 = 500;

/// Default cap on the length of a string literal that is kept as a
/// literal type; longer strings widen to `string`.
pub const DEFAULT_MAX_LITERAL_STRING_LENGTH: usize = 200;

//! Single concrete types.
//!
//! A `Type` is stored once in the [`TypeRegistry`](crate::TypeRegistry) and
//! referenced everywhere else by its `TypeId`. Two ids are equal exactly when
//! the types they name are structurally equal, because the registry interns
//! every type under its canonical string key.

use crate::fqsen::FullyQualifiedClassName;
use crate::union::UnionType;
use strix_core::{InternedString, OrderedMap};
use std::fmt;

/// Handle to an interned type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl TypeId {
    // Well-known native types, registered first and in this order by every registry.
    pub const INT: TypeId = TypeId(0);
    pub const FLOAT: TypeId = TypeId(1);
    pub const STRING: TypeId = TypeId(2);
    pub const BOOL: TypeId = TypeId(3);
    pub const FALSE: TypeId = TypeId(4);
    pub const TRUE: TypeId = TypeId(5);
    pub const ARRAY: TypeId = TypeId(6);
    pub const ITERABLE: TypeId = TypeId(7);
    pub const OBJECT: TypeId = TypeId(8);
    pub const CALLABLE: TypeId = TypeId(9);
    pub const RESOURCE: TypeId = TypeId(10);
    pub const VOID: TypeId = TypeId(11);
    pub const MIXED: TypeId = TypeId(12);
    pub const NULL: TypeId = TypeId(13);
    pub const SCALAR: TypeId = TypeId(14);
    pub const STATIC: TypeId = TypeId(15);
    pub const SELF: TypeId = TypeId(16);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// ============================================================================
// Native types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeKind {
    Int,
    Float,
    String,
    Bool,
    False,
    True,
    Array,
    Iterable,
    Object,
    Callable,
    Resource,
    Void,
    Mixed,
    Null,
    Scalar,
    Static,
    SelfType,
}

impl NativeKind {
    /// Registration order; index `i` is `TypeId(i)`.
    pub const ALL: [NativeKind; 17] = [
        NativeKind::Int,
        NativeKind::Float,
        NativeKind::String,
        NativeKind::Bool,
        NativeKind::False,
        NativeKind::True,
        NativeKind::Array,
        NativeKind::Iterable,
        NativeKind::Object,
        NativeKind::Callable,
        NativeKind::Resource,
        NativeKind::Void,
        NativeKind::Mixed,
        NativeKind::Null,
        NativeKind::Scalar,
        NativeKind::Static,
        NativeKind::SelfType,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NativeKind::Int => "int",
            NativeKind::Float => "float",
            NativeKind::String => "string",
            NativeKind::Bool => "bool",
            NativeKind::False => "false",
            NativeKind::True => "true",
            NativeKind::Array => "array",
            NativeKind::Iterable => "iterable",
            NativeKind::Object => "object",
            NativeKind::Callable => "callable",
            NativeKind::Resource => "resource",
            NativeKind::Void => "void",
            NativeKind::Mixed => "mixed",
            NativeKind::Null => "null",
            NativeKind::Scalar => "scalar",
            NativeKind::Static => "static",
            NativeKind::SelfType => "self",
        }
    }

    /// Look up a native type name, accepting the usual doc-comment aliases.
    pub fn from_name(name: &str) -> Option<NativeKind> {
        let kind = match name.to_ascii_lowercase().as_str() {
            "int" | "integer" => NativeKind::Int,
            "float" | "double" => NativeKind::Float,
            "string" => NativeKind::String,
            "bool" | "boolean" => NativeKind::Bool,
            "false" => NativeKind::False,
            "true" => NativeKind::True,
            "array" => NativeKind::Array,
            "iterable" => NativeKind::Iterable,
            "object" => NativeKind::Object,
            "callable" => NativeKind::Callable,
            "resource" => NativeKind::Resource,
            "void" => NativeKind::Void,
            "mixed" => NativeKind::Mixed,
            "null" => NativeKind::Null,
            "scalar" => NativeKind::Scalar,
            "static" | "$this" => NativeKind::Static,
            "self" => NativeKind::SelfType,
            _ => return None,
        };
        Some(kind)
    }

    /// `null`, `mixed` and `void` have no separate nullable twin.
    pub fn ignores_nullability(self) -> bool {
        matches!(self, NativeKind::Void | NativeKind::Mixed | NativeKind::Null)
    }

    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            NativeKind::Int
                | NativeKind::Float
                | NativeKind::String
                | NativeKind::Bool
                | NativeKind::False
                | NativeKind::True
                | NativeKind::Scalar
        )
    }

    pub fn id(self) -> TypeId {
        TypeId(self as u32)
    }
}

// ============================================================================
// Arrays
// ============================================================================

/// Key kind of a generic array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    Int,
    String,
    Mixed,
}

impl KeyKind {
    pub fn merge(self, other: KeyKind) -> KeyKind {
        if self == other {
            self
        } else {
            KeyKind::Mixed
        }
    }

    /// Key kind shared by a set of shape keys; `None` for an empty set.
    pub fn of_keys<'a>(keys: impl IntoIterator<Item = &'a ShapeKey>) -> Option<KeyKind> {
        keys.into_iter().map(ShapeKey::key_kind).reduce(KeyKind::merge)
    }
}

/// A literal array key. Decimal integer strings are stored as `Int`, the
/// way the runtime normalizes them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShapeKey {
    Int(i64),
    Str(String),
}

impl ShapeKey {
    pub fn from_string(s: &str) -> ShapeKey {
        match s.parse::<i64>() {
            Ok(n) if n.to_string() == s => ShapeKey::Int(n),
            _ => ShapeKey::Str(s.to_string()),
        }
    }

    pub fn key_kind(&self) -> KeyKind {
        match self {
            ShapeKey::Int(_) => KeyKind::Int,
            ShapeKey::Str(_) => KeyKind::String,
        }
    }

    fn is_bare(s: &str) -> bool {
        !s.is_empty()
            && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
            && s.parse::<i64>().is_err()
    }
}

impl fmt::Display for ShapeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeKey::Int(n) => write!(f, "{}", n),
            ShapeKey::Str(s) if ShapeKey::is_bare(s) => f.write_str(s),
            ShapeKey::Str(s) => f.write_str(&quote(s)),
        }
    }
}

/// Single-quote a string with `\\` and `\'` escapes.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\\' || c == '\'' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeField {
    pub union_type: UnionType,
    pub possibly_undefined: bool,
}

impl ShapeField {
    pub fn new(union_type: UnionType) -> Self {
        Self { union_type, possibly_undefined: false }
    }

    pub fn optional(union_type: UnionType) -> Self {
        Self { union_type, possibly_undefined: true }
    }
}

pub type ShapeFields = OrderedMap<ShapeKey, ShapeField>;

// ============================================================================
// Closures
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClosureParam {
    pub union_type: UnionType,
    pub by_ref: bool,
    pub variadic: bool,
    pub optional: bool,
}

impl ClosureParam {
    pub fn new(union_type: UnionType) -> Self {
        Self { union_type, ..Default::default() }
    }
}

/// A `Closure(...)` or `callable(...)` declaration type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosureSignature {
    pub is_closure: bool,
    pub params: Vec<ClosureParam>,
    pub return_type: UnionType,
}

// ============================================================================
// Type
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Native(NativeKind),
    Class {
        fqsen: FullyQualifiedClassName,
        template_args: Vec<UnionType>,
    },
    GenericArray {
        element: TypeId,
        key: KeyKind,
    },
    ArrayShape(ShapeFields),
    LiteralInt(i64),
    LiteralString(String),
    Closure(ClosureSignature),
    Template {
        name: String,
    },
}

impl TypeKind {
    pub fn accepts_nullability(&self) -> bool {
        !matches!(self, TypeKind::Native(k) if k.ignores_nullability())
    }
}

/// An interned type.
#[derive(Debug)]
pub struct Type {
    pub kind: TypeKind,
    pub nullable: bool,
    pub(crate) key: InternedString,
}

impl Type {
    pub fn native_kind(&self) -> Option<NativeKind> {
        match self.kind {
            TypeKind::Native(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn is_native(&self, kind: NativeKind) -> bool {
        self.native_kind() == Some(kind)
    }

    /// Native, array or literal: anything that does not name a class.
    pub fn is_native_type(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Native(_)
                | TypeKind::GenericArray { .. }
                | TypeKind::ArrayShape(_)
                | TypeKind::LiteralInt(_)
                | TypeKind::LiteralString(_)
        )
    }

    pub fn is_array_like(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Native(NativeKind::Array) | TypeKind::GenericArray { .. } | TypeKind::ArrayShape(_)
        )
    }

    pub fn is_iterable_like(&self) -> bool {
        self.is_array_like() || self.is_native(NativeKind::Iterable)
    }

    pub fn is_object_like(&self) -> bool {
        match &self.kind {
            TypeKind::Class { .. } => true,
            TypeKind::Closure(sig) => sig.is_closure,
            TypeKind::Native(kind) => matches!(kind, NativeKind::Object | NativeKind::Static | NativeKind::SelfType),
            _ => false,
        }
    }

    pub fn is_int_like(&self) -> bool {
        matches!(self.kind, TypeKind::Native(NativeKind::Int) | TypeKind::LiteralInt(_))
    }

    pub fn is_string_like(&self) -> bool {
        matches!(self.kind, TypeKind::Native(NativeKind::String) | TypeKind::LiteralString(_))
    }

    pub fn is_bool_like(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Native(NativeKind::Bool | NativeKind::True | NativeKind::False)
        )
    }

    pub fn is_scalar(&self) -> bool {
        match self.kind {
            TypeKind::Native(kind) => kind.is_scalar(),
            TypeKind::LiteralInt(_) | TypeKind::LiteralString(_) => true,
            _ => false,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, TypeKind::LiteralInt(_) | TypeKind::LiteralString(_))
    }

    pub fn is_template(&self) -> bool {
        matches!(self.kind, TypeKind::Template { .. })
    }

    pub fn is_static_like(&self) -> bool {
        matches!(self.kind, TypeKind::Native(NativeKind::Static | NativeKind::SelfType))
    }

    /// Class name this type refers to; closures refer to `\Closure`.
    pub fn class_fqsen(&self) -> Option<FullyQualifiedClassName> {
        match &self.kind {
            TypeKind::Class { fqsen, .. } => Some(fqsen.clone()),
            TypeKind::Closure(sig) if sig.is_closure => Some(FullyQualifiedClassName::new("\\", "Closure")),
            _ => None,
        }
    }

    pub fn is_class_named(&self, full_name: &str) -> bool {
        matches!(&self.kind, TypeKind::Class { fqsen, .. } if fqsen.is(full_name))
    }
}

/// A literal runtime scalar, as found in a syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Null,
}

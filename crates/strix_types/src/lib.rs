//! strix_types: the union-type value model.
//!
//! Types are interned in a `TypeRegistry` and referenced by `TypeId`;
//! a `UnionType` is a set of ids. Everything that needs to look inside a
//! type (rendering, casting, expansion, parsing, substitution) goes through
//! the registry.

pub mod cast;
pub mod expand;
pub mod fqsen;
pub mod parse;
pub mod registry;
pub mod shape;
pub mod template;
pub mod ty;
pub mod union;

pub use expand::TypeHierarchy;
pub use fqsen::{
    FullyQualifiedClassConstantName, FullyQualifiedClassName, FullyQualifiedFunctionName,
    FullyQualifiedGlobalConstantName, FullyQualifiedMethodName, FullyQualifiedPropertyName,
};
pub use parse::{FullyQualifiedNames, NameResolver, TypeParseError};
pub use registry::TypeRegistry;
pub use template::TemplateTypeMap;
pub use ty::{
    ClosureParam, ClosureSignature, KeyKind, NativeKind, Scalar, ShapeField, ShapeFields, ShapeKey, Type, TypeId,
    TypeKind,
};
pub use union::{key_kind_union, DisplayUnion, UnionType};

//! strix_codebase: The element store an analysis run reads from.
//!
//! Holds classes, methods, properties, constants and functions keyed by
//! fully-qualified name, loads classes on demand, copies inherited members
//! into subclasses, and can retract everything a file registered.

mod codebase;
mod element;
mod hydrate;
mod resolver;
mod undo;

pub use codebase::CodeBase;
pub use element::{
    ClassConstant, ClassDefinition, ClassKind, Clazz, DependentArgument, DependentReturnType, Func, GlobalConstant,
    Location, Method, Parameter, Property, Signature, Visibility,
};
pub use resolver::{ClassResolver, LazyClassLoader};
pub use undo::{UndoEntry, UndoLog};

//! The type registry.
//!
//! Types are stored in a registry (type arena) and referenced by `TypeId`.
//! Every type is interned under its canonical string key, so there is
//! exactly one id per structurally distinct type and equality is an id
//! comparison. The registry is owned by the entry point and shared by
//! reference; it is single-threaded (`!Sync`) and uses interior mutability
//! so lookups and constructions can interleave freely during evaluation.

use crate::expand::ExpansionCache;
use crate::fqsen::FullyQualifiedClassName;
use crate::ty::{
    quote, ClosureSignature, KeyKind, NativeKind, ShapeFields, Type, TypeId, TypeKind,
};
use crate::union::UnionType;
use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use strix_core::{InternedString, StringInterner};
use strix_options::AnalysisOptions;
use tracing::debug;

struct RegistryState {
    keys: StringInterner,
    types: Vec<Rc<Type>>,
    by_key: FxHashMap<InternedString, TypeId>,
}

impl RegistryState {
    fn new() -> Self {
        Self {
            keys: StringInterner::new(),
            types: Vec::with_capacity(256),
            by_key: FxHashMap::default(),
        }
    }
}

/// Interning registry for every type of an analysis run.
pub struct TypeRegistry {
    state: RefCell<RegistryState>,
    null_casts_as_any_type: Cell<bool>,
    pub(crate) expansion_cache: RefCell<ExpansionCache>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let registry = Self {
            state: RefCell::new(RegistryState::new()),
            null_casts_as_any_type: Cell::new(false),
            expansion_cache: RefCell::new(ExpansionCache::default()),
        };
        registry.register_natives();
        registry
    }

    pub fn with_options(options: &AnalysisOptions) -> Self {
        let registry = Self::new();
        registry.set_null_casts_as_any_type(options.null_casts_as_any_type);
        registry
    }

    fn register_natives(&self) {
        for kind in NativeKind::ALL {
            let id = self.intern(TypeKind::Native(kind), false);
            debug_assert_eq!(id, kind.id());
        }
        for kind in NativeKind::ALL {
            if !kind.ignores_nullability() {
                self.intern(TypeKind::Native(kind), true);
            }
        }
    }

    /// Drop every interned type and every cached expansion.
    ///
    /// Ids of native types survive a reset; any other id obtained before the
    /// reset is invalid afterwards.
    pub fn reset_all(&self) {
        let dropped = self.len();
        *self.state.borrow_mut() = RegistryState::new();
        self.expansion_cache.borrow_mut().clear();
        self.register_natives();
        debug!(dropped, "type registry reset");
    }

    /// Drop cached expansions only; used when class hierarchies change.
    pub fn clear_expansion_cache(&self) {
        self.expansion_cache.borrow_mut().clear();
    }

    pub fn null_casts_as_any_type(&self) -> bool {
        self.null_casts_as_any_type.get()
    }

    pub fn set_null_casts_as_any_type(&self, enabled: bool) {
        self.null_casts_as_any_type.set(enabled);
    }

    // ========================================================================
    // Interning
    // ========================================================================

    /// Return the canonical id for `kind` with the given nullability.
    ///
    /// Class names are matched ignoring ASCII case; the first spelling
    /// interned is the one displayed.
    pub fn intern(&self, kind: TypeKind, nullable: bool) -> TypeId {
        let nullable = nullable && kind.accepts_nullability();
        let rendered = self.render(&kind, nullable);
        let identity = self.identity_key(&kind, nullable);
        let mut state = self.state.borrow_mut();
        let identity = match identity {
            Some(folded) => state.keys.intern(&folded),
            None => state.keys.intern(&rendered),
        };
        if let Some(&id) = state.by_key.get(&identity) {
            return id;
        }
        let key = state.keys.intern(&rendered);
        let id = TypeId(state.types.len() as u32);
        state.types.push(Rc::new(Type { kind, nullable, key }));
        state.by_key.insert(identity, id);
        state.by_key.insert(key, id);
        id
    }

    /// Case-folded key for class types, whose names compare ignoring case.
    fn identity_key(&self, kind: &TypeKind, nullable: bool) -> Option<String> {
        let TypeKind::Class { fqsen, template_args } = kind else {
            return None;
        };
        let folded = self.render_class(&fqsen.to_string().to_ascii_lowercase(), template_args);
        Some(if nullable { format!("?{}", folded) } else { folded })
    }

    /// Get a type by its id.
    ///
    /// Panics on an id that this registry never produced (for example one
    /// held across `reset_all`).
    pub fn get(&self, id: TypeId) -> Rc<Type> {
        match self.state.borrow().types.get(id.index()) {
            Some(ty) => Rc::clone(ty),
            None => panic!("TypeId({}) is not registered (stale across reset_all?)", id.0),
        }
    }

    /// Id of an already-interned canonical key.
    pub fn lookup(&self, key: &str) -> Option<TypeId> {
        let state = self.state.borrow();
        let interned = state.keys.get(key)?;
        state.by_key.get(&interned).copied()
    }

    /// Canonical string form.
    pub fn type_key(&self, id: TypeId) -> String {
        let state = self.state.borrow();
        let key = state.types[id.index()].key;
        state.keys.resolve(key).to_string()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().types.is_empty()
    }

    // ========================================================================
    // Canonical rendering
    // ========================================================================

    fn render(&self, kind: &TypeKind, nullable: bool) -> String {
        let body = match kind {
            TypeKind::Native(native) => native.name().to_string(),
            TypeKind::Class { fqsen, template_args } => self.render_class(&fqsen.to_string(), template_args),
            TypeKind::GenericArray { element, key } => {
                let element_key = self.type_key(*element);
                match key {
                    KeyKind::Int => format!("array<int,{}>", element_key),
                    KeyKind::String => format!("array<string,{}>", element_key),
                    KeyKind::Mixed if self.needs_parens_as_element(*element) => {
                        format!("({})[]", element_key)
                    }
                    KeyKind::Mixed => format!("{}[]", element_key),
                }
            }
            TypeKind::ArrayShape(fields) => {
                let rendered: Vec<String> = fields
                    .iter()
                    .map(|(key, field)| {
                        format!(
                            "{}{}:{}",
                            key,
                            if field.possibly_undefined { "?" } else { "" },
                            field.union_type.display(self)
                        )
                    })
                    .collect();
                format!("array{{{}}}", rendered.join(","))
            }
            TypeKind::LiteralInt(value) => value.to_string(),
            TypeKind::LiteralString(value) => quote(value),
            TypeKind::Closure(sig) => self.render_closure(sig),
            TypeKind::Template { name } => name.clone(),
        };
        if nullable {
            format!("?{}", body)
        } else {
            body
        }
    }

    fn render_class(&self, name: &str, template_args: &[UnionType]) -> String {
        if template_args.is_empty() {
            return name.to_string();
        }
        let args: Vec<String> = template_args.iter().map(|u| u.display(self).to_string()).collect();
        format!("{}<{}>", name, args.join(","))
    }

    fn needs_parens_as_element(&self, element: TypeId) -> bool {
        let ty = self.get(element);
        ty.nullable || matches!(ty.kind, TypeKind::Closure(_))
    }

    fn render_closure(&self, sig: &ClosureSignature) -> String {
        let params: Vec<String> = sig
            .params
            .iter()
            .map(|param| {
                let mut out = String::new();
                if param.by_ref {
                    out.push('&');
                }
                if param.union_type.is_empty() {
                    out.push_str("mixed");
                } else {
                    out.push_str(&param.union_type.display(self).to_string());
                }
                if param.variadic {
                    out.push_str("...");
                }
                if param.optional {
                    out.push('=');
                }
                out
            })
            .collect();
        let name = if sig.is_closure { "Closure" } else { "callable" };
        let ret = match sig.return_type.len() {
            0 => String::new(),
            1 => format!(":{}", sig.return_type.display(self)),
            _ => format!(":({})", sig.return_type.display(self)),
        };
        format!("{}({}){}", name, params.join(","), ret)
    }

    // ========================================================================
    // Factories
    // ========================================================================

    pub fn native(&self, kind: NativeKind, nullable: bool) -> TypeId {
        if nullable {
            self.intern(TypeKind::Native(kind), true)
        } else {
            kind.id()
        }
    }

    /// Canonical class type `namespace\name<template_args>`.
    ///
    /// Panics when the namespace is empty or not `\`-rooted, when the name is
    /// empty, or when either contains the union separator.
    pub fn make(&self, namespace: &str, name: &str, template_args: Vec<UnionType>, nullable: bool) -> TypeId {
        assert!(!namespace.is_empty(), "type namespace must not be empty");
        assert!(namespace.starts_with('\\'), "type namespace {:?} must start with '\\'", namespace);
        assert!(!name.is_empty(), "type name must not be empty");
        assert!(
            !name.contains('|') && !namespace.contains('|'),
            "type name {:?} must not contain '|'",
            name
        );
        self.intern(
            TypeKind::Class {
                fqsen: FullyQualifiedClassName::new(namespace, name),
                template_args,
            },
            nullable,
        )
    }

    pub fn class_type(&self, fqsen: &FullyQualifiedClassName) -> TypeId {
        self.make(fqsen.namespace(), fqsen.name(), Vec::new(), false)
    }

    pub fn class_type_with_args(&self, fqsen: &FullyQualifiedClassName, template_args: Vec<UnionType>) -> TypeId {
        self.make(fqsen.namespace(), fqsen.name(), template_args, false)
    }

    pub fn generic_array(&self, element: TypeId, key: KeyKind, nullable: bool) -> TypeId {
        self.intern(TypeKind::GenericArray { element, key }, nullable)
    }

    pub fn array_shape(&self, fields: ShapeFields, nullable: bool) -> TypeId {
        self.intern(TypeKind::ArrayShape(fields), nullable)
    }

    pub fn literal_int(&self, value: i64, nullable: bool) -> TypeId {
        self.intern(TypeKind::LiteralInt(value), nullable)
    }

    pub fn literal_string(&self, value: &str, nullable: bool) -> TypeId {
        self.intern(TypeKind::LiteralString(value.to_string()), nullable)
    }

    pub fn closure(&self, sig: ClosureSignature, nullable: bool) -> TypeId {
        self.intern(TypeKind::Closure(sig), nullable)
    }

    /// Template placeholder `T`.
    pub fn template(&self, name: &str) -> TypeId {
        assert!(!name.is_empty(), "template name must not be empty");
        assert!(!name.contains('|'), "template name {:?} must not contain '|'", name);
        self.intern(TypeKind::Template { name: name.to_string() }, false)
    }

    /// The nullable or non-nullable twin of `id`; `id` itself when unchanged.
    pub fn with_is_nullable(&self, id: TypeId, nullable: bool) -> TypeId {
        let ty = self.get(id);
        if ty.nullable == nullable || !ty.kind.accepts_nullability() {
            return id;
        }
        self.intern(ty.kind.clone(), nullable)
    }

    // ========================================================================
    // Single-type queries
    // ========================================================================

    /// Nullable flag set, or the `null` type itself.
    pub fn is_nullable(&self, id: TypeId) -> bool {
        let ty = self.get(id);
        ty.nullable || ty.is_native(NativeKind::Null)
    }

    pub fn class_fqsen(&self, id: TypeId) -> Option<FullyQualifiedClassName> {
        self.get(id).class_fqsen()
    }

    /// `int` for `1`, `string` for `'x'`, with nullability preserved.
    pub fn literal_as_native(&self, id: TypeId) -> TypeId {
        let ty = self.get(id);
        match ty.kind {
            TypeKind::LiteralInt(_) => self.native(NativeKind::Int, ty.nullable),
            TypeKind::LiteralString(_) => self.native(NativeKind::String, ty.nullable),
            _ => id,
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.len())
            .field("null_casts_as_any_type", &self.null_casts_as_any_type())
            .finish()
    }
}

//! Parsing type strings such as `?int[]|\Foo\Bar<string>|array{a:int}`.
//!
//! The grammar accepts every canonical rendering the registry produces,
//! plus the relative class names, aliases and template names a
//! [`NameResolver`] can resolve.

use crate::fqsen::FullyQualifiedClassName;
use crate::registry::TypeRegistry;
use crate::ty::{ClosureParam, ClosureSignature, KeyKind, NativeKind, ShapeField, ShapeFields, ShapeKey, TypeId};
use crate::union::UnionType;
use strix_core::limits::MAX_TYPE_PARSE_DEPTH;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeParseError {
    #[error("unexpected end of type string {input:?}")]
    UnexpectedEnd { input: String },
    #[error("unexpected {found:?} at offset {offset} in type string {input:?}")]
    UnexpectedChar { input: String, offset: usize, found: char },
    #[error("invalid name {name:?} in type string {input:?}")]
    InvalidName { input: String, name: String },
    #[error("invalid literal {literal:?} in type string {input:?}")]
    InvalidLiteral { input: String, literal: String },
    #[error("type string {input:?} nests deeper than {limit} levels")]
    TooDeep { input: String, limit: u32 },
    #[error("type string {input:?} is not a single type")]
    NotSingleType { input: String },
}

/// Resolves names that are not fully qualified.
pub trait NameResolver {
    /// Resolve a relative or aliased class name.
    fn resolve_class_name(&self, name: &str) -> FullyQualifiedClassName;

    fn is_template_name(&self, _name: &str) -> bool {
        false
    }

    /// The class `self` refers to, if any.
    fn self_class(&self) -> Option<FullyQualifiedClassName> {
        None
    }
}

/// Resolves every class name against the root namespace.
pub struct FullyQualifiedNames;

impl NameResolver for FullyQualifiedNames {
    fn resolve_class_name(&self, name: &str) -> FullyQualifiedClassName {
        FullyQualifiedClassName::from_full_name(name)
    }
}

impl UnionType {
    pub fn from_fully_qualified_string(registry: &TypeRegistry, input: &str) -> Result<UnionType, TypeParseError> {
        Self::from_string_in_context(registry, input, &FullyQualifiedNames)
    }

    /// Parse a `|`-delimited type string, resolving names through `resolver`.
    /// The empty string parses to the empty union.
    pub fn from_string_in_context(
        registry: &TypeRegistry,
        input: &str,
        resolver: &dyn NameResolver,
    ) -> Result<UnionType, TypeParseError> {
        if input.trim().is_empty() {
            return Ok(UnionType::empty());
        }
        let mut parser = Parser::new(registry, resolver, input);
        let union = parser.parse_union()?;
        parser.skip_ws();
        match parser.peek_char() {
            None => Ok(union),
            Some(found) => Err(parser.unexpected(found)),
        }
    }
}

impl TypeRegistry {
    /// Parse a string naming exactly one type.
    pub fn type_from_fully_qualified_string(&self, input: &str) -> Result<TypeId, TypeParseError> {
        UnionType::from_fully_qualified_string(self, input)?
            .single()
            .ok_or_else(|| TypeParseError::NotSingleType { input: input.to_string() })
    }
}

struct Parser<'s> {
    registry: &'s TypeRegistry,
    resolver: &'s dyn NameResolver,
    input: &'s str,
    pos: usize,
    depth: u32,
}

impl<'s> Parser<'s> {
    fn new(registry: &'s TypeRegistry, resolver: &'s dyn NameResolver, input: &'s str) -> Self {
        Self { registry, resolver, input, pos: 0, depth: 0 }
    }

    // ========================================================================
    // Cursor helpers
    // ========================================================================

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, byte: u8) -> bool {
        self.skip_ws();
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, s: &str) -> bool {
        self.skip_ws();
        if self.input[self.pos..].starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), TypeParseError> {
        if self.eat(byte) {
            return Ok(());
        }
        match self.peek_char() {
            Some(found) => Err(self.unexpected(found)),
            None => Err(self.end()),
        }
    }

    fn unexpected(&self, found: char) -> TypeParseError {
        TypeParseError::UnexpectedChar {
            input: self.input.to_string(),
            offset: self.pos,
            found,
        }
    }

    fn end(&self) -> TypeParseError {
        TypeParseError::UnexpectedEnd { input: self.input.to_string() }
    }

    fn enter(&mut self) -> Result<(), TypeParseError> {
        self.depth += 1;
        if self.depth > MAX_TYPE_PARSE_DEPTH {
            return Err(TypeParseError::TooDeep {
                input: self.input.to_string(),
                limit: MAX_TYPE_PARSE_DEPTH,
            });
        }
        Ok(())
    }

    // ========================================================================
    // Grammar
    // ========================================================================

    /// union := member ('|' member)*
    fn parse_union(&mut self) -> Result<UnionType, TypeParseError> {
        self.enter()?;
        let mut union = self.parse_member()?;
        while self.eat(b'|') {
            union.add_union_type(&self.parse_member()?);
        }
        self.depth -= 1;
        Ok(union)
    }

    /// member := '?'? atom '[]'*
    fn parse_member(&mut self) -> Result<UnionType, TypeParseError> {
        let nullable = self.eat(b'?');
        let mut union = self.parse_atom()?;
        while self.eat_str("[]") {
            union = union.map_types(|id| self.registry.generic_array(id, KeyKind::Mixed, false));
        }
        if nullable {
            union = union.nullable_clone(self.registry);
        }
        Ok(union)
    }

    fn parse_atom(&mut self) -> Result<UnionType, TypeParseError> {
        self.skip_ws();
        match self.peek() {
            None => Err(self.end()),
            Some(b'(') => {
                self.pos += 1;
                let union = self.parse_union()?;
                self.expect(b')')?;
                Ok(union)
            }
            Some(b'\'') => {
                let value = self.parse_quoted()?;
                Ok(UnionType::of(self.registry.literal_string(&value, false)))
            }
            Some(b'-' | b'0'..=b'9') => {
                let literal = self.take_while(|b| b == b'-' || b.is_ascii_digit());
                let value = literal.parse::<i64>().map_err(|_| TypeParseError::InvalidLiteral {
                    input: self.input.to_string(),
                    literal: literal.to_string(),
                })?;
                Ok(UnionType::of(self.registry.literal_int(value, false)))
            }
            Some(b) if b.is_ascii_alphabetic() || b == b'_' || b == b'\\' || b == b'$' || b >= 0x80 => {
                self.parse_named()
            }
            Some(_) => {
                let found = self.peek_char().unwrap_or('\0');
                Err(self.unexpected(found))
            }
        }
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'s str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    /// A single-quoted string with `\\` and `\'` escapes.
    fn parse_quoted(&mut self) -> Result<String, TypeParseError> {
        self.pos += 1;
        let mut out = String::new();
        let mut chars = self.input[self.pos..].char_indices();
        while let Some((offset, c)) = chars.next() {
            match c {
                '\'' => {
                    self.pos += offset + 1;
                    return Ok(out);
                }
                '\\' => match chars.next() {
                    Some((_, escaped @ ('\\' | '\''))) => out.push(escaped),
                    Some((_, other)) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => break,
                },
                other => out.push(other),
            }
        }
        Err(self.end())
    }

    fn parse_named(&mut self) -> Result<UnionType, TypeParseError> {
        let start = self.pos;
        if self.peek() == Some(b'$') {
            self.pos += 1;
        }
        self.take_while(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'\\' || b >= 0x80);
        let name = &self.input[start..self.pos];
        let lower = name.to_ascii_lowercase();
        let next = self.peek();

        match (lower.as_str(), next) {
            ("array", Some(b'{')) => return self.parse_shape(),
            ("array", Some(b'<')) => return self.parse_generic_array(),
            ("closure" | "\\closure", Some(b'(')) => return self.parse_closure(true),
            ("callable", Some(b'(')) => return self.parse_closure(false),
            _ => {}
        }

        if !name.starts_with('\\') {
            if let Some(kind) = NativeKind::from_name(name) {
                if kind == NativeKind::SelfType {
                    if let Some(class) = self.resolver.self_class() {
                        return Ok(UnionType::of(self.registry.class_type(&class)));
                    }
                }
                return Ok(UnionType::of(kind.id()));
            }
            if self.resolver.is_template_name(name) {
                return Ok(UnionType::of(self.registry.template(name)));
            }
        }

        let bare = name.trim_start_matches('\\');
        if bare.is_empty() || bare.ends_with('\\') || bare.contains("\\\\") || bare.contains('$') {
            return Err(TypeParseError::InvalidName {
                input: self.input.to_string(),
                name: name.to_string(),
            });
        }
        let fqsen = if name.starts_with('\\') {
            FullyQualifiedClassName::from_full_name(name)
        } else {
            self.resolver.resolve_class_name(name)
        };
        let template_args = if self.eat(b'<') { self.parse_type_list(b'>')? } else { Vec::new() };
        Ok(UnionType::of(self.registry.make(
            fqsen.namespace(),
            fqsen.name(),
            template_args,
            false,
        )))
    }

    /// union (',' union)* close
    fn parse_type_list(&mut self, close: u8) -> Result<Vec<UnionType>, TypeParseError> {
        let mut list = vec![self.parse_union()?];
        while self.eat(b',') {
            list.push(self.parse_union()?);
        }
        self.expect(close)?;
        Ok(list)
    }

    /// `array<V>` or `array<K,V>`, positioned on `<`.
    fn parse_generic_array(&mut self) -> Result<UnionType, TypeParseError> {
        self.pos += 1;
        let mut list = self.parse_type_list(b'>')?;
        let value = list.pop().unwrap_or_default();
        let key = match list.first() {
            Some(key) if key.is_type(TypeId::INT) => KeyKind::Int,
            Some(key) if key.is_type(TypeId::STRING) => KeyKind::String,
            _ => KeyKind::Mixed,
        };
        Ok(value.map_types(|id| self.registry.generic_array(id, key, false)))
    }

    /// `array{key?:union,...}`, positioned on `{`.
    fn parse_shape(&mut self) -> Result<UnionType, TypeParseError> {
        self.enter()?;
        self.pos += 1;
        let mut fields = ShapeFields::new();
        if !self.eat(b'}') {
            loop {
                self.skip_ws();
                let key = match self.peek() {
                    Some(b'\'') => ShapeKey::from_string(&self.parse_quoted()?),
                    Some(_) => {
                        let raw = self.take_while(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
                        if raw.is_empty() {
                            let found = self.peek_char().unwrap_or('\0');
                            return Err(self.unexpected(found));
                        }
                        ShapeKey::from_string(raw)
                    }
                    None => return Err(self.end()),
                };
                let possibly_undefined = self.eat(b'?');
                self.expect(b':')?;
                let union_type = self.parse_union()?;
                fields.insert(key, ShapeField { union_type, possibly_undefined });
                if self.eat(b'}') {
                    break;
                }
                self.expect(b',')?;
            }
        }
        self.depth -= 1;
        Ok(UnionType::of(self.registry.array_shape(fields, false)))
    }

    /// `Closure(params):return` or `callable(params):return`, positioned on `(`.
    fn parse_closure(&mut self, is_closure: bool) -> Result<UnionType, TypeParseError> {
        self.enter()?;
        self.pos += 1;
        let mut params = Vec::new();
        if !self.eat(b')') {
            loop {
                let by_ref = self.eat(b'&');
                let union_type = self.parse_union()?;
                let variadic = self.eat_str("...");
                self.skip_ws();
                if self.peek() == Some(b'$') {
                    self.pos += 1;
                    self.take_while(|b| b.is_ascii_alphanumeric() || b == b'_');
                }
                let optional = self.eat(b'=');
                params.push(ClosureParam { union_type, by_ref, variadic, optional });
                if self.eat(b')') {
                    break;
                }
                self.expect(b',')?;
            }
        }
        let return_type = if self.eat(b':') { self.parse_member()? } else { UnionType::empty() };
        self.depth -= 1;
        let sig = ClosureSignature { is_closure, params, return_type };
        Ok(UnionType::of(self.registry.closure(sig, false)))
    }
}

//! Node flags and the typed decoders for them.
//!
//! A node's `flags` field is a raw u32. Operator nodes store an operator
//! code in it; declarations store a modifier bitset. The decoders below
//! give both a typed view.

use std::fmt;

/// Node ID assigned at tree construction, used as the side-table key for
/// per-node caches.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const INVALID: NodeId = NodeId(u32::MAX);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

bitflags::bitflags! {
    /// Modifiers on classes, methods, properties, constants and closures.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModifierFlags: u32 {
        const NONE      = 0;
        const PUBLIC    = 1 << 0;
        const PROTECTED = 1 << 1;
        const PRIVATE   = 1 << 2;
        const STATIC    = 1 << 3;
        const ABSTRACT  = 1 << 4;
        const FINAL     = 1 << 5;
        const READONLY  = 1 << 6;

        const VISIBILITY = Self::PUBLIC.bits() | Self::PROTECTED.bits() | Self::PRIVATE.bits();
    }
}

bitflags::bitflags! {
    /// Flags on `Param` nodes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ParamFlags: u32 {
        const NONE     = 0;
        const BY_REF   = 1 << 0;
        const VARIADIC = 1 << 1;
    }
}

bitflags::bitflags! {
    /// Flags on `ArrayElem` and `ClosureVar` nodes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ArrayElemFlags: u32 {
        const NONE   = 0;
        const BY_REF = 1 << 0;
    }
}

macro_rules! flag_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $value:expr => $text:expr),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u32)]
        pub enum $name {
            $($variant = $value),+
        }

        impl $name {
            /// Decode from a node's raw flags.
            pub fn from_flags(flags: u32) -> Option<Self> {
                match flags {
                    $($value => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// Source-level spelling, used in diagnostics.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

flag_enum! {
    /// Operator of a `BinaryOp` or `AssignOp` node.
    BinaryOp {
        BitwiseOr = 1 => "|",
        BitwiseAnd = 2 => "&",
        BitwiseXor = 3 => "^",
        Concat = 4 => ".",
        Add = 5 => "+",
        Sub = 6 => "-",
        Mul = 7 => "*",
        Div = 8 => "/",
        Mod = 9 => "%",
        Pow = 10 => "**",
        ShiftLeft = 11 => "<<",
        ShiftRight = 12 => ">>",
        BoolXor = 13 => "xor",
        BoolAnd = 14 => "&&",
        BoolOr = 15 => "||",
        IsIdentical = 16 => "===",
        IsNotIdentical = 17 => "!==",
        IsEqual = 18 => "==",
        IsNotEqual = 19 => "!=",
        IsSmaller = 20 => "<",
        IsSmallerOrEqual = 21 => "<=",
        IsGreater = 22 => ">",
        IsGreaterOrEqual = 23 => ">=",
        Spaceship = 24 => "<=>",
        Coalesce = 25 => "??",
    }
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::IsIdentical
                | BinaryOp::IsNotIdentical
                | BinaryOp::IsEqual
                | BinaryOp::IsNotEqual
                | BinaryOp::IsSmaller
                | BinaryOp::IsSmallerOrEqual
                | BinaryOp::IsGreater
                | BinaryOp::IsGreaterOrEqual
        )
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod | BinaryOp::Pow
        )
    }
}

flag_enum! {
    /// Operator of a `UnaryOp` node.
    UnaryOp {
        BoolNot = 1 => "!",
        BitwiseNot = 2 => "~",
        Minus = 3 => "-",
        Plus = 4 => "+",
        Silence = 5 => "@",
    }
}

flag_enum! {
    /// Target of a `Cast` node.
    CastKind {
        Null = 1 => "unset",
        Bool = 2 => "bool",
        Int = 3 => "int",
        Float = 4 => "float",
        String = 5 => "string",
        Array = 6 => "array",
        Object = 7 => "object",
    }
}

flag_enum! {
    /// Which magic constant a `MagicConst` node names.
    MagicConstKind {
        Line = 1 => "__LINE__",
        File = 2 => "__FILE__",
        Dir = 3 => "__DIR__",
        Namespace = 4 => "__NAMESPACE__",
        Function = 5 => "__FUNCTION__",
        Method = 6 => "__METHOD__",
        Class = 7 => "__CLASS__",
        Trait = 8 => "__TRAIT__",
    }
}

flag_enum! {
    /// How a `Name` node was written.
    NameKind {
        FullyQualified = 0 => "fully-qualified",
        NotFullyQualified = 1 => "not-fully-qualified",
        Relative = 2 => "relative",
    }
}

flag_enum! {
    /// Built-in type keyword of a `Type` node.
    TypeHint {
        Array = 1 => "array",
        Callable = 2 => "callable",
        Void = 3 => "void",
        Bool = 4 => "bool",
        Int = 5 => "int",
        Float = 6 => "float",
        String = 7 => "string",
        Iterable = 8 => "iterable",
        Object = 9 => "object",
        Null = 10 => "null",
        False = 11 => "false",
        True = 12 => "true",
        Static = 13 => "static",
        Mixed = 14 => "mixed",
    }
}

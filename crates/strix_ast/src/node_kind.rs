//! NodeKind enum - every node kind the analysis layers understand.
//!
//! The numbering is part of the node contract: a parser front end hands the
//! analyzer an integer `kind`, and `NodeKind::from_u16` maps it back.

/// The kind of a syntax node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum NodeKind {
    // ========================================================================
    // Names and references
    // ========================================================================
    Variable = 0,
    Name = 1,
    Const = 2,
    ClassConst = 3,
    ClassName = 4,
    MagicConst = 5,

    // ========================================================================
    // Operators
    // ========================================================================
    BinaryOp = 10,
    UnaryOp = 11,
    PreInc = 12,
    PreDec = 13,
    PostInc = 14,
    PostDec = 15,
    Assign = 16,
    AssignRef = 17,
    AssignOp = 18,
    Cast = 19,
    Instanceof = 20,
    Conditional = 21,

    // ========================================================================
    // Arrays
    // ========================================================================
    Array = 30,
    ArrayElem = 31,
    Unpack = 32,
    Dim = 33,

    // ========================================================================
    // Members and calls
    // ========================================================================
    Prop = 40,
    NullsafeProp = 41,
    StaticProp = 42,
    Call = 43,
    MethodCall = 44,
    NullsafeMethodCall = 45,
    StaticCall = 46,
    New = 47,
    ArgList = 48,

    // ========================================================================
    // Functions
    // ========================================================================
    Closure = 50,
    ArrowFunc = 51,
    ParamList = 52,
    Param = 53,
    ClosureUses = 54,
    ClosureVar = 55,
    Return = 56,
    StmtList = 57,
    Class = 58,

    // ========================================================================
    // Type declarations
    // ========================================================================
    Type = 60,
    NullableType = 61,
    TypeUnion = 62,

    // ========================================================================
    // Miscellaneous expressions
    // ========================================================================
    Isset = 70,
    Empty = 71,
    Clone = 72,
    Yield = 73,
    YieldFrom = 74,
    Print = 75,
    Encaps = 76,
    ShellExec = 77,
    Include = 78,
    Match = 79,
    MatchArmList = 80,
    MatchArm = 81,
    ExprList = 82,
    Throw = 83,
    Exit = 84,
}

impl NodeKind {
    /// Map a raw integer kind from a front end back to a `NodeKind`.
    pub fn from_u16(raw: u16) -> Option<NodeKind> {
        use NodeKind::*;
        const ALL: &[NodeKind] = &[
            Variable, Name, Const, ClassConst, ClassName, MagicConst,
            BinaryOp, UnaryOp, PreInc, PreDec, PostInc, PostDec, Assign, AssignRef, AssignOp,
            Cast, Instanceof, Conditional,
            Array, ArrayElem, Unpack, Dim,
            Prop, NullsafeProp, StaticProp, Call, MethodCall, NullsafeMethodCall, StaticCall,
            New, ArgList,
            Closure, ArrowFunc, ParamList, Param, ClosureUses, ClosureVar, Return, StmtList, Class,
            Type, NullableType, TypeUnion,
            Isset, Empty, Clone, Yield, YieldFrom, Print, Encaps, ShellExec, Include, Match,
            MatchArmList, MatchArm, ExprList, Throw, Exit,
        ];
        ALL.iter().copied().find(|k| *k as u16 == raw)
    }

    /// Nodes whose children are positional lists rather than named slots.
    pub fn is_list(self) -> bool {
        matches!(
            self,
            NodeKind::Array
                | NodeKind::ArgList
                | NodeKind::ParamList
                | NodeKind::ClosureUses
                | NodeKind::StmtList
                | NodeKind::TypeUnion
                | NodeKind::Encaps
                | NodeKind::MatchArmList
                | NodeKind::ExprList
        )
    }

    pub fn is_call(self) -> bool {
        matches!(
            self,
            NodeKind::Call | NodeKind::MethodCall | NodeKind::NullsafeMethodCall | NodeKind::StaticCall
        )
    }
}

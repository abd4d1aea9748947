///
/// Constraint AST
///
/// Everything representable here is allowed: the parser refuses any symbol,
/// built-in or member outside the tables below, so evaluation never has to
/// look anything up by name except field paths.
///

///
/// Expr
///

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Literal),
    List(Vec<Self>),
    /// The acting record set.
    Records,
    Call {
        func: Builtin,
        args: Vec<Self>,
    },
    Member {
        target: Box<Self>,
        member: Member,
    },
    Not(Box<Self>),
    And(Box<Self>, Box<Self>),
    Or(Box<Self>, Box<Self>),
    Compare {
        op: CompareOp,
        left: Box<Self>,
        right: Box<Self>,
    },
}

///
/// Literal
///

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

///
/// Builtin
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Builtin {
    Bool,
    Len,
    Any,
    All,
}

impl Builtin {
    /// Allowed-symbol table for function calls.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "bool" => Some(Self::Bool),
            "len" => Some(Self::Len),
            "any" => Some(Self::Any),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Len => "len",
            Self::Any => "any",
            Self::All => "all",
        }
    }
}

///
/// Member
///
/// Record-set members. `mapped`/`filtered` take a literal dotted path.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Member {
    Field(String),
    Ids,
    Mapped(String),
    Filtered(String),
}

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    NotIn,
}

impl CompareOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::In => "in",
            Self::NotIn => "not in",
        }
    }
}

//! Expression tree.

use std::fmt;

/// Constant value in an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `+x`
    Plus,
    /// `not x`
    Not,
    /// `~x`
    Invert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

/// Whitelisted functions callable from expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// `where(condition, if_true, if_false)`
    Where,
    Abs,
    Sqrt,
    /// Elementwise smaller of two values.
    Minimum,
    /// Elementwise larger of two values.
    Maximum,
    IsNull,
    /// Missing or NaN.
    IsNan,
    NotNull,
}

impl Function {
    /// Resolve a call name, with or without the `np.` prefix already removed.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "where" => Some(Self::Where),
            "abs" | "absolute" => Some(Self::Abs),
            "sqrt" => Some(Self::Sqrt),
            "minimum" => Some(Self::Minimum),
            "maximum" => Some(Self::Maximum),
            "isnull" | "isna" => Some(Self::IsNull),
            "isnan" => Some(Self::IsNan),
            "notnull" | "notna" => Some(Self::NotNull),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Where => "where",
            Self::Abs => "abs",
            Self::Sqrt => "sqrt",
            Self::Minimum => "minimum",
            Self::Maximum => "maximum",
            Self::IsNull => "isnull",
            Self::IsNan => "isnan",
            Self::NotNull => "notnull",
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Self::Where => 3,
            Self::Minimum | Self::Maximum => 2,
            Self::Abs | Self::Sqrt | Self::IsNull | Self::IsNan | Self::NotNull => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Literal(Literal),
    /// Reference to a frame column, written `df['name']`.
    Column(String),
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Call {
        function: Function,
        args: Vec<Node>,
    },
}

impl Node {
    /// Visit every column reference, depth first, left to right.
    pub fn for_each_column<'a>(&'a self, visit: &mut impl FnMut(&'a str)) {
        match self {
            Self::Literal(_) => {}
            Self::Column(name) => visit(name),
            Self::Unary { operand, .. } => operand.for_each_column(visit),
            Self::Binary { left, right, .. } => {
                left.for_each_column(visit);
                right.for_each_column(visit);
            }
            Self::Call { args, .. } => {
                for arg in args {
                    arg.for_each_column(visit);
                }
            }
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Str(s) => write_quoted(f, s),
            Self::Null => f.write_str("None"),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(lit) => write!(f, "{lit}"),
            Self::Column(name) => {
                f.write_str("df[")?;
                write_quoted(f, name)?;
                f.write_str("]")
            }
            Self::Unary { op, operand } => match op {
                UnaryOp::Neg => write!(f, "(-{operand})"),
                UnaryOp::Plus => write!(f, "(+{operand})"),
                UnaryOp::Not => write!(f, "(not {operand})"),
                UnaryOp::Invert => write!(f, "(~{operand})"),
            },
            Self::Binary { op, left, right } => write!(f, "({left} {} {right})", op.symbol()),
            Self::Call { function, args } => {
                write!(f, "np.{}(", function.name())?;
                for (idx, arg) in args.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("'")?;
    for ch in s.chars() {
        match ch {
            '\'' => f.write_str("\\'")?,
            '\\' => f.write_str("\\\\")?,
            other => write!(f, "{other}")?,
        }
    }
    f.write_str("'")
}

//! Lowering of expression trees to Polars lazy expressions.

use polars::prelude::*;

use iotfn_model::EvaluationError;

use super::ast::{BinaryOp, Function, Literal, Node, UnaryOp};

/// Build the Polars expression for a parsed tree.
///
/// Column references are not checked here; the evaluator verifies them against
/// the frame first so a missing column reports its name.
pub fn to_polars(node: &Node) -> Result<Expr, EvaluationError> {
    let expr = match node {
        Node::Literal(literal) => literal_expr(literal),
        Node::Column(name) => col(name.as_str()),
        Node::Unary { op, operand } => {
            let operand = to_polars(operand)?;
            match op {
                UnaryOp::Neg => lit(0) - operand,
                UnaryOp::Plus => operand,
                UnaryOp::Not | UnaryOp::Invert => operand.not(),
            }
        }
        Node::Binary { op, left, right } => match (op, left.as_ref(), right.as_ref()) {
            // `== None` is false and `!= None` true on every row, missing or not.
            (BinaryOp::Eq | BinaryOp::NotEq, other, Node::Literal(Literal::Null))
            | (BinaryOp::Eq | BinaryOp::NotEq, Node::Literal(Literal::Null), other) => {
                none_equality(*op, other)?
            }
            _ => binary_expr(*op, to_polars(left)?, to_polars(right)?),
        },
        Node::Call { function, args } => {
            let args = args.iter().map(to_polars).collect::<Result<Vec<_>, _>>()?;
            call_expr(*function, args)?
        }
    };
    Ok(expr)
}

fn literal_expr(literal: &Literal) -> Expr {
    match literal {
        Literal::Int(v) => lit(*v),
        Literal::Float(v) => lit(*v),
        Literal::Bool(v) => lit(*v),
        Literal::Str(s) => lit(s.clone()),
        Literal::Null => lit(Null {}),
    }
}

fn none_equality(op: BinaryOp, other: &Node) -> Result<Expr, EvaluationError> {
    let equal = match other {
        Node::Literal(Literal::Null) => lit(true),
        other => to_polars(other)?.is_null().and(lit(false)),
    };
    Ok(if op == BinaryOp::Eq { equal } else { equal.not() })
}

/// NaN test that treats missing values as not NaN.
fn nan_mask(x: Expr) -> Expr {
    x.cast(DataType::Float64).is_nan().fill_null(lit(false))
}

fn binary_expr(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    match op {
        BinaryOp::Add => left + right,
        BinaryOp::Sub => left - right,
        BinaryOp::Mul => left * right,
        // True division: integer operands produce floats.
        BinaryOp::Div => left.cast(DataType::Float64) / right.cast(DataType::Float64),
        BinaryOp::FloorDiv => left.floor_div(right),
        BinaryOp::Mod => left % right,
        BinaryOp::Pow => left.pow(right),
        BinaryOp::Eq => left.eq(right),
        BinaryOp::NotEq => left.neq(right),
        BinaryOp::Lt => left.lt(right),
        BinaryOp::LtEq => left.lt_eq(right),
        BinaryOp::Gt => left.gt(right),
        BinaryOp::GtEq => left.gt_eq(right),
        BinaryOp::BitAnd | BinaryOp::And => left.and(right),
        BinaryOp::BitOr | BinaryOp::Or => left.or(right),
        BinaryOp::BitXor => left.xor(right),
    }
}

fn call_expr(function: Function, args: Vec<Expr>) -> Result<Expr, EvaluationError> {
    let found = args.len();
    let arity = |_: Vec<Expr>| EvaluationError::Arity {
        function: function.name().to_string(),
        expected: function.arity(),
        found,
    };
    let expr = match function {
        Function::Where => {
            let [condition, then, otherwise] = <[Expr; 3]>::try_from(args).map_err(arity)?;
            when(condition).then(then).otherwise(otherwise)
        }
        Function::Abs => {
            let [x] = <[Expr; 1]>::try_from(args).map_err(arity)?;
            when(x.clone().lt(lit(0)))
                .then(lit(0) - x.clone())
                .otherwise(x)
        }
        Function::Sqrt => {
            let [x] = <[Expr; 1]>::try_from(args).map_err(arity)?;
            x.cast(DataType::Float64).pow(lit(0.5))
        }
        Function::Minimum | Function::Maximum => {
            let [a, b] = <[Expr; 2]>::try_from(args).map_err(arity)?;
            let a_wins = if function == Function::Minimum {
                a.clone().lt_eq(b.clone())
            } else {
                a.clone().gt_eq(b.clone())
            };
            // A missing or NaN operand poisons the row; `a + b` carries it
            // through without widening integer inputs.
            let poisoned = a
                .clone()
                .is_null()
                .or(b.clone().is_null())
                .or(nan_mask(a.clone()))
                .or(nan_mask(b.clone()));
            when(poisoned)
                .then(a.clone() + b.clone())
                .when(a_wins)
                .then(a)
                .otherwise(b)
        }
        Function::IsNull => {
            let [x] = <[Expr; 1]>::try_from(args).map_err(arity)?;
            x.is_null()
        }
        Function::IsNan => {
            let [x] = <[Expr; 1]>::try_from(args).map_err(arity)?;
            nan_mask(x.clone()).or(x.is_null())
        }
        Function::NotNull => {
            let [x] = <[Expr; 1]>::try_from(args).map_err(arity)?;
            x.is_not_null()
        }
    };
    Ok(expr)
}

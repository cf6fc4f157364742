//! Recursive-descent parser.
//!
//! Precedence, lowest first: `or`, `and`, `not`, comparison, `|`, `^`, `&`,
//! `+ -`, `* / // %`, unary `- + ~`, `**`. Comparisons do not chain.

use iotfn_model::{EvaluationError, ExpressionLimits};

use super::ast::{BinaryOp, Function, Literal, Node, UnaryOp};
use super::lexer::{Token, TokenKind, tokenize};

/// Name the column accessor is bound to.
pub const FRAME_NAME: &str = "df";
/// Optional namespace prefix for whitelisted functions.
pub const FUNCTION_NAMESPACE: &str = "np";

pub fn parse(source: &str, limits: &ExpressionLimits) -> Result<Node, EvaluationError> {
    if source.len() > limits.max_length {
        return Err(EvaluationError::TooComplex {
            reason: format!(
                "expression is {} bytes long (max {})",
                source.len(),
                limits.max_length
            ),
        });
    }
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        nodes: 0,
        limits,
    };
    let node = parser.expression()?;
    parser.expect(&TokenKind::Eof, "end of expression")?;
    Ok(node)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    nodes: usize,
    limits: &'a ExpressionLimits,
}

impl Parser<'_> {
    fn peek(&self) -> &TokenKind {
        // The token list always ends with Eof and `advance` never moves past it.
        &self.tokens[self.pos].kind
    }

    fn position(&self) -> usize {
        self.tokens[self.pos].position
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.tokens[self.pos].kind.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<(), EvaluationError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn error(&self, message: String) -> EvaluationError {
        EvaluationError::Syntax {
            position: self.position(),
            message,
        }
    }

    fn node(&mut self, node: Node) -> Result<Node, EvaluationError> {
        self.nodes += 1;
        if self.nodes > self.limits.max_nodes {
            return Err(EvaluationError::TooComplex {
                reason: format!("more than {} nodes", self.limits.max_nodes),
            });
        }
        Ok(node)
    }

    fn binary(&mut self, op: BinaryOp, left: Node, right: Node) -> Result<Node, EvaluationError> {
        self.node(Node::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn unary(&mut self, op: UnaryOp, operand: Node) -> Result<Node, EvaluationError> {
        match (op, operand) {
            (UnaryOp::Neg, Node::Literal(Literal::Int(v))) => {
                self.node(Node::Literal(Literal::Int(-v)))
            }
            (UnaryOp::Neg, Node::Literal(Literal::Float(v))) => {
                self.node(Node::Literal(Literal::Float(-v)))
            }
            (op, operand) => self.node(Node::Unary {
                op,
                operand: Box::new(operand),
            }),
        }
    }

    fn descend(&mut self) -> Result<(), EvaluationError> {
        self.depth += 1;
        if self.depth > self.limits.max_depth {
            return Err(EvaluationError::TooComplex {
                reason: format!("nesting deeper than {}", self.limits.max_depth),
            });
        }
        Ok(())
    }

    fn expression(&mut self) -> Result<Node, EvaluationError> {
        self.descend()?;
        let node = self.or_expr();
        self.depth -= 1;
        node
    }

    fn or_expr(&mut self) -> Result<Node, EvaluationError> {
        let mut left = self.and_expr()?;
        while self.eat(&TokenKind::Or) {
            let right = self.and_expr()?;
            left = self.binary(BinaryOp::Or, left, right)?;
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Node, EvaluationError> {
        let mut left = self.not_expr()?;
        while self.eat(&TokenKind::And) {
            let right = self.not_expr()?;
            left = self.binary(BinaryOp::And, left, right)?;
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Node, EvaluationError> {
        if self.eat(&TokenKind::Not) {
            self.descend()?;
            let operand = self.not_expr();
            self.depth -= 1;
            return self.unary(UnaryOp::Not, operand?);
        }
        self.comparison()
    }

    fn comparison_op(&self) -> Option<BinaryOp> {
        match self.peek() {
            TokenKind::EqEq => Some(BinaryOp::Eq),
            TokenKind::NotEq => Some(BinaryOp::NotEq),
            TokenKind::Lt => Some(BinaryOp::Lt),
            TokenKind::LtEq => Some(BinaryOp::LtEq),
            TokenKind::Gt => Some(BinaryOp::Gt),
            TokenKind::GtEq => Some(BinaryOp::GtEq),
            _ => None,
        }
    }

    fn comparison(&mut self) -> Result<Node, EvaluationError> {
        let left = self.bit_or()?;
        let Some(op) = self.comparison_op() else {
            return Ok(left);
        };
        self.advance();
        let right = self.bit_or()?;
        if self.comparison_op().is_some() {
            return Err(self.error("chained comparisons are not supported".to_string()));
        }
        self.binary(op, left, right)
    }

    fn bit_or(&mut self) -> Result<Node, EvaluationError> {
        let mut left = self.bit_xor()?;
        while self.eat(&TokenKind::Pipe) {
            let right = self.bit_xor()?;
            left = self.binary(BinaryOp::BitOr, left, right)?;
        }
        Ok(left)
    }

    fn bit_xor(&mut self) -> Result<Node, EvaluationError> {
        let mut left = self.bit_and()?;
        while self.eat(&TokenKind::Caret) {
            let right = self.bit_and()?;
            left = self.binary(BinaryOp::BitXor, left, right)?;
        }
        Ok(left)
    }

    fn bit_and(&mut self) -> Result<Node, EvaluationError> {
        let mut left = self.arith()?;
        while self.eat(&TokenKind::Amp) {
            let right = self.arith()?;
            left = self.binary(BinaryOp::BitAnd, left, right)?;
        }
        Ok(left)
    }

    fn arith(&mut self) -> Result<Node, EvaluationError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.term()?;
            left = self.binary(op, left, right)?;
        }
    }

    fn term(&mut self) -> Result<Node, EvaluationError> {
        let mut left = self.factor()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::DoubleSlash => BinaryOp::FloorDiv,
                TokenKind::Percent => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.factor()?;
            left = self.binary(op, left, right)?;
        }
    }

    fn factor(&mut self) -> Result<Node, EvaluationError> {
        let op = match self.peek() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Tilde => UnaryOp::Invert,
            _ => return self.power(),
        };
        self.advance();
        self.descend()?;
        let operand = self.factor();
        self.depth -= 1;
        self.unary(op, operand?)
    }

    fn power(&mut self) -> Result<Node, EvaluationError> {
        let base = self.primary()?;
        if self.eat(&TokenKind::DoubleStar) {
            self.descend()?;
            let exponent = self.factor();
            self.depth -= 1;
            return self.binary(BinaryOp::Pow, base, exponent?);
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Node, EvaluationError> {
        let position = self.position();
        match self.advance() {
            TokenKind::Int(v) => self.node(Node::Literal(Literal::Int(v))),
            TokenKind::Float(v) => self.node(Node::Literal(Literal::Float(v))),
            TokenKind::Str(s) => self.node(Node::Literal(Literal::Str(s))),
            TokenKind::True => self.node(Node::Literal(Literal::Bool(true))),
            TokenKind::False => self.node(Node::Literal(Literal::Bool(false))),
            TokenKind::None => self.node(Node::Literal(Literal::Null)),
            TokenKind::LParen => {
                let inner = self.expression()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::Ident(name) => self.identifier(name, position),
            TokenKind::Eof => Err(EvaluationError::Syntax {
                position,
                message: "unexpected end of expression".to_string(),
            }),
            other => Err(EvaluationError::Syntax {
                position,
                message: format!("unexpected token {other:?}"),
            }),
        }
    }

    fn identifier(&mut self, name: String, position: usize) -> Result<Node, EvaluationError> {
        if name == FRAME_NAME {
            self.expect(&TokenKind::LBracket, "'[' after df")?;
            let TokenKind::Str(column) = self.advance() else {
                return Err(EvaluationError::Syntax {
                    position,
                    message: "column name must be a quoted string".to_string(),
                });
            };
            self.expect(&TokenKind::RBracket, "']'")?;
            return self.node(Node::Column(column));
        }

        let function_name = if name == FUNCTION_NAMESPACE && self.peek() == &TokenKind::Dot {
            self.advance();
            match self.advance() {
                TokenKind::Ident(inner) => inner,
                _ => return Err(self.error("expected function name after 'np.'".to_string())),
            }
        } else if self.peek() == &TokenKind::LParen {
            name
        } else {
            return Err(EvaluationError::UnknownName(name));
        };

        let function = Function::from_name(&function_name)
            .ok_or_else(|| EvaluationError::UnknownFunction(function_name.clone()))?;
        self.expect(&TokenKind::LParen, "'(' after function name")?;
        let mut args = Vec::new();
        if !self.eat(&TokenKind::RParen) {
            loop {
                args.push(self.expression()?);
                if self.eat(&TokenKind::RParen) {
                    break;
                }
                self.expect(&TokenKind::Comma, "',' or ')'")?;
            }
        }
        if args.len() != function.arity() {
            return Err(EvaluationError::Arity {
                function: function.name().to_string(),
                expected: function.arity(),
                found: args.len(),
            });
        }
        self.node(Node::Call { function, args })
    }
}

use super::lexer::{tokenize, Spanned, Token};
use super::value::Value;
use super::ExprError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    In,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::In => "in",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Ident(String),
    List(Vec<Expr>),
    Map(Vec<(Expr, Expr)>),
    Select { operand: Box<Expr>, field: String },
    Index { operand: Box<Expr>, index: Box<Expr> },
    Call { function: String, args: Vec<Expr> },
    Method { receiver: Box<Expr>, method: String, args: Vec<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Conditional { cond: Box<Expr>, then: Box<Expr>, otherwise: Box<Expr> },
}

/// Deepest expression tree accepted. Checking and evaluation recurse over the
/// tree, so anything deeper is rejected as a syntax error.
pub const MAX_DEPTH: usize = 128;

pub fn parse(source: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0, depth: 0 };
    let (expr, _) = parser.expression()?;
    match parser.peek() {
        Token::Eof => Ok(expr),
        other => Err(parser.error(format!("unexpected trailing token {:?}", other))),
    }
}

/// A parsed subtree and its height.
type Node = (Expr, usize);

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Current recursion depth of `expression`/`unary`.
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].token
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), ExprError> {
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected {:?}, found {:?}", expected, self.peek())))
        }
    }

    fn error(&self, message: String) -> ExprError {
        let pos = self.tokens[self.pos.min(self.tokens.len() - 1)].pos;
        ExprError::Syntax { pos, message }
    }

    fn too_deep(&self) -> ExprError {
        self.error(format!("expression nested deeper than {} levels", MAX_DEPTH))
    }

    /// Wrap `expr` as a node one level above its tallest child.
    fn node(&self, expr: Expr, child_height: usize) -> Result<Node, ExprError> {
        let height = child_height + 1;
        if height > MAX_DEPTH {
            return Err(self.too_deep());
        }
        Ok((expr, height))
    }

    fn enter(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.too_deep());
        }
        Ok(())
    }

    fn expression(&mut self) -> Result<Node, ExprError> {
        self.enter()?;
        let result = self.conditional();
        self.depth -= 1;
        result
    }

    fn conditional(&mut self) -> Result<Node, ExprError> {
        let (cond, hc) = self.or()?;
        if self.eat(&Token::Question) {
            let (then, ht) = self.or()?;
            self.expect(Token::Colon)?;
            let (otherwise, ho) = self.expression()?;
            let expr = Expr::Conditional {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            };
            return self.node(expr, hc.max(ht).max(ho));
        }
        Ok((cond, hc))
    }

    fn or(&mut self) -> Result<Node, ExprError> {
        let mut lhs = self.and()?;
        while self.eat(&Token::OrOr) {
            let rhs = self.and()?;
            lhs = self.binary(BinaryOp::Or, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Node, ExprError> {
        let mut lhs = self.relation()?;
        while self.eat(&Token::AndAnd) {
            let rhs = self.relation()?;
            lhs = self.binary(BinaryOp::And, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn relation(&mut self) -> Result<Node, ExprError> {
        let mut lhs = self.additive()?;
        loop {
            let op = match self.peek() {
                Token::Lt => BinaryOp::Lt,
                Token::Le => BinaryOp::Le,
                Token::Gt => BinaryOp::Gt,
                Token::Ge => BinaryOp::Ge,
                Token::EqEq => BinaryOp::Eq,
                Token::Ne => BinaryOp::Ne,
                Token::Ident(name) if name == "in" => BinaryOp::In,
                _ => break,
            };
            self.advance();
            let rhs = self.additive()?;
            lhs = self.binary(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn additive(&mut self) -> Result<Node, ExprError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.multiplicative()?;
            lhs = self.binary(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> Result<Node, ExprError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Rem,
                _ => break,
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = self.binary(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Node, ExprError> {
        let op = match self.peek() {
            Token::Bang => UnaryOp::Not,
            Token::Minus => UnaryOp::Neg,
            _ => return self.postfix(),
        };
        self.advance();
        self.enter()?;
        let operand = self.unary();
        self.depth -= 1;
        let (operand, height) = operand?;
        // -5 is a literal, not a negation
        if let (UnaryOp::Neg, Expr::Literal(Value::Int(i))) = (op, &operand) {
            return Ok((Expr::Literal(Value::Int(-i)), height));
        }
        self.node(Expr::Unary { op, operand: Box::new(operand) }, height)
    }

    fn postfix(&mut self) -> Result<Node, ExprError> {
        let (mut expr, mut height) = self.primary()?;
        loop {
            if self.eat(&Token::Dot) {
                let name = match self.advance() {
                    Token::Ident(name) => name,
                    other => return Err(self.error(format!("expected field name, found {:?}", other))),
                };
                let (next, h) = if self.eat(&Token::LParen) {
                    let (args, args_height) = self.arguments(Token::RParen)?;
                    let method = Expr::Method { receiver: Box::new(expr), method: name, args };
                    self.node(method, height.max(args_height))?
                } else {
                    self.node(Expr::Select { operand: Box::new(expr), field: name }, height)?
                };
                expr = next;
                height = h;
            } else if self.eat(&Token::LBracket) {
                let (index, index_height) = self.expression()?;
                self.expect(Token::RBracket)?;
                let indexed = Expr::Index { operand: Box::new(expr), index: Box::new(index) };
                (expr, height) = self.node(indexed, height.max(index_height))?;
            } else {
                return Ok((expr, height));
            }
        }
    }

    fn primary(&mut self) -> Result<Node, ExprError> {
        match self.advance() {
            Token::Int(i) => Ok((Expr::Literal(Value::Int(i)), 1)),
            Token::Str(s) => Ok((Expr::Literal(Value::String(s)), 1)),
            Token::Bytes(b) => Ok((Expr::Literal(Value::Bytes(b)), 1)),
            Token::Ident(name) => match name.as_str() {
                "true" => Ok((Expr::Literal(Value::Bool(true)), 1)),
                "false" => Ok((Expr::Literal(Value::Bool(false)), 1)),
                "null" => Ok((Expr::Literal(Value::Null), 1)),
                _ => {
                    if self.eat(&Token::LParen) {
                        let (args, height) = self.arguments(Token::RParen)?;
                        self.node(Expr::Call { function: name, args }, height)
                    } else {
                        Ok((Expr::Ident(name), 1))
                    }
                }
            },
            Token::LParen => {
                let inner = self.expression()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::LBracket => {
                let (items, height) = self.arguments(Token::RBracket)?;
                self.node(Expr::List(items), height)
            }
            Token::LBrace => {
                let mut entries = Vec::new();
                let mut height = 0;
                if !self.eat(&Token::RBrace) {
                    loop {
                        let (key, hk) = self.expression()?;
                        self.expect(Token::Colon)?;
                        let (value, hv) = self.expression()?;
                        height = height.max(hk).max(hv);
                        entries.push((key, value));
                        if self.eat(&Token::RBrace) {
                            break;
                        }
                        self.expect(Token::Comma)?;
                    }
                }
                self.node(Expr::Map(entries), height)
            }
            other => Err(self.error(format!("unexpected token {:?}", other))),
        }
    }

    /// Comma-separated expressions up to and including `close`, with the
    /// tallest argument's height.
    fn arguments(&mut self, close: Token) -> Result<(Vec<Expr>, usize), ExprError> {
        let mut args = Vec::new();
        let mut height = 0;
        if self.eat(&close) {
            return Ok((args, height));
        }
        loop {
            let (arg, h) = self.expression()?;
            height = height.max(h);
            args.push(arg);
            if self.eat(&close) {
                return Ok((args, height));
            }
            self.expect(Token::Comma)?;
        }
    }

    fn binary(&self, op: BinaryOp, (lhs, hl): Node, (rhs, hr): Node) -> Result<Node, ExprError> {
        let expr = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        self.node(expr, hl.max(hr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_and_over_or() {
        let expr = parse("a || b && c").unwrap();
        match expr {
            Expr::Binary { op: BinaryOp::Or, rhs, .. } => {
                assert!(matches!(*rhs, Expr::Binary { op: BinaryOp::And, .. }));
            }
            other => panic!("unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn test_method_call_chain() {
        let expr = parse("response.body.bcontains(b\"root:\")").unwrap();
        match expr {
            Expr::Method { receiver, method, args } => {
                assert_eq!(method, "bcontains");
                assert_eq!(args.len(), 1);
                assert!(matches!(*receiver, Expr::Select { ref field, .. } if field == "body"));
            }
            other => panic!("unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn test_ternary_and_index() {
        let expr = parse("response.headers[\"server\"] == \"nginx\" ? 1 : 2").unwrap();
        assert!(matches!(expr, Expr::Conditional { .. }));
    }

    #[test]
    fn test_negative_literal_folds() {
        assert_eq!(parse("-5").unwrap(), Expr::Literal(Value::Int(-5)));
    }

    #[test]
    fn test_map_and_list_literals() {
        assert!(matches!(parse("{\"a\": 1, \"b\": [1, 2]}").unwrap(), Expr::Map(ref e) if e.len() == 2));
        assert!(matches!(parse("[]").unwrap(), Expr::List(ref e) if e.is_empty()));
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        assert!(parse("1 2").is_err());
    }

    #[test]
    fn test_unbalanced_parens_rejected() {
        assert!(parse("(1 + 2").is_err());
    }

    #[test]
    fn test_deep_parentheses_rejected() {
        let source = format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000));
        let err = parse(&source).unwrap_err();
        assert!(matches!(err, ExprError::Syntax { ref message, .. } if message.contains("nested deeper")));
    }

    #[test]
    fn test_long_operator_chain_rejected() {
        let source = vec!["1"; 100_000].join(" + ");
        assert!(matches!(parse(&source), Err(ExprError::Syntax { .. })));
        let source = format!("{}true", "!".repeat(100_000));
        assert!(matches!(parse(&source), Err(ExprError::Syntax { .. })));
    }

    #[test]
    fn test_moderate_nesting_accepted() {
        let source = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(parse(&source).unwrap(), Expr::Literal(Value::Int(1)));
        let source = vec!["1"; 100].join(" + ");
        assert!(parse(&source).is_ok());
    }
}

use crate::expr::{
    lexer::{tokenize, Token, TokenKind},
    ArithOp, Expr, ExprError, Literal,
};

/// Parses a condition or validation expression.
pub fn parse(input: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.or_expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(unexpected(token)),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

fn unexpected(token: &Token) -> ExprError {
    ExprError::UnexpectedToken {
        found: token.kind.to_string(),
        pos: token.pos,
    }
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn advance(&mut self) -> Result<Token, ExprError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(ExprError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), ExprError> {
        let token = self.advance()?;
        if &token.kind == kind {
            Ok(())
        } else {
            Err(unexpected(&token))
        }
    }

    fn or_expr(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.and_expr()?;
        while self.eat(&TokenKind::Or) {
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.not_expr()?;
        while self.eat(&TokenKind::And) {
            let right = self.not_expr()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&TokenKind::Not) {
            return Ok(Expr::Not(Box::new(self.not_expr()?)));
        }
        self.comparison()
    }

    /// `sum (cmp sum | [not] in (list))?`; comparisons do not chain.
    fn comparison(&mut self) -> Result<Expr, ExprError> {
        let left = self.sum()?;
        match self.peek_kind() {
            Some(TokenKind::Cmp(op)) => {
                let op = *op;
                self.pos += 1;
                let right = self.sum()?;
                Ok(Expr::Compare {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            Some(TokenKind::In) => {
                self.pos += 1;
                self.in_list(left, false)
            }
            Some(TokenKind::Not)
                if self.tokens.get(self.pos + 1).map(|t| &t.kind) == Some(&TokenKind::In) =>
            {
                self.pos += 2;
                self.in_list(left, true)
            }
            _ => Ok(left),
        }
    }

    fn in_list(&mut self, expr: Expr, negated: bool) -> Result<Expr, ExprError> {
        self.expect(&TokenKind::LParen)?;
        let mut list = vec![self.sum()?];
        while self.eat(&TokenKind::Comma) {
            list.push(self.sum()?);
        }
        self.expect(&TokenKind::RParen)?;
        Ok(Expr::In {
            expr: Box::new(expr),
            list,
            negated,
        })
    }

    fn sum(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => ArithOp::Add,
                Some(TokenKind::Minus) => ArithOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.term()?;
            left = Expr::Arith {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn term(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => ArithOp::Mul,
                Some(TokenKind::Slash) => ArithOp::Div,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary()?;
            left = Expr::Arith {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&TokenKind::Minus) {
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        if self.eat(&TokenKind::Plus) {
            return self.unary();
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let token = self.advance()?;
        match token.kind {
            TokenKind::Ident(name) => Ok(Expr::Column(name)),
            TokenKind::Number(n) => Ok(Expr::Literal(Literal::Number(n))),
            TokenKind::Str(s) => Ok(Expr::Literal(Literal::Str(s))),
            TokenKind::True => Ok(Expr::Literal(Literal::Bool(true))),
            TokenKind::False => Ok(Expr::Literal(Literal::Bool(false))),
            TokenKind::LParen => {
                let inner = self.or_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(inner)
            }
            _ => Err(unexpected(&token)),
        }
    }
}

use crate::constraint::{
    ConstraintError,
    ast::{Builtin, CompareOp, Expr, Literal, Member},
    lex::{Spanned, Token, tokenize},
};

/// Name of the only variable an expression may reference.
pub const RECORDS: &str = "records";

/// Deepest expression tree (and deepest bracket or `not` nesting) accepted.
pub const MAX_NESTING: usize = 64;

/// Parse an expression, rejecting anything outside the allowed symbols.
pub(crate) fn parse(source: &str) -> Result<Expr, ConstraintError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(ConstraintError::syntax(0, "empty expression"));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        end: source.len(),
        nesting: 0,
    };
    let node = parser.or_expr()?;

    if let Some(extra) = parser.peek_spanned() {
        return Err(ConstraintError::syntax(
            extra.pos,
            format!("unexpected {}", describe(&extra.token)),
        ));
    }

    Ok(node.expr)
}

///
/// Node
/// Parsed expression with the height of its tree.
///

struct Node {
    expr: Expr,
    depth: usize,
}

impl Node {
    const fn leaf(expr: Expr) -> Self {
        Self { expr, depth: 1 }
    }
}

///
/// Parser
/// Recursive descent, lowest precedence first: or, and, not, comparison, postfix.
///
/// `nesting` counts open brackets and `not` prefixes so the descent itself
/// stays bounded; `Node::depth` bounds the tree the evaluator walks.
///

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    end: usize,
    nesting: usize,
}

impl Parser {
    fn or_expr(&mut self) -> Result<Node, ConstraintError> {
        let mut left = self.and_expr()?;
        while let Some(pos) = self.eat_at(&Token::Or) {
            let right = self.and_expr()?;
            let depth = left.depth.max(right.depth);
            left = Self::node(
                pos,
                Expr::Or(Box::new(left.expr), Box::new(right.expr)),
                depth,
            )?;
        }

        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Node, ConstraintError> {
        let mut left = self.not_expr()?;
        while let Some(pos) = self.eat_at(&Token::And) {
            let right = self.not_expr()?;
            let depth = left.depth.max(right.depth);
            left = Self::node(
                pos,
                Expr::And(Box::new(left.expr), Box::new(right.expr)),
                depth,
            )?;
        }

        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Node, ConstraintError> {
        if let Some(pos) = self.eat_at(&Token::Not) {
            self.enter(pos)?;
            let inner = self.not_expr()?;
            self.nesting -= 1;
            return Self::node(pos, Expr::Not(Box::new(inner.expr)), inner.depth);
        }

        self.comparison()
    }

    fn comparison(&mut self) -> Result<Node, ConstraintError> {
        let left = self.postfix()?;
        let pos = self.current_pos();
        let Some(op) = self.compare_op() else {
            return Ok(left);
        };
        let right = self.postfix()?;

        if let Some(pos) = self.peek_compare_pos() {
            return Err(ConstraintError::syntax(
                pos,
                "chained comparisons are not supported",
            ));
        }

        let depth = left.depth.max(right.depth);
        Self::node(
            pos,
            Expr::Compare {
                op,
                left: Box::new(left.expr),
                right: Box::new(right.expr),
            },
            depth,
        )
    }

    fn compare_op(&mut self) -> Option<CompareOp> {
        let op = match self.peek()? {
            Token::Eq => CompareOp::Eq,
            Token::Ne => CompareOp::Ne,
            Token::Lt => CompareOp::Lt,
            Token::Lte => CompareOp::Lte,
            Token::Gt => CompareOp::Gt,
            Token::Gte => CompareOp::Gte,
            Token::In => CompareOp::In,
            Token::Not if self.peek_at(1) == Some(&Token::In) => {
                self.pos += 2;
                return Some(CompareOp::NotIn);
            }
            _ => return None,
        };
        self.pos += 1;

        Some(op)
    }

    fn peek_compare_pos(&self) -> Option<usize> {
        let spanned = self.peek_spanned()?;
        let is_compare = matches!(
            spanned.token,
            Token::Eq | Token::Ne | Token::Lt | Token::Lte | Token::Gt | Token::Gte | Token::In
        ) || (spanned.token == Token::Not && self.peek_at(1) == Some(&Token::In));

        is_compare.then_some(spanned.pos)
    }

    fn postfix(&mut self) -> Result<Node, ConstraintError> {
        let mut node = self.primary()?;

        while let Some(dot) = self.eat_at(&Token::Dot) {
            let (name, pos) = self.expect_ident("a member name after '.'")?;
            let member = if self.eat(&Token::LParen) {
                let path = self.expect_str(&name)?;
                self.expect(&Token::RParen, "')'")?;
                match name.as_str() {
                    "mapped" => Member::Mapped(path),
                    "filtered" => Member::Filtered(path),
                    _ => return Err(ConstraintError::UnknownMethod { name, pos }),
                }
            } else if name == "ids" {
                Member::Ids
            } else {
                Member::Field(name)
            };

            let depth = node.depth;
            node = Self::node(
                dot,
                Expr::Member {
                    target: Box::new(node.expr),
                    member,
                },
                depth,
            )?;
        }

        Ok(node)
    }

    fn primary(&mut self) -> Result<Node, ConstraintError> {
        let Some(Spanned { token, pos }) = self.next() else {
            return Err(ConstraintError::syntax(self.end, "unexpected end of expression"));
        };

        let node = match token {
            Token::None => Node::leaf(Expr::Literal(Literal::None)),
            Token::True => Node::leaf(Expr::Literal(Literal::Bool(true))),
            Token::False => Node::leaf(Expr::Literal(Literal::Bool(false))),
            Token::Int(n) => Node::leaf(Expr::Literal(Literal::Int(n))),
            Token::Float(n) => Node::leaf(Expr::Literal(Literal::Float(n))),
            Token::Str(s) => Node::leaf(Expr::Literal(Literal::Str(s))),

            Token::LParen => {
                self.enter(pos)?;
                let inner = self.or_expr()?;
                self.expect(&Token::RParen, "')'")?;
                self.nesting -= 1;
                inner
            }

            Token::LBracket => {
                let (items, depth) = self.items(pos, &Token::RBracket)?;
                Self::node(pos, Expr::List(items), depth)?
            }

            Token::Ident(name) if self.peek() == Some(&Token::LParen) => {
                self.pos += 1;
                let Some(func) = Builtin::from_name(&name) else {
                    return Err(ConstraintError::UnknownFunction { name, pos });
                };
                let (args, depth) = self.items(pos, &Token::RParen)?;
                Self::node(pos, Expr::Call { func, args }, depth)?
            }

            Token::Ident(name) if name == RECORDS => Node::leaf(Expr::Records),
            Token::Ident(name) => return Err(ConstraintError::UnknownSymbol { name, pos }),

            other => {
                return Err(ConstraintError::syntax(
                    pos,
                    format!("unexpected {}", describe(&other)),
                ));
            }
        };

        Ok(node)
    }

    // Comma-separated expressions up to `close`; a trailing comma is allowed.
    // Returns the items with the height of the tallest one.
    fn items(
        &mut self,
        open: usize,
        close: &Token,
    ) -> Result<(Vec<Expr>, usize), ConstraintError> {
        self.enter(open)?;
        let mut items = Vec::new();
        let mut depth = 0;

        loop {
            if self.eat(close) {
                break;
            }
            let item = self.or_expr()?;
            depth = depth.max(item.depth);
            items.push(item.expr);
            if !self.eat(&Token::Comma) {
                self.expect(close, &describe(close))?;
                break;
            }
        }
        self.nesting -= 1;

        Ok((items, depth))
    }

    //
    // nesting guards
    //

    fn enter(&mut self, pos: usize) -> Result<(), ConstraintError> {
        if self.nesting >= MAX_NESTING {
            return Err(too_deep(pos));
        }
        self.nesting += 1;

        Ok(())
    }

    // Wrap `expr` one level above its tallest child.
    fn node(pos: usize, expr: Expr, child_depth: usize) -> Result<Node, ConstraintError> {
        let depth = child_depth + 1;
        if depth > MAX_NESTING {
            return Err(too_deep(pos));
        }

        Ok(Node { expr, depth })
    }

    //
    // token helpers
    //

    fn peek(&self) -> Option<&Token> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|s| &s.token)
    }

    fn peek_spanned(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Spanned> {
        let spanned = self.tokens.get(self.pos).cloned();
        if spanned.is_some() {
            self.pos += 1;
        }

        spanned
    }

    // Consume `token`, returning its offset.
    fn eat_at(&mut self, token: &Token) -> Option<usize> {
        let pos = self.peek_spanned().filter(|s| s.token == *token)?.pos;
        self.pos += 1;

        Some(pos)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn current_pos(&self) -> usize {
        self.peek_spanned().map_or(self.end, |s| s.pos)
    }

    fn expect(&mut self, token: &Token, what: &str) -> Result<(), ConstraintError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(ConstraintError::syntax(
                self.current_pos(),
                format!("expected {what}"),
            ))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<(String, usize), ConstraintError> {
        let pos = self.current_pos();
        match self.next() {
            Some(Spanned {
                token: Token::Ident(name),
                ..
            }) => Ok((name, pos)),
            _ => Err(ConstraintError::syntax(pos, format!("expected {what}"))),
        }
    }

    fn expect_str(&mut self, method: &str) -> Result<String, ConstraintError> {
        let pos = self.current_pos();
        match self.next() {
            Some(Spanned {
                token: Token::Str(path),
                ..
            }) => Ok(path),
            _ => Err(ConstraintError::syntax(
                pos,
                format!("{method}() takes a single quoted field path"),
            )),
        }
    }
}

fn too_deep(pos: usize) -> ConstraintError {
    ConstraintError::syntax(
        pos,
        format!("expression nests deeper than {MAX_NESTING} levels"),
    )
}

fn describe(token: &Token) -> String {
    match token {
        Token::Ident(name) => format!("name '{name}'"),
        Token::Int(n) => format!("number {n}"),
        Token::Float(n) => format!("number {n}"),
        Token::Str(s) => format!("string '{s}'"),
        Token::And => "'and'".to_string(),
        Token::Or => "'or'".to_string(),
        Token::Not => "'not'".to_string(),
        Token::In => "'in'".to_string(),
        Token::True => "'True'".to_string(),
        Token::False => "'False'".to_string(),
        Token::None => "'None'".to_string(),
        Token::LParen => "'('".to_string(),
        Token::RParen => "')'".to_string(),
        Token::LBracket => "'['".to_string(),
        Token::RBracket => "']'".to_string(),
        Token::Comma => "','".to_string(),
        Token::Dot => "'.'".to_string(),
        Token::Eq => "'=='".to_string(),
        Token::Ne => "'!='".to_string(),
        Token::Lt => "'<'".to_string(),
        Token::Lte => "'<='".to_string(),
        Token::Gt => "'>'".to_string(),
        Token::Gte => "'>='".to_string(),
    }
}

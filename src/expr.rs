// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Expression AST and text compiler.
//!
//! The schema DSL's own lexer/parser is an external collaborator; this
//! module's parser is the narrower "compile one path/filter expression"
//! facility, `compile_expr`, needed to make [`crate::board::Board::add_expr`]
//! and `eval_expr` usable from text.

use crate::error::{Error, Result};

/// A binary operator.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BinOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `&&`
    And,
    /// `||`
    Or,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

/// The key used by an index expression (`a[expr]` or `a['key'{twin}]`).
#[derive(Debug, Clone)]
pub enum IndexKey {
    /// A numeric index expression.
    Numeric(Box<Expr>),
    /// A keyed lookup with an explicit twin count (defaults to `0`, the
    /// first occurrence).
    Keyed(Vec<u8>, u64),
}

/// A compiled path/filter expression.
#[derive(Debug, Clone)]
pub enum Expr {
    /// An integer literal.
    IntLit(i64),
    /// A string literal.
    StrLit(Vec<u8>),
    /// A boolean literal.
    BoolLit(bool),
    /// A bare identifier, resolved through scope lookup.
    Ident(String),
    /// `base.name`
    Field(Box<Expr>, String),
    /// `base[key]`
    Index(Box<Expr>, IndexKey),
    /// `sizeof(expr)`
    SizeOf(Box<Expr>),
    /// A binary operation.
    BinOp(Box<Expr>, BinOp, Box<Expr>),
}

/// Compiles expression text into an [`Expr`] tree.
///
/// # Errors
///
/// Returns `Err(Error::InvalidExpr)` on a syntax error.
pub fn compile(text: &str) -> Result<Expr> {
    let tokens = lex(text)?;
    let mut parser = Parser { tokens: &tokens, pos: 0 };
    let expr = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        return Err(Error::InvalidExpr(format!(
            "trailing tokens after expression: {:?}",
            &parser.tokens[parser.pos..]
        )));
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Str(Vec<u8>),
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Op(BinOp),
}

fn lex(text: &str) -> Result<Vec<Token>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        let c = bytes[i] as char;

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        match c {
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            '{' => {
                tokens.push(Token::LBrace);
                i += 1;
            }
            '}' => {
                tokens.push(Token::RBrace);
                i += 1;
            }
            '+' => {
                tokens.push(Token::Op(BinOp::Add));
                i += 1;
            }
            '-' => {
                tokens.push(Token::Op(BinOp::Sub));
                i += 1;
            }
            '*' => {
                tokens.push(Token::Op(BinOp::Mul));
                i += 1;
            }
            '/' => {
                tokens.push(Token::Op(BinOp::Div));
                i += 1;
            }
            '=' if bytes.get(i + 1) == Some(&b'=') => {
                tokens.push(Token::Op(BinOp::Eq));
                i += 2;
            }
            '!' if bytes.get(i + 1) == Some(&b'=') => {
                tokens.push(Token::Op(BinOp::Ne));
                i += 2;
            }
            '<' if bytes.get(i + 1) == Some(&b'=') => {
                tokens.push(Token::Op(BinOp::Le));
                i += 2;
            }
            '<' => {
                tokens.push(Token::Op(BinOp::Lt));
                i += 1;
            }
            '>' if bytes.get(i + 1) == Some(&b'=') => {
                tokens.push(Token::Op(BinOp::Ge));
                i += 2;
            }
            '>' => {
                tokens.push(Token::Op(BinOp::Gt));
                i += 1;
            }
            '&' if bytes.get(i + 1) == Some(&b'&') => {
                tokens.push(Token::Op(BinOp::And));
                i += 2;
            }
            '|' if bytes.get(i + 1) == Some(&b'|') => {
                tokens.push(Token::Op(BinOp::Or));
                i += 2;
            }
            '\'' | '"' => {
                let quote = bytes[i];
                i += 1;
                let start = i;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
                if i >= bytes.len() {
                    return Err(Error::InvalidExpr("unterminated string literal".into()));
                }
                tokens.push(Token::Str(bytes[start..i].to_vec()));
                i += 1;
            }
            _ if c.is_ascii_digit() => {
                let start = i;
                while i < bytes.len() && (bytes[i] as char).is_ascii_alphanumeric() {
                    i += 1;
                }
                let word = &text[start..i];
                let value = if let Some(hex) = word.strip_prefix("0x") {
                    i64::from_str_radix(hex, 16)
                } else {
                    word.parse::<i64>()
                }
                .map_err(|_| Error::InvalidExpr(format!("invalid integer literal: {word}")))?;
                tokens.push(Token::Int(value));
            }
            _ if c.is_ascii_alphabetic() || c == '_' || c == '@' => {
                let start = i;
                i += 1;
                while i < bytes.len()
                    && ((bytes[i] as char).is_ascii_alphanumeric() || bytes[i] == b'_')
                {
                    i += 1;
                }
                tokens.push(Token::Ident(text[start..i].to_string()));
            }
            other => {
                return Err(Error::InvalidExpr(format!("unexpected character: {other}")));
            }
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        self.pos += 1;
        tok
    }

    fn expect(&mut self, tok: &Token) -> Result<()> {
        if self.peek() == Some(tok) {
            self.pos += 1;
            Ok(())
        } else {
            Err(Error::InvalidExpr(format!(
                "expected {tok:?}, got {:?}",
                self.peek()
            )))
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        self.parse_binop_level(&[BinOp::Or], Self::parse_and)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        self.parse_binop_level(&[BinOp::And], Self::parse_cmp)
    }

    fn parse_cmp(&mut self) -> Result<Expr> {
        self.parse_binop_level(
            &[BinOp::Eq, BinOp::Ne, BinOp::Lt, BinOp::Le, BinOp::Gt, BinOp::Ge],
            Self::parse_add,
        )
    }

    fn parse_add(&mut self) -> Result<Expr> {
        self.parse_binop_level(&[BinOp::Add, BinOp::Sub], Self::parse_mul)
    }

    fn parse_mul(&mut self) -> Result<Expr> {
        self.parse_binop_level(&[BinOp::Mul, BinOp::Div], Self::parse_postfix)
    }

    fn parse_binop_level(
        &mut self,
        ops: &[BinOp],
        mut next: impl FnMut(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let mut lhs = next(self)?;
        loop {
            let matched = match self.peek() {
                Some(Token::Op(op)) if ops.contains(op) => Some(*op),
                _ => None,
            };
            let Some(op) = matched else { break };
            self.pos += 1;
            let rhs = next(self)?;
            lhs = Expr::BinOp(Box::new(lhs), op, Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    let Some(Token::Ident(name)) = self.bump().cloned() else {
                        return Err(Error::InvalidExpr("expected field name after `.`".into()));
                    };
                    expr = Expr::Field(Box::new(expr), name);
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let key = self.parse_index_key()?;
                    self.expect(&Token::RBracket)?;
                    expr = Expr::Index(Box::new(expr), key);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_index_key(&mut self) -> Result<IndexKey> {
        if let Some(Token::Str(s)) = self.peek().cloned() {
            self.pos += 1;
            let mut twin = 0u64;
            if self.peek() == Some(&Token::LBrace) {
                self.pos += 1;
                let Some(Token::Int(n)) = self.bump().cloned() else {
                    return Err(Error::InvalidExpr("expected twin index in `{}`".into()));
                };
                self.expect(&Token::RBrace)?;
                #[allow(clippy::cast_sign_loss)]
                {
                    twin = n as u64;
                }
            }
            return Ok(IndexKey::Keyed(s, twin));
        }
        Ok(IndexKey::Numeric(Box::new(self.parse_or()?)))
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.bump().cloned() {
            Some(Token::Int(n)) => Ok(Expr::IntLit(n)),
            Some(Token::Str(s)) => Ok(Expr::StrLit(s)),
            Some(Token::Ident(name)) if name == "true" => Ok(Expr::BoolLit(true)),
            Some(Token::Ident(name)) if name == "false" => Ok(Expr::BoolLit(false)),
            Some(Token::Ident(name)) if name == "sizeof" => {
                self.expect(&Token::LParen)?;
                let inner = self.parse_or()?;
                self.expect(&Token::RParen)?;
                Ok(Expr::SizeOf(Box::new(inner)))
            }
            Some(Token::Ident(name)) => Ok(Expr::Ident(name)),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            other => Err(Error::InvalidExpr(format!(
                "unexpected token in expression: {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn compiles_plain_identifier() {
        assert!(matches!(compile("x").unwrap(), Expr::Ident(n) if n == "x"));
    }

    #[test]
    fn compiles_dotted_path() {
        let expr = compile("items.v").unwrap();
        assert!(matches!(expr, Expr::Field(_, n) if n == "v"));
    }

    #[test]
    fn compiles_equality() {
        let expr = compile("flag == 1").unwrap();
        assert!(matches!(expr, Expr::BinOp(_, BinOp::Eq, _)));
    }

    #[test]
    fn compiles_keyed_index_with_twin() {
        let expr = compile("items['a'{1}].v").unwrap();
        let Expr::Field(base, field) = expr else {
            panic!("expected field access");
        };
        assert_eq!(field, "v");
        let Expr::Index(_, IndexKey::Keyed(key, twin)) = *base else {
            panic!("expected keyed index");
        };
        assert_eq!(key, b"a");
        assert_eq!(twin, 1);
    }

    #[test]
    fn compiles_sizeof() {
        assert!(matches!(compile("sizeof(s)").unwrap(), Expr::SizeOf(_)));
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(compile("x y").is_err());
    }
}

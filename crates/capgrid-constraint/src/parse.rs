//! Lexer and recursive-descent parser for constraint expressions.

use crate::ConstraintError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    /// Reference to a merged attribute, stored without the `device.`
    /// prefix.
    Attr(String),
    Str(String),
    Int(i64),
    Bool(bool),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Cmp(Box<Expr>, CmpOp, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Op(CmpOp),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/')
}

fn parse_err(offset: usize, message: impl Into<String>) -> ConstraintError {
    ConstraintError::Parse {
        offset,
        message: message.into(),
    }
}

fn lex(input: &str) -> Result<Vec<(usize, Token)>, ConstraintError> {
    let bytes: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => {
                tokens.push((i, Token::LParen));
                i += 1;
            }
            ')' => {
                tokens.push((i, Token::RParen));
                i += 1;
            }
            '&' => {
                if bytes.get(i + 1) == Some(&'&') {
                    tokens.push((i, Token::And));
                    i += 2;
                } else {
                    return Err(parse_err(i, "expected `&&`"));
                }
            }
            '|' => {
                if bytes.get(i + 1) == Some(&'|') {
                    tokens.push((i, Token::Or));
                    i += 2;
                } else {
                    return Err(parse_err(i, "expected `||`"));
                }
            }
            '=' => {
                if bytes.get(i + 1) == Some(&'=') {
                    tokens.push((i, Token::Op(CmpOp::Eq)));
                    i += 2;
                } else {
                    return Err(parse_err(i, "expected `==`"));
                }
            }
            '!' => {
                if bytes.get(i + 1) == Some(&'=') {
                    tokens.push((i, Token::Op(CmpOp::Ne)));
                    i += 2;
                } else {
                    tokens.push((i, Token::Not));
                    i += 1;
                }
            }
            '<' => {
                if bytes.get(i + 1) == Some(&'=') {
                    tokens.push((i, Token::Op(CmpOp::Le)));
                    i += 2;
                } else {
                    tokens.push((i, Token::Op(CmpOp::Lt)));
                    i += 1;
                }
            }
            '>' => {
                if bytes.get(i + 1) == Some(&'=') {
                    tokens.push((i, Token::Op(CmpOp::Ge)));
                    i += 2;
                } else {
                    tokens.push((i, Token::Op(CmpOp::Gt)));
                    i += 1;
                }
            }
            '"' | '\'' => {
                let quote = c;
                let start = i;
                i += 1;
                let mut text = String::new();
                loop {
                    match bytes.get(i) {
                        Some(&ch) if ch == quote => {
                            i += 1;
                            break;
                        }
                        Some(&ch) => {
                            text.push(ch);
                            i += 1;
                        }
                        None => return Err(parse_err(start, "unterminated string literal")),
                    }
                }
                tokens.push((start, Token::Str(text)));
            }
            '-' | '0'..='9' => {
                let start = i;
                let negative = c == '-';
                if negative {
                    i += 1;
                    if !bytes.get(i).is_some_and(|c| c.is_ascii_digit()) {
                        return Err(parse_err(start, "expected a digit after `-`"));
                    }
                }
                let mut value: i64 = 0;
                while let Some(&d) = bytes.get(i) {
                    let Some(digit) = d.to_digit(10) else { break };
                    value = value
                        .checked_mul(10)
                        .and_then(|v| v.checked_add(digit as i64))
                        .ok_or_else(|| parse_err(start, "integer literal out of range"))?;
                    i += 1;
                }
                tokens.push((start, Token::Int(if negative { -value } else { value })));
            }
            _ if is_ident_start(c) => {
                let start = i;
                let mut ident = String::new();
                while let Some(&ch) = bytes.get(i) {
                    if !is_ident_char(ch) {
                        break;
                    }
                    ident.push(ch);
                    i += 1;
                }
                tokens.push((start, Token::Ident(ident)));
            }
            _ => return Err(parse_err(i, format!("unexpected character {c:?}"))),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn next(&mut self) -> Option<(usize, Token)> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |(o, _)| *o)
    }

    fn or_expr(&mut self) -> Result<Expr, ConstraintError> {
        let mut lhs = self.and_expr()?;
        while self.peek() == Some(&Token::Or) {
            self.next();
            let rhs = self.and_expr()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, ConstraintError> {
        let mut lhs = self.unary_expr()?;
        while self.peek() == Some(&Token::And) {
            self.next();
            let rhs = self.unary_expr()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary_expr(&mut self) -> Result<Expr, ConstraintError> {
        if self.peek() == Some(&Token::Not) {
            self.next();
            let inner = self.unary_expr()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.cmp_expr()
    }

    fn cmp_expr(&mut self) -> Result<Expr, ConstraintError> {
        let lhs = self.primary()?;
        if let Some(&Token::Op(op)) = self.peek() {
            self.next();
            let rhs = self.primary()?;
            return Ok(Expr::Cmp(Box::new(lhs), op, Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn primary(&mut self) -> Result<Expr, ConstraintError> {
        let offset = self.offset();
        match self.next() {
            Some((_, Token::LParen)) => {
                let inner = self.or_expr()?;
                match self.next() {
                    Some((_, Token::RParen)) => Ok(inner),
                    _ => Err(parse_err(offset, "unbalanced `(`")),
                }
            }
            Some((_, Token::Str(s))) => Ok(Expr::Str(s)),
            Some((_, Token::Int(v))) => Ok(Expr::Int(v)),
            Some((at, Token::Ident(ident))) => match ident.as_str() {
                "true" => Ok(Expr::Bool(true)),
                "false" => Ok(Expr::Bool(false)),
                _ => match ident.strip_prefix("device.") {
                    Some(name) if !name.is_empty() => Ok(Expr::Attr(name.to_string())),
                    _ => Err(parse_err(
                        at,
                        format!("unknown identifier {ident:?}; attribute references use `device.<name>`"),
                    )),
                },
            },
            Some((at, tok)) => Err(parse_err(at, format!("unexpected token {tok:?}"))),
            None => Err(parse_err(offset, "unexpected end of expression")),
        }
    }
}

pub(crate) fn parse(input: &str) -> Result<Expr, ConstraintError> {
    let tokens = lex(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: input.chars().count(),
    };
    let expr = parser.or_expr()?;
    if let Some((at, tok)) = parser.next() {
        return Err(parse_err(at, format!("trailing input at {tok:?}")));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_attribute_comparison() {
        let expr = parse(r#"device.model == "foozer-1000""#).unwrap();
        assert_eq!(
            expr,
            Expr::Cmp(
                Box::new(Expr::Attr("model".to_string())),
                CmpOp::Eq,
                Box::new(Expr::Str("foozer-1000".to_string())),
            )
        );
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expr = parse("true || false && false").unwrap();
        match expr {
            Expr::Or(lhs, rhs) => {
                assert_eq!(*lhs, Expr::Bool(true));
                assert!(matches!(*rhs, Expr::And(..)));
            }
            other => panic!("wrong shape: {other:?}"),
        }
    }

    #[test]
    fn not_applies_to_parenthesized_groups() {
        let expr = parse("!(device.a == 1 || device.b == 2)").unwrap();
        assert!(matches!(expr, Expr::Not(inner) if matches!(*inner, Expr::Or(..))));
    }

    #[test]
    fn hyphens_and_slashes_stay_in_identifiers() {
        let expr = parse("device.example.com/foo-bar == 3").unwrap();
        assert!(matches!(
            expr,
            Expr::Cmp(lhs, CmpOp::Eq, _) if *lhs == Expr::Attr("example.com/foo-bar".to_string())
        ));
    }

    #[test]
    fn negative_integers() {
        assert!(parse("device.x == -4").is_ok());
    }

    #[test]
    fn rejects_bare_identifier() {
        assert!(parse("model == 1").is_err());
    }

    #[test]
    fn rejects_single_equals() {
        assert!(matches!(
            parse("device.a = 1"),
            Err(ConstraintError::Parse { .. })
        ));
    }

    #[test]
    fn rejects_unterminated_string() {
        assert!(parse(r#"device.a == "open"#).is_err());
    }
}

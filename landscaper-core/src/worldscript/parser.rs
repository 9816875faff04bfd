//! Script source tokenizer and recursive descent parser.

use super::ast::{Expr, Stmt, Token};
use super::CompileError;

/// Drop `#` comments. The grammar has no string literals, so a `#`
/// anywhere on a line starts a comment.
pub fn strip_comments(code: &str) -> String {
    code.lines()
        .map(|line| match line.find('#') {
            Some(i) => line[..i].trim_end(),
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

const KEYWORDS: &[&str] = &["if", "then", "end", "goto", "return"];

pub fn tokenize(code: &str) -> Result<Vec<Token>, CompileError> {
    let chars: Vec<char> = code.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        // Two-character operators and the label delimiter first.
        if i + 1 < chars.len() {
            let pair: String = chars[i..i + 2].iter().collect();
            match pair.as_str() {
                "::" => {
                    tokens.push(Token::LabelDelim);
                    i += 2;
                    continue;
                }
                "<=" | ">=" | "==" | "!=" | "<<" | ">>" => {
                    tokens.push(Token::Operator(pair));
                    i += 2;
                    continue;
                }
                _ => {}
            }
        }

        match c {
            '<' | '>' | '!' | '-' | '+' | '*' | '/' | '|' | '&' => {
                tokens.push(Token::Operator(c.to_string()));
                i += 1;
            }
            '.' | '(' | ')' | ',' | '=' | '[' | ']' => {
                tokens.push(Token::Punct(c));
                i += 1;
            }
            '0' if i + 1 < chars.len() && chars[i + 1] == 'x' => {
                let start = i + 2;
                let mut end = start;
                while end < chars.len() && chars[end].is_ascii_hexdigit() {
                    end += 1;
                }
                let digits: String = chars[start..end].iter().collect();
                let value = i64::from_str_radix(&digits, 16).map_err(|_| {
                    CompileError::UnknownToken {
                        token: format!("0x{digits}"),
                    }
                })?;
                tokens.push(Token::Number(value));
                i = end;
            }
            '0'..='9' => {
                let mut end = i;
                while end < chars.len() && chars[end].is_ascii_digit() {
                    end += 1;
                }
                let digits: String = chars[i..end].iter().collect();
                let value = digits.parse().map_err(|_| CompileError::UnknownToken {
                    token: digits.clone(),
                })?;
                tokens.push(Token::Number(value));
                i = end;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = i;
                while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_')
                {
                    end += 1;
                }
                let word: String = chars[i..end].iter().collect();
                if word == "or" || word == "and" {
                    tokens.push(Token::Operator(word));
                } else if KEYWORDS.contains(&word.as_str()) {
                    tokens.push(Token::Keyword(word));
                } else {
                    tokens.push(Token::Ident(word));
                }
                i = end;
            }
            other => {
                return Err(CompileError::UnknownToken {
                    token: other.to_string(),
                });
            }
        }
    }

    Ok(tokens)
}

pub struct Parser {
    tokens: Vec<Token>,
    index: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, index: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn advance(&mut self) -> Result<Token, CompileError> {
        let token = self
            .tokens
            .get(self.index)
            .cloned()
            .ok_or(CompileError::UnexpectedEnd)?;
        self.index += 1;
        Ok(token)
    }

    fn expect_punct(&mut self, expected: char) -> Result<(), CompileError> {
        match self.advance()? {
            Token::Punct(c) if c == expected => Ok(()),
            other => Err(CompileError::UnexpectedToken {
                expected: format!("'{expected}'"),
                found: other.describe(),
            }),
        }
    }

    fn expect_ident(&mut self) -> Result<String, CompileError> {
        match self.advance()? {
            Token::Ident(name) => Ok(name),
            other => Err(CompileError::UnexpectedToken {
                expected: "identifier".to_string(),
                found: other.describe(),
            }),
        }
    }

    pub fn parse(&mut self) -> Result<Vec<Stmt>, CompileError> {
        let mut statements = Vec::new();
        while self.peek().is_some() {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<Stmt, CompileError> {
        match self.peek() {
            Some(Token::Keyword(kw)) => match kw.as_str() {
                "if" => self.parse_if(),
                "goto" => {
                    self.advance()?;
                    Ok(Stmt::Goto(self.expect_ident()?))
                }
                "return" => {
                    self.advance()?;
                    Ok(Stmt::Return)
                }
                other => Err(CompileError::UnexpectedToken {
                    expected: "statement".to_string(),
                    found: format!("keyword '{other}'"),
                }),
            },
            Some(Token::LabelDelim) => {
                self.advance()?;
                let label = self.expect_ident()?;
                match self.advance()? {
                    Token::LabelDelim => Ok(Stmt::Label(label)),
                    other => Err(CompileError::UnexpectedToken {
                        expected: "'::'".to_string(),
                        found: other.describe(),
                    }),
                }
            }
            Some(_) => {
                let expr = self.parse_expression()?;
                if matches!(self.peek(), Some(Token::Punct('='))) {
                    self.advance()?;
                    let right = self.parse_expression()?;
                    Ok(Stmt::Assign { left: expr, right })
                } else {
                    Ok(Stmt::Expr(expr))
                }
            }
            None => Err(CompileError::UnexpectedEnd),
        }
    }

    fn parse_if(&mut self) -> Result<Stmt, CompileError> {
        self.advance()?;
        let condition = self.parse_expression()?;
        match self.advance()? {
            Token::Keyword(kw) if kw == "then" => {}
            Token::Keyword(kw) if kw == "goto" => {
                return Ok(Stmt::GotoIf {
                    condition,
                    label: self.expect_ident()?,
                });
            }
            other => {
                return Err(CompileError::UnexpectedToken {
                    expected: "'then' or 'goto'".to_string(),
                    found: other.describe(),
                })
            }
        }
        let mut then_branch = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Keyword(kw)) if kw == "end" => {
                    self.advance()?;
                    break;
                }
                Some(_) => then_branch.push(self.parse_statement()?),
                None => return Err(CompileError::UnexpectedEnd),
            }
        }
        Ok(Stmt::If {
            condition,
            then_branch,
        })
    }

    fn parse_expression(&mut self) -> Result<Expr, CompileError> {
        self.parse_binary(1)
    }

    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expr, CompileError> {
        let mut left = self.parse_unary()?;
        while let Some(Token::Operator(op)) = self.peek() {
            let op = op.clone();
            let precedence = precedence(&op);
            if precedence == 0 || precedence < min_precedence {
                break;
            }
            self.advance()?;
            let right = self.parse_binary(precedence + 1)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, CompileError> {
        if let Some(Token::Operator(op)) = self.peek() {
            if op == "!" || op == "-" {
                let op = op.clone();
                self.advance()?;
                let operand = self.parse_unary()?;
                return Ok(Expr::Unary {
                    op,
                    operand: Box::new(operand),
                });
            }
        }
        self.parse_member_or_call()
    }

    fn parse_member_or_call(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Some(Token::Punct('.')) => {
                    self.advance()?;
                    let property = self.expect_ident()?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property,
                    };
                }
                Some(Token::Punct('[')) => {
                    self.advance()?;
                    let index = self.parse_expression()?;
                    self.expect_punct(']')?;
                    expr = Expr::Index {
                        base: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                Some(Token::Punct('(')) => {
                    self.advance()?;
                    let mut args = Vec::new();
                    if !matches!(self.peek(), Some(Token::Punct(')'))) {
                        args.push(self.parse_expression()?);
                        while matches!(self.peek(), Some(Token::Punct(','))) {
                            self.advance()?;
                            args.push(self.parse_expression()?);
                        }
                    }
                    self.expect_punct(')')?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, CompileError> {
        match self.advance()? {
            Token::Number(value) => Ok(Expr::Num(value)),
            Token::Ident(name) => Ok(Expr::Ident(name)),
            Token::Punct('(') => {
                let expr = self.parse_expression()?;
                self.expect_punct(')')?;
                Ok(expr)
            }
            other => Err(CompileError::UnexpectedToken {
                expected: "expression".to_string(),
                found: other.describe(),
            }),
        }
    }
}

fn precedence(op: &str) -> u8 {
    match op {
        "or" => 1,
        "and" => 2,
        "<" | ">" | "<=" | ">=" | "==" | "!=" => 3,
        "<<" | ">>" => 4,
        "+" | "-" => 5,
        "*" | "/" => 6,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Vec<Stmt> {
        Parser::new(tokenize(source).unwrap()).parse().unwrap()
    }

    #[test]
    fn precedence_binds_comparison_over_and() {
        let stmts = parse("if a.b == 1 and c.d > 2 then return end");
        let Stmt::If { condition, .. } = &stmts[0] else {
            panic!("expected if");
        };
        let Expr::Binary { op, .. } = condition else {
            panic!("expected binary");
        };
        assert_eq!(op, "and");
    }

    #[test]
    fn member_index_call_chain() {
        let stmts = parse("Savemap[0xBA5].bit[3] = 1");
        assert!(matches!(
            stmts[0],
            Stmt::Assign {
                left: Expr::Index { .. },
                ..
            }
        ));
    }

    #[test]
    fn labels_and_gotos_parse() {
        let stmts = parse("::start::\ngoto start");
        assert_eq!(
            stmts,
            vec![
                Stmt::Label("start".to_string()),
                Stmt::Goto("start".to_string())
            ]
        );
    }

    #[test]
    fn hex_and_decimal_literals() {
        let stmts = parse("f.g(0x1F, 31)");
        let Stmt::Expr(Expr::Call { args, .. }) = &stmts[0] else {
            panic!("expected call");
        };
        assert_eq!(args, &vec![Expr::Num(31), Expr::Num(31)]);
    }

    #[test]
    fn chained_unary_operators() {
        let stmts = parse("if !!a.b then return end");
        let Stmt::If { condition, .. } = &stmts[0] else {
            panic!("expected if");
        };
        assert!(matches!(condition, Expr::Unary { .. }));
    }

    #[test]
    fn comments_strip_to_line_ends() {
        assert_eq!(strip_comments("a = 1 # set\n# whole line\nb"), "a = 1\n\nb");
    }
}

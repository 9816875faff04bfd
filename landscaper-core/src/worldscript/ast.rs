//! Syntax tree shared by the decompiler (which builds it from opcode
//! streams) and the compiler (which parses it from script source).

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Numeric literal printed in decimal.
    Num(i64),
    /// Numeric literal printed as 0x-prefixed uppercase hex.
    Hex(u32),
    Ident(String),
    Member {
        object: Box<Expr>,
        property: String,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Binary {
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: String,
        operand: Box<Expr>,
    },
}

impl Expr {
    pub fn ident(name: &str) -> Expr {
        Expr::Ident(name.to_string())
    }

    pub fn member(object: Expr, property: &str) -> Expr {
        Expr::Member {
            object: Box::new(object),
            property: property.to_string(),
        }
    }

    pub fn index(base: Expr, index: Expr) -> Expr {
        Expr::Index {
            base: Box::new(base),
            index: Box::new(index),
        }
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
        Expr::Call {
            callee: Box::new(callee),
            args,
        }
    }

    /// Numeric value if this is a literal of either spelling.
    pub fn literal_value(&self) -> Option<i64> {
        match self {
            Expr::Num(v) => Some(*v),
            Expr::Hex(v) => Some(*v as i64),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Expr(Expr),
    Assign { left: Expr, right: Expr },
    If { condition: Expr, then_branch: Vec<Stmt> },
    /// Single-line conditional branch: `if <cond> goto label`.
    GotoIf { condition: Expr, label: String },
    Goto(String),
    Label(String),
    Return,
    /// Used when a single source line yields a label plus a statement.
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Number(i64),
    Ident(String),
    Keyword(String),
    Operator(String),
    Punct(char),
    LabelDelim,
}

impl Token {
    pub fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {n}"),
            Token::Ident(s) => format!("identifier '{s}'"),
            Token::Keyword(s) => format!("keyword '{s}'"),
            Token::Operator(s) => format!("operator '{s}'"),
            Token::Punct(c) => format!("'{c}'"),
            Token::LabelDelim => "'::'".to_string(),
        }
    }
}

/// Compiler output before label resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ins {
    Op {
        mnemonic: String,
        params: Vec<String>,
    },
    Label(String),
}

impl Ins {
    pub fn op(mnemonic: &str) -> Ins {
        Ins::Op {
            mnemonic: mnemonic.to_string(),
            params: Vec::new(),
        }
    }

    pub fn op_with(mnemonic: &str, param: String) -> Ins {
        Ins::Op {
            mnemonic: mnemonic.to_string(),
            params: vec![param],
        }
    }
}

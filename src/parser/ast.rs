use crate::span::Span;
use serde::Serialize;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StmtKind {
    VariableDeclaration(VariableDeclaration),
    FunctionDeclaration(Rc<FunctionDeclaration>),
    ClassDeclaration(Rc<ClassDeclaration>),
    If {
        condition: Expr,
        body: Vec<Stmt>,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
    },
    For(Box<ForLoop>),
    Break,
    Return(Expr),
    Expression(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableDeclaration {
    pub identifier: String,
    pub constant: bool,
    pub value: Option<Expr>,
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDeclaration {
    pub name: Option<String>,
    pub parameters: Vec<String>,
    pub body: Vec<Stmt>,
    pub is_async: bool,
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassDeclaration {
    pub name: String,
    pub superclass: Option<String>,
    pub members: Vec<ClassMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMember {
    pub visibility: Visibility,
    pub kind: MemberKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MemberKind {
    Property(VariableDeclaration),
    Method(Rc<FunctionDeclaration>),
}

/// `for (let i = 0; i < n; i++) { ... }`. The iterator is always a reassignment of the loop
/// variable, checked by the parser.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForLoop {
    pub variable: VariableDeclaration,
    pub condition: Expr,
    pub iterator: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExprKind {
    // Primary Expressions
    Identifier(String),
    NumericLiteral(f64),
    StringLiteral(String),
    NullLiteral,

    // Literals with children
    ObjectLiteral(Vec<Property>),
    ArrayLiteral(Vec<Expr>),

    // Operator Expressions
    Binary {
        left: Box<Expr>,
        operator: BinaryOperator,
        right: Box<Expr>,
    },
    Reassignment {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Member {
        object: Box<Expr>,
        property: Box<Expr>,
        computed: bool,
    },
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
    },

    // Function expression, named or anonymous
    Function(Rc<FunctionDeclaration>),

    ClassInstantiation {
        class: Box<Expr>,
        arguments: Vec<Expr>,
    },
}

/// `{ key }` is shorthand for `{ key: key }` and leaves `value` empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub key: String,
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOperator {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "*")]
    Multiply,
    #[serde(rename = "/")]
    Divide,
    #[serde(rename = "%")]
    Modulo,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "<=")]
    LessEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = ">=")]
    GreaterEqual,
    #[serde(rename = "??")]
    Nullish,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Nullish => "??",
        };
        f.write_str(symbol)
    }
}

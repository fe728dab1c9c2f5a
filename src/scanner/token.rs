use crate::span::Span;
use serde::Serialize;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Token {
    pub token_type: TokenType,
    pub value: String,
    pub span: Span,
}

impl Token {
    pub fn new(token_type: TokenType, value: impl Into<String>, span: Span) -> Self {
        Token {
            token_type,
            value: value.into(),
            span,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TokenType {
    // Single-character tokens
    LeftParen,    // (
    RightParen,   // )
    LeftBrace,    // {
    RightBrace,   // }
    LeftBracket,  // [
    RightBracket, // ]
    Comma,        // ,
    Dot,          // .
    Colon,        // :
    Semicolon,    // ;
    Bang,         // !
    Question,     // ?
    Assign,       // =

    // Arithmetic
    Plus,    // +
    Minus,   // -
    Star,    // *
    Slash,   // /
    Percent, // %

    // Comparison
    Equal,        // ==
    NotEqual,     // !=
    Greater,      // >
    GreaterEqual, // >=
    Less,         // <
    LessEqual,    // <=
    Nullish,      // ??

    // Reassignment shorthands
    PlusPlus,     // ++
    MinusMinus,   // --
    PlusEqual,    // +=
    MinusEqual,   // -=
    StarEqual,    // *=
    SlashEqual,   // /=
    PercentEqual, // %=

    // Literals
    Identifier, // variable names, function names
    String,     // "hello world", value holds the text between the quotes
    Number,     // 123, 45.67

    // Keywords
    Let,      // let
    Const,    // const
    Function, // function
    Async,    // async
    Return,   // return
    While,    // while
    For,      // for
    If,       // if
    Break,    // break

    // Class dialect keywords
    New,     // new
    Extends, // extends
    This,    // this
    Class,   // class
    Public,  // public
    Private, // private
    Super,   // super

    Eof, // end of file
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenType::LeftParen => "'('",
            TokenType::RightParen => "')'",
            TokenType::LeftBrace => "'{'",
            TokenType::RightBrace => "'}'",
            TokenType::LeftBracket => "'['",
            TokenType::RightBracket => "']'",
            TokenType::Comma => "','",
            TokenType::Dot => "'.'",
            TokenType::Colon => "':'",
            TokenType::Semicolon => "';'",
            TokenType::Bang => "'!'",
            TokenType::Question => "'?'",
            TokenType::Assign => "'='",
            TokenType::Plus => "'+'",
            TokenType::Minus => "'-'",
            TokenType::Star => "'*'",
            TokenType::Slash => "'/'",
            TokenType::Percent => "'%'",
            TokenType::Equal => "'=='",
            TokenType::NotEqual => "'!='",
            TokenType::Greater => "'>'",
            TokenType::GreaterEqual => "'>='",
            TokenType::Less => "'<'",
            TokenType::LessEqual => "'<='",
            TokenType::Nullish => "'??'",
            TokenType::PlusPlus => "'++'",
            TokenType::MinusMinus => "'--'",
            TokenType::PlusEqual => "'+='",
            TokenType::MinusEqual => "'-='",
            TokenType::StarEqual => "'*='",
            TokenType::SlashEqual => "'/='",
            TokenType::PercentEqual => "'%='",
            TokenType::Identifier => "identifier",
            TokenType::String => "string",
            TokenType::Number => "number",
            TokenType::Let => "'let'",
            TokenType::Const => "'const'",
            TokenType::Function => "'function'",
            TokenType::Async => "'async'",
            TokenType::Return => "'return'",
            TokenType::While => "'while'",
            TokenType::For => "'for'",
            TokenType::If => "'if'",
            TokenType::Break => "'break'",
            TokenType::New => "'new'",
            TokenType::Extends => "'extends'",
            TokenType::This => "'this'",
            TokenType::Class => "'class'",
            TokenType::Public => "'public'",
            TokenType::Private => "'private'",
            TokenType::Super => "'super'",
            TokenType::Eof => "end of file",
        };
        f.write_str(text)
    }
}

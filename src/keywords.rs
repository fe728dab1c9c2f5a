use crate::scanner::token::TokenType;

// The keyword table is fixed: every spelling maps to exactly one token kind. Words such as
// `true`, `false` and `null` are not keywords; they are constants in the global scope.
const KEYWORDS: &[(&str, TokenType)] = &[
    ("let", TokenType::Let),
    ("const", TokenType::Const),
    ("function", TokenType::Function),
    ("async", TokenType::Async),
    ("return", TokenType::Return),
    ("while", TokenType::While),
    ("for", TokenType::For),
    ("if", TokenType::If),
    ("break", TokenType::Break),
    ("new", TokenType::New),
    ("extends", TokenType::Extends),
    ("this", TokenType::This),
    ("class", TokenType::Class),
    ("public", TokenType::Public),
    ("private", TokenType::Private),
    ("super", TokenType::Super),
];

pub fn keyword(text: &str) -> Option<TokenType> {
    KEYWORDS
        .iter()
        .find(|(spelling, _)| *spelling == text)
        .map(|(_, token_type)| *token_type)
}


pub mod config;
pub mod diagnostics;
pub mod error;
pub mod host;
pub mod interpreter;
pub mod keywords;
pub mod parser;
pub mod scanner;
pub mod span;

pub use error::DumError;
pub use interpreter::evaluate;
pub use parser::produce_ast;
pub use scanner::tokenize;

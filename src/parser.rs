pub mod ast;

use crate::error::{DumError, ParseError, ParseErrorKind};
use crate::parser::ast::{
    BinaryOperator, ClassDeclaration, ClassMember, Expr, ExprKind, ForLoop, FunctionDeclaration,
    MemberKind, Program, Property, Stmt, StmtKind, VariableDeclaration, Visibility,
};
use crate::scanner::token::{Token, TokenType};
use crate::scanner::tokenize;
use crate::span::Span;
use log::debug;
use std::rc::Rc;
use std::time::Instant;

/// Name of the class method run on instantiation.
pub const CONSTRUCTOR: &str = "constructor";

const EQUALITY_OPERATORS: &[(TokenType, BinaryOperator)] = &[
    (TokenType::Equal, BinaryOperator::Equal),
    (TokenType::NotEqual, BinaryOperator::NotEqual),
    (TokenType::Less, BinaryOperator::Less),
    (TokenType::LessEqual, BinaryOperator::LessEqual),
    (TokenType::Greater, BinaryOperator::Greater),
    (TokenType::GreaterEqual, BinaryOperator::GreaterEqual),
    (TokenType::Nullish, BinaryOperator::Nullish),
];

const ADDITIVE_OPERATORS: &[(TokenType, BinaryOperator)] = &[
    (TokenType::Plus, BinaryOperator::Add),
    (TokenType::Minus, BinaryOperator::Subtract),
];

const MULTIPLICATIVE_OPERATORS: &[(TokenType, BinaryOperator)] = &[
    (TokenType::Slash, BinaryOperator::Divide),
    (TokenType::Star, BinaryOperator::Multiply),
    (TokenType::Percent, BinaryOperator::Modulo),
];

/// Tokenizes and parses `source` into a [`Program`].
pub fn produce_ast(source: &str) -> Result<Program, DumError> {
    let tokens = tokenize(source)?;
    let started = Instant::now();
    let program = Parser::new(tokens).parse()?;
    debug!(
        "parsed {} top-level statements in {:?}",
        program.body.len(),
        started.elapsed()
    );
    Ok(program)
}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.token_type) != Some(TokenType::Eof) {
            let span = tokens.last().map(|t| t.span).unwrap_or_default();
            tokens.push(Token::new(TokenType::Eof, "", span));
        }
        Self { tokens, current: 0 }
    }

    // utility methods
    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    fn advance(&mut self) -> &Token {
        let index = self.current;
        if !self.is_at_end() {
            self.current += 1;
        }
        &self.tokens[index]
    }

    fn check(&self, token_type: TokenType) -> bool {
        self.peek().token_type == token_type
    }

    fn match_any(&mut self, types: &[TokenType]) -> bool {
        if types.iter().any(|t| self.check(*t)) {
            self.advance();
            return true;
        }
        false
    }

    fn skip_semicolons(&mut self) {
        while self.check(TokenType::Semicolon) {
            self.advance();
        }
    }

    fn error_expected(&self, expected: TokenType, context: &str) -> ParseError {
        let current = self.peek();
        ParseError {
            span: current.span,
            kind: ParseErrorKind::Unexpected {
                expected,
                found: current.token_type,
                value: current.value.clone(),
                context: context.to_string(),
            },
        }
    }

    fn invalid(&self, span: Span, message: impl Into<String>) -> ParseError {
        ParseError {
            span,
            kind: ParseErrorKind::Invalid(message.into()),
        }
    }

    fn consume(&mut self, token_type: TokenType, context: &str) -> Result<&Token, ParseError> {
        if self.check(token_type) {
            Ok(self.advance())
        } else {
            Err(self.error_expected(token_type, context))
        }
    }

    fn consume_identifier(&mut self, context: &str) -> Result<String, ParseError> {
        Ok(self.consume(TokenType::Identifier, context)?.value.clone())
    }

    pub fn parse(mut self) -> Result<Program, ParseError> {
        let mut body = Vec::new();
        loop {
            self.skip_semicolons();
            if self.is_at_end() {
                break;
            }
            body.push(self.statement()?);
        }
        Ok(Program { body })
    }

    fn block(&mut self, context: &str) -> Result<Vec<Stmt>, ParseError> {
        self.consume(TokenType::LeftBrace, context)?;
        let mut body = Vec::new();
        loop {
            self.skip_semicolons();
            if self.check(TokenType::RightBrace) || self.is_at_end() {
                break;
            }
            body.push(self.statement()?);
        }
        self.consume(TokenType::RightBrace, "to close the block")?;
        Ok(body)
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        let span = self.peek().span;
        let kind = match self.peek().token_type {
            TokenType::Let | TokenType::Const => {
                StmtKind::VariableDeclaration(self.variable_declaration(None)?)
            }
            TokenType::Function | TokenType::Async => {
                StmtKind::FunctionDeclaration(Rc::new(self.function_declaration(None)?))
            }
            TokenType::Class => StmtKind::ClassDeclaration(Rc::new(self.class_declaration()?)),
            TokenType::Public | TokenType::Private => {
                return Err(self.invalid(
                    span,
                    "'public' and 'private' may only mark members of a class body",
                ))
            }
            TokenType::Return => self.return_statement()?,
            TokenType::Break => {
                self.advance();
                StmtKind::Break
            }
            TokenType::If => {
                let (condition, body) = self.conditional()?;
                StmtKind::If { condition, body }
            }
            TokenType::While => {
                let (condition, body) = self.conditional()?;
                StmtKind::While { condition, body }
            }
            TokenType::For => StmtKind::For(Box::new(self.for_loop()?)),
            _ => StmtKind::Expression(self.expression()?),
        };
        self.match_any(&[TokenType::Semicolon]);
        Ok(Stmt { kind, span })
    }

    fn variable_declaration(
        &mut self,
        visibility: Option<Visibility>,
    ) -> Result<VariableDeclaration, ParseError> {
        let span = self.peek().span;
        let constant = self.advance().token_type == TokenType::Const;
        let identifier = self.consume_identifier("after 'let' or 'const'")?;

        if self.check(TokenType::Semicolon) {
            if constant {
                return Err(self.invalid(
                    span,
                    format!("constant '{}' must be given a value", identifier),
                ));
            }
            return Ok(VariableDeclaration {
                identifier,
                constant,
                value: None,
                visibility,
            });
        }

        self.consume(TokenType::Assign, "in variable declaration")?;
        let value = self.expression()?;
        Ok(VariableDeclaration {
            identifier,
            constant,
            value: Some(value),
            visibility,
        })
    }

    fn function_declaration(
        &mut self,
        visibility: Option<Visibility>,
    ) -> Result<FunctionDeclaration, ParseError> {
        let span = self.peek().span;
        let is_async = self.match_any(&[TokenType::Async]);
        let context = if is_async {
            "after 'async'"
        } else {
            "to declare a function"
        };
        self.consume(TokenType::Function, context)?;

        let name = if self.check(TokenType::Identifier) {
            Some(self.advance().value.clone())
        } else {
            None
        };
        if name.is_none() && visibility.is_some() {
            return Err(self.invalid(span, "anonymous functions cannot be public or private"));
        }

        self.consume(TokenType::LeftParen, "to open the parameter list")?;
        let mut parameters = Vec::new();
        if !self.check(TokenType::RightParen) {
            loop {
                if !self.check(TokenType::Identifier) {
                    let found = self.peek();
                    return Err(self.invalid(
                        found.span,
                        format!(
                            "function parameters must be plain identifiers, got {} '{}'",
                            found.token_type, found.value
                        ),
                    ));
                }
                parameters.push(self.advance().value.clone());
                if !self.match_any(&[TokenType::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "to close the parameter list")?;
        let body = self.block("to open the function body")?;

        Ok(FunctionDeclaration {
            name,
            parameters,
            body,
            is_async,
            visibility,
        })
    }

    fn class_declaration(&mut self) -> Result<ClassDeclaration, ParseError> {
        self.advance(); // consume class
        let name = self.consume_identifier("after 'class'")?;
        if self.check(TokenType::LeftParen) {
            return Err(self.invalid(
                self.peek().span,
                format!("class '{}' is not a function and takes no parameters", name),
            ));
        }

        let superclass = if self.match_any(&[TokenType::Extends]) {
            Some(self.consume_identifier("after 'extends'")?)
        } else {
            None
        };

        self.consume(TokenType::LeftBrace, "to open the class body")?;
        let mut members = Vec::new();
        loop {
            self.skip_semicolons();
            if self.check(TokenType::RightBrace) || self.is_at_end() {
                break;
            }
            members.push(self.class_member()?);
        }
        self.consume(TokenType::RightBrace, "to close the class body")?;

        Ok(ClassDeclaration {
            name,
            superclass,
            members,
        })
    }

    fn class_member(&mut self) -> Result<ClassMember, ParseError> {
        let span = self.peek().span;
        let visibility = match self.peek().token_type {
            TokenType::Public => Some(Visibility::Public),
            TokenType::Private => Some(Visibility::Private),
            _ => None,
        };
        if visibility.is_some() {
            self.advance();
        }

        match self.peek().token_type {
            TokenType::Let | TokenType::Const => {
                let property = self.variable_declaration(visibility)?;
                let Some(visibility) = visibility else {
                    return Err(self.invalid(
                        span,
                        format!(
                            "class property '{}' must be marked public or private",
                            property.identifier
                        ),
                    ));
                };
                self.match_any(&[TokenType::Semicolon]);
                Ok(ClassMember {
                    visibility,
                    kind: MemberKind::Property(property),
                })
            }
            TokenType::Function | TokenType::Async => {
                let method = self.function_declaration(visibility)?;
                let Some(name) = method.name.as_deref() else {
                    return Err(self.invalid(span, "class methods must be named"));
                };
                let is_constructor = name == CONSTRUCTOR;
                if is_constructor && contains_return(&method.body) {
                    return Err(self.invalid(span, "a constructor cannot return a value"));
                }
                let visibility = match visibility {
                    Some(visibility) => visibility,
                    None if is_constructor => Visibility::Public,
                    None => {
                        return Err(self.invalid(
                            span,
                            format!("class method '{}' must be marked public or private", name),
                        ))
                    }
                };
                Ok(ClassMember {
                    visibility,
                    kind: MemberKind::Method(Rc::new(method)),
                })
            }
            _ => {
                let found = self.peek();
                Err(self.invalid(
                    found.span,
                    format!(
                        "class bodies may only contain property and method declarations, got {} '{}'",
                        found.token_type, found.value
                    ),
                ))
            }
        }
    }

    fn return_statement(&mut self) -> Result<StmtKind, ParseError> {
        let span = self.advance().span; // consume return
        let value = if self.check(TokenType::RightBrace)
            || self.check(TokenType::Semicolon)
            || self.is_at_end()
        {
            Expr {
                kind: ExprKind::NullLiteral,
                span,
            }
        } else {
            self.expression()?
        };
        Ok(StmtKind::Return(value))
    }

    // `if (...) { ... }` and `while (...) { ... }` share their shape
    fn conditional(&mut self) -> Result<(Expr, Vec<Stmt>), ParseError> {
        let keyword = self.advance().token_type;
        self.consume(TokenType::LeftParen, &format!("after {}", keyword))?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "to close the condition")?;
        let body = self.block("to open the body")?;
        Ok((condition, body))
    }

    fn for_loop(&mut self) -> Result<ForLoop, ParseError> {
        self.advance(); // consume for
        self.consume(TokenType::LeftParen, "after 'for'")?;

        if !matches!(self.peek().token_type, TokenType::Let | TokenType::Const) {
            return Err(self.error_expected(TokenType::Let, "to declare the loop variable"));
        }
        let variable_span = self.peek().span;
        let variable = self.variable_declaration(None)?;
        if !matches!(
            variable.value,
            Some(Expr {
                kind: ExprKind::NumericLiteral(_),
                ..
            })
        ) {
            return Err(self.invalid(
                variable_span,
                format!(
                    "for loop variable '{}' must be initialized with a number literal",
                    variable.identifier
                ),
            ));
        }
        self.consume(TokenType::Semicolon, "after the loop variable")?;

        let condition = self.expression()?;
        self.consume(TokenType::Semicolon, "after the loop condition")?;

        let iterator = self.assignment(true)?;
        let steps_loop_variable = match &iterator.kind {
            ExprKind::Reassignment { target, .. } => {
                matches!(&target.kind, ExprKind::Identifier(name) if *name == variable.identifier)
            }
            _ => false,
        };
        if !steps_loop_variable {
            return Err(self.invalid(
                iterator.span,
                format!(
                    "for loop iterator must reassign '{}', e.g. {}++",
                    variable.identifier, variable.identifier
                ),
            ));
        }
        self.consume(TokenType::RightParen, "to close the for loop header")?;
        let body = self.block("to open the loop body")?;

        Ok(ForLoop {
            variable,
            condition,
            iterator,
            body,
        })
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        if matches!(
            self.peek().token_type,
            TokenType::Function | TokenType::Async
        ) {
            let span = self.peek().span;
            let function = self.function_declaration(None)?;
            return Ok(Expr {
                kind: ExprKind::Function(Rc::new(function)),
                span,
            });
        }
        self.assignment(false)
    }

    fn assignment(&mut self, only_identifier: bool) -> Result<Expr, ParseError> {
        let target = if only_identifier {
            let span = self.peek().span;
            let name = self.consume_identifier("as the for loop iterator")?;
            Expr {
                kind: ExprKind::Identifier(name),
                span,
            }
        } else {
            self.instantiation()?
        };

        let token_type = self.peek().token_type;
        let operator = compound_operator(token_type);
        if token_type != TokenType::Assign && operator.is_none() {
            return Ok(target);
        }
        if !matches!(
            target.kind,
            ExprKind::Identifier(_) | ExprKind::Member { .. }
        ) {
            return Err(self.invalid(target.span, "invalid reassignment target"));
        }

        let operator_span = self.advance().span;
        let value = match operator {
            None => self.expression()?, // right-associative
            Some(operator) => {
                let right = if matches!(token_type, TokenType::PlusPlus | TokenType::MinusMinus) {
                    Expr {
                        kind: ExprKind::NumericLiteral(1.0),
                        span: operator_span,
                    }
                } else {
                    self.instantiation()?
                };
                Expr {
                    kind: ExprKind::Binary {
                        left: Box::new(target.clone()),
                        operator,
                        right: Box::new(right),
                    },
                    span: operator_span,
                }
            }
        };

        let span = target.span;
        Ok(Expr {
            kind: ExprKind::Reassignment {
                target: Box::new(target),
                value: Box::new(value),
            },
            span,
        })
    }

    fn instantiation(&mut self) -> Result<Expr, ParseError> {
        if !self.check(TokenType::New) {
            return self.equality();
        }
        let span = self.advance().span; // consume new
        let class = self.member_access()?;
        let arguments = self.arguments("after the class to instantiate")?;
        Ok(Expr {
            kind: ExprKind::ClassInstantiation {
                class: Box::new(class),
                arguments,
            },
            span,
        })
    }

    fn binary_expression(
        &mut self,
        operators: &[(TokenType, BinaryOperator)],
        next: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        let mut expr = next(self)?;
        while let Some(operator) = operators
            .iter()
            .find(|(token_type, _)| self.check(*token_type))
            .map(|(_, operator)| *operator)
        {
            self.advance();
            let right = next(self)?;
            let span = expr.span;
            expr = Expr {
                kind: ExprKind::Binary {
                    left: Box::new(expr),
                    operator,
                    right: Box::new(right),
                },
                span,
            };
        }
        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        self.binary_expression(EQUALITY_OPERATORS, Self::additive)
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        self.binary_expression(ADDITIVE_OPERATORS, Self::multiplicative)
    }

    fn multiplicative(&mut self) -> Result<Expr, ParseError> {
        self.binary_expression(MULTIPLICATIVE_OPERATORS, Self::call)
    }

    fn call(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        loop {
            match self.peek().token_type {
                TokenType::LeftParen => {
                    let span = expr.span;
                    let arguments = self.arguments("to call a function")?;
                    expr = Expr {
                        kind: ExprKind::Call {
                            callee: Box::new(expr),
                            arguments,
                        },
                        span,
                    };
                }
                TokenType::Dot | TokenType::LeftBracket => expr = self.member(expr)?,
                _ => return Ok(expr),
            }
        }
    }

    // Member chain without calls, used as the target of `new`
    fn member_access(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        while matches!(
            self.peek().token_type,
            TokenType::Dot | TokenType::LeftBracket
        ) {
            expr = self.member(expr)?;
        }
        Ok(expr)
    }

    fn member(&mut self, object: Expr) -> Result<Expr, ParseError> {
        let span = object.span;
        let computed = self.advance().token_type == TokenType::LeftBracket;
        let property = if computed {
            let property = self.expression()?;
            self.consume(TokenType::RightBracket, "to close the computed member")?;
            property
        } else {
            let property_span = self.peek().span;
            let name = self.consume_identifier("after '.'")?;
            Expr {
                kind: ExprKind::Identifier(name),
                span: property_span,
            }
        };

        Ok(Expr {
            kind: ExprKind::Member {
                object: Box::new(object),
                property: Box::new(property),
                computed,
            },
            span,
        })
    }

    fn arguments(&mut self, context: &str) -> Result<Vec<Expr>, ParseError> {
        self.consume(TokenType::LeftParen, context)?;
        let mut arguments = Vec::new();
        if !self.check(TokenType::RightParen) {
            loop {
                arguments.push(self.expression()?);
                if !self.match_any(&[TokenType::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "to close the argument list")?;
        Ok(arguments)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.peek().clone();
        let kind = match token.token_type {
            TokenType::Identifier => ExprKind::Identifier(token.value.clone()),
            TokenType::Number => match token.value.parse::<f64>() {
                Ok(n) => ExprKind::NumericLiteral(n),
                Err(_) => {
                    return Err(self.invalid(
                        token.span,
                        format!("'{}' is not a valid number", token.value),
                    ))
                }
            },
            TokenType::String => ExprKind::StringLiteral(token.value.clone()),
            TokenType::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.consume(TokenType::RightParen, "to close the parenthesized expression")?;
                return Ok(expr);
            }
            TokenType::LeftBracket => return self.array_literal(),
            TokenType::LeftBrace => return self.object_literal(),
            TokenType::This | TokenType::Super => {
                return Err(self.invalid(
                    token.span,
                    format!(
                        "'{}' is not supported; refer to class members by name",
                        token.value
                    ),
                ))
            }
            _ => {
                return Err(self.invalid(
                    token.span,
                    format!(
                        "expected an expression, got {} '{}'",
                        token.token_type, token.value
                    ),
                ))
            }
        };
        self.advance();
        Ok(Expr {
            kind,
            span: token.span,
        })
    }

    fn array_literal(&mut self) -> Result<Expr, ParseError> {
        let span = self.advance().span; // consume [
        let mut elements = Vec::new();
        while !self.check(TokenType::RightBracket) && !self.is_at_end() {
            elements.push(self.expression()?);
            if !self.check(TokenType::RightBracket) {
                self.consume(TokenType::Comma, "between array elements")?;
            }
        }
        self.consume(TokenType::RightBracket, "to close the array literal")?;
        Ok(Expr {
            kind: ExprKind::ArrayLiteral(elements),
            span,
        })
    }

    fn object_literal(&mut self) -> Result<Expr, ParseError> {
        let span = self.advance().span; // consume {
        let mut properties = Vec::new();
        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            let key_span = self.peek().span;
            let key = self.consume_identifier("as an object key")?;
            let value = if self.match_any(&[TokenType::Colon]) {
                Some(self.expression()?)
            } else {
                None
            };
            properties.push(Property {
                key,
                value,
                span: key_span,
            });
            if !self.check(TokenType::RightBrace) {
                self.consume(TokenType::Comma, "between object properties")?;
            }
        }
        self.consume(TokenType::RightBrace, "to close the object literal")?;
        Ok(Expr {
            kind: ExprKind::ObjectLiteral(properties),
            span,
        })
    }
}

fn compound_operator(token_type: TokenType) -> Option<BinaryOperator> {
    match token_type {
        TokenType::PlusPlus | TokenType::PlusEqual => Some(BinaryOperator::Add),
        TokenType::MinusMinus | TokenType::MinusEqual => Some(BinaryOperator::Subtract),
        TokenType::StarEqual => Some(BinaryOperator::Multiply),
        TokenType::SlashEqual => Some(BinaryOperator::Divide),
        TokenType::PercentEqual => Some(BinaryOperator::Modulo),
        _ => None,
    }
}

// Nested function bodies are their own scope for `return`
fn contains_return(body: &[Stmt]) -> bool {
    body.iter().any(|stmt| match &stmt.kind {
        StmtKind::Return(_) => true,
        StmtKind::If { body, .. } | StmtKind::While { body, .. } => contains_return(body),
        StmtKind::For(for_loop) => contains_return(&for_loop.body),
        _ => false,
    })
}

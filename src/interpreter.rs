pub mod environment;
pub mod native_function;
pub mod operators;
pub mod value;

use crate::error::{DumError, RuntimeError, RuntimeErrorKind, WithSpan};
use crate::interpreter::environment::Environment;
use crate::interpreter::operators::{element_position, evaluate_binary};
use crate::interpreter::value::{Class, Function, Properties, Value};
use crate::parser::ast::{
    ClassDeclaration, Expr, ExprKind, ForLoop, FunctionDeclaration, MemberKind, Program, Stmt,
    StmtKind, Visibility,
};
use crate::parser::{produce_ast, CONSTRUCTOR};
use crate::span::Span;
use log::{debug, trace};
use smallvec::SmallVec;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::time::Instant;

const STRICT_ON: &str = "strict on";
const STRICT_OFF: &str = "strict off";

// Break and return travel up through blocks as values, not as errors. Only the interpreter
// sees these.
#[derive(Debug, Clone)]
enum ControlFlow {
    Value(Value),
    Break,
    Return(Value),
}

impl From<Value> for ControlFlow {
    fn from(v: Value) -> Self {
        ControlFlow::Value(v)
    }
}

// Propagate control flow, discard value
macro_rules! prop {
    ($expr:expr) => {
        match $expr? {
            ControlFlow::Value(_) => {}
            other => return Ok(other),
        }
    };
}

type Args = SmallVec<[Value; 4]>;

/// Runs a whole program in `env`.
///
/// A program always begins non-strict: the caller's `strict` flag is only logged, so a file
/// pulled in through `evalFile` from strict code has to opt in again with `"strict on"`.
/// Yields `DUM.exports` when the program set it, otherwise the value of the last statement.
pub fn evaluate(program: &Program, env: Rc<Environment>, strict: bool) -> Result<Value, RuntimeError> {
    debug!(
        "evaluating program of {} statement(s) (caller strict: {})",
        program.body.len(),
        strict
    );
    Interpreter::new(env).interpret(program)
}

/// Parses and runs `source` in a child scope of `env`. Backs `evaluate` and `evalFile`.
pub fn evaluate_source(source: &str, env: &Rc<Environment>, strict: bool) -> Result<Value, DumError> {
    let program = produce_ast(source)?;
    let scope = Rc::new(Environment::with_parent(Rc::clone(env)));
    Ok(evaluate(&program, scope, strict)?)
}

pub struct Interpreter {
    // Head of the scope chain. Blocks and calls swap it and put the old one back.
    env: Rc<Environment>,
    // > 0 while inside a function body, where `return` may leave a loop
    call_depth: usize,
}

impl Interpreter {
    pub fn new(env: Rc<Environment>) -> Self {
        Self { env, call_depth: 0 }
    }

    pub fn interpret(&mut self, program: &Program) -> Result<Value, RuntimeError> {
        let started = Instant::now();
        let mut strict = false;
        let mut last = Value::Null;
        for statement in &program.body {
            if let Some(mode) = strict_directive(statement) {
                strict = mode;
                continue;
            }
            match &statement.kind {
                StmtKind::Return(_) => return Err(top_level_return(statement.span)),
                StmtKind::Break => return Err(top_level_break(statement.span)),
                _ => {}
            }
            match self.execute_statement(statement, strict)? {
                ControlFlow::Value(value) => last = value,
                ControlFlow::Break => return Err(top_level_break(statement.span)),
                ControlFlow::Return(_) => return Err(top_level_return(statement.span)),
            }
        }
        debug!("program finished in {:?}", started.elapsed());
        Ok(self.exports().unwrap_or(last))
    }

    fn exports(&self) -> Option<Value> {
        match self.env.value_of_variable("DUM") {
            Ok(Value::Object(properties)) => properties.get("exports").cloned(),
            _ => None,
        }
    }

    fn child_scope(&self) -> Rc<Environment> {
        Rc::new(Environment::with_parent(Rc::clone(&self.env)))
    }

    fn in_scope<T>(&mut self, env: Rc<Environment>, f: impl FnOnce(&mut Self) -> T) -> T {
        let previous = std::mem::replace(&mut self.env, env);
        let result = f(self);
        self.env = previous;
        result
    }

    fn execute_block(&mut self, statements: &[Stmt], strict: bool) -> Result<ControlFlow, RuntimeError> {
        let mut strict = strict;
        for statement in statements {
            if let Some(mode) = strict_directive(statement) {
                strict = mode;
                continue;
            }
            prop!(self.execute_statement(statement, strict));
        }
        Ok(Value::Null.into())
    }

    fn execute_statement(&mut self, statement: &Stmt, strict: bool) -> Result<ControlFlow, RuntimeError> {
        let span = statement.span;
        match &statement.kind {
            StmtKind::VariableDeclaration(declaration) => {
                let value = match &declaration.value {
                    Some(initializer) => self.evaluate_expression(initializer, strict)?,
                    None => Value::Null,
                };
                let value = self
                    .env
                    .declare_variable(&declaration.identifier, value, declaration.constant, strict)
                    .at(span)?;
                Ok(value.into())
            }
            StmtKind::FunctionDeclaration(declaration) => {
                Ok(self.declare_function(declaration, strict, span)?.into())
            }
            StmtKind::ClassDeclaration(declaration) => {
                Ok(self.declare_class(declaration, strict, span)?.into())
            }
            StmtKind::If { condition, body } => {
                if !self.evaluate_expression(condition, strict)?.is_truthy() {
                    return Ok(Value::Null.into());
                }
                let scope = self.child_scope();
                prop!(self.in_scope(scope, |this| this.execute_block(body, strict)));
                Ok(Value::Null.into())
            }
            StmtKind::While { condition, body } => self.execute_while(condition, body, strict, span),
            StmtKind::For(for_loop) => self.execute_for(for_loop, strict, span),
            StmtKind::Break => Ok(ControlFlow::Break),
            StmtKind::Return(value) => Ok(ControlFlow::Return(self.evaluate_expression(value, strict)?)),
            StmtKind::Expression(expression) => Ok(self.evaluate_expression(expression, strict)?.into()),
        }
    }

    // One scope serves every pass; names it already holds may be declared again next pass.
    fn execute_while(
        &mut self,
        condition: &Expr,
        body: &[Stmt],
        strict: bool,
        span: Span,
    ) -> Result<ControlFlow, RuntimeError> {
        if !self.evaluate_expression(condition, strict)?.is_truthy() {
            return Ok(Value::Null.into());
        }
        let scope = self.child_scope();
        let outcome = self.in_scope(Rc::clone(&scope), |this: &mut Self| -> Result<ControlFlow, RuntimeError> {
            loop {
                match this.execute_block(body, strict)? {
                    ControlFlow::Value(_) => {}
                    ControlFlow::Break => return Ok(Value::Null.into()),
                    ControlFlow::Return(value) => return Ok(ControlFlow::Return(value)),
                }
                scope.begin_iteration();
                if !this.evaluate_expression(condition, strict)?.is_truthy() {
                    return Ok(Value::Null.into());
                }
            }
        })?;
        match outcome {
            ControlFlow::Return(value) => self.return_from_loop(value, span),
            other => Ok(other),
        }
    }

    fn execute_for(&mut self, for_loop: &ForLoop, strict: bool, span: Span) -> Result<ControlFlow, RuntimeError> {
        let variable = &for_loop.variable;
        let mut counter = match &variable.value {
            Some(initial) => self.loop_number(initial, strict)?,
            None => 0.0,
        };
        trace!("for loop over '{}' starting at {}", variable.identifier, counter);
        loop {
            let scope = self.child_scope();
            scope
                .declare_variable(&variable.identifier, Value::Num(counter), variable.constant, false)
                .at(span)?;
            let outcome = self.in_scope(Rc::clone(&scope), |this: &mut Self| -> Result<ControlFlow, RuntimeError> {
                if !this.evaluate_expression(&for_loop.condition, strict)?.is_truthy() {
                    return Ok(ControlFlow::Break);
                }
                this.execute_block(&for_loop.body, strict)
            })?;
            match outcome {
                ControlFlow::Value(_) => {}
                ControlFlow::Break => return Ok(Value::Null.into()),
                ControlFlow::Return(value) => return self.return_from_loop(value, span),
            }
            counter = self.step_counter(for_loop, &scope, counter, strict)?;
        }
    }

    // The iterator runs in the pass's own scope, so it sees the body's bindings, but the loop
    // variable is pinned back to the counter first: writes to it in the body do not carry over.
    fn step_counter(
        &mut self,
        for_loop: &ForLoop,
        scope: &Rc<Environment>,
        counter: f64,
        strict: bool,
    ) -> Result<f64, RuntimeError> {
        let iterator = &for_loop.iterator;
        let step = match &iterator.kind {
            ExprKind::Reassignment { value, .. } => value.as_ref(),
            _ => iterator,
        };
        scope
            .declare_variable(&for_loop.variable.identifier, Value::Num(counter), false, false)
            .at(iterator.span)?;
        let next = self.in_scope(Rc::clone(scope), |this| this.evaluate_expression(step, strict))?;
        match next {
            Value::Num(n) => Ok(n),
            other => Err(RuntimeErrorKind::Type(format!(
                "for loop iterator must produce a number, got {}",
                other.type_name()
            ))
            .at(iterator.span)),
        }
    }

    fn loop_number(&mut self, expression: &Expr, strict: bool) -> Result<f64, RuntimeError> {
        match self.evaluate_expression(expression, strict)? {
            Value::Num(n) => Ok(n),
            other => Err(RuntimeErrorKind::Type(format!(
                "for loop variable must start as a number, got {}",
                other.type_name()
            ))
            .at(expression.span)),
        }
    }

    fn return_from_loop(&self, value: Value, span: Span) -> Result<ControlFlow, RuntimeError> {
        if self.call_depth > 0 {
            Ok(ControlFlow::Return(value))
        } else {
            Err(RuntimeErrorKind::ControlFlow("cannot return in a loop, use break".into()).at(span))
        }
    }

    fn evaluate_expression(&mut self, expression: &Expr, strict: bool) -> Result<Value, RuntimeError> {
        let span = expression.span;
        match &expression.kind {
            ExprKind::Identifier(name) => self.env.value_of_variable(name).at(span),
            ExprKind::NumericLiteral(n) => Ok(Value::Num(*n)),
            ExprKind::StringLiteral(s) => Ok(Value::from(s.as_str())),
            ExprKind::NullLiteral => Ok(Value::Null),
            ExprKind::ObjectLiteral(properties) => {
                let mut object = Properties::new();
                for property in properties {
                    let value = match &property.value {
                        Some(value) => self.evaluate_expression(value, strict)?,
                        None => self.env.value_of_variable(&property.key).at(property.span)?,
                    };
                    object.insert(property.key.clone(), value);
                }
                Ok(Value::Object(Rc::new(object)))
            }
            ExprKind::ArrayLiteral(elements) => {
                let elements = elements
                    .iter()
                    .map(|element| self.evaluate_expression(element, strict))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(Rc::new(elements)))
            }
            ExprKind::Binary { left, operator, right } => {
                let left = self.evaluate_expression(left, strict)?;
                let right = self.evaluate_expression(right, strict)?;
                evaluate_binary(*operator, left, right, strict).at(span)
            }
            ExprKind::Reassignment { target, value } => self.reassign(target, value, strict, span),
            ExprKind::Member { object, property, computed } => {
                let object = self.evaluate_expression(object, strict)?;
                self.member_value(&object, property, *computed, strict, span)
            }
            ExprKind::Call { callee, arguments } => {
                let args = self.evaluate_arguments(arguments, strict)?;
                let callee = self.evaluate_expression(callee, strict)?;
                self.call_value(&callee, &args, strict, span)
            }
            ExprKind::Function(declaration) => self.declare_function(declaration, strict, span),
            ExprKind::ClassInstantiation { class, arguments } => {
                let args = self.evaluate_arguments(arguments, strict)?;
                match self.evaluate_expression(class, strict)? {
                    Value::Class(class) => self.instantiate(&class, &args, strict, span),
                    other => Err(RuntimeErrorKind::Type(format!(
                        "cannot instantiate {} as it is not a class",
                        other.type_name()
                    ))
                    .at(span)),
                }
            }
        }
    }

    fn evaluate_arguments(&mut self, arguments: &[Expr], strict: bool) -> Result<Args, RuntimeError> {
        arguments
            .iter()
            .map(|argument| self.evaluate_expression(argument, strict))
            .collect()
    }

    fn property_key(&mut self, property: &Expr, computed: bool, strict: bool) -> Result<String, RuntimeError> {
        if !computed {
            if let ExprKind::Identifier(name) = &property.kind {
                return Ok(name.clone());
            }
        }
        match self.evaluate_expression(property, strict)? {
            Value::Str(key) => Ok(key.to_string()),
            other => Err(RuntimeErrorKind::Type(format!(
                "object keys must be strings, got {}",
                other.type_name()
            ))
            .at(property.span)),
        }
    }

    fn member_value(
        &mut self,
        object: &Value,
        property: &Expr,
        computed: bool,
        strict: bool,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        match object {
            Value::Object(properties) => {
                let key = self.property_key(property, computed, strict)?;
                properties
                    .get(&key)
                    .cloned()
                    .ok_or_else(|| RuntimeErrorKind::MissingProperty { property: key }.at(span))
            }
            Value::Array(elements) => {
                if !computed {
                    return Err(RuntimeErrorKind::Type(
                        "array elements are read with [index], not '.'".into(),
                    )
                    .at(span));
                }
                let index = self.evaluate_expression(property, strict)?;
                let position = element_position(&index, elements.len(), strict).at(span)?;
                Ok(position.map(|p| elements[p].clone()).unwrap_or(Value::Null))
            }
            other => Err(RuntimeErrorKind::Type(format!(
                "cannot read a member of {}",
                other.type_name()
            ))
            .at(span)),
        }
    }

    fn reassign(&mut self, target: &Expr, value: &Expr, strict: bool, span: Span) -> Result<Value, RuntimeError> {
        match &target.kind {
            ExprKind::Identifier(name) => {
                let value = self.evaluate_expression(value, strict)?;
                self.env.reassign_variable(name, value).at(span)
            }
            ExprKind::Member { object, property, computed } => {
                let ExprKind::Identifier(owner) = &object.kind else {
                    return Err(RuntimeErrorKind::Type(
                        "only members of a variable can be reassigned, e.g. `obj.key = value`".into(),
                    )
                    .at(span));
                };
                let container = self.env.value_of_variable(owner).at(object.span)?;
                let value = self.evaluate_expression(value, strict)?;
                let updated = match container {
                    Value::Object(properties) => {
                        let key = self.property_key(property, *computed, strict)?;
                        if strict && !properties.contains_key(&key) {
                            return Err(RuntimeErrorKind::MissingProperty { property: key }.at(span));
                        }
                        let mut properties = (*properties).clone();
                        properties.insert(key, value);
                        Value::Object(Rc::new(properties))
                    }
                    Value::Array(elements) => {
                        if !*computed {
                            return Err(RuntimeErrorKind::Type(
                                "array elements are written with [index], not '.'".into(),
                            )
                            .at(span));
                        }
                        let index = self.evaluate_expression(property, strict)?;
                        let Some(position) = element_position(&index, elements.len(), strict).at(span)? else {
                            return Err(RuntimeErrorKind::Range("cannot assign into an empty array".into()).at(span));
                        };
                        let mut elements = (*elements).clone();
                        elements[position] = value;
                        Value::Array(Rc::new(elements))
                    }
                    other => {
                        return Err(RuntimeErrorKind::Type(format!(
                            "cannot set a member of {}",
                            other.type_name()
                        ))
                        .at(span))
                    }
                };
                self.env.reassign_variable(owner, updated).at(span)?;
                Ok(Value::Null)
            }
            _ => Err(RuntimeErrorKind::Type("invalid reassignment target".into()).at(span)),
        }
    }

    fn call_value(&mut self, callee: &Value, args: &[Value], strict: bool, span: Span) -> Result<Value, RuntimeError> {
        match callee {
            Value::NativeFn(native) => {
                trace!("calling native {}", native.name);
                (native.func)(args, &self.env, strict).at(span)
            }
            Value::Fn(function) => self.call_function(function, args, strict, span),
            Value::Class(class) => Err(RuntimeErrorKind::Type(format!(
                "class {} must be instantiated with 'new'",
                class.name()
            ))
            .at(span)),
            other => Err(RuntimeErrorKind::Type(format!(
                "cannot call {} as it is not a function",
                other.type_name()
            ))
            .at(span)),
        }
    }

    // The body inherits the strictness of the call site.
    fn call_function(
        &mut self,
        function: &Rc<Function>,
        args: &[Value],
        strict: bool,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        let parameters = &function.declaration.parameters;
        if args.len() < parameters.len() {
            return Err(RuntimeErrorKind::MissingArguments {
                function: function.name().to_string(),
                missing: parameters.len() - args.len(),
            }
            .at(span));
        }
        trace!("calling {} with {} argument(s)", function.name(), args.len());
        let scope = Rc::new(Environment::with_parent(Rc::clone(&function.closure)));
        for (parameter, argument) in parameters.iter().zip(args) {
            scope
                .declare_variable(parameter, argument.clone(), false, strict)
                .at(span)?;
        }
        self.call_depth += 1;
        let result = self.in_scope(scope, |this| this.execute_block(&function.declaration.body, strict));
        self.call_depth -= 1;
        match result? {
            ControlFlow::Return(value) => Ok(value),
            ControlFlow::Break | ControlFlow::Value(_) => Ok(Value::Null),
        }
    }

    // Named functions are bound as constants in the current scope; the value is returned
    // either way so function expressions work too.
    fn declare_function(
        &mut self,
        declaration: &Rc<FunctionDeclaration>,
        strict: bool,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        let function = Value::Fn(Rc::new(Function::new(
            Rc::clone(declaration),
            Rc::clone(&self.env),
        )));
        match &declaration.name {
            Some(name) => self.env.declare_variable(name, function, true, strict).at(span),
            None => Ok(function),
        }
    }

    fn declare_class(
        &mut self,
        declaration: &Rc<ClassDeclaration>,
        strict: bool,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        let superclass = match &declaration.superclass {
            None => None,
            Some(name) => match self.env.value_of_variable(name).at(span)? {
                Value::Class(class) => Some(class),
                other => {
                    return Err(RuntimeErrorKind::Type(format!(
                        "class {} cannot extend '{}' as it is {}",
                        declaration.name,
                        name,
                        other.type_name()
                    ))
                    .at(span))
                }
            },
        };
        let class = Value::Class(Rc::new(Class {
            declaration: Rc::clone(declaration),
            superclass,
            closure: Rc::clone(&self.env),
        }));
        self.env
            .declare_variable(&declaration.name, class, true, strict)
            .at(span)
    }

    /// Builds an instance by laying every class in the lineage, root first, into one scope.
    /// Methods close over that scope, so they see fields and each other by name. The most
    /// derived constructor runs last, and the instance is the object of public members as
    /// they stand afterwards.
    fn instantiate(&mut self, class: &Rc<Class>, args: &[Value], strict: bool, span: Span) -> Result<Value, RuntimeError> {
        debug!("instantiating class {}", class.name());
        let instance = Rc::new(Environment::with_parent(Rc::clone(&class.closure)));
        let mut public = BTreeSet::new();
        let mut constructor = None;

        for ancestor in class.lineage() {
            for member in &ancestor.declaration.members {
                let name = match &member.kind {
                    MemberKind::Property(property) => {
                        let value = match &property.value {
                            Some(initializer) => self.in_scope(Rc::clone(&instance), |this| {
                                this.evaluate_expression(initializer, strict)
                            })?,
                            None => Value::Null,
                        };
                        instance
                            .declare_variable(&property.identifier, value, property.constant, false)
                            .at(span)?;
                        property.identifier.clone()
                    }
                    MemberKind::Method(method) => {
                        let function = Rc::new(Function::new(Rc::clone(method), Rc::clone(&instance)));
                        if function.name() == CONSTRUCTOR {
                            constructor = Some(function);
                            continue;
                        }
                        let name = function.name().to_string();
                        instance
                            .declare_variable(&name, Value::Fn(function), false, false)
                            .at(span)?;
                        name
                    }
                };
                match member.visibility {
                    Visibility::Public => {
                        public.insert(name);
                    }
                    Visibility::Private => {
                        public.remove(&name);
                    }
                }
            }
        }

        if let Some(constructor) = constructor {
            self.call_function(&constructor, args, strict, span)?;
        }

        let mut properties = Properties::new();
        for name in public {
            let value = instance.value_of_variable(&name).at(span)?;
            properties.insert(name, value);
        }
        Ok(Value::Object(Rc::new(properties)))
    }
}

fn strict_directive(statement: &Stmt) -> Option<bool> {
    match &statement.kind {
        StmtKind::Expression(Expr {
            kind: ExprKind::StringLiteral(text),
            ..
        }) => match text.as_str() {
            STRICT_ON => Some(true),
            STRICT_OFF => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn top_level_return(span: Span) -> RuntimeError {
    RuntimeErrorKind::ControlFlow(
        "cannot return from the top level, assign DUM.exports instead".into(),
    )
    .at(span)
}

fn top_level_break(span: Span) -> RuntimeError {
    RuntimeErrorKind::ControlFlow("cannot break outside of a loop".into()).at(span)
}

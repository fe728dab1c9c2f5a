use crate::error::RuntimeErrorKind;
use crate::interpreter::environment::Environment;
use crate::parser::ast::{ClassDeclaration, FunctionDeclaration};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Object properties, kept ordered so printing and `Object.keys` are deterministic.
pub type Properties = BTreeMap<String, Value>;

/// Runtime values. Arrays and objects are never mutated in place: an update builds a new
/// collection and rebinds the variable that owned the old one.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Num(f64),
    Str(Rc<str>),
    Bool(bool),
    Array(Rc<Vec<Value>>),
    Object(Rc<Properties>),
    Fn(Rc<Function>),
    NativeFn(Rc<NativeFunction>),
    Class(Rc<Class>),
}

pub struct Function {
    pub declaration: Rc<FunctionDeclaration>,
    pub closure: Rc<Environment>,
}

impl Function {
    pub fn new(declaration: Rc<FunctionDeclaration>, closure: Rc<Environment>) -> Self {
        Self {
            declaration,
            closure,
        }
    }

    pub fn name(&self) -> &str {
        self.declaration
            .name
            .as_deref()
            .unwrap_or("anonymous function")
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name())
            .field("params", &self.declaration.parameters)
            .field("is_async", &self.declaration.is_async)
            .field("closure", &"<env>")
            .finish()
    }
}

pub type NativeResult = Result<Value, RuntimeErrorKind>;

/// Host callback receiving `(arguments, calling environment, strict mode)`.
pub type NativeFn = dyn Fn(&[Value], &Rc<Environment>, bool) -> NativeResult;

pub struct NativeFunction {
    pub name: Rc<str>,
    pub func: Box<NativeFn>,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .finish()
    }
}

pub struct Class {
    pub declaration: Rc<ClassDeclaration>,
    pub superclass: Option<Rc<Class>>,
    pub closure: Rc<Environment>,
}

impl Class {
    pub fn name(&self) -> &str {
        &self.declaration.name
    }

    /// The class and its ancestors, root ancestor first.
    pub fn lineage(self: &Rc<Self>) -> Vec<Rc<Class>> {
        let mut lineage = Vec::new();
        let mut current = Some(Rc::clone(self));
        while let Some(class) = current {
            current = class.superclass.clone();
            lineage.push(class);
        }
        lineage.reverse();
        lineage
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name())
            .field("superclass", &self.superclass.as_ref().map(|s| s.name()))
            .finish()
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Num(_) => "number",
            Value::Str(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Fn(_) => "function",
            Value::NativeFn(_) => "native-function",
            Value::Class(_) => "class",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Num(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Bool(b) => *b,
            Value::Array(elements) => !elements.is_empty(),
            Value::Object(properties) => !properties.is_empty(),
            Value::Fn(_) | Value::NativeFn(_) | Value::Class(_) => true,
        }
    }

    /// Converts to a plain JSON tree for tooling output.
    pub fn to_native(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Num(n) => number_to_json(*n),
            Value::Str(s) => JsonValue::String(s.to_string()),
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Array(elements) => {
                JsonValue::Array(elements.iter().map(Value::to_native).collect())
            }
            Value::Object(properties) => JsonValue::Object(
                properties
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_native()))
                    .collect(),
            ),
            Value::Fn(function) => JsonValue::String(function.name().to_string()),
            Value::NativeFn(_) => JsonValue::String("native function".into()),
            Value::Class(class) => JsonValue::String(format!("class {}", class.name())),
        }
    }
}

// 2^53: beyond this f64 no longer represents every integer
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

fn number_to_json(n: f64) -> JsonValue {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return JsonValue::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(format_number(n)))
}

/// Renders a number the way scripts expect to see it: `15` rather than `15.0`.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".into()
    } else if n == f64::INFINITY {
        "Infinity".into()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".into()
    } else if n == 0.0 {
        "0".into()
    } else {
        n.to_string()
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Num(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

// Structural equality for host-side comparisons. The language's own `==` lives in
// `operators::values_equal`.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Num(n1), Self::Num(n2)) => n1 == n2,
            (Self::Str(s1), Self::Str(s2)) => s1 == s2,
            (Self::Bool(b1), Self::Bool(b2)) => b1 == b2,
            (Self::Array(a1), Self::Array(a2)) => a1 == a2,
            (Self::Object(o1), Self::Object(o2)) => o1 == o2,
            (Self::Fn(f1), Self::Fn(f2)) => Rc::ptr_eq(f1, f2),
            (Self::NativeFn(f1), Self::NativeFn(f2)) => Rc::ptr_eq(f1, f2),
            (Self::Class(c1), Self::Class(c2)) => Rc::ptr_eq(c1, c2),
            (_, _) => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Num(n) => write!(f, "{}", format_number(*n)),
            Value::Str(s) => write!(f, "\"{}\"", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Array(elements) => {
                write!(f, "[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }
            Value::Object(properties) => {
                if properties.is_empty() {
                    return write!(f, "{{}}");
                }
                write!(f, "{{ ")?;
                for (i, (key, value)) in properties.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, " }}")
            }
            Value::Fn(function) => write!(f, "{}", function.name()),
            Value::NativeFn(_) => write!(f, "native function"),
            Value::Class(class) => write!(f, "class {}", class.name()),
        }
    }
}

use super::environment::Environment;
use super::value::{NativeFunction, NativeResult, Properties, Value};
use crate::error::RuntimeErrorKind;
use crate::host::Host;
use crate::interpreter::evaluate_source;
use log::debug;
use std::rc::Rc;

pub const PROMPT_WARNING: &str = "prompt (never enter passwords): ";

/// A fresh root scope with every global installed.
pub fn global_environment(host: Rc<dyn Host>) -> Rc<Environment> {
    let env = Rc::new(Environment::new());
    declare_globals(&env, host);
    env
}

pub fn declare_globals(env: &Environment, host: Rc<dyn Host>) {
    debug!("declaring global environment variables");
    env.define("true", Value::Bool(true), true);
    env.define("false", Value::Bool(false), true);
    env.define("null", Value::Null, true);
    for (name, function) in all_native_functions(&host) {
        env.define(name, function, true);
    }
    env.define("Object", object_capabilities(), true);
    // DUM.exports is assigned by scripts, so DUM itself stays mutable
    env.define("DUM", Value::Object(Rc::new(Properties::new())), false);
}

pub fn all_native_functions(host: &Rc<dyn Host>) -> Vec<(&'static str, Value)> {
    vec![
        ("print", native_print(Rc::clone(host))),
        ("time", native_time(Rc::clone(host))),
        ("readFile", native_read_file(Rc::clone(host))),
        ("evalFile", native_eval_file(Rc::clone(host))),
        ("evaluate", native_evaluate()),
        ("prompt", native_prompt(Rc::clone(host))),
    ]
}

pub fn native(
    name: &str,
    func: impl Fn(&[Value], &Rc<Environment>, bool) -> NativeResult + 'static,
) -> Value {
    Value::NativeFn(Rc::new(NativeFunction {
        name: Rc::from(name),
        func: Box::new(func),
    }))
}

fn fail(function: &str, message: impl Into<String>) -> RuntimeErrorKind {
    RuntimeErrorKind::Native {
        function: function.into(),
        message: message.into(),
    }
}

fn native_print(host: Rc<dyn Host>) -> Value {
    native("print", move |args, _env, _strict| {
        for arg in args {
            // top-level strings print bare, nested ones keep their quotes
            match arg {
                Value::Str(text) => host.print(text),
                other => host.print(&other.to_string()),
            }
        }
        Ok(Value::Null)
    })
}

fn native_time(host: Rc<dyn Host>) -> Value {
    native("time", move |_args, _env, _strict| Ok(Value::Num(host.now())))
}

fn single_path<'a>(function: &str, args: &'a [Value]) -> Result<&'a str, RuntimeErrorKind> {
    match args {
        [] => Err(fail(function, "expected a file path")),
        [Value::Str(path)] => Ok(&**path),
        [other] => Err(fail(
            function,
            format!("file path must be a string, got {}", other.type_name()),
        )),
        _ => Err(fail(
            function,
            format!("expected 1 file path, got {} arguments", args.len()),
        )),
    }
}

fn read(host: &dyn Host, function: &str, path: &str) -> Result<String, RuntimeErrorKind> {
    host.read_file(path)
        .map_err(|e| fail(function, format!("cannot read '{}': {}", path, e)))
}

fn strings<'a>(function: &str, args: &'a [Value]) -> Result<Vec<&'a str>, RuntimeErrorKind> {
    args.iter()
        .map(|arg| match arg {
            Value::Str(s) => Ok(s.as_ref()),
            other => Err(fail(
                function,
                format!("arguments must be strings, got {}", other.type_name()),
            )),
        })
        .collect()
}

fn native_read_file(host: Rc<dyn Host>) -> Value {
    native("readFile", move |args, _env, _strict| {
        let path = single_path("readFile", args)?;
        Ok(Value::from(read(host.as_ref(), "readFile", path)?))
    })
}

fn native_eval_file(host: Rc<dyn Host>) -> Value {
    native("evalFile", move |args, env, strict| {
        let path = single_path("evalFile", args)?;
        let source = read(host.as_ref(), "evalFile", path)?;
        debug!("evaluating file {}", path);
        evaluate_source(&source, env, strict).map_err(|e| RuntimeErrorKind::Source(Box::new(e)))
    })
}

fn native_evaluate() -> Value {
    native("evaluate", |args, env, strict| {
        let source = strings("evaluate", args)?.join(" ");
        evaluate_source(&source, env, strict).map_err(|e| RuntimeErrorKind::Source(Box::new(e)))
    })
}

fn native_prompt(host: Rc<dyn Host>) -> Value {
    native("prompt", move |args, _env, _strict| {
        let message = format!("{}{}", PROMPT_WARNING, strings("prompt", args)?.join(" "));
        Ok(host.prompt(&message).map(Value::from).unwrap_or(Value::Null))
    })
}

fn object_capabilities() -> Value {
    let properties: Properties = [
        ("has", object_has()),
        ("allHas", object_all_has()),
        ("keys", object_keys()),
        ("values", object_values()),
    ]
    .into_iter()
    .map(|(name, function)| (name.to_string(), function))
    .collect();
    Value::Object(Rc::new(properties))
}

fn key_name<'a>(function: &str, key: &'a Value) -> Result<&'a str, RuntimeErrorKind> {
    match key {
        Value::Str(key) => Ok(&**key),
        Value::Object(_) => Err(fail(
            function,
            "the key comes first, e.g. Object.has(\"key\", object)",
        )),
        other => Err(fail(
            function,
            format!("key must be a string, got {}", other.type_name()),
        )),
    }
}

fn properties_of<'a>(function: &str, value: &'a Value) -> Result<&'a Properties, RuntimeErrorKind> {
    match value {
        Value::Object(properties) => Ok(&**properties),
        other => Err(fail(
            function,
            format!("expected an object, got {}", other.type_name()),
        )),
    }
}

fn object_has() -> Value {
    native("Object.has", |args, _env, _strict| match args {
        [key, object] => {
            let key = key_name("Object.has", key)?;
            Ok(Value::Bool(
                properties_of("Object.has", object)?.contains_key(key),
            ))
        }
        [_, _, _, ..] => Err(fail(
            "Object.has",
            "expected a key and one object; use Object.allHas to check several objects",
        )),
        _ => Err(fail("Object.has", "expected a key and an object")),
    })
}

fn object_all_has() -> Value {
    native("Object.allHas", |args, _env, _strict| {
        let Some((key, objects)) = args.split_first() else {
            return Err(fail("Object.allHas", "expected a key and objects to check"));
        };
        let key = key_name("Object.allHas", key)?;
        for object in objects {
            if !properties_of("Object.allHas", object)?.contains_key(key) {
                return Ok(Value::Bool(false));
            }
        }
        Ok(Value::Bool(true))
    })
}

fn object_keys() -> Value {
    native("Object.keys", |args, _env, _strict| match args {
        [object] => Ok(Value::Array(Rc::new(
            properties_of("Object.keys", object)?
                .keys()
                .map(|key| Value::from(key.as_str()))
                .collect(),
        ))),
        _ => Err(fail(
            "Object.keys",
            format!("expected 1 object, got {} arguments", args.len()),
        )),
    })
}

fn object_values() -> Value {
    native("Object.values", |args, _env, _strict| match args {
        [object] => Ok(Value::Array(Rc::new(
            properties_of("Object.values", object)?
                .values()
                .cloned()
                .collect(),
        ))),
        _ => Err(fail(
            "Object.values",
            format!("expected 1 object, got {} arguments", args.len()),
        )),
    })
}

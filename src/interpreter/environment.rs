use crate::error::RuntimeErrorKind;
use crate::interpreter::value::Value;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// One lexical scope. Children hold their parent through an `Rc`, so a scope captured by a
/// function value lives as long as the function does.
#[derive(Debug, Default)]
pub struct Environment {
    parent: Option<Rc<Environment>>,
    values: RefCell<HashMap<String, Value>>,
    constants: RefCell<HashSet<String>>,
    // names bound by an earlier pass of the loop reusing this scope
    carried: RefCell<HashSet<String>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(parent: Rc<Environment>) -> Self {
        Self {
            parent: Some(parent),
            ..Self::default()
        }
    }

    /// Binds without any checks. Used to install globals.
    pub fn define(&self, name: &str, value: Value, constant: bool) {
        self.values.borrow_mut().insert(name.to_string(), value);
        let mut constants = self.constants.borrow_mut();
        if constant {
            constants.insert(name.to_string());
        } else {
            constants.remove(name);
        }
    }

    pub fn declare_variable(
        &self,
        name: &str,
        value: Value,
        constant: bool,
        strict: bool,
    ) -> Result<Value, RuntimeErrorKind> {
        if self.has_own(name) && !self.carried.borrow_mut().remove(name) {
            if strict {
                return Err(RuntimeErrorKind::DuplicateName { name: name.into() });
            }
        }
        // outside strict mode a redeclaration replaces the binding, constness included
        self.define(name, value.clone(), constant);
        Ok(value)
    }

    pub fn reassign_variable(&self, name: &str, value: Value) -> Result<Value, RuntimeErrorKind> {
        let owner = self
            .owner(name)
            .ok_or_else(|| RuntimeErrorKind::UnboundName { name: name.into() })?;
        if owner.constants.borrow().contains(name) {
            return Err(RuntimeErrorKind::ConstantReassign { name: name.into() });
        }
        owner
            .values
            .borrow_mut()
            .insert(name.to_string(), value.clone());
        Ok(value)
    }

    /// Returns the scope that owns `name`, searching outward from this one.
    pub fn find_variable(self: &Rc<Self>, name: &str) -> Result<Rc<Environment>, RuntimeErrorKind> {
        let mut env = Rc::clone(self);
        loop {
            if env.has_own(name) {
                return Ok(env);
            }
            env = match &env.parent {
                Some(parent) => Rc::clone(parent),
                None => return Err(RuntimeErrorKind::UnboundName { name: name.into() }),
            };
        }
    }

    pub fn value_of_variable(&self, name: &str) -> Result<Value, RuntimeErrorKind> {
        self.owner(name)
            .and_then(|env| env.values.borrow().get(name).cloned())
            .ok_or_else(|| RuntimeErrorKind::UnboundName { name: name.into() })
    }

    pub fn has_own(&self, name: &str) -> bool {
        self.values.borrow().contains_key(name)
    }

    /// Marks every current binding as carried over, so the next pass of a loop may declare
    /// the same names again.
    pub fn begin_iteration(&self) {
        let names = self.values.borrow().keys().cloned().collect();
        *self.carried.borrow_mut() = names;
    }

    fn owner(&self, name: &str) -> Option<&Environment> {
        let mut env = self;
        loop {
            if env.has_own(name) {
                return Some(env);
            }
            env = env.parent.as_deref()?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn child_of(parent: &Rc<Environment>) -> Rc<Environment> {
        Rc::new(Environment::with_parent(Rc::clone(parent)))
    }

    #[test]
    fn declare_returns_the_value() {
        let env = Environment::new();
        let value = env
            .declare_variable("x", Value::Num(1.0), false, true)
            .unwrap();
        assert_eq!(value, Value::Num(1.0));
        assert_eq!(env.value_of_variable("x").unwrap(), Value::Num(1.0));
    }

    #[test]
    fn strict_redeclaration_fails() {
        let env = Environment::new();
        env.declare_variable("x", Value::Num(1.0), false, true)
            .unwrap();
        assert_eq!(
            env.declare_variable("x", Value::Num(2.0), false, true),
            Err(RuntimeErrorKind::DuplicateName { name: "x".into() })
        );
    }

    #[test]
    fn non_strict_redeclaration_replaces() {
        let env = Environment::new();
        env.declare_variable("x", Value::Num(1.0), false, false)
            .unwrap();
        env.declare_variable("x", Value::Num(2.0), false, false)
            .unwrap();
        assert_eq!(env.value_of_variable("x").unwrap(), Value::Num(2.0));
    }

    #[test]
    fn non_strict_redeclaration_replaces_constant() {
        let env = Environment::new();
        env.declare_variable("x", Value::Num(1.0), true, false)
            .unwrap();
        env.declare_variable("x", Value::Num(2.0), false, false)
            .unwrap();
        assert_eq!(env.value_of_variable("x").unwrap(), Value::Num(2.0));
        // the new declaration was not constant
        env.reassign_variable("x", Value::Num(3.0)).unwrap();
        assert_eq!(env.value_of_variable("x").unwrap(), Value::Num(3.0));
    }

    #[test]
    fn redeclared_constant_stays_protected() {
        let env = Environment::new();
        env.declare_variable("x", Value::Num(1.0), false, false)
            .unwrap();
        env.declare_variable("x", Value::Num(2.0), true, false)
            .unwrap();
        assert_eq!(
            env.reassign_variable("x", Value::Num(3.0)),
            Err(RuntimeErrorKind::ConstantReassign { name: "x".into() })
        );
    }

    #[test]
    fn reassign_updates_owning_ancestor() {
        let root = Rc::new(Environment::new());
        root.declare_variable("x", Value::Num(1.0), false, false)
            .unwrap();
        let inner = child_of(&child_of(&root));
        inner.reassign_variable("x", Value::Num(5.0)).unwrap();
        assert_eq!(root.value_of_variable("x").unwrap(), Value::Num(5.0));
        assert!(!inner.has_own("x"));
    }

    #[test]
    fn reassigning_constant_through_ancestor_fails() {
        let root = Rc::new(Environment::new());
        root.declare_variable("x", Value::Num(1.0), true, false)
            .unwrap();
        let inner = child_of(&root);
        assert_eq!(
            inner.reassign_variable("x", Value::Num(2.0)),
            Err(RuntimeErrorKind::ConstantReassign { name: "x".into() })
        );
    }

    #[test]
    fn shadowing_in_child_scope() {
        let root = Rc::new(Environment::new());
        root.declare_variable("x", Value::Num(1.0), true, true)
            .unwrap();
        let inner = child_of(&root);
        inner
            .declare_variable("x", Value::Num(2.0), false, true)
            .unwrap();
        assert_eq!(inner.value_of_variable("x").unwrap(), Value::Num(2.0));
        assert_eq!(root.value_of_variable("x").unwrap(), Value::Num(1.0));
    }

    #[test]
    fn find_variable_returns_owner() {
        let root = Rc::new(Environment::new());
        root.declare_variable("x", Value::Null, false, false)
            .unwrap();
        let inner = child_of(&root);
        let owner = inner.find_variable("x").unwrap();
        assert!(Rc::ptr_eq(&owner, &root));
    }

    #[test]
    fn unbound_name() {
        let inner = child_of(&Rc::new(Environment::new()));
        assert_eq!(
            inner.find_variable("missing").map(|_| ()),
            Err(RuntimeErrorKind::UnboundName {
                name: "missing".into()
            })
        );
        assert_eq!(
            inner.value_of_variable("missing"),
            Err(RuntimeErrorKind::UnboundName {
                name: "missing".into()
            })
        );
        assert!(inner.reassign_variable("missing", Value::Null).is_err());
    }

    #[test]
    fn loop_iteration_exempts_carried_names_once() {
        let env = Environment::new();
        env.declare_variable("y", Value::Num(1.0), true, true)
            .unwrap();
        env.begin_iteration();
        env.declare_variable("y", Value::Num(2.0), true, true)
            .unwrap();
        assert_eq!(env.value_of_variable("y").unwrap(), Value::Num(2.0));
        // still the same pass: a second declaration is a duplicate
        assert!(env
            .declare_variable("y", Value::Num(3.0), true, true)
            .is_err());
    }
}

use crate::error::RuntimeErrorKind;
use crate::interpreter::value::{format_number, Value};
use crate::parser::ast::BinaryOperator;
use std::rc::Rc;

pub fn evaluate_binary(
    operator: BinaryOperator,
    left: Value,
    right: Value,
    strict: bool,
) -> Result<Value, RuntimeErrorKind> {
    match operator {
        BinaryOperator::Equal => return Ok(Value::Bool(values_equal(&left, &right)?)),
        BinaryOperator::NotEqual => return Ok(Value::Bool(!values_equal(&left, &right)?)),
        BinaryOperator::Nullish => {
            return Ok(match left {
                Value::Null => right,
                _ => left,
            })
        }
        _ => {}
    }

    match (&left, &right) {
        (Value::Num(a), Value::Num(b)) => numeric(operator, *a, *b, strict),
        (Value::Str(a), Value::Num(b)) if operator == BinaryOperator::Add => {
            Ok(Value::from(format!("{}{}", a, format_number(*b))))
        }
        (Value::Str(a), Value::Str(b)) if operator == BinaryOperator::Add => {
            Ok(Value::from(format!("{}{}", a, b)))
        }
        _ => Err(RuntimeErrorKind::Type(format!(
            "cannot apply '{}' to {} and {}",
            operator,
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn numeric(
    operator: BinaryOperator,
    a: f64,
    b: f64,
    strict: bool,
) -> Result<Value, RuntimeErrorKind> {
    let result = match operator {
        BinaryOperator::Add => Value::Num(a + b),
        BinaryOperator::Subtract => Value::Num(a - b),
        BinaryOperator::Multiply => Value::Num(a * b),
        BinaryOperator::Divide => Value::Num(divide(a, b, strict)?),
        BinaryOperator::Modulo => Value::Num(a % b),
        BinaryOperator::Less => Value::Bool(a < b),
        BinaryOperator::LessEqual => Value::Bool(a <= b),
        BinaryOperator::Greater => Value::Bool(a > b),
        BinaryOperator::GreaterEqual => Value::Bool(a >= b),
        // equality and `??` are settled before operands reach here
        BinaryOperator::Equal | BinaryOperator::NotEqual | BinaryOperator::Nullish => {
            return Err(RuntimeErrorKind::Type(format!(
                "cannot apply '{}' to number and number",
                operator
            )))
        }
    };
    Ok(result)
}

// Zero over anything is zero, checked before the zero denominator.
fn divide(a: f64, b: f64, strict: bool) -> Result<f64, RuntimeErrorKind> {
    if a == 0.0 {
        return Ok(0.0);
    }
    if b == 0.0 {
        if strict {
            return Err(RuntimeErrorKind::DivisionByZero {
                numerator: format_number(a),
            });
        }
        return Ok(f64::NAN);
    }
    Ok(a / b)
}

/// The language's `==`: objects compare by contents, arrays and functions by identity, and a
/// native function on either side is an error.
pub fn values_equal(left: &Value, right: &Value) -> Result<bool, RuntimeErrorKind> {
    if matches!(left, Value::NativeFn(_)) || matches!(right, Value::NativeFn(_)) {
        return Err(RuntimeErrorKind::Type(
            "cannot compare a native function with '=='".into(),
        ));
    }

    Ok(match (left, right) {
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(key, value)| b.get(key).is_some_and(|other| strictly_equal(value, other)))
        }
        _ => strictly_equal(left, right),
    })
}

fn strictly_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Num(a), Value::Num(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
        (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
        (Value::Fn(a), Value::Fn(b)) => Rc::ptr_eq(a, b),
        (Value::NativeFn(a), Value::NativeFn(b)) => Rc::ptr_eq(a, b),
        (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

/// Resolves an array index. Non-strict mode wraps out-of-range (and negative) indices around
/// the length; `None` means the array is empty.
pub fn element_position(
    index: &Value,
    len: usize,
    strict: bool,
) -> Result<Option<usize>, RuntimeErrorKind> {
    let Value::Num(n) = index else {
        return Err(RuntimeErrorKind::Type(format!(
            "array index must be a number, got {}",
            index.type_name()
        )));
    };
    if n.fract() != 0.0 || !n.is_finite() {
        return Err(RuntimeErrorKind::Range(format!(
            "array index {} is not a whole number",
            format_number(*n)
        )));
    }

    let i = *n as i64;
    let length = len as i64;
    if (0..length).contains(&i) {
        return Ok(Some(i as usize));
    }
    if strict {
        return Err(RuntimeErrorKind::Range(format!(
            "index {} is out of bounds for an array of length {}",
            i, len
        )));
    }
    if len == 0 {
        return Ok(None);
    }
    Ok(Some(i.rem_euclid(length) as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::native_function::native;
    use pretty_assertions::assert_eq;

    fn num(n: f64) -> Value {
        Value::Num(n)
    }

    fn object(entries: &[(&str, Value)]) -> Value {
        Value::Object(Rc::new(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        ))
    }

    fn div(a: f64, b: f64, strict: bool) -> Result<Value, RuntimeErrorKind> {
        evaluate_binary(BinaryOperator::Divide, num(a), num(b), strict)
    }

    #[test]
    fn zero_over_zero_is_zero_in_both_modes() {
        assert_eq!(div(0.0, 0.0, false), Ok(num(0.0)));
        assert_eq!(div(0.0, 0.0, true), Ok(num(0.0)));
    }

    #[test]
    fn division_by_zero_is_nan_unless_strict() {
        match div(5.0, 0.0, false) {
            Ok(Value::Num(n)) => assert!(n.is_nan()),
            other => panic!("expected NaN, got {:?}", other),
        }
        assert_eq!(
            div(5.0, 0.0, true),
            Err(RuntimeErrorKind::DivisionByZero {
                numerator: "5".into()
            })
        );
    }

    #[test]
    fn arithmetic_and_comparison() {
        assert_eq!(
            evaluate_binary(BinaryOperator::Modulo, num(7.0), num(3.0), false),
            Ok(num(1.0))
        );
        assert_eq!(
            evaluate_binary(BinaryOperator::Modulo, num(-7.0), num(3.0), false),
            Ok(num(-1.0))
        );
        assert_eq!(
            evaluate_binary(BinaryOperator::LessEqual, num(2.0), num(2.0), false),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn string_plus_number_concatenates() {
        assert_eq!(
            evaluate_binary(BinaryOperator::Add, Value::from("n = "), num(15.0), false),
            Ok(Value::from("n = 15"))
        );
        assert_eq!(
            evaluate_binary(BinaryOperator::Add, Value::from("a"), Value::from("b"), false),
            Ok(Value::from("ab"))
        );
    }

    #[test]
    fn incompatible_types_name_both_sides() {
        let err = evaluate_binary(BinaryOperator::Subtract, Value::from("a"), num(1.0), false)
            .unwrap_err();
        assert_eq!(
            err,
            RuntimeErrorKind::Type("cannot apply '-' to string and number".into())
        );
    }

    #[test]
    fn nullish_only_replaces_null() {
        assert_eq!(
            evaluate_binary(BinaryOperator::Nullish, Value::Null, num(2.0), false),
            Ok(num(2.0))
        );
        assert_eq!(
            evaluate_binary(BinaryOperator::Nullish, num(0.0), num(2.0), false),
            Ok(num(0.0))
        );
    }

    #[test]
    fn numbers_compare_through_equality() {
        assert_eq!(
            evaluate_binary(BinaryOperator::Equal, num(1.0), num(1.0), false),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            evaluate_binary(BinaryOperator::NotEqual, num(1.0), num(2.0), false),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            evaluate_binary(BinaryOperator::Nullish, num(3.0), num(2.0), true),
            Ok(num(3.0))
        );
    }

    #[test]
    fn objects_compare_structurally() {
        let a = object(&[("a", num(1.0))]);
        let b = object(&[("a", num(1.0))]);
        let c = object(&[("a", num(2.0))]);
        assert_eq!(values_equal(&a, &b), Ok(true));
        assert_eq!(values_equal(&a, &c), Ok(false));
        assert_eq!(values_equal(&a, &object(&[])), Ok(false));
    }

    #[test]
    fn arrays_compare_by_identity() {
        let a = Value::Array(Rc::new(vec![num(1.0)]));
        let b = Value::Array(Rc::new(vec![num(1.0)]));
        assert_eq!(values_equal(&a, &b), Ok(false));
        assert_eq!(values_equal(&a, &a.clone()), Ok(true));
    }

    #[test]
    fn different_types_are_unequal() {
        assert_eq!(values_equal(&Value::Null, &Value::from("null")), Ok(false));
        assert_eq!(values_equal(&num(1.0), &Value::Bool(true)), Ok(false));
    }

    #[test]
    fn native_functions_cannot_be_compared() {
        let native = native("noop", |_, _, _| Ok(Value::Null));
        assert!(values_equal(&native, &Value::Null).is_err());
        assert!(values_equal(&num(1.0), &native).is_err());
    }

    #[test]
    fn element_positions() {
        assert_eq!(element_position(&num(1.0), 3, true), Ok(Some(1)));
        assert_eq!(element_position(&num(4.0), 3, false), Ok(Some(1)));
        assert_eq!(element_position(&num(-1.0), 3, false), Ok(Some(2)));
        assert_eq!(element_position(&num(0.0), 0, false), Ok(None));
        assert!(matches!(
            element_position(&num(3.0), 3, true),
            Err(RuntimeErrorKind::Range(_))
        ));
        assert!(matches!(
            element_position(&num(1.5), 3, false),
            Err(RuntimeErrorKind::Range(_))
        ));
        assert!(matches!(
            element_position(&Value::from("0"), 3, false),
            Err(RuntimeErrorKind::Type(_))
        ));
    }
}

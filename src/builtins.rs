//! The closed registry of built-in operations.
//!
//! Every operator the language ships is declared here once, with its name,
//! arity, and implementation kind:
//!
//! - **Built-ins** evaluate all arguments first, left to right, then apply a
//!   plain function over the evaluated values (e.g. `+`, `equal`, `atom`).
//! - **Special forms** receive the raw unevaluated argument list and control
//!   their own evaluation order (e.g. `quote`, `cond`, `while`). They are
//!   tagged with a closed [`SpecialForm`] variant and evaluated exhaustively
//!   by the evaluator's dispatch loop, keeping tail positions visible to the
//!   trampoline.
//!
//! Operator resolution order is: special form, then built-in, then
//! user-defined function; the registry covers the first two. Arity is always
//! validated against the raw argument list before anything is evaluated.
//!
//! ## Adding a new operation
//!
//! 1. Implement the function following `fn(args: &[Value]) -> Result<Value, Error>`
//!    (or add a [`SpecialForm`] variant and handle it in the evaluator)
//! 2. Add an entry to `OPS` with its name and arity
//! 3. Add test coverage for edge cases and error conditions

use crate::ast::{NumberType, Value};
use crate::{Arity, Error};
use std::collections::HashMap;
use std::sync::LazyLock;

/// The special forms of the language, as a closed enumeration. The evaluator
/// matches on this exhaustively, so a new form cannot be added without the
/// compiler pointing at every dispatch site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialForm {
    /// `(quote x)` - return the argument unevaluated
    Quote,
    /// `(setq name expr)` - bind a variable in the current frame
    Setq,
    /// `(defun name (params) body)` - register a function definition
    Defun,
    /// `(cond (test result)...)` - first truthy test selects the result
    Cond,
    /// `(while test body...)` - iterate while the test is truthy
    While,
}

/// Implementation of a registered operation
#[derive(Clone, Copy)]
pub enum OpKind {
    /// Regular function applied to already-evaluated arguments
    Builtin(fn(&[Value]) -> Result<Value, Error>),
    /// Special form handled by the evaluator itself
    Special(SpecialForm),
}

impl std::fmt::Debug for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpKind::Builtin(_) => write!(f, "Builtin(<fn>)"),
            OpKind::Special(form) => write!(f, "Special({form:?})"),
        }
    }
}

/// Definition of a registered operation
#[derive(Debug, Clone, Copy)]
pub struct Op {
    /// The name the operation is called by
    pub name: &'static str,
    /// The implementation (built-in function or special form tag)
    pub kind: OpKind,
    /// Expected number of arguments, checked before evaluation
    pub arity: Arity,
}

impl Op {
    pub fn is_special_form(&self) -> bool {
        matches!(self.kind, OpKind::Special(_))
    }
}

//
// Built-in function implementations.
// All receive evaluated arguments; arity is already validated.
//

/// Extract a numeric operand or fail with the operator's name in the message
fn expect_number(operator: &str, value: &Value) -> Result<NumberType, Error> {
    value.as_number().ok_or_else(|| {
        Error::TypeMismatch(format!("{operator} expects numbers, got: {value}"))
    })
}

fn builtin_add(args: &[Value]) -> Result<Value, Error> {
    let mut sum = 0.0;
    for arg in args {
        sum += expect_number("+", arg)?;
    }
    Ok(Value::Number(sum))
}

fn builtin_mul(args: &[Value]) -> Result<Value, Error> {
    let mut product = 1.0;
    for arg in args {
        product *= expect_number("*", arg)?;
    }
    Ok(Value::Number(product))
}

fn builtin_sub(args: &[Value]) -> Result<Value, Error> {
    let first = expect_number("-", &args[0])?;
    if args.len() == 1 {
        return Ok(Value::Number(-first));
    }
    let mut result = first;
    for arg in &args[1..] {
        result -= expect_number("-", arg)?;
    }
    Ok(Value::Number(result))
}

fn builtin_div(args: &[Value]) -> Result<Value, Error> {
    let first = expect_number("/", &args[0])?;
    if args.len() == 1 {
        // Single argument takes the reciprocal
        if first == 0.0 {
            return Err(Error::DivisionByZero);
        }
        return Ok(Value::Number(1.0 / first));
    }
    let mut result = first;
    for arg in &args[1..] {
        let divisor = expect_number("/", arg)?;
        if divisor == 0.0 {
            return Err(Error::DivisionByZero);
        }
        result /= divisor;
    }
    Ok(Value::Number(result))
}

/// Structural equality over any pair of values
fn builtin_equal(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::from_bool(args[0] == args[1]))
}

// Macro to generate the numeric comparison functions
macro_rules! numeric_comparison {
    ($name:ident, $op:tt, $op_str:expr) => {
        fn $name(args: &[Value]) -> Result<Value, Error> {
            let a = expect_number($op_str, &args[0])?;
            let b = expect_number($op_str, &args[1])?;
            Ok(Value::from_bool(a $op b))
        }
    };
}

numeric_comparison!(builtin_lt, <, "<");
numeric_comparison!(builtin_gt, >, ">");
numeric_comparison!(builtin_le, <=, "<=");
numeric_comparison!(builtin_ge, >=, ">=");

/// Truthy iff the evaluated value is not a list
fn builtin_atom(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::from_bool(args[0].is_atom()))
}

/// Collect all evaluated arguments into a list
fn builtin_list(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::List(args.to_vec()))
}

/// Registry of every operation the language ships. Ordering is cosmetic;
/// lookup goes through the name index below.
static OPS: LazyLock<Vec<Op>> = LazyLock::new(|| {
    vec![
        // Special forms
        Op {
            name: "quote",
            kind: OpKind::Special(SpecialForm::Quote),
            arity: Arity::Exact(1),
        },
        Op {
            name: "setq",
            kind: OpKind::Special(SpecialForm::Setq),
            arity: Arity::Exact(2),
        },
        Op {
            name: "defun",
            kind: OpKind::Special(SpecialForm::Defun),
            arity: Arity::Exact(3),
        },
        Op {
            name: "cond",
            kind: OpKind::Special(SpecialForm::Cond),
            arity: Arity::Any,
        },
        Op {
            name: "while",
            kind: OpKind::Special(SpecialForm::While),
            arity: Arity::AtLeast(1),
        },
        // Arithmetic operations
        Op {
            name: "+",
            kind: OpKind::Builtin(builtin_add),
            arity: Arity::Any, // zero arguments returns the identity 0
        },
        Op {
            name: "*",
            kind: OpKind::Builtin(builtin_mul),
            arity: Arity::Any, // zero arguments returns the identity 1
        },
        Op {
            name: "-",
            kind: OpKind::Builtin(builtin_sub),
            arity: Arity::AtLeast(1), // one argument negates
        },
        Op {
            name: "/",
            kind: OpKind::Builtin(builtin_div),
            arity: Arity::AtLeast(1), // one argument takes the reciprocal
        },
        // Predicates and comparisons
        Op {
            name: "equal",
            kind: OpKind::Builtin(builtin_equal),
            arity: Arity::Exact(2),
        },
        Op {
            name: "=",
            kind: OpKind::Builtin(builtin_equal),
            arity: Arity::Exact(2),
        },
        Op {
            name: "<",
            kind: OpKind::Builtin(builtin_lt),
            arity: Arity::Exact(2),
        },
        Op {
            name: ">",
            kind: OpKind::Builtin(builtin_gt),
            arity: Arity::Exact(2),
        },
        Op {
            name: "<=",
            kind: OpKind::Builtin(builtin_le),
            arity: Arity::Exact(2),
        },
        Op {
            name: ">=",
            kind: OpKind::Builtin(builtin_ge),
            arity: Arity::Exact(2),
        },
        Op {
            name: "atom",
            kind: OpKind::Builtin(builtin_atom),
            arity: Arity::Exact(1),
        },
        Op {
            name: "list",
            kind: OpKind::Builtin(builtin_list),
            arity: Arity::Any,
        },
    ]
});

/// Lazy static name index over the registry
static OPS_BY_NAME: LazyLock<HashMap<&'static str, &'static Op>> = LazyLock::new(|| {
    let ops: &'static [Op] = OPS.as_slice();
    ops.iter().map(|op| (op.name, op)).collect()
});

/// Find a registered operation by name
pub fn find_op(name: &str) -> Option<&'static Op> {
    OPS_BY_NAME.get(name).copied()
}

/// Get all registered operations (for inspection/driver listings)
pub fn all_ops() -> &'static [Op] {
    OPS.as_slice()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{list, nil, sym, val};

    /// Invoke a built-in through the registry, validating arity first, the
    /// same way the evaluator does after evaluating arguments.
    fn call_builtin(name: &str, args: &[Value]) -> Result<Value, Error> {
        let op = find_op(name).expect("builtin not found");
        op.arity.validate(op.name, args.len())?;
        match op.kind {
            OpKind::Builtin(func) => func(args),
            OpKind::Special(form) => {
                panic!("expected builtin in tests, got special form: {form:?}")
            }
        }
    }

    #[test]
    fn test_registry_lookup() {
        let add = find_op("+").unwrap();
        assert_eq!(add.arity, Arity::Any);
        assert!(!add.is_special_form());

        let quote = find_op("quote").unwrap();
        assert!(quote.is_special_form());
        assert_eq!(quote.arity, Arity::Exact(1));

        let cond = find_op("cond").unwrap();
        assert!(matches!(cond.kind, OpKind::Special(SpecialForm::Cond)));

        assert!(find_op("no-such-op").is_none());

        // `=` and `equal` are the same operation under two names
        assert!(all_ops().iter().any(|op| op.name == "="));
        assert!(all_ops().iter().any(|op| op.name == "equal"));
    }

    #[test]
    fn test_builtin_implementations_data_driven() {
        let test_cases: Vec<(&str, Vec<Value>, Result<Value, Error>)> = vec![
            // Addition folds with identity 0
            ("+", vec![], Ok(val(0))),
            ("+", vec![val(42)], Ok(val(42))),
            ("+", vec![val(1), val(2), val(3)], Ok(val(6))),
            ("+", vec![val(1.5), val(2.5)], Ok(val(4))),
            // Multiplication folds with identity 1
            ("*", vec![], Ok(val(1))),
            ("*", vec![val(7)], Ok(val(7))),
            ("*", vec![val(2), val(3), val(4)], Ok(val(24))),
            // Subtraction negates with one argument, folds otherwise
            ("-", vec![val(10)], Ok(val(-10))),
            ("-", vec![val(10), val(3), val(2)], Ok(val(5))),
            (
                "-",
                vec![],
                Err(Error::ArityMismatch {
                    operator: "-".to_owned(),
                    expected: Arity::AtLeast(1),
                    got: 0,
                }),
            ),
            // Division takes the reciprocal with one argument
            ("/", vec![val(4)], Ok(val(0.25))),
            ("/", vec![val(20), val(2), val(2)], Ok(val(5))),
            ("/", vec![val(1), val(0)], Err(Error::DivisionByZero)),
            ("/", vec![val(0)], Err(Error::DivisionByZero)),
            ("/", vec![val(8), val(2), val(0)], Err(Error::DivisionByZero)),
            (
                "/",
                vec![],
                Err(Error::ArityMismatch {
                    operator: "/".to_owned(),
                    expected: Arity::AtLeast(1),
                    got: 0,
                }),
            ),
            // Structural equality over all value shapes
            ("equal", vec![val(5), val(5)], Ok(val(true))),
            ("equal", vec![val(5), val(6)], Ok(val(false))),
            ("equal", vec![sym("a"), sym("a")], Ok(val(true))),
            ("equal", vec![val([1, 2]), val([1, 2])], Ok(val(true))),
            ("equal", vec![val([1, 2]), val([1, 3])], Ok(val(false))),
            ("equal", vec![val(1), sym("1")], Ok(val(false))),
            ("equal", vec![nil(), nil()], Ok(val(true))),
            ("=", vec![val(5), val(5)], Ok(val(true))),
            // Comparisons require exactly two numbers
            ("<", vec![val(3), val(5)], Ok(val(true))),
            ("<", vec![val(5), val(3)], Ok(val(false))),
            (">", vec![val(5), val(3)], Ok(val(true))),
            ("<=", vec![val(5), val(5)], Ok(val(true))),
            (">=", vec![val(4), val(5)], Ok(val(false))),
            (
                "<",
                vec![sym("a"), val(5)],
                Err(Error::TypeMismatch(
                    "< expects numbers, got: a".to_owned(),
                )),
            ),
            (
                ">",
                vec![val(5), val([1])],
                Err(Error::TypeMismatch(
                    "> expects numbers, got: (1)".to_owned(),
                )),
            ),
            (
                "<",
                vec![val(1)],
                Err(Error::ArityMismatch {
                    operator: "<".to_owned(),
                    expected: Arity::Exact(2),
                    got: 1,
                }),
            ),
            // atom is truthy for any non-list
            ("atom", vec![val(5)], Ok(val(true))),
            ("atom", vec![sym("x")], Ok(val(true))),
            ("atom", vec![nil()], Ok(val(true))),
            ("atom", vec![val([1, 2])], Ok(val(false))),
            ("atom", vec![list([])], Ok(val(false))),
            // list collects its arguments
            ("list", vec![], Ok(list([]))),
            ("list", vec![val(1), sym("a")], Ok(val(vec![val(1), sym("a")]))),
            // Numeric type errors for arithmetic
            (
                "+",
                vec![val(1), sym("two")],
                Err(Error::TypeMismatch(
                    "+ expects numbers, got: two".to_owned(),
                )),
            ),
            (
                "*",
                vec![val([1])],
                Err(Error::TypeMismatch(
                    "* expects numbers, got: (1)".to_owned(),
                )),
            ),
        ];

        for (i, (name, args, expected)) in test_cases.iter().enumerate() {
            let actual = call_builtin(name, args);
            assert_eq!(
                actual,
                *expected,
                "Test case {} ({name} {args:?}) failed",
                i + 1
            );
        }
    }
}

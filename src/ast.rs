//! This module defines the core value type of the interpreter. Every
//! expression is built from, and evaluates to, a [`Value`]: a double-precision
//! number, an interned symbol atom, or a list of values. Lists serve both as
//! code (an operator followed by operand expressions) and as data (the result
//! of `quote`/`list`). Ergonomic helper functions such as [`val`], [`sym`] and
//! [`list`] are provided for convenient AST construction in both code and
//! tests, together with conversion traits for common Rust types. Display logic
//! applies numeric simplification: a number equal to its own floor renders as
//! an integer.

/// Type alias for number values in the interpreter. All arithmetic is carried
/// out in double precision; integer rendering is a display policy only.
pub(crate) type NumberType = f64;

/// The reserved truthy symbol
pub const TRUE_SYMBOL: &str = "t";

/// The reserved falsey symbol, also the canonical "no value" result
pub const NIL_SYMBOL: &str = "nil";

/// Allowed non-alphanumeric characters in symbol names
pub(crate) const SYMBOL_SPECIAL_CHARS: &str = "+-*/<>=!?_";

/// Core AST type of the interpreter.
///
/// To build a `Value`, use the ergonomic helper functions:
/// - `val(42)` for numbers, `sym("name")` for symbols, `nil()` for `nil`
/// - `val([1, 2, 3])` for homogeneous lists
/// - `val(vec![sym("op"), val(42)])` for mixed lists
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Numbers (double precision)
    Number(NumberType),
    /// Symbols (identifiers and bare text atoms)
    Symbol(String),
    /// Lists, used both as code and as data (empty list is a valid value)
    List(Vec<Value>),
}

impl Value {
    /// The reserved `t` symbol
    pub fn truth() -> Value {
        Value::Symbol(TRUE_SYMBOL.to_owned())
    }

    /// The reserved `nil` symbol
    pub fn nil() -> Value {
        Value::Symbol(NIL_SYMBOL.to_owned())
    }

    /// Map a Rust boolean onto the reserved `t`/`nil` symbols
    pub fn from_bool(b: bool) -> Value {
        if b { Value::truth() } else { Value::nil() }
    }

    /// Everything is truthy except the `nil` symbol.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Symbol(s) if s == NIL_SYMBOL)
    }

    /// An atom is any non-list value.
    pub fn is_atom(&self) -> bool {
        !matches!(self, Value::List(_))
    }

    pub fn as_number(&self) -> Option<NumberType> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Value::Symbol(s) => Some(s),
            _ => None,
        }
    }
}

/// Check if a string is a valid symbol name.
/// Valid: non-empty, no leading digit, no "-digit" or ".digit" prefix (those
/// read as numbers), alphanumeric + SYMBOL_SPECIAL_CHARS only.
pub(crate) fn is_valid_symbol(name: &str) -> bool {
    let mut chars = name.chars();

    match chars.next() {
        None => false,
        Some(first) => {
            if first.is_ascii_digit() || first == '.' {
                return false;
            }

            if first == '-'
                && let Some(second) = chars.next()
                && (second.is_ascii_digit() || second == '.')
            {
                return false;
            }

            name.chars()
                .all(|c| c.is_alphanumeric() || SYMBOL_SPECIAL_CHARS.contains(c))
        }
    }
}

// From trait implementations for Value - enable .into() conversion

impl From<NumberType> for Value {
    fn from(n: NumberType) -> Self {
        Value::Number(n)
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::Number(n as NumberType)
            }
        }
    };
}

impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(i64);
impl_from_integer!(u8);
impl_from_integer!(u16);
impl_from_integer!(u32);

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::from_bool(b)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(|x| x.into()).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        Value::List(arr.into_iter().map(|x| x.into()).collect())
    }
}

impl<T: Into<Value> + Clone> From<&[T]> for Value {
    fn from(slice: &[T]) -> Self {
        Value::List(slice.iter().cloned().map(|x| x.into()).collect())
    }
}

/// Helper function for creating symbols - works great in mixed lists!
pub fn sym<S: AsRef<str>>(name: S) -> Value {
    Value::Symbol(name.as_ref().to_owned())
}

/// Helper function for creating Values from any convertible type
pub fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// Helper function for the reserved `nil` symbol
pub fn nil() -> Value {
    Value::nil()
}

/// Helper function for building lists out of already-constructed Values
pub fn list<I: IntoIterator<Item = Value>>(items: I) -> Value {
    Value::List(items.into_iter().collect())
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // Numeric simplification: a value equal to its own floor renders
            // as an integer. This is the display boundary only; comparisons
            // and equality always use the raw double. Extreme magnitudes use
            // scientific notation (plain f64 Display never does, and would
            // expand 1e300 to 301 digits).
            Value::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else if n.is_finite() && (n.abs() >= 1e15 || (*n != 0.0 && n.abs() < 1e-5)) {
                    write!(f, "{n:e}")
                } else {
                    write!(f, "{n}")
                }
            }
            Value::Symbol(s) => write!(f, "{s}"),
            Value::List(elements) => {
                write!(f, "(")?;
                for (i, elem) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, ")")
            }
        }
    }
}

//! Minilisp - a tree-walking interpreter for a minimal LISP dialect
//!
//! This crate implements a small lexically-scoped LISP: numbers, symbols and
//! parenthesized lists, a fixed set of special forms (`quote`, `setq`, `defun`,
//! `cond`, `while`) and built-in arithmetic/comparison/predicate operators.
//!
//! ```lisp
//! (setq x 10)                 ; variable assignment
//! (+ x 2 3)                   ; arithmetic, folds left to right
//! (defun square (n) (* n n))  ; function definition
//! (cond ((< x 5) small)
//!       (t       big))        ; first truthy clause wins
//! '(1 2 3)                    ; quote shorthand
//! ```
//!
//! ## Semantics
//!
//! - Variables and functions live in **separate namespaces**; lookup walks the
//!   environment chain from the innermost frame outward.
//! - Functions are globally named (created by `defun`), not first-class values.
//!   A call evaluates its arguments in the caller's environment and runs the
//!   body in a fresh child frame.
//! - A bare symbol that is not bound as a variable evaluates to **itself**, so
//!   atoms like `t`, `nil` or arbitrary tags can be used as literals. A name in
//!   operator position that resolves to nothing is a hard error.
//! - Arithmetic is double precision internally; whole-valued results display
//!   as integers (`(+ 1 2)` prints `3`, not `3.0`).
//! - `nil` is the only falsey value; everything else is truthy.
//!
//! ## Modules
//!
//! - `ast`: the `Value` type every expression is built from and evaluates to
//! - `parser`: S-expression parsing from text
//! - `builtins`: the closed registry of special forms and built-in operators
//! - `evaluator`: environments and the core evaluation engine
//! - `interpreter`: the session driver owning the global environment

use std::fmt;

/// Maximum parsing depth to prevent stack overflow on deeply nested input
pub const MAX_PARSE_DEPTH: usize = 128;

/// Maximum non-tail evaluation depth. Tail calls are trampolined and do not
/// count against this ceiling; everything else (operand evaluation, special
/// form sub-expressions) does, and fails with `RecursionLimitExceeded` rather
/// than overflowing the native stack.
pub const MAX_RECURSION_DEPTH: usize = 1000;

/// Expected argument count of an operator or user-defined function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many arguments
    Exact(usize),
    /// This many arguments or more
    AtLeast(usize),
    /// Any number of arguments
    Any,
}

impl Arity {
    /// Check an argument count against this arity. Counts are always checked
    /// against the raw unevaluated argument list, before any evaluation.
    pub fn validate(self, operator: &str, got: usize) -> Result<(), Error> {
        let ok = match self {
            Arity::Exact(n) => got == n,
            Arity::AtLeast(n) => got >= n,
            Arity::Any => true,
        };
        if ok {
            Ok(())
        } else {
            Err(Error::ArityMismatch {
                operator: operator.to_owned(),
                expected: self,
                got,
            })
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Arity::Exact(1) => write!(f, "exactly 1 argument"),
            Arity::Exact(n) => write!(f, "exactly {n} arguments"),
            Arity::AtLeast(1) => write!(f, "at least 1 argument"),
            Arity::AtLeast(n) => write!(f, "at least {n} arguments"),
            Arity::Any => write!(f, "any number of arguments"),
        }
    }
}

/// Categorizes the different kinds of parsing errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ParseErrorKind {
    /// Invalid or unexpected syntax (bad tokens, malformed expressions)
    InvalidSyntax,
    /// Input ended before the expression was complete (unclosed parens,
    /// unterminated text atom). Drivers use this to keep buffering input.
    Incomplete,
    /// Expression nesting exceeded the maximum parse depth
    TooDeeplyNested,
    /// Extra input found after a complete, valid expression
    TrailingContent,
}

/// A structured error describing a parsing failure, with the source location
/// (1-based row and column) where it occurred.
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    pub fn new(
        kind: ParseErrorKind,
        message: impl Into<String>,
        line: usize,
        column: usize,
    ) -> Self {
        ParseError {
            kind,
            message: message.into(),
            line,
            column,
        }
    }

    /// True if more input could turn this failure into a successful parse.
    pub fn is_incomplete(&self) -> bool {
        self.kind == ParseErrorKind::Incomplete
    }
}

/// Evaluation-time and parse-time failures.
///
/// Every evaluation error aborts the current top-level form immediately; the
/// driver reports it and continues with subsequent forms.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Source text could not be parsed into an AST
    ParseError(ParseError),
    /// Wrong argument count for a special form, built-in, or user function
    ArityMismatch {
        operator: String,
        expected: Arity,
        got: usize,
    },
    /// An operand had the wrong shape (non-numeric arithmetic argument,
    /// non-symbol `setq`/`defun` target, malformed `cond` clause, ...)
    TypeMismatch(String),
    /// A divisor evaluated to zero
    DivisionByZero,
    /// Name not found in the environment chain by a must-resolve variable read
    UnboundVariable(String),
    /// Name not found in the environment chain's function tables
    UnboundFunction(String),
    /// A list's first element matched neither a special form, a built-in,
    /// nor a defined function
    UnknownOperator(String),
    /// Non-tail evaluation depth exceeded the configured ceiling
    RecursionLimitExceeded { limit: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ParseError(e) => {
                write!(f, "parse error at {}:{}: {}", e.line, e.column, e.message)
            }
            Error::ArityMismatch {
                operator,
                expected,
                got,
            } => write!(f, "{operator} requires {expected}, got {got}"),
            Error::TypeMismatch(msg) => write!(f, "type mismatch: {msg}"),
            Error::DivisionByZero => write!(f, "division by zero"),
            Error::UnboundVariable(name) => write!(f, "unbound variable: {name}"),
            Error::UnboundFunction(name) => write!(f, "unbound function: {name}"),
            Error::UnknownOperator(name) => write!(f, "unknown operator: {name}"),
            Error::RecursionLimitExceeded { limit } => {
                write!(f, "recursion limit exceeded (max: {limit})")
            }
        }
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::ParseError(e)
    }
}

pub mod ast;
pub mod builtins;
pub mod evaluator;
pub mod interpreter;
pub mod parser;

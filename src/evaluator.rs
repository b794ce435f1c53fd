//! The evaluation engine: lexically-scoped environments and the expression
//! evaluator.
//!
//! [`Environment`] is a chained symbol table with **independent** variable and
//! function namespaces; lookup walks parent links iteratively from the
//! innermost frame outward, so scope-chain depth never consumes native stack.
//!
//! [`evaluate`] dispatches each expression to special forms, built-ins, or
//! user-defined functions. User-function application and `cond` result
//! selection are tail positions: instead of recursing, the evaluator rebinds a
//! loop-local (expression, environment) pair, so tail-recursive LISP code runs
//! at constant native stack depth. All other sub-evaluation recurses with an
//! explicit depth counter threaded per top-level call and fails with
//! [`Error::RecursionLimitExceeded`] at the configured ceiling.

use crate::MAX_RECURSION_DEPTH;
use crate::ast::{NIL_SYMBOL, TRUE_SYMBOL, Value};
use crate::builtins::{OpKind, SpecialForm, find_op};
use crate::{Arity, Error};
use std::collections::HashMap;

/// An immutable record of a user-defined function: positional parameter names
/// and a single unevaluated body expression. Created by `defun`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    params: Vec<String>,
    body: Value,
}

impl FunctionDef {
    pub fn new(params: Vec<String>, body: Value) -> Self {
        FunctionDef { params, body }
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn arity(&self) -> Arity {
        Arity::Exact(self.params.len())
    }
}

/// One frame of the lexical scope chain.
///
/// Variables and functions occupy independent namespaces: a name may be bound
/// in both without collision. Definition always targets the current frame;
/// lookup walks from the innermost frame outward and the first frame holding
/// the name wins (shadowing).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Environment {
    variables: HashMap<String, Value>,
    functions: HashMap<String, FunctionDef>,
    parent: Option<Box<Environment>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment::default()
    }

    /// Create a child frame owning a copy of its parent chain. Mutation only
    /// ever targets the current frame, so the copy is observationally
    /// equivalent to sharing, and the parent trivially outlives the child.
    pub fn with_parent(parent: Environment) -> Self {
        Environment {
            variables: HashMap::new(),
            functions: HashMap::new(),
            parent: Some(Box::new(parent)),
        }
    }

    /// Insert or overwrite a variable in the current frame only; returns the
    /// stored value. Assignment is never implicitly global across frames.
    pub fn define_variable(&mut self, name: impl Into<String>, value: Value) -> Value {
        self.variables.insert(name.into(), value.clone());
        value
    }

    /// Walk the chain for a variable binding (iterative, never recursive:
    /// chain depth is driven by user code)
    pub fn lookup_variable(&self, name: &str) -> Option<&Value> {
        let mut current = self;
        loop {
            if let Some(value) = current.variables.get(name) {
                return Some(value);
            }
            current = current.parent.as_deref()?;
        }
    }

    /// Must-resolve variable read; fails with `UnboundVariable` when no frame
    /// in the chain defines the name.
    pub fn get_variable(&self, name: &str) -> Result<Value, Error> {
        self.lookup_variable(name)
            .cloned()
            .ok_or_else(|| Error::UnboundVariable(name.to_owned()))
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.lookup_variable(name).is_some()
    }

    /// Register a function definition in the current frame. Redefinition
    /// under the same name overwrites the previous entry.
    pub fn define_function(&mut self, name: impl Into<String>, params: Vec<String>, body: Value) {
        self.functions
            .insert(name.into(), FunctionDef::new(params, body));
    }

    pub fn lookup_function(&self, name: &str) -> Option<&FunctionDef> {
        self.lookup_function_frame(name)
            .and_then(|frame| frame.functions.get(name))
    }

    /// Must-resolve function read; fails with `UnboundFunction` when no frame
    /// in the chain defines the name.
    pub fn get_function(&self, name: &str) -> Result<&FunctionDef, Error> {
        self.lookup_function(name)
            .ok_or_else(|| Error::UnboundFunction(name.to_owned()))
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.lookup_function(name).is_some()
    }

    /// Walk the chain to the frame in which a function is defined. That frame
    /// is the one a call captures as the parent of its new frame (lexical
    /// scoping: the defining environment, not the caller's).
    fn lookup_function_frame(&self, name: &str) -> Option<&Environment> {
        let mut current = self;
        loop {
            if current.functions.contains_key(name) {
                return Some(current);
            }
            current = current.parent.as_deref()?;
        }
    }

    /// All visible variable bindings, innermost shadowing outermost, sorted
    /// by name. Intended for driver listings and tests.
    pub fn all_variables(&self) -> Vec<(String, Value)> {
        let mut merged = HashMap::new();
        self.collect_variables(&mut merged);
        let mut result: Vec<_> = merged.into_iter().collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }

    fn collect_variables(&self, into: &mut HashMap<String, Value>) {
        if let Some(parent) = &self.parent {
            parent.collect_variables(into);
        }
        for (name, value) in &self.variables {
            into.insert(name.clone(), value.clone());
        }
    }

    /// All visible function definitions, innermost shadowing outermost,
    /// sorted by name.
    pub fn all_functions(&self) -> Vec<(String, FunctionDef)> {
        let mut merged = HashMap::new();
        self.collect_functions(&mut merged);
        let mut result: Vec<_> = merged.into_iter().collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }

    fn collect_functions(&self, into: &mut HashMap<String, FunctionDef>) {
        if let Some(parent) = &self.parent {
            parent.collect_functions(into);
        }
        for (name, def) in &self.functions {
            into.insert(name.clone(), def.clone());
        }
    }
}

/// Create a global environment pre-populated with the reserved boolean atoms.
/// Standard-library definitions written in the language itself are layered on
/// top by the driver.
pub fn create_global_env() -> Environment {
    let mut env = Environment::new();
    env.define_variable(TRUE_SYMBOL, Value::truth());
    env.define_variable(NIL_SYMBOL, Value::nil());
    env
}

/// Evaluate one expression against an environment (public API).
///
/// This is the sole entry point a driver calls, once per top-level form. Any
/// error aborts the whole form; the environment keeps whatever definitions
/// completed before the failure.
pub fn evaluate(expr: &Value, env: &mut Environment) -> Result<Value, Error> {
    eval_with_depth(expr, env, 0)
}

/// Outcome of one dispatch step of the trampoline loop.
enum Step {
    /// Evaluation of the current expression finished with this value
    Done(Value),
    /// Continue the loop with this expression in the current frame
    /// (a `cond` result in tail position)
    Continue(Value),
    /// Continue the loop with a function body in its fresh call frame
    Call(Value, Environment),
}

/// Evaluate with explicit depth tracking and a trampoline for tail positions.
///
/// The loop holds the current (expression, environment) pair; when dispatch
/// would otherwise recurse into a function body or a selected `cond` result as
/// its terminal action, it rebinds the pair and continues instead. The depth
/// counter only advances for non-tail sub-evaluation (operands, tests,
/// `setq`/`while` sub-expressions).
fn eval_with_depth(expr: &Value, env: &mut Environment, depth: usize) -> Result<Value, Error> {
    if depth >= MAX_RECURSION_DEPTH {
        return Err(Error::RecursionLimitExceeded {
            limit: MAX_RECURSION_DEPTH,
        });
    }

    let mut current = expr.clone();
    // Frames created by trampolined calls live here; `None` means the caller's
    // environment is still current.
    let mut frame: Option<Environment> = None;

    loop {
        let env: &mut Environment = match frame.as_mut() {
            Some(call_frame) => call_frame,
            None => &mut *env,
        };

        match dispatch(&current, env, depth)? {
            Step::Done(value) => return Ok(value),
            Step::Continue(next) => current = next,
            Step::Call(body, call_frame) => {
                current = body;
                frame = Some(call_frame);
            }
        }
    }
}

/// One dispatch step: resolve what the current expression is and either
/// finish it or surface the tail expression for the trampoline.
fn dispatch(expr: &Value, env: &mut Environment, depth: usize) -> Result<Step, Error> {
    match expr {
        // Numbers evaluate to themselves
        Value::Number(_) => Ok(Step::Done(expr.clone())),

        // Symbols evaluate to their variable binding if one exists anywhere
        // in the chain, otherwise to themselves (bare atoms are literals)
        Value::Symbol(name) => Ok(Step::Done(match env.lookup_variable(name) {
            Some(value) => value.clone(),
            None => expr.clone(),
        })),

        Value::List(elements) => {
            let Some((head, raw_args)) = elements.split_first() else {
                // The empty list evaluates to itself
                return Ok(Step::Done(expr.clone()));
            };

            let Value::Symbol(operator) = head else {
                return Err(Error::UnknownOperator(head.to_string()));
            };

            // Resolution order: special form, built-in, user function
            if let Some(op) = find_op(operator) {
                op.arity.validate(op.name, raw_args.len())?;
                return match op.kind {
                    OpKind::Builtin(func) => {
                        let args = eval_args(raw_args, env, depth)?;
                        Ok(Step::Done(func(&args)?))
                    }
                    OpKind::Special(form) => eval_special_form(form, raw_args, env, depth),
                };
            }

            apply_function(operator, raw_args, env, depth)
        }
    }
}

/// Apply a user-defined function: arity against the raw argument list first,
/// then arguments evaluated left to right in the caller's environment, then a
/// fresh frame chained to the function's defining environment. The body is
/// the tail expression.
fn apply_function(
    operator: &str,
    raw_args: &[Value],
    env: &mut Environment,
    depth: usize,
) -> Result<Step, Error> {
    let Some(def) = env.lookup_function(operator) else {
        return Err(Error::UnknownOperator(operator.to_owned()));
    };
    let def = def.clone();

    def.arity().validate(operator, raw_args.len())?;
    let args = eval_args(raw_args, env, depth)?;

    // The parent snapshot is taken after the arguments ran, so bindings the
    // argument expressions established in the caller's frames are visible to
    // the body. Definitions are never removed, so the lookup cannot fail here.
    let Some(defining_frame) = env.lookup_function_frame(operator) else {
        return Err(Error::UnknownOperator(operator.to_owned()));
    };
    let mut call_frame = Environment::with_parent(defining_frame.clone());
    for (param, arg) in def.params().iter().zip(args) {
        call_frame.define_variable(param.clone(), arg);
    }

    Ok(Step::Call(def.body, call_frame))
}

/// Evaluate a list of argument expressions left to right (non-tail)
fn eval_args(args: &[Value], env: &mut Environment, depth: usize) -> Result<Vec<Value>, Error> {
    args.iter()
        .map(|arg| eval_with_depth(arg, env, depth + 1))
        .collect()
}

/// Evaluate a special form. Receives the raw unevaluated argument list, with
/// arity already validated against the registry.
fn eval_special_form(
    form: SpecialForm,
    args: &[Value],
    env: &mut Environment,
    depth: usize,
) -> Result<Step, Error> {
    match form {
        SpecialForm::Quote => Ok(Step::Done(args[0].clone())),

        SpecialForm::Setq => {
            let Value::Symbol(name) = &args[0] else {
                return Err(Error::TypeMismatch(format!(
                    "setq target must be a symbol, got: {}",
                    args[0]
                )));
            };
            let name = name.clone();
            let value = eval_with_depth(&args[1], env, depth + 1)?;
            Ok(Step::Done(env.define_variable(name, value)))
        }

        SpecialForm::Defun => {
            let Value::Symbol(name) = &args[0] else {
                return Err(Error::TypeMismatch(format!(
                    "defun name must be a symbol, got: {}",
                    args[0]
                )));
            };
            let params = parse_params(&args[1])?;
            env.define_function(name.clone(), params, args[2].clone());
            Ok(Step::Done(Value::Symbol(name.clone())))
        }

        SpecialForm::Cond => {
            for clause in args {
                let (test, result) = match clause {
                    Value::List(pair) if pair.len() == 2 => (&pair[0], &pair[1]),
                    other => {
                        return Err(Error::TypeMismatch(format!(
                            "cond clause must be a two-element list, got: {other}"
                        )));
                    }
                };
                if eval_with_depth(test, env, depth + 1)?.is_truthy() {
                    // The selected result is in tail position; later clauses
                    // are never inspected
                    return Ok(Step::Continue(result.clone()));
                }
            }
            Ok(Step::Done(Value::nil()))
        }

        SpecialForm::While => {
            let test = &args[0];
            let body = &args[1..];
            let mut last = Value::nil();
            while eval_with_depth(test, env, depth + 1)?.is_truthy() {
                for expr in body {
                    last = eval_with_depth(expr, env, depth + 1)?;
                }
            }
            Ok(Step::Done(last))
        }
    }
}

/// Validate a `defun` parameter list: a list of unique symbols
fn parse_params(value: &Value) -> Result<Vec<String>, Error> {
    let Value::List(items) = value else {
        return Err(Error::TypeMismatch(format!(
            "defun parameters must be a list, got: {value}"
        )));
    };

    let mut params = Vec::with_capacity(items.len());
    for item in items {
        let Value::Symbol(name) = item else {
            return Err(Error::TypeMismatch(format!(
                "defun parameter must be a symbol, got: {item}"
            )));
        };
        if params.contains(name) {
            return Err(Error::TypeMismatch(format!(
                "duplicate parameter name: {name}"
            )));
        }
        params.push(name.clone());
    }
    Ok(params)
}
